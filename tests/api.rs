use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use comment_moderation::{
    api::create_app,
    app_state::AppState,
    config::{AuthConfig, Config, DatabaseConfig, ServerConfig},
    infrastructure::{AccessTokens, Actor, SqliteDiscussionStore},
    models::Role,
};

const SECRET: &str = "integration-secret";

struct TestApp {
    router: Router,
    tokens: AccessTokens,
}

impl TestApp {
    async fn new() -> Self {
        let config = Config {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            auth: AuthConfig {
                access_token_secret: SECRET.to_string(),
            },
        };
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        let state = AppState::with_store(Arc::new(store), config);

        TestApp {
            router: create_app(state),
            tokens: AccessTokens::from_secret(SECRET),
        }
    }

    fn login(&self, role: Role) -> (Actor, String) {
        let actor = Actor::new(Uuid::new_v4(), role);
        let token = self
            .tokens
            .issue(&actor, "user@example.com", Duration::minutes(15))
            .unwrap();
        (actor, token)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn comment(&self, token: &str, post_id: &str, description: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/posts/comments",
                Some(token),
                Some(json!({ "postId": post_id, "description": description })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

fn ids(body: &Value, key: &str) -> Vec<String> {
    body[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_public_feed_needs_no_token_but_writes_do() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/posts/comments/unknown", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comments"], json!([]));

    let (status, body) = app
        .send(
            Method::POST,
            "/posts/comments",
            None,
            Some(json!({ "postId": "p1", "description": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], json!(401));
}

#[tokio::test]
async fn test_unusable_token_counts_as_anonymous() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);
    app.comment(&student, "p1", "visible").await;

    let (status, feed) = app
        .send(Method::GET, "/posts/comments/p1", Some("stale.token.value"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["comments"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(
            Method::POST,
            "/posts/comments",
            Some("stale.token.value"),
            Some(json!({ "postId": "p1", "description": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], json!(401));
}

#[tokio::test]
async fn test_creator_comment_waits_for_approval() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);
    let (creator_actor, creator) = app.login(Role::ContentCreator);
    let (supervisor_actor, supervisor) = app.login(Role::Supervisor);

    let c1 = app.comment(&student, "p1", "first").await;
    let c2 = app.comment(&creator, "p1", "lesson notes").await;

    let (_, feed) = app.send(Method::GET, "/posts/comments/p1", None, None).await;
    assert_eq!(ids(&feed, "comments"), vec![c1.clone()]);

    let (_, queue) = app
        .send(Method::GET, "/posts/comments/non-approved", Some(&supervisor), None)
        .await;
    assert_eq!(ids(&queue, "comments"), vec![c2.clone()]);

    let (_, private) = app
        .send(Method::GET, "/posts/comments/private/p1", Some(&creator), None)
        .await;
    assert_eq!(ids(&private, "comments"), vec![c2.clone()]);

    let (status, _) = app
        .send(Method::PUT, &format!("/posts/comments/approve/{}", c2), Some(&supervisor), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, feed) = app.send(Method::GET, "/posts/comments/p1", None, None).await;
    assert_eq!(ids(&feed, "comments"), vec![c1, c2.clone()]);
    let approved = &feed["comments"][1];
    assert_eq!(approved["approvedBy"], json!(supervisor_actor.id));
    assert_eq!(approved["manager"]["id"], json!(creator_actor.id));

    let (_, filtered) = app
        .send(
            Method::GET,
            &format!("/posts/comments/p1?managerId={}", creator_actor.id),
            None,
            None,
        )
        .await;
    assert_eq!(ids(&filtered, "comments"), vec![c2]);
}

#[tokio::test]
async fn test_reply_to_unapproved_creator_comment() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);
    let (_, creator) = app.login(Role::ContentCreator);
    let (_, admin) = app.login(Role::Administrator);

    let comment = app.comment(&creator, "p1", "lesson").await;
    let reply = json!({ "commentId": comment, "description": "thanks" });

    let (status, _) = app
        .send(Method::POST, "/posts/replies", Some(&student), Some(reply.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.send(Method::PUT, &format!("/posts/comments/approve/{}", comment), Some(&admin), None)
        .await;
    let (status, body) = app
        .send(Method::POST, "/posts/replies", Some(&student), Some(reply))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["commentId"], json!(comment));

    let (_, feed) = app.send(Method::GET, "/posts/comments/p1", None, None).await;
    assert_eq!(feed["comments"][0]["replies"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_then_ban() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);
    let (_, other_student) = app.login(Role::Student);
    let (_, supervisor) = app.login(Role::Supervisor);
    let (_, admin) = app.login(Role::Administrator);

    let comment = app.comment(&student, "p1", "spam").await;
    let report_uri = format!("/posts/comments/reports/{}", comment);

    let (status, _) = app.send(Method::PUT, &report_uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::PUT, &report_uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.send(Method::PUT, &report_uri, Some(&other_student), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, reports) = app
        .send(Method::GET, "/posts/comments/reports", Some(&admin), None)
        .await;
    assert_eq!(reports["reports"].as_array().unwrap().len(), 1);
    assert_eq!(reports["reports"][0]["reportsAmount"], json!(2));
    assert_eq!(reports["reports"][0]["commentId"], json!(comment));

    let ban_uri = format!("/posts/comments/ban/{}", comment);
    let (status, _) = app.send(Method::PUT, &ban_uri, Some(&supervisor), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::PUT, &ban_uri, Some(&supervisor), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, reports) = app
        .send(Method::GET, "/posts/comments/reports", Some(&admin), None)
        .await;
    assert_eq!(reports["reports"], json!([]));

    let (_, banned) = app.send(Method::GET, "/posts/comments/ban", Some(&admin), None).await;
    assert_eq!(ids(&banned, "comments"), vec![comment.clone()]);

    let (_, feed) = app.send(Method::GET, "/posts/comments/p1", None, None).await;
    assert_eq!(feed["comments"], json!([]));

    // Only an Administrator may approve through a ban
    let approve_uri = format!("/posts/comments/approve/{}", comment);
    let (status, _) = app.send(Method::PUT, &approve_uri, Some(&supervisor), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.send(Method::PUT, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_role_gates() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);
    let (_, supervisor) = app.login(Role::Supervisor);
    let (_, creator) = app.login(Role::ContentCreator);

    let comment = app.comment(&student, "p1", "hello").await;

    let cases = [
        (Method::PUT, format!("/posts/comments/ban/{}", comment), &student),
        (Method::PUT, format!("/posts/comments/reports/{}", comment), &creator),
        (Method::GET, "/posts/comments/reports".to_string(), &supervisor),
        (Method::GET, "/posts/comments/non-approved".to_string(), &creator),
        (Method::GET, "/posts/comments/private/p1".to_string(), &student),
        (Method::DELETE, "/posts/p1".to_string(), &supervisor),
    ];
    for (method, uri, token) in cases {
        let (status, _) = app.send(method, &uri, Some(token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }

    let (status, _) = app
        .send(
            Method::POST,
            "/posts/comments",
            Some(&supervisor),
            Some(json!({ "postId": "p1", "description": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_edit_and_remove_ownership() {
    let app = TestApp::new().await;
    let (_, owner) = app.login(Role::Student);
    let (_, stranger) = app.login(Role::Student);
    let (_, admin) = app.login(Role::Administrator);

    let comment = app.comment(&owner, "p1", "first draft").await;
    let edit = json!({ "commentId": comment, "description": "edited" });

    let (status, _) = app
        .send(Method::PUT, "/posts/comments", Some(&stranger), Some(edit.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .send(Method::PUT, "/posts/comments", Some(&owner), Some(edit))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(comment));
    assert_eq!(body["description"], json!("edited"));
    assert_eq!(body["isApproved"], json!(false));

    let (_, feed) = app.send(Method::GET, "/posts/comments/p1", None, None).await;
    assert_eq!(feed["comments"][0]["description"], json!("edited"));

    let uri = format!("/posts/comments/{}", comment);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edits_return_the_stored_record() {
    let app = TestApp::new().await;
    let (_, creator) = app.login(Role::ContentCreator);
    let (_, student) = app.login(Role::Student);
    let (supervisor_actor, supervisor) = app.login(Role::Supervisor);

    let comment = app.comment(&creator, "p1", "lesson").await;
    app.send(Method::PUT, &format!("/posts/comments/approve/{}", comment), Some(&supervisor), None)
        .await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/posts/comments",
            Some(&creator),
            Some(json!({ "commentId": comment, "description": "lesson v2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], json!("lesson v2"));
    assert_eq!(body["isApproved"], json!(true));
    assert_eq!(body["approvedBy"], json!(supervisor_actor.id));

    let (_, reply) = app
        .send(
            Method::POST,
            "/posts/replies",
            Some(&student),
            Some(json!({ "commentId": comment, "description": "thanks" })),
        )
        .await;
    let reply_id = reply["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            "/posts/replies",
            Some(&student),
            Some(json!({ "replyId": reply_id, "description": "thanks a lot" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(reply_id));
    assert_eq!(body["commentId"], json!(comment));
    assert_eq!(body["description"], json!("thanks a lot"));
}

#[tokio::test]
async fn test_malformed_input_uses_error_body() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);
    let (_, supervisor) = app.login(Role::Supervisor);

    let (status, body) = app
        .send(Method::PUT, "/posts/comments/ban/not-a-uuid", Some(&supervisor), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));
    assert!(body["error"].is_string());

    let (status, body) = app
        .send(
            Method::PUT,
            "/posts/comments",
            Some(&student),
            Some(json!({ "commentId": "nope", "description": 7 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));

    let (status, body) = app
        .send(Method::GET, "/posts/comments/p1?managerId=bogus", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));
}

#[tokio::test]
async fn test_validation_errors() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);

    let (status, body) = app
        .send(
            Method::POST,
            "/posts/comments",
            Some(&student),
            Some(json!({ "postId": "has space", "description": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));

    let (status, _) = app
        .send(
            Method::POST,
            "/posts/comments",
            Some(&student),
            Some(json!({ "postId": "p1", "description": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_post() {
    let app = TestApp::new().await;
    let (_, student) = app.login(Role::Student);
    let (_, admin) = app.login(Role::Administrator);

    app.comment(&student, "cypress", "fixture").await;

    let (status, _) = app.send(Method::DELETE, "/posts/cypress", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, feed) = app.send(Method::GET, "/posts/comments/cypress", None, None).await;
    assert_eq!(feed["comments"], json!([]));
    let (status, _) = app.send(Method::DELETE, "/posts/cypress", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
