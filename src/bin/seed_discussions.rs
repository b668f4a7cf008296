// Seeds a demo discussion and prints one access token per role

use chrono::Duration;
use comment_moderation::{
    app_state::AppState,
    config::Config,
    error::AppResult,
    infrastructure::Actor,
    models::{ContentRef, PostId, Role},
};
use uuid::Uuid;

const DEMO_POST: &str = "welcome";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let state = AppState::new(config).await?;

    let student = Actor::new(Uuid::new_v4(), Role::Student);
    let administrator = Actor::new(Uuid::new_v4(), Role::Administrator);
    let supervisor = Actor::new(Uuid::new_v4(), Role::Supervisor);
    let creator = Actor::new(Uuid::new_v4(), Role::ContentCreator);

    seed(&state, &student, &administrator, &supervisor, &creator).await?;

    println!("Seeded post '{}'", DEMO_POST);
    println!("Access tokens (valid for 24h):");
    for (label, actor) in [
        ("student", &student),
        ("administrator", &administrator),
        ("supervisor", &supervisor),
        ("content_creator", &creator),
    ] {
        let email = format!("{}@example.com", label);
        let token = state.access_tokens.issue(actor, &email, Duration::hours(24))?;
        println!("  {:<16} {}  {}", label, actor.id, token);
    }

    Ok(())
}

async fn seed(
    state: &AppState,
    student: &Actor,
    administrator: &Actor,
    supervisor: &Actor,
    creator: &Actor,
) -> AppResult<()> {
    let moderation = &state.moderation;
    let post_id = PostId::parse(DEMO_POST)?;

    moderation
        .create_comment(administrator, post_id.clone(), "Welcome! Please keep discussions on topic.")
        .await?;

    let question = moderation
        .create_comment(student, post_id.clone(), "Where can I find the exercises for this lesson?")
        .await?;
    moderation
        .create_reply(creator, question.id, "They are linked at the bottom of the page.")
        .await?;

    let approved = moderation
        .create_comment(creator, post_id.clone(), "Bonus material for this lesson is now online.")
        .await?;
    moderation
        .approve(ContentRef::comment(approved.id), supervisor)
        .await?;

    // Stays in the supervisor queue
    moderation
        .create_comment(creator, post_id, "Draft: errata for the second exercise.")
        .await?;

    let spam = moderation
        .create_comment(student, PostId::parse(DEMO_POST)?, "Buy cheap followers here!!!")
        .await?;
    moderation
        .report(ContentRef::comment(spam.id), Uuid::new_v4())
        .await?;

    Ok(())
}
