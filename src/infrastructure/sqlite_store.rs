use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{Sqlite, SqlitePool, SqlitePoolOptions, SqliteRow},
    QueryBuilder, Row,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{ContentQuery, DiscussionStore};
use crate::models::{
    Approval, Author, Comment, ContentKind, ContentRef, NewComment, NewReply, Post, PostId, Reply,
    Report, Role,
};

const SELECT_COMMENTS: &str = r#"
    SELECT c.id, c.post_id, c.description, c.customer_id, c.manager_id, m.role AS manager_role,
           c.is_banned, c.created_at, c.updated_at,
           a.id AS approval_id, a.approver_id, a.approved_at
    FROM comments c
    LEFT JOIN managers m ON m.id = c.manager_id
    LEFT JOIN approvals a ON a.comment_id = c.id
"#;

const SELECT_REPLIES: &str = r#"
    SELECT r.id, r.comment_id, r.description, r.customer_id, r.manager_id, m.role AS manager_role,
           r.is_banned, r.created_at, r.updated_at,
           a.id AS approval_id, a.approver_id, a.approved_at
    FROM replies r
    LEFT JOIN managers m ON m.id = r.manager_id
    LEFT JOIN approvals a ON a.reply_id = r.id
"#;

const SCHEMA: [(&str, &str); 8] = [
    (
        "posts table",
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "managers table",
        r#"
        CREATE TABLE IF NOT EXISTS managers (
            id BLOB PRIMARY KEY,
            role TEXT NOT NULL
        )
        "#,
    ),
    (
        "comments table",
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id BLOB PRIMARY KEY,
            post_id TEXT NOT NULL REFERENCES posts(id),
            description TEXT NOT NULL,
            customer_id BLOB,
            manager_id BLOB REFERENCES managers(id),
            is_banned INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((customer_id IS NULL) <> (manager_id IS NULL))
        )
        "#,
    ),
    (
        "replies table",
        r#"
        CREATE TABLE IF NOT EXISTS replies (
            id BLOB PRIMARY KEY,
            comment_id BLOB NOT NULL REFERENCES comments(id),
            description TEXT NOT NULL,
            customer_id BLOB,
            manager_id BLOB REFERENCES managers(id),
            is_banned INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((customer_id IS NULL) <> (manager_id IS NULL))
        )
        "#,
    ),
    (
        "approvals table",
        r#"
        CREATE TABLE IF NOT EXISTS approvals (
            id BLOB PRIMARY KEY,
            comment_id BLOB UNIQUE REFERENCES comments(id),
            reply_id BLOB UNIQUE REFERENCES replies(id),
            approver_id BLOB NOT NULL,
            approved_at TEXT NOT NULL,
            CHECK ((comment_id IS NULL) <> (reply_id IS NULL))
        )
        "#,
    ),
    (
        "reports table",
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id BLOB NOT NULL UNIQUE,
            reporter_id BLOB NOT NULL,
            comment_id BLOB REFERENCES comments(id),
            reply_id BLOB REFERENCES replies(id),
            created_at TEXT NOT NULL,
            CHECK ((comment_id IS NULL) <> (reply_id IS NULL))
        )
        "#,
    ),
    (
        "comments post index",
        "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id)",
    ),
    (
        "replies comment index",
        "CREATE INDEX IF NOT EXISTS idx_replies_comment ON replies(comment_id)",
    ),
];

fn table_for(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Comment => "comments",
        ContentKind::Reply => "replies",
    }
}

/// Foreign key column used by approvals and reports for this kind of content.
fn target_column(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Comment => "comment_id",
        ContentKind::Reply => "reply_id",
    }
}

fn author_from_row(row: &SqliteRow) -> AppResult<Author> {
    let customer_id: Option<Uuid> = row.try_get("customer_id")?;
    let manager_id: Option<Uuid> = row.try_get("manager_id")?;
    let manager_role: Option<String> = row.try_get("manager_role")?;

    match (customer_id, manager_id, manager_role) {
        (Some(id), None, _) => Ok(Author::Customer { id }),
        (None, Some(id), Some(role)) => {
            let role = role.parse::<Role>().map_err(|e| {
                AppError::DatabaseError(format!("Stored role for manager {} is invalid: {}", id, e))
            })?;
            Ok(Author::Manager { id, role })
        }
        (None, Some(id), None) => Err(AppError::DatabaseError(format!(
            "Manager {} has no recorded role",
            id
        ))),
        _ => Err(AppError::DatabaseError(
            "Row must have exactly one of customer_id and manager_id".to_string(),
        )),
    }
}

fn approval_from_row(row: &SqliteRow) -> AppResult<Option<Approval>> {
    let approval_id: Option<Uuid> = row.try_get("approval_id")?;
    match approval_id {
        Some(id) => Ok(Some(Approval {
            id,
            approver_id: row.try_get("approver_id")?,
            approved_at: row.try_get("approved_at")?,
        })),
        None => Ok(None),
    }
}

fn comment_from_row(row: &SqliteRow) -> AppResult<Comment> {
    let post_id: String = row.try_get("post_id")?;
    let post_id = PostId::parse(post_id)
        .map_err(|e| AppError::DatabaseError(format!("Stored post id is invalid: {}", e)))?;

    Ok(Comment {
        id: row.try_get("id")?,
        post_id,
        description: row.try_get("description")?,
        author: author_from_row(row)?,
        is_banned: row.try_get("is_banned")?,
        approval: approval_from_row(row)?,
        replies: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn reply_from_row(row: &SqliteRow) -> AppResult<Reply> {
    Ok(Reply {
        id: row.try_get("id")?,
        comment_id: row.try_get("comment_id")?,
        description: row.try_get("description")?,
        author: author_from_row(row)?,
        is_banned: row.try_get("is_banned")?,
        approval: approval_from_row(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn report_from_row(row: &SqliteRow) -> AppResult<Report> {
    let comment_id: Option<Uuid> = row.try_get("comment_id")?;
    let reply_id: Option<Uuid> = row.try_get("reply_id")?;
    let target = match (comment_id, reply_id) {
        (Some(id), None) => ContentRef::comment(id),
        (None, Some(id)) => ContentRef::reply(id),
        _ => {
            return Err(AppError::DatabaseError(
                "Report must target exactly one of a comment and a reply".to_string(),
            ))
        }
    };

    Ok(Report {
        id: row.try_get("id")?,
        reporter_id: row.try_get("reporter_id")?,
        target,
        created_at: row.try_get("created_at")?,
    })
}

fn push_content_filter(qb: &mut QueryBuilder<'_, Sqlite>, alias: &str, query: ContentQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(is_banned) = query.is_banned {
        qb.push(format!(" AND {}.is_banned = ", alias));
        qb.push_bind(is_banned);
    }
    match query.has_approval {
        Some(true) => {
            qb.push(" AND a.id IS NOT NULL");
        }
        Some(false) => {
            qb.push(" AND a.id IS NULL");
        }
        None => {}
    }
}

/// Every connection to an in-memory SQLite url opens its own empty database.
fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// SQLite implementation of the discussion store
pub struct SqliteDiscussionStore {
    pool: SqlitePool,
}

impl SqliteDiscussionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool on `url`. In-memory urls are held to a single connection.
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let max_connections = if is_memory_url(url) { 1 } else { max_connections };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", url, e)))?;
        Ok(Self::new(pool))
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn new_in_memory() -> AppResult<Self> {
        let store = Self::connect("sqlite::memory:", 1).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Creates missing tables and indexes. Safe to run on every start.
    pub async fn migrate(&self) -> AppResult<()> {
        for (name, statement) in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to create {}: {}", name, e)))?;
        }
        tracing::debug!("discussion schema is up to date");
        Ok(())
    }

    async fn upsert_manager(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        author: &Author,
    ) -> AppResult<()> {
        if let Author::Manager { id, role } = author {
            sqlx::query(
                "INSERT INTO managers (id, role) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET role = excluded.role",
            )
            .bind(*id)
            .bind(role.as_str())
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to record manager {}: {}", id, e)))?;
        }
        Ok(())
    }

    async fn fetch_replies_where(&self, clause: &str, bind: Uuid) -> AppResult<Vec<Reply>> {
        let sql = format!("{} WHERE {} ORDER BY r.rowid", SELECT_REPLIES, clause);
        let rows = sqlx::query(&sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to load replies: {}", e)))?;
        rows.iter().map(reply_from_row).collect()
    }
}

#[async_trait]
impl DiscussionStore for SqliteDiscussionStore {
    async fn get_or_create_post(&self, post_id: &PostId) -> AppResult<Post> {
        sqlx::query("INSERT INTO posts (id, created_at) VALUES (?, ?) ON CONFLICT(id) DO NOTHING")
            .bind(post_id.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create post {}: {}", post_id, e)))?;

        self.find_post(post_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Post {} vanished after upsert", post_id)))
    }

    async fn find_post(&self, post_id: &PostId) -> AppResult<Option<Post>> {
        let row = sqlx::query("SELECT id, created_at FROM posts WHERE id = ?")
            .bind(post_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get post {}: {}", post_id, e)))?;

        match row {
            Some(row) => Ok(Some(Post {
                id: post_id.clone(),
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_post(&self, post_id: &PostId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let statements = [
            "DELETE FROM reports WHERE reply_id IN (SELECT r.id FROM replies r JOIN comments c ON c.id = r.comment_id WHERE c.post_id = ?)",
            "DELETE FROM approvals WHERE reply_id IN (SELECT r.id FROM replies r JOIN comments c ON c.id = r.comment_id WHERE c.post_id = ?)",
            "DELETE FROM replies WHERE comment_id IN (SELECT id FROM comments WHERE post_id = ?)",
            "DELETE FROM reports WHERE comment_id IN (SELECT id FROM comments WHERE post_id = ?)",
            "DELETE FROM approvals WHERE comment_id IN (SELECT id FROM comments WHERE post_id = ?)",
            "DELETE FROM comments WHERE post_id = ?",
        ];
        for statement in statements {
            sqlx::query(statement)
                .bind(post_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to clear post {}: {}", post_id, e))
                })?;
        }

        let deleted = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete post {}: {}", post_id, e)))?
            .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to commit post deletion: {}", e))
        })?;
        Ok(deleted > 0)
    }

    async fn insert_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let post_exists = sqlx::query("SELECT 1 FROM posts WHERE id = ?")
            .bind(comment.post_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get post: {}", e)))?
            .is_some();
        if !post_exists {
            return Err(AppError::NotFound(format!("post {} does not exist", comment.post_id)));
        }

        Self::upsert_manager(&mut tx, &comment.author).await?;

        let now = Utc::now();
        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            description: comment.description,
            author: comment.author,
            is_banned: false,
            approval: None,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO comments (id, post_id, description, customer_id, manager_id, is_banned, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(created.id)
        .bind(created.post_id.as_str())
        .bind(&created.description)
        .bind(created.author.customer_id())
        .bind(created.author.manager_id())
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create comment: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit comment: {}", e)))?;
        Ok(created)
    }

    async fn insert_reply(&self, reply: NewReply) -> AppResult<Reply> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let parent_exists = sqlx::query("SELECT 1 FROM comments WHERE id = ?")
            .bind(reply.comment_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comment: {}", e)))?
            .is_some();
        if !parent_exists {
            return Err(AppError::NotFound(format!(
                "{} does not exist",
                ContentRef::comment(reply.comment_id)
            )));
        }

        Self::upsert_manager(&mut tx, &reply.author).await?;

        let now = Utc::now();
        let created = Reply {
            id: Uuid::new_v4(),
            comment_id: reply.comment_id,
            description: reply.description,
            author: reply.author,
            is_banned: false,
            approval: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO replies (id, comment_id, description, customer_id, manager_id, is_banned, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(created.id)
        .bind(created.comment_id)
        .bind(&created.description)
        .bind(created.author.customer_id())
        .bind(created.author.manager_id())
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create reply: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit reply: {}", e)))?;
        Ok(created)
    }

    async fn find_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        let sql = format!("{} WHERE c.id = ?", SELECT_COMMENTS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comment {}: {}", id, e)))?;

        match row {
            Some(row) => {
                let mut comment = comment_from_row(&row)?;
                comment.replies = self.fetch_replies_where("r.comment_id = ?", id).await?;
                Ok(Some(comment))
            }
            None => Ok(None),
        }
    }

    async fn find_reply(&self, id: Uuid) -> AppResult<Option<Reply>> {
        let mut replies = self.fetch_replies_where("r.id = ?", id).await?;
        Ok(replies.pop())
    }

    async fn list_post_comments(&self, post_id: &PostId) -> AppResult<Vec<Comment>> {
        let sql = format!("{} WHERE c.post_id = ? ORDER BY c.rowid", SELECT_COMMENTS);
        let rows = sqlx::query(&sql)
            .bind(post_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to list comments of {}: {}", post_id, e))
            })?;
        let mut comments = rows
            .iter()
            .map(comment_from_row)
            .collect::<AppResult<Vec<Comment>>>()?;

        let sql = format!(
            "{} WHERE r.comment_id IN (SELECT id FROM comments WHERE post_id = ?) ORDER BY r.rowid",
            SELECT_REPLIES
        );
        let rows = sqlx::query(&sql)
            .bind(post_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to list replies of {}: {}", post_id, e))
            })?;

        let mut by_parent: HashMap<Uuid, Vec<Reply>> = HashMap::new();
        for row in &rows {
            let reply = reply_from_row(row)?;
            by_parent.entry(reply.comment_id).or_default().push(reply);
        }
        for comment in &mut comments {
            comment.replies = by_parent.remove(&comment.id).unwrap_or_default();
        }
        Ok(comments)
    }

    async fn list_comments(&self, query: ContentQuery) -> AppResult<Vec<Comment>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COMMENTS);
        push_content_filter(&mut qb, "c", query);
        qb.push(" ORDER BY c.rowid");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list comments: {}", e)))?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn list_replies(&self, query: ContentQuery) -> AppResult<Vec<Reply>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_REPLIES);
        push_content_filter(&mut qb, "r", query);
        qb.push(" ORDER BY r.rowid");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to list replies: {}", e)))?;
        rows.iter().map(reply_from_row).collect()
    }

    async fn update_description(
        &self,
        target: ContentRef,
        description: &str,
        drop_approval: bool,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let sql = format!(
            "UPDATE {} SET description = ?, updated_at = ? WHERE id = ?",
            table_for(target.kind)
        );
        let updated = sqlx::query(&sql)
            .bind(description)
            .bind(Utc::now())
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update {}: {}", target, e)))?
            .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound(format!("{} does not exist", target)));
        }

        if drop_approval {
            let sql = format!("DELETE FROM approvals WHERE {} = ?", target_column(target.kind));
            sqlx::query(&sql)
                .bind(target.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to drop approval of {}: {}", target, e))
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit update: {}", e)))?;
        Ok(())
    }

    async fn approve(&self, target: ContentRef, approval: Approval) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let sql = format!(
            "UPDATE {} SET is_banned = 0, updated_at = ? WHERE id = ?",
            table_for(target.kind)
        );
        let updated = sqlx::query(&sql)
            .bind(Utc::now())
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to unban {}: {}", target, e)))?
            .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound(format!("{} does not exist", target)));
        }

        let column = target_column(target.kind);
        sqlx::query(&format!("DELETE FROM approvals WHERE {} = ?", column))
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to replace approval of {}: {}", target, e))
            })?;

        sqlx::query(&format!(
            "INSERT INTO approvals (id, {}, approver_id, approved_at) VALUES (?, ?, ?, ?)",
            column
        ))
        .bind(approval.id)
        .bind(target.id)
        .bind(approval.approver_id)
        .bind(approval.approved_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to approve {}: {}", target, e)))?;

        sqlx::query(&format!("DELETE FROM reports WHERE {} = ?", column))
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to purge reports of {}: {}", target, e))
            })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit approval: {}", e)))?;
        Ok(())
    }

    async fn ban(&self, target: ContentRef) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let sql = format!(
            "UPDATE {} SET is_banned = 1, updated_at = ? WHERE id = ?",
            table_for(target.kind)
        );
        let updated = sqlx::query(&sql)
            .bind(Utc::now())
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to ban {}: {}", target, e)))?
            .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound(format!("{} does not exist", target)));
        }

        sqlx::query(&format!("DELETE FROM reports WHERE {} = ?", target_column(target.kind)))
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to purge reports of {}: {}", target, e))
            })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit ban: {}", e)))?;
        Ok(())
    }

    async fn count_reports(&self, target: ContentRef, reporter_id: Option<Uuid>) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM reports WHERE ");
        qb.push(target_column(target.kind));
        qb.push(" = ");
        qb.push_bind(target.id);
        if let Some(reporter_id) = reporter_id {
            qb.push(" AND reporter_id = ");
            qb.push_bind(reporter_id);
        }

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to count reports of {}: {}", target, e))
            })?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    async fn insert_report(&self, report: Report) -> AppResult<Report> {
        let (comment_id, reply_id) = match report.target.kind {
            ContentKind::Comment => (Some(report.target.id), None),
            ContentKind::Reply => (None, Some(report.target.id)),
        };

        sqlx::query(
            "INSERT INTO reports (id, reporter_id, comment_id, reply_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(report.id)
        .bind(report.reporter_id)
        .bind(comment_id)
        .bind(reply_id)
        .bind(report.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to report {}: {}", report.target, e))
        })?;
        Ok(report)
    }

    async fn list_reports(&self) -> AppResult<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT id, reporter_id, comment_id, reply_id, created_at FROM reports ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list reports: {}", e)))?;
        rows.iter().map(report_from_row).collect()
    }

    async fn delete_content(&self, target: ContentRef) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let mut statements: Vec<String> = Vec::new();
        if target.kind == ContentKind::Comment {
            statements.push(
                "DELETE FROM reports WHERE reply_id IN (SELECT id FROM replies WHERE comment_id = ?)"
                    .to_string(),
            );
            statements.push(
                "DELETE FROM approvals WHERE reply_id IN (SELECT id FROM replies WHERE comment_id = ?)"
                    .to_string(),
            );
            statements.push("DELETE FROM replies WHERE comment_id = ?".to_string());
        }
        let column = target_column(target.kind);
        statements.push(format!("DELETE FROM reports WHERE {} = ?", column));
        statements.push(format!("DELETE FROM approvals WHERE {} = ?", column));

        for statement in &statements {
            sqlx::query(statement)
                .bind(target.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to clear {}: {}", target, e))
                })?;
        }

        let sql = format!("DELETE FROM {} WHERE id = ?", table_for(target.kind));
        let deleted = sqlx::query(&sql)
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete {}: {}", target, e)))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit deletion: {}", e)))?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_post(store: &SqliteDiscussionStore, id: &str) -> PostId {
        let post_id = PostId::parse(id).unwrap();
        store.get_or_create_post(&post_id).await.unwrap();
        post_id
    }

    async fn creator_comment(store: &SqliteDiscussionStore, post_id: &PostId) -> Comment {
        store
            .insert_comment(NewComment {
                post_id: post_id.clone(),
                description: "lesson notes".to_string(),
                author: Author::Manager { id: Uuid::new_v4(), role: Role::ContentCreator },
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_url_shares_one_database() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite:data/moderation.db?mode=rwc"));

        let store = SqliteDiscussionStore::connect("sqlite::memory:", 5).await.unwrap();
        assert_eq!(store.pool.options().get_max_connections(), 1);
        store.migrate().await.unwrap();

        let post_id = seed_post(&store, "p1").await;
        for _ in 0..5 {
            assert!(store.find_post(&post_id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_comment_round_trip_keeps_manager_role() {
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        let post_id = seed_post(&store, "p1").await;
        let created = creator_comment(&store, &post_id).await;

        let loaded = store.find_comment(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.author, created.author);
        assert_eq!(loaded.post_id, post_id);
        assert!(loaded.approval.is_none());
        assert!(!loaded.is_banned);
    }

    #[tokio::test]
    async fn test_insert_comment_requires_post() {
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        let result = store
            .insert_comment(NewComment {
                post_id: PostId::parse("ghost").unwrap(),
                description: "hello".to_string(),
                author: Author::Customer { id: Uuid::new_v4() },
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_approve_replaces_approval_and_purges_reports() {
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        let post_id = seed_post(&store, "p1").await;
        let comment = creator_comment(&store, &post_id).await;
        let target = ContentRef::comment(comment.id);

        store.insert_report(Report::new(target, Uuid::new_v4())).await.unwrap();
        store.ban(target).await.unwrap();
        store.insert_report(Report::new(target, Uuid::new_v4())).await.unwrap();

        store.approve(target, Approval::new(Uuid::new_v4())).await.unwrap();
        let second = Approval::new(Uuid::new_v4());
        store.approve(target, second.clone()).await.unwrap();

        let loaded = store.find_comment(comment.id).await.unwrap().unwrap();
        assert!(!loaded.is_banned);
        assert_eq!(loaded.approval.map(|a| a.id), Some(second.id));
        assert_eq!(store.count_reports(target, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_can_drop_approval() {
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        let post_id = seed_post(&store, "p1").await;
        let comment = creator_comment(&store, &post_id).await;
        let target = ContentRef::comment(comment.id);
        store.approve(target, Approval::new(Uuid::new_v4())).await.unwrap();

        store.update_description(target, "kept", false).await.unwrap();
        assert!(store.find_comment(comment.id).await.unwrap().unwrap().approval.is_some());

        store.update_description(target, "re-review", true).await.unwrap();
        let loaded = store.find_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(loaded.description, "re-review");
        assert!(loaded.approval.is_none());
    }

    #[tokio::test]
    async fn test_filters_and_report_order() {
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        let post_id = seed_post(&store, "p1").await;
        let first = creator_comment(&store, &post_id).await;
        let second = creator_comment(&store, &post_id).await;
        let reply = store
            .insert_reply(NewReply {
                comment_id: first.id,
                description: "reply".to_string(),
                author: Author::Customer { id: Uuid::new_v4() },
            })
            .await
            .unwrap();

        store.ban(ContentRef::comment(second.id)).await.unwrap();

        let banned = store.list_comments(ContentQuery::banned()).await.unwrap();
        assert_eq!(banned.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.id]);
        let queue = store
            .list_comments(ContentQuery::unapproved_and_not_banned())
            .await
            .unwrap();
        assert_eq!(queue.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first.id]);

        let reporter = Uuid::new_v4();
        store.insert_report(Report::new(ContentRef::reply(reply.id), reporter)).await.unwrap();
        store.insert_report(Report::new(ContentRef::comment(first.id), reporter)).await.unwrap();
        let reports = store.list_reports().await.unwrap();
        assert_eq!(reports[0].target, ContentRef::reply(reply.id));
        assert_eq!(reports[1].target, ContentRef::comment(first.id));
        assert_eq!(
            store.count_reports(ContentRef::comment(first.id), Some(reporter)).await.unwrap(),
            1
        );
        assert_eq!(
            store
                .count_reports(ContentRef::comment(first.id), Some(Uuid::new_v4()))
                .await
                .unwrap(),
            0
        );

        let listed = store.list_post_comments(&post_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].replies, vec![reply]);
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let store = SqliteDiscussionStore::new_in_memory().await.unwrap();
        let post_id = seed_post(&store, "cypress").await;
        let comment = creator_comment(&store, &post_id).await;
        let reply = store
            .insert_reply(NewReply {
                comment_id: comment.id,
                description: "reply".to_string(),
                author: Author::Customer { id: Uuid::new_v4() },
            })
            .await
            .unwrap();
        store.insert_report(Report::new(ContentRef::reply(reply.id), Uuid::new_v4())).await.unwrap();
        store.approve(ContentRef::comment(comment.id), Approval::new(Uuid::new_v4())).await.unwrap();

        assert!(store.delete_post(&post_id).await.unwrap());
        assert!(store.find_post(&post_id).await.unwrap().is_none());
        assert!(store.find_reply(reply.id).await.unwrap().is_none());
        assert!(store.list_reports().await.unwrap().is_empty());
        assert!(!store.delete_post(&post_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_database_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("moderation.db").display());

        let comment_id = {
            let store = SqliteDiscussionStore::connect(&url, 2).await.unwrap();
            store.migrate().await.unwrap();
            let post_id = seed_post(&store, "p1").await;
            creator_comment(&store, &post_id).await.id
        };

        let store = SqliteDiscussionStore::connect(&url, 2).await.unwrap();
        store.migrate().await.unwrap();
        assert!(store.find_comment(comment_id).await.unwrap().is_some());
    }
}
