use std::path::Path;
use std::sync::Arc;

use crate::{
    config::Config,
    infrastructure::{AccessTokens, DiscussionStore, HasAccessTokens, SqliteDiscussionStore},
    services::ModerationService,
};

#[derive(Clone)]
pub struct AppState {
    pub moderation: ModerationService,
    pub access_tokens: AccessTokens,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        ensure_database_dir(&config.database.url)?;

        // Initialize database
        let store = SqliteDiscussionStore::connect(
            &config.database.url,
            config.database.max_connections,
        )
        .await?;
        store.migrate().await?;

        Ok(Self::with_store(Arc::new(store), config))
    }

    /// State over an already prepared store.
    pub fn with_store(store: Arc<dyn DiscussionStore>, config: Config) -> Self {
        let access_tokens = AccessTokens::from_secret(&config.auth.access_token_secret);
        Self {
            moderation: ModerationService::new(store),
            access_tokens,
            config,
        }
    }
}

impl HasAccessTokens for AppState {
    fn access_tokens(&self) -> &AccessTokens {
        &self.access_tokens
    }
}

/// Creates the parent directory of a file-backed SQLite url.
fn ensure_database_dir(url: &str) -> anyhow::Result<()> {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
