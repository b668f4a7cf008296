// Core infrastructure modules
pub mod memory_store;          // In-memory discussion store
pub mod middleware;            // Access token middleware and viewer extractors
pub mod sqlite_store;          // SQLite discussion store
pub mod store;                 // Persistence contract
pub mod viewer;                // Viewer context

// Re-export core infrastructure components
pub use memory_store::InMemoryDiscussionStore;
pub use middleware::{AccessTokens, Claims, HasAccessTokens, MaybeVc, Vc};
pub use sqlite_store::SqliteDiscussionStore;
pub use store::{ContentQuery, DiscussionStore};
pub use viewer::{Actor, ViewerContext};
