//! # notably-db
//!
//! PostgreSQL storage for the notes that AI processing reads and writes.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgNoteStore`], the PostgreSQL [`NoteStore`]
//! - [`InMemoryNoteStore`] for local runs and failure-injection tests
//! - Schema migrations (feature `migrations`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use notably_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/notably").await?;
//!     db.migrate().await?;
//!     let note = db.notes.find_note_by_id_for_owner("user-1", "note-123").await?;
//!     println!("{:?}", note);
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod notes;
pub mod pool;
pub mod test_fixtures;

// Re-export core types
pub use notably_core::{Error, Note, NoteStore, Result};

pub use memory::InMemoryNoteStore;
pub use notes::PgNoteStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig, PoolStats};

/// Database handle bundling the pool and the note store.
#[derive(Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Postgres>,
    pub notes: PgNoteStore,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteStore::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
