//! Database layer
//!
//! SQLite is the default backend (single file next to the binary); MySQL can
//! be selected in configuration. Repositories receive a `DynDatabasePool` and
//! dispatch on `DatabasePool::driver()`.
//!
//! # Usage
//!
//! ```ignore
//! use tagblog::config::DatabaseConfig;
//! use tagblog::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.close().await;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
