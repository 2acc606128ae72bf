//! Tag repository
//!
//! Database operations for tags and the `post_tags` join table.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! Post counts are computed with a correlated `COUNT` over `post_tags`, so a
//! tag without posts reports zero instead of disappearing from the result.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by exact title
    async fn get_by_title(&self, title: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by title
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Tags sorted by post count descending, ties broken by title
    async fn popular(&self, limit: usize) -> Result<Vec<TagWithCount>>;

    /// Tags of every given post, keyed by post ID, each list ordered by title.
    ///
    /// Issues a single query. Posts without tags are absent from the map.
    async fn get_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<TagWithCount>>>;

    /// Delete a tag
    async fn delete(&self, id: i64) -> Result<()>;

    /// Associate tag with post. Re-adding an existing link is a no-op.
    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Remove tag from post
    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.as_sqlite().unwrap(), tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.as_mysql().unwrap(), tag).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tag_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_tag_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tag_by_title_sqlite(self.pool.as_sqlite().unwrap(), title).await
            }
            DatabaseDriver::Mysql => {
                get_tag_by_title_mysql(self.pool.as_mysql().unwrap(), title).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn popular(&self, limit: usize) -> Result<Vec<TagWithCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                popular_tags_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => popular_tags_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn get_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<TagWithCount>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tags_for_posts_sqlite(self.pool.as_sqlite().unwrap(), post_ids).await
            }
            DatabaseDriver::Mysql => {
                get_tags_for_posts_mysql(self.pool.as_mysql().unwrap(), post_ids).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_tag_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_tag_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_tag_to_post_sqlite(self.pool.as_sqlite().unwrap(), tag_id, post_id).await
            }
            DatabaseDriver::Mysql => {
                add_tag_to_post_mysql(self.pool.as_mysql().unwrap(), tag_id, post_id).await
            }
        }
    }

    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                remove_tag_from_post_sqlite(self.pool.as_sqlite().unwrap(), tag_id, post_id).await
            }
            DatabaseDriver::Mysql => {
                remove_tag_from_post_mysql(self.pool.as_mysql().unwrap(), tag_id, post_id).await
            }
        }
    }
}

const POST_COUNT_SUBQUERY: &str =
    "(SELECT COUNT(*) FROM post_tags ptc WHERE ptc.tag_id = t.id) AS post_count";

fn group_by_post<T>(rows: Vec<(i64, T)>) -> HashMap<i64, Vec<T>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for (post_id, item) in rows {
        grouped.entry(post_id).or_default().push(item);
    }
    grouped
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO tags (title, created_at) VALUES (?, ?)")
        .bind(&tag.title)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        title: tag.title.clone(),
        created_at: now,
    })
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title, created_at FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_title_sqlite(pool: &SqlitePool, title: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title, created_at FROM tags WHERE title = ?")
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by title")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, title, created_at FROM tags ORDER BY title")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_sqlite).collect()
}

async fn popular_tags_sqlite(pool: &SqlitePool, limit: usize) -> Result<Vec<TagWithCount>> {
    let sql = format!(
        "SELECT t.id, t.title, t.created_at, {} FROM tags t ORDER BY post_count DESC, t.title ASC LIMIT ?",
        POST_COUNT_SUBQUERY
    );
    let rows = sqlx::query(&sql)
        .bind(limit as i64)
        .fetch_all(pool)
        .await
        .context("Failed to get popular tags")?;

    let mut tags = Vec::with_capacity(rows.len());
    for row in rows {
        let tag = row_to_tag_sqlite(&row)?;
        tags.push(TagWithCount::new(tag, row.get("post_count")));
    }

    Ok(tags)
}

async fn get_tags_for_posts_sqlite(
    pool: &SqlitePool,
    post_ids: &[i64],
) -> Result<HashMap<i64, Vec<TagWithCount>>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT pt.post_id, t.id, t.title, t.created_at, {} \
         FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id \
         WHERE pt.post_id IN (",
        POST_COUNT_SUBQUERY
    ));
    let mut separated = builder.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY pt.post_id, t.title");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to get tags for posts")?;

    let mut pairs = Vec::with_capacity(rows.len());
    for row in rows {
        let post_id: i64 = row.get("post_id");
        let tag = row_to_tag_sqlite(&row)?;
        pairs.push((post_id, TagWithCount::new(tag, row.get("post_count"))));
    }

    Ok(group_by_post(pairs))
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // post_tags entries are removed by ON DELETE CASCADE
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(())
}

async fn add_tag_to_post_sqlite(pool: &SqlitePool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
        .bind(post_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to add tag to post")?;

    Ok(())
}

async fn remove_tag_from_post_sqlite(pool: &SqlitePool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ? AND tag_id = ?")
        .bind(post_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to remove tag from post")?;

    Ok(())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query("INSERT INTO tags (title, created_at) VALUES (?, ?)")
        .bind(&tag.title)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        title: tag.title.clone(),
        created_at: now,
    })
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title, created_at FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_tag_by_title_mysql(pool: &MySqlPool, title: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, title, created_at FROM tags WHERE title = ?")
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by title")?;

    match row {
        Some(row) => Ok(Some(row_to_tag_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, title, created_at FROM tags ORDER BY title")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_mysql).collect()
}

async fn popular_tags_mysql(pool: &MySqlPool, limit: usize) -> Result<Vec<TagWithCount>> {
    let sql = format!(
        "SELECT t.id, t.title, t.created_at, {} FROM tags t ORDER BY post_count DESC, t.title ASC LIMIT ?",
        POST_COUNT_SUBQUERY
    );
    let rows = sqlx::query(&sql)
        .bind(limit as i64)
        .fetch_all(pool)
        .await
        .context("Failed to get popular tags")?;

    let mut tags = Vec::with_capacity(rows.len());
    for row in rows {
        let tag = row_to_tag_mysql(&row)?;
        tags.push(TagWithCount::new(tag, row.get("post_count")));
    }

    Ok(tags)
}

async fn get_tags_for_posts_mysql(
    pool: &MySqlPool,
    post_ids: &[i64],
) -> Result<HashMap<i64, Vec<TagWithCount>>> {
    let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
        "SELECT pt.post_id, t.id, t.title, t.created_at, {} \
         FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id \
         WHERE pt.post_id IN (",
        POST_COUNT_SUBQUERY
    ));
    let mut separated = builder.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY pt.post_id, t.title");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to get tags for posts")?;

    let mut pairs = Vec::with_capacity(rows.len());
    for row in rows {
        let post_id: i64 = row.get("post_id");
        let tag = row_to_tag_mysql(&row)?;
        pairs.push((post_id, TagWithCount::new(tag, row.get("post_count"))));
    }

    Ok(group_by_post(pairs))
}

async fn delete_tag_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(())
}

async fn add_tag_to_post_mysql(pool: &MySqlPool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query("INSERT IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
        .bind(post_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to add tag to post")?;

    Ok(())
}

async fn remove_tag_from_post_mysql(pool: &MySqlPool, tag_id: i64, post_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ? AND tag_id = ?")
        .bind(post_id)
        .bind(tag_id)
        .execute(pool)
        .await
        .context("Failed to remove tag from post")?;

    Ok(())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
    })
}
