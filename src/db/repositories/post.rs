//! Post repository
//!
//! Database operations for posts, their likes and their comment counts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Every listing query joins the author's username and annotates each post
//! with its like count. Tags and comment counts are attached afterwards by
//! the post service through the batch lookups, so a page of posts costs a
//! fixed number of queries regardless of its size.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreatePostInput, Post, PostWithMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post and link it to the tags named in `input.tags`, creating
    /// missing tags, all in one transaction.
    ///
    /// Tag titles must already be normalized. A taken slug fails with the
    /// database's unique-constraint error.
    async fn create(&self, input: &CreatePostInput, published_at: DateTime<Utc>) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostWithMeta>>;

    /// Newest posts first
    async fn latest(&self, limit: usize) -> Result<Vec<PostWithMeta>>;

    /// Posts sorted by like count descending, ties broken by newest first
    async fn popular(&self, limit: usize) -> Result<Vec<PostWithMeta>>;

    /// Newest posts carrying the given tag
    async fn list_by_tag(&self, tag_id: i64, limit: usize) -> Result<Vec<PostWithMeta>>;

    /// Comment count of every given post, in one aggregate query.
    ///
    /// Posts without comments are absent from the map.
    async fn comment_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>>;

    /// Record a like. Liking twice is a no-op.
    async fn like(&self, post_id: i64, user_id: i64) -> Result<()>;

    /// Remove a like
    async fn unlike(&self, post_id: i64, user_id: i64) -> Result<()>;

    /// Number of users who liked the post
    async fn like_count(&self, post_id: i64) -> Result<i64>;

    /// Delete a post together with its comments, likes and tag links
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput, published_at: DateTime<Utc>) -> Result<Post> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_post_sqlite(self.pool.as_sqlite().unwrap(), input, published_at).await?
            }
            DatabaseDriver::Mysql => {
                create_post_mysql(self.pool.as_mysql().unwrap(), input, published_at).await?
            }
        };

        let created = self
            .get_by_id(id)
            .await?
            .context("Created post could not be read back")?;
        Ok(created.post)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_post_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn latest(&self, limit: usize) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                latest_posts_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => latest_posts_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn popular(&self, limit: usize) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                popular_posts_sqlite(self.pool.as_sqlite().unwrap(), limit).await
            }
            DatabaseDriver::Mysql => popular_posts_mysql(self.pool.as_mysql().unwrap(), limit).await,
        }
    }

    async fn list_by_tag(&self, tag_id: i64, limit: usize) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_by_tag_sqlite(self.pool.as_sqlite().unwrap(), tag_id, limit).await
            }
            DatabaseDriver::Mysql => {
                list_posts_by_tag_mysql(self.pool.as_mysql().unwrap(), tag_id, limit).await
            }
        }
    }

    async fn comment_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                comment_counts_sqlite(self.pool.as_sqlite().unwrap(), post_ids).await
            }
            DatabaseDriver::Mysql => {
                comment_counts_mysql(self.pool.as_mysql().unwrap(), post_ids).await
            }
        }
    }

    async fn like(&self, post_id: i64, user_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                like_post_sqlite(self.pool.as_sqlite().unwrap(), post_id, user_id).await
            }
            DatabaseDriver::Mysql => {
                like_post_mysql(self.pool.as_mysql().unwrap(), post_id, user_id).await
            }
        }
    }

    async fn unlike(&self, post_id: i64, user_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unlike_post_sqlite(self.pool.as_sqlite().unwrap(), post_id, user_id).await
            }
            DatabaseDriver::Mysql => {
                unlike_post_mysql(self.pool.as_mysql().unwrap(), post_id, user_id).await
            }
        }
    }

    async fn like_count(&self, post_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                like_count_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => like_count_mysql(self.pool.as_mysql().unwrap(), post_id).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

/// Shared projection: post columns, author username and like count
const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.slug, p.image, p.published_at, p.author_id,
           u.username AS author_username,
           (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count
    FROM posts p
    INNER JOIN users u ON u.id = p.author_id
"#;

fn post_query(tail: &str) -> String {
    format!("{} {}", POST_SELECT, tail)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(
    pool: &SqlitePool,
    input: &CreatePostInput,
    published_at: DateTime<Utc>,
) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, slug, image, published_at, author_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(&input.slug)
    .bind(&input.image)
    .bind(published_at)
    .bind(input.author_id)
    .execute(&mut *tx)
    .await
    .context("Failed to create post")?;
    let post_id = result.last_insert_rowid();

    for title in &input.tags {
        sqlx::query("INSERT OR IGNORE INTO tags (title) VALUES (?)")
            .bind(title)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to create tag '{}'", title))?;
        sqlx::query(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) SELECT ?, id FROM tags WHERE title = ?",
        )
        .bind(post_id)
        .bind(title)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to tag post with '{}'", title))?;
    }

    tx.commit().await.context("Failed to commit post")?;
    Ok(post_id)
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<PostWithMeta>> {
    let row = sqlx::query(&post_query("WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn get_post_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<PostWithMeta>> {
    let row = sqlx::query(&post_query("WHERE p.slug = ?"))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn latest_posts_sqlite(pool: &SqlitePool, limit: usize) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(&post_query("ORDER BY p.published_at DESC, p.id DESC LIMIT ?"))
        .bind(limit as i64)
        .fetch_all(pool)
        .await
        .context("Failed to list latest posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn popular_posts_sqlite(pool: &SqlitePool, limit: usize) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(&post_query(
        "ORDER BY like_count DESC, p.published_at DESC, p.id DESC LIMIT ?",
    ))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to list popular posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_posts_by_tag_sqlite(
    pool: &SqlitePool,
    tag_id: i64,
    limit: usize,
) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(&post_query(
        "INNER JOIN post_tags pt ON pt.post_id = p.id WHERE pt.tag_id = ? \
         ORDER BY p.published_at DESC, p.id DESC LIMIT ?",
    ))
    .bind(tag_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to list posts by tag")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn comment_counts_sqlite(pool: &SqlitePool, post_ids: &[i64]) -> Result<HashMap<i64, i64>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT post_id, COUNT(*) AS comment_count FROM comments WHERE post_id IN (");
    let mut separated = builder.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") GROUP BY post_id");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to count comments")?;

    let mut counts = HashMap::with_capacity(rows.len());
    for row in rows {
        let post_id: i64 = row.get("post_id");
        let count: i64 = row.get("comment_count");
        counts.insert(post_id, count);
    }

    Ok(counts)
}

async fn like_post_sqlite(pool: &SqlitePool, post_id: i64, user_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?, ?)")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to like post")?;

    Ok(())
}

async fn unlike_post_sqlite(pool: &SqlitePool, post_id: i64, user_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to unlike post")?;

    Ok(())
}

async fn like_count_sqlite(pool: &SqlitePool, post_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM post_likes WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("Failed to count likes")?;

    Ok(row.get("count"))
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // comments, post_likes and post_tags go with it through ON DELETE CASCADE
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithMeta> {
    let post = Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        slug: row.get("slug"),
        image: row.get("image"),
        published_at: row.get("published_at"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
    };

    let mut meta = PostWithMeta::new(post);
    meta.like_count = row.get("like_count");
    Ok(meta)
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(
    pool: &MySqlPool,
    input: &CreatePostInput,
    published_at: DateTime<Utc>,
) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, slug, image, published_at, author_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(&input.slug)
    .bind(&input.image)
    .bind(published_at)
    .bind(input.author_id)
    .execute(&mut *tx)
    .await
    .context("Failed to create post")?;
    let post_id = result.last_insert_id() as i64;

    for title in &input.tags {
        sqlx::query("INSERT IGNORE INTO tags (title) VALUES (?)")
            .bind(title)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to create tag '{}'", title))?;
        sqlx::query(
            "INSERT IGNORE INTO post_tags (post_id, tag_id) SELECT ?, id FROM tags WHERE title = ?",
        )
        .bind(post_id)
        .bind(title)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to tag post with '{}'", title))?;
    }

    tx.commit().await.context("Failed to commit post")?;
    Ok(post_id)
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<PostWithMeta>> {
    let row = sqlx::query(&post_query("WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn get_post_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<PostWithMeta>> {
    let row = sqlx::query(&post_query("WHERE p.slug = ?"))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by slug")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn latest_posts_mysql(pool: &MySqlPool, limit: usize) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(&post_query("ORDER BY p.published_at DESC, p.id DESC LIMIT ?"))
        .bind(limit as i64)
        .fetch_all(pool)
        .await
        .context("Failed to list latest posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn popular_posts_mysql(pool: &MySqlPool, limit: usize) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(&post_query(
        "ORDER BY like_count DESC, p.published_at DESC, p.id DESC LIMIT ?",
    ))
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to list popular posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_posts_by_tag_mysql(
    pool: &MySqlPool,
    tag_id: i64,
    limit: usize,
) -> Result<Vec<PostWithMeta>> {
    let rows = sqlx::query(&post_query(
        "INNER JOIN post_tags pt ON pt.post_id = p.id WHERE pt.tag_id = ? \
         ORDER BY p.published_at DESC, p.id DESC LIMIT ?",
    ))
    .bind(tag_id)
    .bind(limit as i64)
    .fetch_all(pool)
    .await
    .context("Failed to list posts by tag")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn comment_counts_mysql(pool: &MySqlPool, post_ids: &[i64]) -> Result<HashMap<i64, i64>> {
    let mut builder: QueryBuilder<MySql> =
        QueryBuilder::new("SELECT post_id, COUNT(*) AS comment_count FROM comments WHERE post_id IN (");
    let mut separated = builder.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") GROUP BY post_id");

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to count comments")?;

    let mut counts = HashMap::with_capacity(rows.len());
    for row in rows {
        let post_id: i64 = row.get("post_id");
        let count: i64 = row.get("comment_count");
        counts.insert(post_id, count);
    }

    Ok(counts)
}

async fn like_post_mysql(pool: &MySqlPool, post_id: i64, user_id: i64) -> Result<()> {
    sqlx::query("INSERT IGNORE INTO post_likes (post_id, user_id) VALUES (?, ?)")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to like post")?;

    Ok(())
}

async fn unlike_post_mysql(pool: &MySqlPool, post_id: i64, user_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to unlike post")?;

    Ok(())
}

async fn like_count_mysql(pool: &MySqlPool, post_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM post_likes WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("Failed to count likes")?;

    Ok(row.get("count"))
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostWithMeta> {
    let post = Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        slug: row.get("slug"),
        image: row.get("image"),
        published_at: row.get("published_at"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
    };

    let mut meta = PostWithMeta::new(post);
    meta.like_count = row.get("like_count");
    Ok(meta)
}
