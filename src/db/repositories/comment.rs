//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment. `published_at` must already be resolved.
    async fn create(&self, input: &CreateCommentInput, published_at: DateTime<Utc>) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<CommentWithAuthor>>;

    /// Comments of a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Delete a comment. Returns false when it did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Comment repository implementation
pub struct CommentRepositoryImpl {
    pool: DynDatabasePool,
}

impl CommentRepositoryImpl {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for CommentRepositoryImpl {
    async fn create(&self, input: &CreateCommentInput, published_at: DateTime<Utc>) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), input, published_at).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), input, published_at).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await,
            DatabaseDriver::Mysql => list_by_post_mysql(self.pool.as_mysql().unwrap(), post_id).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, c.text, c.published_at,
           u.username AS author_username, p.title AS post_title
    FROM comments c
    INNER JOIN users u ON u.id = c.author_id
    INNER JOIN posts p ON p.id = c.post_id
"#;

// SQLite implementations

async fn create_sqlite(
    pool: &SqlitePool,
    input: &CreateCommentInput,
    published_at: DateTime<Utc>,
) -> Result<Comment> {
    let result = sqlx::query(
        "INSERT INTO comments (post_id, author_id, text, published_at) VALUES (?, ?, ?, ?)",
    )
    .bind(input.post_id)
    .bind(input.author_id)
    .bind(&input.text)
    .bind(published_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        post_id: input.post_id,
        author_id: input.author_id,
        text: input.text.clone(),
        published_at,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<CommentWithAuthor>> {
    let sql = format!("{} WHERE c.id = ?", COMMENT_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.map(|r| row_to_comment_sqlite(&r)))
}

async fn list_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let sql = format!("{} WHERE c.post_id = ? ORDER BY c.published_at ASC, c.id ASC", COMMENT_SELECT);
    let rows = sqlx::query(&sql)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows.iter().map(row_to_comment_sqlite).collect())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> CommentWithAuthor {
    CommentWithAuthor {
        comment: Comment {
            id: row.get("id"),
            post_id: row.get("post_id"),
            author_id: row.get("author_id"),
            text: row.get("text"),
            published_at: row.get("published_at"),
        },
        author_username: row.get("author_username"),
        post_title: row.get("post_title"),
    }
}

// MySQL implementations

async fn create_mysql(
    pool: &MySqlPool,
    input: &CreateCommentInput,
    published_at: DateTime<Utc>,
) -> Result<Comment> {
    let result = sqlx::query(
        "INSERT INTO comments (post_id, author_id, text, published_at) VALUES (?, ?, ?, ?)",
    )
    .bind(input.post_id)
    .bind(input.author_id)
    .bind(&input.text)
    .bind(published_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        post_id: input.post_id,
        author_id: input.author_id,
        text: input.text.clone(),
        published_at,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<CommentWithAuthor>> {
    let sql = format!("{} WHERE c.id = ?", COMMENT_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.map(|r| row_to_comment_mysql(&r)))
}

async fn list_by_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let sql = format!("{} WHERE c.post_id = ? ORDER BY c.published_at ASC, c.id ASC", COMMENT_SELECT);
    let rows = sqlx::query(&sql)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows.iter().map(row_to_comment_mysql).collect())
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> CommentWithAuthor {
    CommentWithAuthor {
        comment: Comment {
            id: row.get("id"),
            post_id: row.get("post_id"),
            author_id: row.get("author_id"),
            text: row.get("text"),
            published_at: row.get("published_at"),
        },
        author_username: row.get("author_username"),
        post_title: row.get("post_title"),
    }
}
