//! # PostgreSQL post repository
//!
//! Maps the `posts` table onto the domain `Post`. Attachments live in a
//! `TEXT[]` column so their order is stored with the row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{AttachmentRef, Page, Post, PostFields, PostRepository, SearchFilter, StorageError};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, title, text, vessel_code, bay, is_hold, is_ld, attachments, created_at, updated_at";

pub struct PgPostRepository {
    pool: PgPool,
}

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn row_to_post(row: &PgRow) -> Result<Post, StorageError> {
    let attachments: Vec<String> = row.try_get("attachments").map_err(backend)?;
    Ok(Post {
        id: row.try_get("id").map_err(backend)?,
        fields: PostFields {
            title: row.try_get("title").map_err(backend)?,
            text: row.try_get("text").map_err(backend)?,
            vessel_code: row.try_get("vessel_code").map_err(backend)?,
            bay: row.try_get("bay").map_err(backend)?,
            is_hold: row.try_get("is_hold").map_err(backend)?,
            is_ld: row.try_get("is_ld").map_err(backend)?,
        },
        attachments: attachments.into_iter().map(AttachmentRef::from).collect(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(backend)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(backend)?,
    })
}

/// Escapes `%`, `_` and `\` so the needle is matched literally by `ILIKE`.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl PgPostRepository {
    /// Connects and applies the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url).await.map_err(backend)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        info!("postgres post repository ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, id: Uuid, fields: PostFields) -> Result<Post, StorageError> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO posts (id, title, text, vessel_code, bay, is_hold, is_ld, attachments, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, '{{}}', $8, $8) RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.text)
        .bind(&fields.vessel_code)
        .bind(&fields.bay)
        .bind(fields.is_hold)
        .bind(fields.is_ld)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        row_to_post(&row)
    }

    async fn read(&self, id: Uuid) -> Result<Option<Post>, StorageError> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn update(
        &self,
        id: Uuid,
        fields: PostFields,
        attachments: Vec<AttachmentRef>,
    ) -> Result<Option<Post>, StorageError> {
        let attachments: Vec<String> = attachments.into_iter().map(AttachmentRef::into_inner).collect();
        let row = sqlx::query(&format!(
            "UPDATE posts SET title = $2, text = $3, vessel_code = $4, bay = $5, is_hold = $6, \
             is_ld = $7, attachments = $8, updated_at = $9 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.text)
        .bind(&fields.vessel_code)
        .bind(&fields.bay)
        .bind(fields.is_hold)
        .bind(fields.is_ld)
        .bind(&attachments)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, filter: &SearchFilter, page: Page) -> Result<Vec<Post>, StorageError> {
        let mut query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts"));

        if let Some(needle) = filter.needle() {
            if !filter.fields.is_empty() {
                let pattern = like_pattern(needle);
                query.push(" WHERE ");
                for (i, field) in filter.fields.iter().enumerate() {
                    if i > 0 {
                        query.push(" OR ");
                    }
                    query.push(field.column()).push(" ILIKE ").push_bind(pattern.clone());
                }
            } else {
                query.push(" WHERE FALSE");
            }
        }

        query
            .push(" ORDER BY updated_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query.build().fetch_all(&self.pool).await.map_err(backend)?;
        rows.iter().map(row_to_post).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bay"), "%bay%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
