// src/repository/postgres.rs

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{CommentRepo, RepoError};
use crate::models::comment::{Comment, NewComment, Pagination, SortType};

const COMMENT_COLUMNS: &str = "id, module, resource_id, root_id, parent_id, user_id, username, \
     avatar, content, level, like_count, reply_count, created_at, updated_at";

/// Postgres-backed comment storage.
///
/// Each multi-statement operation runs in its own transaction. An early
/// return (or a dropped future) drops the uncommitted `Transaction`, which
/// rolls it back.
#[derive(Clone)]
pub struct PgCommentRepo {
    pool: PgPool,
}

impl PgCommentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepo for PgCommentRepo {
    async fn save(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comment
                (module, resource_id, root_id, parent_id, user_id, username, avatar, content, level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(comment.module)
        .bind(&comment.resource_id)
        .bind(comment.root_id)
        .bind(comment.parent_id)
        .bind(&comment.user_id)
        .bind(&comment.username)
        .bind(&comment.avatar)
        .bind(&comment.content)
        .bind(comment.level)
        .fetch_one(&mut *tx)
        .await?;

        if saved.parent_id > 0 {
            sqlx::query("UPDATE comment SET reply_count = reply_count + 1 WHERE id = $1")
                .bind(saved.parent_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(saved)
    }

    async fn get(&self, id: i64) -> Result<Comment, RepoError> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comment WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM comment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_batch(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        // 1. Collect (and lock) the whole subtree
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM comment WHERE id = $1 OR root_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if ids.is_empty() {
            return Ok(());
        }

        // 2. Likes first, so no like row outlives its comment
        sqlx::query("DELETE FROM comment_like WHERE comment_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        // 3. Parents whose reply_count may change
        let parent_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT parent_id FROM comment WHERE id = ANY($1) AND parent_id > 0 ORDER BY parent_id",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        // 4. The comments themselves
        sqlx::query("DELETE FROM comment WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        // 5. Recount surviving parents; deleted ones are skipped.
        // Lock in a separate statement: the recount must see replies
        // committed while this transaction waited for the lock.
        let deleted: HashSet<i64> = ids.iter().copied().collect();
        let survivors: Vec<i64> = parent_ids
            .into_iter()
            .filter(|p| !deleted.contains(p))
            .collect();

        if !survivors.is_empty() {
            sqlx::query("SELECT id FROM comment WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(&survivors)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                UPDATE comment AS p
                SET reply_count = (SELECT COUNT(*) FROM comment c WHERE c.parent_id = p.id)
                WHERE p.id = ANY($1)
                "#,
            )
            .bind(&survivors)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Deleted {} comment(s) under {}", ids.len(), id);
        Ok(())
    }

    async fn list_root_comments(
        &self,
        module: i32,
        resource_id: &str,
        page: Pagination,
        sort: SortType,
    ) -> Result<Vec<Comment>, RepoError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comment
            WHERE module = $1 AND resource_id = $2 AND level = 0
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            sort.order_by()
        ))
        .bind(module)
        .bind(resource_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn list_reply_comments(
        &self,
        root_ids: &[i64],
        _max_depth: i32,
        _sort: SortType,
    ) -> Result<Vec<Comment>, RepoError> {
        if root_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Replies are always most-liked first, whatever the roots use.
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comment
            WHERE root_id = ANY($1)
            ORDER BY {}
            "#,
            SortType::LikeCountDesc.order_by()
        ))
        .bind(root_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn like_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, RepoError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent likes on the same comment
        let current: i64 =
            sqlx::query_scalar("SELECT like_count FROM comment WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepoError::NotFound(comment_id))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO comment_like (comment_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (comment_id, user_id) DO NOTHING
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // Already liked
            tx.commit().await?;
            return Ok(current);
        }

        let count: i64 = sqlx::query_scalar(
            "UPDATE comment SET like_count = like_count + 1 WHERE id = $1 RETURNING like_count",
        )
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(count)
    }

    async fn unlike_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, RepoError> {
        let mut tx = self.pool.begin().await?;

        let current: i64 =
            sqlx::query_scalar("SELECT like_count FROM comment WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepoError::NotFound(comment_id))?;

        let removed = sqlx::query("DELETE FROM comment_like WHERE comment_id = $1 AND user_id = $2")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            // Never liked
            tx.commit().await?;
            return Ok(current);
        }

        let count: i64 = sqlx::query_scalar(
            "UPDATE comment SET like_count = GREATEST(0, like_count - 1) WHERE id = $1 RETURNING like_count",
        )
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(count)
    }
}
