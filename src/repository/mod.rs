// src/repository/mod.rs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::comment::{Comment, NewComment, Pagination, SortType};

pub use memory::MemoryCommentRepo;
pub use postgres::PgCommentRepo;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("comment {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage seam for comments and their counters.
///
/// Every method is one unit of work: either all of its writes become
/// visible or none do.
#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Inserts a comment and bumps the parent's `reply_count` when `parent_id > 0`.
    /// A missing parent is not an error; the counter update simply matches nothing.
    async fn save(&self, comment: NewComment) -> Result<Comment, RepoError>;

    async fn get(&self, id: i64) -> Result<Comment, RepoError>;

    /// Removes a single row without cascading or counter maintenance.
    async fn delete(&self, id: i64) -> Result<(), RepoError>;

    /// Removes the comment `id`, every comment whose `root_id == id`, and all
    /// likes on them, then recomputes `reply_count` of the surviving parents.
    async fn delete_batch(&self, id: i64) -> Result<(), RepoError>;

    /// Level-0 comments of one resource, ordered by `sort` and sliced by `page`.
    async fn list_root_comments(
        &self,
        module: i32,
        resource_id: &str,
        page: Pagination,
        sort: SortType,
    ) -> Result<Vec<Comment>, RepoError>;

    /// Every comment under the given roots, most liked first then newest first.
    /// `max_depth` and `sort` are accepted but not applied here.
    async fn list_reply_comments(
        &self,
        root_ids: &[i64],
        max_depth: i32,
        sort: SortType,
    ) -> Result<Vec<Comment>, RepoError>;

    /// Records a like and returns the new `like_count`. Liking twice is a no-op.
    async fn like_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, RepoError>;

    /// Removes a like and returns the new `like_count`. Unliking without a like is a no-op.
    async fn unlike_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, RepoError>;
}
