// src/usecase.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    models::comment::{Comment, NewComment, Pagination, SortType},
    repository::{CommentRepo, RepoError},
    tree::build_tree,
};

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("comment {0} not found")]
    NotFound(i64),

    #[error("invalid comment: {0}")]
    Validation(String),

    /// Storage failure reported to the client as a bad request.
    #[error("{0}")]
    BadRequest(String),

    #[error("storage failure: {0}")]
    Storage(#[source] RepoError),
}

impl From<RepoError> for CommentError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => CommentError::NotFound(id),
            other => CommentError::Storage(other),
        }
    }
}

/// Orchestrates repository calls and tree assembly for the comment API.
#[derive(Clone)]
pub struct CommentUsecase {
    repo: Arc<dyn CommentRepo>,
}

impl CommentUsecase {
    pub fn new(repo: Arc<dyn CommentRepo>) -> Self {
        Self { repo }
    }

    /// Validates and stores a new comment.
    pub async fn create_comment(&self, comment: NewComment) -> Result<Comment, CommentError> {
        tracing::debug!(
            "create comment: user_id={} resource_id={} parent_id={}",
            comment.user_id,
            comment.resource_id,
            comment.parent_id
        );

        comment
            .validate()
            .map_err(|e| CommentError::Validation(e.to_string()))?;

        let saved = self.repo.save(comment).await.map_err(|e| {
            tracing::error!("Failed to create comment: {:?}", e);
            CommentError::BadRequest(format!("create comment error: {}", e))
        })?;

        tracing::info!("Comment {} created", saved.id);
        Ok(saved)
    }

    /// Returns one page of root comments with their replies attached.
    ///
    /// `max_depth` counts layers: 1 (or less) returns roots only and skips the
    /// reply query, 2 adds direct replies, and so on.
    pub async fn get_comments(
        &self,
        module: i32,
        resource_id: &str,
        max_depth: i32,
        page: Option<i32>,
        page_size: Option<i32>,
        sort_type: i32,
    ) -> Result<Vec<Comment>, CommentError> {
        let page = Pagination::normalize(page, page_size);
        let sort = SortType::from(sort_type);
        tracing::debug!(
            "get comments: module={} resource_id={} max_depth={} page={} page_size={} sort={:?}",
            module,
            resource_id,
            max_depth,
            page.page,
            page.page_size,
            sort
        );

        let mut roots = self
            .repo
            .list_root_comments(module, resource_id, page, sort)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list root comments: {:?}", e);
                CommentError::BadRequest(format!("get root comments error: {}", e))
            })?;

        if max_depth > 1 && !roots.is_empty() {
            let root_ids: Vec<i64> = roots.iter().map(|c| c.id).collect();
            let reply_depth = max_depth - 1;

            let replies = self
                .repo
                .list_reply_comments(&root_ids, reply_depth, sort)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to list reply comments: {:?}", e);
                    CommentError::BadRequest(format!("get reply comments error: {}", e))
                })?;

            build_tree(&mut roots, replies, reply_depth);
        }

        tracing::info!("Fetched {} root comment(s) for {}", roots.len(), resource_id);
        Ok(roots)
    }

    /// Deletes a comment together with its whole subtree and their likes.
    pub async fn delete_comment(&self, id: i64) -> Result<(), CommentError> {
        tracing::debug!("delete comment: id={}", id);

        let comment = self.repo.get(id).await.map_err(|e| {
            tracing::error!("Failed to load comment {}: {:?}", id, e);
            CommentError::from(e)
        })?;

        self.repo.delete_batch(comment.id).await.map_err(|e| {
            tracing::error!("Failed to delete comment {} and its replies: {:?}", id, e);
            CommentError::from(e)
        })?;

        tracing::info!("Comment {} deleted", id);
        Ok(())
    }

    pub async fn like_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, CommentError> {
        tracing::debug!("like comment: id={} user_id={}", comment_id, user_id);

        self.repo.like_comment(comment_id, user_id).await.map_err(|e| {
            tracing::error!("Failed to like comment {}: {:?}", comment_id, e);
            CommentError::from(e)
        })
    }

    pub async fn unlike_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, CommentError> {
        tracing::debug!("unlike comment: id={} user_id={}", comment_id, user_id);

        self.repo.unlike_comment(comment_id, user_id).await.map_err(|e| {
            tracing::error!("Failed to unlike comment {}: {:?}", comment_id, e);
            CommentError::from(e)
        })
    }
}
