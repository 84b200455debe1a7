use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{CommentListParams, LikeRequest, NewComment},
    usecase::CommentUsecase,
    utils::html::clean_html,
};

/// Create a new comment or reply.
pub async fn create_comment(
    State(comments): State<CommentUsecase>,
    Json(mut payload): Json<NewComment>,
) -> Result<impl IntoResponse, AppError> {
    payload.content = clean_html(&payload.content);

    let comment = comments.create_comment(payload).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List root comments of a resource with their reply trees.
pub async fn list_comments(
    State(comments): State<CommentUsecase>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tree = comments
        .get_comments(
            params.module,
            &params.resource_id,
            params.max_depth,
            params.page,
            params.page_size,
            params.sort_type,
        )
        .await?;

    Ok(Json(serde_json::json!({ "comments": tree })))
}

/// Delete a comment and every reply beneath it.
pub async fn delete_comment(
    State(comments): State<CommentUsecase>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    comments.delete_comment(id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Like a comment. Repeating the call does not count twice.
pub async fn like_comment(
    State(comments): State<CommentUsecase>,
    Path(id): Path<i64>,
    Json(payload): Json<LikeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let like_count = comments.like_comment(id, &payload.user_id).await?;

    Ok(Json(serde_json::json!({ "like_count": like_count })))
}

/// Withdraw a like.
pub async fn unlike_comment(
    State(comments): State<CommentUsecase>,
    Path(id): Path<i64>,
    Json(payload): Json<LikeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let like_count = comments.unlike_comment(id, &payload.user_id).await?;

    Ok(Json(serde_json::json!({ "like_count": like_count })))
}
