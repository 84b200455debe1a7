use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'comment' table in the database.
///
/// `like_count` and `reply_count` are derived counters maintained by the
/// repository. `replies` only exists in memory while a tree is assembled.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,

    /// Content-type discriminator (0: video, 1: article, ...).
    pub module: i32,
    pub resource_id: String,

    /// Id of the level-0 ancestor. 0 for roots.
    pub root_id: i64,
    /// Id of the immediate parent. 0 for roots.
    pub parent_id: i64,

    pub user_id: String,
    pub username: String,
    pub avatar: String,
    pub content: String,

    /// Distance from the root; roots sit at 0.
    pub level: i32,

    pub like_count: i64,
    pub reply_count: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,

    #[sqlx(skip)]
    #[serde(default)]
    pub replies: Vec<Comment>,
}

/// Represents the 'comment_like' table: one row per (comment, user).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommentLike {
    pub id: i64,
    pub comment_id: i64,
    pub user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A comment that has not been stored yet.
/// Also the request body of `POST /api/comments`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = validate_placement))]
pub struct NewComment {
    pub module: i32,

    #[validate(length(min = 1, max = 32, message = "resource_id must be between 1 and 32 characters"))]
    pub resource_id: String,

    #[serde(default)]
    pub root_id: i64,
    #[serde(default)]
    pub parent_id: i64,

    #[validate(length(min = 1, max = 32, message = "user_id must be between 1 and 32 characters"))]
    pub user_id: String,

    #[validate(length(max = 24, message = "username must be at most 24 characters"))]
    #[serde(default)]
    pub username: String,

    #[validate(length(max = 255, message = "avatar must be at most 255 characters"))]
    #[serde(default)]
    pub avatar: String,

    #[validate(
        length(max = 5000, message = "Comment must be at most 5000 characters"),
        custom(function = validate_not_blank)
    )]
    pub content: String,

    #[validate(range(min = 0, message = "level must not be negative"))]
    #[serde(default)]
    pub level: i32,
}

fn validate_not_blank(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Comment content must not be empty".into());
        return Err(err);
    }
    Ok(())
}

fn validate_placement(c: &NewComment) -> Result<(), ValidationError> {
    let consistent = if c.level == 0 {
        c.root_id == 0 && c.parent_id == 0
    } else {
        c.root_id > 0 && c.parent_id > 0
    };

    if consistent {
        Ok(())
    } else {
        let mut err = ValidationError::new("placement");
        err.message = Some(
            "root comments must have no root_id/parent_id; replies must have both".into(),
        );
        Err(err)
    }
}

/// Ordering of root comments.
///
/// Unknown wire values fall back to `LikeCountDesc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortType {
    #[default]
    LikeCountDesc,
    CreatedAtDesc,
}

impl SortType {
    /// SQL `ORDER BY` clause for this ordering. `id` breaks exact ties.
    pub fn order_by(self) -> &'static str {
        match self {
            SortType::LikeCountDesc => "like_count DESC, created_at DESC, id DESC",
            SortType::CreatedAtDesc => "created_at DESC, id DESC",
        }
    }
}

impl From<i32> for SortType {
    fn from(value: i32) -> Self {
        match value {
            1 => SortType::CreatedAtDesc,
            _ => SortType::LikeCountDesc,
        }
    }
}

impl From<SortType> for i32 {
    fn from(value: SortType) -> Self {
        match value {
            SortType::LikeCountDesc => 0,
            SortType::CreatedAtDesc => 1,
        }
    }
}

/// How deep below its root a reply may sit to be attached to a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLimit {
    Unlimited,
    Max(i32),
}

impl DepthLimit {
    pub fn allows(self, depth: i32) -> bool {
        match self {
            DepthLimit::Unlimited => true,
            DepthLimit::Max(max) => depth <= max,
        }
    }
}

impl From<i32> for DepthLimit {
    /// Zero and negative values mean "no limit".
    fn from(value: i32) -> Self {
        if value <= 0 {
            DepthLimit::Unlimited
        } else {
            DepthLimit::Max(value)
        }
    }
}

pub const DEFAULT_PAGE: i32 = 1;
pub const DEFAULT_PAGE_SIZE: i32 = 10;

/// 1-based page window over root comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i32,
    pub page_size: i32,
}

impl Pagination {
    /// Replaces unset or non-positive values with the defaults (page 1, size 10).
    pub fn normalize(page: Option<i32>, page_size: Option<i32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE),
            page_size: page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

/// Query parameters for listing comments of a resource.
#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    pub module: i32,
    pub resource_id: String,

    /// Number of layers to return: 1 = roots only, 2 = roots + direct replies, ...
    #[serde(default)]
    pub max_depth: i32,

    pub page: Option<i32>,
    pub page_size: Option<i32>,

    /// 0 = most liked first (default), 1 = newest first.
    #[serde(default)]
    pub sort_type: i32,
}

/// Body of like/unlike requests.
#[derive(Debug, Deserialize, Validate)]
pub struct LikeRequest {
    #[validate(length(min = 1, max = 32, message = "user_id must be between 1 and 32 characters"))]
    pub user_id: String,
}
