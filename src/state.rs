use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::repository::CommentRepo;
use crate::usecase::CommentUsecase;

#[derive(Clone)]
pub struct AppState {
    pub comments: CommentUsecase,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<dyn CommentRepo>, config: Config) -> Self {
        Self {
            comments: CommentUsecase::new(repo),
            config,
        }
    }
}

impl FromRef<AppState> for CommentUsecase {
    fn from_ref(state: &AppState) -> Self {
        state.comments.clone()
    }
}
