// src/repository/memory.rs

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{CommentRepo, RepoError};
use crate::models::comment::{Comment, CommentLike, NewComment, Pagination, SortType};

#[derive(Default)]
struct Store {
    next_id: i64,
    next_like_id: i64,
    comments: BTreeMap<i64, Comment>,
    /// Keyed by (comment_id, user_id), the table's unique constraint.
    likes: HashMap<(i64, String), CommentLike>,
}

impl Store {
    fn like_count(&self, comment_id: i64) -> Result<i64, RepoError> {
        self.comments
            .get(&comment_id)
            .map(|c| c.like_count)
            .ok_or(RepoError::NotFound(comment_id))
    }
}

/// In-process comment storage.
///
/// The single mutex is held for the whole of every operation, so each call
/// behaves like a serialized transaction.
#[derive(Default)]
pub struct MemoryCommentRepo {
    store: Mutex<Store>,
}

impl MemoryCommentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of like rows currently stored for a comment.
    pub async fn like_rows(&self, comment_id: i64) -> usize {
        let store = self.store.lock().await;
        store.likes.keys().filter(|(id, _)| *id == comment_id).count()
    }

    /// Every stored comment, ordered by id.
    pub async fn all(&self) -> Vec<Comment> {
        let store = self.store.lock().await;
        store.comments.values().cloned().collect()
    }
}

fn compare(sort: SortType, a: &Comment, b: &Comment) -> Ordering {
    match sort {
        SortType::LikeCountDesc => b
            .like_count
            .cmp(&a.like_count)
            .then(b.created_at.cmp(&a.created_at))
            .then(b.id.cmp(&a.id)),
        SortType::CreatedAtDesc => b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)),
    }
}

#[async_trait]
impl CommentRepo for MemoryCommentRepo {
    async fn save(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let mut store = self.store.lock().await;

        store.next_id += 1;
        let now = Utc::now();
        let saved = Comment {
            id: store.next_id,
            module: comment.module,
            resource_id: comment.resource_id,
            root_id: comment.root_id,
            parent_id: comment.parent_id,
            user_id: comment.user_id,
            username: comment.username,
            avatar: comment.avatar,
            content: comment.content,
            level: comment.level,
            like_count: 0,
            reply_count: 0,
            created_at: now,
            updated_at: now,
            replies: Vec::new(),
        };

        if saved.parent_id > 0 {
            if let Some(parent) = store.comments.get_mut(&saved.parent_id) {
                parent.reply_count += 1;
            }
        }
        store.comments.insert(saved.id, saved.clone());

        Ok(saved)
    }

    async fn get(&self, id: i64) -> Result<Comment, RepoError> {
        let store = self.store.lock().await;
        store.comments.get(&id).cloned().ok_or(RepoError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut store = self.store.lock().await;
        store
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound(id))
    }

    async fn delete_batch(&self, id: i64) -> Result<(), RepoError> {
        let mut store = self.store.lock().await;

        let ids: HashSet<i64> = store
            .comments
            .values()
            .filter(|c| c.id == id || c.root_id == id)
            .map(|c| c.id)
            .collect();

        if ids.is_empty() {
            return Ok(());
        }

        store.likes.retain(|(comment_id, _), _| !ids.contains(comment_id));

        let parent_ids: HashSet<i64> = ids
            .iter()
            .filter_map(|id| store.comments.get(id))
            .map(|c| c.parent_id)
            .filter(|p| *p > 0 && !ids.contains(p))
            .collect();

        store.comments.retain(|id, _| !ids.contains(id));

        for parent_id in parent_ids {
            let remaining = store
                .comments
                .values()
                .filter(|c| c.parent_id == parent_id)
                .count() as i64;
            if let Some(parent) = store.comments.get_mut(&parent_id) {
                parent.reply_count = remaining;
            }
        }

        Ok(())
    }

    async fn list_root_comments(
        &self,
        module: i32,
        resource_id: &str,
        page: Pagination,
        sort: SortType,
    ) -> Result<Vec<Comment>, RepoError> {
        let store = self.store.lock().await;

        let mut roots: Vec<Comment> = store
            .comments
            .values()
            .filter(|c| c.module == module && c.resource_id == resource_id && c.level == 0)
            .cloned()
            .collect();
        roots.sort_by(|a, b| compare(sort, a, b));

        Ok(roots
            .into_iter()
            .skip(page.offset().max(0) as usize)
            .take(page.limit().max(0) as usize)
            .collect())
    }

    async fn list_reply_comments(
        &self,
        root_ids: &[i64],
        _max_depth: i32,
        _sort: SortType,
    ) -> Result<Vec<Comment>, RepoError> {
        let store = self.store.lock().await;

        let roots: HashSet<i64> = root_ids.iter().copied().collect();
        let mut replies: Vec<Comment> = store
            .comments
            .values()
            .filter(|c| roots.contains(&c.root_id))
            .cloned()
            .collect();
        replies.sort_by(|a, b| compare(SortType::LikeCountDesc, a, b));

        Ok(replies)
    }

    async fn like_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, RepoError> {
        let mut store = self.store.lock().await;

        let current = store.like_count(comment_id)?;
        let key = (comment_id, user_id.to_string());
        if store.likes.contains_key(&key) {
            return Ok(current);
        }

        store.next_like_id += 1;
        let like = CommentLike {
            id: store.next_like_id,
            comment_id,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        store.likes.insert(key, like);

        let comment = store
            .comments
            .get_mut(&comment_id)
            .ok_or(RepoError::NotFound(comment_id))?;
        comment.like_count += 1;
        Ok(comment.like_count)
    }

    async fn unlike_comment(&self, comment_id: i64, user_id: &str) -> Result<i64, RepoError> {
        let mut store = self.store.lock().await;

        let current = store.like_count(comment_id)?;
        if store.likes.remove(&(comment_id, user_id.to_string())).is_none() {
            return Ok(current);
        }

        let comment = store
            .comments
            .get_mut(&comment_id)
            .ok_or(RepoError::NotFound(comment_id))?;
        comment.like_count = (comment.like_count - 1).max(0);
        Ok(comment.like_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_comment(resource: &str, root_id: i64, parent_id: i64, level: i32) -> NewComment {
        NewComment {
            module: 1,
            resource_id: resource.to_string(),
            root_id,
            parent_id,
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            avatar: String::new(),
            content: format!("comment at level {}", level),
            level,
        }
    }

    /// Checks every comment's reply_count against the live rows.
    async fn assert_reply_counts(repo: &MemoryCommentRepo) {
        let all = repo.all().await;
        for c in &all {
            let children = all.iter().filter(|o| o.parent_id == c.id).count() as i64;
            assert_eq!(c.reply_count, children, "reply_count drift on {}", c.id);
        }
    }

    #[tokio::test]
    async fn test_save_increments_parent_reply_count() {
        let repo = MemoryCommentRepo::new();
        let root = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let reply = repo.save(new_comment("a1", root.id, root.id, 1)).await.unwrap();
        repo.save(new_comment("a1", root.id, reply.id, 2)).await.unwrap();

        assert_eq!(repo.get(root.id).await.unwrap().reply_count, 1);
        assert_eq!(repo.get(reply.id).await.unwrap().reply_count, 1);
        assert_reply_counts(&repo).await;
    }

    #[tokio::test]
    async fn test_save_with_missing_parent_succeeds() {
        let repo = MemoryCommentRepo::new();
        let orphan = repo.save(new_comment("a1", 99, 99, 1)).await.unwrap();
        assert_eq!(orphan.parent_id, 99);
        assert!(repo.get(99).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_batch_removes_subtree_and_likes() {
        let repo = MemoryCommentRepo::new();
        let root = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let c2 = repo.save(new_comment("a1", root.id, root.id, 1)).await.unwrap();
        let c3 = repo.save(new_comment("a1", root.id, c2.id, 2)).await.unwrap();
        let c4 = repo.save(new_comment("a1", root.id, c2.id, 2)).await.unwrap();
        let other = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();

        repo.like_comment(c3.id, "u2").await.unwrap();
        repo.like_comment(other.id, "u2").await.unwrap();

        repo.delete_batch(root.id).await.unwrap();

        for id in [root.id, c2.id, c3.id, c4.id] {
            assert!(matches!(repo.get(id).await, Err(RepoError::NotFound(_))));
            assert_eq!(repo.like_rows(id).await, 0);
        }
        assert_eq!(repo.like_rows(other.id).await, 1);
        assert_reply_counts(&repo).await;
    }

    #[tokio::test]
    async fn test_delete_batch_of_reply_recounts_parent() {
        let repo = MemoryCommentRepo::new();
        let root = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let c2 = repo.save(new_comment("a1", root.id, root.id, 1)).await.unwrap();
        repo.save(new_comment("a1", root.id, root.id, 1)).await.unwrap();
        assert_eq!(repo.get(root.id).await.unwrap().reply_count, 2);

        repo.delete_batch(c2.id).await.unwrap();

        assert_eq!(repo.get(root.id).await.unwrap().reply_count, 1);
        assert_reply_counts(&repo).await;

        // Deleting again leaves counters untouched
        repo.delete_batch(c2.id).await.unwrap();
        assert_eq!(repo.get(root.id).await.unwrap().reply_count, 1);
    }

    #[tokio::test]
    async fn test_delete_batch_of_mid_level_reply_keeps_grandchildren() {
        let repo = MemoryCommentRepo::new();
        let root = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let c2 = repo.save(new_comment("a1", root.id, root.id, 1)).await.unwrap();
        let c3 = repo.save(new_comment("a1", root.id, c2.id, 2)).await.unwrap();

        repo.delete_batch(c2.id).await.unwrap();

        // Only rows whose root_id is the deleted id go with it
        let survivor = repo.get(c3.id).await.unwrap();
        assert_eq!(survivor.parent_id, c2.id);
        assert_eq!(survivor.root_id, root.id);
        assert!(repo.get(c2.id).await.is_err());
        assert_eq!(repo.get(root.id).await.unwrap().reply_count, 0);
    }

    #[tokio::test]
    async fn test_like_is_idempotent() {
        let repo = MemoryCommentRepo::new();
        let c = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();

        assert_eq!(repo.like_comment(c.id, "u1").await.unwrap(), 1);
        assert_eq!(repo.like_comment(c.id, "u1").await.unwrap(), 1);
        assert_eq!(repo.like_comment(c.id, "u2").await.unwrap(), 2);
        assert_eq!(repo.like_rows(c.id).await, 2);
    }

    #[tokio::test]
    async fn test_unlike_without_like_is_noop() {
        let repo = MemoryCommentRepo::new();
        let c = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        repo.like_comment(c.id, "u1").await.unwrap();

        assert_eq!(repo.unlike_comment(c.id, "u2").await.unwrap(), 1);
        assert_eq!(repo.unlike_comment(c.id, "u1").await.unwrap(), 0);
        assert_eq!(repo.unlike_comment(c.id, "u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_like_missing_comment() {
        let repo = MemoryCommentRepo::new();
        assert!(matches!(
            repo.like_comment(42, "u1").await,
            Err(RepoError::NotFound(42))
        ));
        assert_eq!(repo.like_rows(42).await, 0);
    }

    #[tokio::test]
    async fn test_list_root_comments_sort_and_page() {
        let repo = MemoryCommentRepo::new();
        let a = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let b = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let c = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        repo.save(new_comment("a1", a.id, a.id, 1)).await.unwrap();
        repo.save(new_comment("other", 0, 0, 0)).await.unwrap();

        repo.like_comment(b.id, "u1").await.unwrap();
        repo.like_comment(b.id, "u2").await.unwrap();
        repo.like_comment(a.id, "u1").await.unwrap();

        let page = Pagination::normalize(None, None);
        let by_likes = repo
            .list_root_comments(1, "a1", page, SortType::LikeCountDesc)
            .await
            .unwrap();
        let ids: Vec<i64> = by_likes.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id, c.id]);

        let newest = repo
            .list_root_comments(1, "a1", page, SortType::CreatedAtDesc)
            .await
            .unwrap();
        let ids: Vec<i64> = newest.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let second = repo
            .list_root_comments(1, "a1", Pagination::normalize(Some(2), Some(2)), SortType::LikeCountDesc)
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, c.id);
    }

    #[tokio::test]
    async fn test_list_reply_comments_returns_all_depths() {
        let repo = MemoryCommentRepo::new();
        let root = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let c2 = repo.save(new_comment("a1", root.id, root.id, 1)).await.unwrap();
        let c3 = repo.save(new_comment("a1", root.id, c2.id, 2)).await.unwrap();
        repo.like_comment(c3.id, "u1").await.unwrap();

        let replies = repo
            .list_reply_comments(&[root.id], 1, SortType::CreatedAtDesc)
            .await
            .unwrap();
        let ids: Vec<i64> = replies.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c3.id, c2.id]);

        assert!(repo.list_reply_comments(&[], 1, SortType::LikeCountDesc).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_delete_does_not_cascade() {
        let repo = MemoryCommentRepo::new();
        let root = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap();
        let reply = repo.save(new_comment("a1", root.id, root.id, 1)).await.unwrap();

        repo.delete(root.id).await.unwrap();

        assert!(repo.get(root.id).await.is_err());
        assert!(repo.get(reply.id).await.is_ok());
        assert!(matches!(repo.delete(root.id).await, Err(RepoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_likes_and_replies() {
        let repo = std::sync::Arc::new(MemoryCommentRepo::new());
        let root_id = repo.save(new_comment("a1", 0, 0, 0)).await.unwrap().id;

        let mut handles = Vec::new();
        for i in 0..50 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("u{}", i % 25);
                repo.like_comment(root_id, &user).await.unwrap();
                repo.save(new_comment("a1", root_id, root_id, 1)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let root = repo.get(root_id).await.unwrap();
        assert_eq!(root.like_count, 25);
        assert_eq!(repo.like_rows(root_id).await, 25);
        assert_eq!(root.reply_count, 50);
        assert_reply_counts(&repo).await;
    }
}
