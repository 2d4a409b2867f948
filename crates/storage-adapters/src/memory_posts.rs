//! # In-memory post repository
//!
//! `DashMap`-backed `PostRepository`. Used when no database URL is configured
//! and by the integration tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{AttachmentRef, Page, Post, PostFields, PostRepository, SearchFilter, StorageError};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryPostRepository {
    posts: DashMap<Uuid, Post>,
}

impl MemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create(&self, id: Uuid, fields: PostFields) -> Result<Post, StorageError> {
        let now = Utc::now();
        let post = Post {
            id,
            fields,
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        match self.posts.entry(id) {
            Entry::Occupied(_) => Err(StorageError::Backend(format!("duplicate post id {id}"))),
            Entry::Vacant(slot) => {
                slot.insert(post.clone());
                Ok(post)
            }
        }
    }

    async fn read(&self, id: Uuid) -> Result<Option<Post>, StorageError> {
        Ok(self.posts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(
        &self,
        id: Uuid,
        fields: PostFields,
        attachments: Vec<AttachmentRef>,
    ) -> Result<Option<Post>, StorageError> {
        let Some(mut entry) = self.posts.get_mut(&id) else {
            return Ok(None);
        };
        let post = entry.value_mut();
        post.fields = fields;
        post.attachments = attachments;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        Ok(self.posts.remove(&id).is_some())
    }

    async fn search(&self, filter: &SearchFilter, page: Page) -> Result<Vec<Post>, StorageError> {
        let mut matched: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| filter.matches(&entry.value().fields))
            .map(|entry| entry.value().clone())
            .collect();

        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::PAGE_SIZE;

    fn fields(title: &str) -> PostFields {
        PostFields {
            title: title.to_string(),
            ..PostFields::default()
        }
    }

    #[tokio::test]
    async fn update_replaces_fields_and_bumps_updated_at() {
        let repo = MemoryPostRepository::new();
        let id = Uuid::now_v7();
        let created = repo.create(id, fields("before")).await.unwrap();

        let updated = repo
            .update(id, fields("after"), vec![AttachmentRef::new("dbFiles/x/1-1.jpg")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.fields.title, "after");
        assert_eq!(updated.attachments.len(), 1);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn missing_posts_are_reported_without_error() {
        let repo = MemoryPostRepository::new();
        let id = Uuid::now_v7();
        assert!(repo.read(id).await.unwrap().is_none());
        assert!(repo.update(id, fields("x"), vec![]).await.unwrap().is_none());
        assert!(!repo.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn search_orders_by_most_recent_update_and_pages_by_twenty() {
        let repo = MemoryPostRepository::new();
        let mut ids = Vec::new();
        for n in 0..25 {
            let id = Uuid::now_v7();
            repo.create(id, fields(&format!("post {n}"))).await.unwrap();
            ids.push(id);
        }
        // Touch the oldest post so it moves to the front.
        repo.update(ids[0], fields("post 0"), vec![]).await.unwrap();

        let first = repo.search(&SearchFilter::default(), Page(0)).await.unwrap();
        assert_eq!(first.len() as i64, PAGE_SIZE);
        assert_eq!(first[0].id, ids[0]);

        let unskipped = repo.search(&SearchFilter::default(), Page(-1)).await.unwrap();
        assert_eq!(
            first.iter().map(|p| p.id).collect::<Vec<_>>(),
            unskipped.iter().map(|p| p.id).collect::<Vec<_>>()
        );

        let second = repo.search(&SearchFilter::default(), Page(1)).await.unwrap();
        assert_eq!(second.len(), 5);
    }

    #[tokio::test]
    async fn search_matches_any_selected_field() {
        let repo = MemoryPostRepository::new();
        let id = Uuid::now_v7();
        let mut f = fields("Crane delay");
        f.bay = "14".to_string();
        repo.create(id, f).await.unwrap();
        repo.create(Uuid::now_v7(), fields("Reefer alarm")).await.unwrap();

        let hits = repo
            .search(&SearchFilter::new(Some("CRANE".into())), Page(0))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);
    }
}
