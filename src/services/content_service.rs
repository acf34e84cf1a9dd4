// Content Stores - creation, lookup, profile tabs and deletion of posts,
// events and projects, plus event attendance

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::{ContentId, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::entity_store::EntityStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::media::{decode_image, MediaDescriptor, MediaStore};
use crate::infrastructure::viewer::ViewerContext;
use crate::models::content::{
    AttendanceStatus, ContentEntity, ContentItem, ContentKind, Engagement, Event, Post, Project,
};
use crate::models::user::User;
use crate::services::visibility_resolver::{resolve, resolve_content, ContentView, Visibility};

const MAX_CAPTION_LEN: usize = 2200;
const MAX_TITLE_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 5000;
const MAX_IMAGES_PER_POST: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub caption: String,
    /// Base64 encoded images
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
}

fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> AppResult<String> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(description.to_string())
}

fn validate_link(link: &str) -> AppResult<String> {
    let link = link.trim();
    let has_host = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'));
    if !has_host || link.contains(char::is_whitespace) {
        return Err(AppError::Validation(format!(
            "Link '{}' must be an http(s) URL",
            link
        )));
    }
    Ok(link.to_string())
}

#[derive(Clone)]
pub struct ContentService {
    store: EntityStore,
    ids: Arc<IdGenerator>,
    media: Arc<dyn MediaStore>,
}

impl ContentService {
    pub fn new(store: EntityStore, ids: Arc<IdGenerator>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, ids, media }
    }

    async fn upload(&self, encoded: &str) -> AppResult<MediaDescriptor> {
        self.media.upload(decode_image(encoded)?).await
    }

    async fn upload_optional(&self, encoded: Option<&str>) -> AppResult<Option<MediaDescriptor>> {
        match encoded {
            Some(encoded) => Ok(Some(self.upload(encoded).await?)),
            None => Ok(None),
        }
    }

    async fn require_author(&self, viewer: &ViewerContext) -> AppResult<User> {
        self.store.require::<User>(viewer.user_id.value()).await
    }

    fn next_id(&self) -> ContentId {
        ContentId::new(self.ids.next_id())
    }

    #[instrument(skip(self, request), fields(author = %viewer.user_id))]
    pub async fn create_post(&self, viewer: &ViewerContext, request: CreatePostRequest) -> AppResult<Post> {
        let caption = request.caption.trim().to_string();
        if caption.is_empty() && request.images.is_empty() {
            return Err(AppError::Validation(
                "A post needs a caption or at least one image".to_string(),
            ));
        }
        if caption.chars().count() > MAX_CAPTION_LEN {
            return Err(AppError::Validation(format!(
                "Caption must be at most {} characters",
                MAX_CAPTION_LEN
            )));
        }
        if request.images.len() > MAX_IMAGES_PER_POST {
            return Err(AppError::Validation(format!(
                "A post can have at most {} images",
                MAX_IMAGES_PER_POST
            )));
        }
        self.require_author(viewer).await?;

        let mut images = Vec::with_capacity(request.images.len());
        for encoded in &request.images {
            images.push(self.upload(encoded).await?);
        }

        let post = Post {
            id: self.next_id(),
            author_id: viewer.user_id,
            caption,
            images,
            engagement: Engagement::default(),
            comments: Vec::new(),
            created_at: Utc::now(),
        };
        self.store.insert(&post).await?;

        info!("Created post {}", post.id);
        Ok(post)
    }

    #[instrument(skip(self, request), fields(author = %viewer.user_id))]
    pub async fn create_event(&self, viewer: &ViewerContext, request: CreateEventRequest) -> AppResult<Event> {
        let title = validate_title(&request.title)?;
        let description = validate_description(&request.description)?;
        if request.ends_at < request.starts_at {
            return Err(AppError::Validation(
                "Event cannot end before it starts".to_string(),
            ));
        }
        self.require_author(viewer).await?;
        let cover_image = self.upload_optional(request.cover_image.as_deref()).await?;

        let event = Event {
            id: self.next_id(),
            author_id: viewer.user_id,
            title,
            description,
            location: request.location.trim().to_string(),
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            is_private: request.is_private,
            cover_image,
            attendees: Vec::new(),
            engagement: Engagement::default(),
            comments: Vec::new(),
            created_at: Utc::now(),
        };
        self.store.insert(&event).await?;

        info!("Created event {}", event.id);
        Ok(event)
    }

    #[instrument(skip(self, request), fields(author = %viewer.user_id))]
    pub async fn create_project(
        &self,
        viewer: &ViewerContext,
        request: CreateProjectRequest,
    ) -> AppResult<Project> {
        let title = validate_title(&request.title)?;
        let description = validate_description(&request.description)?;
        let links = request
            .links
            .iter()
            .map(|link| validate_link(link))
            .collect::<AppResult<Vec<_>>>()?;
        let tech_stack: Vec<String> = request
            .tech_stack
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self.require_author(viewer).await?;
        let cover_image = self.upload_optional(request.cover_image.as_deref()).await?;

        let project = Project {
            id: self.next_id(),
            author_id: viewer.user_id,
            title,
            description,
            tech_stack,
            links,
            cover_image,
            engagement: Engagement::default(),
            comments: Vec::new(),
            created_at: Utc::now(),
        };
        self.store.insert(&project).await?;

        info!("Created project {}", project.id);
        Ok(project)
    }

    /// Load any content item by kind
    pub async fn load(&self, kind: ContentKind, id: ContentId) -> AppResult<Option<ContentItem>> {
        let id = id.value();
        Ok(match kind {
            ContentKind::Post => self.store.get::<Post>(id).await?.map(ContentEntity::into_item),
            ContentKind::Event => self.store.get::<Event>(id).await?.map(ContentEntity::into_item),
            ContentKind::Project => self.store.get::<Project>(id).await?.map(ContentEntity::into_item),
        })
    }

    pub async fn get_content(
        &self,
        viewer: &ViewerContext,
        kind: ContentKind,
        id: ContentId,
    ) -> AppResult<ContentView> {
        let not_found = || AppError::NotFound(format!("{} {} not found", kind, id));

        let item = self.load(kind, id).await?.ok_or_else(not_found)?;
        let author = self.store.get::<User>(item.author_id().value()).await?;

        debug!("Resolving {} {} for viewer {}", kind, id, viewer.user_id);
        resolve_content(viewer.user_id, author.as_ref(), item).ok_or_else(not_found)
    }

    /// Profile tab: one kind of content by `user_id`, newest first, restricted
    /// to what the viewer can fully see
    pub async fn list_user_content(
        &self,
        viewer: &ViewerContext,
        user_id: UserId,
        kind: ContentKind,
    ) -> AppResult<Vec<ContentItem>> {
        let author = self.store.require::<User>(user_id.value()).await?;
        let owner = user_id.value();

        let items: Vec<ContentItem> = match kind {
            ContentKind::Post => into_items(self.store.list_owned_by::<Post>(owner).await?),
            ContentKind::Event => into_items(self.store.list_owned_by::<Event>(owner).await?),
            ContentKind::Project => into_items(self.store.list_owned_by::<Project>(owner).await?),
        };

        Ok(items
            .into_iter()
            .filter(|item| {
                resolve(viewer.user_id, Some(&author), item.privacy_flag()) == Visibility::Full
            })
            .collect())
    }

    #[instrument(skip(self), fields(viewer = %viewer.user_id))]
    pub async fn delete_content(
        &self,
        viewer: &ViewerContext,
        kind: ContentKind,
        id: ContentId,
    ) -> AppResult<()> {
        match kind {
            ContentKind::Post => self.delete_typed::<Post>(viewer, id).await,
            ContentKind::Event => self.delete_typed::<Event>(viewer, id).await,
            ContentKind::Project => self.delete_typed::<Project>(viewer, id).await,
        }
    }

    async fn delete_typed<T: ContentEntity>(&self, viewer: &ViewerContext, id: ContentId) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let item: T = tx.require(id.value()).await?;

        if item.author_id() != viewer.user_id {
            return Err(AppError::NotAuthorized(format!(
                "Only the author can delete {} {}",
                T::KIND,
                id
            )));
        }

        tx.delete::<T>(id.value()).await?;
        tx.commit().await?;

        info!("Deleted {} {}", T::KIND, id);
        Ok(())
    }

    /// Mark the viewer as going to / interested in an event they can see
    #[instrument(skip(self), fields(viewer = %viewer.user_id))]
    pub async fn set_attendance(
        &self,
        viewer: &ViewerContext,
        event_id: ContentId,
        status: AttendanceStatus,
    ) -> AppResult<Event> {
        let mut tx = self.store.begin().await?;
        let mut event: Event = tx.require(event_id.value()).await?;
        let author: Option<User> = tx.get(event.author_id.value()).await?;

        if resolve(viewer.user_id, author.as_ref(), event.is_private) != Visibility::Full {
            return Err(AppError::NotAuthorized(format!(
                "Event {} is not visible to you",
                event_id
            )));
        }

        event.set_attendance(viewer.user_id, status);
        tx.save(&event).await?;
        tx.commit().await?;

        debug!("{} is {:?} for event {}", viewer.user_id, status, event_id);
        Ok(event)
    }

    #[instrument(skip(self), fields(viewer = %viewer.user_id))]
    pub async fn clear_attendance(&self, viewer: &ViewerContext, event_id: ContentId) -> AppResult<Event> {
        let mut tx = self.store.begin().await?;
        let mut event: Event = tx.require(event_id.value()).await?;

        if !event.clear_attendance(viewer.user_id) {
            return Err(AppError::Conflict(format!(
                "Not attending event {}",
                event_id
            )));
        }
        tx.save(&event).await?;
        tx.commit().await?;

        Ok(event)
    }
}

fn into_items<T: ContentEntity>(items: Vec<T>) -> Vec<ContentItem> {
    items.into_iter().map(ContentEntity::into_item).collect()
}
