// Feed Aggregator - merges posts and events into one reverse-chronological feed
//
// Projects stay on profile tabs and are not part of the feed. There is no
// following-only filter: every item the viewer can fully see is included.

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::UserId;
use crate::error::AppResult;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::entity_store::EntityStore;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::content::{Event, Post};
use crate::models::feed::{EventFeedItem, FeedItem, PostFeedItem};
use crate::models::user::User;
use crate::services::visibility_resolver::{resolve, Visibility};

/// Newest first; equal timestamps fall back to id, which follows insertion order
fn newest_first(a: &FeedItem, b: &FeedItem) -> Ordering {
    b.created_at()
        .cmp(&a.created_at())
        .then_with(|| b.id().cmp(&a.id()))
}

/// Authors loaded during one feed build. Missing accounts are cached as `None`.
struct AuthorCache<'a> {
    store: &'a EntityStore,
    cache: Cache<UserId, Option<Arc<User>>>,
}

impl<'a> AuthorCache<'a> {
    async fn get(&mut self, user_id: UserId) -> AppResult<Option<Arc<User>>> {
        if let Some(author) = self.cache.get(&user_id) {
            return Ok(author.clone());
        }
        let author = self.store.get::<User>(user_id.value()).await?.map(Arc::new);
        self.cache.insert(user_id, author.clone());
        Ok(author)
    }
}

#[derive(Clone)]
pub struct FeedService {
    store: EntityStore,
    author_cache_capacity: usize,
}

impl FeedService {
    pub fn new(store: EntityStore, author_cache_capacity: usize) -> Self {
        Self {
            store,
            author_cache_capacity,
        }
    }

    /// Full feed for the viewer. Not paginated; each call rebuilds from the store.
    #[instrument(skip(self), fields(viewer = %viewer.user_id))]
    pub async fn build_feed(&self, viewer: &ViewerContext) -> AppResult<Vec<FeedItem>> {
        let (posts, events) = futures::try_join!(
            self.store.list::<Post>(),
            self.store.list::<Event>()
        )?;
        let candidates = posts.len() + events.len();

        let mut authors = AuthorCache {
            store: &self.store,
            cache: Cache::new(self.author_cache_capacity),
        };
        let mut feed = Vec::with_capacity(candidates);

        for post in posts {
            let author = authors.get(post.author_id).await?;
            if resolve(viewer.user_id, author.as_deref(), None) != Visibility::Full {
                continue;
            }
            if let Some(author) = author {
                feed.push(FeedItem::Post(PostFeedItem::new(
                    post,
                    author.summary(),
                    viewer.user_id,
                )));
            }
        }

        for event in events {
            let author = authors.get(event.author_id).await?;
            if resolve(viewer.user_id, author.as_deref(), event.is_private) != Visibility::Full {
                continue;
            }
            if let Some(author) = author {
                feed.push(FeedItem::Event(EventFeedItem::new(
                    event,
                    author.summary(),
                    viewer.user_id,
                )));
            }
        }

        feed.sort_by(newest_first);

        debug!("Feed has {} of {} candidate items", feed.len(), candidates);
        Ok(feed)
    }
}
