// Visibility Resolver - how much of a profile or content item a viewer may see
//
// Pure functions over already-loaded documents. A target is fully visible when
// it is public, when the viewer is its author, or when the viewer follows the
// author. Content may carry its own privacy flag; otherwise the author's
// account setting applies.

use serde::Serialize;

use crate::core::{ContentId, UserId};
use crate::models::content::{ContentItem, ContentKind};
use crate::models::user::{FullProfile, ProfileView, User, UserSummary};
use crate::services::social_graph_service::follow_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Full,
    RestrictedSummary,
    Denied,
}

/// Core rule. `author` is `None` when the owning account does not exist.
pub fn resolve(viewer: UserId, author: Option<&User>, privacy_flag: Option<bool>) -> Visibility {
    let Some(author) = author else {
        return Visibility::Denied;
    };

    let is_private = privacy_flag.unwrap_or(author.is_private);
    if !is_private || viewer == author.id || author.has_follower(viewer) {
        Visibility::Full
    } else {
        Visibility::RestrictedSummary
    }
}

pub fn resolve_profile(viewer: UserId, target: &User) -> ProfileView {
    match resolve(viewer, Some(target), None) {
        Visibility::Full => {
            ProfileView::Full(FullProfile::from_user(target, follow_status(viewer, target)))
        }
        _ => ProfileView::Restricted(target.summary()),
    }
}

/// What a viewer gets back for a single content item
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum ContentView {
    Full {
        item: ContentItem,
    },
    Restricted {
        id: ContentId,
        kind: ContentKind,
        author: UserSummary,
    },
}

/// `None` means denied; callers surface that as not found
pub fn resolve_content(viewer: UserId, author: Option<&User>, item: ContentItem) -> Option<ContentView> {
    match (resolve(viewer, author, item.privacy_flag()), author) {
        (Visibility::Full, _) => Some(ContentView::Full { item }),
        (Visibility::RestrictedSummary, Some(author)) => Some(ContentView::Restricted {
            id: item.id(),
            kind: item.kind(),
            author: author.summary(),
        }),
        _ => None,
    }
}
