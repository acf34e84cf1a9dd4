// Identity Store - user records, credential hashes and profile edits

use futures::future::try_join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::entity_store::EntityStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::media::{decode_image, MediaStore};
use crate::infrastructure::security::hash_password;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::user::{username_key, User, UserSummary};

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.]{3,30}$").expect("username pattern is valid")
});

const MIN_PASSWORD_LEN: usize = 8;
const MAX_DISPLAY_NAME_LEN: usize = 80;
const MAX_BIO_LEN: usize = 500;
const MAX_CONTACT_LEN: usize = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Partial profile update. Absent fields are left unchanged; an empty string
/// clears a text field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub contact: Option<String>,
    /// Base64 encoded image
    pub profile_image: Option<String>,
    pub is_private: Option<bool>,
}

fn check_length(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Trimmed value, `None` when blank
fn normalize_text(field: &str, value: Option<String>, max: usize) -> AppResult<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => {
            check_length(field, &v, max)?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct IdentityService {
    store: EntityStore,
    ids: Arc<IdGenerator>,
    media: Arc<dyn MediaStore>,
}

impl IdentityService {
    pub fn new(store: EntityStore, ids: Arc<IdGenerator>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, ids, media }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn signup(&self, request: SignupRequest) -> AppResult<User> {
        let username = request.username.trim().to_string();
        if !USERNAME_PATTERN.is_match(&username) {
            return Err(AppError::Validation(
                "Username must be 3-30 letters, digits, '_' or '.'".to_string(),
            ));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let mut user = User::new(
            UserId::new(self.ids.next_id()),
            username,
            hash_password(&request.password)?,
        );
        user.display_name = normalize_text("Display name", request.display_name, MAX_DISPLAY_NAME_LEN)?;
        user.bio = normalize_text("Bio", request.bio, MAX_BIO_LEN)?;
        user.contact = normalize_text("Contact", request.contact, MAX_CONTACT_LEN)?;
        user.is_private = request.is_private;

        // The unique lookup index still guards a concurrent signup with the same name
        self.store.insert(&user).await?;

        info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub async fn get_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        self.store.get::<User>(user_id.value()).await
    }

    pub async fn require_user(&self, user_id: UserId) -> AppResult<User> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.store.find_by_key::<User>(&username_key(username)).await
    }

    /// Summaries for `ids` in the given order. Ids of missing users are skipped.
    pub async fn summaries(&self, ids: &[UserId]) -> AppResult<Vec<UserSummary>> {
        let users = try_join_all(ids.iter().map(|id| self.get_user(*id))).await?;
        Ok(users.into_iter().flatten().map(|u| u.summary()).collect())
    }

    /// Edit the viewer's own profile
    #[instrument(skip(self, update), fields(user_id = %viewer.user_id))]
    pub async fn update_profile(&self, viewer: &ViewerContext, update: ProfileUpdate) -> AppResult<User> {
        let display_name = update
            .display_name
            .map(|v| normalize_text("Display name", Some(v), MAX_DISPLAY_NAME_LEN))
            .transpose()?;
        let bio = update
            .bio
            .map(|v| normalize_text("Bio", Some(v), MAX_BIO_LEN))
            .transpose()?;
        let contact = update
            .contact
            .map(|v| normalize_text("Contact", Some(v), MAX_CONTACT_LEN))
            .transpose()?;

        // Upload before opening the transaction; the store only keeps the descriptor
        let profile_image = match update.profile_image {
            Some(encoded) => Some(self.media.upload(decode_image(&encoded)?).await?),
            None => None,
        };

        let mut tx = self.store.begin().await?;
        let mut user: User = tx.require(viewer.user_id.value()).await?;

        if let Some(display_name) = display_name {
            user.display_name = display_name;
        }
        if let Some(bio) = bio {
            user.bio = bio;
        }
        if let Some(contact) = contact {
            user.contact = contact;
        }
        if let Some(image) = profile_image {
            user.profile_image = Some(image);
        }
        // Existing edges and pending requests are untouched by a privacy switch
        if let Some(is_private) = update.is_private {
            user.is_private = is_private;
        }

        tx.save(&user).await?;
        tx.commit().await?;

        debug!("Updated profile of {}", user.username);
        Ok(user)
    }
}
