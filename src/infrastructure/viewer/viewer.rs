use crate::core::UserId;

/// The authenticated user a request acts on behalf of. Every core operation
/// takes the viewer explicitly instead of reading ambient identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerContext {
    pub user_id: UserId,
}

impl ViewerContext {
    pub fn new(user_id: UserId) -> Self {
        ViewerContext { user_id }
    }
}
