//! Identity providers for callers that resolve the user up front.

use async_trait::async_trait;

use notably_core::{CurrentUser, IdentityProvider, Result};

/// Reports a fixed caller, or nobody.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<CurrentUser>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user: Some(CurrentUser::new(user_id)),
        }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<CurrentUser>> {
        Ok(self.user.clone())
    }
}
