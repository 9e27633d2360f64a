use crate::error::Result;
use crate::types::{
    Credentials, Identity, IdentityId, IdentityPatch, Registration, RegistrationResult, Resource,
    ResourceId,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Remote account service.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchanges credentials for the matching identity.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity>;

    /// Creates an account. Does not sign the caller in.
    async fn register(&self, registration: &Registration) -> Result<RegistrationResult>;

    /// Ends the remote session. Failures are ignorable by callers.
    async fn logout(&self) -> Result<()>;

    /// Applies a partial profile update and returns the updated identity.
    async fn update(&self, id: &IdentityId, patch: &IdentityPatch) -> Result<Identity>;

    /// Deletes the account.
    async fn delete(&self, id: &IdentityId) -> Result<()>;
}

/// Remote listing service for owner-scoped resources.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Returns the resources owned by `owner`, in display order.
    async fn list_by_owner(&self, owner: &IdentityId) -> Result<Vec<Resource>>;

    /// Deletes a resource.
    async fn delete(&self, id: &ResourceId) -> Result<()>;
}

#[async_trait]
impl<T> AuthService for Arc<T>
where
    T: AuthService + ?Sized,
{
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity> {
        (**self).authenticate(credentials).await
    }

    async fn register(&self, registration: &Registration) -> Result<RegistrationResult> {
        (**self).register(registration).await
    }

    async fn logout(&self) -> Result<()> {
        (**self).logout().await
    }

    async fn update(&self, id: &IdentityId, patch: &IdentityPatch) -> Result<Identity> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &IdentityId) -> Result<()> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<T> ResourceService for Arc<T>
where
    T: ResourceService + ?Sized,
{
    async fn list_by_owner(&self, owner: &IdentityId) -> Result<Vec<Resource>> {
        (**self).list_by_owner(owner).await
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        (**self).delete(id).await
    }
}
