use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use async_trait::async_trait;
use parking_lot::RwLock;
use crate::error::{Error, Result};
use crate::service::{AuthService, ResourceService};
use crate::types::{
    Credentials, Identity, IdentityId, IdentityPatch, Password, Registration, RegistrationResult,
    Resource, ResourceId,
};

fn offline_error() -> Error {
    Error::Network("service unreachable".to_string())
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Error::Validation(format!("invalid email address: {email}"))),
    }
}

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: Password,
}

/// In-memory account service for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuthService {
    inner: Arc<AuthInner>,
}

#[derive(Debug, Default)]
struct AuthInner {
    accounts: RwLock<HashMap<IdentityId, Account>>,
    next_id: AtomicU64,
    offline: AtomicBool,
}

impl MemoryAuthService {
    /// Creates a service with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account that can sign in with `password`.
    pub fn add_account(&self, identity: Identity, password: impl Into<Password>) {
        let mut guard = self.inner.accounts.write();
        guard.insert(
            identity.id.clone(),
            Account {
                identity,
                password: password.into(),
            },
        );
    }

    /// Returns the stored identity for `id`.
    pub fn account(&self, id: &IdentityId) -> Option<Identity> {
        let guard = self.inner.accounts.read();
        guard.get(id).map(|account| account.identity.clone())
    }

    /// Makes every call fail with a network error while set.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(offline_error());
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity> {
        self.ensure_online()?;
        let email = credentials.email.trim();
        let guard = self.inner.accounts.read();
        guard
            .values()
            .find(|account| {
                account.identity.email.eq_ignore_ascii_case(email)
                    && account.password == credentials.password
            })
            .map(|account| account.identity.clone())
            .ok_or_else(|| Error::Authentication("invalid email or password".to_string()))
    }

    async fn register(&self, registration: &Registration) -> Result<RegistrationResult> {
        self.ensure_online()?;
        validate_email(&registration.email)?;
        if registration.password.expose().is_empty() {
            return Err(Error::Validation("password must not be empty".to_string()));
        }

        let email = registration.email.trim();
        let mut guard = self.inner.accounts.write();
        if guard
            .values()
            .any(|account| account.identity.email.eq_ignore_ascii_case(email))
        {
            return Err(Error::Conflict(format!("{email} is already registered")));
        }

        let sequence = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = IdentityId::from_string(format!("user_{sequence}"));
        let identity = Identity {
            id: id.clone(),
            role: registration.role,
            email: email.to_string(),
            name: registration.name.clone(),
            phone: registration.phone.clone(),
        };
        guard.insert(
            id.clone(),
            Account {
                identity,
                password: registration.password.clone(),
            },
        );
        Ok(RegistrationResult {
            id,
            message: Some("account created".to_string()),
        })
    }

    async fn logout(&self) -> Result<()> {
        self.ensure_online()
    }

    async fn update(&self, id: &IdentityId, patch: &IdentityPatch) -> Result<Identity> {
        self.ensure_online()?;
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }

        let mut guard = self.inner.accounts.write();
        if let Some(email) = &patch.email {
            let taken = guard.values().any(|account| {
                &account.identity.id != id && account.identity.email.eq_ignore_ascii_case(email.trim())
            });
            if taken {
                return Err(Error::Conflict(format!("{email} is already registered")));
            }
        }
        let account = guard
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("account {id}")))?;
        patch.apply_to(&mut account.identity);
        if let Some(password) = &patch.password {
            account.password = password.clone();
        }
        Ok(account.identity.clone())
    }

    async fn delete(&self, id: &IdentityId) -> Result<()> {
        self.ensure_online()?;
        let mut guard = self.inner.accounts.write();
        guard
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("account {id}")))
    }
}

/// In-memory listing service for tests and demos. Keeps insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryResourceService {
    inner: Arc<ResourceInner>,
}

#[derive(Debug, Default)]
struct ResourceInner {
    resources: RwLock<Vec<Resource>>,
    offline: AtomicBool,
}

impl MemoryResourceService {
    /// Creates an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a resource or replaces the one with the same id.
    pub fn insert(&self, resource: Resource) {
        let mut guard = self.inner.resources.write();
        match guard.iter_mut().find(|existing| existing.id == resource.id) {
            Some(existing) => *existing = resource,
            None => guard.push(resource),
        }
    }

    /// Returns every stored resource regardless of owner.
    pub fn resources(&self) -> Vec<Resource> {
        self.inner.resources.read().clone()
    }

    /// Makes every call fail with a network error while set.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(offline_error());
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceService for MemoryResourceService {
    async fn list_by_owner(&self, owner: &IdentityId) -> Result<Vec<Resource>> {
        self.ensure_online()?;
        let guard = self.inner.resources.read();
        Ok(guard
            .iter()
            .filter(|resource| &resource.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &ResourceId) -> Result<()> {
        self.ensure_online()?;
        let mut guard = self.inner.resources.write();
        let position = guard
            .iter()
            .position(|resource| &resource.id == id)
            .ok_or_else(|| Error::NotFound(format!("resource {id}")))?;
        guard.remove(position);
        Ok(())
    }
}
