//! Session lifecycle and owner-scoped listing core for a property-rental client.
//!
//! [`AuthController`] owns "who is signed in, with what role", restores it
//! from a [`SessionStore`] at start-up and keeps the persisted record in step
//! with every credentialed mutation. [`ResourceCache`] drives one listing
//! screen: it fetches an owner's resources from a [`ResourceService`], applies
//! a local text filter and re-fetches after deletions. Backends are plugged in
//! through async traits.
//!
//! Overlapping requests are resolved by generation: only the most recent one
//! is allowed to settle state. Both components are bounded by a
//! [`CancellationToken`] lifetime, after which late results are dropped.
//!
//! # Examples
//!
//! Signing in against the in-memory services (enable `memory-store` and
//! `memory-service`):
//! ```no_run
//! # #[cfg(all(feature = "memory-store", feature = "memory-service"))]
//! # {
//! use futures::executor::block_on;
//! use rs_rental::{
//!     AuthController, Credentials, Identity, IdentityId, Landing, MemoryAuthService,
//!     MemorySessionStore, Role,
//! };
//! let auth = MemoryAuthService::new();
//! let owner = Identity::new(IdentityId::try_from("owner_1").unwrap(), Role::Owner, "owner@rent.fr");
//! auth.add_account(owner, "secret");
//! let controller = AuthController::new(auth, MemorySessionStore::new());
//! block_on(controller.bootstrap());
//! let _ = block_on(controller.login(&Credentials::new("owner@rent.fr", "secret")));
//! assert_eq!(controller.landing(), Landing::OwnerHome);
//! # }
//! ```
//!
//! Filtering an owner's listing:
//! ```no_run
//! # #[cfg(feature = "memory-service")]
//! # {
//! use futures::executor::block_on;
//! use rs_rental::{IdentityId, MemoryResourceService, ResourceCache};
//! let cache = ResourceCache::new(MemoryResourceService::new());
//! let owner = IdentityId::try_from("owner_1").unwrap();
//! let _ = block_on(cache.fetch(Some(&owner)));
//! cache.set_query("main");
//! let _visible = cache.filtered();
//! # }
//! ```
#![forbid(unsafe_code)]

mod controller;
mod error;
mod lifetime;
mod listing;
mod resource_cache;
mod service;
mod session;
mod store;
mod types;

#[cfg(feature = "memory-store")]
mod memory_store;

#[cfg(feature = "memory-service")]
mod memory_service;

#[cfg(feature = "file-store")]
mod file_store;

pub use crate::controller::{AuthController, AuthControllerBuilder};
pub use crate::error::{Error, Result};
pub use crate::listing::{ListEvent, ListState, ScreenState, filter_resources};
pub use crate::resource_cache::{Confirmation, RemoveOutcome, ResourceCache};
pub use crate::service::{AuthService, ResourceService};
pub use crate::session::{Landing, SessionEvent, SessionState};
pub use crate::store::{DEFAULT_SESSION_KEY, SessionStore, decode_record, encode_record};
pub use crate::types::{
    Credentials, Identity, IdentityId, IdentityPatch, Password, Registration, RegistrationResult,
    Resource, ResourceId, ResourceStatus, Role,
};
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "memory-store")]
pub use crate::memory_store::MemorySessionStore;

#[cfg(feature = "memory-service")]
pub use crate::memory_service::{MemoryAuthService, MemoryResourceService};

#[cfg(feature = "file-store")]
pub use crate::file_store::FileSessionStore;
