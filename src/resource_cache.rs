use crate::error::{Error, Result};
use crate::lifetime::{RequestGeneration, Ticket, scoped};
use crate::listing::{ListEvent, ListState, ScreenState};
use crate::service::ResourceService;
use crate::types::{IdentityId, Resource, ResourceId};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOAD_FAILED: &str = "unable to load properties";
const MISSING_OWNER: &str = "user not authenticated or id missing";

/// The user's answer to a removal prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    /// The user confirmed the removal.
    Proceed,
    /// The user dismissed the prompt.
    Cancel,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed { Self::Proceed } else { Self::Cancel }
    }
}

/// Result of [`ResourceCache::remove`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Deleted remotely; the list was re-fetched.
    Removed,
    /// The prompt was declined; nothing was sent.
    Cancelled,
}

#[derive(Debug, Default)]
struct Inner {
    state: ListState,
    generation: RequestGeneration,
}

fn transition(state: &mut ListState, event: ListEvent) {
    *state = std::mem::take(state).apply(event);
}

/// Splits off resources that belong to someone other than `owner`.
fn owned_by(owner: &IdentityId, resources: Vec<Resource>) -> Vec<Resource> {
    let (owned, foreign): (Vec<_>, Vec<_>) = resources
        .into_iter()
        .partition(|resource| &resource.owner_id == owner);
    if !foreign.is_empty() {
        warn!(owner = %owner, discarded = foreign.len(), "listing contained resources of another owner");
    }
    owned
}

/// Owner-scoped listing for one screen.
///
/// The list is only replaced by a successful round trip; removals are never
/// applied locally. Only the most recent fetch may settle the state, and once
/// the lifetime is cancelled late results are dropped.
pub struct ResourceCache<R> {
    service: R,
    inner: Mutex<Inner>,
    lifetime: CancellationToken,
}

impl<R> ResourceCache<R>
where
    R: ResourceService,
{
    /// Creates a cache with its own lifetime; see [`ResourceCache::unmount`].
    pub fn new(service: R) -> Self {
        Self::with_lifetime(service, CancellationToken::new())
    }

    /// Creates a cache bounded by `lifetime`, e.g. a child token of the screen.
    pub fn with_lifetime(service: R, lifetime: CancellationToken) -> Self {
        Self {
            service,
            inner: Mutex::new(Inner::default()),
            lifetime,
        }
    }

    /// Returns a copy of the current list state.
    pub fn snapshot(&self) -> ListState {
        self.inner.lock().state.clone()
    }

    /// Returns the current screen state.
    pub fn screen(&self) -> ScreenState {
        self.inner.lock().state.screen()
    }

    /// Visible resources for the current query.
    pub fn filtered(&self) -> Vec<Resource> {
        self.inner
            .lock()
            .state
            .filtered()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Updates the search text; the filtered view follows immediately.
    pub fn set_query(&self, text: impl Into<String>) {
        let mut inner = self.inner.lock();
        transition(&mut inner.state, ListEvent::QueryChanged(text.into()));
    }

    /// Loads the owner's resources, replacing the list on success.
    ///
    /// On failure the previous list stays and `error` is set.
    pub async fn fetch(&self, owner: Option<&IdentityId>) -> Result<()> {
        self.load(owner, false).await
    }

    /// Same as [`ResourceCache::fetch`], flagged as a non-blocking reload.
    pub async fn refresh(&self, owner: Option<&IdentityId>) -> Result<()> {
        self.load(owner, true).await
    }

    /// Deletes a resource once the user confirmed, then re-fetches.
    ///
    /// Without an owner nothing is sent and [`Error::NotAuthenticated`] is
    /// returned. A failed delete is returned without touching the list state.
    /// A failed re-fetch still reports [`RemoveOutcome::Removed`] and leaves
    /// the stale list, with the failure visible in `error`.
    pub async fn remove(
        &self,
        id: &ResourceId,
        owner: Option<&IdentityId>,
        confirmation: Confirmation,
    ) -> Result<RemoveOutcome> {
        if confirmation == Confirmation::Cancel {
            debug!(resource = %id, "removal declined");
            return Ok(RemoveOutcome::Cancelled);
        }
        let Some(owner) = owner else {
            warn!(resource = %id, "removal requested without an owner");
            return Err(Error::NotAuthenticated);
        };
        if let Err(err) = scoped(&self.lifetime, self.service.delete(id)).await {
            warn!(resource = %id, error = %err, "resource removal failed");
            return Err(err);
        }
        info!(resource = %id, "resource removed");
        if let Err(err) = self.fetch(Some(owner)).await {
            debug!(resource = %id, error = %err, "re-fetch after removal failed");
        }
        Ok(RemoveOutcome::Removed)
    }

    /// Ends the cache lifetime. Pending and future operations become no-ops.
    pub fn unmount(&self) {
        self.lifetime.cancel();
    }

    /// Returns false once the lifetime has been cancelled.
    pub fn is_mounted(&self) -> bool {
        !self.lifetime.is_cancelled()
    }

    async fn load(&self, owner: Option<&IdentityId>, refreshing: bool) -> Result<()> {
        let ticket = self.begin(refreshing)?;
        let Some(owner) = owner else {
            warn!("listing requested without an owner");
            self.settle(ticket, ListEvent::FetchFailed(MISSING_OWNER.to_string()))?;
            return Err(Error::NotAuthenticated);
        };
        match scoped(&self.lifetime, self.service.list_by_owner(owner)).await {
            Ok(resources) => {
                let owned = owned_by(owner, resources);
                let count = owned.len();
                self.settle(ticket, ListEvent::FetchSucceeded(owned))?;
                debug!(owner = %owner, count, refreshing, "listing loaded");
                Ok(())
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(err) => {
                warn!(owner = %owner, error = %err, "listing fetch failed, keeping previous list");
                self.settle(ticket, ListEvent::FetchFailed(LOAD_FAILED.to_string()))?;
                Err(err)
            }
        }
    }

    fn begin(&self, refreshing: bool) -> Result<Ticket> {
        if self.lifetime.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let mut inner = self.inner.lock();
        let ticket = inner.generation.issue();
        transition(&mut inner.state, ListEvent::FetchStarted { refreshing });
        Ok(ticket)
    }

    fn settle(&self, ticket: Ticket, event: ListEvent) -> Result<()> {
        let mut inner = self.inner.lock();
        if self.lifetime.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !inner.generation.is_current(ticket) {
            debug!(?ticket, "discarding stale listing response");
            return Err(Error::Superseded);
        }
        transition(&mut inner.state, event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceStatus;
    use async_trait::async_trait;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct TestResources {
        resources: parking_lot::Mutex<Vec<Resource>>,
        fail_list: AtomicBool,
        fail_delete: AtomicBool,
        list_calls: AtomicUsize,
        delete_calls: AtomicUsize,
        gates: parking_lot::Mutex<VecDeque<oneshot::Receiver<Result<Vec<Resource>>>>>,
    }

    impl TestResources {
        fn holding(resources: Vec<Resource>) -> Self {
            Self {
                resources: parking_lot::Mutex::new(resources),
                ..Self::default()
            }
        }

        fn gate(&self) -> oneshot::Sender<Result<Vec<Resource>>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl ResourceService for TestResources {
        async fn list_by_owner(&self, owner: &IdentityId) -> Result<Vec<Resource>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().pop_front();
            if let Some(gate) = gate {
                return gate
                    .await
                    .unwrap_or_else(|_| Err(Error::Network("gate dropped".to_string())));
            }
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(Error::Network("offline".to_string()));
            }
            Ok(self
                .resources
                .lock()
                .iter()
                .filter(|resource| &resource.owner_id == owner)
                .cloned()
                .collect())
        }

        async fn delete(&self, id: &ResourceId) -> Result<()> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(Error::Authorization("not your property".to_string()));
            }
            let mut resources = self.resources.lock();
            let before = resources.len();
            resources.retain(|resource| &resource.id != id);
            if resources.len() == before {
                return Err(Error::NotFound(format!("resource {id}")));
            }
            Ok(())
        }
    }

    fn owner() -> IdentityId {
        IdentityId::new("owner_1").unwrap()
    }

    fn resource(id: &str, title: &str, address: &str, owner: &str) -> Resource {
        Resource {
            id: ResourceId::new(id).unwrap(),
            title: title.to_string(),
            address: address.to_string(),
            price: 1200.0,
            status: ResourceStatus::Available,
            image_url: None,
            owner_id: IdentityId::new(owner).unwrap(),
        }
    }

    fn sample() -> Vec<Resource> {
        vec![
            resource("p1", "Loft A", "12 Main St", "owner_1"),
            resource("p2", "Studio B", "5 Oak Ave", "owner_1"),
        ]
    }

    fn titles(resources: &[Resource]) -> Vec<&str> {
        resources.iter().map(|resource| resource.title.as_str()).collect()
    }

    #[test]
    fn fetch_populates_list_and_filtered_view() {
        let cache = ResourceCache::new(TestResources::holding(sample()));

        block_on(cache.fetch(Some(&owner()))).unwrap();
        cache.set_query("main");

        assert_eq!(cache.snapshot().resources().len(), 2);
        assert_eq!(titles(&cache.filtered()), vec!["Loft A"]);
        assert_eq!(cache.screen(), ScreenState::Loaded);
    }

    #[test]
    fn fetch_without_owner_sets_error_without_calling_service() {
        let cache = ResourceCache::new(TestResources::holding(sample()));

        let result = block_on(cache.fetch(None));

        assert_eq!(result, Err(Error::NotAuthenticated));
        assert_eq!(cache.snapshot().error(), Some(MISSING_OWNER));
        assert_eq!(cache.service.list_calls.load(Ordering::SeqCst), 0);
        assert!(!cache.snapshot().is_loading());
    }

    #[test]
    fn failed_fetch_keeps_list_and_next_success_clears_error() {
        let cache = ResourceCache::new(TestResources::holding(sample()));
        block_on(cache.fetch(Some(&owner()))).unwrap();

        cache.service.fail_list.store(true, Ordering::SeqCst);
        let result = block_on(cache.fetch(Some(&owner())));
        assert!(matches!(result, Err(Error::Network(_))));
        let state = cache.snapshot();
        assert_eq!(state.resources().len(), 2);
        assert_eq!(state.error(), Some(LOAD_FAILED));
        assert_eq!(state.screen(), ScreenState::Errored);

        cache.service.fail_list.store(false, Ordering::SeqCst);
        cache
            .service
            .resources
            .lock()
            .push(resource("p3", "Maison C", "3 Rue Haute", "owner_1"));
        block_on(cache.fetch(Some(&owner()))).unwrap();
        let state = cache.snapshot();
        assert!(state.error().is_none());
        assert_eq!(state.resources().len(), 3);
    }

    #[test]
    fn refresh_is_flagged_while_in_flight() {
        let cache = ResourceCache::new(TestResources::default());
        let gate = cache.service.gate();
        let owner = owner();

        let (result, during) = block_on(async {
            futures::join!(cache.refresh(Some(&owner)), async {
                let during = cache.screen();
                let _ = gate.send(Ok(sample()));
                during
            })
        });

        result.unwrap();
        assert_eq!(during, ScreenState::Refreshing);
        let state = cache.snapshot();
        assert!(!state.is_refreshing());
        assert!(!state.is_loading());
        assert_eq!(state.resources().len(), 2);
    }

    #[test]
    fn fetch_discards_resources_of_other_owners() {
        let cache = ResourceCache::new(TestResources::default());
        let gate = cache.service.gate();
        let mut mixed = sample();
        mixed.push(resource("p9", "Penthouse", "1 Sky Rd", "owner_2"));
        let _ = gate.send(Ok(mixed));

        block_on(cache.fetch(Some(&owner()))).unwrap();

        let state = cache.snapshot();
        assert_eq!(titles(state.resources()), vec!["Loft A", "Studio B"]);
    }

    #[test]
    fn set_query_recomputes_before_any_fetch() {
        let cache = ResourceCache::new(TestResources::holding(sample()));
        cache.set_query("oak");
        assert!(cache.filtered().is_empty());

        block_on(cache.fetch(Some(&owner()))).unwrap();
        assert_eq!(titles(&cache.filtered()), vec!["Studio B"]);

        cache.set_query("");
        assert_eq!(cache.filtered().len(), 2);
    }

    #[test]
    fn confirmed_remove_refetches_without_deleted_item() {
        let cache = ResourceCache::new(TestResources::holding(sample()));
        block_on(cache.fetch(Some(&owner()))).unwrap();

        let outcome = block_on(cache.remove(
            &ResourceId::new("p1").unwrap(),
            Some(&owner()),
            Confirmation::Proceed,
        ))
        .unwrap();

        assert_eq!(outcome, RemoveOutcome::Removed);
        assert_eq!(titles(cache.snapshot().resources()), vec!["Studio B"]);
        assert_eq!(cache.service.list_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn declined_remove_never_calls_service() {
        let cache = ResourceCache::new(TestResources::holding(sample()));
        block_on(cache.fetch(Some(&owner()))).unwrap();

        let outcome = block_on(cache.remove(
            &ResourceId::new("p1").unwrap(),
            Some(&owner()),
            Confirmation::from(false),
        ))
        .unwrap();

        assert_eq!(outcome, RemoveOutcome::Cancelled);
        assert_eq!(cache.service.delete_calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.snapshot().resources().len(), 2);
    }

    #[test]
    fn failed_remove_leaves_state_untouched() {
        let cache = ResourceCache::new(TestResources::holding(sample()));
        block_on(cache.fetch(Some(&owner()))).unwrap();
        cache.service.fail_delete.store(true, Ordering::SeqCst);
        let before = cache.snapshot();

        let result = block_on(cache.remove(
            &ResourceId::new("p1").unwrap(),
            Some(&owner()),
            Confirmation::Proceed,
        ));

        assert!(matches!(result, Err(Error::Authorization(_))));
        assert_eq!(cache.snapshot(), before);
        assert_eq!(cache.service.list_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_without_owner_sends_nothing() {
        let cache = ResourceCache::new(TestResources::holding(sample()));
        block_on(cache.fetch(Some(&owner()))).unwrap();
        let before = cache.snapshot();

        let result = block_on(cache.remove(
            &ResourceId::new("p1").unwrap(),
            None,
            Confirmation::Proceed,
        ));

        assert_eq!(result, Err(Error::NotAuthenticated));
        assert_eq!(cache.service.delete_calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.service.resources.lock().len(), 2);
        assert_eq!(cache.snapshot(), before);
    }

    #[test]
    fn failed_refetch_after_remove_keeps_stale_list() {
        let cache = ResourceCache::new(TestResources::holding(sample()));
        block_on(cache.fetch(Some(&owner()))).unwrap();
        cache.service.fail_list.store(true, Ordering::SeqCst);

        let outcome = block_on(cache.remove(
            &ResourceId::new("p1").unwrap(),
            Some(&owner()),
            Confirmation::Proceed,
        ))
        .unwrap();

        assert_eq!(outcome, RemoveOutcome::Removed);
        let state = cache.snapshot();
        assert_eq!(titles(state.resources()), vec!["Loft A", "Studio B"]);
        assert_eq!(state.error(), Some(LOAD_FAILED));
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let cache = ResourceCache::new(TestResources::default());
        let first_gate = cache.service.gate();
        let second_gate = cache.service.gate();
        let owner = owner();

        let (first, second, ()) = block_on(async {
            futures::join!(cache.fetch(Some(&owner)), cache.refresh(Some(&owner)), async {
                let _ = second_gate.send(Ok(vec![resource("p2", "Studio B", "5 Oak Ave", "owner_1")]));
                let _ = first_gate.send(Ok(sample()));
            })
        });

        assert_eq!(first, Err(Error::Superseded));
        assert!(second.is_ok());
        assert_eq!(titles(cache.snapshot().resources()), vec!["Studio B"]);
        assert_eq!(cache.screen(), ScreenState::Loaded);
    }

    #[test]
    fn unmount_drops_late_results() {
        let cache = ResourceCache::new(TestResources::default());
        let gate = cache.service.gate();
        let owner = owner();

        let (result, ()) = block_on(async {
            futures::join!(cache.fetch(Some(&owner)), async {
                cache.unmount();
                let _ = gate.send(Ok(sample()));
            })
        });

        assert_eq!(result, Err(Error::Cancelled));
        assert!(cache.snapshot().resources().is_empty());
        assert!(!cache.is_mounted());
        assert_eq!(block_on(cache.fetch(Some(&owner))), Err(Error::Cancelled));
    }
}
