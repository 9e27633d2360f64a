use crate::error::{Error, Result};
use crate::lifetime::{RequestGeneration, Ticket, scoped};
use crate::service::AuthService;
use crate::session::{Landing, SessionEvent, SessionState};
use crate::store::{DEFAULT_SESSION_KEY, SessionSlot, SessionStore};
use crate::types::{Credentials, Identity, IdentityId, IdentityPatch, Registration, RegistrationResult};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const UPDATE_FAILED: &str = "Update failed";
const DELETE_FAILED: &str = "Delete failed";

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    generation: RequestGeneration,
    /// Count of settled sign-ins. A sign-out yields to any sign-in that
    /// settled after it started.
    sign_ins: u64,
    /// Set once a request has settled identity or sign-out.
    settled: bool,
}

/// A started request: its ticket and the sign-in count at that point.
#[derive(Clone, Copy, Debug)]
struct InFlight {
    ticket: Ticket,
    sign_ins: u64,
}

fn transition(state: &mut SessionState, event: SessionEvent) {
    *state = std::mem::take(state).apply(event);
}

/// Owns the session state and is the only writer of the session slot.
///
/// Every mutating operation takes a generation ticket when it starts. A
/// response whose ticket is no longer the latest is discarded and the call
/// returns [`Error::Superseded`]; the newest request alone settles `loading`,
/// `error` and the identity.
///
/// Logout and account deletion are the exception. They end the session even
/// when a newer request is pending, unless a sign-in settled after they
/// started. A profile update never revives a session that ended meanwhile.
pub struct AuthController<A, S> {
    auth: A,
    slot: SessionSlot<S>,
    inner: Mutex<Inner>,
    slot_writes: futures::lock::Mutex<()>,
    lifetime: CancellationToken,
}

/// Builder for [`AuthController`].
pub struct AuthControllerBuilder<A, S> {
    auth: A,
    store: S,
    session_key: String,
    lifetime: Option<CancellationToken>,
}

impl<A, S> AuthControllerBuilder<A, S> {
    /// Creates a builder using the default session key.
    pub fn new(auth: A, store: S) -> Self {
        Self {
            auth,
            store,
            session_key: DEFAULT_SESSION_KEY.to_string(),
            lifetime: None,
        }
    }

    /// Sets the storage key of the session slot.
    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Bounds the controller to `lifetime`. Defaults to a fresh token.
    pub fn lifetime(mut self, lifetime: CancellationToken) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Builds the controller. State starts loading until [`AuthController::bootstrap`].
    pub fn build(self) -> AuthController<A, S>
    where
        A: AuthService,
        S: SessionStore,
    {
        AuthController {
            auth: self.auth,
            slot: SessionSlot::new(self.store, self.session_key),
            inner: Mutex::new(Inner::default()),
            slot_writes: futures::lock::Mutex::new(()),
            lifetime: self.lifetime.unwrap_or_else(CancellationToken::new),
        }
    }
}

impl<A, S> AuthController<A, S>
where
    A: AuthService,
    S: SessionStore,
{
    /// Creates a controller with default configuration.
    pub fn new(auth: A, store: S) -> Self {
        AuthControllerBuilder::new(auth, store).build()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    /// Returns the signed-in identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock().state.identity.clone()
    }

    /// Routing decision; [`Landing::Pending`] until bootstrap completes.
    pub fn landing(&self) -> Landing {
        self.inner.lock().state.landing()
    }

    /// Ends the controller lifetime. In-flight results are dropped.
    pub fn shutdown(&self) {
        self.lifetime.cancel();
    }

    /// Restores the persisted session. Never fails: unreadable or corrupt
    /// records start the app signed out.
    ///
    /// A request that settled the session before the read completes takes
    /// precedence over the restored record.
    pub async fn bootstrap(&self) {
        let restored = match scoped(&self.lifetime, self.slot.load()).await {
            Ok(identity) => identity,
            Err(Error::Cancelled) => return,
            Err(err) => {
                warn!(key = self.slot.key(), error = %err, "could not restore session, starting signed out");
                None
            }
        };

        let mut inner = self.inner.lock();
        if self.lifetime.is_cancelled() {
            return;
        }
        let event = if inner.settled {
            debug!("bootstrap finished after a request settled the session, keeping its state");
            SessionEvent::BootstrapSuperseded
        } else {
            match &restored {
                Some(identity) => {
                    info!(identity = %identity.id, role = %identity.role, "session restored");
                }
                None => debug!("no persisted session"),
            }
            if inner.generation.is_pristine() {
                SessionEvent::Restored(restored)
            } else {
                SessionEvent::RestoredDuringRequest(restored)
            }
        };
        transition(&mut inner.state, event);
    }

    /// Signs in and persists the session record.
    ///
    /// A failed record write is logged; the in-memory identity stays.
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity> {
        let ticket = self.begin(SessionEvent::Started)?;
        let identity = match scoped(&self.lifetime, self.auth.authenticate(credentials)).await {
            Ok(identity) => identity,
            Err(err) => return Err(self.fail(ticket, err, LOGIN_FAILED)),
        };
        self.commit(ticket, SessionEvent::Authenticated(identity.clone()), &identity)
            .await?;
        info!(identity = %identity.id, role = %identity.role, "signed in");
        Ok(identity)
    }

    /// Creates an account without signing in.
    ///
    /// The service response is returned even when a newer request has
    /// started, since registration does not change the session.
    pub async fn register(&self, registration: &Registration) -> Result<RegistrationResult> {
        let ticket = self.begin(SessionEvent::Started)?;
        match scoped(&self.lifetime, self.auth.register(registration)).await {
            Ok(result) => {
                match self.finish(ticket, SessionEvent::Settled) {
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(err) => debug!(error = %err, "registration settled after a newer request"),
                    Ok(()) => {}
                }
                info!(identity = %result.id, "account registered");
                Ok(result)
            }
            Err(err) => Err(self.fail(ticket, err, REGISTRATION_FAILED)),
        }
    }

    /// Signs out. Remote and storage failures are logged and never block.
    ///
    /// A newer pending request does not stop the sign-out; only a sign-in
    /// that settled after logout started keeps its session.
    pub async fn logout(&self) {
        let Ok(request) = self.start(SessionEvent::SigningOut) else {
            return;
        };
        match scoped(&self.lifetime, self.auth.logout()).await {
            Ok(()) => {}
            Err(Error::Cancelled) => return,
            Err(err) => warn!(error = %err, "remote logout failed, clearing local session anyway"),
        }
        match self.sign_out(request).await {
            Ok(()) => info!("signed out"),
            Err(err) => debug!(error = %err, "logout result discarded"),
        }
    }

    /// Updates the current identity's profile and rewrites the record.
    pub async fn update_identity(&self, id: &IdentityId, patch: &IdentityPatch) -> Result<Identity> {
        let ticket = self.begin(SessionEvent::Started)?;
        let signed_in = self.inner.lock().state.is_authenticated();
        if !signed_in {
            return Err(self.fail(ticket, Error::NotAuthenticated, UPDATE_FAILED));
        }
        let identity = match scoped(&self.lifetime, self.auth.update(id, patch)).await {
            Ok(identity) => identity,
            Err(err) => return Err(self.fail(ticket, err, UPDATE_FAILED)),
        };
        self.commit(ticket, SessionEvent::Updated(identity.clone()), &identity)
            .await?;
        info!(identity = %identity.id, "profile updated");
        Ok(identity)
    }

    /// Deletes the account and ends the session.
    ///
    /// Once the service confirms, the identity and record are cleared on the
    /// same terms as [`AuthController::logout`].
    pub async fn delete_identity(&self, id: &IdentityId) -> Result<()> {
        let request = self.start(SessionEvent::Started)?;
        if let Err(err) = scoped(&self.lifetime, self.auth.delete(id)).await {
            return Err(self.fail(request.ticket, err, DELETE_FAILED));
        }
        self.sign_out(request).await?;
        info!(identity = %id, "account deleted");
        Ok(())
    }

    /// Dismisses the displayed error. Leaves identity and `loading` alone.
    pub fn clear_error(&self) {
        let mut inner = self.inner.lock();
        transition(&mut inner.state, SessionEvent::ErrorCleared);
    }

    fn begin(&self, event: SessionEvent) -> Result<Ticket> {
        self.start(event).map(|request| request.ticket)
    }

    fn start(&self, event: SessionEvent) -> Result<InFlight> {
        if self.lifetime.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let mut inner = self.inner.lock();
        let ticket = inner.generation.issue();
        transition(&mut inner.state, event);
        Ok(InFlight {
            ticket,
            sign_ins: inner.sign_ins,
        })
    }

    fn ensure_current(&self, inner: &Inner, ticket: Ticket) -> Result<()> {
        if self.lifetime.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !inner.generation.is_current(ticket) {
            debug!(?ticket, "discarding stale response");
            return Err(Error::Superseded);
        }
        Ok(())
    }

    fn finish(&self, ticket: Ticket, event: SessionEvent) -> Result<()> {
        let mut inner = self.inner.lock();
        self.ensure_current(&inner, ticket)?;
        transition(&mut inner.state, event);
        Ok(())
    }

    /// Records `err` in the state and returns the error for the caller.
    fn fail(&self, ticket: Ticket, err: Error, fallback: &str) -> Error {
        if err == Error::Cancelled {
            return err;
        }
        debug!(error = %err, "session request failed");
        match self.finish(ticket, SessionEvent::Failed(err.message_or(fallback))) {
            Ok(()) => err,
            Err(stale) => stale,
        }
    }

    /// Applies a sign-in or profile update and writes the record as one step.
    ///
    /// Slot writes are serialized and only the current ticket writes, so the
    /// stored record always matches the latest settled identity.
    async fn commit(&self, ticket: Ticket, event: SessionEvent, identity: &Identity) -> Result<()> {
        let _writes = self.slot_writes.lock().await;
        {
            let mut inner = self.inner.lock();
            self.ensure_current(&inner, ticket)?;
            match &event {
                SessionEvent::Authenticated(_) => inner.sign_ins += 1,
                SessionEvent::Updated(_) => {
                    let same_session = inner
                        .state
                        .identity
                        .as_ref()
                        .is_some_and(|current| current.id == identity.id);
                    if !same_session {
                        debug!(identity = %identity.id, "session ended before the update settled");
                        transition(&mut inner.state, SessionEvent::Settled);
                        return Err(Error::Superseded);
                    }
                }
                _ => {}
            }
            inner.settled = true;
            transition(&mut inner.state, event);
        }
        if let Err(err) = self.slot.save(identity).await {
            warn!(key = self.slot.key(), error = %err, "session record not written, keeping in-memory session");
        }
        Ok(())
    }

    /// Ends the session and deletes the record.
    ///
    /// Yields only to a sign-in that settled after `request` started. When a
    /// newer request is still pending, `loading` is left for it to settle.
    async fn sign_out(&self, request: InFlight) -> Result<()> {
        let _writes = self.slot_writes.lock().await;
        {
            let mut inner = self.inner.lock();
            if self.lifetime.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if inner.sign_ins != request.sign_ins {
                debug!(ticket = ?request.ticket, "a newer sign-in settled first, keeping its session");
                return Err(Error::Superseded);
            }
            let event = if inner.generation.is_current(request.ticket) {
                SessionEvent::SignedOut
            } else {
                SessionEvent::SessionCleared
            };
            inner.settled = true;
            transition(&mut inner.state, event);
        }
        if let Err(err) = self.slot.clear().await {
            warn!(key = self.slot.key(), error = %err, "session record not deleted");
        }
        Ok(())
    }
}
