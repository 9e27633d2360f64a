use crate::types::{Identity, Role};

/// In-memory session state owned by the auth controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Current identity; `None` means signed out.
    pub identity: Option<Identity>,
    /// True while a request is in flight, and until bootstrap completes.
    pub loading: bool,
    /// Message of the last failed operation, kept until cleared.
    pub error: Option<String>,
    /// True once the persisted session has been read.
    pub bootstrapped: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            loading: true,
            error: None,
            bootstrapped: false,
        }
    }
}

/// Inputs to [`SessionState::apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Bootstrap read the persisted record (or found none).
    Restored(Option<Identity>),
    /// Bootstrap read the record while a request was pending. Leaves
    /// `loading` to that request.
    RestoredDuringRequest(Option<Identity>),
    /// Bootstrap finished after a request had already settled the session.
    BootstrapSuperseded,
    /// A credentialed request started.
    Started,
    /// Sign-out started. Keeps any displayed error.
    SigningOut,
    /// Sign-in succeeded with this identity.
    Authenticated(Identity),
    /// The request finished without changing the session.
    Settled,
    /// Profile update succeeded with this identity.
    Updated(Identity),
    /// Session ended by logout or account deletion.
    SignedOut,
    /// Session ended while a newer request is pending. Leaves `loading` to
    /// that request.
    SessionCleared,
    /// The request failed with this display message.
    Failed(String),
    /// The displayed error was dismissed.
    ErrorCleared,
}

/// Where the presentation layer should send the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Landing {
    /// Bootstrap has not finished; hold navigation.
    Pending,
    /// No identity; show the sign-in flow.
    SignIn,
    /// Signed in as an owner.
    OwnerHome,
    /// Signed in as a standard user.
    StandardHome,
}

impl SessionState {
    /// Returns the state after `event`. Performs no I/O.
    pub fn apply(mut self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::Restored(identity) => {
                self.identity = identity;
                self.loading = false;
                self.bootstrapped = true;
            }
            SessionEvent::RestoredDuringRequest(identity) => {
                self.identity = identity;
                self.bootstrapped = true;
            }
            SessionEvent::BootstrapSuperseded => {
                self.bootstrapped = true;
            }
            SessionEvent::Started => {
                self.loading = true;
                self.error = None;
            }
            SessionEvent::SigningOut => {
                self.loading = true;
            }
            SessionEvent::Authenticated(identity) | SessionEvent::Updated(identity) => {
                self.identity = Some(identity);
                self.loading = false;
            }
            SessionEvent::Settled => {
                self.loading = false;
            }
            SessionEvent::SignedOut => {
                self.identity = None;
                self.loading = false;
            }
            SessionEvent::SessionCleared => {
                self.identity = None;
            }
            SessionEvent::Failed(message) => {
                self.error = Some(message);
                self.loading = false;
            }
            SessionEvent::ErrorCleared => {
                self.error = None;
            }
        }
        self
    }

    /// Routing decision for the current state.
    pub fn landing(&self) -> Landing {
        if !self.bootstrapped {
            return Landing::Pending;
        }
        match self.identity.as_ref().map(|identity| identity.role) {
            None => Landing::SignIn,
            Some(Role::Owner) => Landing::OwnerHome,
            Some(Role::Standard) => Landing::StandardHome,
        }
    }

    /// Returns true when an identity is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}
