use crate::types::Resource;

/// Resources whose title or address contains `query`, ignoring case.
///
/// A blank query keeps every resource. Order is preserved.
pub fn filter_resources<'a>(resources: &'a [Resource], query: &str) -> Vec<&'a Resource> {
    if query.trim().is_empty() {
        return resources.iter().collect();
    }
    let needle = query.to_lowercase();
    resources
        .iter()
        .filter(|resource| resource.matches_lowercase(&needle))
        .collect()
}

/// Screen-level state derived from a [`ListState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenState {
    /// Nothing requested yet.
    Idle,
    /// Blocking load.
    Loading,
    /// Non-blocking reload over a shown list.
    Refreshing,
    /// A fetch succeeded and nothing is in flight.
    Loaded,
    /// The last fetch failed; any earlier list is still shown.
    Errored,
}

/// Owner-scoped listing state for one screen.
///
/// The filtered view is computed from `resources` and `query` on every read
/// and is never stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListState {
    resources: Vec<Resource>,
    query: String,
    loading: bool,
    refreshing: bool,
    error: Option<String>,
    loaded: bool,
}

/// Inputs to [`ListState::apply`].
#[derive(Clone, Debug, PartialEq)]
pub enum ListEvent {
    /// A fetch or refresh was issued.
    FetchStarted { refreshing: bool },
    /// The service returned the owner's resources.
    FetchSucceeded(Vec<Resource>),
    /// The list is left as it was.
    FetchFailed(String),
    QueryChanged(String),
}

impl ListState {
    /// Returns the state after `event`. Performs no I/O.
    pub fn apply(mut self, event: ListEvent) -> Self {
        match event {
            ListEvent::FetchStarted { refreshing } => {
                self.loading = true;
                self.refreshing = refreshing;
                self.error = None;
            }
            ListEvent::FetchSucceeded(resources) => {
                self.resources = resources;
                self.loading = false;
                self.refreshing = false;
                self.loaded = true;
            }
            ListEvent::FetchFailed(message) => {
                self.error = Some(message);
                self.loading = false;
                self.refreshing = false;
            }
            ListEvent::QueryChanged(query) => {
                self.query = query;
            }
        }
        self
    }

    /// The full list from the last successful fetch.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Returns the current search text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The visible subset for the current query.
    pub fn filtered(&self) -> Vec<&Resource> {
        filter_resources(&self.resources, &self.query)
    }

    /// Returns true while a fetch or refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns true while the in-flight fetch is a refresh.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Returns the message of the last failed fetch, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a fetch has ever succeeded for this screen.
    pub fn has_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns the screen state for this list.
    pub fn screen(&self) -> ScreenState {
        if self.loading && self.refreshing {
            ScreenState::Refreshing
        } else if self.loading {
            ScreenState::Loading
        } else if self.error.is_some() {
            ScreenState::Errored
        } else if self.loaded {
            ScreenState::Loaded
        } else {
            ScreenState::Idle
        }
    }
}
