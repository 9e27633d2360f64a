use crate::error::{Error, Result};
use futures::future::{self, Either};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Generation number handed to a request when it starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Ticket(u64);

/// Monotonic request counter. Only the latest ticket may apply results.
#[derive(Debug, Default)]
pub(crate) struct RequestGeneration {
    latest: u64,
}

impl RequestGeneration {
    pub(crate) fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    /// True until the first ticket is issued.
    pub(crate) fn is_pristine(&self) -> bool {
        self.latest == 0
    }

    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        self.latest == ticket.0
    }
}

/// Runs `fut` until it completes or `lifetime` is cancelled.
pub(crate) async fn scoped<F, T>(lifetime: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if lifetime.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let cancelled = lifetime.cancelled();
    futures::pin_mut!(fut);
    futures::pin_mut!(cancelled);
    match future::select(fut, cancelled).await {
        Either::Left((result, _)) => result,
        Either::Right(_) => Err(Error::Cancelled),
    }
}
