use crate::domain::session::AccessToken;
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};

/// Why a refresh did not produce a new access token.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("no refresh token stored")]
    NoRefreshToken,
    #[error("refresh token rejected")]
    Rejected,
    #[error("identity service unreachable")]
    Network,
    #[error("malformed refresh response")]
    Malformed,
    #[error("session store unavailable")]
    Store,
    #[error("refresh timed out")]
    Timeout,
    #[error("refresh task ended without settling")]
    Abandoned,
}

impl RefreshFailure {
    /// Whether the stored session must be discarded after this failure.
    #[must_use]
    pub const fn clears_session(self) -> bool {
        !matches!(self, Self::Timeout | Self::Abandoned)
    }

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::NoRefreshToken => "no_refresh_token",
            Self::Rejected => "rejected",
            Self::Network => "network",
            Self::Malformed => "malformed",
            Self::Store => "store",
            Self::Timeout => "timeout",
            Self::Abandoned => "abandoned",
        }
    }
}

pub type RefreshOutcome = std::result::Result<AccessToken, RefreshFailure>;

#[derive(Debug)]
enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<oneshot::Sender<RefreshOutcome>> },
}

#[derive(Debug)]
struct Inner {
    state: RefreshState,
    /// Bumped every time a refresh settles.
    generation: u64,
    last_outcome: Option<RefreshOutcome>,
}

/// What a caller that saw a 401 has to do next.
#[derive(Debug)]
pub(crate) enum Entry {
    /// The caller flipped the state to refreshing and must start the refresh.
    Lead(oneshot::Receiver<RefreshOutcome>),
    /// A refresh is already in flight; wait for it.
    Wait(oneshot::Receiver<RefreshOutcome>),
    /// A refresh succeeded after the caller dispatched. The caller still has
    /// to check the token against the store before using it.
    Settled(AccessToken),
}

/// Mutual-exclusion gate around the refresh call.
///
/// The idle check and the switch to refreshing happen under one lock with no
/// await point in between, so exactly one caller can lead a refresh. Settling
/// takes the whole waiter queue and returns to idle in the same critical
/// section.
#[derive(Debug)]
pub(crate) struct RefreshCoordinator {
    inner: Mutex<Inner>,
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self { inner: Mutex::new(Inner { state: RefreshState::Idle, generation: 0, last_outcome: None }) }
    }

    /// Generation to record before dispatching a request.
    pub(crate) async fn generation(&self) -> u64 {
        self.inner.lock().await.generation
    }

    pub(crate) async fn is_refreshing(&self) -> bool {
        matches!(self.inner.lock().await.state, RefreshState::Refreshing { .. })
    }

    /// Joins the gate. `observed` is the generation the failed request was
    /// dispatched under; `None` forces a new refresh when idle. Failed
    /// outcomes are never handed out again.
    pub(crate) async fn enter(&self, observed: Option<u64>) -> Entry {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if let RefreshState::Refreshing { waiters } = &mut inner.state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            tracing::debug!(queued = waiters.len(), "Waiting on in-flight refresh");
            return Entry::Wait(rx);
        }

        if let Some(seen) = observed
            && seen < inner.generation
            && let Some(Ok(token)) = &inner.last_outcome
        {
            return Entry::Settled(token.clone());
        }

        let (tx, rx) = oneshot::channel();
        inner.state = RefreshState::Refreshing { waiters: vec![tx] };
        Entry::Lead(rx)
    }

    /// Returns to idle and hands `outcome` to every queued waiter.
    /// Returns how many waiters were flushed.
    pub(crate) async fn settle(&self, outcome: RefreshOutcome) -> usize {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let waiters = match std::mem::replace(&mut inner.state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        };
        inner.generation += 1;
        inner.last_outcome = Some(outcome.clone());

        let flushed = waiters.len();
        for waiter in waiters {
            // A waiter whose caller was dropped has nothing left to resume.
            let _ = waiter.send(outcome.clone());
        }
        flushed
    }
}
