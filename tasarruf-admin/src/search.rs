use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use tasarruf_types::{AccountType, User};

use crate::api::{ApiClient, FetchError};
use crate::filters::filter_by_account_type;
use crate::notify::LoadingFlag;

/// Quiet period before a search-as-you-type query is sent
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1000);

/// Forwards only the last value of each burst, once `quiet` has passed
/// without a newer one.
///
/// The returned receiver closes after the input closes and any pending value
/// has been delivered. Must be called inside a tokio runtime.
pub fn debounced<T: Send + 'static>(
    mut input: mpsc::UnboundedReceiver<T>,
    quiet: Duration,
) -> mpsc::UnboundedReceiver<T> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut pending: Option<(T, Instant)> = None;
        loop {
            match pending.take() {
                None => match input.recv().await {
                    Some(value) => pending = Some((value, Instant::now() + quiet)),
                    None => break,
                },
                Some((value, deadline)) => {
                    tokio::select! {
                        next = input.recv() => match next {
                            Some(newer) => pending = Some((newer, Instant::now() + quiet)),
                            None => {
                                sleep_until(deadline).await;
                                let _ = tx.send(value);
                                break;
                            }
                        },
                        _ = sleep_until(deadline) => {
                            if tx.send(value).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    });

    rx
}

/// Keystroke side of a search box.
pub struct Debouncer<T> {
    input: Option<mpsc::UnboundedSender<T>>,
    output: mpsc::UnboundedReceiver<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        let (input, raw) = mpsc::unbounded_channel();
        Self {
            input: Some(input),
            output: debounced(raw, quiet),
        }
    }

    /// Ignored after `finish`.
    pub fn push(&self, value: T) {
        if let Some(input) = &self.input {
            let _ = input.send(value);
        }
    }

    /// No more input. `next` still yields the pending value, then `None`.
    pub fn finish(&mut self) {
        self.input = None;
    }

    /// Waits for the next settled value.
    pub async fn next(&mut self) -> Option<T> {
        self.output.recv().await
    }

    /// A settled value if one is already waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.output.try_recv().ok()
    }
}

/// Monotonic search tickets. Only the newest ticket's response is used.
#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Backend user lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_users(&self, query: &str) -> Result<Vec<User>, FetchError>;
}

#[async_trait]
impl UserDirectory for ApiClient {
    async fn find_users(&self, query: &str) -> Result<Vec<User>, FetchError> {
        Ok(self.search_users(query).await?)
    }
}

/// User search for one list screen (customers or partners).
pub struct UserSearch {
    directory: Arc<dyn UserDirectory>,
    sequencer: SearchSequencer,
    account_type: AccountType,
    loading: LoadingFlag,
}

impl UserSearch {
    pub fn new(directory: Arc<dyn UserDirectory>, account_type: AccountType, loading: LoadingFlag) -> Self {
        Self {
            directory,
            sequencer: SearchSequencer::new(),
            account_type,
            loading,
        }
    }

    /// Runs `query` and keeps users of this screen's account type.
    ///
    /// Returns `Ok(None)` when a newer search was started while this one was
    /// in flight; its result (or error) is discarded.
    pub async fn search(&self, query: &str) -> Result<Option<Vec<User>>, FetchError> {
        let ticket = self.sequencer.issue();
        log_search!("Searching {:?} (ticket {:?})", query, ticket);

        let result = {
            let _busy = self.loading.begin();
            self.directory.find_users(query).await
        };

        if !self.sequencer.is_latest(ticket) {
            log_search!("Dropping stale results for {:?} (ticket {:?})", query, ticket);
            return Ok(None);
        }

        let users = result?;
        Ok(Some(filter_by_account_type(users, &self.account_type)))
    }
}
