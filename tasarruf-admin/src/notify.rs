use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long a snackbar stays up unless dismissed
pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

/// Label of the dismiss action every snackbar carries
pub const DISMISS_ACTION: &str = "cancel";

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub action: &'static str,
    pub is_error: bool,
    pub expires_at: Instant,
}

/// Transient user notifications.
///
/// Cloning shares the queue, so every component can post to the same surface.
#[derive(Debug, Clone, Default)]
pub struct Snackbar {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl Snackbar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, message: impl Into<String>) {
        self.push(message.into(), false);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(message.into(), true);
    }

    fn push(&self, message: String, is_error: bool) {
        if is_error {
            log::warn!("Snackbar: {}", message);
        } else {
            log::info!("Snackbar: {}", message);
        }
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notice {
                message,
                action: DISMISS_ACTION,
                is_error,
                expires_at: Instant::now() + DEFAULT_DURATION,
            });
    }

    /// Notices still on screen, dropping the expired ones.
    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Instant::now())
    }

    pub fn active_at(&self, now: Instant) -> Vec<Notice> {
        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        notices.retain(|n| n.expires_at > now);
        notices.clone()
    }

    /// Takes every pending notice regardless of expiry.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Messages of every pending notice, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

/// Busy indicator. Loading while at least one guard is alive.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag {
    in_flight: Arc<AtomicUsize>,
}

pub struct LoadingGuard {
    in_flight: Arc<AtomicUsize>,
}

impl LoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> LoadingGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
