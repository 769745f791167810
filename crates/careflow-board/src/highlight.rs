//! Transient highlight of the last touched card
//!
//! [`HighlightTimer::touch`] shows a card as "just changed" and schedules a
//! return to no highlight. Only one timer is ever live: a new touch replaces
//! the pending one, and dropping the timer cancels it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// How long a touched card stays highlighted
pub const DEFAULT_HIGHLIGHT_DURATION: Duration = Duration::from_secs(4);

struct Inner {
    /// Bumped on every touch; a timer only clears the highlight it set
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    tx: watch::Sender<Option<String>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Single-slot expiring highlight
pub struct HighlightTimer {
    duration: Duration,
    shared: Arc<Shared>,
}

impl HighlightTimer {
    /// Create a timer with the given highlight duration
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            duration,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    pending: None,
                }),
                tx,
            }),
        }
    }

    /// Highlight duration
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Currently highlighted card id
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.shared.tx.borrow().clone()
    }

    /// Watch highlight changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.shared.tx.subscribe()
    }

    /// Whether an un-highlight is scheduled
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.shared
            .lock()
            .pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Highlight `id`, or clear immediately with `None`.
    ///
    /// Must be called from within a Tokio runtime when `id` is `Some`.
    pub fn touch(&self, id: Option<&str>) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        if let Some(handle) = inner.pending.take() {
            handle.abort();
        }
        self.shared.tx.send_replace(id.map(str::to_string));

        let Some(id) = id else {
            return;
        };

        let generation = inner.generation;
        let shared = Arc::clone(&self.shared);
        let duration = self.duration;
        let card_id = id.to_string();
        inner.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let mut inner = shared.lock();
            if inner.generation == generation {
                inner.pending = None;
                shared.tx.send_replace(None);
                debug!(card_id = %card_id, "Highlight expired");
            }
        }));
    }

    /// Cancel any pending un-highlight and clear the highlight
    pub fn cancel(&self) {
        self.touch(None);
    }
}

impl Default for HighlightTimer {
    fn default() -> Self {
        Self::new(DEFAULT_HIGHLIGHT_DURATION)
    }
}

impl Drop for HighlightTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.lock().pending.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for HighlightTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightTimer")
            .field("duration", &self.duration)
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_touch_expires() {
        let timer = HighlightTimer::default();
        timer.touch(Some("X"));
        assert_eq!(timer.current().as_deref(), Some("X"));

        tokio::time::sleep(Duration::from_millis(3_900)).await;
        assert_eq!(timer.current().as_deref(), Some("X"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(timer.current(), None);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_touch_supersedes_previous() {
        let timer = HighlightTimer::default();
        timer.touch(Some("X"));
        tokio::time::sleep(Duration::from_secs(3)).await;

        timer.touch(Some("Y"));
        tokio::time::sleep(Duration::from_secs(3)).await;
        // X's timer would have fired at 4s; Y must survive it
        assert_eq!(timer.current().as_deref(), Some("Y"));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(timer.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_none_clears_immediately() {
        let timer = HighlightTimer::default();
        timer.touch(Some("X"));
        assert!(timer.is_pending());

        timer.touch(None);
        assert_eq!(timer.current(), None);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_changes() {
        let timer = HighlightTimer::new(Duration::from_secs(1));
        let mut rx = timer.subscribe();

        timer.touch(Some("appt-1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_deref(), Some("appt-1"));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_timer() {
        let timer = HighlightTimer::default();
        let rx = timer.subscribe();
        timer.touch(Some("X"));
        drop(timer);

        tokio::time::sleep(Duration::from_secs(5)).await;
        // The sender is gone and nothing cleared the last value
        assert_eq!(rx.borrow().as_deref(), Some("X"));
    }
}
