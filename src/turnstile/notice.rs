//! Transient user-facing message.
//!
//! A [`Notice`] holds at most one message. [`Notice::flash`] shows a message and
//! schedules it to be cleared after a fixed delay; a newer flash replaces it and
//! restarts the clock, so an old timer never clears a newer message.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug)]
struct Inner {
    sender: watch::Sender<Option<String>>,
    generation: Mutex<u64>,
    delay: Duration,
}

/// Auto-clearing message slot. Cloning shares the slot.
#[derive(Clone, Debug)]
pub struct Notice {
    inner: Arc<Inner>,
}

impl Notice {
    /// Notice whose messages clear after `delay`.
    pub fn new(delay: Duration) -> Self {
        let (sender, _) = watch::channel(None);
        Notice {
            inner: Arc::new(Inner {
                sender,
                generation: Mutex::new(0),
                delay,
            }),
        }
    }

    /// Message currently shown.
    pub fn current(&self) -> Option<String> {
        self.inner.sender.borrow().clone()
    }

    /// Receiver notified whenever the message changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.sender.subscribe()
    }

    /// Show `message` and clear it after the configured delay.
    ///
    /// An empty message clears immediately. Must be called within a Tokio runtime.
    pub fn flash(&self, message: impl Into<String>) {
        let message = message.into();
        if message.trim().is_empty() {
            self.clear();
            return;
        }
        let generation = self.bump();
        self.inner.sender.send_replace(Some(message));

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            if *inner.generation.lock() == generation {
                inner.sender.send_replace(None);
            }
        });
    }

    /// Show `message` until replaced or cleared.
    pub fn show(&self, message: impl Into<String>) {
        self.bump();
        self.inner.sender.send_replace(Some(message.into()));
    }

    /// Remove the current message.
    pub fn clear(&self) {
        self.bump();
        self.inner.sender.send_replace(None);
    }

    fn bump(&self) -> u64 {
        let mut generation = self.inner.generation.lock();
        *generation += 1;
        *generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flash_clears_after_delay() {
        let notice = Notice::new(Duration::from_millis(30));
        notice.flash("Turnstile locked");
        assert_eq!(notice.current().as_deref(), Some("Turnstile locked"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(notice.current().is_none());
    }

    #[tokio::test]
    async fn test_newer_flash_survives_old_timer() {
        let notice = Notice::new(Duration::from_millis(60));
        notice.flash("first");
        tokio::time::sleep(Duration::from_millis(40)).await;
        notice.flash("second");
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(notice.current().as_deref(), Some("second"));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(notice.current().is_none());
    }

    #[tokio::test]
    async fn test_empty_message_clears() {
        let notice = Notice::new(Duration::from_secs(5));
        notice.show("sticky");
        notice.flash("  ");
        assert!(notice.current().is_none());
    }
}
