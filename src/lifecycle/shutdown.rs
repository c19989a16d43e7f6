//! Process-wide stop signal.
//!
//! `signals::spawn_signal_listener` triggers it on SIGINT/SIGTERM. Each server
//! subscribes once before it starts accepting: the plain listener feeds its
//! receiver to axum's graceful shutdown, and the TLS listener turns it into an
//! `axum_server::Handle` drain. Streams still in flight are allowed to finish
//! within the drain window.

use tokio::sync::broadcast;

/// Cloneable handle to the stop signal.
///
/// Subscribe before the task starts waiting: receivers created after
/// [`Shutdown::trigger`] do not see the signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for one listener or background task.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every subscribed listener to stop accepting. A no-op when nothing
    /// is subscribed yet.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Listeners and tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_trigger() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn trigger_without_subscribers_is_harmless() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        assert_eq!(shutdown.receiver_count(), 0);

        let mut late = shutdown.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_listeners_stop_counting() {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut rx = rx;
            let _ = rx.recv().await;
        });
        shutdown.trigger();
        task.await.unwrap();
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
