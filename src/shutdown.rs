use tokio::sync::broadcast;

/// A connection task's view of the server-wide shutdown signal.
///
/// The server never sends on the channel, it drops the sender. Every
/// subscribed receiver then observes `Closed`, which is treated as the
/// signal. Once seen, the signal is latched.
#[derive(Debug)]
pub(crate) struct Shutdown {
    signalled: bool,
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    pub(crate) fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            signalled: false,
            notify,
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.signalled
    }

    /// Wait for the signal. Returns immediately if it was already received.
    ///
    /// Cancel safe.
    pub(crate) async fn recv(&mut self) {
        if self.signalled {
            return;
        }
        // Lagging is impossible, at most one value is ever sent.
        let _ = self.notify.recv().await;
        self.signalled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropping_sender_signals_every_subscriber() {
        let (tx, _) = broadcast::channel::<()>(1);
        let mut first = Shutdown::new(tx.subscribe());
        let mut second = Shutdown::new(tx.subscribe());
        assert!(!first.is_shutdown());

        drop(tx);
        first.recv().await;
        second.recv().await;
        assert!(first.is_shutdown() && second.is_shutdown());
        // latched
        first.recv().await;
    }
}
