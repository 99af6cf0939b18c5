use bytes::Bytes;
use tokio::sync::mpsc;

use crate::replication::LinkId;

/// Where the commands read by a connection come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// A client or a replica connected to this server.
    Client,
    /// The leader's command stream, on a follower.
    Upstream,
}

/// Per-connection state consulted by command handlers.
#[derive(Debug)]
pub(crate) struct Session {
    origin: Origin,
    link: Option<LinkId>,
    /// Propagated bytes to write to this connection once it is a replica.
    propagated: Option<mpsc::UnboundedReceiver<Bytes>>,
    /// Set once the snapshot has been sent, propagated bytes are held back
    /// until then so they cannot interleave with the handshake replies.
    streaming: bool,
}

impl Session {
    pub(crate) fn client() -> Self {
        Self::new(Origin::Client)
    }

    pub(crate) fn upstream() -> Self {
        Self::new(Origin::Upstream)
    }

    fn new(origin: Origin) -> Self {
        Self {
            origin,
            link: None,
            propagated: None,
            streaming: false,
        }
    }

    pub(crate) fn is_upstream(&self) -> bool {
        self.origin == Origin::Upstream
    }

    pub(crate) fn link(&self) -> Option<LinkId> {
        self.link
    }

    /// Turn this connection into a replica link.
    pub(crate) fn attach_link(&mut self, id: LinkId, propagated: mpsc::UnboundedReceiver<Bytes>) {
        self.link = Some(id);
        self.propagated = Some(propagated);
    }

    pub(crate) fn start_streaming(&mut self) {
        self.streaming = true;
    }

    /// Next span of propagated bytes for this replica. Never resolves for
    /// connections that are not streaming replicas.
    ///
    /// Cancel safe.
    pub(crate) async fn next_propagated(&mut self) -> Option<Bytes> {
        match self.propagated.as_mut() {
            Some(rx) if self.streaming => {
                let next = rx.recv().await;
                if next.is_none() {
                    self.propagated = None;
                }
                next
            }
            _ => std::future::pending().await,
        }
    }
}
