use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ack::AckTracker;
use super::snapshot::snapshot_frame;
use crate::Frame;

/// Identifies one registered replica link for the lifetime of the process.
pub(crate) type LinkId = u64;

/// Length of the replication ID announced in `FULLRESYNC` and `INFO`.
pub(crate) const REPLID_LEN: usize = 40;

/// If nothing was written yet and more than this many replicas are connected,
/// `WAIT` answers with the replica count right away.
const WAIT_SHORT_CIRCUIT_REPLICAS: usize = 3;

/// Leader side of replication: the replica links, the master offset and the
/// `WAIT` acknowledgement rounds.
#[derive(Debug)]
pub(crate) struct LeaderExtension {
    replid: String,
    links: Mutex<LinkSet>,
    acks: AckTracker,
}

#[derive(Debug, Default)]
struct LinkSet {
    /// Kept in registration order, which is also the propagation order.
    links: Vec<ReplicaLink>,
    next_id: LinkId,
    /// Bytes of write traffic propagated since startup.
    offset: u64,
}

#[derive(Debug)]
struct ReplicaLink {
    id: LinkId,
    listening_port: u16,
    /// Drained by the replica's connection task, which owns the socket.
    tx: mpsc::UnboundedSender<Bytes>,
    /// Bytes handed to this link so far.
    sent: u64,
    /// Offset reported by the replica's latest `REPLCONF ACK`.
    acked_offset: u64,
}

/// Point in time view of a replica link, used by `INFO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkInfo {
    pub(crate) listening_port: u16,
    pub(crate) sent: u64,
    pub(crate) acked_offset: u64,
}

impl LinkInfo {
    /// Bytes handed to the link that its replica has not acknowledged yet.
    pub(crate) fn lag(&self) -> u64 {
        self.sent.saturating_sub(self.acked_offset)
    }
}

impl LeaderExtension {
    pub(crate) fn new() -> Self {
        Self::with_replid(generate_replid())
    }

    pub(crate) fn with_replid(replid: String) -> Self {
        Self {
            replid,
            links: Mutex::new(LinkSet::default()),
            acks: AckTracker::default(),
        }
    }

    pub(crate) fn replid(&self) -> &str {
        &self.replid
    }

    pub(crate) fn offset(&self) -> u64 {
        self.links.lock().offset
    }

    /// Number of links currently in the set, including links that have
    /// failed but were not pruned by a propagation sweep yet.
    pub(crate) fn replica_count(&self) -> usize {
        self.links.lock().links.len()
    }

    pub(crate) fn links(&self) -> Vec<LinkInfo> {
        self.links
            .lock()
            .links
            .iter()
            .map(|link| LinkInfo {
                listening_port: link.listening_port,
                sent: link.sent,
                acked_offset: link.acked_offset,
            })
            .collect()
    }

    /// Add a replica link. The returned receiver yields, in order, every byte
    /// span that must be written to the replica's socket.
    pub(crate) fn register(&self, listening_port: u16) -> (LinkId, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut set = self.links.lock();
        let id = set.next_id;
        set.next_id += 1;
        set.links.push(ReplicaLink {
            id,
            listening_port,
            tx,
            sent: 0,
            acked_offset: 0,
        });
        info!(link = id, listening_port, "replica link registered");
        (id, rx)
    }

    /// The `FULLRESYNC` line followed by the snapshot payload.
    pub(crate) fn full_resync(&self) -> Vec<Frame> {
        vec![
            Frame::SimpleString(format!("FULLRESYNC {} {}", self.replid, self.offset())),
            snapshot_frame(),
        ]
    }

    /// Forward the raw bytes of an applied write command to every link and
    /// advance the master offset by their length.
    ///
    /// Links whose connection task has gone away are pruned here.
    pub(crate) fn propagate(&self, raw: Bytes) {
        let len = raw.len() as u64;
        let mut set = self.links.lock();
        set.offset += len;
        set.links.retain_mut(|link| match link.tx.send(raw.clone()) {
            Ok(()) => {
                link.sent += len;
                true
            }
            Err(_) => {
                warn!(link = link.id, "pruning closed replica link");
                false
            }
        });
        debug!(offset = set.offset, replicas = set.links.len(), "propagated write");
    }

    /// Record a `REPLCONF ACK` received on `link`.
    pub(crate) fn record_ack(&self, link: LinkId, offset: u64) {
        if let Some(entry) = self.links.lock().links.iter_mut().find(|l| l.id == link) {
            entry.acked_offset = offset;
        }
        if !self.acks.record(link) {
            debug!(link, offset, "ack outside of WAIT discarded");
        }
    }

    /// Implements `WAIT numreplicas timeout`.
    pub(crate) async fn wait_for_acks(&self, needed: usize, timeout: Duration) -> usize {
        if needed == 0 {
            return 0;
        }
        let replicas = self.replica_count();
        if self.offset() == 0 && replicas > WAIT_SHORT_CIRCUIT_REPLICAS {
            return replicas;
        }
        self.acks
            .collect(needed, timeout, || self.request_acks())
            .await
    }

    /// Send `REPLCONF GETACK *` to every link. Failures are left for the next
    /// propagation sweep to prune.
    fn request_acks(&self) {
        let getack = Frame::command(["REPLCONF", "GETACK", "*"]).to_bytes();
        let mut set = self.links.lock();
        for link in set.links.iter_mut() {
            if link.tx.send(getack.clone()).is_ok() {
                link.sent += getack.len() as u64;
            }
        }
    }
}

/// Random lowercase alphanumeric identifier, generated once per process.
pub(crate) fn generate_replid() -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..REPLID_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
