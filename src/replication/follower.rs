use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use crate::config::LeaderAddr;
use crate::frame::Decoded;
use crate::session::Session;
use crate::state::ServerState;
use crate::{cmd, Client, Connection, Error, LResult};

/// Follower side of replication: where the leader lives and how much of its
/// stream has been applied.
#[derive(Debug)]
pub(crate) struct FollowerExtension {
    leader: LeaderAddr,
    /// Bytes of the leader's command stream applied so far.
    offset: AtomicU64,
    /// Replication ID announced by the leader in `FULLRESYNC`.
    leader_replid: Mutex<Option<String>>,
}

impl FollowerExtension {
    pub(crate) fn new(leader: LeaderAddr) -> Self {
        Self {
            leader,
            offset: AtomicU64::new(0),
            leader_replid: Mutex::new(None),
        }
    }

    pub(crate) fn leader(&self) -> &LeaderAddr {
        &self.leader
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }

    pub(crate) fn advance(&self, len: usize) {
        self.offset.fetch_add(len as u64, Ordering::SeqCst);
    }

    pub(crate) fn leader_replid(&self) -> Option<String> {
        self.leader_replid.lock().clone()
    }
}

/// Connect to the leader and run the replication handshake:
/// `PING`, `REPLCONF listening-port`, `REPLCONF capa psync2`, `PSYNC ? -1`,
/// then receive the snapshot.
///
/// Every step is bounded by `limit`. On success the returned connection is
/// positioned right after the snapshot and carries the leader's command
/// stream.
pub(crate) async fn handshake(
    follower: &FollowerExtension,
    own_port: u16,
    limit: Duration,
) -> LResult<Connection<TcpStream>> {
    let addr = follower.leader().to_string();
    let mut client = step(limit, "connect", Client::connect(addr.as_str())).await?;

    let pong = step(limit, "PING", client.ping(None)).await?;
    if &pong[..] != b"PONG" {
        return Err(Error::Handshake(format!(
            "PING: expected PONG, got {}",
            String::from_utf8_lossy(&pong)
        )));
    }

    let port = own_port.to_string();
    step(
        limit,
        "REPLCONF listening-port",
        client.replconf(&["listening-port", port.as_str()]),
    )
    .await?;
    step(limit, "REPLCONF capa", client.replconf(&["capa", "psync2"])).await?;

    let (replid, offset) = step(limit, "PSYNC", client.psync("?", -1)).await?;
    let snapshot = step(limit, "snapshot", client.read_snapshot()).await?;

    info!(
        leader = %addr,
        %replid,
        offset,
        snapshot_len = snapshot.len(),
        "replication handshake complete"
    );
    *follower.leader_replid.lock() = Some(replid);

    Ok(client.into_connection())
}

async fn step<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = LResult<T>>,
) -> LResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Error::Handshake(format!("{what}: {err}"))),
        Err(_) => Err(Error::Handshake(format!("{what}: timed out after {limit:?}"))),
    }
}

/// Apply the leader's command stream until the link closes.
///
/// Only `REPLCONF GETACK` gets an answer; the offset advances by each
/// command's raw length after it has been applied.
pub(crate) async fn follow(state: ServerState, mut link: Connection<TcpStream>) {
    let Some(follower) = state.follower().cloned() else {
        return;
    };
    let mut session = Session::upstream();

    let result: LResult<()> = async {
        while let Some(Decoded { frame, raw }) = link.read_decoded().await? {
            let len = raw.len();
            for reply in cmd::dispatch(&state, &mut session, frame, raw).await {
                link.write_frame(&reply).await?;
            }
            follower.advance(len);
            debug!(offset = follower.offset(), "applied upstream command");
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => info!("leader closed the replication link"),
        Err(err) => error!(cause = %err, "replication link failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frame;
    use bytes::Bytes;
    use tokio::net::TcpListener;

    async fn link_pair() -> (Connection<TcpStream>, Connection<TcpStream>, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (follower_side, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (leader_side, _) = accepted.unwrap();
        (
            Connection::new(follower_side.unwrap()),
            Connection::new(leader_side),
            addr.port(),
        )
    }

    fn ack(offset: usize) -> Frame {
        Frame::command(["REPLCONF".to_string(), "ACK".into(), offset.to_string()])
    }

    #[tokio::test]
    async fn test_getack_reports_bytes_applied_before_it() {
        let (follower_side, mut leader, port) = link_pair().await;
        let state = ServerState::new(Some(LeaderAddr {
            host: "127.0.0.1".into(),
            port,
        }));
        let task = tokio::spawn(follow(state.clone(), follower_side));

        let set = Frame::command(["SET", "k", "v"]);
        let getack = Frame::command(["REPLCONF", "GETACK", "*"]);
        let set_len = set.to_bytes().len();
        let getack_len = getack.to_bytes().len();

        leader.write_frame(&set).await.unwrap();
        leader.write_frame(&getack).await.unwrap();
        assert_eq!(leader.read_frame().await.unwrap(), Some(ack(set_len)));

        // the first GETACK is counted once it has been answered
        leader.write_frame(&getack).await.unwrap();
        assert_eq!(
            leader.read_frame().await.unwrap(),
            Some(ack(set_len + getack_len))
        );

        assert_eq!(state.db().get("k"), Some(Bytes::from("v")));

        drop(leader);
        task.await.unwrap();
        let follower = state.follower().unwrap();
        assert_eq!(follower.offset(), (set_len + 2 * getack_len) as u64);
    }

    #[tokio::test]
    async fn test_follow_applies_writes_without_replying() {
        let (follower_side, mut leader, port) = link_pair().await;
        let state = ServerState::new(Some(LeaderAddr {
            host: "127.0.0.1".into(),
            port,
        }));
        let task = tokio::spawn(follow(state.clone(), follower_side));

        let set = Frame::command(["SET", "k", "REDIS is fun"]);
        let del = Frame::command(["DEL", "k"]);
        let getack = Frame::command(["REPLCONF", "GETACK", "*"]);
        leader.write_frame(&set).await.unwrap();
        leader.write_frame(&del).await.unwrap();
        leader.write_frame(&getack).await.unwrap();

        // no reply to SET or DEL precedes the ACK
        let expected = set.to_bytes().len() + del.to_bytes().len();
        assert_eq!(leader.read_frame().await.unwrap(), Some(ack(expected)));
        assert_eq!(state.db().get("k"), None);

        drop(leader);
        task.await.unwrap();
    }
}
