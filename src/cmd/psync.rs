use bytes::Bytes;
use tracing::info;

use super::{Command, Reply};
use crate::replication::Role;
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Error, Frame, LResult};

/// `PSYNC replid offset`
///
/// Partial resynchronization is not supported: whatever the arguments, the
/// leader answers with `FULLRESYNC` and the snapshot, and from then on streams
/// propagated writes on this connection.
#[derive(Debug, PartialEq, Eq)]
pub struct PsyncCmd {
    replid: String,
    offset: i64,
}

impl PsyncCmd {
    pub fn new(replid: impl ToString, offset: i64) -> Self {
        Self {
            replid: replid.to_string(),
            offset,
        }
    }
}

impl Command for PsyncCmd {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized,
    {
        let replid = parse.next_string()?;
        let offset = parse.next_signed()?;
        Ok(Self { replid, offset })
    }

    #[tracing::instrument(skip_all, fields(replid = %self.replid, offset = self.offset))]
    async fn apply(self, state: &ServerState, session: &mut Session) -> LResult<Reply> {
        if state.role() != Role::Leader {
            return Err(Error::InvalidArgument(
                "PSYNC is not accepted by a replica".into(),
            ));
        }
        let leader = state.leader();

        // A replica that skipped `REPLCONF listening-port` still gets a link.
        if session.link().is_none() {
            let (id, rx) = leader.register(0);
            session.attach_link(id, rx);
        }
        session.start_streaming();
        info!(link = ?session.link(), "full resynchronization");

        Ok(Reply::frames(leader.full_resync()))
    }

    fn into_frame(self) -> LResult<crate::Frame> {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from("psync"))?;
        frame.push_bulk(Bytes::from(self.replid))?;
        frame.push_bulk(Bytes::from(self.offset.to_string()))?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeaderAddr;
    use crate::frame::Decoded;
    use bytes::BytesMut;

    #[tokio::test]
    async fn test_leader_replies_fullresync_and_snapshot() {
        let state = ServerState::new(None);
        let mut session = Session::client();
        let reply = PsyncCmd::new("?", -1)
            .apply(&state, &mut session)
            .await
            .unwrap();

        assert_eq!(reply.frames.len(), 2);
        assert_eq!(
            reply.frames[0],
            Frame::SimpleString(format!("FULLRESYNC {} 0", state.leader().replid()))
        );

        // the snapshot is framed without a trailing terminator
        let mut buf = BytesMut::new();
        reply.frames[1].encode(&mut buf);
        assert!(buf.starts_with(b"$88\r\nREDIS"));
        assert_eq!(buf.len(), "$88\r\n".len() + 88);
        let Decoded { frame, raw } = Frame::decode_snapshot(&mut buf).unwrap().unwrap();
        assert!(matches!(frame, Frame::Rdb(_)));
        assert_eq!(raw.len(), 93);
        assert!(buf.is_empty());

        assert!(session.link().is_some());
        assert_eq!(state.leader().replica_count(), 1);
    }

    #[tokio::test]
    async fn test_follower_rejects_psync() {
        let state = ServerState::new(Some(LeaderAddr {
            host: "127.0.0.1".into(),
            port: 6379,
        }));
        let result = PsyncCmd::new("?", -1)
            .apply(&state, &mut Session::client())
            .await;
        assert!(result.is_err());
        assert_eq!(state.leader().replica_count(), 0);
    }
}
