use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use super::{Command, Reply};
use crate::replication::Role;
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Error, Frame, LResult};

/// `WAIT numreplicas timeout`
///
/// Blocks until `numreplicas` replicas acknowledged or `timeout` milliseconds
/// passed, and replies with the number of acknowledgements seen. A timeout
/// of 0 checks once without waiting.
#[derive(Debug, PartialEq, Eq)]
pub struct WaitCmd {
    numreplicas: u64,
    timeout: Duration,
}

impl WaitCmd {
    pub fn new(numreplicas: u64, timeout: Duration) -> Self {
        Self {
            numreplicas,
            timeout,
        }
    }
}

impl Command for WaitCmd {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized,
    {
        let numreplicas = parse.next_int()?;
        let timeout = Duration::from_millis(parse.next_int()?);
        Ok(Self {
            numreplicas,
            timeout,
        })
    }

    #[tracing::instrument(skip_all, fields(numreplicas = self.numreplicas, timeout = ?self.timeout))]
    async fn apply(self, state: &ServerState, _session: &mut Session) -> LResult<Reply> {
        if state.role() != Role::Leader {
            return Err(Error::InvalidArgument(
                "WAIT cannot be used with replica instances".into(),
            ));
        }
        let needed = usize::try_from(self.numreplicas).unwrap_or(usize::MAX);
        let acked = state.leader().wait_for_acks(needed, self.timeout).await;
        debug!(acked);

        Ok(Reply::frame(Frame::Integer(i64::try_from(acked)?)))
    }

    fn into_frame(self) -> LResult<crate::Frame> {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from("wait"))?;
        frame.push_bulk(Bytes::from(self.numreplicas.to_string()))?;
        frame.push_bulk(Bytes::from(self.timeout.as_millis().to_string()))?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_replicas_times_out_with_zero() {
        let state = ServerState::new(None);
        let start = Instant::now();
        let reply = WaitCmd::new(1, Duration::from_millis(100))
            .apply(&state, &mut Session::client())
            .await
            .unwrap();
        assert_eq!(reply.frames, vec![Frame::Integer(0)]);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_wait_for_zero_replicas() {
        let state = ServerState::new(None);
        let reply = WaitCmd::new(0, Duration::from_secs(60))
            .apply(&state, &mut Session::client())
            .await
            .unwrap();
        assert_eq!(reply.frames, vec![Frame::Integer(0)]);
    }

    #[test]
    fn test_into_frame() {
        let frame = WaitCmd::new(2, Duration::from_millis(500))
            .into_frame()
            .unwrap();
        assert_eq!(frame, Frame::command(["wait", "2", "500"]));
    }
}
