use bytes::Bytes;
use tracing::{debug, warn};

use crate::replication::Role;
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Error, Frame, LResult};

pub mod del;
pub use del::DelCmd;

pub mod echo;
pub use echo::EchoCmd;

pub mod get;
pub use get::GetCmd;

pub mod info;
pub use info::InfoCmd;

pub mod ping;
pub use ping::PingCmd;

pub mod psync;
pub use psync::PsyncCmd;

pub mod replconf;
pub use replconf::ReplconfCmd;

pub mod set;
pub use set::SetCmd;

pub mod wait;
pub use wait::WaitCmd;

mod registry;
pub(crate) use registry::CommandTable;

pub(crate) trait Command {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized;

    fn apply(
        self,
        state: &ServerState,
        session: &mut Session,
    ) -> impl std::future::Future<Output = LResult<Reply>> + Send;

    fn into_frame(self) -> LResult<Frame>;
}

/// What a command produced: zero or more frames to send back, and whether
/// it changed the dataset (and so must be propagated).
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Reply {
    pub(crate) frames: Vec<Frame>,
    pub(crate) mutated: bool,
}

impl Reply {
    pub(crate) fn frame(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
            mutated: false,
        }
    }

    pub(crate) fn frames(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            mutated: false,
        }
    }

    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn write(frame: Frame, mutated: bool) -> Self {
        Self {
            frames: vec![frame],
            mutated,
        }
    }
}

#[derive(Debug)]
pub enum CommandVariant {
    Del(DelCmd),
    Echo(EchoCmd),
    Get(GetCmd),
    Info(InfoCmd),
    Ping(PingCmd),
    Psync(PsyncCmd),
    Replconf(ReplconfCmd),
    Set(SetCmd),
    Wait(WaitCmd),
}

impl CommandVariant {
    /// Resolve the command name through `table`, check the argument count and
    /// parse the arguments.
    #[tracing::instrument(ret, skip_all, level = "debug")]
    pub(crate) fn from_frame(table: &CommandTable, frame: Frame) -> LResult<Self> {
        let mut parse = Parse::new(frame)?;
        let spec = table.lookup(parse.name())?;
        spec.check_arity(parse.len())?;

        let command = spec.parse(&mut parse)?;
        parse.finish()?;

        Ok(command)
    }

    pub(crate) async fn apply(self, state: &ServerState, session: &mut Session) -> LResult<Reply> {
        use CommandVariant as C;

        match self {
            C::Del(cmd) => cmd.apply(state, session).await,
            C::Echo(cmd) => cmd.apply(state, session).await,
            C::Get(cmd) => cmd.apply(state, session).await,
            C::Info(cmd) => cmd.apply(state, session).await,
            C::Ping(cmd) => cmd.apply(state, session).await,
            C::Psync(cmd) => cmd.apply(state, session).await,
            C::Replconf(cmd) => cmd.apply(state, session).await,
            C::Set(cmd) => cmd.apply(state, session).await,
            C::Wait(cmd) => cmd.apply(state, session).await,
        }
    }

    pub fn get_name(&self) -> &str {
        use CommandVariant as C;
        match self {
            C::Del(_) => "del",
            C::Echo(_) => "echo",
            C::Get(_) => "get",
            C::Info(_) => "info",
            C::Ping(_) => "ping",
            C::Psync(_) => "psync",
            C::Replconf(_) => "replconf",
            C::Set(_) => "set",
            C::Wait(_) => "wait",
        }
    }

    /// Commands that modify the dataset and are propagated to replicas.
    pub fn is_write(&self) -> bool {
        matches!(self, CommandVariant::Set(_) | CommandVariant::Del(_))
    }

    /// Commands answered even when they arrive on the leader's stream.
    fn replies_upstream(&self) -> bool {
        matches!(self, CommandVariant::Replconf(ReplconfCmd::GetAck))
    }
}

/// Execute one decoded command and return the frames to write back.
///
/// Command level failures, including unknown commands, become error replies;
/// they never end the connection. Writes applied on a leader are propagated
/// using `raw`, the exact bytes the command was decoded from. Nothing but
/// `REPLCONF GETACK` replies is returned for commands from the leader's stream.
pub(crate) async fn dispatch(
    state: &ServerState,
    session: &mut Session,
    frame: Frame,
    raw: Bytes,
) -> Vec<Frame> {
    let command = match CommandVariant::from_frame(state.commands(), frame) {
        Ok(command) => command,
        Err(err) => {
            warn!(cause = %err, "rejected command");
            return if session.is_upstream() {
                vec![]
            } else {
                vec![err.to_reply()]
            };
        }
    };
    debug!(command = command.get_name(), "dispatching");

    let replies_upstream = command.replies_upstream();
    let result = if !command.is_write() {
        command.apply(state, session).await
    } else if state.role() == Role::Follower && !session.is_upstream() {
        Err(Error::ReadOnly)
    } else {
        let _order = state.write_order().lock().await;
        let result = command.apply(state, session).await;
        if matches!(&result, Ok(reply) if reply.mutated) && state.role() == Role::Leader {
            state.leader().propagate(raw);
        }
        result
    };

    if session.is_upstream() && !replies_upstream {
        return vec![];
    }
    match result {
        Ok(reply) => reply.frames,
        Err(err) => vec![err.to_reply()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeaderAddr;

    async fn run(state: &ServerState, session: &mut Session, parts: &[&str]) -> Vec<Frame> {
        let frame = Frame::command(parts.iter().map(|p| Bytes::copy_from_slice(p.as_bytes())));
        let raw = frame.to_bytes();
        dispatch(state, session, frame, raw).await
    }

    fn follower_state() -> ServerState {
        ServerState::new(Some(LeaderAddr {
            host: "127.0.0.1".into(),
            port: 6379,
        }))
    }

    #[tokio::test]
    async fn test_unknown_command_is_an_error_reply() {
        let state = ServerState::new(None);
        let mut session = Session::client();
        let replies = run(&state, &mut session, &["FLY", "away"]).await;
        assert_eq!(
            replies,
            vec![Frame::SimpleError("ERR unknown command 'FLY'".into())]
        );
    }

    #[tokio::test]
    async fn test_command_names_are_case_insensitive() {
        let state = ServerState::new(None);
        let mut session = Session::client();
        let replies = run(&state, &mut session, &["pInG"]).await;
        assert_eq!(replies, vec![Frame::SimpleString("PONG".into())]);
    }

    #[tokio::test]
    async fn test_wrong_arity() {
        let state = ServerState::new(None);
        let mut session = Session::client();
        let replies = run(&state, &mut session, &["GET"]).await;
        assert_eq!(
            replies,
            vec![Frame::SimpleError(
                "ERR wrong number of arguments for 'get' command".into()
            )]
        );
    }

    #[tokio::test]
    async fn test_leader_propagates_applied_writes_only() {
        let state = ServerState::new(None);
        let (_, mut rx) = state.leader().register(6380);
        let mut session = Session::client();

        run(&state, &mut session, &["SET", "k", "v"]).await;
        run(&state, &mut session, &["SET", "k", "other", "NX"]).await;
        run(&state, &mut session, &["GET", "k"]).await;
        run(&state, &mut session, &["DEL", "missing"]).await;
        run(&state, &mut session, &["DEL", "k"]).await;

        let set = Frame::command(["SET", "k", "v"]).to_bytes();
        let del = Frame::command(["DEL", "k"]).to_bytes();
        assert_eq!(rx.try_recv().unwrap(), set);
        assert_eq!(rx.try_recv().unwrap(), del);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.leader().offset(), (set.len() + del.len()) as u64);
    }

    #[tokio::test]
    async fn test_follower_rejects_client_writes() {
        let state = follower_state();
        let mut session = Session::client();
        let replies = run(&state, &mut session, &["SET", "k", "v"]).await;
        assert_eq!(
            replies,
            vec![Frame::SimpleError(
                "READONLY You can't write against a read only replica.".into()
            )]
        );
        assert_eq!(state.db().get("k"), None);
    }

    #[tokio::test]
    async fn test_upstream_writes_are_applied_silently() {
        let state = follower_state();
        let mut upstream = Session::upstream();
        assert!(run(&state, &mut upstream, &["SET", "k", "v"]).await.is_empty());
        assert!(run(&state, &mut upstream, &["PING"]).await.is_empty());
        assert!(run(&state, &mut upstream, &["NOPE"]).await.is_empty());
        assert_eq!(state.db().get("k"), Some(Bytes::from("v")));
        assert_eq!(state.leader().offset(), 0);
    }

    #[tokio::test]
    async fn test_upstream_getack_is_answered() {
        let state = follower_state();
        let mut upstream = Session::upstream();
        let replies = run(&state, &mut upstream, &["REPLCONF", "GETACK", "*"]).await;
        assert_eq!(replies, vec![Frame::command(["REPLCONF", "ACK", "0"])]);
    }

    #[tokio::test]
    async fn test_upstream_replconf_options_get_no_reply() {
        let state = follower_state();
        let mut upstream = Session::upstream();
        let port = run(&state, &mut upstream, &["REPLCONF", "listening-port", "6380"]).await;
        assert!(port.is_empty());
        let capa = run(&state, &mut upstream, &["REPLCONF", "capa", "psync2"]).await;
        assert!(capa.is_empty());

        // the same options from a client are acknowledged
        let mut client = Session::client();
        let replies = run(&state, &mut client, &["REPLCONF", "capa", "psync2"]).await;
        assert_eq!(replies, vec![Frame::SimpleString("OK".into())]);
    }
}
