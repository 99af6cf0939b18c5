use bytes::Bytes;
use tracing::{debug, info};

use super::{Command, Reply};
use crate::replication::Role;
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Error, Frame, LResult};

/// `REPLCONF <option> <args...>`, the replication side channel.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplconfCmd {
    /// Sent by a replica during the handshake; makes the connection a
    /// replica link on the leader.
    ListeningPort(u16),
    /// Capability negotiation, accepted unconditionally.
    Capa(Vec<String>),
    /// Sent by the leader to ask for the follower's applied offset.
    GetAck,
    /// The follower's answer to `GETACK`.
    Ack(u64),
}

impl ReplconfCmd {
    fn ok() -> Frame {
        Frame::SimpleString("OK".to_string())
    }
}

impl Command for ReplconfCmd {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized,
    {
        let option = parse.next_string()?;
        let cmd = match option.to_lowercase().as_str() {
            "listening-port" => {
                let port = parse.next_int()?;
                let port = u16::try_from(port).map_err(|_| Error::not_an_integer())?;
                ReplconfCmd::ListeningPort(port)
            }
            "capa" => {
                let mut capabilities = Vec::with_capacity(parse.remaining());
                while parse.remaining() > 0 {
                    capabilities.push(parse.next_string()?);
                }
                ReplconfCmd::Capa(capabilities)
            }
            "getack" => {
                // the argument is conventionally `*` and otherwise ignored
                parse.next_string()?;
                ReplconfCmd::GetAck
            }
            "ack" => ReplconfCmd::Ack(parse.next_int()?),
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "Unrecognized REPLCONF option: {option}"
                )))
            }
        };
        Ok(cmd)
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn apply(self, state: &ServerState, session: &mut Session) -> LResult<Reply> {
        match self {
            ReplconfCmd::ListeningPort(port) => {
                if state.role() == Role::Leader && session.link().is_none() {
                    let (id, rx) = state.leader().register(port);
                    session.attach_link(id, rx);
                }
                Ok(Reply::frame(Self::ok()))
            }
            ReplconfCmd::Capa(capabilities) => {
                debug!(?capabilities, "replica capabilities");
                Ok(Reply::frame(Self::ok()))
            }
            ReplconfCmd::GetAck => {
                let follower = state.follower().ok_or_else(|| {
                    Error::InvalidArgument("GETACK is only valid on a replica".into())
                })?;
                let offset = follower.offset();
                debug!(offset, "answering GETACK");
                Ok(Reply::frame(Frame::command([
                    "REPLCONF".to_string(),
                    "ACK".to_string(),
                    offset.to_string(),
                ])))
            }
            ReplconfCmd::Ack(offset) => {
                match session.link() {
                    Some(link) => state.leader().record_ack(link, offset),
                    None => info!(offset, "ACK from a connection that is not a replica"),
                }
                Ok(Reply::none())
            }
        }
    }

    fn into_frame(self) -> LResult<crate::Frame> {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from("replconf"))?;
        match self {
            ReplconfCmd::ListeningPort(port) => {
                frame.push_bulk(Bytes::from("listening-port"))?;
                frame.push_bulk(Bytes::from(port.to_string()))?;
            }
            ReplconfCmd::Capa(capabilities) => {
                frame.push_bulk(Bytes::from("capa"))?;
                for capability in capabilities {
                    frame.push_bulk(Bytes::from(capability))?;
                }
            }
            ReplconfCmd::GetAck => {
                frame.push_bulk(Bytes::from("GETACK"))?;
                frame.push_bulk(Bytes::from("*"))?;
            }
            ReplconfCmd::Ack(offset) => {
                frame.push_bulk(Bytes::from("ACK"))?;
                frame.push_bulk(Bytes::from(offset.to_string()))?;
            }
        }
        Ok(frame)
    }
}
