use bytes::Bytes;

use super::{Command, Reply};
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Frame, LResult};

/// Returns its argument as a bulk string.
#[derive(Debug)]
pub struct EchoCmd {
    msg: Bytes,
}

impl EchoCmd {
    pub fn new(msg: Bytes) -> Self {
        Self { msg }
    }
}

impl Command for EchoCmd {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized,
    {
        Ok(Self {
            msg: parse.next_bytes()?,
        })
    }

    async fn apply(self, _state: &ServerState, _session: &mut Session) -> LResult<Reply> {
        Ok(Reply::frame(Frame::BulkString(self.msg)))
    }

    fn into_frame(self) -> LResult<Frame> {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from("echo"))?;
        frame.push_bulk(self.msg)?;
        Ok(frame)
    }
}
