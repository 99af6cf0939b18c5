use bytes::Bytes;
use tracing::debug;

use super::{Command, Reply};
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Frame, LResult};

/// Removes the given keys, replying with how many existed.
#[derive(Debug)]
pub struct DelCmd {
    keys: Vec<String>,
}

impl DelCmd {
    pub fn new(keys: impl IntoIterator<Item = impl ToString>) -> Self {
        Self {
            keys: keys.into_iter().map(|key| key.to_string()).collect(),
        }
    }
}

impl Command for DelCmd {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized,
    {
        let mut keys = Vec::with_capacity(parse.remaining());
        while parse.remaining() > 0 {
            keys.push(parse.next_string()?);
        }
        Ok(Self { keys })
    }

    #[tracing::instrument(skip_all)]
    async fn apply(self, state: &ServerState, _session: &mut Session) -> LResult<Reply> {
        let removed = state.db().delete(self.keys.iter().map(String::as_str));
        debug!(removed, "del");
        Ok(Reply::write(Frame::Integer(removed as i64), removed > 0))
    }

    fn into_frame(self) -> LResult<Frame> {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from("del"))?;
        for key in self.keys {
            frame.push_bulk(Bytes::from(key))?;
        }
        Ok(frame)
    }
}
