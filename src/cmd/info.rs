use std::fmt::Write;

use bytes::Bytes;
use tracing::debug;

use super::{Command, Reply};
use crate::replication::Role;
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Frame, LResult};

/// `INFO [section]`
///
/// Only the `replication` section exists. `all`, `everything`, `default` and
/// no argument at all include it; any other section yields an empty reply.
#[derive(Debug, Default)]
pub struct InfoCmd {
    section: Option<String>,
}

impl InfoCmd {
    pub fn new(section: Option<String>) -> Self {
        Self { section }
    }

    fn wants_replication(&self) -> bool {
        match &self.section {
            None => true,
            Some(section) => matches!(
                section.to_lowercase().as_str(),
                "replication" | "all" | "everything" | "default"
            ),
        }
    }
}

fn replication_section(state: &ServerState) -> String {
    let mut lines = vec!["# Replication".to_string(), format!("role:{}", state.role().as_str())];

    match (state.role(), state.follower()) {
        (Role::Follower, Some(follower)) => {
            let replid = follower
                .leader_replid()
                .unwrap_or_else(|| state.leader().replid().to_string());
            lines.push(format!("master_host:{}", follower.leader().host));
            lines.push(format!("master_port:{}", follower.leader().port));
            lines.push(format!("master_replid:{replid}"));
            lines.push(format!("master_repl_offset:{}", follower.offset()));
        }
        _ => {
            let leader = state.leader();
            let links = leader.links();
            lines.push(format!("connected_slaves:{}", links.len()));
            for (i, link) in links.iter().enumerate() {
                lines.push(format!(
                    "slave{i}:port={},offset={},lag={}",
                    link.listening_port,
                    link.acked_offset,
                    link.lag()
                ));
            }
            lines.push(format!("master_replid:{}", leader.replid()));
            lines.push(format!("master_repl_offset:{}", leader.offset()));
        }
    }

    lines.into_iter().fold(String::new(), |mut out, line| {
        let _ = write!(out, "{line}\r\n");
        out
    })
}

impl Command for InfoCmd {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized,
    {
        let section = if parse.remaining() > 0 {
            Some(parse.next_string()?)
        } else {
            None
        };
        Ok(Self { section })
    }

    #[tracing::instrument(skip_all)]
    async fn apply(self, state: &ServerState, _session: &mut Session) -> LResult<Reply> {
        let body = if self.wants_replication() {
            replication_section(state)
        } else {
            String::new()
        };
        debug!(section = ?self.section, len = body.len());
        Ok(Reply::frame(Frame::BulkString(Bytes::from(body))))
    }

    fn into_frame(self) -> LResult<crate::Frame> {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from("info"))?;
        if let Some(section) = self.section {
            frame.push_bulk(Bytes::from(section))?;
        }
        Ok(frame)
    }
}
