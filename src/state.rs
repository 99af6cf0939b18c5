use std::sync::Arc;

use crate::cmd::CommandTable;
use crate::config::LeaderAddr;
use crate::replication::{FollowerExtension, LeaderExtension, Role};
use crate::Db;

/// Server state shared by every connection task.
///
/// The leader extension is always present; the follower extension only when
/// the server was started with an upstream address, which also selects the
/// follower role.
///
/// Cloning is shallow, all fields are reference counted.
#[derive(Debug, Clone)]
pub(crate) struct ServerState {
    db: Db,
    commands: Arc<CommandTable>,
    leader: Arc<LeaderExtension>,
    follower: Option<Arc<FollowerExtension>>,
    /// Serializes apply-then-propagate of write commands so replicas see
    /// writes in the order the leader applied them.
    write_order: Arc<tokio::sync::Mutex<()>>,
}

impl ServerState {
    pub(crate) fn new(replicaof: Option<LeaderAddr>) -> Self {
        Self {
            db: Db::new(),
            commands: Arc::new(CommandTable::new()),
            leader: Arc::new(LeaderExtension::new()),
            follower: replicaof.map(|addr| Arc::new(FollowerExtension::new(addr))),
            write_order: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub(crate) fn role(&self) -> Role {
        if self.follower.is_some() {
            Role::Follower
        } else {
            Role::Leader
        }
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub(crate) fn leader(&self) -> &LeaderExtension {
        &self.leader
    }

    pub(crate) fn follower(&self) -> Option<&Arc<FollowerExtension>> {
        self.follower.as_ref()
    }

    pub(crate) fn write_order(&self) -> &tokio::sync::Mutex<()> {
        &self.write_order
    }
}
