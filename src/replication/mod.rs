//! Single-leader replication.
//!
//! A server is always able to act as a leader. When started with an upstream
//! address it also carries a [`FollowerExtension`] and reports the follower
//! role; role-sensitive commands consult [`ServerState::role`].
//!
//! [`ServerState::role`]: crate::state::ServerState::role

mod ack;
pub(crate) mod follower;
pub(crate) mod leader;
mod snapshot;

pub(crate) use follower::FollowerExtension;
pub(crate) use leader::{LeaderExtension, LinkId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Leader,
    Follower,
}

impl Role {
    /// Name used in `INFO replication`.
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Role::Leader => "master",
            Role::Follower => "slave",
        }
    }
}
