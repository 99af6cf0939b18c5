//! A Redis-compatible key-value server with single-leader replication.
//!
//! * `server`: accepts connections and, in the follower role, replicates
//!   from a leader before serving.
//! * `clients`: an async client, also used by followers for the handshake.
//! * `frame` and `connection`: the RESP codec, keeping the exact bytes each
//!   frame was decoded from so writes can be replayed to replicas.

mod parse;

pub mod config;
pub use config::{LeaderAddr, ServerConfig};

pub mod connection;
pub use connection::Connection;
pub use connection::ConnectionStream;

pub(crate) mod db;
pub(crate) use db::Db;

pub mod error;
pub use error::Error;

pub mod frame;
pub use frame::{Decoded, Frame};

pub(crate) mod replication;
pub(crate) mod session;
pub(crate) mod state;

pub(crate) mod shutdown;
pub(crate) use shutdown::Shutdown;

pub mod clients;
pub use clients::Client;

pub mod cmd;
pub use cmd::CommandVariant;

pub mod server;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub type LResult<T> = std::result::Result<T, crate::error::Error>;
