use thiserror::Error;

use crate::Frame;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("incomplete frame")]
    IncompleteFrame,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Conversion(#[from] std::num::TryFromIntError),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("end of stream error")]
    /// Attempting to extract a value failed due to the frame being fully consumed
    EndOfStream,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("syntax error")]
    Syntax,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("You can't write against a read only replica.")]
    ReadOnly,
    #[error("wrong frame type: {0}")]
    WrongFrameType(String),
    #[error("unexpected response: {0}")]
    Response(String),
    #[error("replication handshake failed: {0}")]
    Handshake(String),
}

impl Error {
    pub(crate) fn not_an_integer() -> Self {
        Error::InvalidArgument("value is not an integer or out of range".to_string())
    }

    /// Render a command level error as the error value sent back to the peer.
    pub(crate) fn to_reply(&self) -> Frame {
        match self {
            Error::ReadOnly => Frame::SimpleError(format!("READONLY {self}")),
            _ => Frame::SimpleError(format!("ERR {self}")),
        }
    }
}
