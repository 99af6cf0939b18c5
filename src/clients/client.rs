use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::{
    cmd::{Command, DelCmd, EchoCmd, GetCmd, InfoCmd, PingCmd, PsyncCmd, SetCmd, WaitCmd},
    Connection, ConnectionStream, Error, Frame, LResult,
};

/// Established connection with a server.
///
/// Backed by a single stream, `Client` provides basic network client
/// functionality (no pooling, retrying, ...).
/// Requests are issued using the various methods of `Client`.
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    /// The stream decorated with the RESP encoder / decoder.
    connection: Connection<S>,
}

impl Client<TcpStream> {
    /// Establish a connection with the server located at `addr`.
    ///
    /// `addr` may be any type that can be asynchronously converted to a
    /// `SocketAddr`. This includes `SocketAddr` and strings. The `ToSocketAddrs`
    /// trait is the Tokio version and not the `std` version.
    pub async fn connect(addr: impl ToSocketAddrs) -> LResult<Self> {
        let socket = TcpStream::connect(addr).await?;
        Ok(Client::new(socket))
    }
}

impl<S: ConnectionStream> Client<S> {
    pub fn new(stream: S) -> Self {
        Client {
            connection: Connection::new(stream),
        }
    }

    /// Ping to the server.
    ///
    /// Returns PONG if no argument is provided, otherwise
    /// return a copy of the argument as a bulk.
    ///
    /// This command is often used to test if a connection
    /// is still alive, or to measure latency.
    #[tracing::instrument(skip(self))]
    pub async fn ping(&mut self, msg: Option<Bytes>) -> LResult<Bytes> {
        match self.request(PingCmd::new(msg)).await? {
            Frame::SimpleString(val) => Ok(val.into()),
            Frame::BulkString(val) => Ok(val),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn echo(&mut self, msg: Bytes) -> LResult<Bytes> {
        match self.request(EchoCmd::new(msg)).await? {
            Frame::BulkString(val) => Ok(val),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// Get the value of key.
    ///
    /// If the key does not exist `None` is returned.
    #[tracing::instrument(skip(self))]
    pub async fn get(&mut self, key: &str) -> LResult<Option<Bytes>> {
        match self.request(GetCmd::new(key)).await? {
            Frame::SimpleString(val) => Ok(Some(val.into())),
            Frame::BulkString(val) => Ok(Some(val)),
            Frame::NullBulkString | Frame::Null => Ok(None),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// Set `key` to hold the given `value`.
    ///
    /// If key already holds a value, it is overwritten. Any previous time to
    /// live associated with the key is discarded.
    pub async fn set(&mut self, key: &str, val: Bytes) -> LResult<()> {
        self.set_cmd(SetCmd::new(key, val, None)).await.map(drop)
    }

    /// Set `key` to hold the given `value`. The value expires after `expire`.
    pub async fn set_expires(&mut self, key: &str, val: Bytes, expire: Duration) -> LResult<()> {
        self.set_cmd(SetCmd::new(key, val, Some(expire)))
            .await
            .map(drop)
    }

    /// Send an arbitrary `SET`, options included.
    ///
    /// Returns `None` when the server answered with a null, that is when a
    /// `NX`/`XX` condition was not met, or with `GET`, when there was no
    /// previous value.
    pub async fn set_cmd(&mut self, cmd: SetCmd) -> LResult<Option<Bytes>> {
        match self.request(cmd).await? {
            Frame::SimpleString(val) if val == "OK" => Ok(Some(Bytes::from(val))),
            Frame::BulkString(val) => Ok(Some(val)),
            Frame::NullBulkString | Frame::Null => Ok(None),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// Remove the given keys, returning how many existed.
    #[tracing::instrument(skip(self))]
    pub async fn del(&mut self, keys: &[&str]) -> LResult<u64> {
        match self.request(DelCmd::new(keys)).await? {
            Frame::Integer(n) => Ok(u64::try_from(n)?),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// Raw `INFO` text for `section`.
    pub async fn info(&mut self, section: Option<&str>) -> LResult<String> {
        match self.request(InfoCmd::new(section.map(str::to_string))).await? {
            Frame::BulkString(val) => Ok(String::from_utf8(val.to_vec())?),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// Block until `replicas` replicas acknowledged the writes so far, or
    /// `timeout` elapsed. Returns the number of acknowledgements.
    #[tracing::instrument(skip(self))]
    pub async fn wait(&mut self, replicas: u64, timeout: Duration) -> LResult<u64> {
        match self.request(WaitCmd::new(replicas, timeout)).await? {
            Frame::Integer(n) => Ok(u64::try_from(n)?),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `REPLCONF <args...>`, expecting `OK`.
    pub(crate) async fn replconf(&mut self, args: &[&str]) -> LResult<()> {
        let frame = Frame::command(
            std::iter::once("REPLCONF")
                .chain(args.iter().copied())
                .map(|part| Bytes::copy_from_slice(part.as_bytes())),
        );
        match self.send(frame).await? {
            Frame::SimpleString(val) if val == "OK" => Ok(()),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `PSYNC`, returning the replication ID and offset of the `FULLRESYNC`
    /// answer. The snapshot that follows is left unread.
    pub(crate) async fn psync(&mut self, replid: &str, offset: i64) -> LResult<(String, u64)> {
        let line = match self.request(PsyncCmd::new(replid, offset)).await? {
            Frame::SimpleString(line) => line,
            frame => return Err(Error::Response(format!("unexpected frame: {frame}"))),
        };
        let mut parts = line.split(' ');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("FULLRESYNC"), Some(replid), Some(offset), None) => {
                let offset = offset
                    .parse()
                    .map_err(|_| Error::Response(format!("bad FULLRESYNC offset: {line}")))?;
                Ok((replid.to_string(), offset))
            }
            _ => Err(Error::Response(format!("expected FULLRESYNC, got {line}"))),
        }
    }

    /// Read the snapshot payload sent after `FULLRESYNC`.
    pub(crate) async fn read_snapshot(&mut self) -> LResult<Bytes> {
        let response = self.connection.read_snapshot_frame().await?;
        match into_reply(response)? {
            Frame::Rdb(snapshot) => Ok(snapshot),
            frame => Err(Error::Response(format!("expected snapshot, got {frame}"))),
        }
    }

    /// Give up the request/response API and keep the underlying connection,
    /// including any bytes already buffered.
    pub(crate) fn into_connection(self) -> Connection<S> {
        self.connection
    }

    async fn request(&mut self, cmd: impl Command) -> LResult<Frame> {
        self.send(cmd.into_frame()?).await
    }

    async fn send(&mut self, frame: Frame) -> LResult<Frame> {
        debug!(request = ?frame);
        self.connection.write_frame(&frame).await?;
        self.read_response().await
    }

    async fn read_response(&mut self) -> LResult<Frame> {
        let response = self.connection.read_frame().await?;
        into_reply(response)
    }
}

fn into_reply(response: Option<Frame>) -> LResult<Frame> {
    debug!(?response);
    match response {
        Some(Frame::SimpleError(msg)) => Err(Error::Response(msg)),
        Some(frame) => Ok(frame),
        None => {
            // Receiving `None` indicates the connection has been closed by the server
            // without sending a frame. This is unexpected and treated as an `Error::Io`.
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by server",
            )
            .into())
        }
    }
}
