use crate::frame::{Decoded, Frame};
use crate::LResult;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Any byte stream a [`Connection`] can run on: TCP sockets in production,
/// in-memory duplex pipes in tests.
pub trait ConnectionStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ConnectionStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Send and receive `Frame` values from a remote peer.
///
/// To read frames, the `Connection` uses an internal buffer, which is filled
/// up until there are enough bytes to create a full frame. Once this happens,
/// the `Connection` creates the frame and returns it to the caller together
/// with the exact bytes it was decoded from.
///
/// When sending frames, the frame is first encoded into the write buffer.
/// The contents of the write buffer are then written to the socket.
#[derive(Debug)]
pub struct Connection<S> {
    /// The stream wrapped with a `BufWriter` for buffering writes.
    stream: BufWriter<S>,
    /// Buffer used for reading frames. Owned by this connection only.
    buffer: BytesMut,
}

impl<S: ConnectionStream> Connection<S> {
    pub fn new(socket: S) -> Self {
        Self {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` from the connection.
    ///
    /// See [`Connection::read_decoded`].
    pub async fn read_frame(&mut self) -> LResult<Option<Frame>> {
        Ok(self.read_decoded().await?.map(|decoded| decoded.frame))
    }

    /// Read a single frame along with its raw bytes.
    ///
    /// The function waits until it has retrieved enough data to parse a frame.
    /// Any data remaining in the read buffer after the frame has been parsed is
    /// kept there for the next call.
    ///
    /// This is cancel safe: bytes read from the socket are kept in the buffer
    /// if the future is dropped before a frame is complete.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the stream is closed in
    /// a way that doesn't break a frame in half, it returns `None`. Otherwise,
    /// an error is returned.
    pub async fn read_decoded(&mut self) -> LResult<Option<Decoded>> {
        self.read_with(Frame::decode).await
    }

    /// Read the snapshot that follows `FULLRESYNC`, or whatever frame comes
    /// instead of it.
    ///
    /// See [`Frame::decode_snapshot`].
    pub async fn read_snapshot_frame(&mut self) -> LResult<Option<Frame>> {
        let decoded = self.read_with(Frame::decode_snapshot).await?;
        Ok(decoded.map(|decoded| decoded.frame))
    }

    async fn read_with(
        &mut self,
        decode: fn(&mut BytesMut) -> LResult<Option<Decoded>>,
    ) -> LResult<Option<Decoded>> {
        loop {
            // Attempt to parse a frame from the buffered data. If enough data
            // has been buffered, the frame is returned.
            if let Some(decoded) = decode(&mut self.buffer)? {
                return Ok(Some(decoded));
            }

            // There is not enough buffered data to read a frame. Attempt to
            // read more data from the socket.
            //
            // On success, the number of bytes is returned. `0` indicates "end
            // of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer. If
                // there is, this means that the peer closed the socket while
                // sending a frame.
                if self.buffer.is_empty() {
                    return Ok(None);
                } else {
                    return Err(crate::Error::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection was closed mid frame",
                    )));
                }
            }
        }
    }

    /// Write a frame to the connection's underlying stream and flush it.
    pub async fn write_frame(&mut self, frame: &Frame) -> LResult<()> {
        let mut encoded = BytesMut::new();
        frame.encode(&mut encoded);
        self.write_raw(&encoded).await
    }

    /// Write already encoded bytes, e.g. a propagated command, unchanged.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> LResult<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await.map_err(crate::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_reads_frames_split_across_segments() {
        let mock = tokio_test::io::Builder::new()
            .read(b"*1\r\n$4\r\nPI")
            .read(b"NG\r\n*2\r\n$4\r\nECHO\r\n")
            .read(b"$2\r\nhi\r\n")
            .build();
        let mut conn = Connection::new(mock);

        let first = conn.read_decoded().await.unwrap().unwrap();
        assert_eq!(first.frame, Frame::command(["PING"]));
        assert_eq!(&first.raw[..], b"*1\r\n$4\r\nPING\r\n");

        let second = conn.read_frame().await.unwrap().unwrap();
        assert_eq!(second, Frame::command(["ECHO", "hi"]));

        assert!(conn.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_mid_frame_is_an_error() {
        let mock = tokio_test::io::Builder::new().read(b"$5\r\nab").build();
        let mut conn = Connection::new(mock);
        assert!(conn.read_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_protocol_error_surfaces() {
        let mock = tokio_test::io::Builder::new().read(b"?what\r\n").build();
        let mut conn = Connection::new(mock);
        assert!(matches!(
            conn.read_frame().await,
            Err(crate::Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_read_leaves_the_stream_behind_it() {
        let mock = tokio_test::io::Builder::new()
            .read(b"$7\r\nREDI")
            .read(b"S01*1\r\n$4\r\nPING\r\n")
            .build();
        let mut conn = Connection::new(mock);
        assert_eq!(
            conn.read_snapshot_frame().await.unwrap(),
            Some(Frame::Rdb(Bytes::from("REDIS01")))
        );
        assert_eq!(
            conn.read_frame().await.unwrap(),
            Some(Frame::command(["PING"]))
        );
    }

    #[tokio::test]
    async fn test_write_frame() {
        let mock = tokio_test::io::Builder::new()
            .write(b"*2\r\n+OK\r\n$3\r\nbar\r\n")
            .build();
        let mut conn = Connection::new(mock);
        let frame = Frame::Array(vec![
            Frame::SimpleString("OK".into()),
            Frame::BulkString(Bytes::from("bar")),
        ]);
        conn.write_frame(&frame).await.unwrap();
    }
}
