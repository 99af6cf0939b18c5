use crate::{Error, LResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::Cursor;

const CRLF: &[u8] = b"\r\n";

/// Prefix identifying a snapshot payload sent right after `FULLRESYNC`.
const SNAPSHOT_MAGIC: &[u8] = b"REDIS";

/// Largest bulk payload accepted from a peer (same limit as Redis).
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted from a peer.
const MAX_DEPTH: usize = 512;

/// A frame in Redis Serialization Protocol (RESP).
///
/// See: <https://redis.io/docs/latest/develop/reference/protocol-spec/>
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    // RESP 2
    SimpleString(String),
    SimpleError(String),
    Integer(i64),
    BulkString(Bytes),
    Array(Vec<Frame>),
    NullBulkString,
    NullArray,
    // RESP 3
    Null,
    Boolean(bool),
    Double(f64),
    BigNumber(String),
    /// Snapshot payload. Framed as `$<len>\r\n<bytes>` with no trailing CRLF.
    Rdb(Bytes),
}

/// A frame together with the exact bytes it was decoded from.
///
/// The raw span is what gets forwarded to replicas and counted into
/// replication offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub frame: Frame,
    pub raw: Bytes,
}

impl Frame {
    /// Decode one top-level frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` without consuming anything when `buf` does not yet
    /// hold a complete frame. On success the consumed bytes are split off
    /// `buf` and returned alongside the frame.
    pub fn decode(buf: &mut BytesMut) -> LResult<Option<Decoded>> {
        decode_framed(buf, false)
    }

    /// Like [`Frame::decode`], but a top-level bulk payload starting with
    /// `REDIS` is read as a snapshot, without a trailing CRLF.
    ///
    /// Only the read that follows `FULLRESYNC` should use this. An ordinary
    /// reply may hold a value that happens to start with `REDIS`.
    pub fn decode_snapshot(buf: &mut BytesMut) -> LResult<Option<Decoded>> {
        decode_framed(buf, true)
    }

    /// Parse a top-level frame. Fails with [`Error::IncompleteFrame`] when the
    /// cursor runs out of bytes before the frame is complete.
    pub fn parse(src: &mut Cursor<&[u8]>) -> LResult<Frame> {
        parse_value(src, 0, false)
    }

    /// Build a command frame: an array where every part is a bulk string.
    pub fn command<I, T>(parts: I) -> Frame
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Frame::Array(
            parts
                .into_iter()
                .map(|part| Frame::BulkString(part.into()))
                .collect(),
        )
    }

    pub(crate) fn array() -> Self {
        Frame::Array(vec![])
    }

    pub(crate) fn push_bulk(&mut self, bytes: Bytes) -> LResult<()> {
        match self {
            Frame::Array(vec) => {
                vec.push(Frame::BulkString(bytes));
                Ok(())
            }
            ty => Err(Error::WrongFrameType(format!(
                "cannot push to non-array frame type, type was {:?}",
                ty
            ))),
        }
    }

    /// Append the wire encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::SimpleString(val) => put_line(dst, b'+', val.as_bytes()),
            Frame::SimpleError(val) => put_line(dst, b'-', val.as_bytes()),
            Frame::Integer(val) => put_line(dst, b':', val.to_string().as_bytes()),
            Frame::BulkString(val) => {
                put_line(dst, b'$', val.len().to_string().as_bytes());
                dst.put_slice(val);
                dst.put_slice(CRLF);
            }
            Frame::Array(val) => {
                put_line(dst, b'*', val.len().to_string().as_bytes());
                for entry in val {
                    entry.encode(dst);
                }
            }
            Frame::NullBulkString => dst.put_slice(b"$-1\r\n"),
            Frame::NullArray => dst.put_slice(b"*-1\r\n"),
            Frame::Null => dst.put_slice(b"_\r\n"),
            Frame::Boolean(val) => put_line(dst, b'#', if *val { b"t" } else { b"f" }),
            Frame::Double(val) => {
                let text = if val.is_nan() {
                    "nan".to_string()
                } else {
                    val.to_string()
                };
                put_line(dst, b',', text.as_bytes())
            }
            Frame::BigNumber(val) => put_line(dst, b'(', val.as_bytes()),
            Frame::Rdb(val) => {
                put_line(dst, b'$', val.len().to_string().as_bytes());
                dst.put_slice(val);
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode(&mut dst);
        dst.freeze()
    }
}

fn decode_framed(buf: &mut BytesMut, snapshot: bool) -> LResult<Option<Decoded>> {
    let mut cursor = Cursor::new(&buf[..]);

    match parse_value(&mut cursor, 0, snapshot) {
        Ok(frame) => {
            let len = cursor.position() as usize;
            let raw = buf.split_to(len).freeze();
            Ok(Some(Decoded { frame, raw }))
        }
        // not enough data has been buffered
        Err(Error::IncompleteFrame) => Ok(None),
        Err(e) => Err(e),
    }
}

/// `depth` counts the arrays enclosing the value being parsed. `snapshot`
/// only ever holds for a top-level value.
fn parse_value(src: &mut Cursor<&[u8]>, depth: usize, snapshot: bool) -> LResult<Frame> {
    // The first byte of the frame indicates the data type.
    match get_u8(src)? {
        b'+' => {
            let line = get_line(src)?.to_vec();
            Ok(Frame::SimpleString(String::from_utf8(line)?))
        }
        b'-' => {
            let line = get_line(src)?.to_vec();
            Ok(Frame::SimpleError(String::from_utf8(line)?))
        }
        b':' => Ok(Frame::Integer(get_decimal(src)?)),
        b'$' => {
            if b'-' == peek_u8(src)? {
                let line = get_line(src)?;
                if line != b"-1" {
                    return Err(Error::Protocol(format!(
                        "invalid frame format, only valid negative length is -1, got `{}`",
                        String::from_utf8_lossy(line)
                    )));
                }
                return Ok(Frame::NullBulkString);
            }
            let len = get_length(src)?;
            if snapshot && len >= SNAPSHOT_MAGIC.len() {
                if src.remaining() < SNAPSHOT_MAGIC.len() {
                    return Err(Error::IncompleteFrame);
                }
                if src.chunk().starts_with(SNAPSHOT_MAGIC) {
                    return Ok(Frame::Rdb(take(src, len)?));
                }
            }
            let data = take(src, len)?;
            expect_terminator(src)?;
            Ok(Frame::BulkString(data))
        }
        b'*' => {
            if b'-' == peek_u8(src)? {
                let line = get_line(src)?;
                if line != b"-1" {
                    return Err(Error::Protocol(format!(
                        "invalid frame format, only valid negative length is -1, got `{}`",
                        String::from_utf8_lossy(line)
                    )));
                }
                return Ok(Frame::NullArray);
            }
            if depth >= MAX_DEPTH {
                return Err(Error::Protocol("nesting too deep".into()));
            }
            let len = get_length(src)?;
            let mut out = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                out.push(parse_value(src, depth + 1, false)?);
            }
            Ok(Frame::Array(out))
        }
        b'_' => {
            let line = get_line(src)?;
            if line != b"" {
                Err(Error::Protocol(format!(
                    "invalid `null` data type frame format, frame contained bytes `{line:?}`"
                )))
            } else {
                Ok(Frame::Null)
            }
        }
        b'#' => match get_line(src)? {
            b"t" => Ok(Frame::Boolean(true)),
            b"f" => Ok(Frame::Boolean(false)),
            line => Err(Error::Protocol(format!(
                "invalid boolean `{}`",
                String::from_utf8_lossy(line)
            ))),
        },
        b',' => {
            let line = get_line(src)?;
            std::str::from_utf8(line)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .map(Frame::Double)
                .ok_or_else(|| {
                    Error::Protocol(format!(
                        "invalid double `{}`",
                        String::from_utf8_lossy(line)
                    ))
                })
        }
        b'(' => {
            let line = get_line(src)?;
            let digits = line.strip_prefix(b"-").unwrap_or(line);
            if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
                return Err(Error::Protocol(format!(
                    "invalid big number `{}`",
                    String::from_utf8_lossy(line)
                )));
            }
            Ok(Frame::BigNumber(String::from_utf8(line.to_vec())?))
        }
        first_byte => Err(Error::Protocol(format!(
            "first byte was not a valid RESP data type `{}`",
            first_byte.escape_ascii()
        ))),
    }
}

fn put_line(dst: &mut BytesMut, token: u8, body: &[u8]) {
    dst.put_u8(token);
    dst.put_slice(body);
    dst.put_slice(CRLF);
}

fn get_u8(src: &mut Cursor<&[u8]>) -> LResult<u8> {
    if !src.has_remaining() {
        return Err(Error::IncompleteFrame);
    }
    Ok(src.get_u8())
}

fn peek_u8(src: &mut Cursor<&[u8]>) -> LResult<u8> {
    if !src.has_remaining() {
        return Err(Error::IncompleteFrame);
    }
    Ok(src.chunk()[0])
}

fn take(src: &mut Cursor<&[u8]>, n: usize) -> LResult<Bytes> {
    if src.remaining() < n {
        return Err(Error::IncompleteFrame);
    }
    let data = Bytes::copy_from_slice(&src.chunk()[..n]);
    src.advance(n);
    Ok(data)
}

/// Consume a CRLF, failing with a protocol error naming whatever was found
/// in its place.
fn expect_terminator(src: &mut Cursor<&[u8]>) -> LResult<()> {
    let available = src.remaining().min(CRLF.len());
    let found = &src.chunk()[..available];
    if found != &CRLF[..available] {
        return Err(Error::Protocol(format!(
            "expected terminator, found `{}`",
            found.escape_ascii()
        )));
    }
    if available < CRLF.len() {
        return Err(Error::IncompleteFrame);
    }
    src.advance(CRLF.len());
    Ok(())
}

/// Read an optionally signed decimal followed by CRLF.
///
/// Only bytes that belong to the number are consumed before the terminator
/// check.
fn get_decimal(src: &mut Cursor<&[u8]>) -> LResult<i64> {
    use atoi::atoi;

    let start = src.position() as usize;
    if matches!(peek_u8(src)?, b'+' | b'-') {
        src.advance(1);
    }
    let mut digits = 0;
    while peek_u8(src)?.is_ascii_digit() {
        src.advance(1);
        digits += 1;
    }
    let end = src.position() as usize;
    let number = &src.get_ref()[start..end];
    let value = match atoi::<i64>(number) {
        Some(value) if digits > 0 => value,
        _ => {
            return Err(Error::Protocol(format!(
                "invalid integer `{}` followed by `{}`",
                number.escape_ascii(),
                src.chunk()[..1].escape_ascii()
            )))
        }
    };
    expect_terminator(src)?;
    Ok(value)
}

fn get_length(src: &mut Cursor<&[u8]>) -> LResult<usize> {
    let len = get_decimal(src)?;
    usize::try_from(len)
        .ok()
        .filter(|len| *len <= MAX_BULK_LEN)
        .ok_or_else(|| Error::Protocol(format!("invalid length `{len}`")))
}

fn get_line<'a>(src: &'a mut Cursor<&[u8]>) -> LResult<&'a [u8]> {
    let start = src.position() as usize;
    let end = src.get_ref().len().saturating_sub(1);

    for i in start..end {
        if src.get_ref()[i] == b'\r' && src.get_ref()[i + 1] == b'\n' {
            src.set_position((i + 2) as u64);
            return Ok(&src.get_ref()[start..i]);
        }
    }
    Err(Error::IncompleteFrame)
}

impl fmt::Display for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Frame::SimpleString(val) => write!(fmt, "{val}"),
            Frame::SimpleError(val) => write!(fmt, "error: {val}"),
            Frame::Integer(val) => write!(fmt, "{val}"),
            Frame::BulkString(val) => match std::str::from_utf8(val) {
                Ok(string) => write!(fmt, "{string}"),
                Err(_) => write!(fmt, "{val:?}"),
            },
            Frame::NullBulkString | Frame::NullArray | Frame::Null => write!(fmt, "(nil)"),
            Frame::Boolean(val) => write!(fmt, "{val}"),
            Frame::Double(val) => write!(fmt, "{val}"),
            Frame::BigNumber(val) => write!(fmt, "{val}"),
            Frame::Rdb(val) => write!(fmt, "<snapshot {} bytes>", val.len()),
            Frame::Array(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, " ")?;
                    }
                    write!(fmt, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &[u8]) -> LResult<Frame> {
        let mut buf = Cursor::new(src);
        Frame::parse(&mut buf)
    }

    #[test]
    fn test_all_data_types() {
        let frames: &[&[u8]] = &[
            b"+OK\r\n",
            b"-ERR unknown command 'foobar'\r\n",
            b":1000\r\n",
            b"$6\r\nfoobar\r\n",
            b"*2\r\n+OK\r\n$6\r\nfoobar\r\n",
            b"$-1\r\n",
            b"*-1\r\n",
            b"_\r\n",
            b"#t\r\n",
            b",1.5\r\n",
            b"(3492890328409238509324850943850943825024385\r\n",
            b"$5\r\nREDIS",
        ];
        for frame in frames {
            match_frame(frame);
        }
    }

    /// This function is used to ensure that parse contains every variant of [`Frame`].
    fn match_frame(src: &[u8]) {
        let frame = parse(src).unwrap();
        // A match statement without a catch-all arm will fail to compile if a variant is missing.
        match frame {
            Frame::SimpleString(_) => (),
            Frame::SimpleError(_) => (),
            Frame::Integer(_) => (),
            Frame::BulkString(_) => (),
            Frame::Array(_) => (),
            Frame::NullBulkString => (),
            Frame::NullArray => (),
            Frame::Null => (),
            Frame::Boolean(_) => (),
            Frame::Double(_) => (),
            Frame::BigNumber(_) => (),
            Frame::Rdb(_) => (),
        }
    }

    #[test]
    fn test_simple_string() {
        assert_eq!(
            parse(b"+this is a long string\r\n").unwrap(),
            Frame::SimpleString("this is a long string".to_string())
        );
    }

    #[test]
    fn test_simple_error() {
        assert_eq!(
            parse(b"-ERR unknown command 'foobar'\r\n").unwrap(),
            Frame::SimpleError("ERR unknown command 'foobar'".to_string())
        );
    }

    #[test]
    fn test_integer() {
        assert_eq!(parse(b":1000\r\n").unwrap(), Frame::Integer(1000));
        assert_eq!(parse(b":000001\r\n").unwrap(), Frame::Integer(1));
        assert_eq!(parse(b":-0\r\n").unwrap(), Frame::Integer(0));
        assert_eq!(parse(b":+1\r\n").unwrap(), Frame::Integer(1));
        assert_eq!(parse(b":-1\r\n").unwrap(), Frame::Integer(-1));
        assert_eq!(
            parse(b":+9223372036854775807\r\n").unwrap(),
            Frame::Integer(i64::MAX)
        );
        assert_eq!(
            parse(b":-9223372036854775808\r\n").unwrap(),
            Frame::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_integer_without_terminator_names_the_bytes() {
        let err = parse(b":12x4\r\n").unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg.contains("x4")));

        assert!(matches!(parse(b":\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(
            parse(b":99999999999999999999\r\n"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_integer_waits_for_more_digits() {
        assert!(matches!(parse(b":123"), Err(Error::IncompleteFrame)));
        assert!(matches!(parse(b":123\r"), Err(Error::IncompleteFrame)));
    }

    #[test]
    fn test_bulk_string() {
        assert_eq!(
            parse(b"$6\r\nfoobar\r\n").unwrap(),
            Frame::BulkString(Bytes::from("foobar"))
        );
        assert_eq!(
            parse(b"$0\r\n\r\n").unwrap(),
            Frame::BulkString(Bytes::from(""))
        );
        assert_eq!(
            parse(b"$+2\r\nOK\r\n").unwrap(),
            Frame::BulkString(Bytes::from("OK"))
        );
        assert_eq!(
            parse(b"$4\r\n\x00\xff\r\n\r\n").unwrap(),
            Frame::BulkString(Bytes::from_static(b"\x00\xff\r\n"))
        );
    }

    #[test]
    fn test_bulk_string_length_mismatch() {
        // declared length shorter than the payload
        assert!(matches!(
            parse(b"$3\r\nfoobar\r\n"),
            Err(Error::Protocol(_))
        ));
        // declared length longer than what has arrived so far
        assert!(matches!(parse(b"$10\r\nfoo\r\n"), Err(Error::IncompleteFrame)));
        assert!(matches!(parse(b"$-2\r\n"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_null_bulk_string() {
        assert_eq!(parse(b"$-1\r\n").unwrap(), Frame::NullBulkString);
    }

    #[test]
    fn test_array() {
        assert_eq!(
            parse(b"*2\r\n+OK\r\n$6\r\nfoobar\r\n").unwrap(),
            Frame::Array(vec![
                Frame::SimpleString("OK".to_string()),
                Frame::BulkString(Bytes::from("foobar")),
            ])
        );
        assert!(parse(b"*3\r\n+OK\r\n").is_err());
        assert_eq!(parse(b"*-1\r\n").unwrap(), Frame::NullArray);
        assert_eq!(parse(b"*0\r\n").unwrap(), Frame::array());
    }

    #[test]
    fn test_recursive_array() {
        let frame = parse(b"*2\r\n*2\r\n+OK\r\n$6\r\nfoobar\r\n$3\r\nbaz\r\n").unwrap();
        assert_eq!(
            frame,
            Frame::Array(vec![
                Frame::Array(vec![
                    Frame::SimpleString("OK".to_string()),
                    Frame::BulkString(Bytes::from("foobar")),
                ]),
                Frame::BulkString(Bytes::from("baz")),
            ])
        );
    }

    #[test]
    fn test_resp3_scalars() {
        assert_eq!(parse(b"_\r\n").unwrap(), Frame::Null);
        assert!(parse(b"_text\r\n").is_err());
        assert_eq!(parse(b"#t\r\n").unwrap(), Frame::Boolean(true));
        assert_eq!(parse(b"#f\r\n").unwrap(), Frame::Boolean(false));
        assert!(parse(b"#x\r\n").is_err());
        assert_eq!(parse(b",-2.25\r\n").unwrap(), Frame::Double(-2.25));
        assert_eq!(
            parse(b",inf\r\n").unwrap(),
            Frame::Double(f64::INFINITY)
        );
        assert!(parse(b",abc\r\n").is_err());
        assert_eq!(
            parse(b"(-12345678901234567890\r\n").unwrap(),
            Frame::BigNumber("-12345678901234567890".to_string())
        );
        assert!(parse(b"(12a\r\n").is_err());
    }

    #[test]
    fn test_snapshot_payload_has_no_terminator() {
        let mut buf = BytesMut::from(&b"$9\r\nREDIS0011*1\r\n$4\r\nPING\r\n"[..]);
        let first = Frame::decode_snapshot(&mut buf).unwrap().unwrap();
        assert_eq!(first.frame, Frame::Rdb(Bytes::from_static(b"REDIS0011")));
        assert_eq!(&first.raw[..], b"$9\r\nREDIS0011");

        let second = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.frame, Frame::command(["PING"]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_snapshot_framing_only_applies_at_top_level() {
        let mut buf = BytesMut::from(&b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$7\r\nREDISxx\r\n"[..]);
        let decoded = Frame::decode_snapshot(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.frame, Frame::command(["SET", "k", "REDISxx"]));
    }

    #[test]
    fn test_redis_prefixed_value_is_a_plain_bulk_string() {
        let mut buf = BytesMut::from(&b"$12\r\nREDIS is fun\r\n+PONG\r\n"[..]);
        let first = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.frame, Frame::BulkString(Bytes::from("REDIS is fun")));
        let second = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.frame, Frame::SimpleString("PONG".into()));
    }

    #[test]
    fn test_snapshot_prefix_needs_five_bytes() {
        let mut buf = BytesMut::from(&b"$9\r\nRED"[..]);
        assert!(Frame::decode_snapshot(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 7);
    }

    #[test]
    fn test_deeply_nested_array_is_rejected() {
        let mut src = b"*1\r\n".repeat(10_000);
        src.extend_from_slice(b":1\r\n");
        assert!(matches!(parse(&src), Err(Error::Protocol(msg)) if msg == "nesting too deep"));

        // rejected before the input is complete
        let truncated = b"*1\r\n".repeat(10_000);
        assert!(matches!(parse(&truncated), Err(Error::Protocol(_))));

        let mut buf = BytesMut::from(&src[..]);
        assert!(matches!(Frame::decode(&mut buf), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_nesting_up_to_the_limit_is_accepted() {
        let mut src = b"*1\r\n".repeat(MAX_DEPTH);
        src.extend_from_slice(b":1\r\n");
        let mut frame = parse(&src).unwrap();
        for _ in 0..MAX_DEPTH {
            frame = match frame {
                Frame::Array(mut inner) => inner.remove(0),
                other => panic!("expected array, got {other:?}"),
            };
        }
        assert_eq!(frame, Frame::Integer(1));
    }

    #[test]
    fn test_invalid_frame() {
        let err = parse(b"invalid frame\r\n").unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg.contains('i')));
    }

    #[test]
    fn test_decode_waits_without_consuming() {
        let mut buf = BytesMut::from(&b"*2\r\n$4\r\nECHO\r\n$3\r\nhe"[..]);
        assert!(Frame::decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 20);

        buf.extend_from_slice(b"y\r\n:7\r\n");
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.frame, Frame::command(["ECHO", "hey"]));
        assert_eq!(&decoded.raw[..], b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n");
        assert_eq!(&buf[..], b":7\r\n");
    }

    #[test]
    fn test_raw_span_decodes_to_same_frame() {
        let wire: &[u8] = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n+OK\r\n$-1\r\n";
        let mut buf = BytesMut::from(wire);
        let mut captured = Vec::new();
        while let Some(decoded) = Frame::decode(&mut buf).unwrap() {
            let mut fresh = BytesMut::from(&decoded.raw[..]);
            let again = Frame::decode(&mut fresh).unwrap().unwrap();
            assert_eq!(again, decoded);
            assert!(fresh.is_empty());
            captured.extend_from_slice(&decoded.raw);
        }
        assert_eq!(captured, wire);
    }

    #[test]
    fn test_encode() {
        assert_eq!(&Frame::SimpleString("PONG".into()).to_bytes()[..], b"+PONG\r\n");
        assert_eq!(&Frame::SimpleError("ERR x".into()).to_bytes()[..], b"-ERR x\r\n");
        assert_eq!(&Frame::Integer(-3).to_bytes()[..], b":-3\r\n");
        assert_eq!(
            &Frame::BulkString(Bytes::from("bar")).to_bytes()[..],
            b"$3\r\nbar\r\n"
        );
        assert_eq!(&Frame::NullBulkString.to_bytes()[..], b"$-1\r\n");
        assert_eq!(&Frame::Null.to_bytes()[..], b"_\r\n");
        assert_eq!(&Frame::Boolean(false).to_bytes()[..], b"#f\r\n");
        assert_eq!(&Frame::Double(1.5).to_bytes()[..], b",1.5\r\n");
        assert_eq!(&Frame::Double(f64::NAN).to_bytes()[..], b",nan\r\n");
        assert_eq!(&Frame::BigNumber("42".into()).to_bytes()[..], b"(42\r\n");
        assert_eq!(
            &Frame::Rdb(Bytes::from_static(b"REDIS\x00")).to_bytes()[..],
            b"$6\r\nREDIS\x00"
        );
    }

    #[test]
    fn test_encode_command_array() {
        let frame = Frame::command(["REPLCONF", "GETACK", "*"]);
        assert_eq!(
            &frame.to_bytes()[..],
            b"*3\r\n$8\r\nREPLCONF\r\n$6\r\nGETACK\r\n$1\r\n*\r\n"
        );
    }

    #[test]
    fn test_encode_then_decode() {
        let frames = vec![
            Frame::SimpleString("OK".into()),
            Frame::SimpleError("ERR bad".into()),
            Frame::Integer(i64::MIN),
            Frame::BulkString(Bytes::from_static(b"\x00bin\r\nary")),
            Frame::NullBulkString,
            Frame::Null,
            Frame::Array(vec![
                Frame::Integer(1),
                Frame::Array(vec![Frame::SimpleString("nested".into())]),
                Frame::NullBulkString,
            ]),
        ];
        for frame in frames {
            let mut buf = BytesMut::new();
            frame.encode(&mut buf);
            let decoded = Frame::decode(&mut buf).unwrap().unwrap();
            assert_eq!(decoded.frame, frame);
            assert!(buf.is_empty());
        }
    }
}
