use crate::{Error, Frame, LResult};
use bytes::Bytes;

/// Indexed view over the arguments of a command frame.
///
/// The command name is split off on construction, so `len` counts the
/// arguments only. Argument counts are checked against the command table
/// before a command's own parser walks the arguments.
#[derive(Debug)]
pub struct Parse {
    name: String,
    parts: Vec<Frame>,
    pos: usize,
}

impl Parse {
    pub(crate) fn new(frame: Frame) -> LResult<Parse> {
        let mut parts = match frame {
            Frame::Array(array) => array.into_iter(),
            frame => return Err(Error::Protocol(format!("expected array, got {frame:?}"))),
        };
        let name = match parts.next() {
            Some(frame) => frame_to_string(frame)?,
            None => return Err(Error::Protocol("empty command".to_string())),
        };

        Ok(Parse {
            name,
            parts: parts.collect(),
            pos: 0,
        })
    }

    /// Command name as sent by the peer, case preserved.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments, not counting the command name.
    pub(crate) fn len(&self) -> usize {
        self.parts.len()
    }

    /// Number of arguments not consumed yet.
    pub(crate) fn remaining(&self) -> usize {
        self.parts.len() - self.pos
    }

    fn next(&mut self) -> LResult<Frame> {
        let frame = self.parts.get(self.pos).cloned().ok_or(Error::EndOfStream)?;
        self.pos += 1;
        Ok(frame)
    }

    #[tracing::instrument(skip_all, level = "debug")]
    pub(crate) fn next_string(&mut self) -> LResult<String> {
        frame_to_string(self.next()?)
    }

    pub(crate) fn next_bytes(&mut self) -> LResult<Bytes> {
        match self.next()? {
            Frame::SimpleString(s) => Ok(Bytes::from(s.into_bytes())),
            Frame::BulkString(data) => Ok(data),
            frame => Err(Error::Protocol(format!(
                "expected simple frame or bulk frame, got {frame:?}"
            ))),
        }
    }

    pub(crate) fn next_int(&mut self) -> LResult<u64> {
        match self.next()? {
            Frame::Integer(v) => u64::try_from(v).map_err(|_| Error::not_an_integer()),
            Frame::SimpleString(data) => parse_number(data.as_bytes()),
            Frame::BulkString(data) => parse_number(&data),
            frame => Err(Error::Protocol(format!(
                "expected int frame, got {frame:?}"
            ))),
        }
    }

    /// Like [`Parse::next_int`] but accepts a leading minus sign.
    pub(crate) fn next_signed(&mut self) -> LResult<i64> {
        match self.next()? {
            Frame::Integer(v) => Ok(v),
            Frame::SimpleString(data) => parse_number(data.as_bytes()),
            Frame::BulkString(data) => parse_number(&data),
            frame => Err(Error::Protocol(format!(
                "expected int frame, got {frame:?}"
            ))),
        }
    }

    pub(crate) fn finish(&mut self) -> LResult<()> {
        if self.remaining() == 0 {
            Ok(())
        } else {
            Err(Error::Syntax)
        }
    }
}

/// The whole argument must be a number, trailing bytes are rejected.
fn parse_number<T: atoi::FromRadix10SignedChecked>(text: &[u8]) -> LResult<T> {
    match T::from_radix_10_signed_checked(text) {
        (Some(value), used) if used == text.len() && text.last().is_some_and(u8::is_ascii_digit) => {
            Ok(value)
        }
        _ => Err(Error::not_an_integer()),
    }
}

fn frame_to_string(frame: Frame) -> LResult<String> {
    match frame {
        Frame::SimpleString(s) => Ok(s),
        Frame::BulkString(data) => std::str::from_utf8(&data[..])
            .map(|s| s.to_string())
            .map_err(|e| Error::Protocol(e.to_string())),
        frame => Err(Error::Protocol(format!(
            "expected simple frame or bulk frame, got {frame:?}"
        ))),
    }
}
