use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::debug;

use super::{Command, Reply};
use crate::db::{Expiry, SetCondition, SetOptions};
use crate::session::Session;
use crate::state::ServerState;
use crate::{parse::Parse, Error, Frame, LResult};

/// Expiry argument exactly as given on the command line.
///
/// Relative forms are turned into a deadline when the command is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ttl {
    Ex(u64),
    Px(u64),
    ExAt(u64),
    PxAt(u64),
    Keep,
}

/// `SET key value [NX | XX] [GET] [EX s | PX ms | EXAT t | PXAT t | KEEPTTL]`
///
/// Options may be given in any order.
#[derive(Debug, PartialEq, Eq)]
pub struct SetCmd {
    key: String,
    value: Bytes,
    condition: SetCondition,
    ttl: Option<Ttl>,
    /// `GET`: reply with the previous value instead of `OK`.
    get: bool,
}

impl SetCmd {
    pub fn new(key: impl ToString, value: Bytes, expire: Option<Duration>) -> SetCmd {
        SetCmd {
            key: key.to_string(),
            value,
            condition: SetCondition::Always,
            ttl: expire.map(|expire| Ttl::Px(expire.as_millis() as u64)),
            get: false,
        }
    }

    /// Only set the key if it does not exist (`NX`).
    pub fn if_absent(mut self) -> Self {
        self.condition = SetCondition::IfAbsent;
        self
    }

    /// Only set the key if it already exists (`XX`).
    pub fn if_present(mut self) -> Self {
        self.condition = SetCondition::IfPresent;
        self
    }

    /// Retain the key's current time to live (`KEEPTTL`).
    pub fn keep_ttl(mut self) -> Self {
        self.ttl = Some(Ttl::Keep);
        self
    }

    /// Reply with the value stored before this call (`GET`).
    pub fn return_previous(mut self) -> Self {
        self.get = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    fn expiry(&self) -> LResult<Expiry> {
        let deadline = match self.ttl {
            None => return Ok(Expiry::Persist),
            Some(Ttl::Keep) => return Ok(Expiry::Keep),
            Some(Ttl::Ex(secs)) => SystemTime::now().checked_add(Duration::from_secs(secs)),
            Some(Ttl::Px(millis)) => SystemTime::now().checked_add(Duration::from_millis(millis)),
            Some(Ttl::ExAt(secs)) => UNIX_EPOCH.checked_add(Duration::from_secs(secs)),
            Some(Ttl::PxAt(millis)) => UNIX_EPOCH.checked_add(Duration::from_millis(millis)),
        };
        deadline
            .map(Expiry::At)
            .ok_or_else(|| Error::InvalidArgument("invalid expire time in 'set' command".into()))
    }
}

impl Command for SetCmd {
    fn parse_frames(parse: &mut Parse) -> LResult<Self>
    where
        Self: Sized,
    {
        let key = parse.next_string()?;
        let value = parse.next_bytes()?;

        let mut condition = SetCondition::Always;
        let mut ttl = None;
        let mut keep_ttl = false;
        let mut get = false;

        while parse.remaining() > 0 {
            let option = parse.next_string()?.to_uppercase();
            match option.as_str() {
                "NX" | "XX" => {
                    if condition != SetCondition::Always {
                        return Err(Error::Syntax);
                    }
                    condition = if option == "NX" {
                        SetCondition::IfAbsent
                    } else {
                        SetCondition::IfPresent
                    };
                }
                "GET" => get = true,
                "KEEPTTL" => keep_ttl = true,
                "EX" | "PX" | "EXAT" | "PXAT" => {
                    if ttl.is_some() {
                        return Err(Error::Syntax);
                    }
                    let amount = match parse.next_int() {
                        Err(Error::EndOfStream) => return Err(Error::Syntax),
                        amount => amount?,
                    };
                    ttl = Some(match option.as_str() {
                        "EX" => Ttl::Ex(amount),
                        "PX" => Ttl::Px(amount),
                        "EXAT" => Ttl::ExAt(amount),
                        _ => Ttl::PxAt(amount),
                    });
                }
                _ => return Err(Error::Syntax),
            }
        }

        // KEEPTTL wins over any explicit expiry.
        if keep_ttl {
            ttl = Some(Ttl::Keep);
        }

        Ok(Self {
            key,
            value,
            condition,
            ttl,
            get,
        })
    }

    #[tracing::instrument(skip_all, fields(key = %self.key))]
    async fn apply(self, state: &ServerState, _session: &mut Session) -> LResult<Reply> {
        let options = SetOptions {
            condition: self.condition,
            expiry: self.expiry()?,
        };
        let return_previous = self.get;
        let outcome = state.db().set(self.key, self.value, options);

        let response = if return_previous {
            outcome
                .previous
                .map_or(Frame::NullBulkString, Frame::BulkString)
        } else if outcome.written {
            Frame::SimpleString("OK".to_string())
        } else {
            Frame::NullBulkString
        };
        debug!(?response, written = outcome.written);

        Ok(Reply::write(response, outcome.written))
    }

    fn into_frame(self) -> LResult<crate::Frame> {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from("set"))?;
        frame.push_bulk(Bytes::from(self.key))?;
        frame.push_bulk(self.value)?;
        match self.condition {
            SetCondition::Always => {}
            SetCondition::IfAbsent => frame.push_bulk(Bytes::from("NX"))?,
            SetCondition::IfPresent => frame.push_bulk(Bytes::from("XX"))?,
        }
        if self.get {
            frame.push_bulk(Bytes::from("GET"))?;
        }
        let ttl = match self.ttl {
            None => None,
            Some(Ttl::Keep) => {
                frame.push_bulk(Bytes::from("KEEPTTL"))?;
                None
            }
            Some(Ttl::Ex(n)) => Some(("EX", n)),
            Some(Ttl::Px(n)) => Some(("PX", n)),
            Some(Ttl::ExAt(n)) => Some(("EXAT", n)),
            Some(Ttl::PxAt(n)) => Some(("PXAT", n)),
        };
        if let Some((unit, amount)) = ttl {
            frame.push_bulk(Bytes::from(unit))?;
            frame.push_bulk(Bytes::from(amount.to_string()))?;
        }
        Ok(frame)
    }
}
