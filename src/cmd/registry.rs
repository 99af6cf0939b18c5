use std::collections::HashMap;

use super::{
    Command, CommandVariant, DelCmd, EchoCmd, GetCmd, InfoCmd, PingCmd, PsyncCmd, ReplconfCmd,
    SetCmd, WaitCmd,
};
use crate::{parse::Parse, Error, LResult};

type ParseFn = fn(&mut Parse) -> LResult<CommandVariant>;

/// Accepted number of arguments, the command name excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Arity {
    min: usize,
    max: Option<usize>,
}

impl Arity {
    const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    fn accepts(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }
}

#[derive(Debug)]
pub(crate) struct CommandSpec {
    name: &'static str,
    arity: Arity,
    parse: ParseFn,
}

impl CommandSpec {
    pub(crate) fn check_arity(&self, args: usize) -> LResult<()> {
        if self.arity.accepts(args) {
            Ok(())
        } else {
            Err(Error::WrongArity(self.name.to_lowercase()))
        }
    }

    pub(crate) fn parse(&self, parse: &mut Parse) -> LResult<CommandVariant> {
        (self.parse)(parse)
    }
}

/// Upper-cased command name to handler.
#[derive(Debug)]
pub(crate) struct CommandTable {
    specs: HashMap<&'static str, CommandSpec>,
}

impl CommandTable {
    pub(crate) fn new() -> Self {
        let builtin = [
            spec("DEL", Arity::at_least(1), |p| {
                Ok(CommandVariant::Del(DelCmd::parse_frames(p)?))
            }),
            spec("ECHO", Arity::exactly(1), |p| {
                Ok(CommandVariant::Echo(EchoCmd::parse_frames(p)?))
            }),
            spec("GET", Arity::exactly(1), |p| {
                Ok(CommandVariant::Get(GetCmd::parse_frames(p)?))
            }),
            spec("INFO", Arity::between(0, 1), |p| {
                Ok(CommandVariant::Info(InfoCmd::parse_frames(p)?))
            }),
            spec("PING", Arity::between(0, 1), |p| {
                Ok(CommandVariant::Ping(PingCmd::parse_frames(p)?))
            }),
            spec("PSYNC", Arity::exactly(2), |p| {
                Ok(CommandVariant::Psync(PsyncCmd::parse_frames(p)?))
            }),
            spec("REPLCONF", Arity::at_least(2), |p| {
                Ok(CommandVariant::Replconf(ReplconfCmd::parse_frames(p)?))
            }),
            spec("SET", Arity::at_least(2), |p| {
                Ok(CommandVariant::Set(SetCmd::parse_frames(p)?))
            }),
            spec("WAIT", Arity::exactly(2), |p| {
                Ok(CommandVariant::Wait(WaitCmd::parse_frames(p)?))
            }),
        ];

        let mut specs = HashMap::with_capacity(builtin.len());
        for spec in builtin {
            debug_assert_eq!(spec.name, spec.name.to_uppercase());
            let previous = specs.insert(spec.name, spec);
            debug_assert!(previous.is_none(), "command registered twice");
        }
        Self { specs }
    }

    pub(crate) fn lookup(&self, name: &str) -> LResult<&CommandSpec> {
        self.specs
            .get(name.to_uppercase().as_str())
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))
    }
}

fn spec(name: &'static str, arity: Arity, parse: ParseFn) -> CommandSpec {
    CommandSpec { name, arity, parse }
}
