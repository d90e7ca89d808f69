use std::iter::Enumerate;
use std::str::Lines;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{digit1, space1},
    combinator::{all_consuming, map, map_res, value, verify},
    sequence::tuple,
    IResult,
};

use crate::ast::{ArithmeticOp, Command, Segment};
use crate::error::{Error, Result};

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((
        value(Segment::Constant, tag("constant")),
        value(Segment::Local, tag("local")),
        value(Segment::Static, tag("static")),
        value(Segment::Argument, tag("argument")),
        value(Segment::This, tag("this")),
        value(Segment::That, tag("that")),
        value(Segment::Pointer, tag("pointer")),
        value(Segment::Temp, tag("temp")),
    ))(input)
}

// `pop constant n` is accepted here; the emitter rejects it.
fn memory_access(input: &str) -> IResult<&str, Command> {
    map(
        tuple((alt((tag("push"), tag("pop"))), space1, segment, space1, integer)),
        |(op, _, segment, _, index)| match op {
            "push" => Command::Push(segment, index),
            _ => Command::Pop(segment, index),
        },
    )(input)
}

fn arithmetic(input: &str) -> IResult<&str, Command> {
    map(
        alt((
            value(ArithmeticOp::Add, tag("add")),
            value(ArithmeticOp::Sub, tag("sub")),
            value(ArithmeticOp::Neg, tag("neg")),
            value(ArithmeticOp::Eq, tag("eq")),
            value(ArithmeticOp::Gt, tag("gt")),
            value(ArithmeticOp::Lt, tag("lt")),
            value(ArithmeticOp::And, tag("and")),
            value(ArithmeticOp::Or, tag("or")),
            value(ArithmeticOp::Not, tag("not")),
        )),
        Command::Arithmetic,
    )(input)
}

fn symbol(input: &str) -> IResult<&str, String> {
    map(
        verify(
            take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':')),
            |sym: &str| !sym.starts_with(|c: char| c.is_ascii_digit()),
        ),
        |sym: &str| sym.to_string(),
    )(input)
}

fn branching(input: &str) -> IResult<&str, Command> {
    map(
        tuple((
            alt((tag("label"), tag("goto"), tag("if-goto"))),
            space1,
            symbol,
        )),
        |(op, _, sym)| match op {
            "label" => Command::Label(sym),
            "goto" => Command::Goto(sym),
            _ => Command::IfGoto(sym),
        },
    )(input)
}

fn function(input: &str) -> IResult<&str, Command> {
    map(
        tuple((
            alt((tag("function"), tag("call"))),
            space1,
            symbol,
            space1,
            integer,
        )),
        |(op, _, name, _, n)| match op {
            "function" => Command::Function(name, n),
            _ => Command::Call(name, n),
        },
    )(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    alt((
        memory_access,
        branching,
        function,
        value(Command::Return, tag("return")),
        arithmetic,
    ))(input)
}

/// Strips a trailing `//` comment and surrounding whitespace.
fn strip(line: &str) -> &str {
    line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim()
}

/// Parses a single, already stripped, non-empty line.
pub fn parse_line(line_no: usize, line: &str) -> Result<Command> {
    all_consuming(command)(line)
        .map(|(_, command)| command)
        .map_err(|_| Error::MalformedCommand {
            line: line_no,
            text: line.to_string(),
        })
}

/// Lazily parsed commands of one VM source unit.
///
/// A clone is an independent cursor at the same position, so cloning before
/// iterating (or calling [`parse`] again) walks the source a second time.
#[derive(Debug, Clone)]
pub struct Commands<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl<'a> Iterator for Commands<'a> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        for (idx, raw) in self.lines.by_ref() {
            let line = strip(raw);
            if line.is_empty() {
                continue;
            }
            return Some(parse_line(idx + 1, line));
        }
        None
    }
}

pub fn parse(input: &str) -> Commands<'_> {
    Commands {
        lines: input.lines().enumerate(),
    }
}

/// Parses the whole unit eagerly, stopping at the first malformed line.
pub fn parse_all(input: &str) -> Result<Vec<Command>> {
    parse(input).collect()
}
