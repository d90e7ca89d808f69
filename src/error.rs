use thiserror::Error;

use crate::ast::Segment;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("line {line}: malformed command `{text}`")]
    MalformedCommand { line: usize, text: String },
    #[error("{segment} {index} is out of range (max {max})")]
    SegmentRange {
        segment: Segment,
        index: u16,
        max: u16,
    },
    #[error("call {callee} passes {n_args} arguments (max {max})")]
    TooManyArguments {
        callee: String,
        n_args: u16,
        max: u16,
    },
    #[error("`{command}` is only legal inside a function")]
    LabelOutsideFunction { command: String },
    #[error("`return` is only legal inside a function")]
    ReturnOutsideFunction,
    #[error("cannot pop into constant {index}")]
    PopConstant { index: u16 },
    #[error("function {function} jumps to undefined label {label}")]
    UndefinedLabel { function: String, label: String },
}
