//! Lowers stack-machine VM code to Hack assembly.

macro_rules! svec {
    ($($x:expr),* $(,)?) => (vec![$($x.to_string()),*]);
}

pub mod ast;
pub mod bootstrap;
pub mod driver;
pub mod error;
pub mod labels;
pub mod logging;
pub mod parser;
pub mod protocol;
pub mod segment;
pub mod translator;

pub use ast::{ArithmeticOp, Command, Segment};
pub use error::{Error, Result};
pub use labels::LabelAllocator;
pub use translator::Translator;
