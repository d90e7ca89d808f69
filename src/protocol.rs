//! The calling convention: function entry, call and return.
//!
//! A call saves five words above the caller's pushed arguments:
//!
//! ```text
//! ARG ->  arg 0 .. arg n-1
//!         return address
//!         saved LCL
//!         saved ARG
//!         saved THIS
//!         saved THAT
//! LCL ->  local 0 .. local k-1
//! ```
//!
//! The lowering functions are pure; [`Frame`] models the register effect of
//! the emitted code so the convention can be checked without a full program.

use crate::error::{Error, Result};
use crate::segment::MAX_CONSTANT;

/// Words saved by every call site.
pub const SAVED_WORDS: u16 = 5;

/// Largest `n_args` whose `5 + n_args` still fits one A-instruction.
pub const MAX_ARGS: u16 = MAX_CONSTANT - SAVED_WORDS;

const SAVED_POINTERS: [&str; 4] = ["LCL", "ARG", "THIS", "THAT"];

/// Appends "push D".
fn push_d(asm: &mut Vec<String>) {
    asm.extend(svec!["@SP", "M=M+1", "A=M-1", "M=D"]);
}

/// The VM registers as seen at one point of execution.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Frame {
    pub sp: u16,
    pub lcl: u16,
    pub arg: u16,
    pub this: u16,
    pub that: u16,
}

impl Frame {
    /// Registers on entry to the callee, given the caller's registers right
    /// before `call _ n_args` (arguments already pushed).
    pub fn enter(&self, n_args: u16) -> Frame {
        let sp = self.sp.wrapping_add(SAVED_WORDS);
        Frame {
            sp,
            lcl: sp,
            arg: self.sp.wrapping_sub(n_args),
            this: self.this,
            that: self.that,
        }
    }

    /// The five words a call writes at `self.sp`, in stack order.
    pub fn saved(&self, return_address: u16) -> [u16; SAVED_WORDS as usize] {
        [return_address, self.lcl, self.arg, self.this, self.that]
    }

    /// Caller registers once the callee has returned: the arguments are
    /// replaced by the single return value.
    pub fn resume(&self, n_args: u16) -> Frame {
        Frame {
            sp: self.sp.wrapping_sub(n_args).wrapping_add(1),
            ..*self
        }
    }
}

/// Entry label plus `n_locals` zeroed words pushed as the local segment.
pub fn lower_function(name: &str, n_locals: u16) -> Vec<String> {
    let mut asm = svec![format!("({})", name)];
    if n_locals == 0 {
        return asm;
    }

    asm.extend(svec!["@SP", "A=M"]);
    for _ in 0..n_locals {
        asm.extend(svec!["M=0", "A=A+1"]);
    }
    asm.extend(svec!["D=A", "@SP", "M=D"]);
    asm
}

pub fn lower_call(callee: &str, n_args: u16, return_label: &str) -> Result<Vec<String>> {
    if n_args > MAX_ARGS {
        return Err(Error::TooManyArguments {
            callee: callee.to_string(),
            n_args,
            max: MAX_ARGS,
        });
    }

    let mut asm = svec![format!("@{}", return_label), "D=A"];
    push_d(&mut asm);

    for pointer in SAVED_POINTERS {
        asm.extend(svec![format!("@{}", pointer), "D=M"]);
        push_d(&mut asm);
    }

    let arg_offset = SAVED_WORDS + n_args;
    asm.extend(svec![
        // ARG = SP - 5 - n_args
        "@SP",
        "D=M",
        format!("@{}", arg_offset),
        "D=D-A",
        "@ARG",
        "M=D",
        // LCL = SP
        "@SP",
        "D=M",
        "@LCL",
        "M=D",
        format!("@{}", callee),
        "0;JMP",
        format!("({})", return_label)
    ]);
    Ok(asm)
}

pub fn lower_return() -> Vec<String> {
    let mut asm = svec![
        // R13 = frame end (LCL)
        "@LCL",
        "D=M",
        "@R13",
        "M=D",
        // R14 = return address; read first, `*ARG` may alias it
        format!("@{}", SAVED_WORDS),
        "A=D-A",
        "D=M",
        "@R14",
        "M=D",
        // R15 = return value
        "@SP",
        "A=M-1",
        "D=M",
        "@R15",
        "M=D",
        // SP = ARG, then push the return value
        "@ARG",
        "D=M",
        "@SP",
        "M=D",
        "@R15",
        "D=M"
    ];
    push_d(&mut asm);

    for pointer in SAVED_POINTERS.iter().rev() {
        asm.extend(svec!["@R13", "AM=M-1", "D=M", format!("@{}", pointer), "M=D"]);
    }

    asm.extend(svec!["@R14", "A=M", "0;JMP"]);
    asm
}
