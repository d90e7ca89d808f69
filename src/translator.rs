use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::ast::{ArithmeticOp, Command, Segment};
use crate::error::{Error, Result};
use crate::labels::LabelAllocator;
use crate::parser;
use crate::protocol::{lower_call, lower_function, lower_return};
use crate::segment::{resolve, Location};

fn at(arg: impl std::fmt::Display) -> String {
    format!("@{}", arg)
}

fn push_d() -> Vec<String> {
    svec!["@SP", "M=M+1", "A=M-1", "M=D"] // Don't need to refetch SP; this is safe
}

/// Loads the value at `location` into D and pushes it.
fn push(location: &Location) -> Vec<String> {
    let mut asm = match location {
        Location::Immediate(value) => svec![at(value), "D=A"],
        Location::Direct(symbol) => svec![at(symbol), "D=M"],
        Location::Indirect { base, offset } => svec![
            at(base),
            "D=M",
            at(offset),
            "A=D+A", // A = SEG+arg
            "D=M"
        ],
    };
    asm.extend(push_d());
    asm
}

/// Stores the popped value at `location`; constants have no address.
fn pop(location: &Location) -> Result<Vec<String>> {
    let asm = match location {
        Location::Immediate(index) => return Err(Error::PopConstant { index: *index }),
        Location::Direct(symbol) => svec!["@SP", "AM=M-1", "D=M", at(symbol), "M=D"],
        Location::Indirect { base, offset } => svec![
            at(base),
            "D=M",
            at(offset),
            "D=D+A",
            "@R13",
            "M=D", // Store target addr in R13
            "@SP",
            "AM=M-1", // SP--, A <- new SP (val to be popped)
            "D=M",
            "@R13",
            "A=M", // At the target address...
            "M=D"  // ... store the popped val
        ],
    };
    Ok(asm)
}

fn simple_un_op(comp: &str) -> Vec<String> {
    svec!["@SP", "A=M-1", format!("M={}", comp)]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(comp: &str) -> Vec<String> {
    svec![
        "@SP",
        "AM=M-1", // SP--, looking at top of stack now
        "D=M",    // Right arg in D
        "A=A-1",  // Looking at second arg of stack, will overwrite
        format!("M={}", comp)
    ]
}

/// `goto`/`if-goto` targets and `label` definitions seen in one function.
#[derive(Debug, Default)]
struct LabelUses {
    defined: BTreeSet<String>,
    referenced: BTreeSet<String>,
}

/// Lowers the commands of one translation unit.
///
/// A translator is created per unit; `unit` is the static base used to
/// qualify `static` cells. The [`LabelAllocator`] is shared by every unit of
/// the program.
pub struct Translator {
    unit: String,
    labels: LabelAllocator,
    current_function: Option<String>,
    label_uses: BTreeMap<String, LabelUses>,
    annotate: bool,
}

impl Translator {
    pub fn new(unit: &str, labels: LabelAllocator) -> Self {
        Translator {
            unit: unit.to_string(),
            labels,
            current_function: None,
            label_uses: BTreeMap::new(),
            annotate: true,
        }
    }

    /// Whether each lowered command is preceded by a `// <command>` line.
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn current_function(&self) -> Option<&str> {
        self.current_function.as_deref()
    }

    fn function_for(&self, command: &Command) -> Result<&str> {
        match (&self.current_function, command) {
            (Some(function), _) => Ok(function.as_str()),
            (None, Command::Return) => Err(Error::ReturnOutsideFunction),
            (None, _) => Err(Error::LabelOutsideFunction {
                command: command.to_string(),
            }),
        }
    }

    /// Convert VM label to Hack ASM symbol - for consistency across instructions
    fn label_to_sym(&self, command: &Command, label: &str) -> Result<String> {
        let function = self.function_for(command)?;
        Ok(format!("{}${}", function, label))
    }

    fn record_label(&mut self, label: &str, defined: bool) {
        if let Some(function) = &self.current_function {
            let uses = self.label_uses.entry(function.clone()).or_default();
            let set = if defined {
                &mut uses.defined
            } else {
                &mut uses.referenced
            };
            set.insert(label.to_string());
        }
    }

    fn push(&self, segment: Segment, index: u16) -> Result<Vec<String>> {
        Ok(push(&resolve(segment, index, &self.unit)?))
    }

    fn pop(&self, segment: Segment, index: u16) -> Result<Vec<String>> {
        pop(&resolve(segment, index, &self.unit)?)
    }

    /// `x - y` overflows when the signs differ, so D only holds the
    /// difference when they match; otherwise it holds +1/-1 from x's sign.
    fn compare(&self, jump: &str) -> Vec<String> {
        let labels = self.labels.comparison(&self.unit);
        svec![
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg (y) in D
            "@R13",
            "M=D",
            "@SP",
            "A=M-1", // Looking at second arg of stack, will overwrite
            "D=M",   // Left arg (x) in D
            at(&labels.x_negative),
            "D;JLT",
            "@R13",
            "D=M",
            at(&labels.same_sign),
            "D;JGE",
            "D=1", // x >= 0 > y
            at(&labels.decided),
            "0;JMP",
            format!("({})", labels.x_negative),
            "@R13",
            "D=M",
            at(&labels.same_sign),
            "D;JLT",
            "D=-1", // x < 0 <= y
            at(&labels.decided),
            "0;JMP",
            format!("({})", labels.same_sign),
            "@R13",
            "D=M",
            "@SP",
            "A=M-1",
            "D=M-D", // Same signs; cannot overflow
            format!("({})", labels.decided),
            at(&labels.when_true),
            format!("D;J{}", jump),
            "D=0",
            at(&labels.end),
            "0;JMP",
            format!("({})", labels.when_true),
            "D=-1",
            format!("({})", labels.end),
            "@SP",
            "A=M-1",
            "M=D"
        ]
    }

    fn arithmetic(&self, op: ArithmeticOp) -> Vec<String> {
        match op {
            ArithmeticOp::Add => simple_bin_op("D+M"),
            ArithmeticOp::Sub => simple_bin_op("M-D"),
            ArithmeticOp::And => simple_bin_op("D&M"),
            ArithmeticOp::Or => simple_bin_op("D|M"),
            ArithmeticOp::Neg => simple_un_op("-M"),
            ArithmeticOp::Not => simple_un_op("!M"),
            ArithmeticOp::Eq => self.compare("EQ"),
            ArithmeticOp::Gt => self.compare("GT"),
            ArithmeticOp::Lt => self.compare("LT"),
        }
    }

    /// Lowers one command, updating the unit's context.
    pub fn lower(&mut self, command: &Command) -> Result<Vec<String>> {
        trace!(unit = %self.unit, %command, "lowering");
        let asm = match command {
            Command::Arithmetic(op) => self.arithmetic(*op),
            Command::Push(segment, index) => self.push(*segment, *index)?,
            Command::Pop(segment, index) => self.pop(*segment, *index)?,
            Command::Label(label) => {
                let sym = self.label_to_sym(command, label)?;
                self.record_label(label, true);
                svec![format!("({})", sym)]
            }
            Command::Goto(label) => {
                let sym = self.label_to_sym(command, label)?;
                self.record_label(label, false);
                svec![at(sym), "0;JMP"] // Unconditional jump
            }
            Command::IfGoto(label) => {
                let sym = self.label_to_sym(command, label)?;
                self.record_label(label, false);
                svec![
                    "@SP",
                    "AM=M-1",
                    "D=M", // Stack popped into D
                    at(sym),
                    "D;JNE" // False is 0
                ]
            }
            Command::Function(name, n_locals) => {
                debug!(unit = %self.unit, function = %name, n_locals, "entering function");
                self.current_function = Some(name.clone());
                self.label_uses.entry(name.clone()).or_default();
                lower_function(name, *n_locals)
            }
            Command::Call(callee, n_args) => {
                let caller = self.current_function.as_deref().unwrap_or(&self.unit);
                let return_label = self.labels.return_address(caller);
                lower_call(callee, *n_args, &return_label)?
            }
            Command::Return => {
                self.function_for(command)?;
                lower_return()
            }
        };
        Ok(asm)
    }

    /// Fails on the first `goto`/`if-goto` whose target no `label` in the
    /// same function defines.
    pub fn check_labels(&self) -> Result<()> {
        for (function, uses) in &self.label_uses {
            if let Some(label) = uses.referenced.difference(&uses.defined).next() {
                return Err(Error::UndefinedLabel {
                    function: function.clone(),
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }

    fn lower_annotated(&mut self, command: &Command, instructions: &mut Vec<String>) -> Result<()> {
        let translated = self.lower(command)?;
        if self.annotate {
            instructions.push(format!("// {}", command));
        }
        instructions.extend(translated);
        Ok(())
    }

    pub fn translate<'c>(
        &mut self,
        commands: impl IntoIterator<Item = &'c Command>,
    ) -> Result<Vec<String>> {
        let mut instructions: Vec<String> = vec![];

        for command in commands {
            self.lower_annotated(command, &mut instructions)?;
        }

        self.check_labels()?;
        Ok(instructions)
    }

    /// Parses and lowers a whole unit, one command at a time.
    pub fn translate_source(&mut self, source: &str) -> Result<Vec<String>> {
        let mut instructions: Vec<String> = vec![];

        for command in parser::parse(source) {
            self.lower_annotated(&command?, &mut instructions)?;
        }

        self.check_labels()?;
        Ok(instructions)
    }
}
