//! Minimal Hack CPU used to execute translator output in tests.
#![allow(dead_code)]

use std::collections::HashMap;

use hackvm::driver::{translate_units, Options, Unit};
use hackvm::protocol::Frame;

const RAM_SIZE: usize = 32 * 1024;
const FIRST_VARIABLE: u16 = 16;
const STEP_LIMIT: usize = 5_000_000;

#[derive(Debug, Clone)]
enum Instruction {
    Address(u16),
    Compute {
        dest: String,
        comp: String,
        jump: String,
    },
}

fn predefined() -> HashMap<String, u16> {
    let mut symbols: HashMap<String, u16> = (0..16).map(|n| (format!("R{}", n), n)).collect();
    for (name, addr) in [("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4)] {
        symbols.insert(name.to_string(), addr);
    }
    symbols.insert("SCREEN".to_string(), 16384);
    symbols.insert("KBD".to_string(), 24576);
    symbols
}

/// Simple in-memory simulator for Hack assembly text.
pub struct Cpu {
    pub ram: Vec<i16>,
    pub a: i16,
    pub d: i16,
    pub pc: usize,
    program: Vec<Instruction>,
    symbols: HashMap<String, u16>,
}

impl Cpu {
    /// Two passes: labels first, then instructions with variables
    /// allocated from 16 upwards.
    pub fn assemble(asm: &str) -> Self {
        let lines: Vec<&str> = asm
            .lines()
            .map(|l| l.split_once("//").map(|(s, _)| s).unwrap_or(l).trim())
            .filter(|l| !l.is_empty())
            .collect();

        let mut symbols = predefined();
        let mut count = 0u16;
        for line in &lines {
            if let Some(label) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                assert!(
                    symbols.insert(label.to_string(), count).is_none(),
                    "duplicate label {label}"
                );
            } else {
                count += 1;
            }
        }

        let mut next_variable = FIRST_VARIABLE;
        let mut program = Vec::new();
        for line in lines {
            if line.starts_with('(') {
                continue;
            }
            if let Some(value) = line.strip_prefix('@') {
                let addr = match value.parse::<u16>() {
                    Ok(n) => n,
                    Err(_) => *symbols.entry(value.to_string()).or_insert_with(|| {
                        next_variable += 1;
                        next_variable - 1
                    }),
                };
                program.push(Instruction::Address(addr));
                continue;
            }
            let (rest, jump) = line.split_once(';').unwrap_or((line, ""));
            let (dest, comp) = rest.split_once('=').unwrap_or(("", rest));
            program.push(Instruction::Compute {
                dest: dest.to_string(),
                comp: comp.to_string(),
                jump: jump.to_string(),
            });
        }

        Cpu {
            ram: vec![0; RAM_SIZE],
            a: 0,
            d: 0,
            pc: 0,
            program,
            symbols,
        }
    }

    pub fn symbol(&self, name: &str) -> u16 {
        *self
            .symbols
            .get(name)
            .unwrap_or_else(|| panic!("unknown symbol {name}"))
    }

    pub fn peek(&self, addr: u16) -> i16 {
        self.ram[addr as usize]
    }

    pub fn poke(&mut self, addr: u16, value: i16) {
        self.ram[addr as usize] = value;
    }

    pub fn sp(&self) -> u16 {
        self.peek(0) as u16
    }

    /// Value on top of the stack.
    pub fn top(&self) -> i16 {
        self.peek(self.sp() - 1)
    }

    pub fn frame(&self) -> Frame {
        Frame {
            sp: self.peek(0) as u16,
            lcl: self.peek(1) as u16,
            arg: self.peek(2) as u16,
            this: self.peek(3) as u16,
            that: self.peek(4) as u16,
        }
    }

    pub fn set_frame(&mut self, frame: Frame) {
        for (addr, value) in [frame.sp, frame.lcl, frame.arg, frame.this, frame.that]
            .into_iter()
            .enumerate()
        {
            self.ram[addr] = value as i16;
        }
    }

    fn operand(&self, name: &str) -> i16 {
        match name {
            "A" => self.a,
            "D" => self.d,
            "M" => self.ram[self.a as u16 as usize],
            "0" => 0,
            "1" => 1,
            _ => panic!("bad operand {name}"),
        }
    }

    fn compute(&self, comp: &str) -> i16 {
        if comp == "-1" {
            return -1;
        }
        if let Some(x) = comp.strip_prefix('!') {
            return !self.operand(x);
        }
        if let Some(x) = comp.strip_prefix('-') {
            return self.operand(x).wrapping_neg();
        }
        if comp.len() == 3 {
            let lhs = self.operand(&comp[..1]);
            let rhs = self.operand(&comp[2..]);
            return match &comp[1..2] {
                "+" => lhs.wrapping_add(rhs),
                "-" => lhs.wrapping_sub(rhs),
                "&" => lhs & rhs,
                "|" => lhs | rhs,
                op => panic!("bad operator {op}"),
            };
        }
        self.operand(comp)
    }

    /// Executes one instruction; returns false when the program is parked
    /// in an `(L) @L 0;JMP` loop.
    fn step(&mut self) -> bool {
        let pc = self.pc;
        match self.program[pc].clone() {
            Instruction::Address(addr) => {
                self.a = addr as i16;
                self.pc += 1;
            }
            Instruction::Compute { dest, comp, jump } => {
                let value = self.compute(&comp);
                let target = self.a as u16 as usize;
                if dest.contains('M') {
                    self.ram[target] = value;
                }
                if dest.contains('D') {
                    self.d = value;
                }
                if dest.contains('A') {
                    self.a = value;
                }
                let taken = match jump.as_str() {
                    "" => false,
                    "JGT" => value > 0,
                    "JEQ" => value == 0,
                    "JGE" => value >= 0,
                    "JLT" => value < 0,
                    "JNE" => value != 0,
                    "JLE" => value <= 0,
                    "JMP" => true,
                    other => panic!("bad jump {other}"),
                };
                if taken {
                    self.pc = target;
                    if target + 1 == pc {
                        return false;
                    }
                } else {
                    self.pc += 1;
                }
            }
        }
        true
    }

    /// Runs until the program falls off the end or parks in a halt loop.
    pub fn run(&mut self) {
        for _ in 0..STEP_LIMIT {
            if self.pc >= self.program.len() || !self.step() {
                return;
            }
        }
        panic!("step limit exceeded at pc {}", self.pc);
    }

    /// Runs until execution reaches `label`.
    pub fn run_until(&mut self, label: &str) {
        let stop = self.symbol(label) as usize;
        for _ in 0..STEP_LIMIT {
            if self.pc == stop {
                return;
            }
            assert!(self.pc < self.program.len() && self.step(), "halted before {label}");
        }
        panic!("step limit exceeded before {label}");
    }
}

/// Translates the units (bootstrap first when asked) into one program.
pub fn program(units: &[(&str, &str)], with_bootstrap: bool) -> Cpu {
    let units: Vec<Unit> = units
        .iter()
        .map(|(name, source)| Unit {
            name: name.to_string(),
            source: source.to_string(),
        })
        .collect();
    let asm = translate_units(&units, with_bootstrap, &Options::default()).expect("translation");
    Cpu::assemble(&asm)
}

/// Runs top-level VM code with SP=256 and the segment bases given.
pub fn run_snippet(source: &str, frame: Frame) -> Cpu {
    let mut cpu = program(&[("Test", source)], false);
    cpu.set_frame(frame);
    cpu.run();
    cpu
}

pub fn snippet_frame() -> Frame {
    Frame {
        sp: 256,
        lcl: 300,
        arg: 400,
        this: 3000,
        that: 4000,
    }
}
