//! Maps `(segment, index)` pairs to the address recipe the emitter lowers.

use crate::ast::Segment;
use crate::error::{Error, Result};

/// Largest value a single A-instruction can load.
pub const MAX_CONSTANT: u16 = 0x7fff;

const POINTER_BASE: u16 = 3;
const POINTER_MAX: u16 = 1;
const TEMP_BASE: u16 = 5;
const TEMP_MAX: u16 = 7;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Location {
    /// No address; the index itself is the value.
    Immediate(u16),
    /// A fixed or symbolic cell, addressed as `@symbol`.
    Direct(String),
    /// `*base + offset`, where `base` names a pointer register.
    Indirect { base: &'static str, offset: u16 },
}

fn check_range(segment: Segment, index: u16, max: u16) -> Result<()> {
    if index > max {
        return Err(Error::SegmentRange {
            segment,
            index,
            max,
        });
    }
    Ok(())
}

/// Resolves a memory-access operand. `static_base` qualifies static cells
/// so that two units never share one.
pub fn resolve(segment: Segment, index: u16, static_base: &str) -> Result<Location> {
    let location = match segment {
        Segment::Constant => {
            check_range(segment, index, MAX_CONSTANT)?;
            Location::Immediate(index)
        }
        Segment::Local => Location::Indirect {
            base: "LCL",
            offset: index,
        },
        Segment::Argument => Location::Indirect {
            base: "ARG",
            offset: index,
        },
        Segment::This => Location::Indirect {
            base: "THIS",
            offset: index,
        },
        Segment::That => Location::Indirect {
            base: "THAT",
            offset: index,
        },
        Segment::Pointer => {
            check_range(segment, index, POINTER_MAX)?;
            Location::Direct(format!("R{}", POINTER_BASE + index))
        }
        Segment::Temp => {
            check_range(segment, index, TEMP_MAX)?;
            Location::Direct(format!("R{}", TEMP_BASE + index))
        }
        Segment::Static => Location::Direct(format!("{}.{}", static_base, index)),
    };
    Ok(location)
}
