use tracing::debug;

use crate::error::Result;
use crate::labels::LabelAllocator;
use crate::protocol::lower_call;

pub const STACK_BASE: u16 = 256;
pub const ENTRY_FUNCTION: &str = "Sys.init";

/// Caller name used for the return label of the root call.
const BOOTSTRAP_CALLER: &str = "Bootstrap";

/// `SP = 256` followed by an ordinary `call entry 0`.
pub fn bootstrap(entry: &str, labels: &LabelAllocator) -> Result<Vec<String>> {
    debug!(entry, "emitting bootstrap");
    let mut asm = svec![
        "// bootstrap",
        format!("@{}", STACK_BASE),
        "D=A",
        "@SP",
        "M=D",
        format!("// call {} 0", entry)
    ];
    let return_label = labels.return_address(BOOTSTRAP_CALLER);
    asm.extend(lower_call(entry, 0, &return_label)?);
    Ok(asm)
}
