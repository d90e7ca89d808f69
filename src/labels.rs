//! Program-wide label allocation.
//!
//! Every emitted label is a global symbol in the output, so the counters are
//! shared by all translation units of one run. A [`LabelAllocator`] is a
//! cheap handle; clones share the same counters and may be sent to other
//! threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    comparisons: AtomicUsize,
    call_sites: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct LabelAllocator {
    counters: Arc<Counters>,
}

/// Branch targets for one `eq`/`gt`/`lt` occurrence.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ComparisonLabels {
    pub x_negative: String,
    pub same_sign: String,
    pub decided: String,
    pub when_true: String,
    pub end: String,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comparison(&self, unit: &str) -> ComparisonLabels {
        let n = self.counters.comparisons.fetch_add(1, Ordering::Relaxed);
        ComparisonLabels {
            x_negative: format!("{}:CMPNEG_{}", unit, n),
            same_sign: format!("{}:CMPSAME_{}", unit, n),
            decided: format!("{}:CMPSIGN_{}", unit, n),
            when_true: format!("{}:CMP_{}", unit, n),
            end: format!("{}:ENDCMP_{}", unit, n),
        }
    }

    /// Return-address label for one call site inside `caller`.
    ///
    /// The second `$` keeps it out of reach of `{function}${label}`: VM
    /// label names cannot contain `$`.
    pub fn return_address(&self, caller: &str) -> String {
        let n = self.counters.call_sites.fetch_add(1, Ordering::Relaxed);
        format!("{}$ret${}", caller, n)
    }

    /// Number of call sites allocated so far.
    #[cfg(test)]
    pub(crate) fn call_sites(&self) -> usize {
        self.counters.call_sites.load(Ordering::Relaxed)
    }
}
