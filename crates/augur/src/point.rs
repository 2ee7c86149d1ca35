//! Program points: a named site plus its variables and tabulated samples.

use crate::{
    table::ValueTable,
    varinfo::{VarInfo, VarKind},
};

/// Number of derivation passes the engine runs (sizes, then aggregates).
pub const DERIVATION_PASSES: usize = 2;

/// A named location in the traced program together with everything observed
/// and derived there.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProgramPoint {
    /// The full label, e.g. `push:::BEGIN(x, stack[])`.
    pub name: String,
    /// Ordered, append-only variable list.
    pub vars: Vec<VarInfo>,
    /// Value tuple -> occurrence count; arity tracks `vars.len()`.
    pub table: ValueTable,
    /// Cumulative sample count (sum of tuple counts).
    pub samples: u64,
    /// Per-pass high-water marks of seed indices already consumed by
    /// derivation. Persistent across inference runs, so re-running the
    /// driver never re-derives duplicate variables.
    pub derived_marks: [usize; DERIVATION_PASSES],
}

impl ProgramPoint {
    pub fn new(name: String) -> Self {
        Self {
            name,
            vars: Vec::new(),
            table: ValueTable::new(),
            samples: 0,
            derived_marks: [0; DERIVATION_PASSES],
        }
    }

    /// Appends a variable and returns its stable index.
    pub fn add_variable(&mut self, name: String, kind: VarKind, is_derived: bool) -> usize {
        let index = self.vars.len();
        self.vars.push(VarInfo::new(name, kind, index, is_derived));
        index
    }

    pub fn var(&self, index: usize) -> &VarInfo {
        &self.vars[index]
    }

    /// Index of the canonical member of variable `index`'s equality class.
    pub fn canonical_of(&self, index: usize) -> usize {
        self.vars[index].canonical_var()
    }

    /// Checks the structural invariants that must hold at every quiescent
    /// moment: tuple arity matches the variable list, `equal_to` is
    /// symmetric, and derived lengths agree with the stored sequences.
    /// Debug builds call this at phase boundaries; tests call it directly.
    pub fn check_integrity(&self) {
        for (row, _) in self.table.rows() {
            assert_eq!(
                row.len(),
                self.vars.len(),
                "tuple arity out of sync with variable list at {}",
                self.name
            );
        }
        for vi in &self.vars {
            for &other in &vi.equal_to {
                assert!(
                    self.vars[other].equal_to.binary_search(&vi.index).is_ok(),
                    "equal_to not symmetric between {} and {}",
                    vi.index,
                    other
                );
            }
            if let Some(crate::varinfo::LenSource::Var(len_idx)) = vi.derived_len {
                for (row, _) in self.table.rows() {
                    if let Some(len) = row[vi.index].seq_len() {
                        assert_eq!(
                            row[len_idx].as_int(),
                            Some(len),
                            "derived length of {} disagrees with stored sequence",
                            vi.name
                        );
                    }
                }
            }
        }
    }
}
