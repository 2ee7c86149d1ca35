//! Variable registry entries and equality-class canonicalization.

use indexmap::IndexMap;
use smallvec::SmallVec;
use strum::{Display, IntoStaticStr};

use crate::invariants::Invariant;

/// Whether a variable holds scalars or sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum VarKind {
    Scalar,
    Sequence,
}

/// Where a sequence variable's length lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LenSource {
    /// Index of the scalar variable holding the length of every sample.
    Var(usize),
    /// The length is known (one more than some scalar) but no variable
    /// holds that exact value.
    KnownConst,
}

/// One entry in a program point's variable list.
///
/// Entries reference each other by index; indices are stable for the
/// lifetime of the program point (the list is append-only).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VarInfo {
    pub name: String,
    pub kind: VarKind,
    /// Position in the variable list.
    pub index: usize,
    /// For sequences: where the derived length lives, if anywhere.
    pub derived_len: Option<LenSource>,
    /// True if this variable was synthesized by a derivation pass or the
    /// trace reader, rather than observed directly.
    pub is_derived: bool,
    /// Singleton invariant, assigned once per inference run.
    pub invariant: Option<Invariant>,
    /// Pairwise invariants keyed by the co-variable's index (always greater
    /// than `self.index`).
    pub pair_invariants: IndexMap<usize, Invariant>,
    /// Ternary invariants keyed by the ordered pair of co-variable indices.
    pub triple_invariants: IndexMap<(usize, usize), Invariant>,
    /// Sorted indices of variables proven equal to this one. The variable
    /// itself is not listed. Maintained symmetrically.
    pub equal_to: SmallVec<[usize; 4]>,
}

impl VarInfo {
    pub fn new(name: String, kind: VarKind, index: usize, is_derived: bool) -> Self {
        Self {
            name,
            kind,
            index,
            derived_len: None,
            is_derived,
            invariant: None,
            pair_invariants: IndexMap::new(),
            triple_invariants: IndexMap::new(),
            equal_to: SmallVec::new(),
        }
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == VarKind::Sequence
    }

    /// Index of the canonical (lowest-index) member of this variable's
    /// equality class.
    pub fn canonical_var(&self) -> usize {
        match self.equal_to.first() {
            Some(&lowest) => self.index.min(lowest),
            None => self.index,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.index == self.canonical_var()
    }

    /// Records `other` as equal to this variable, keeping `equal_to` sorted
    /// and duplicate-free.
    pub fn record_equal(&mut self, other: usize) {
        debug_assert_ne!(other, self.index);
        if let Err(pos) = self.equal_to.binary_search(&other) {
            self.equal_to.insert(pos, other);
        }
    }
}

/// Name of the derived size variable for a sequence variable name.
pub(crate) fn size_name(seq: &str) -> String {
    format!("size({seq})")
}

/// True when the name denotes a derived sequence length (`size(...)`).
pub(crate) fn is_size_name(name: &str) -> bool {
    name.starts_with("size(")
}

/// `min(A)` -> `A`.
pub(crate) fn min_arg(name: &str) -> Option<&str> {
    name.strip_prefix("min(").and_then(|rest| rest.strip_suffix(')'))
}

/// `max(A)` -> `A`.
pub(crate) fn max_arg(name: &str) -> Option<&str> {
    name.strip_prefix("max(").and_then(|rest| rest.strip_suffix(')'))
}

/// `A[i]` or `A[0..n]` -> `A`: the base of an indexing or slicing expression.
pub(crate) fn elem_base(name: &str) -> Option<&str> {
    name.find('[').map(|pos| &name[..pos])
}

/// True when `derived` names a slice of `base` (`base[...`).
pub(crate) fn is_slice_of(derived: &str, base: &str) -> bool {
    derived.len() > base.len() && derived.starts_with(base) && derived.as_bytes()[base.len()] == b'['
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_is_lowest_index_of_class() {
        let mut vi = VarInfo::new("x".to_owned(), VarKind::Scalar, 3, false);
        assert!(vi.is_canonical());
        vi.record_equal(5);
        assert!(vi.is_canonical());
        vi.record_equal(1);
        assert_eq!(vi.canonical_var(), 1);
        assert!(!vi.is_canonical());
        assert_eq!(vi.equal_to.as_slice(), &[1, 5]);
    }

    #[test]
    fn record_equal_is_idempotent() {
        let mut vi = VarInfo::new("x".to_owned(), VarKind::Scalar, 0, false);
        vi.record_equal(2);
        vi.record_equal(2);
        assert_eq!(vi.equal_to.as_slice(), &[2]);
    }

    #[test]
    fn structural_name_helpers() {
        assert!(is_size_name("size(A)"));
        assert_eq!(min_arg("min(A)"), Some("A"));
        assert_eq!(max_arg("max(xs)"), Some("xs"));
        assert_eq!(elem_base("A[0..n]"), Some("A"));
        assert_eq!(elem_base("plain"), None);
        assert!(is_slice_of("A[0..n]", "A"));
        assert!(!is_slice_of("AB[0]", "A"));
    }
}
