//! The invariant lattice: unary, binary, and ternary invariants over
//! scalars and sequences.
//!
//! Every invariant embeds a [`BaseInvariant`] carrying sample counts, the
//! distinct-tuple count, the missing flag, and (when the distinct count is
//! small) an enumerated `one_of` set. The concrete variants add the
//! family-specific relations. Rendering is pure: the same invariant renders
//! to the same text regardless of field assignment order.

mod functions;
mod linear;
mod scalar;
mod scalar_sequence;
mod sequence;
mod three_scalar;
mod two_scalar;
mod two_sequence;

pub use functions::{BinaryFn, UnaryFn, ASYMMETRIC_BINARY_POOL, SYMMETRIC_BINARY_POOL, UNARY_POOL};
pub use scalar::ScalarInvariant;
pub use scalar_sequence::ScalarSequenceInvariant;
pub use sequence::SequenceInvariant;
pub use three_scalar::ThreeScalarInvariant;
pub use two_scalar::TwoScalarInvariant;
pub use two_sequence::TwoSequenceInvariant;

pub(crate) use linear::{fit_bi_linear, render_bi_linear};

use ahash::AHashMap;
use smallvec::SmallVec;
use strum::Display;

use crate::value::Value;

/// One enumerated tuple of a `one_of` set; arity 1 for singleton
/// invariants, 2 or 3 for the multi-variable families.
pub type OneOfEntry = SmallVec<[Value; 3]>;

/// Fields shared by every invariant family.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BaseInvariant {
    /// Number of samples (occurrence-weighted).
    pub samples: u64,
    /// Number of distinct value tuples.
    pub distinct: usize,
    /// True when any observed slot was the missing marker.
    pub can_be_missing: bool,
    /// The distinct tuples, sorted, retained only while their count stays
    /// within the configured threshold.
    pub one_of: Option<Vec<OneOfEntry>>,
}

impl BaseInvariant {
    fn build<I>(entries: I, samples: u64, distinct: usize, can_be_missing: bool, threshold: usize) -> Self
    where
        I: FnOnce() -> Vec<OneOfEntry>,
    {
        let one_of = (distinct <= threshold).then(|| {
            let mut tuples = entries();
            tuples.sort();
            tuples
        });
        Self {
            samples,
            distinct,
            can_be_missing,
            one_of,
        }
    }

    pub(crate) fn from_counts1(counts: &AHashMap<Value, u64>, threshold: usize) -> Self {
        let samples = counts.values().sum();
        let distinct = counts.len();
        let can_be_missing = counts.keys().any(Value::is_missing);
        Self::build(
            || counts.keys().map(|v| SmallVec::from_vec(vec![v.clone()])).collect(),
            samples,
            distinct,
            can_be_missing,
            threshold,
        )
    }

    pub(crate) fn from_counts2(counts: &AHashMap<(Value, Value), u64>, threshold: usize) -> Self {
        let samples = counts.values().sum();
        let distinct = counts.len();
        let can_be_missing = counts.keys().any(|(a, b)| a.is_missing() || b.is_missing());
        Self::build(
            || {
                counts
                    .keys()
                    .map(|(a, b)| SmallVec::from_vec(vec![a.clone(), b.clone()]))
                    .collect()
            },
            samples,
            distinct,
            can_be_missing,
            threshold,
        )
    }

    pub(crate) fn from_counts3(counts: &AHashMap<(Value, Value, Value), u64>, threshold: usize) -> Self {
        let samples = counts.values().sum();
        let distinct = counts.len();
        let can_be_missing = counts
            .keys()
            .any(|(a, b, c)| a.is_missing() || b.is_missing() || c.is_missing());
        Self::build(
            || {
                counts
                    .keys()
                    .map(|(a, b, c)| SmallVec::from_vec(vec![a.clone(), b.clone(), c.clone()]))
                    .collect()
            },
            samples,
            distinct,
            can_be_missing,
            threshold,
        )
    }

    pub fn is_exact(&self) -> bool {
        self.distinct == 1
    }

    /// True when the variable is the constant missing marker: such
    /// variables are vacuous and excluded from derivation and inference.
    pub fn is_missing_constant(&self) -> bool {
        self.distinct == 1 && self.can_be_missing
    }

    /// The ` \t(k values[, can be missing])` report suffix.
    pub(crate) fn suffix(&self) -> String {
        if self.can_be_missing {
            format!(" \t({} values, can be missing)", self.distinct)
        } else {
            format!(" \t({} values)", self.distinct)
        }
    }

    /// The shared `one_of` rendering: an equality for a single tuple, an
    /// enumerated set while the sample count is too small to support a
    /// stronger claim. `None` means the caller should try its
    /// family-specific relations.
    pub(crate) fn render_prefix(&self, args_text: &str) -> Option<String> {
        let one_of = self.one_of.as_ref()?;
        match one_of.as_slice() {
            [single] => Some(format!("{args_text} = {}", render_entry(single))),
            _ if self.samples < 100 => Some(format!("{args_text} in {}", render_entry_set(one_of))),
            _ => None,
        }
    }
}

fn render_entry(entry: &OneOfEntry) -> String {
    match entry.as_slice() {
        [v] => v.to_string(),
        many => {
            let parts: Vec<String> = many.iter().map(ToString::to_string).collect();
            format!("({})", parts.join(", "))
        }
    }
}

pub(crate) fn render_entry_set(entries: &[OneOfEntry]) -> String {
    let parts: Vec<String> = entries.iter().map(render_entry).collect();
    format!("{{{}}}", parts.join(", "))
}

/// Result of rendering an invariant: its text plus whether the invariant
/// actually constrains the variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub constrained: bool,
}

impl Rendered {
    pub(crate) fn constrained(text: String) -> Self {
        Self { text, constrained: true }
    }

    pub(crate) fn unconstrained(text: String) -> Self {
        Self { text, constrained: false }
    }
}

/// Order relations a pair of variables can satisfy over every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, serde::Serialize, serde::Deserialize)]
pub enum Comparison {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

/// Single pass over all sample pairs, eliminating impossible relations.
/// Returns the strongest surviving comparison and whether the two sides
/// were ever observed equal.
pub(crate) fn compare_pairs(pairs: &[(Value, Value)]) -> (Option<Comparison>, bool) {
    let mut maybe_eq = true;
    let mut maybe_lt = true;
    let mut maybe_le = true;
    let mut maybe_gt = true;
    let mut maybe_ge = true;
    let mut maybe_ne = true;
    for (x, y) in pairs {
        match x.cmp(y) {
            std::cmp::Ordering::Equal => {
                maybe_lt = false;
                maybe_gt = false;
                maybe_ne = false;
            }
            std::cmp::Ordering::Less => {
                maybe_eq = false;
                maybe_gt = false;
                maybe_ge = false;
            }
            std::cmp::Ordering::Greater => {
                maybe_eq = false;
                maybe_lt = false;
                maybe_le = false;
            }
        }
        if !(maybe_eq || maybe_lt || maybe_le || maybe_gt || maybe_ge || maybe_ne) {
            break;
        }
    }
    let comparison = if maybe_eq {
        Some(Comparison::Eq)
    } else if maybe_lt {
        Some(Comparison::Lt)
    } else if maybe_le {
        Some(Comparison::Le)
    } else if maybe_gt {
        Some(Comparison::Gt)
    } else if maybe_ge {
        Some(Comparison::Ge)
    } else {
        None
    };
    (comparison, !maybe_ne)
}

/// The polymorphic invariant: one variant per arity/type family.
///
/// `Opaque` covers combinations with no family-specific relations (triples
/// involving a sequence); it carries only the base fields.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Invariant {
    Scalar(ScalarInvariant),
    Sequence(SequenceInvariant),
    TwoScalar(TwoScalarInvariant),
    ThreeScalar(ThreeScalarInvariant),
    ScalarSequence(ScalarSequenceInvariant),
    TwoSequence(TwoSequenceInvariant),
    Opaque(BaseInvariant),
}

impl Invariant {
    pub fn base(&self) -> &BaseInvariant {
        match self {
            Self::Scalar(inv) => &inv.base,
            Self::Sequence(inv) => &inv.base,
            Self::TwoScalar(inv) => &inv.base,
            Self::ThreeScalar(inv) => &inv.base,
            Self::ScalarSequence(inv) => &inv.base,
            Self::TwoSequence(inv) => &inv.base,
            Self::Opaque(base) => base,
        }
    }

    pub fn samples(&self) -> u64 {
        self.base().samples
    }

    pub fn can_be_missing(&self) -> bool {
        self.base().can_be_missing
    }

    /// Exact invariants pin their variables completely: a single observed
    /// tuple, or a linear relation for the scalar families.
    pub fn is_exact(&self) -> bool {
        match self {
            Self::TwoScalar(inv) => inv.is_exact(),
            Self::ThreeScalar(inv) => inv.is_exact(),
            _ => self.base().is_exact(),
        }
    }

    /// The comparison concluded by a two-variable invariant, if any.
    pub fn comparison(&self) -> Option<Comparison> {
        match self {
            Self::TwoScalar(inv) => inv.comparison,
            Self::TwoSequence(inv) => inv.comparison,
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarInvariant> {
        match self {
            Self::Scalar(inv) => Some(inv),
            _ => None,
        }
    }

    /// Renders the invariant for reporting. `names` must have one entry per
    /// variable of the invariant's arity. Pure: identical inputs produce
    /// identical text.
    pub fn render(&self, names: &[&str]) -> Rendered {
        match self {
            Self::Scalar(inv) => inv.render(names[0]),
            Self::Sequence(inv) => inv.render(names[0]),
            Self::TwoScalar(inv) => inv.render(names[0], names[1]),
            Self::ThreeScalar(inv) => inv.render(names[0], names[1], names[2]),
            Self::ScalarSequence(inv) => inv.render(names[0], names[1]),
            Self::TwoSequence(inv) => inv.render(names[0], names[1]),
            Self::Opaque(base) => {
                let args = format!("({})", names.join(", "));
                match base.render_prefix(&args) {
                    Some(text) => Rendered::constrained(text),
                    None => Rendered::unconstrained(format!("{args} unconstrained{}", base.suffix())),
                }
            }
        }
    }

    pub fn is_unconstrained(&self, names: &[&str]) -> bool {
        !self.render(names).constrained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(i64, i64)]) -> Vec<(Value, Value)> {
        raw.iter().map(|&(a, b)| (Value::Int(a), Value::Int(b))).collect()
    }

    #[test]
    fn compare_pairs_finds_strict_order() {
        let (cmp, can_eq) = compare_pairs(&pairs(&[(1, 2), (3, 5), (0, 4)]));
        assert_eq!(cmp, Some(Comparison::Lt));
        assert!(!can_eq);
    }

    #[test]
    fn compare_pairs_weakens_to_le_on_ties() {
        let (cmp, can_eq) = compare_pairs(&pairs(&[(1, 2), (3, 3)]));
        assert_eq!(cmp, Some(Comparison::Le));
        assert!(can_eq);
    }

    #[test]
    fn compare_pairs_mixed_gives_none() {
        let (cmp, can_eq) = compare_pairs(&pairs(&[(1, 2), (3, 1)]));
        assert_eq!(cmp, None);
        assert!(!can_eq);
    }

    #[test]
    fn base_prefix_prefers_constant_then_set() {
        let mut counts = AHashMap::new();
        counts.insert(Value::Int(7), 4);
        let base = BaseInvariant::from_counts1(&counts, 5);
        assert_eq!(base.render_prefix("x"), Some("x = 7".to_owned()));

        counts.insert(Value::Int(9), 1);
        let base = BaseInvariant::from_counts1(&counts, 5);
        assert_eq!(base.render_prefix("x"), Some("x in {7, 9}".to_owned()));
    }

    #[test]
    fn one_of_dropped_above_threshold() {
        let mut counts = AHashMap::new();
        for v in 0..6 {
            counts.insert(Value::Int(v), 1);
        }
        let base = BaseInvariant::from_counts1(&counts, 5);
        assert!(base.one_of.is_none());
    }
}
