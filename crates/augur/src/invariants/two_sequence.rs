//! Invariants over a pair of sequence variables.

use ahash::AHashMap;

use super::{compare_pairs, render_bi_linear, BaseInvariant, Comparison, Rendered};
use crate::{config::EngineConfig, value::Value, varinfo::is_slice_of};

/// Pointwise linear relation, lexicographic comparison, reversal, and
/// containment between two sequences.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TwoSequenceInvariant {
    pub base: BaseInvariant,
    /// `(a, b)` with y[i] = a*x[i] + b at every index of every sample;
    /// requires equal lengths of at least two.
    pub linear: Option<(f64, f64)>,
    /// Comparison under lexicographic order; not computed when either
    /// containment direction is structurally obvious.
    pub comparison: Option<Comparison>,
    pub can_be_equal: bool,
    /// Every sample of one side is the element-wise reversal of the other.
    pub reverse: bool,
    /// x is a contiguous subsequence of y in every sample.
    pub sub_sequence: bool,
    pub super_sequence: bool,
    pub subseq_obvious: bool,
    pub superseq_obvious: bool,
}

impl TwoSequenceInvariant {
    pub(crate) fn infer(
        counts: &AHashMap<(Value, Value), u64>,
        x_name: &str,
        y_name: &str,
        config: &EngineConfig,
    ) -> Self {
        let base = BaseInvariant::from_counts2(counts, config.one_of_threshold);

        let mut pairs: Vec<&(Value, Value)> = counts.keys().collect();
        pairs.sort();

        let linear = fit_pointwise_linear(&pairs);

        let subseq_obvious = is_slice_of(x_name, y_name);
        let superseq_obvious = is_slice_of(y_name, x_name);

        let (comparison, can_be_equal) = if subseq_obvious || superseq_obvious {
            (None, false)
        } else {
            let owned: Vec<(Value, Value)> = pairs.iter().map(|&(a, b)| (a.clone(), b.clone())).collect();
            compare_pairs(&owned)
        };

        let reverse = pairs.iter().all(|(x, y)| is_reverse_of(x, y));
        let sub_sequence = !subseq_obvious && pairs.iter().all(|(x, y)| is_subsequence_of(x, y));
        let super_sequence = !superseq_obvious && pairs.iter().all(|(x, y)| is_subsequence_of(y, x));

        Self {
            base,
            linear,
            comparison,
            can_be_equal,
            reverse,
            sub_sequence,
            super_sequence,
            subseq_obvious,
            superseq_obvious,
        }
    }

    pub(crate) fn render(&self, x: &str, y: &str) -> Rendered {
        if let Some(text) = self.base.render_prefix(&format!("({x}, {y})")) {
            return Rendered::constrained(text);
        }
        let suffix = self.base.suffix();

        if self.comparison == Some(Comparison::Eq) {
            return Rendered::constrained(format!("{x} = {y}{suffix}"));
        }
        if let Some((a, b)) = self.linear {
            return Rendered::constrained(format!("{}{suffix}", render_bi_linear(y, x, a, b)));
        }
        // Reversal outranks containment: a reversed pair is trivially a
        // subsequence of itself in both directions.
        if self.reverse {
            return Rendered::constrained(format!("{x} is the reverse of {y}{suffix}"));
        }
        if self.sub_sequence && !self.subseq_obvious {
            return Rendered::constrained(format!("{x} is a subsequence of {y}{suffix}"));
        }
        if self.super_sequence && !self.superseq_obvious {
            return Rendered::constrained(format!("{y} is a subsequence of {x}{suffix}"));
        }
        if let Some(cmp) = self.comparison {
            match cmp {
                Comparison::Lt | Comparison::Le => {
                    if !self.subseq_obvious {
                        return Rendered::constrained(format!("{x} {cmp} {y}{suffix}"));
                    }
                }
                Comparison::Gt | Comparison::Ge => {
                    if !self.superseq_obvious {
                        let flipped = if cmp == Comparison::Gt { "<" } else { "<=" };
                        return Rendered::constrained(format!("{y} {flipped} {x}{suffix}"));
                    }
                }
                Comparison::Eq => unreachable!("equality returned above"),
            }
        }
        Rendered::unconstrained(format!("({x}, {y}) unconstrained{suffix}"))
    }
}

/// Pointwise y[i] = a*x[i] + b. The fit is seeded from the first two
/// indices of the first sample pair; every pair must have equal lengths of
/// at least two.
fn fit_pointwise_linear(pairs: &[&(Value, Value)]) -> Option<(f64, f64)> {
    if pairs.len() < 2 {
        return None;
    }
    let (first_x, first_y) = (pairs[0].0.as_seq()?, pairs[0].1.as_seq()?);
    if first_x.len() != first_y.len() || first_x.len() < 2 {
        return None;
    }
    let (a, b) = super::linear::bi_linear(
        (first_x[0].as_f64()?, first_y[0].as_f64()?),
        (first_x[1].as_f64()?, first_y[1].as_f64()?),
    )?;
    for (x, y) in pairs {
        let (xs, ys) = (x.as_seq()?, y.as_seq()?);
        if xs.len() != ys.len() || xs.len() < 2 {
            return None;
        }
        for (xe, ye) in xs.iter().zip(ys.iter()) {
            if ye.as_f64()? != a * xe.as_f64()? + b {
                return None;
            }
        }
    }
    Some((a, b))
}

fn is_reverse_of(x: &Value, y: &Value) -> bool {
    match (x.as_seq(), y.as_seq()) {
        (Some(xs), Some(ys)) => xs.len() == ys.len() && xs.iter().eq(ys.iter().rev()),
        _ => false,
    }
}

/// Contiguous containment: `x` appears as a window of `y`. This matches
/// the shape of every slicing-derived variable.
fn is_subsequence_of(x: &Value, y: &Value) -> bool {
    match (x.as_seq(), y.as_seq()) {
        (Some(xs), Some(ys)) => {
            if xs.is_empty() {
                return true;
            }
            xs.len() <= ys.len() && ys.windows(xs.len()).any(|w| w == xs)
        }
        _ => false,
    }
}
