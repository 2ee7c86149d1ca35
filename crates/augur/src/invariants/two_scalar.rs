//! Invariants over an ordered pair of scalar variables.

use ahash::AHashMap;

use super::{
    compare_pairs, fit_bi_linear, render_bi_linear, BaseInvariant, Comparison, Rendered, ScalarInvariant,
    UnaryFn, UNARY_POOL,
};
use crate::{
    config::EngineConfig,
    value::Value,
    varinfo::{elem_base, max_arg, min_arg},
};

/// Linear, comparison, and function-fit relations between two scalars,
/// plus embedded scalar invariants over their difference and sum.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TwoScalarInvariant {
    pub base: BaseInvariant,
    /// `(a, b)` such that y = a*x + b over every sample.
    pub linear: Option<(f64, f64)>,
    pub comparison: Option<Comparison>,
    /// A comparison implied by the structure of the variable names
    /// (`min(A)` vs `max(A)` and the like); reporting it would be noise.
    pub comparison_obvious: Option<Comparison>,
    pub can_be_equal: bool,
    pub nonequal_justified: bool,
    /// Scalar invariant over x - y; often tighter than a bare comparison.
    pub difference: ScalarInvariant,
    pub sum: ScalarInvariant,
    /// Unary functions with y = f(x) over every sample.
    pub functions: Vec<UnaryFn>,
    /// Unary functions with x = f(y) over every sample.
    pub inv_functions: Vec<UnaryFn>,
}

impl TwoScalarInvariant {
    pub(crate) fn infer(
        counts: &AHashMap<(Value, Value), u64>,
        x_name: &str,
        y_name: &str,
        x_inv: &ScalarInvariant,
        y_inv: &ScalarInvariant,
        config: &EngineConfig,
    ) -> Self {
        let base = BaseInvariant::from_counts2(counts, config.one_of_threshold);

        let mut pairs: Vec<(Value, Value)> = counts.keys().cloned().collect();
        pairs.sort();

        let linear = if pairs.len() > 1 {
            let numeric: Option<Vec<(f64, f64)>> = pairs
                .iter()
                .map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
                .collect();
            numeric.as_deref().and_then(fit_bi_linear)
        } else {
            None
        };

        let mut diff_counts: AHashMap<Value, u64> = AHashMap::new();
        let mut sum_counts: AHashMap<Value, u64> = AHashMap::new();
        for ((x, y), &count) in counts {
            *diff_counts.entry(scalar_sub(x, y)).or_insert(0) += count;
            *sum_counts.entry(scalar_add(x, y)).or_insert(0) += count;
        }
        let difference = ScalarInvariant::infer(&diff_counts, None, config);
        let sum = ScalarInvariant::infer(&sum_counts, None, config);

        let (comparison, can_be_equal) = compare_pairs(&pairs);
        let comparison_obvious = obvious_comparison(x_name, y_name);

        let (functions, inv_functions) = if pairs.len() > 1 {
            let functions = UNARY_POOL
                .into_iter()
                .filter(|f| pairs.iter().all(|(x, y)| f.apply(x).as_ref() == Some(y)))
                .collect();
            let inv_functions = UNARY_POOL
                .into_iter()
                .filter(|f| pairs.iter().all(|(x, y)| f.apply(y).as_ref() == Some(x)))
                .collect();
            (functions, inv_functions)
        } else {
            (Vec::new(), Vec::new())
        };

        let nonequal_justified = nonequal_justified(x_inv, y_inv, base.samples, config);

        Self {
            base,
            linear,
            comparison,
            comparison_obvious,
            can_be_equal,
            nonequal_justified,
            difference,
            sum,
            functions,
            inv_functions,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.base.is_exact() || self.linear.is_some()
    }

    pub fn render(&self, x: &str, y: &str) -> Rendered {
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

        if !self.functions.is_empty() || !self.inv_functions.is_empty() {
            let mut parts: Vec<String> = Vec::new();
            for f in &self.functions {
                parts.push(format!("{y} = {f}({x})"));
            }
            for f in &self.inv_functions {
                parts.push(format!("{x} = {f}({y})"));
            }
            return Rendered::constrained(format!("{}{suffix}", parts.join(" and ")));
        }

        let diff = &self.difference;
        if let Some(text) = diff.base.render_prefix(&format!("{x} - {y}")) {
            return Rendered::constrained(format!("{text}{suffix}"));
        }
        if let Some((r, m)) = diff.modulus {
            let text = if r == 0 {
                format!("{x} = {y} (mod {m}){suffix}")
            } else {
                format!("{x} - {y} = {r} (mod {m}){suffix}")
            };
            return Rendered::constrained(text);
        }
        if let (true, true, Some(lo), Some(hi)) = (diff.min_justified, diff.max_justified, &diff.min, &diff.max) {
            return Rendered::constrained(format!("{lo} <= {x} - {y} <= {hi} \tjustified{suffix}"));
        }
        if let (true, Some(lo)) = (diff.min_justified, &diff.min) {
            return Rendered::constrained(format!("{y} <= {x} - {lo} \tjustified{suffix}"));
        }
        if let (true, Some(hi)) = (diff.max_justified, &diff.max) {
            return Rendered::constrained(format!("{y} >= {x} - {hi} \tjustified{suffix}"));
        }

        if let Some(text) = self.sum.base.render_prefix(&format!("{x} + {y}")) {
            return Rendered::constrained(format!("{text}{suffix}"));
        }
        if let Some((r, m)) = self.sum.modulus {
            return Rendered::constrained(format!("{x} + {y} = {r} (mod {m}){suffix}"));
        }

        if let Some(cmp) = self.comparison {
            if Some(cmp) != self.comparison_obvious {
                match cmp {
                    Comparison::Lt | Comparison::Le => {
                        let mut suffix = suffix.clone();
                        if let Some(hi) = diff.max_f64() {
                            if hi < -1.0 {
                                suffix = format!(" \t{x} <= {y} - {}{suffix}", -hi as i64);
                            }
                        }
                        return Rendered::constrained(format!("{x} {cmp} {y}{suffix}"));
                    }
                    Comparison::Gt | Comparison::Ge => {
                        let mut suffix = suffix.clone();
                        if let Some(lo) = diff.min_f64() {
                            if lo > 1.0 {
                                suffix = format!(" \t{y} <= {x} - {}{suffix}", lo as i64);
                            }
                        }
                        let flipped = if cmp == Comparison::Gt { "<" } else { "<=" };
                        return Rendered::constrained(format!("{y} {flipped} {x}{suffix}"));
                    }
                    Comparison::Eq => unreachable!("equality returned above"),
                }
            }
        }

        if !self.can_be_equal && self.nonequal_justified {
            return Rendered::constrained(format!("{x} != {y}{suffix}"));
        }
        if let Some(one_of) = &self.base.one_of {
            if one_of.len() > 1 {
                return Rendered::constrained(format!(
                    "({x}, {y}) in {}{suffix}",
                    super::render_entry_set(one_of)
                ));
            }
        }
        Rendered::unconstrained(format!("({x}, {y}) unconstrained{suffix}"))
    }
}

/// x - y as a value; mixed or overflowing arithmetic degrades to float.
fn scalar_sub(x: &Value, y: &Value) -> Value {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => match a.checked_sub(*b) {
            Some(d) => Value::Int(d),
            None => Value::Float(*a as f64 - *b as f64),
        },
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(a), Some(b)) => Value::Float(a - b),
            _ => Value::Missing,
        },
    }
}

fn scalar_add(x: &Value, y: &Value) -> Value {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
            Some(s) => Value::Int(s),
            None => Value::Float(*a as f64 + *b as f64),
        },
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(a), Some(b)) => Value::Float(a + b),
            _ => Value::Missing,
        },
    }
}

/// Comparisons implied by variable-name structure: `min(A)` is never above
/// `max(A)`, an element `A[i]` lies between the extrema of `A`, and so on.
fn obvious_comparison(x_name: &str, y_name: &str) -> Option<Comparison> {
    let min1 = min_arg(x_name);
    let max1 = max_arg(x_name);
    let aref1 = elem_base(x_name);
    if min1.is_none() && max1.is_none() && aref1.is_none() {
        return None;
    }
    let min2 = min_arg(y_name);
    let max2 = max_arg(y_name);
    let aref2 = elem_base(y_name);

    if matches(min1, max2) || matches(min1, aref2) {
        Some(Comparison::Le)
    } else if matches(max1, min2) || matches(max1, aref2) || matches(aref1, min2) {
        Some(Comparison::Ge)
    } else if matches(aref1, max2) {
        Some(Comparison::Le)
    } else {
        None
    }
}

fn matches(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// The `!=` conclusion is justified when the chance that two independent
/// uniform draws from the observed ranges never collided is below alpha.
fn nonequal_justified(x_inv: &ScalarInvariant, y_inv: &ScalarInvariant, samples: u64, config: &EngineConfig) -> bool {
    let (Some(min1), Some(max1), Some(min2), Some(max2)) =
        (x_inv.min_f64(), x_inv.max_f64(), y_inv.min_f64(), y_inv.max_f64())
    else {
        return false;
    };
    let overlap = max1.min(max2) - min1.max(min2);
    if overlap < 0.0 {
        return false;
    }
    let overlap = overlap + 1.0;
    let probability = 1.0 - overlap / ((max1 - min1 + 1.0) * (max2 - min2 + 1.0));
    if probability <= 0.0 {
        return true;
    }
    (samples as f64) * probability.ln() < config.negative_invariant_confidence.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(raw: &[((i64, i64), u64)]) -> TwoScalarInvariant {
        let counts: AHashMap<(Value, Value), u64> = raw
            .iter()
            .map(|&((x, y), c)| ((Value::Int(x), Value::Int(y)), c))
            .collect();
        let config = EngineConfig::default();
        let x_counts: AHashMap<Value, u64> = raw.iter().map(|&((x, _), c)| (Value::Int(x), c)).collect();
        let y_counts: AHashMap<Value, u64> = raw.iter().map(|&((_, y), c)| (Value::Int(y), c)).collect();
        let x_inv = ScalarInvariant::infer(&x_counts, None, &config);
        let y_inv = ScalarInvariant::infer(&y_counts, None, &config);
        TwoScalarInvariant::infer(&counts, "x", "y", &x_inv, &y_inv, &config)
    }

    #[test]
    fn linear_relation_is_recovered() {
        let inv = infer(&[((1, 3), 1), ((2, 5), 1), ((3, 7), 1)]);
        assert_eq!(inv.linear, Some((2.0, 1.0)));
        assert!(inv.is_exact(), "a linear pair invariant is exact");
    }

    #[test]
    fn equality_concluded_from_identical_columns() {
        let inv = infer(&[((4, 4), 2), ((9, 9), 3)]);
        assert_eq!(inv.comparison, Some(Comparison::Eq));
        assert!(inv.can_be_equal);
    }

    #[test]
    fn function_fit_survives_only_matching_pool_members() {
        let inv = infer(&[((-3, 3), 1), ((4, 4), 1), ((-7, 7), 1)]);
        assert_eq!(inv.functions, vec![UnaryFn::Abs]);
        assert!(inv.inv_functions.is_empty(), "x = abs(y) fails on the negatives");
    }

    #[test]
    fn difference_invariant_captures_offset() {
        let inv = infer(&[((1, 3), 1), ((5, 7), 1), ((10, 12), 1)]);
        assert_eq!(inv.difference.exact_value(), Some(&Value::Int(-2)));
    }

    #[test]
    fn obvious_comparisons_from_names() {
        assert_eq!(obvious_comparison("min(A)", "max(A)"), Some(Comparison::Le));
        assert_eq!(obvious_comparison("min(A)", "A[0]"), Some(Comparison::Le));
        assert_eq!(obvious_comparison("max(A)", "A[0]"), Some(Comparison::Ge));
        assert_eq!(obvious_comparison("A[0]", "min(A)"), Some(Comparison::Ge));
        assert_eq!(obvious_comparison("A[0]", "max(A)"), Some(Comparison::Le));
        assert_eq!(obvious_comparison("min(A)", "max(B)"), None);
        assert_eq!(obvious_comparison("x", "y"), None);
    }

    #[test]
    fn obvious_comparison_suppresses_report() {
        // min(A) <= A[0] always holds structurally; the render must not
        // lead with the comparison.
        let counts: AHashMap<(Value, Value), u64> = (0..120)
            .map(|i| ((Value::Int(i % 40), Value::Int(i % 40 + (i % 3))), 1))
            .collect();
        let config = EngineConfig::default();
        let x_counts: AHashMap<Value, u64> = counts.keys().map(|(x, _)| (x.clone(), 1)).collect();
        let y_counts: AHashMap<Value, u64> = counts.keys().map(|(_, y)| (y.clone(), 1)).collect();
        let x_inv = ScalarInvariant::infer(&x_counts, None, &config);
        let y_inv = ScalarInvariant::infer(&y_counts, None, &config);
        let inv = TwoScalarInvariant::infer(&counts, "min(A)", "A[0]", &x_inv, &y_inv, &config);
        assert_eq!(inv.comparison, Some(Comparison::Le));
        assert_eq!(inv.comparison_obvious, Some(Comparison::Le));
        let rendered = inv.render("min(A)", "A[0]");
        assert!(
            !rendered.text.starts_with("min(A) <="),
            "structural comparison must not be reported: {}",
            rendered.text
        );
    }
}
