//! Invariants over a single scalar variable.

use ahash::AHashMap;
use num_integer::Integer;

use super::BaseInvariant;
use super::Rendered;
use crate::{
    config::EngineConfig,
    value::Value,
    varinfo::is_size_name,
};

/// Range, modulus, and zero-ness properties of one scalar variable.
///
/// The negative properties (`nonzero`, `modulus`, `nonmodulus`) carry
/// precomputed justification flags: the property is only reported when the
/// chance of it holding accidentally falls below the configured confidence.
/// All justification tests run in log space so large sample counts cannot
/// underflow.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScalarInvariant {
    pub base: BaseInvariant,
    /// Smallest observed value; `None` when any sample was missing.
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub min_justified: bool,
    pub max_justified: bool,
    pub can_be_zero: bool,
    /// `(r, m)` with m >= 2 such that every value is congruent to r mod m.
    pub modulus: Option<(i64, i64)>,
    /// `(r, m)` such that no value is congruent to r mod m.
    pub nonmodulus: Option<(i64, i64)>,
    /// True when the variable is a derived sequence length, whose
    /// non-negativity needs no reporting.
    pub nonnegative_obvious: bool,
    pub nonzero_justified: bool,
    pub modulus_justified: bool,
    pub nonmodulus_justified: bool,
}

impl ScalarInvariant {
    pub(crate) fn infer(counts: &AHashMap<Value, u64>, name: Option<&str>, config: &EngineConfig) -> Self {
        let base = BaseInvariant::from_counts1(counts, config.one_of_threshold);
        let alpha_ln = config.negative_invariant_confidence.ln();

        let mut sorted: Vec<(&Value, u64)> = counts.iter().map(|(v, &c)| (v, c)).collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut min = None;
        let mut max = None;
        let mut min_justified = false;
        let mut max_justified = false;
        // A missing sample forfeits the range; it would sort below every
        // number and make min/max meaningless.
        if !base.can_be_missing && !sorted.is_empty() {
            min = Some(sorted[0].0.clone());
            max = Some(sorted[sorted.len() - 1].0.clone());
            if sorted.len() < 3 {
                min_justified = true;
                max_justified = true;
            } else if let (Some(lo), Some(hi)) = (sorted[0].0.as_f64(), sorted[sorted.len() - 1].0.as_f64()) {
                // An endpoint is justified when it holds clearly more mass
                // than a uniform spread over the range would give it, or
                // when it and its interior neighbour both hold at least
                // half that much.
                let range = hi - lo + 1.0;
                let expected = base.samples as f64 / range;
                let justified = |count: u64, neighbour: u64| {
                    let count = count as f64;
                    count >= 3.0
                        && (count > 2.0 * expected
                            || (count > 0.5 * expected && neighbour as f64 > 0.5 * expected))
                };
                min_justified = justified(sorted[0].1, sorted[1].1);
                max_justified = justified(sorted[sorted.len() - 1].1, sorted[sorted.len() - 2].1);
            }
        }

        let can_be_zero = sorted.iter().any(|(v, _)| v.is_zero());

        let ints: Option<Vec<i64>> = if min.is_some() {
            sorted.iter().map(|(v, _)| v.as_int()).collect()
        } else {
            None
        };
        let modulus = ints.as_deref().and_then(common_modulus);
        let nonmodulus = ints
            .as_deref()
            .and_then(|nums| common_nonmodulus(nums, config.nonmodulus_strict));

        let samples = base.samples as f64;
        let nonzero_justified = match (min.as_ref().and_then(Value::as_f64), max.as_ref().and_then(Value::as_f64)) {
            (Some(lo), Some(hi)) => {
                let probability = 1.0 - 1.0 / (hi - lo + 1.0);
                probability <= 0.0 || samples * probability.ln() < alpha_ln
            }
            _ => false,
        };
        let modulus_justified = modulus.is_some_and(|(_, m)| {
            let probability = 1.0 / m as f64;
            samples * probability.ln() < alpha_ln
        });
        let nonmodulus_justified = nonmodulus.is_some_and(|(_, m)| {
            let base_f = m as f64;
            let probability = 1.0 - 1.0 / base_f;
            probability <= 0.0 || samples * probability.ln() + base_f.ln() < alpha_ln
        });

        Self {
            base,
            min,
            max,
            min_justified,
            max_justified,
            can_be_zero,
            modulus,
            nonmodulus,
            nonnegative_obvious: name.is_some_and(is_size_name),
            nonzero_justified,
            modulus_justified,
            nonmodulus_justified,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.base.is_exact()
    }

    /// The constant value, for exact non-missing invariants.
    pub fn exact_value(&self) -> Option<&Value> {
        if self.base.is_exact() { self.min.as_ref() } else { None }
    }

    pub fn min_f64(&self) -> Option<f64> {
        self.min.as_ref().and_then(Value::as_f64)
    }

    pub fn max_f64(&self) -> Option<f64> {
        self.max.as_ref().and_then(Value::as_f64)
    }

    pub(crate) fn render(&self, name: &str) -> Rendered {
        if let Some(text) = self.base.render_prefix(name) {
            return Rendered::constrained(text);
        }
        let suffix = self.base.suffix();

        if let (Some((r, m)), true) = (self.modulus, self.modulus_justified) {
            return Rendered::constrained(format!("{name} = {r} (mod {m}){suffix}"));
        }
        if let (Some((r, m)), true) = (self.nonmodulus, self.nonmodulus_justified) {
            return Rendered::constrained(format!("{name} != {r} (mod {m}){suffix}"));
        }

        let nonzero = !self.can_be_zero && self.nonzero_justified;

        if let (true, true, Some(min), Some(max)) = (self.min_justified, self.max_justified, &self.min, &self.max) {
            let straddles_zero =
                self.min_f64().is_some_and(|lo| lo < 0.0) && self.max_f64().is_some_and(|hi| hi > 0.0);
            let text = if straddles_zero && nonzero {
                format!("{name} nonzero in [{min}..{max}]{suffix}")
            } else {
                format!("{name} in [{min}..{max}]{suffix}")
            };
            return Rendered::constrained(text);
        }
        if let (true, Some(min)) = (self.min_justified, &self.min) {
            // `size(s) >= 0` tells the reader nothing.
            if !(self.nonnegative_obvious && min.is_zero()) {
                let text = if self.min_f64().is_some_and(|lo| lo < 0.0) && nonzero {
                    format!("{name} >= {min} and nonzero{suffix}")
                } else {
                    format!("{name} >= {min}{suffix}")
                };
                return Rendered::constrained(text);
            }
        }
        if let (true, Some(max)) = (self.max_justified, &self.max) {
            let text = if self.max_f64().is_some_and(|hi| hi > 0.0) && nonzero {
                format!("{name} <= {max} and nonzero{suffix}")
            } else {
                format!("{name} <= {max}{suffix}")
            };
            return Rendered::constrained(text);
        }
        if nonzero {
            return Rendered::constrained(format!("{name} != 0{suffix}"));
        }
        if let Some(one_of) = &self.base.one_of {
            if one_of.len() > 1 {
                return Rendered::constrained(format!("{name} in {}", super::render_entry_set(one_of)));
            }
        }
        Rendered::unconstrained(format!("{name} unconstrained{suffix}"))
    }
}

/// Greatest m >= 2 such that all values share a residue mod m: the gcd of
/// all pairwise differences.
fn common_modulus(nums: &[i64]) -> Option<(i64, i64)> {
    if nums.len() < 2 {
        return None;
    }
    let first = nums[0];
    let mut m: i64 = 0;
    for &v in &nums[1..] {
        m = m.gcd(&v.checked_sub(first)?);
        if m == 1 {
            return None;
        }
    }
    (m >= 2).then(|| (first.mod_floor(&m), m))
}

/// Residue classes bounded by this when searching for an avoided one.
const NONMODULUS_BASE_LIMIT: usize = 64;

/// Smallest base m with an avoided residue class. In strict mode every
/// other residue class mod m must have been observed. The base never
/// exceeds the distinct-value count: n distinct values trivially avoid a
/// residue mod n + 1, which says nothing.
fn common_nonmodulus(nums: &[i64], strict: bool) -> Option<(i64, i64)> {
    if nums.len() < 2 {
        return None;
    }
    let max_m = nums.len().min(NONMODULUS_BASE_LIMIT);
    for m in 2..=max_m {
        let m_i = m as i64;
        let mut seen = 0u64;
        for &v in nums {
            seen |= 1 << v.mod_floor(&m_i);
        }
        let present = seen.count_ones() as usize;
        let hit = if strict { present == m - 1 } else { present < m };
        if hit {
            for r in 0..m_i {
                if seen & (1 << r) == 0 {
                    return Some((r, m_i));
                }
            }
        }
    }
    None
}
