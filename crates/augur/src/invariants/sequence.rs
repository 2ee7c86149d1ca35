//! Invariants over a single sequence variable.

use ahash::AHashMap;
use std::cmp::Ordering;

use super::{BaseInvariant, Rendered, ScalarInvariant};
use crate::{config::EngineConfig, value::Value};

/// Ordering flags across each sequence instance plus a scalar invariant
/// over the elements of all instances pooled together.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SequenceInvariant {
    pub base: BaseInvariant,
    /// Lexicographically smallest observed sequence.
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub elts_equal: bool,
    pub non_decreasing: bool,
    pub non_increasing: bool,
    /// Scalar invariant over the multiset of elements of every observed
    /// sequence; empty sequences contribute nothing. `None` when any
    /// sample was a wholly missing sequence.
    pub all_elements: Option<ScalarInvariant>,
}

impl SequenceInvariant {
    pub(crate) fn infer(
        counts: &AHashMap<Value, u64>,
        element_counts: &AHashMap<Value, u64>,
        config: &EngineConfig,
    ) -> Self {
        let base = BaseInvariant::from_counts1(counts, config.one_of_threshold);

        let mut seqs: Vec<&Value> = counts.keys().collect();
        seqs.sort();
        let min = seqs.first().map(|&v| v.clone());
        let max = seqs.last().map(|&v| v.clone());

        // A single wholly missing sequence defeats every per-instance
        // property; the invariant degrades to unconstrained.
        if base.can_be_missing {
            return Self {
                base,
                min,
                max,
                elts_equal: false,
                non_decreasing: false,
                non_increasing: false,
                all_elements: None,
            };
        }

        let mut elts_equal = true;
        let mut non_decreasing = true;
        let mut non_increasing = true;
        'seqs: for seq in &seqs {
            let Some(elems) = seq.as_seq() else { continue };
            for pair in elems.windows(2) {
                match pair[0].cmp(&pair[1]) {
                    Ordering::Less => {
                        elts_equal = false;
                        non_increasing = false;
                    }
                    Ordering::Greater => {
                        elts_equal = false;
                        non_decreasing = false;
                    }
                    Ordering::Equal => {}
                }
                if !(elts_equal || non_decreasing || non_increasing) {
                    break 'seqs;
                }
            }
        }

        let all_elements = Some(ScalarInvariant::infer(element_counts, None, config));

        Self {
            base,
            min,
            max,
            elts_equal,
            non_decreasing,
            non_increasing,
            all_elements,
        }
    }

    pub(crate) fn render(&self, name: &str) -> Rendered {
        if let Some(text) = self.base.render_prefix(name) {
            return Rendered::constrained(text);
        }
        let suffix = self.base.suffix();

        let mut lines: Vec<String> = Vec::new();
        if self.elts_equal {
            lines.push("Per sequence elements equal".to_owned());
        } else if self.non_decreasing {
            lines.push("Per sequence elements non-decreasing".to_owned());
        } else if self.non_increasing {
            lines.push("Per sequence elements non-increasing".to_owned());
        }
        if let Some(all) = &self.all_elements {
            let rendered = all.render("elt");
            if rendered.constrained {
                lines.push(format!("All sequence elements: {}", rendered.text));
            }
        }

        if lines.is_empty() {
            Rendered::unconstrained(format!("{name} unconstrained{suffix}"))
        } else {
            Rendered::constrained(format!("{name}{suffix}\n\t{}", lines.join("\n\t")))
        }
    }
}
