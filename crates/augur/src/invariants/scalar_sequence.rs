//! Invariants relating one scalar and one sequence variable.

use ahash::AHashMap;

use super::{BaseInvariant, Rendered};
use crate::{
    config::EngineConfig,
    value::Value,
    varinfo::{is_slice_of, size_name},
};

/// Membership of the scalar in the sequence, with structural suppression
/// when the scalar's name already proves the relation (`A[i]`, `min(A)`,
/// `max(A)` are trivially members of `A`).
///
/// The `size` flag is retained in the data model but stays unset: the
/// explicit `size(seq)` derived variable supersedes it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScalarSequenceInvariant {
    pub base: BaseInvariant,
    /// True when the pair arrived as (sequence, scalar) rather than
    /// (scalar, sequence); rendering restores the natural order.
    pub seq_first: bool,
    pub member: bool,
    pub member_obvious: bool,
    pub size: bool,
    pub size_obvious: bool,
}

impl ScalarSequenceInvariant {
    pub(crate) fn infer(
        counts: &AHashMap<(Value, Value), u64>,
        seq_first: bool,
        seq_name: &str,
        scl_name: &str,
        config: &EngineConfig,
    ) -> Self {
        let base = BaseInvariant::from_counts2(counts, config.one_of_threshold);

        let member_obvious = is_slice_of(scl_name, seq_name)
            || scl_name == format!("min({seq_name})")
            || scl_name == format!("max({seq_name})");
        let size_obvious = scl_name == size_name(seq_name);

        let member = !member_obvious
            && counts.keys().all(|pair| {
                let (seq, scl) = if seq_first { (&pair.0, &pair.1) } else { (&pair.1, &pair.0) };
                seq.as_seq().is_some_and(|elems| elems.contains(scl))
            });

        Self {
            base,
            seq_first,
            member,
            member_obvious,
            size: false,
            size_obvious,
        }
    }

    pub(crate) fn render(&self, first: &str, second: &str) -> Rendered {
        let (seq_name, scl_name) = if self.seq_first { (first, second) } else { (second, first) };

        let mut parts: Vec<String> = Vec::new();
        if self.member && !self.member_obvious {
            parts.push(format!("{scl_name} is a member of {seq_name}"));
        }
        if self.size && !self.size_obvious {
            parts.push(format!("{scl_name} is the size of {seq_name}"));
        }

        let suffix = self.base.suffix();
        if parts.is_empty() {
            Rendered::unconstrained(format!("({first}, {second}) are unconstrained{suffix}"))
        } else {
            Rendered::constrained(format!("{}{suffix}", parts.join(" and ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(vals: &[i64]) -> Value {
        Value::Seq(vals.iter().map(|&v| Value::Int(v)).collect())
    }

    fn infer_pairs(raw: &[(i64, &[i64])], seq_name: &str, scl_name: &str) -> ScalarSequenceInvariant {
        let counts: AHashMap<(Value, Value), u64> =
            raw.iter().map(|&(n, s)| ((Value::Int(n), seq(s)), 1)).collect();
        ScalarSequenceInvariant::infer(&counts, false, seq_name, scl_name, &EngineConfig::default())
    }

    #[test]
    fn membership_holds_over_every_sample() {
        let inv = infer_pairs(&[(2, &[1, 2, 3]), (5, &[5, 9])], "S", "a");
        assert!(inv.member);
        assert_eq!(inv.render("a", "S").text, "a is a member of S \t(2 values)");
    }

    #[test]
    fn membership_fails_on_one_absence() {
        let inv = infer_pairs(&[(2, &[1, 2, 3]), (4, &[5, 9])], "S", "a");
        assert!(!inv.member);
        assert!(!inv.render("a", "S").constrained);
    }

    #[test]
    fn structural_membership_is_suppressed() {
        let inv = infer_pairs(&[(1, &[1, 2])], "S", "min(S)");
        assert!(inv.member_obvious);
        assert!(!inv.member, "obvious membership is not even computed");
        let elem = infer_pairs(&[(1, &[1, 2])], "S", "S[0]");
        assert!(elem.member_obvious);
    }

    #[test]
    fn size_name_is_structurally_obvious() {
        let inv = infer_pairs(&[(2, &[1, 2])], "S", "size(S)");
        assert!(inv.size_obvious);
        assert!(!inv.size);
    }
}
