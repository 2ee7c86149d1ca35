//! Derivation passes: introducing synthesized variables.
//!
//! Each pass is a bundle of six introducers keyed by the arity and type of
//! the seed variables they consume. Introducers append new `VarInfo`
//! entries and extend every stored tuple by one slot per new variable; the
//! harness rebuilds the value table afterwards so that tuples whose
//! extensions coincide merge by summing counts.
//!
//! Pass 1 introduces sequence sizes only. Pass 2 introduces aggregates
//! (`sum`, `min`, `max`), extremal elements, and prefix slices. Keeping
//! sizes one pass ahead lets pass 2 consult the size variable's inferred
//! range when deciding which elements are worth extracting.

use std::ops::Range;

use log::debug;

use crate::{
    invariants::{Invariant, ScalarInvariant},
    point::ProgramPoint,
    table::WorkingRows,
    value::Value,
    varinfo::{size_name, LenSource, VarInfo, VarKind},
};

type SingleIntro = fn(&mut Vec<VarInfo>, &mut WorkingRows, usize);
type PairIntro = fn(&mut Vec<VarInfo>, &mut WorkingRows, usize, usize);

/// The six introducers of one derivation pass, indexed by seed signature.
struct PassFunctions {
    from_sequence: SingleIntro,
    from_scalar: SingleIntro,
    from_sequence_sequence: PairIntro,
    from_sequence_scalar: PairIntro,
    from_scalar_sequence: PairIntro,
    from_scalar_scalar: PairIntro,
}

fn intro_single_noop(_vars: &mut Vec<VarInfo>, _rows: &mut WorkingRows, _index: usize) {}
fn intro_pair_noop(_vars: &mut Vec<VarInfo>, _rows: &mut WorkingRows, _i1: usize, _i2: usize) {}

const PASS_FUNCTIONS: [PassFunctions; crate::point::DERIVATION_PASSES] = [
    PassFunctions {
        from_sequence: intro_sequence_size,
        from_scalar: intro_single_noop,
        from_sequence_sequence: intro_pair_noop,
        from_sequence_scalar: intro_pair_noop,
        from_scalar_sequence: intro_pair_noop,
        from_scalar_scalar: intro_pair_noop,
    },
    PassFunctions {
        from_sequence: intro_sequence_aggregates,
        from_scalar: intro_single_noop,
        from_sequence_sequence: intro_pair_noop,
        from_sequence_scalar: intro_sequence_scalar_slices,
        from_scalar_sequence: intro_scalar_sequence_slices,
        from_scalar_scalar: intro_pair_noop,
    },
];

/// Runs one derivation pass over the given seed range, appending variables
/// and keeping every stored tuple's arity in sync.
///
/// Idempotent when no canonical seed is newly in range: introducers only
/// fire for seeds inside `seeds`, and the caller advances its per-pass
/// high-water mark afterwards.
pub(crate) fn introduce_one_pass(point: &mut ProgramPoint, pass: usize, seeds: Range<usize>) {
    debug!(
        "derive pass {} over [{}, {}) at {} ({} vars)",
        pass + 1,
        seeds.start,
        seeds.end,
        point.name,
        point.vars.len()
    );
    let functions = &PASS_FUNCTIONS[pass];
    let vars = &mut point.vars;
    let mut rows: WorkingRows = point.table.take_rows();

    let eligible = |vars: &Vec<VarInfo>, i: usize| -> bool {
        let vi = &vars[i];
        // Fresh variables from an earlier pass in the same driver
        // iteration have no invariant yet; they become seeds next round.
        let Some(inv) = vi.invariant.as_ref() else { return false };
        vi.is_canonical() && !inv.base().is_missing_constant()
    };

    // Pair introducers below only consider variables that existed when
    // the pass started.
    let orig_len = vars.len();

    // Single-seed introducers.
    for i in seeds.clone() {
        if !eligible(vars, i) {
            continue;
        }
        if vars[i].is_sequence() {
            (functions.from_sequence)(vars, &mut rows, i);
        } else {
            (functions.from_scalar)(vars, &mut rows, i);
        }
    }

    // At least one endpoint of each pair must be a new seed.
    for i1 in 0..orig_len.saturating_sub(1) {
        if !eligible(vars, i1) {
            continue;
        }
        for i2 in i1 + 1..orig_len {
            if !(seeds.contains(&i1) || seeds.contains(&i2)) {
                continue;
            }
            if !eligible(vars, i2) {
                continue;
            }
            match (vars[i1].is_sequence(), vars[i2].is_sequence()) {
                (true, true) => (functions.from_sequence_sequence)(vars, &mut rows, i1, i2),
                (true, false) => (functions.from_sequence_scalar)(vars, &mut rows, i1, i2),
                (false, true) => (functions.from_scalar_sequence)(vars, &mut rows, i1, i2),
                (false, false) => (functions.from_scalar_scalar)(vars, &mut rows, i1, i2),
            }
        }
    }

    point.table.rebuild(rows);
    debug_assert_eq!(
        point.table.rows().next().map_or(point.vars.len(), |(row, _)| row.len()),
        point.vars.len()
    );
}

fn scalar_inv(vars: &[VarInfo], i: usize) -> Option<&ScalarInvariant> {
    vars[i].invariant.as_ref().and_then(Invariant::as_scalar)
}

fn push_var(vars: &mut Vec<VarInfo>, name: String, kind: VarKind) -> usize {
    let index = vars.len();
    vars.push(VarInfo::new(name, kind, index, true));
    index
}

fn extend_rows(rows: &mut WorkingRows, mut slot: impl FnMut(&[Value]) -> Value) {
    for (row, _) in rows.iter_mut() {
        let value = slot(row);
        row.push(value);
    }
}

/// Pass 1: `size(s)` for every original sequence without one.
fn intro_sequence_size(vars: &mut Vec<VarInfo>, rows: &mut WorkingRows, index: usize) {
    if vars[index].derived_len.is_some() || vars[index].is_derived {
        return;
    }
    let name = size_name(&vars[index].name);
    let size_idx = push_var(vars, name, VarKind::Scalar);
    vars[index].derived_len = Some(LenSource::Var(size_idx));
    extend_rows(rows, |row| match row[index].seq_len() {
        Some(len) => Value::Int(len),
        None => Value::Missing,
    });
}

/// Pass 2 over a sequence seed: aggregates unconditionally, then the first
/// and last one or two elements of original sequences.
fn intro_sequence_aggregates(vars: &mut Vec<VarInfo>, rows: &mut WorkingRows, index: usize) {
    let seq_name = vars[index].name.clone();

    push_var(vars, format!("sum({seq_name})"), VarKind::Scalar);
    extend_rows(rows, |row| seq_sum(&row[index]));
    push_var(vars, format!("min({seq_name})"), VarKind::Scalar);
    extend_rows(rows, |row| seq_extremum(&row[index], true));
    push_var(vars, format!("max({seq_name})"), VarKind::Scalar);
    extend_rows(rows, |row| seq_extremum(&row[index], false));

    // Element extraction only for observed sequences; slices of them would
    // repeat the same elements under new names.
    if vars[index].is_derived {
        return;
    }
    let Some(LenSource::Var(size_idx)) = vars[index].derived_len else {
        return;
    };
    let Some(size_inv) = scalar_inv(vars, size_idx) else { return };
    let Some(len_min) = size_inv.min.as_ref().and_then(Value::as_int) else {
        return;
    };
    let len_max = size_inv.max.as_ref().and_then(Value::as_int);
    // Just the extremal few: checking every index of a long array buys
    // nothing and floods the variable list.
    let reach = len_min.min(2);
    if reach <= 0 {
        return;
    }
    for i in 0..reach {
        push_var(vars, format!("{seq_name}[{i}]"), VarKind::Scalar);
        extend_rows(rows, |row| element_at(&row[index], i));
    }
    if len_max != Some(reach) {
        for i in -reach..0 {
            push_var(vars, format!("{seq_name}[{i}]"), VarKind::Scalar);
            extend_rows(rows, |row| element_at(&row[index], i));
        }
    }
}

/// Pass 2 over a (sequence, scalar) seed pair: prefix slices `s[0..n]` and
/// `s[0..n-1]`, and the indexed element `s[n]`.
fn intro_sequence_scalar_slices(vars: &mut Vec<VarInfo>, rows: &mut WorkingRows, seq_idx: usize, scl_idx: usize) {
    // The scalar must be a genuinely separate quantity: not this
    // sequence's size under any name, not itself derived.
    match vars[seq_idx].derived_len {
        Some(LenSource::Var(size_idx)) => {
            if size_idx == scl_idx || vars[size_idx].canonical_var() == scl_idx {
                return;
            }
        }
        Some(LenSource::KnownConst) | None => {}
    }
    if vars[scl_idx].is_derived {
        return;
    }
    let Some(scl_inv) = scalar_inv(vars, scl_idx) else { return };
    let scl_const = scl_inv.exact_value().cloned();
    let scl_can_be_missing = scl_inv.base.can_be_missing;
    let scl_max = scl_inv.max.clone();
    // Constant indices at or below one: the first elements are already
    // extracted, and the corresponding slices are degenerate.
    if scl_const.as_ref().is_some_and(|c| *c <= Value::Int(1)) {
        return;
    }

    let seq_missing = vars[seq_idx]
        .invariant
        .as_ref()
        .is_none_or(|inv| inv.base().can_be_missing);
    let not_exactly_one = scl_const.as_ref().is_none_or(|c| *c > Value::Int(1));

    if !seq_missing && !vars[seq_idx].is_derived && !scl_can_be_missing {
        let seq_name = vars[seq_idx].name.clone();
        let scl_name = vars[scl_idx].name.clone();

        // s[0..n]: the first n+1 elements, so its length is one more than
        // n and no variable holds it.
        let full_idx = push_var(vars, format!("{seq_name}[0..{scl_name}]"), VarKind::Sequence);
        vars[full_idx].derived_len = Some(LenSource::KnownConst);
        extend_rows(rows, |row| prefix_slice(&row[seq_idx], &row[scl_idx], 1));

        if not_exactly_one {
            let less_idx = push_var(vars, format!("{seq_name}[0..{scl_name}-1]"), VarKind::Sequence);
            vars[less_idx].derived_len = Some(LenSource::Var(scl_idx));
            extend_rows(rows, |row| prefix_slice(&row[seq_idx], &row[scl_idx], 0));
        }
    }

    // s[n], when n stays within the sequence's observed size range.
    if !vars[seq_idx].is_derived && not_exactly_one {
        let Some(LenSource::Var(size_idx)) = vars[seq_idx].derived_len else {
            return;
        };
        let Some(size_max) = scalar_inv(vars, size_idx).map(|inv| inv.max.clone()) else {
            return;
        };
        if !opt_le(scl_max.as_ref(), size_max.as_ref()) {
            return;
        }
        let seq_name = vars[seq_idx].name.clone();
        let scl_name = vars[scl_idx].name.clone();
        push_var(vars, format!("{seq_name}[{scl_name}]"), VarKind::Scalar);
        extend_rows(rows, |row| match row[scl_idx].as_int() {
            Some(i) => element_at(&row[seq_idx], i),
            None => Value::Missing,
        });
    }
}

fn intro_scalar_sequence_slices(vars: &mut Vec<VarInfo>, rows: &mut WorkingRows, scl_idx: usize, seq_idx: usize) {
    intro_sequence_scalar_slices(vars, rows, seq_idx, scl_idx);
}

/// Missing-first comparison on optional values, mirroring how missing
/// sorts below every number.
fn opt_le(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(x), Some(y)) => x <= y,
    }
}

/// Sum of a sequence's elements. Empty sums to zero; a missing sequence or
/// a missing element yields missing; integer overflow degrades to float.
fn seq_sum(seq: &Value) -> Value {
    let Some(elems) = seq.as_seq() else {
        return Value::Missing;
    };
    let mut int_acc: Option<i64> = Some(0);
    let mut float_acc = 0.0f64;
    for elem in elems {
        let Some(f) = elem.as_f64() else {
            return Value::Missing;
        };
        float_acc += f;
        int_acc = match (int_acc, elem.as_int()) {
            (Some(acc), Some(i)) => acc.checked_add(i),
            _ => None,
        };
    }
    match int_acc {
        Some(total) => Value::Int(total),
        None => Value::Float(float_acc),
    }
}

/// Min or max element; missing for empty or missing sequences. A missing
/// element sorts below every number, so it becomes the minimum.
fn seq_extremum(seq: &Value, minimum: bool) -> Value {
    let Some(elems) = seq.as_seq() else {
        return Value::Missing;
    };
    let extremum = if minimum { elems.iter().min() } else { elems.iter().max() };
    extremum.cloned().unwrap_or(Value::Missing)
}

/// Element at `index`; negative indices count from the back. Out of range
/// or missing inputs yield missing.
fn element_at(seq: &Value, index: i64) -> Value {
    let Some(elems) = seq.as_seq() else {
        return Value::Missing;
    };
    let len = elems.len() as i64;
    let effective = if index < 0 { len + index } else { index };
    if (0..len).contains(&effective) {
        elems[effective as usize].clone()
    } else {
        Value::Missing
    }
}

/// The prefix `seq[0 .. scl + bias]`; out-of-range bounds yield missing.
fn prefix_slice(seq: &Value, scl: &Value, bias: i64) -> Value {
    let (Some(elems), Some(n)) = (seq.as_seq(), scl.as_int()) else {
        return Value::Missing;
    };
    let end = n + bias;
    if end >= 0 && end <= elems.len() as i64 {
        Value::Seq(elems[..end as usize].to_vec())
    } else {
        Value::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(vals: &[i64]) -> Value {
        Value::Seq(vals.iter().map(|&v| Value::Int(v)).collect())
    }

    #[test]
    fn sum_of_empty_is_zero_but_extrema_are_missing() {
        let empty = seq(&[]);
        assert_eq!(seq_sum(&empty), Value::Int(0));
        assert!(seq_extremum(&empty, true).is_missing());
        assert!(seq_extremum(&empty, false).is_missing());
    }

    #[test]
    fn missing_sequence_loses_all_aggregates() {
        assert!(seq_sum(&Value::Missing).is_missing());
        assert!(seq_extremum(&Value::Missing, true).is_missing());
    }

    #[test]
    fn negative_indices_count_from_the_back() {
        let s = seq(&[10, 20, 30]);
        assert_eq!(element_at(&s, 0), Value::Int(10));
        assert_eq!(element_at(&s, -1), Value::Int(30));
        assert!(element_at(&s, 3).is_missing());
        assert!(element_at(&s, -4).is_missing());
    }

    #[test]
    fn prefix_slices_honor_inclusive_and_exclusive_bounds() {
        let s = seq(&[10, 20, 30, 40]);
        let n = Value::Int(2);
        assert_eq!(prefix_slice(&s, &n, 1), seq(&[10, 20, 30]));
        assert_eq!(prefix_slice(&s, &n, 0), seq(&[10, 20]));
        assert!(prefix_slice(&s, &Value::Int(4), 1).is_missing());
        assert_eq!(prefix_slice(&s, &Value::Int(4), 0), seq(&[10, 20, 30, 40]));
    }
}
