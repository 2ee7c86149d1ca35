//! The inference driver: a staged fixpoint alternating invariant
//! inference with derivation passes.
//!
//! Per program point the driver keeps a monotone index triple
//! `(k0, k1, k2)`: invariants exist for `[0, k0)`, pass-1 derivation has
//! consumed seeds `[0, k1)`, pass-2 seeds `[0, k2)`. Each iteration infers
//! over `[k0, n)`, runs pass 1 over `[k1, k0)` and pass 2 over `[k2, k1)`,
//! then shifts the triple to `(n, k0, k1)`. The loop ends when the last
//! index reaches the variable count, i.e. no pass added variables.
//!
//! Keeping pass 2 one stage behind pass 1 guarantees that the size
//! variables pass 2 consults already carry singleton invariants.

use log::debug;

use crate::{
    config::EngineConfig,
    derive::introduce_one_pass,
    invariants::{
        BaseInvariant, Comparison, Invariant, ScalarInvariant, ScalarSequenceInvariant, SequenceInvariant,
        ThreeScalarInvariant, TwoScalarInvariant, TwoSequenceInvariant,
    },
    point::{ProgramPoint, DERIVATION_PASSES},
    value::Value,
    varinfo::VarInfo,
};

/// Runs the full derive-and-infer fixpoint for one program point.
///
/// Safe to run repeatedly: invariants are wiped and re-inferred, while the
/// persistent per-pass marks prevent duplicate derived variables, so a
/// second run reproduces the first run's state exactly.
pub fn infer_point(point: &mut ProgramPoint, config: &EngineConfig) {
    clear_point_invariants(point);

    let mut indices = [0usize; DERIVATION_PASSES + 1];
    while indices[DERIVATION_PASSES] < point.vars.len() {
        let var_count = point.vars.len();
        debug!(
            "inference round at {}: indices {:?}, {} vars",
            point.name, indices, var_count
        );
        infer_over(point, indices[0], var_count, config);

        for pass in 0..DERIVATION_PASSES {
            let hi = indices[pass];
            let lo = indices[pass + 1].max(point.derived_marks[pass]);
            if lo < hi {
                introduce_one_pass(point, pass, lo..hi);
            }
            point.derived_marks[pass] = point.derived_marks[pass].max(hi);
        }

        for pass in (1..=DERIVATION_PASSES).rev() {
            indices[pass] = indices[pass - 1];
        }
        indices[0] = var_count;
    }

    #[cfg(debug_assertions)]
    point.check_integrity();
}

/// Wipes every invariant field while leaving variables, values, and
/// derivation marks intact. Equality classes are invariant-derived state
/// and are rebuilt by the next inference run.
pub fn clear_point_invariants(point: &mut ProgramPoint) {
    for vi in &mut point.vars {
        vi.invariant = None;
        vi.pair_invariants.clear();
        vi.triple_invariants.clear();
        vi.equal_to.clear();
    }
}

/// Infers singleton invariants for `[from, to)`, then pairwise and (when
/// enabled) ternary invariants for every combination touching that range.
fn infer_over(point: &mut ProgramPoint, from: usize, to: usize, config: &EngineConfig) {
    let ProgramPoint { vars, table, .. } = point;

    for i in from..to {
        debug_assert!(vars[i].invariant.is_none(), "invariants are assigned once");
        debug_assert!(vars[i].is_canonical(), "fresh variables start canonical");
        let counts = table.project1(i);
        let inv = if vars[i].is_sequence() {
            Invariant::Sequence(SequenceInvariant::infer(&counts, &table.element_counts(i), config))
        } else {
            Invariant::Scalar(ScalarInvariant::infer(&counts, Some(&vars[i].name), config))
        };
        vars[i].invariant = Some(inv);
    }

    let exact = |vars: &[VarInfo], i: usize| vars[i].invariant.as_ref().is_some_and(Invariant::is_exact);
    let missing = |vars: &[VarInfo], i: usize| vars[i].invariant.as_ref().is_none_or(Invariant::can_be_missing);
    let pair_exact =
        |vars: &[VarInfo], a: usize, b: usize| vars[a].pair_invariants.get(&b).is_some_and(Invariant::is_exact);

    // Pairwise invariants.
    for i1 in 0..to.saturating_sub(1) {
        if missing(vars, i1) || !vars[i1].is_canonical() {
            continue;
        }
        for i2 in (i1 + 1).max(from)..to {
            if !vars[i2].is_canonical() || missing(vars, i2) {
                continue;
            }
            let (exact1, exact2) = (exact(vars, i1), exact(vars, i2));
            if exact1 && exact2 {
                // Two constants either coincide, collapsing into one
                // equality class, or are unrelated; nothing else to infer.
                let equal = match (exact_value(vars, i1), exact_value(vars, i2)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                };
                if equal {
                    vars[i1].record_equal(i2);
                    vars[i2].record_equal(i1);
                }
                continue;
            }
            if exact1 || exact2 {
                continue;
            }

            let counts = table.project2(i1, i2);
            let inv = {
                let (vi1, vi2) = (&vars[i1], &vars[i2]);
                match (vi1.is_sequence(), vi2.is_sequence()) {
                    (true, true) => {
                        Invariant::TwoSequence(TwoSequenceInvariant::infer(&counts, &vi1.name, &vi2.name, config))
                    }
                    (true, false) => Invariant::ScalarSequence(ScalarSequenceInvariant::infer(
                        &counts, true, &vi1.name, &vi2.name, config,
                    )),
                    (false, true) => Invariant::ScalarSequence(ScalarSequenceInvariant::infer(
                        &counts, false, &vi2.name, &vi1.name, config,
                    )),
                    (false, false) => {
                        let (Some(x_inv), Some(y_inv)) = (
                            vi1.invariant.as_ref().and_then(Invariant::as_scalar),
                            vi2.invariant.as_ref().and_then(Invariant::as_scalar),
                        ) else {
                            continue;
                        };
                        Invariant::TwoScalar(TwoScalarInvariant::infer(
                            &counts, &vi1.name, &vi2.name, x_inv, y_inv, config,
                        ))
                    }
                }
            };
            let concluded_equal = inv.comparison() == Some(Comparison::Eq);
            vars[i1].pair_invariants.insert(i2, inv);
            if concluded_equal {
                vars[i1].record_equal(i2);
                vars[i2].record_equal(i1);
            }
        }
    }

    if !config.ternary_invariants {
        return;
    }

    // Ternary invariants. Constants and exactly-related pairs contribute
    // nothing a lower arity has not already captured.
    for i1 in 0..to.saturating_sub(2) {
        if exact(vars, i1) || missing(vars, i1) || !vars[i1].is_canonical() {
            continue;
        }
        for i2 in i1 + 1..to.saturating_sub(1) {
            if exact(vars, i2) || pair_exact(vars, i1, i2) || missing(vars, i2) || !vars[i2].is_canonical() {
                continue;
            }
            let i3_start = if i1 >= from || i2 >= from {
                i2 + 1
            } else {
                (i2 + 1).max(from)
            };
            for i3 in i3_start..to {
                if exact(vars, i3)
                    || pair_exact(vars, i1, i3)
                    || pair_exact(vars, i2, i3)
                    || missing(vars, i3)
                    || !vars[i3].is_canonical()
                {
                    continue;
                }
                let counts = table.project3(i1, i2, i3);
                let any_sequence =
                    vars[i1].is_sequence() || vars[i2].is_sequence() || vars[i3].is_sequence();
                let inv = if any_sequence {
                    Invariant::Opaque(BaseInvariant::from_counts3(&counts, config.one_of_threshold))
                } else {
                    Invariant::ThreeScalar(ThreeScalarInvariant::infer(&counts, config))
                };
                vars[i1].triple_invariants.insert((i2, i3), inv);
            }
        }
    }
}

/// The constant value of an exact, never-missing variable.
fn exact_value(vars: &[VarInfo], i: usize) -> Option<&Value> {
    match vars[i].invariant.as_ref()? {
        Invariant::Scalar(inv) => inv.exact_value(),
        Invariant::Sequence(inv) if inv.base.is_exact() => inv.min.as_ref(),
        _ => None,
    }
}
