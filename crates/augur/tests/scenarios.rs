//! End-to-end scenarios: literal traces in, expected invariants out.

use augur::{Comparison, Detector, EngineConfig, Invariant, ProgramPoint, Value};

fn detect(trace: &str) -> Detector {
    let mut detector = Detector::new(EngineConfig::default());
    detector.read_str("test.dtrace", trace, None).expect("trace reads");
    detector.infer();
    detector
}

fn point<'a>(detector: &'a Detector, name: &str) -> &'a ProgramPoint {
    detector.point(name).expect("program point exists")
}

fn var_index(point: &ProgramPoint, name: &str) -> usize {
    point
        .vars
        .iter()
        .position(|vi| vi.name == name)
        .unwrap_or_else(|| panic!("no variable named {name}"))
}

fn scalar_invariant<'a>(point: &'a ProgramPoint, name: &str) -> &'a augur::ScalarInvariant {
    match point.vars[var_index(point, name)].invariant.as_ref() {
        Some(Invariant::Scalar(inv)) => inv,
        other => panic!("expected scalar invariant for {name}, got {other:?}"),
    }
}

fn column(point: &ProgramPoint, name: &str) -> Vec<Value> {
    let idx = var_index(point, name);
    point.table.rows().map(|(row, _)| row[idx].clone()).collect()
}

fn ints(vals: &[i64]) -> Vec<Value> {
    vals.iter().map(|&v| Value::Int(v)).collect()
}

fn seq(vals: &[i64]) -> Value {
    Value::Seq(ints(vals))
}

fn repeat_record(label: &str, bindings: &str, times: usize) -> String {
    let mut out = String::new();
    for _ in 0..times {
        out.push_str(label);
        out.push('\n');
        out.push_str(bindings);
        out.push_str("\n\n");
    }
    out
}

// S1: modular constraint, justified range, justified nonzero.
#[test]
fn s1_modulus_range_and_nonzero() {
    let mut trace = String::new();
    for value in ["3", "6", "9"] {
        trace.push_str(&repeat_record("P", &format!("x\t{value}"), 10));
    }
    let detector = detect(&trace);
    let p = point(&detector, "P");
    assert_eq!(p.samples, 30);

    let inv = scalar_invariant(p, "x");
    assert_eq!(inv.modulus, Some((0, 3)), "x = 0 (mod 3)");
    assert!(inv.modulus_justified);
    assert_eq!(inv.min, Some(Value::Int(3)));
    assert_eq!(inv.max, Some(Value::Int(9)));
    assert!(inv.min_justified, "10 of 30 samples at the minimum");
    assert!(inv.max_justified);
    assert!(!inv.can_be_zero);
    assert!(inv.nonzero_justified);
}

// S2: pairwise linear fit y = 2x + 1.
#[test]
fn s2_pairwise_linear() {
    let trace = "P\nx\t1\ny\t3\n\nP\nx\t2\ny\t5\n\nP\nx\t3\ny\t7\n";
    let detector = detect(trace);
    let p = point(&detector, "P");

    let x = var_index(p, "x");
    let y = var_index(p, "y");
    let Some(Invariant::TwoScalar(pair)) = p.vars[x].pair_invariants.get(&y) else {
        panic!("expected a two-scalar invariant between x and y");
    };
    assert_eq!(pair.linear, Some((2.0, 1.0)), "y = 2 x + 1");
    assert_eq!(pair.comparison, Some(Comparison::Lt));
}

// S3: derived size, sum, order flag, and pooled element range.
#[test]
fn s3_sequence_derivations() {
    let trace = "P\nA[]\t#(1 2 3)\n\nP\nA[]\t#(4 5 6)\n";
    let detector = detect(trace);
    let p = point(&detector, "P");

    let names: Vec<&str> = p.vars.iter().map(|vi| vi.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["A", "size(A)", "sum(A)", "min(A)", "max(A)", "A[0]", "A[1]", "A[-2]", "A[-1]"],
        "exactly the documented derivations, in order"
    );

    let size = scalar_invariant(p, "size(A)");
    assert!(size.is_exact());
    assert_eq!(size.exact_value(), Some(&Value::Int(3)));
    assert!(size.nonnegative_obvious);

    let sum = scalar_invariant(p, "sum(A)");
    let one_of = sum.base.one_of.as_ref().expect("two distinct sums");
    let sums: Vec<&Value> = one_of.iter().map(|entry| &entry[0]).collect();
    assert_eq!(sums, vec![&Value::Int(6), &Value::Int(15)]);

    let Some(Invariant::Sequence(seq_inv)) = p.vars[0].invariant.as_ref() else {
        panic!("expected sequence invariant for A");
    };
    assert!(seq_inv.non_decreasing);
    assert!(!seq_inv.non_increasing);
    let all = seq_inv.all_elements.as_ref().expect("pooled elements");
    assert_eq!(all.min, Some(Value::Int(1)));
    assert_eq!(all.max, Some(Value::Int(6)));

    // min(A) coincides with A[0], max(A) with A[-1]; the later variable
    // of each pair loses canonicity.
    assert!(p.vars[var_index(p, "min(A)")].is_canonical());
    assert!(!p.vars[var_index(p, "A[0]")].is_canonical());
    assert!(!p.vars[var_index(p, "A[-1]")].is_canonical());
}

// S4: prefix slices and the indexed element.
#[test]
fn s4_slices_and_indexed_element() {
    let trace = "P\nA[]\t#(10 20 30 40)\nn\t2\n\nP\nA[]\t#(7 8 9 10)\nn\t2\n";
    let detector = detect(trace);
    let p = point(&detector, "P");

    assert_eq!(column(p, "A[0..n]"), vec![seq(&[10, 20, 30]), seq(&[7, 8, 9])]);
    assert_eq!(column(p, "A[0..n-1]"), vec![seq(&[10, 20]), seq(&[7, 8])]);
    assert_eq!(column(p, "A[n]"), ints(&[30, 9]));

    // The slice lengths are tracked: A[0..n-1] is exactly n long.
    let less = &p.vars[var_index(p, "A[0..n-1]")];
    assert_eq!(less.derived_len, Some(augur::LenSource::Var(var_index(p, "n"))));
    let full = &p.vars[var_index(p, "A[0..n]")];
    assert_eq!(full.derived_len, Some(augur::LenSource::KnownConst));
}

// S5: linear pair plus sequence membership over many samples.
#[test]
fn s5_linear_and_membership() {
    let mut trace = String::new();
    for i in 0..50 {
        let a = i % 7 + 2;
        trace.push_str(&format!("P\na\t{a}\nb\t{}\nS[]\t#({a} 100)\n\n", a + 1));
    }
    let detector = detect(&trace);
    let p = point(&detector, "P");
    assert_eq!(p.samples, 50);

    let a = var_index(p, "a");
    let b = var_index(p, "b");
    let s = var_index(p, "S");

    let Some(Invariant::TwoScalar(pair)) = p.vars[a].pair_invariants.get(&b) else {
        panic!("expected two-scalar invariant between a and b");
    };
    assert_eq!(pair.linear, Some((1.0, 1.0)), "b = a + 1");
    assert_eq!(pair.render("a", "b").text, "b = a + 1 \t(7 values)");

    let Some(Invariant::ScalarSequence(member)) = p.vars[a].pair_invariants.get(&s) else {
        panic!("expected scalar-sequence invariant between a and S");
    };
    assert!(member.member, "a is a member of S in every sample");
    assert!(!member.member_obvious);

    // b = a + 1 is never in S = (a, 100) for these samples.
    let Some(Invariant::ScalarSequence(not_member)) = p.vars[b].pair_invariants.get(&s) else {
        panic!("expected scalar-sequence invariant between b and S");
    };
    assert!(!not_member.member);
}

// S6: two constants merge into one equality class and nothing more.
#[test]
fn s6_constant_equality_merge() {
    let trace = "P\nx\t0\ny\t0\n\nP\nx\t0\ny\t0\n";
    let detector = detect(trace);
    let p = point(&detector, "P");

    let x = scalar_invariant(p, "x");
    assert!(x.is_exact());
    assert_eq!(x.exact_value(), Some(&Value::Int(0)));

    assert_eq!(p.vars[0].equal_to.as_slice(), &[1]);
    assert_eq!(p.vars[1].equal_to.as_slice(), &[0]);
    assert!(p.vars[0].is_canonical());
    assert!(!p.vars[1].is_canonical());
    assert!(
        p.vars[0].pair_invariants.is_empty(),
        "equality merging replaces the pairwise invariant"
    );

    let report = detector.render_report(false);
    assert!(report.contains("x = y = 0"), "equality group with constant:\n{report}");
}
