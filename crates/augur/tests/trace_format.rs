//! Trace ingestion: grammar, errors, parameter snapshots, merging.

use augur::{compile_selection, Detector, EngineConfig, ReadError, Value};

fn reader() -> Detector {
    Detector::new(EngineConfig::default())
}

fn column(detector: &Detector, point: &str, var: &str) -> Vec<Value> {
    let point = detector.point(point).expect("point exists");
    let idx = point
        .vars
        .iter()
        .position(|vi| vi.name == var)
        .unwrap_or_else(|| panic!("no variable named {var}"));
    point.table.rows().map(|(row, _)| row[idx].clone()).collect()
}

#[test]
fn first_line_must_be_a_label() {
    let mut detector = reader();
    let err = detector
        .read_str("t", "x\t5\nP\nx\t5\n", None)
        .expect_err("value line before any label");
    assert!(matches!(err, ReadError::TabInLabel { line: 1, .. }));
}

#[test]
fn unrecognized_value_is_fatal() {
    let mut detector = reader();
    let err = detector
        .read_str("t", "P\nx\tbogus\n", None)
        .expect_err("unparseable value");
    match err {
        ReadError::UnparseableValue { line, token, .. } => {
            assert_eq!(line, 2);
            assert_eq!(token, "bogus");
        }
        other => panic!("wrong error: {other}"),
    }
}

#[test]
fn inconsistent_schema_is_fatal() {
    let mut detector = reader();
    let err = detector
        .read_str("t", "P\nx\t1\n\nP\ny\t1\n", None)
        .expect_err("renamed variable");
    assert!(matches!(err, ReadError::InconsistentSchema { .. }));
}

#[test]
fn nil_reads_as_zero_and_uninit_as_missing() {
    let mut detector = reader();
    detector
        .read_str("t", "P\nx\tNIL\ny\tuninit\n", None)
        .expect("trace reads");
    assert_eq!(column(&detector, "P", "x"), vec![Value::Int(0)]);
    assert!(column(&detector, "P", "y")[0].is_missing());
}

#[test]
fn duplicate_tuples_accumulate_counts() {
    let mut detector = reader();
    detector
        .read_str("t", "P\nx\t1\n\nP\nx\t1\n\nP\nx\t2\n", None)
        .expect("trace reads");
    let point = detector.point("P").expect("point exists");
    assert_eq!(point.samples, 3);
    assert_eq!(point.table.distinct(), 2);
}

#[test]
fn merging_files_sums_counts_and_checks_schemas() {
    let mut detector = reader();
    detector.read_str("a", "P\nx\t1\n", None).expect("first file");
    detector.read_str("b", "P\nx\t1\n\nP\nx\t3\n", None).expect("second file");
    let point = detector.point("P").expect("point exists");
    assert_eq!(point.samples, 3);

    let err = detector
        .read_str("c", "P\nz\t1\n", None)
        .expect_err("schema differs across files");
    assert!(matches!(err, ReadError::InconsistentSchema { .. }));
}

#[test]
fn end_records_expose_orig_parameter_values() {
    let trace = "\
f:::BEGIN(n, xs[])
n\t5
xs[]\t#(1 2)

f:::END(n, xs[])
n\t9
xs[]\t#(1 2 3)
";
    let mut detector = reader();
    detector.read_str("t", trace, None).expect("trace reads");
    let end = "f:::END(n, xs[])";
    assert_eq!(column(&detector, end, "n"), vec![Value::Int(9)]);
    assert_eq!(column(&detector, end, "n_orig"), vec![Value::Int(5)]);
    assert_eq!(
        column(&detector, end, "xs_orig"),
        vec![Value::Seq(vec![Value::Int(1), Value::Int(2)])]
    );
}

#[test]
fn recursive_calls_pop_snapshots_in_order() {
    let trace = "\
f:::BEGIN(n)
n\t1

f:::BEGIN(n)
n\t2

f:::END(n)
n\t20

f:::END(n)
n\t10
";
    let mut detector = reader();
    detector.read_str("t", trace, None).expect("trace reads");
    // Inner call returns first and sees the inner snapshot.
    assert_eq!(
        column(&detector, "f:::END(n)", "n_orig"),
        vec![Value::Int(2), Value::Int(1)]
    );
}

#[test]
fn selection_regex_is_case_insensitive() {
    let trace = "PUSH:::BEGIN(x)\nx\t1\n\npop:::BEGIN(y)\ny\t2\n";
    let selection = compile_selection("push").expect("valid pattern");
    let mut detector = reader();
    detector.read_str("t", trace, Some(&selection)).expect("trace reads");
    assert!(detector.point("PUSH:::BEGIN(x)").is_some());
    assert!(detector.point("pop:::BEGIN(y)").is_none());
}

#[test]
fn invocation_counts_append_call_columns() {
    let trace = "\
f:::BEGIN(x)
x\t1

g:::BEGIN(y)
y\t2

f:::BEGIN(x)
x\t3
";
    let dir = std::env::temp_dir().join("augur-test-counts");
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("counts.dtrace");
    std::fs::write(&path, trace).expect("write temp trace");

    let mut detector = Detector::new(EngineConfig {
        invocation_counts: true,
        ..EngineConfig::default()
    });
    detector.read_files(&[&path], None).expect("trace reads");

    let f = detector.point("f:::BEGIN(x)").expect("point exists");
    let names: Vec<&str> = f.vars.iter().map(|vi| vi.name.as_str()).collect();
    assert_eq!(names, vec!["x", "calls(f)", "calls(g)"]);
    assert_eq!(column(&detector, "f:::BEGIN(x)", "calls(f)"), vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(column(&detector, "f:::BEGIN(x)", "calls(g)"), vec![Value::Int(0), Value::Int(1)]);
}

#[test]
fn float_values_are_preserved() {
    let mut detector = reader();
    detector.read_str("t", "P\nx\t2.5\n\nP\nx\t-0.5\n", None).expect("reads");
    assert_eq!(column(&detector, "P", "x"), vec![Value::Float(2.5), Value::Float(-0.5)]);
}
