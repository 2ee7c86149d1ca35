//! Lexical layer of the trace format.
//!
//! A trace is a stream of records. Each record starts with a label line
//! naming the program point: `TAG:::SUFFIX`, optionally followed by a
//! parenthesized parameter list, e.g. `push:::BEGIN(x, stack[])`. The
//! label is followed by zero or more `name<TAB>value` lines, terminated by
//! a blank line, the next label, or end of file.
//!
//! Values are integers, decimals, the literal `uninit` (missing), `NIL`
//! (zero by policy), or sequences `#( v1 v2 ... )`. A name suffixed `[]`
//! also marks a sequence. A sequence whose first element is `uninit` is
//! wholly missing.

use std::fmt;

use crate::{value::Value, varinfo::VarKind};

/// Errors fatal to ingestion of a trace file.
#[derive(Debug)]
pub enum ReadError {
    Io {
        path: String,
        source: std::io::Error,
    },
    /// A label was expected but the line contains a tab.
    TabInLabel {
        path: String,
        line: usize,
    },
    /// A value token matched no rule of the grammar.
    UnparseableValue {
        path: String,
        line: usize,
        token: String,
    },
    /// The same program point appeared with differing variable names.
    InconsistentSchema {
        point: String,
    },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {path}: {source}"),
            Self::TabInLabel { path, line } => {
                write!(f, "{path}:{line}: expected a program-point label, found a value line")
            }
            Self::UnparseableValue { path, line, token } => {
                write!(f, "{path}:{line}: unparseable value {token:?}")
            }
            Self::InconsistentSchema { point } => {
                write!(f, "program point {point:?} recorded with differing variable names")
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type ReadResult<T> = Result<T, ReadError>;

/// Which side of a function a label marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LabelKind {
    Begin,
    End,
    Other,
}

/// A parsed program-point label.
#[derive(Debug, Clone)]
pub(crate) struct Label {
    /// The function identifier: everything before `:::`.
    pub func: String,
    pub kind: LabelKind,
    /// Declared parameter names, raw (sequence parameters keep their `[]`).
    pub params: Vec<String>,
}

pub(crate) fn parse_label(line: &str) -> Label {
    let (func, suffix) = match line.split_once(":::") {
        Some((func, suffix)) => (func, suffix),
        None => (line, ""),
    };
    let (head, params_raw) = match suffix.split_once('(') {
        Some((head, rest)) => (head, rest.strip_suffix(')').unwrap_or(rest)),
        None => (suffix, ""),
    };
    let kind = match head {
        "BEGIN" => LabelKind::Begin,
        "END" => LabelKind::End,
        _ => LabelKind::Other,
    };
    let params = params_raw
        .split([',', ' '])
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect();
    Label {
        func: func.to_owned(),
        kind,
        params,
    }
}

/// True when a declared name denotes a sequence: `xs[]` or `xs[a..b]`.
pub(crate) fn is_sequence_param(name: &str) -> bool {
    name.ends_with(']') && name.contains('[')
}

/// Strips the `[]` marker from a sequence variable name.
pub(crate) fn strip_sequence_suffix(name: &str) -> &str {
    name.strip_suffix("[]").unwrap_or(name)
}

fn is_integer(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(token: &str) -> bool {
    let body = token.strip_prefix('-').unwrap_or(token);
    match body.split_once('.') {
        Some((int_part, frac_part)) => {
            (!int_part.is_empty() || !frac_part.is_empty())
                && int_part.bytes().all(|b| b.is_ascii_digit())
                && frac_part.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Parses one scalar token. `None` marks an unrecognized lexeme.
pub(crate) fn parse_scalar(token: &str) -> Option<Value> {
    match token {
        "uninit" => Some(Value::Missing),
        // Legacy marker from Lisp-side instrumentation; zero by policy.
        "NIL" => Some(Value::Int(0)),
        _ if is_integer(token) => match token.parse::<i64>() {
            Ok(i) => Some(Value::Int(i)),
            // Out of i64 range; keep the magnitude as a float.
            Err(_) => token.parse::<f64>().ok().map(Value::Float),
        },
        _ if is_decimal(token) => token.parse::<f64>().ok().map(Value::Float),
        _ => None,
    }
}

/// Parses one `name<TAB>value` payload into the stored variable name, its
/// kind, and the value. The sequence-ness of a slot is signalled by the
/// `[]` name suffix or by the `#( ... )` value form.
pub(crate) fn parse_binding(name: &str, raw: &str) -> Option<(String, VarKind, Value)> {
    let is_seq = name.ends_with(']') || raw.starts_with("#(");
    if !is_seq {
        return Some((name.to_owned(), VarKind::Scalar, parse_scalar(raw)?));
    }

    let stored_name = strip_sequence_suffix(name).to_owned();
    let body = raw
        .strip_prefix("#(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(raw);
    let tokens: Vec<&str> = body.split(' ').filter(|t| !t.is_empty()).collect();

    let value = if tokens.first() == Some(&"uninit") {
        Value::Missing
    } else {
        let elems: Option<Vec<Value>> = tokens.iter().map(|t| parse_scalar(t)).collect();
        Value::Seq(elems?)
    };
    Some((stored_name, VarKind::Sequence, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_split_into_function_kind_and_params() {
        let label = parse_label("makepat:::BEGIN(arg_0[], start, delim)");
        assert_eq!(label.func, "makepat");
        assert_eq!(label.kind, LabelKind::Begin);
        assert_eq!(label.params, vec!["arg_0[]", "start", "delim"]);

        let bare = parse_label("PUSH-ACTION");
        assert_eq!(bare.func, "PUSH-ACTION");
        assert_eq!(bare.kind, LabelKind::Other);
        assert!(bare.params.is_empty());
    }

    #[test]
    fn scalar_grammar() {
        assert_eq!(parse_scalar("42"), Some(Value::Int(42)));
        assert_eq!(parse_scalar("-7"), Some(Value::Int(-7)));
        assert_eq!(parse_scalar("3.5"), Some(Value::Float(3.5)));
        assert_eq!(parse_scalar("-.5"), Some(Value::Float(-0.5)));
        assert_eq!(parse_scalar("2."), Some(Value::Float(2.0)));
        assert_eq!(parse_scalar("uninit"), Some(Value::Missing));
        assert_eq!(parse_scalar("NIL"), Some(Value::Int(0)));
        assert_eq!(parse_scalar("abc"), None);
        assert_eq!(parse_scalar("1.2.3"), None);
        assert_eq!(parse_scalar(""), None);
    }

    #[test]
    fn sequences_by_name_suffix_or_value_form() {
        let (name, kind, value) = parse_binding("xs[]", "#(1 2 3)").expect("parses");
        assert_eq!(name, "xs");
        assert_eq!(kind, VarKind::Sequence);
        assert_eq!(
            value,
            Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );

        let (_, kind, value) = parse_binding("ys", "#( 4 5 )").expect("parses");
        assert_eq!(kind, VarKind::Sequence);
        assert_eq!(value, Value::Seq(vec![Value::Int(4), Value::Int(5)]));
    }

    #[test]
    fn uninit_first_element_makes_whole_sequence_missing() {
        let (_, _, value) = parse_binding("xs[]", "#(uninit 2)").expect("parses");
        assert!(value.is_missing());
        // But an interior uninit is just a missing element.
        let (_, _, value) = parse_binding("xs[]", "#(2 uninit)").expect("parses");
        assert_eq!(value, Value::Seq(vec![Value::Int(2), Value::Missing]));
    }

    #[test]
    fn empty_sequence_is_empty_not_missing() {
        let (_, _, value) = parse_binding("xs[]", "#()").expect("parses");
        assert_eq!(value, Value::Seq(vec![]));
    }

    #[test]
    fn unrecognized_element_fails_the_binding() {
        assert!(parse_binding("xs[]", "#(1 what 3)").is_none());
        assert!(parse_binding("n", "what").is_none());
    }
}
