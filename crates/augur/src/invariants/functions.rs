//! Fixed pools of unary and binary functions for function-fit invariants.
//!
//! Evaluation is total over `Option`: a type mismatch, division by zero, or
//! overflow yields `None`, which removes only the offending function from
//! the candidate set and never aborts inference.

use num_integer::Integer;
use strum::Display;

use crate::value::Value;

/// Unary candidates for `y = f(x)` / `x = f(y)` fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryFn {
    Abs,
    Neg,
    /// Bitwise complement; integers only.
    Not,
}

pub const UNARY_POOL: [UnaryFn; 3] = [UnaryFn::Abs, UnaryFn::Neg, UnaryFn::Not];

impl UnaryFn {
    pub fn apply(self, v: &Value) -> Option<Value> {
        match (self, v) {
            (Self::Abs, Value::Int(i)) => i.checked_abs().map(Value::Int),
            (Self::Abs, Value::Float(f)) => Some(Value::Float(f.abs())),
            (Self::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int),
            (Self::Neg, Value::Float(f)) => Some(Value::Float(-f)),
            (Self::Not, Value::Int(i)) => Some(Value::Int(!i)),
            _ => None,
        }
    }
}

/// Binary candidates for two-argument function fits over triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryFn {
    Min,
    Max,
    Mul,
    BitAnd,
    BitOr,
    Gcd,
    Cmp,
    Pow,
    Round,
    Div,
    Mod,
    Shl,
    Shr,
}

/// Functions where argument order does not matter; tried only with the
/// preferred argument first.
pub const SYMMETRIC_BINARY_POOL: [BinaryFn; 6] = [
    BinaryFn::Min,
    BinaryFn::Max,
    BinaryFn::Mul,
    BinaryFn::BitAnd,
    BinaryFn::BitOr,
    BinaryFn::Gcd,
];

/// Functions tried in both argument orders.
pub const ASYMMETRIC_BINARY_POOL: [BinaryFn; 7] = [
    BinaryFn::Cmp,
    BinaryFn::Pow,
    BinaryFn::Round,
    BinaryFn::Div,
    BinaryFn::Mod,
    BinaryFn::Shl,
    BinaryFn::Shr,
];

impl BinaryFn {
    pub fn apply(self, a: &Value, b: &Value) -> Option<Value> {
        match self {
            Self::Min | Self::Max => {
                let (fa, fb) = (a.as_f64()?, b.as_f64()?);
                let take_a = if self == Self::Min { fa <= fb } else { fa >= fb };
                Some(if take_a { a.clone() } else { b.clone() })
            }
            Self::Mul => match (a, b) {
                (Value::Int(x), Value::Int(y)) => x.checked_mul(*y).map(Value::Int),
                _ => Some(Value::Float(a.as_f64()? * b.as_f64()?)),
            },
            Self::BitAnd => Some(Value::Int(a.as_int()? & b.as_int()?)),
            Self::BitOr => Some(Value::Int(a.as_int()? | b.as_int()?)),
            Self::Gcd => Some(Value::Int(a.as_int()?.gcd(&b.as_int()?))),
            Self::Cmp => {
                let (fa, fb) = (a.as_f64()?, b.as_f64()?);
                let ord = fa.partial_cmp(&fb)?;
                Some(Value::Int(ord as i64))
            }
            Self::Pow => match (a, b) {
                (Value::Int(x), Value::Int(y)) => {
                    let exp = u32::try_from(*y).ok()?;
                    x.checked_pow(exp).map(Value::Int)
                }
                _ => {
                    let r = a.as_f64()?.powf(b.as_f64()?);
                    r.is_finite().then_some(Value::Float(r))
                }
            },
            Self::Round => {
                // Round to `b` decimal digits.
                let digits = i32::try_from(b.as_int()?).ok()?;
                if digits.abs() > 18 {
                    return None;
                }
                let scale = 10f64.powi(digits);
                let r = (a.as_f64()? * scale).round() / scale;
                r.is_finite().then_some(Value::Float(r))
            }
            Self::Div => match (a, b) {
                (Value::Int(x), Value::Int(y)) => {
                    if *y == 0 {
                        None
                    } else {
                        Some(Value::Int(x.div_floor(y)))
                    }
                }
                _ => {
                    let d = b.as_f64()?;
                    if d == 0.0 {
                        None
                    } else {
                        Some(Value::Float(a.as_f64()? / d))
                    }
                }
            },
            Self::Mod => match (a, b) {
                (Value::Int(x), Value::Int(y)) => {
                    if *y == 0 {
                        None
                    } else {
                        Some(Value::Int(x.mod_floor(y)))
                    }
                }
                _ => None,
            },
            Self::Shl | Self::Shr => {
                let x = a.as_int()?;
                let shift = u32::try_from(b.as_int()?).ok()?;
                if shift >= 63 {
                    return None;
                }
                if self == Self::Shl {
                    // checked_mul rather than a raw shift: shifting out high
                    // bits must reject the candidate, not wrap.
                    x.checked_mul(1i64 << shift).map(Value::Int)
                } else {
                    Some(Value::Int(x >> shift))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_pool_covers_abs_neg_not() {
        assert_eq!(UnaryFn::Abs.apply(&Value::Int(-4)), Some(Value::Int(4)));
        assert_eq!(UnaryFn::Neg.apply(&Value::Int(4)), Some(Value::Int(-4)));
        assert_eq!(UnaryFn::Not.apply(&Value::Int(0)), Some(Value::Int(-1)));
        assert_eq!(UnaryFn::Not.apply(&Value::Float(1.0)), None);
    }

    #[test]
    fn unary_failure_is_local() {
        assert_eq!(UnaryFn::Neg.apply(&Value::Int(i64::MIN)), None);
        assert_eq!(UnaryFn::Abs.apply(&Value::Missing), None);
    }

    #[test]
    fn floored_division_matches_mathematical_convention() {
        assert_eq!(BinaryFn::Div.apply(&Value::Int(-7), &Value::Int(2)), Some(Value::Int(-4)));
        assert_eq!(BinaryFn::Mod.apply(&Value::Int(-7), &Value::Int(2)), Some(Value::Int(1)));
        assert_eq!(BinaryFn::Div.apply(&Value::Int(1), &Value::Int(0)), None);
    }

    #[test]
    fn gcd_and_bitwise_are_integer_only() {
        assert_eq!(BinaryFn::Gcd.apply(&Value::Int(12), &Value::Int(18)), Some(Value::Int(6)));
        assert_eq!(BinaryFn::Gcd.apply(&Value::Float(12.0), &Value::Int(18)), None);
        assert_eq!(BinaryFn::BitAnd.apply(&Value::Int(6), &Value::Int(3)), Some(Value::Int(2)));
    }

    #[test]
    fn pow_rejects_negative_integer_exponents() {
        assert_eq!(BinaryFn::Pow.apply(&Value::Int(2), &Value::Int(10)), Some(Value::Int(1024)));
        assert_eq!(BinaryFn::Pow.apply(&Value::Int(2), &Value::Int(-1)), None);
    }

    #[test]
    fn min_max_return_an_operand() {
        assert_eq!(BinaryFn::Min.apply(&Value::Int(3), &Value::Int(5)), Some(Value::Int(3)));
        assert_eq!(BinaryFn::Max.apply(&Value::Int(3), &Value::Int(5)), Some(Value::Int(5)));
    }
}
