//! Linear-relationship fitting over two and three variables.
//!
//! Fits are computed in `f64` from a minimal set of samples and then checked
//! against every sample; any violation or degenerate denominator rejects the
//! candidate. Coefficients that are exactly integral print without a
//! fractional part.

use crate::value::format_coefficient;

/// Solves `y = a*x + b` from two samples. `None` when `x0 == x1`.
pub(crate) fn bi_linear(p0: (f64, f64), p1: (f64, f64)) -> Option<(f64, f64)> {
    let (x0, y0) = p0;
    let (x1, y1) = p1;
    if x0 == x1 {
        return None;
    }
    let a = (y1 - y0) / (x1 - x0);
    let b = (y0 * x1 - x0 * y1) / (x1 - x0);
    if a.is_finite() && b.is_finite() {
        Some((a, b))
    } else {
        None
    }
}

/// Fits `y = a*x + b` over all samples: seeds the fit from the first two
/// samples with distinct x, then verifies every sample.
pub(crate) fn fit_bi_linear(pairs: &[(f64, f64)]) -> Option<(f64, f64)> {
    if pairs.len() < 2 {
        return None;
    }
    let first = pairs[0];
    let second = pairs.iter().copied().find(|&(x, _)| x != first.0)?;
    let (a, b) = bi_linear(first, second)?;
    pairs
        .iter()
        .all(|&(x, y)| y == a * x + b)
        .then_some((a, b))
}

/// Solves `z = a*x + b*y + c` from three samples. `None` on any degenerate
/// denominator.
pub(crate) fn tri_linear(
    t1: (f64, f64, f64),
    t2: (f64, f64, f64),
    t3: (f64, f64, f64),
) -> Option<(f64, f64, f64)> {
    let (x1, y1, z1) = t1;
    let (x2, y2, z2) = t2;
    let (x3, y3, z3) = t3;

    if y2 == y3 || x2 == x3 {
        return None;
    }

    let y1323 = (y1 - y3) / (y2 - y3);
    let a_num = z3 - z1 + (z2 - z3) * y1323;
    let a_den = x3 - x1 + (x2 - x3) * y1323;

    let x1323 = (x1 - x3) / (x2 - x3);
    let b_num = z3 - z1 + (z2 - z3) * x1323;
    let b_den = y3 - y1 + (y2 - y3) * x1323;

    if a_den == 0.0 || b_den == 0.0 {
        return None;
    }

    let a = a_num / a_den;
    let b = b_num / b_den;
    let c = z3 - a * x3 - b * y3;
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return None;
    }

    // The fit must at least reproduce its own seed samples.
    for &(x, y, z) in &[t1, t2, t3] {
        if z != a * x + b * y + c {
            return None;
        }
    }
    Some((a, b, c))
}

/// Fits `z = a*x + b*y + c` over all samples, with the orientation given by
/// `perm`: indices into each triple selecting (x, y, z).
pub(crate) fn fit_tri_linear(triples: &[[f64; 3]], perm: [usize; 3]) -> Option<(f64, f64, f64)> {
    if triples.len() < 3 {
        return None;
    }
    let pick = |t: &[f64; 3]| (t[perm[0]], t[perm[1]], t[perm[2]]);
    let (a, b, c) = tri_linear(pick(&triples[0]), pick(&triples[1]), pick(&triples[2]))?;
    triples
        .iter()
        .all(|t| {
            let (x, y, z) = pick(t);
            z == a * x + b * y + c
        })
        .then_some((a, b, c))
}

/// Renders `y = a x + b`, simplifying unit coefficients and zero offsets.
pub(crate) fn render_bi_linear(y: &str, x: &str, a: f64, b: f64) -> String {
    if a == 1.0 {
        if b < 0.0 {
            format!("{y} = {x} - {}", format_coefficient(-b))
        } else {
            format!("{y} = {x} + {}", format_coefficient(b))
        }
    } else if b == 0.0 {
        format!("{y} = {} {x}", format_coefficient(a))
    } else if b < 0.0 {
        format!("{y} = {} {x} - {}", format_coefficient(a), format_coefficient(-b))
    } else {
        format!("{y} = {} {x} + {}", format_coefficient(a), format_coefficient(b))
    }
}

/// Renders `z = a x + b y + c`, omitting zero terms and unit coefficients.
pub(crate) fn render_tri_linear(coeffs: (f64, f64, f64), names: (&str, &str, &str)) -> String {
    let (a, b, c) = coeffs;
    let (x, y, z) = names;

    let mut rhs = String::new();
    if a == 1.0 {
        rhs.push_str(x);
    } else if a == -1.0 {
        rhs.push_str(&format!("- {x}"));
    } else if a != 0.0 {
        rhs.push_str(&format!("{} {x}", format_coefficient(a)));
    }
    if b != 0.0 {
        if !rhs.is_empty() {
            rhs.push_str(if b > 0.0 { " + " } else { " - " });
        } else if b < 0.0 {
            rhs.push_str("- ");
        }
        if b.abs() == 1.0 {
            rhs.push_str(y);
        } else {
            rhs.push_str(&format!("{} {y}", format_coefficient(b.abs())));
        }
    }
    if c > 0.0 {
        if !rhs.is_empty() {
            rhs.push_str(" + ");
        }
        rhs.push_str(&format_coefficient(c));
    } else if c < 0.0 {
        if !rhs.is_empty() {
            rhs.push_str(" - ");
        } else {
            rhs.push_str("- ");
        }
        rhs.push_str(&format_coefficient(-c));
    }
    if rhs.is_empty() {
        rhs.push('0');
    }
    format!("{z} = {rhs}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bi_linear_recovers_slope_and_offset() {
        assert_eq!(bi_linear((1.0, 3.0), (2.0, 5.0)), Some((2.0, 1.0)));
        assert_eq!(bi_linear((1.0, 3.0), (1.0, 5.0)), None);
    }

    #[test]
    fn fit_bi_linear_rejects_a_single_violation() {
        let good = [(1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        assert_eq!(fit_bi_linear(&good), Some((2.0, 1.0)));
        let bad = [(1.0, 3.0), (2.0, 5.0), (3.0, 8.0)];
        assert_eq!(fit_bi_linear(&bad), None);
    }

    #[test]
    fn fit_bi_linear_skips_leading_repeated_x() {
        // The seed must come from two samples with distinct x.
        let pairs = [(2.0, 5.0), (2.0, 5.0), (3.0, 7.0)];
        assert_eq!(fit_bi_linear(&pairs), Some((2.0, 1.0)));
    }

    #[test]
    fn tri_linear_known_solutions() {
        assert_eq!(tri_linear((1.0, 2.0, 1.0), (2.0, 1.0, 7.0), (3.0, 3.0, 7.0)), Some((4.0, -2.0, 1.0)));
        assert_eq!(tri_linear((1.0, 2.0, 6.0), (2.0, 1.0, -4.0), (3.0, 3.0, 7.0)), Some((-3.0, 7.0, -5.0)));
    }

    #[test]
    fn render_simplifies_units_and_zeros() {
        assert_eq!(render_bi_linear("y", "x", 1.0, 1.0), "y = x + 1");
        assert_eq!(render_bi_linear("y", "x", 1.0, -2.0), "y = x - 2");
        assert_eq!(render_bi_linear("y", "x", 2.0, 0.0), "y = 2 x");
        assert_eq!(render_bi_linear("y", "x", 2.0, 1.0), "y = 2 x + 1");
        assert_eq!(render_tri_linear((4.0, -2.0, 1.0), ("x", "y", "z")), "z = 4 x - 2 y + 1");
        assert_eq!(render_tri_linear((1.0, 1.0, 0.0), ("x", "y", "z")), "z = x + y");
        assert_eq!(render_tri_linear((0.0, 0.0, 0.0), ("x", "y", "z")), "z = 0");
    }
}
