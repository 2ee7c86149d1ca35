//! Invariants over a triple of scalar variables.

use ahash::AHashMap;

use super::linear::{fit_tri_linear, render_tri_linear};
use super::{BaseInvariant, BinaryFn, Rendered, ASYMMETRIC_BINARY_POOL, SYMMETRIC_BINARY_POOL};
use crate::{config::EngineConfig, value::Value};

/// Fewer distinct samples than this make any ternary fit meaningless; the
/// enumerated `one_of` set already says everything.
const MIN_DISTINCT_FOR_FITS: usize = 5;

/// Linear planes and binary-function fits over (x, y, z).
///
/// The six function lists cover every argument ordering; the symmetric
/// pool members appear only in the orderings where the first argument is
/// the preferred one.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ThreeScalarInvariant {
    pub base: BaseInvariant,
    /// z = a*x + b*y + c.
    pub linear_z: Option<(f64, f64, f64)>,
    /// y = a*x + b*z + c.
    pub linear_y: Option<(f64, f64, f64)>,
    /// x = a*y + b*z + c.
    pub linear_x: Option<(f64, f64, f64)>,
    pub functions_xyz: Vec<BinaryFn>,
    pub functions_yxz: Vec<BinaryFn>,
    pub functions_xzy: Vec<BinaryFn>,
    pub functions_zxy: Vec<BinaryFn>,
    pub functions_yzx: Vec<BinaryFn>,
    pub functions_zyx: Vec<BinaryFn>,
}

impl ThreeScalarInvariant {
    pub(crate) fn infer(counts: &AHashMap<(Value, Value, Value), u64>, config: &EngineConfig) -> Self {
        let base = BaseInvariant::from_counts3(counts, config.one_of_threshold);

        let mut triples: Vec<&(Value, Value, Value)> = counts.keys().collect();
        triples.sort();

        let mut inv = Self {
            base,
            linear_z: None,
            linear_y: None,
            linear_x: None,
            functions_xyz: Vec::new(),
            functions_yxz: Vec::new(),
            functions_xzy: Vec::new(),
            functions_zxy: Vec::new(),
            functions_yzx: Vec::new(),
            functions_zyx: Vec::new(),
        };
        if triples.len() <= MIN_DISTINCT_FOR_FITS - 1 {
            return inv;
        }

        if let Some(numeric) = triples
            .iter()
            .map(|(x, y, z)| Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]))
            .collect::<Option<Vec<[f64; 3]>>>()
        {
            inv.linear_z = fit_tri_linear(&numeric, [0, 1, 2]);
            inv.linear_y = fit_tri_linear(&numeric, [0, 2, 1]);
            inv.linear_x = fit_tri_linear(&numeric, [1, 2, 0]);
        }

        let full: Vec<BinaryFn> = SYMMETRIC_BINARY_POOL
            .into_iter()
            .chain(ASYMMETRIC_BINARY_POOL)
            .collect();
        let asym: Vec<BinaryFn> = ASYMMETRIC_BINARY_POOL.to_vec();

        let survivors = |pool: &[BinaryFn], pick: fn(&(Value, Value, Value)) -> (&Value, &Value, &Value)| {
            pool.iter()
                .copied()
                .filter(|f| {
                    triples.iter().all(|t| {
                        let (a, b, out) = pick(t);
                        f.apply(a, b).as_ref() == Some(out)
                    })
                })
                .collect::<Vec<BinaryFn>>()
        };

        inv.functions_xyz = survivors(&full, |(x, y, z)| (x, y, z));
        inv.functions_yxz = survivors(&asym, |(x, y, z)| (y, x, z));
        inv.functions_xzy = survivors(&full, |(x, y, z)| (x, z, y));
        inv.functions_zxy = survivors(&asym, |(x, y, z)| (z, x, y));
        inv.functions_yzx = survivors(&full, |(x, y, z)| (y, z, x));
        inv.functions_zyx = survivors(&asym, |(x, y, z)| (z, y, x));
        inv
    }

    pub fn is_exact(&self) -> bool {
        self.base.is_exact() || self.linear_z.is_some() || self.linear_y.is_some() || self.linear_x.is_some()
    }

    pub(crate) fn render(&self, x: &str, y: &str, z: &str) -> Rendered {
        if let Some(text) = self.base.render_prefix(&format!("({x}, {y}, {z})")) {
            return Rendered::constrained(text);
        }
        let suffix = self.base.suffix();

        let mut parts: Vec<String> = Vec::new();
        if let Some(coeffs) = self.linear_z {
            parts.push(render_tri_linear(coeffs, (x, y, z)));
        }
        if let Some(coeffs) = self.linear_y {
            parts.push(render_tri_linear(coeffs, (x, z, y)));
        }
        if let Some(coeffs) = self.linear_x {
            parts.push(render_tri_linear(coeffs, (y, z, x)));
        }
        if !parts.is_empty() {
            return Rendered::constrained(format!("{}{suffix}", parts.join(" and ")));
        }

        for (pool, a, b, out) in [
            (&self.functions_xyz, x, y, z),
            (&self.functions_yxz, y, x, z),
            (&self.functions_xzy, x, z, y),
            (&self.functions_zxy, z, x, y),
            (&self.functions_yzx, y, z, x),
            (&self.functions_zyx, z, y, x),
        ] {
            for f in pool {
                parts.push(format!("{out} = {f}({a}, {b})"));
            }
        }
        if !parts.is_empty() {
            return Rendered::constrained(format!("{}{suffix}", parts.join(" and ")));
        }

        Rendered::unconstrained(format!("({x}, {y}, {z}) unconstrained{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(raw: &[(i64, i64, i64)]) -> ThreeScalarInvariant {
        let counts: AHashMap<(Value, Value, Value), u64> = raw
            .iter()
            .map(|&(x, y, z)| ((Value::Int(x), Value::Int(y), Value::Int(z)), 1))
            .collect();
        ThreeScalarInvariant::infer(&counts, &EngineConfig::default())
    }

    #[test]
    fn plane_fit_in_all_orientations() {
        // z = 2x + 3y + 1 over six distinct samples.
        let samples: Vec<(i64, i64, i64)> = (0..6).map(|i| (i, i * i, 2 * i + 3 * i * i + 1)).collect();
        let inv = infer(&samples);
        assert_eq!(inv.linear_z, Some((2.0, 3.0, 1.0)));
        assert!(inv.is_exact());
    }

    #[test]
    fn too_few_distinct_samples_fit_nothing() {
        let inv = infer(&[(1, 2, 3), (4, 5, 6), (7, 8, 9), (10, 11, 12)]);
        assert_eq!(inv.linear_z, None);
        assert!(inv.functions_xyz.is_empty());
    }

    #[test]
    fn binary_function_fit_finds_min() {
        let samples: Vec<(i64, i64, i64)> = vec![(1, 5, 1), (7, 2, 2), (3, 3, 3), (9, 4, 4), (0, 8, 0), (6, 1, 1)];
        let inv = infer(&samples);
        assert!(inv.functions_xyz.contains(&BinaryFn::Min), "z = min(x, y)");
        assert!(!inv.functions_xyz.contains(&BinaryFn::Max));
    }
}
