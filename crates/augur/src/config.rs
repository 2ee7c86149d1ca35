//! Engine tuning knobs.

/// Configuration for the inference engine.
///
/// The defaults match the historical behavior of the detector: no ternary
/// invariants, no invocation-count variables, statistics collection on.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Infer invariants over triples of variables. Off by default; the
    /// triple space grows cubically with the variable count.
    pub ternary_invariants: bool,
    /// Inject one `calls(F)` scalar variable per traced function into every
    /// record, so invariants can relate values to invocation counts.
    pub invocation_counts: bool,
    /// Record per-point shape counters and timings during inference.
    pub collect_stats: bool,
    /// Confidence level for negative invariants (nonzero, nonmodulus,
    /// nonequal): the property is reported only when the chance of it
    /// holding accidentally is below this value.
    pub negative_invariant_confidence: f64,
    /// Maximum distinct-value count for which an enumerated `one_of` set is
    /// retained on an invariant.
    pub one_of_threshold: usize,
    /// Strict nonmodulus filtering: report an avoided residue class only
    /// when every other residue class mod the same base was observed.
    pub nonmodulus_strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ternary_invariants: false,
            invocation_counts: false,
            collect_stats: true,
            negative_invariant_confidence: 0.01,
            one_of_threshold: 5,
            nonmodulus_strict: true,
        }
    }
}
