//! Per-point shape counters and timings for the inference engine.

use std::{collections::BTreeMap, fmt::Write, time::Duration};

use ahash::AHashSet;
use log::warn;

use crate::{config::EngineConfig, point::ProgramPoint, varinfo::VarKind};

/// Counters for one program point.
///
/// The `orig_*` fields are collected from the observed variables before
/// any derivation; the totals afterwards, so the difference is the number
/// of derived variables.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PointStats {
    pub orig_scalar_params: u32,
    pub orig_scalar_locals: u32,
    pub orig_scalar_globals: u32,
    pub orig_seq_params: u32,
    pub orig_seq_locals: u32,
    pub orig_seq_globals: u32,
    pub total_scalars: u32,
    pub total_sequences: u32,
    pub samples: u64,
    /// Sum of distinct-value counts over all singleton invariants.
    pub single_values: u64,
    /// Number of pairwise invariants stored.
    pub pair_invariants: u64,
    /// Sum of distinct-tuple counts over all pairwise invariants.
    pub pair_values: u64,
    pub elapsed: Duration,
}

impl PointStats {
    /// Classifies the observed variables of `point` before derivation.
    /// `_orig` snapshots are neither parameters nor locals and are skipped.
    pub(crate) fn collect_pre(
        &mut self,
        point: &ProgramPoint,
        params: &AHashSet<String>,
        globals: &AHashSet<String>,
    ) {
        for vi in &point.vars {
            if vi.is_derived || vi.name.contains("_orig") {
                continue;
            }
            let slot = match (vi.kind, params.contains(&vi.name), globals.contains(&vi.name)) {
                (VarKind::Sequence, true, _) => &mut self.orig_seq_params,
                (VarKind::Sequence, false, true) => &mut self.orig_seq_globals,
                (VarKind::Sequence, false, false) => &mut self.orig_seq_locals,
                (VarKind::Scalar, true, _) => &mut self.orig_scalar_params,
                (VarKind::Scalar, false, true) => &mut self.orig_scalar_globals,
                (VarKind::Scalar, false, false) => &mut self.orig_scalar_locals,
            };
            *slot += 1;
        }
    }

    /// Totals over the fully derived and inferred point.
    pub(crate) fn collect_post(&mut self, point: &ProgramPoint) {
        self.samples = point.samples;
        self.total_scalars = 0;
        self.total_sequences = 0;
        self.single_values = 0;
        self.pair_invariants = 0;
        self.pair_values = 0;
        for vi in &point.vars {
            match vi.kind {
                VarKind::Scalar => self.total_scalars += 1,
                VarKind::Sequence => self.total_sequences += 1,
            }
            match vi.invariant.as_ref() {
                Some(inv) => self.single_values += inv.base().distinct as u64,
                None => warn!("no invariant for variable {} at {}", vi.name, point.name),
            }
            // Pair invariants are stored once, on the lower-indexed side,
            // so this sum never double-counts.
            for inv in vi.pair_invariants.values() {
                self.pair_invariants += 1;
                self.pair_values += inv.base().distinct as u64;
            }
        }
    }

    fn orig_scalars(&self) -> u32 {
        self.orig_scalar_params + self.orig_scalar_locals + self.orig_scalar_globals
    }

    fn orig_sequences(&self) -> u32 {
        self.orig_seq_params + self.orig_seq_locals + self.orig_seq_globals
    }

    fn render(&self, out: &mut String) {
        let secs = self.elapsed.as_secs_f64();
        let total_vars = u64::from(self.total_scalars + self.total_sequences);
        let _ = writeln!(out, "    Wall time (secs):                      {secs:.6}");
        let _ = writeln!(out, "    Total number of scalars:               {}", self.total_scalars);
        let _ = writeln!(out, "    Total number of sequences:             {}", self.total_sequences);
        let _ = writeln!(
            out,
            "    Total number of invariants checked:    {}",
            total_vars + self.pair_invariants
        );
        let _ = writeln!(out, "    Total number of samples:               {}", self.samples);
        let _ = writeln!(out, "    Total number of individual values:     {}", self.single_values);
        if total_vars != 0 {
            let _ = writeln!(
                out,
                "    Average number of individual values:   {:.3}",
                self.single_values as f64 / total_vars as f64
            );
        }
        let _ = writeln!(out, "    Total number of pairs of values:       {}", self.pair_values);
        if self.pair_invariants != 0 {
            let _ = writeln!(
                out,
                "    Average number of pairs of values:     {:.3}",
                self.pair_values as f64 / self.pair_invariants as f64
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "    Original number scalar parameters:     {}", self.orig_scalar_params);
        let _ = writeln!(out, "    Original number scalar locals:         {}", self.orig_scalar_locals);
        let _ = writeln!(out, "    Original number scalar globals:        {}", self.orig_scalar_globals);
        let _ = writeln!(out, "    Total original number scalars:         {}", self.orig_scalars());
        let _ = writeln!(out, "    Original number sequence parameters:   {}", self.orig_seq_params);
        let _ = writeln!(out, "    Original number sequence locals:       {}", self.orig_seq_locals);
        let _ = writeln!(out, "    Original number sequence globals:      {}", self.orig_seq_globals);
        let _ = writeln!(out, "    Total original number sequences:       {}", self.orig_sequences());
        let _ = writeln!(
            out,
            "    Derived number of scalars:             {}",
            self.total_scalars.saturating_sub(self.orig_scalars())
        );
        let _ = writeln!(
            out,
            "    Derived number of sequences:           {}",
            self.total_sequences.saturating_sub(self.orig_sequences())
        );
    }
}

/// Statistics for a whole inference run.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EngineStats {
    pub engine_elapsed: Duration,
    pub points: BTreeMap<String, PointStats>,
}

impl EngineStats {
    pub fn render(&self, config: &EngineConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Invariant Engine Stats");
        let _ = writeln!(
            out,
            "Configuration: invocation_counts: {}, ternary_invariants: {}",
            config.invocation_counts, config.ternary_invariants
        );
        let _ = writeln!(out, "Wall time in secs: {:.6}", self.engine_elapsed.as_secs_f64());
        for (name, stats) in &self.points {
            let _ = writeln!(out, "{}", "=".repeat(75));
            let _ = writeln!(out, "{name}");
            stats.render(&mut out);
        }
        out
    }
}
