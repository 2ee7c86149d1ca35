//! The detector facade: trace ingestion, inference, and reporting over a
//! set of program points.

use std::{
    collections::BTreeMap,
    path::Path,
    time::Instant,
};

use ahash::{AHashMap, AHashSet};
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::{
    config::EngineConfig,
    engine,
    point::ProgramPoint,
    stats::{EngineStats, PointStats},
    trace::{
        is_sequence_param, parse_binding, parse_label, strip_sequence_suffix, Label, LabelKind, ReadError,
        ReadResult,
    },
    value::Value,
    varinfo::VarKind,
};

/// Compiles a program-point selection pattern; matching is
/// case-insensitive and applies anywhere in the label.
pub fn compile_selection(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Holds every program point read so far, plus the per-function state the
/// reader needs: declared parameter lists, invocation counters, and the
/// stack of `BEGIN` parameter snapshots that backs `_orig` variables.
#[derive(Debug, Default)]
pub struct Detector {
    config: EngineConfig,
    points: BTreeMap<String, ProgramPoint>,
    /// Function tag -> declared parameter names (raw, `[]` suffixes kept).
    func_params: AHashMap<String, Vec<String>>,
    /// Function tag -> invocation count. Sorted so the injected
    /// `calls(F)` columns have a deterministic order.
    call_counts: BTreeMap<String, u64>,
    /// Function tag -> stack of parameter snapshots; one entry per
    /// in-flight invocation, so recursion pops in the right order.
    orig_stack: AHashMap<String, Vec<AHashMap<String, Value>>>,
    stats: Option<EngineStats>,
}

impl Detector {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn points(&self) -> impl Iterator<Item = &ProgramPoint> {
        self.points.values()
    }

    pub fn point(&self, name: &str) -> Option<&ProgramPoint> {
        self.points.get(name)
    }

    /// Reads and merges several trace files. Counts for identical tuples
    /// sum across files; a program point recorded with differing variable
    /// names in any two places is fatal.
    pub fn read_files<P: AsRef<Path>>(&mut self, paths: &[P], selection: Option<&Regex>) -> ReadResult<()> {
        let mut contents = Vec::with_capacity(paths.len());
        for path in paths {
            let path_text = path.as_ref().display().to_string();
            let text = std::fs::read_to_string(path.as_ref()).map_err(|source| ReadError::Io {
                path: path_text.clone(),
                source,
            })?;
            contents.push((path_text, text));
        }
        if self.config.invocation_counts {
            // Every record carries one calls(F) slot per known function,
            // so all function tags must be registered up front.
            for (_, text) in &contents {
                self.scan_labels(text, selection);
            }
        }
        for (path, text) in &contents {
            self.read_str(path, text, selection)?;
        }
        Ok(())
    }

    /// Registers the function tags and parameter lists of every label in
    /// `text` without reading any values.
    fn scan_labels(&mut self, text: &str, selection: Option<&Regex>) {
        for line in text.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() || line.contains('\t') {
                continue;
            }
            if selection.is_some_and(|re| !re.is_match(line)) {
                continue;
            }
            let label = parse_label(line);
            self.call_counts.entry(label.func.clone()).or_insert(0);
            self.func_params.entry(label.func).or_insert(label.params);
        }
    }

    /// Reads one trace from text. `path` is used for error reporting only.
    pub fn read_str(&mut self, path: &str, text: &str, selection: Option<&Regex>) -> ReadResult<()> {
        debug!("reading trace {path}");
        // Invocation counts restart per file.
        for count in self.call_counts.values_mut() {
            *count = 0;
        }

        let mut lines = text.lines().enumerate().peekable();
        while let Some((index, raw_line)) = lines.next() {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            if line.trim().is_empty() {
                continue;
            }
            if line.contains('\t') {
                return Err(ReadError::TabInLabel {
                    path: path.to_owned(),
                    line: index + 1,
                });
            }

            // Gather this record's value lines whether or not the label is
            // selected; an unselected record must still be consumed.
            let mut value_lines: Vec<(usize, &str)> = Vec::new();
            while let Some(&(next_index, next_line)) = lines.peek() {
                if next_line.contains('\t') {
                    value_lines.push((next_index, next_line.strip_suffix('\r').unwrap_or(next_line)));
                    lines.next();
                } else {
                    break;
                }
            }
            if selection.is_some_and(|re| !re.is_match(line)) {
                continue;
            }

            self.read_record(path, line, &value_lines)?;
        }
        Ok(())
    }

    fn read_record(&mut self, path: &str, label_line: &str, value_lines: &[(usize, &str)]) -> ReadResult<()> {
        let label = parse_label(label_line);
        if label.kind == LabelKind::Begin {
            *self.call_counts.entry(label.func.clone()).or_insert(0) += 1;
        }
        self.func_params
            .entry(label.func.clone())
            .or_insert_with(|| label.params.clone());

        let mut names: Vec<String> = Vec::with_capacity(value_lines.len());
        let mut kinds: Vec<VarKind> = Vec::with_capacity(value_lines.len());
        let mut values: Vec<Value> = Vec::with_capacity(value_lines.len());
        // Raw names (with `[]`) paired with values, for parameter snapshots.
        let mut raw_bindings: Vec<(&str, Value)> = Vec::with_capacity(value_lines.len());

        for &(index, value_line) in value_lines {
            let Some((raw_name, raw_value)) = value_line.split_once('\t') else {
                continue;
            };
            let Some((name, kind, value)) = parse_binding(raw_name, raw_value) else {
                return Err(ReadError::UnparseableValue {
                    path: path.to_owned(),
                    line: index + 1,
                    token: raw_value.to_owned(),
                });
            };
            raw_bindings.push((raw_name, value.clone()));
            names.push(name);
            kinds.push(kind);
            values.push(value);
        }

        if self.config.invocation_counts {
            for (func, &count) in &self.call_counts {
                names.push(format!("calls({func})"));
                kinds.push(VarKind::Scalar);
                values.push(Value::Int(count as i64));
            }
        }

        match label.kind {
            LabelKind::Begin => self.push_orig_snapshot(&label, &raw_bindings),
            LabelKind::End => self.pop_orig_snapshot(&label, &mut names, &mut kinds, &mut values),
            LabelKind::Other => {}
        }

        let point = self
            .points
            .entry(label_line.to_owned())
            .or_insert_with(|| ProgramPoint::new(label_line.to_owned()));
        if point.samples == 0 {
            for (name, kind) in names.iter().zip(&kinds) {
                point.add_variable(name.clone(), *kind, false);
            }
        } else {
            let observed: Vec<&str> = point
                .vars
                .iter()
                .filter(|vi| !vi.is_derived)
                .map(|vi| vi.name.as_str())
                .collect();
            if observed != names.iter().map(String::as_str).collect::<Vec<_>>() {
                return Err(ReadError::InconsistentSchema {
                    point: label_line.to_owned(),
                });
            }
        }
        point.table.accumulate(values);
        point.samples += 1;
        Ok(())
    }

    /// On `BEGIN`: snapshot the values of the declared parameters so the
    /// matching `END` can expose them as `_orig` variables.
    fn push_orig_snapshot(&mut self, label: &Label, raw_bindings: &[(&str, Value)]) {
        let Some(params) = self.func_params.get(&label.func) else {
            return;
        };
        let snapshot: AHashMap<String, Value> = params
            .iter()
            .filter_map(|param| {
                raw_bindings
                    .iter()
                    .find(|(name, _)| *name == param.as_str())
                    .map(|(_, value)| (param.clone(), value.clone()))
            })
            .collect();
        self.orig_stack.entry(label.func.clone()).or_default().push(snapshot);
    }

    /// On `END`: pop the innermost snapshot and append one `_orig`
    /// variable per declared parameter. A parameter that never appeared at
    /// `BEGIN` contributes a missing value.
    fn pop_orig_snapshot(
        &mut self,
        label: &Label,
        names: &mut Vec<String>,
        kinds: &mut Vec<VarKind>,
        values: &mut Vec<Value>,
    ) {
        let snapshot = self
            .orig_stack
            .get_mut(&label.func)
            .and_then(Vec::pop)
            .unwrap_or_default();
        let Some(params) = self.func_params.get(&label.func) else {
            return;
        };
        for param in params {
            let kind = if is_sequence_param(param) {
                VarKind::Sequence
            } else {
                VarKind::Scalar
            };
            names.push(format!("{}_orig", strip_sequence_suffix(param)));
            kinds.push(kind);
            values.push(snapshot.get(param).cloned().unwrap_or(Value::Missing));
        }
    }

    /// Runs the inference fixpoint over every program point, in name
    /// order, collecting statistics when configured.
    pub fn infer(&mut self) {
        let engine_start = Instant::now();
        let mut stats = self.config.collect_stats.then(EngineStats::default);

        if let Some(stats) = &mut stats {
            let globals = self.global_var_names();
            for (name, point) in &self.points {
                let func = parse_label(name).func;
                let params: AHashSet<String> = self
                    .func_params
                    .get(&func)
                    .map(|ps| ps.iter().map(|p| strip_sequence_suffix(p).to_owned()).collect())
                    .unwrap_or_default();
                let mut point_stats = PointStats::default();
                point_stats.collect_pre(point, &params, &globals);
                stats.points.insert(name.clone(), point_stats);
            }
        }

        for (name, point) in &mut self.points {
            let start = Instant::now();
            engine::infer_point(point, &self.config);
            if let Some(stats) = &mut stats {
                let entry = stats.points.entry(name.clone()).or_default();
                entry.elapsed = start.elapsed();
                entry.collect_post(point);
            }
        }

        if let Some(mut stats) = stats {
            stats.engine_elapsed = engine_start.elapsed();
            self.stats = Some(stats);
        }
    }

    /// Wipes invariant state everywhere without touching variables or
    /// values; a subsequent [`Detector::infer`] reproduces it.
    pub fn clear_invariants(&mut self) {
        for point in self.points.values_mut() {
            engine::clear_point_invariants(point);
        }
    }

    /// Discards all ingested data and statistics.
    pub fn clear(&mut self) {
        self.points.clear();
        self.func_params.clear();
        self.call_counts.clear();
        self.orig_stack.clear();
        self.stats = None;
    }

    /// Observed variable names present at every program point.
    fn global_var_names(&self) -> AHashSet<String> {
        let mut points = self.points.values();
        let Some(first) = points.next() else {
            return AHashSet::new();
        };
        let mut globals: AHashSet<String> = first
            .vars
            .iter()
            .filter(|vi| !vi.is_derived)
            .map(|vi| vi.name.clone())
            .collect();
        for point in points {
            let names: AHashSet<&str> = point.vars.iter().map(|vi| vi.name.as_str()).collect();
            globals.retain(|name| names.contains(name.as_str()));
        }
        globals
    }

    /// Renders the full report, grouped by program point in name order.
    pub fn render_report(&self, print_unconstrained: bool) -> String {
        let mut out = String::new();
        for point in self.points.values() {
            crate::report::render_point(point, print_unconstrained, &mut out);
        }
        out
    }

    pub fn stats(&self) -> Option<&EngineStats> {
        self.stats.as_ref()
    }

    pub fn render_stats(&self) -> Option<String> {
        self.stats.as_ref().map(|stats| stats.render(&self.config))
    }

    /// Statistics as JSON, for machine consumption.
    pub fn stats_json(&self) -> Option<String> {
        self.stats
            .as_ref()
            .and_then(|stats| serde_json::to_string_pretty(stats).ok())
    }
}
