//! augur: a dynamic likely-invariant detector.
//!
//! augur consumes execution traces that record, at each program point, the
//! values of in-scope variables across many invocations, and infers likely
//! invariants: relations that held over every observed sample, such as
//! equalities, ranges, linear relationships, modular constraints,
//! orderings, membership, and sub-sequence relations.
//!
//! The engine alternates between inferring invariants over the current
//! variables and deriving new variables from them (sizes, aggregates,
//! elements, prefix slices), to a fixpoint. Equality classes discovered
//! along the way keep the combinatorics in check: only the canonical
//! member of each class seeds further derivation and pairwise inference.
//!
//! ```no_run
//! use augur::{Detector, EngineConfig};
//!
//! let mut detector = Detector::new(EngineConfig::default());
//! detector.read_files(&["trace.dtrace"], None)?;
//! detector.infer();
//! print!("{}", detector.render_report(false));
//! # Ok::<(), augur::ReadError>(())
//! ```

mod config;
mod derive;
mod detector;
mod engine;
mod invariants;
mod point;
mod report;
mod stats;
mod table;
mod trace;
mod value;
mod varinfo;

pub use crate::{
    config::EngineConfig,
    detector::{compile_selection, Detector},
    engine::{clear_point_invariants, infer_point},
    invariants::{
        BaseInvariant, BinaryFn, Comparison, Invariant, OneOfEntry, Rendered, ScalarInvariant,
        ScalarSequenceInvariant, SequenceInvariant, ThreeScalarInvariant, TwoScalarInvariant,
        TwoSequenceInvariant, UnaryFn,
    },
    point::ProgramPoint,
    stats::{EngineStats, PointStats},
    table::{Row, ValueTable},
    trace::{ReadError, ReadResult},
    value::Value,
    varinfo::{LenSource, VarInfo, VarKind},
};
