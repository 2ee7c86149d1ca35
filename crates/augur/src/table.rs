//! Tabulation of value tuples per program point.
//!
//! The table maps each observed value tuple to its occurrence count. During
//! derivation every stored tuple is lengthened by the newly computed slots;
//! the table is rebuilt from a working vector rather than mutated while
//! iterating, and distinct old tuples whose extensions coincide are merged
//! by summing counts.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::value::Value;

/// A full value tuple: one slot per variable of the program point.
pub type Row = Vec<Value>;

/// Working representation during derivation: rows plus counts, in table
/// order, free to be extended in place.
pub type WorkingRows = Vec<(Row, u64)>;

/// Value-tuple occurrence counts with deterministic iteration order.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ValueTable {
    rows: IndexMap<Row, u64>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `row`, inserting it if new.
    pub fn accumulate(&mut self, row: Row) {
        self.accumulate_count(row, 1);
    }

    pub fn accumulate_count(&mut self, row: Row, count: u64) {
        *self.rows.entry(row).or_insert(0) += count;
    }

    /// Number of distinct tuples.
    pub fn distinct(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of occurrence counts.
    pub fn samples(&self) -> u64 {
        self.rows.values().sum()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&Row, u64)> {
        self.rows.iter().map(|(row, &count)| (row, count))
    }

    /// Moves the rows out for extension; pair with [`ValueTable::rebuild`].
    pub fn take_rows(&mut self) -> WorkingRows {
        std::mem::take(&mut self.rows).into_iter().collect()
    }

    /// Reinstalls extended rows, merging tuples that became identical.
    pub fn rebuild(&mut self, rows: WorkingRows) {
        debug_assert!(self.rows.is_empty());
        for (row, count) in rows {
            self.accumulate_count(row, count);
        }
    }

    /// Projects one column into value -> count.
    pub fn project1(&self, i: usize) -> AHashMap<Value, u64> {
        let mut out = AHashMap::new();
        for (row, count) in self.rows() {
            *out.entry(row[i].clone()).or_insert(0) += count;
        }
        out
    }

    /// Projects two columns into pair -> count.
    pub fn project2(&self, i: usize, j: usize) -> AHashMap<(Value, Value), u64> {
        let mut out = AHashMap::new();
        for (row, count) in self.rows() {
            *out.entry((row[i].clone(), row[j].clone())).or_insert(0) += count;
        }
        out
    }

    /// Projects three columns into triple -> count.
    pub fn project3(&self, i: usize, j: usize, k: usize) -> AHashMap<(Value, Value, Value), u64> {
        let mut out = AHashMap::new();
        for (row, count) in self.rows() {
            *out.entry((row[i].clone(), row[j].clone(), row[k].clone())).or_insert(0) += count;
        }
        out
    }

    /// Tabulates the elements of every sequence stored in column `i`,
    /// weighting each element by its tuple's occurrence count. Missing
    /// sequences and empty sequences contribute nothing.
    pub fn element_counts(&self, i: usize) -> AHashMap<Value, u64> {
        let mut out = AHashMap::new();
        for (row, count) in self.rows() {
            if let Value::Seq(elems) = &row[i] {
                for elem in elems {
                    *out.entry(elem.clone()).or_insert(0) += count;
                }
            }
        }
        out
    }
}
