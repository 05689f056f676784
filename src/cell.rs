//! C1 — Cell Extractor.
//!
//! Partitions the paired ground-truth/reconstruction volumes into maximal
//! regions of constant `(recLabel, gtLabel)` and seeds the possible-match
//! sets. See `spec.md` §4.1.

use std::collections::BTreeSet;

use fxhash::FxHashMap;
use tracing::debug;

use crate::error::TedError;
use crate::volume::{label_id, Volume};

/// A voxel coordinate, `(z, y, x)`.
pub type Coord = (usize, usize, usize);

/// The atomic region of joint `(gtLabel, recLabel)` constancy.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Ground-truth label of every voxel in this cell.
    pub gt_label: i64,
    /// Reconstruction label of every voxel in this cell; immutable — the
    /// cell's *default* assignment, always available as a fallback.
    pub rec_label: i64,
    /// Every voxel in this cell. Never empty.
    pub locations: Vec<Coord>,
    /// Reconstruction labels, other than `rec_label`, that this cell could be
    /// relabeled to without exceeding the tolerance. Populated by C3 (see
    /// `tolerance.rs`); always excludes `rec_label`.
    pub alternative_labels: BTreeSet<i64>,
}

/// The cell collection and possible-match sets produced by C1, consumed by
/// C3 and C4.
#[derive(Debug, Default)]
pub struct Cells {
    /// All extracted cells, in first-touch (z, y, x scan) order.
    pub cells: Vec<Cell>,
    /// `gtLabel -> set<recLabel>`, the symmetric possible-match mapping.
    pub pm_gt: FxHashMap<i64, BTreeSet<i64>>,
    /// `recLabel -> set<gtLabel>`, the symmetric possible-match mapping.
    pub pm_rec: FxHashMap<i64, BTreeSet<i64>>,
    /// Every ground-truth label observed in the input, ascending.
    pub gt_labels: BTreeSet<i64>,
    /// Every reconstruction label observed in the input, ascending.
    pub rec_labels: BTreeSet<i64>,
    by_rec: FxHashMap<i64, Vec<usize>>,
}

impl Cells {
    /// Cell indices whose reconstruction label is `r`, ordered by ascending
    /// `gtLabel` for deterministic ILP variable indexing (`spec.md` §5).
    #[must_use]
    pub fn cells_for_rec(&self, r: i64) -> &[usize] {
        static EMPTY: Vec<usize> = Vec::new();
        self.by_rec.get(&r).unwrap_or(&EMPTY)
    }

    fn finalize_ordering(&mut self) {
        for (_, idxs) in self.by_rec.iter_mut() {
            idxs.sort_unstable_by_key(|&i| self.cells[i].gt_label);
        }
    }
}

/// Partitions `gt` and `rec` into cells keyed by `(recLabel, gtLabel)`.
///
/// Fails with [`TedError::SizeMismatch`] when the volumes' dimensions
/// differ.
pub fn extract_cells(gt: &Volume, rec: &Volume) -> Result<Cells, TedError> {
    gt.assert_same_shape(rec)?;
    let (depth, height, width) = gt.dim();

    let mut cells = Cells::default();
    let mut index: FxHashMap<(i64, i64), usize> = FxHashMap::default();

    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                let g = label_id(gt.get(z, y, x));
                let r = label_id(rec.get(z, y, x));

                let cell_idx = match index.get(&(r, g)) {
                    Some(&idx) => idx,
                    None => {
                        let idx = cells.cells.len();
                        cells.cells.push(Cell {
                            gt_label: g,
                            rec_label: r,
                            locations: Vec::new(),
                            alternative_labels: BTreeSet::new(),
                        });
                        index.insert((r, g), idx);
                        cells.by_rec.entry(r).or_default().push(idx);
                        cells.pm_gt.entry(g).or_default().insert(r);
                        cells.pm_rec.entry(r).or_default().insert(g);
                        cells.gt_labels.insert(g);
                        cells.rec_labels.insert(r);
                        idx
                    }
                };
                cells.cells[cell_idx].locations.push((z, y, x));
            }
        }
    }

    cells.finalize_ordering();

    debug!(
        cell_count = cells.cells.len(),
        gt_label_count = cells.gt_labels.len(),
        rec_label_count = cells.rec_labels.len(),
        "extracted cells"
    );

    Ok(cells)
}
