//! C3 — Tolerance Enumerator.
//!
//! For each reconstruction label, decides which cells carrying a different
//! label could be relabeled to it without any of their voxels exceeding the
//! tolerance distance from the nearest voxel already carrying it. See
//! `spec.md` §4.3.

use ndarray::Array3;
use rayon::prelude::*;
use tracing::debug;

use crate::cell::Cells;
use crate::config::Config;
use crate::distance::DistanceField;
use crate::volume::{label_id, Volume};

/// Populates `cells.alternative_labels` (and extends `pm_gt`/`pm_rec`
/// accordingly) by computing one distance field per reconstruction label.
///
/// Per `spec.md` §5, the per-label distance transforms are independent and
/// computed in parallel; the resulting `(cell, label)` additions are
/// collected and applied to `cells` sequentially afterward so no cell is
/// written from two threads at once.
pub fn enumerate_tolerances(cells: &mut Cells, rec: &Volume, config: &Config) {
    let dim = rec.dim();
    let threshold_sq = config.tolerance_threshold_squared();
    let rec_labels: Vec<i64> = cells.rec_labels.iter().copied().collect();

    let additions: Vec<(usize, i64)> = rec_labels
        .par_iter()
        .flat_map_iter(|&r| {
            let mask = build_mask(rec, r, dim);
            let mut field = DistanceField::new(dim);
            field.recompute(&mask, config.pitch);

            cells
                .cells
                .iter()
                .enumerate()
                .filter(move |(_, cell)| cell.rec_label != r)
                .filter_map(move |(idx, cell)| {
                    let max_dist = cell
                        .locations
                        .iter()
                        .map(|&(z, y, x)| field.get(z, y, x))
                        .fold(0.0_f64, f64::max);
                    (max_dist < threshold_sq).then_some((idx, r))
                })
        })
        .collect();

    for (idx, alt_label) in additions {
        cells.cells[idx].alternative_labels.insert(alt_label);
        let gt_label = cells.cells[idx].gt_label;
        cells.pm_gt.entry(gt_label).or_default().insert(alt_label);
        cells.pm_rec.entry(alt_label).or_default().insert(gt_label);
    }

    debug!(
        additions = cells
            .cells
            .iter()
            .map(|c| c.alternative_labels.len())
            .sum::<usize>(),
        "enumerated tolerance alternatives"
    );
}

fn build_mask(rec: &Volume, label: i64, dim: (usize, usize, usize)) -> Array3<bool> {
    let (depth, height, width) = dim;
    Array3::from_shape_fn((depth, height, width), |(z, y, x)| {
        label_id(rec.get(z, y, x)) == label
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::extract_cells;
    use ndarray::Array3;

    fn volume_from(data: Vec<f64>, dim: (usize, usize, usize)) -> Volume {
        Volume::new(Array3::from_shape_vec(dim, data).unwrap())
    }

    #[test]
    fn tolerable_boundary_shift_gains_an_alternative() {
        // GT boundary at x=1, REC boundary at x=2, 4x1x1, pitch (1,1,1), T=2.
        let gt = volume_from(vec![1.0, 2.0, 2.0, 2.0], (1, 1, 4));
        let rec = volume_from(vec![1.0, 1.0, 2.0, 2.0], (1, 1, 4));
        let mut cells = extract_cells(&gt, &rec).unwrap();
        let config = Config {
            tolerance_distance_threshold: 2.0,
            pitch: (1.0, 1.0, 1.0),
            ..Config::default()
        };
        enumerate_tolerances(&mut cells, &rec, &config);

        // The (gt=1, rec=1) cell at x=1 should gain rec label 2 as an
        // alternative (it is within 1 voxel of the rec=2 region).
        let shifted_cell = cells
            .cells
            .iter()
            .find(|c| c.gt_label == 1 && c.rec_label == 1)
            .unwrap();
        assert!(shifted_cell.alternative_labels.contains(&2));
    }

    #[test]
    fn intolerable_boundary_shift_gains_no_alternative() {
        let gt = volume_from(vec![1.0, 2.0, 2.0, 2.0], (1, 1, 4));
        let rec = volume_from(vec![1.0, 1.0, 2.0, 2.0], (1, 1, 4));
        let mut cells = extract_cells(&gt, &rec).unwrap();
        let config = Config {
            tolerance_distance_threshold: 0.5,
            pitch: (1.0, 1.0, 1.0),
            ..Config::default()
        };
        enumerate_tolerances(&mut cells, &rec, &config);

        let shifted_cell = cells
            .cells
            .iter()
            .find(|c| c.gt_label == 1 && c.rec_label == 1)
            .unwrap();
        assert!(shifted_cell.alternative_labels.is_empty());
    }

    #[test]
    fn anisotropic_pitch_prevents_relabeling_across_z() {
        // GT is entirely label 1 across both z-slices; REC agrees on
        // z=0 but uses a different label on z=1. With pitch (1,1,10) the two
        // slices are 10nm apart, so a tolerance of 5nm must not offer either
        // rec label as an alternative to the other.
        let gt = volume_from(vec![1.0, 1.0], (2, 1, 1));
        let rec = volume_from(vec![1.0, 2.0], (2, 1, 1));
        let mut cells = extract_cells(&gt, &rec).unwrap();
        let config = Config {
            tolerance_distance_threshold: 5.0,
            pitch: (1.0, 1.0, 10.0),
            ..Config::default()
        };
        enumerate_tolerances(&mut cells, &rec, &config);

        assert!(cells.cells.iter().all(|c| c.alternative_labels.is_empty()));
    }
}
