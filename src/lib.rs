//! Tolerant Edit Distance (TED): scores a volumetric reconstruction against
//! a ground-truth segmentation while allowing small boundary shifts up to a
//! physical distance tolerance.
//!
//! Unlike a strict voxel-wise comparison, TED finds the minimum-error
//! relabeling of the reconstruction that stays within tolerance and reports
//! the resulting number of splits and merges between matched label pairs.
//!
//! The crate is a pure function from two label volumes and a [`Config`] to
//! an [`Errors`] summary and a [`Volume`] corrected to the optimal
//! relabeling: image decoding, stack I/O, parameter wiring, and rendering of
//! split/merge/false-positive/false-negative location stacks are all
//! external to this crate.
//!
//! ## Usage
//!
//! ```
//! use tolerant_edit_distance::{evaluate, Config, Volume};
//! use ndarray::Array3;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ground_truth = Volume::new(Array3::from_elem((1, 2, 2), 1.0));
//! let reconstruction = Volume::new(Array3::from_elem((1, 2, 2), 1.0));
//!
//! let output = evaluate(&ground_truth, &reconstruction, &Config::default())?;
//! assert_eq!(output.errors.splits, 0);
//! assert_eq!(output.errors.merges, 0);
//! # Ok(())
//! # }
//! ```
#![forbid(
    absolute_paths_not_starting_with_crate,
    missing_docs,
    non_ascii_idents,
    noop_method_call,
    unsafe_code
)]
#![warn(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

pub mod cell;
pub mod config;
pub mod distance;
pub mod error;
pub mod ilp;
pub mod result;
pub mod solver;
pub mod tolerance;
pub mod volume;

pub use config::Config;
pub use error::TedError;
pub use result::{Errors, TedOutput};
pub use solver::{GoodLpSolver, MipSolver};
pub use volume::Volume;

/// Scores `reconstruction` against `ground_truth` under `config`, using the
/// default `good_lp`/`microlp` solver backend.
///
/// See [`evaluate_with_solver`] to supply a different [`MipSolver`].
pub fn evaluate(
    ground_truth: &Volume,
    reconstruction: &Volume,
    config: &Config,
) -> Result<TedOutput, TedError> {
    evaluate_with_solver(ground_truth, reconstruction, config, &GoodLpSolver)
}

/// Scores `reconstruction` against `ground_truth` under `config`, solving
/// the underlying ILP with a caller-supplied [`MipSolver`] (`spec.md`
/// §4.5's solver interface is pluggable).
///
/// Runs the full pipeline: cell extraction (C1), tolerance enumeration
/// (C3), ILP construction (C4), solving (C5), and result extraction (C6).
/// Empty volumes (no cells at all) short-circuit to a trivial zero-error
/// result without touching the solver, per `spec.md` §4.4's edge case.
pub fn evaluate_with_solver(
    ground_truth: &Volume,
    reconstruction: &Volume,
    config: &Config,
    solver: &dyn MipSolver,
) -> Result<TedOutput, TedError> {
    let mut cells = cell::extract_cells(ground_truth, reconstruction)?;

    if cells.cells.is_empty() {
        return Ok(TedOutput {
            errors: Errors {
                splits: 0,
                merges: 0,
                matches: Vec::new(),
            },
            corrected_reconstruction: reconstruction.clone(),
        });
    }

    tolerance::enumerate_tolerances(&mut cells, reconstruction, config);
    let problem = ilp::build_problem(&cells, config);
    let solution = solver.solve(&problem)?;
    result::extract_result(&cells, &problem, &solution, reconstruction.dim(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn empty_volume_short_circuits_to_zero_errors() {
        let ground_truth = Volume::new(Array3::from_shape_vec((0, 0, 0), Vec::new()).unwrap());
        let reconstruction = Volume::new(Array3::from_shape_vec((0, 0, 0), Vec::new()).unwrap());
        let output = evaluate(&ground_truth, &reconstruction, &Config::default()).unwrap();
        assert_eq!(output.errors.splits, 0);
        assert_eq!(output.errors.merges, 0);
        assert!(output.errors.matches.is_empty());
    }

    #[test]
    fn size_mismatch_is_reported_before_any_solving() {
        let ground_truth = Volume::new(Array3::from_elem((1, 2, 2), 1.0));
        let reconstruction = Volume::new(Array3::from_elem((1, 2, 3), 1.0));
        let err = evaluate(&ground_truth, &reconstruction, &Config::default()).unwrap_err();
        assert!(matches!(err, TedError::SizeMismatch { .. }));
    }
}
