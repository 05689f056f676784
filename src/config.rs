//! Evaluation configuration.

/// Physical voxel spacing `(px, py, pz)` in nanometers.
pub type Pitch = (f64, f64, f64);

/// Configuration for a single [`crate::evaluate`] call.
///
/// Defaults match `spec.md` §6: a 100nm tolerance and a `(1, 1, 10)` pitch,
/// i.e. an anisotropy typical of serial-section EM stacks where the section
/// thickness dwarfs in-plane resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum allowed boundary displacement, in nanometers.
    pub tolerance_distance_threshold: f64,
    /// Physical voxel spacing `(px, py, pz)`, in nanometers.
    pub pitch: Pitch,
    /// Ground-truth label marking background, if configured. The core ILP's
    /// "labels do not disappear" constraint (`spec.md` §4.4) only concerns
    /// reconstruction labels, so this has no effect on the solved
    /// assignment; it is carried on `Config` because `spec.md` §6 lists it
    /// as part of the external configuration surface, for a caller doing
    /// the peripheral false-positive/false-negative scoring `spec.md` §9
    /// describes as out of this crate's core contract.
    pub gt_background_label: Option<f64>,
    /// Reconstruction label exempted from the "labels do not disappear"
    /// constraint, if configured.
    pub rec_background_label: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance_distance_threshold: 100.0,
            pitch: (1.0, 1.0, 10.0),
            gt_background_label: None,
            rec_background_label: None,
        }
    }
}

impl Config {
    /// The squared tolerance threshold, in the same (nanometer) units as the
    /// pitch-weighted squared distance transform output. See `spec.md` §9:
    /// the source compares a raw (unsquared) distance transform output
    /// against an unsquared threshold, which this crate treats as a bug and
    /// corrects by squaring here.
    #[inline]
    #[must_use]
    pub(crate) fn tolerance_threshold_squared(&self) -> f64 {
        self.tolerance_distance_threshold * self.tolerance_distance_threshold
    }
}
