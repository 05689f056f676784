//! The label volume data model.

use ndarray::Array3;

use crate::error::TedError;

/// A 3-D stack of label images, `(depth, height, width)`, with real-valued
/// (float) labels to match legacy stack formats. Labels are integers in
/// practice; see [`label_id`] for how this crate keys them.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f64>,
}

impl Volume {
    /// Build a volume from pre-shaped label data.
    #[must_use]
    pub fn new(data: Array3<f64>) -> Self {
        Self { data }
    }

    /// Build a volume from a flat row-major buffer and explicit dimensions.
    ///
    /// Returns [`TedError::InvalidConfig`] if `buffer.len() != depth * height
    /// * width`.
    pub fn from_flat(
        depth: usize,
        height: usize,
        width: usize,
        buffer: Vec<f64>,
    ) -> Result<Self, TedError> {
        let data = Array3::from_shape_vec((depth, height, width), buffer)
            .map_err(|_| TedError::InvalidConfig("buffer length does not match dimensions"))?;
        Ok(Self { data })
    }

    /// `(depth, height, width)`.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// The label at a single voxel.
    #[inline]
    #[must_use]
    pub fn get(&self, z: usize, y: usize, x: usize) -> f64 {
        self.data[[z, y, x]]
    }

    /// Read-only access to the underlying array, e.g. to export
    /// [`crate::TedOutput::corrected_reconstruction`] to a stack format.
    #[inline]
    #[must_use]
    pub fn array(&self) -> &Array3<f64> {
        &self.data
    }

    /// Checks that `self` and `other` share a shape.
    pub(crate) fn assert_same_shape(&self, other: &Volume) -> Result<(), TedError> {
        if self.dim() != other.dim() {
            return Err(TedError::SizeMismatch {
                expected: self.dim(),
                found: other.dim(),
            });
        }
        Ok(())
    }
}

/// Converts a label stored as `f64` to its bit-exact integer identity.
///
/// Labels are integers represented as floats to match legacy stack formats
/// (`spec.md` §3, §9). Keying collections by the raw `f64` would expose hash
/// and equality hazards (`NaN`, `-0.0` vs `0.0`), so every cell/label
/// collection in this crate keys on the `i64` produced here instead.
#[inline]
#[must_use]
pub fn label_id(label: f64) -> i64 {
    debug_assert!(
        label.fract() == 0.0,
        "label {label} is not integer-valued"
    );
    label.round() as i64
}
