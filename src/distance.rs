//! C2 — Distance Transform.
//!
//! Anisotropic squared Euclidean distance transform: for every voxel,
//! the squared distance to the nearest voxel where `mask` is set, with axis
//! `k` contributing `(pitch_k * delta_k)^2`. Exact, via a separable
//! Felzenszwalb-Huttenlocher lower envelope per axis — never an
//! approximation. See `spec.md` §4.2.
//!
//! Grounded on the `edt_1d`/`edt_unsigned` lower-envelope implementation in
//! the retrieval pack's field-graph EDT utility, generalized from 2D/isotropic
//! to 3D/anisotropic by weighting each axis's quadratic term by that axis's
//! squared pitch.

use ndarray::{Array3, Axis};

use crate::config::Pitch;

/// Reusable distance-field buffer, sized once and overwritten per
/// reconstruction label (`spec.md` §5's resource policy: one distance
/// volume resident and reused across rec labels).
#[derive(Debug)]
pub struct DistanceField {
    data: Array3<f64>,
}

impl DistanceField {
    /// Allocates a buffer of the given volume shape.
    #[must_use]
    pub fn new(dim: (usize, usize, usize)) -> Self {
        Self {
            data: Array3::from_elem(dim, 0.0),
        }
    }

    /// Overwrites the buffer with the squared, pitch-weighted distance
    /// transform of `mask`.
    pub fn recompute(&mut self, mask: &Array3<bool>, pitch: Pitch) {
        squared_distance_transform_into(mask, pitch, &mut self.data);
    }

    /// The squared distance at `(z, y, x)` from the most recent
    /// [`DistanceField::recompute`] call.
    #[inline]
    #[must_use]
    pub fn get(&self, z: usize, y: usize, x: usize) -> f64 {
        self.data[[z, y, x]]
    }
}

/// Computes the squared anisotropic distance transform of `mask` into a
/// freshly allocated volume. Prefer [`DistanceField`] when computing this
/// repeatedly for different masks of the same shape.
#[must_use]
pub fn squared_distance_transform(mask: &Array3<bool>, pitch: Pitch) -> Array3<f64> {
    let mut out = Array3::from_elem(mask.dim(), 0.0);
    squared_distance_transform_into(mask, pitch, &mut out);
    out
}

fn squared_distance_transform_into(mask: &Array3<bool>, pitch: Pitch, out: &mut Array3<f64>) {
    debug_assert_eq!(mask.dim(), out.dim());

    let large = sentinel(mask.dim(), pitch);
    for (dst, &is_source) in out.iter_mut().zip(mask.iter()) {
        *dst = if is_source { 0.0 } else { large };
    }

    let (px, py, pz) = pitch;
    // Passes are separable: x innermost, then y, then z, each adding its own
    // squared, pitch-weighted term (`spec.md` §4.2).
    pass_axis(out, 2, px * px);
    pass_axis(out, 1, py * py);
    pass_axis(out, 0, pz * pz);
}

/// A value guaranteed larger than any real squared distance within the
/// volume, used in place of `f64::INFINITY` so the lower-envelope arithmetic
/// never produces `NaN` from `inf - inf`. Mirrors the finite
/// `max_dist_squared` sentinel of the source this algorithm is grounded on.
fn sentinel(dim: (usize, usize, usize), pitch: Pitch) -> f64 {
    let (d, h, w) = dim;
    let (px, py, pz) = pitch;
    let dx = px * w as f64;
    let dy = py * h as f64;
    let dz = pz * d as f64;
    dx.mul_add(dx, dy.mul_add(dy, dz * dz)) * 4.0 + 1.0
}

/// Runs the 1D distance transform over every lane along `axis`, in place.
fn pass_axis(field: &mut Array3<f64>, axis: usize, scale: f64) {
    let mut output = vec![0.0_f64; field.len_of(Axis(axis))];
    for mut lane in field.lanes_mut(Axis(axis)) {
        let input = lane.to_vec();
        edt_1d(&input, scale, &mut output);
        for (slot, &value) in lane.iter_mut().zip(output.iter()) {
            *slot = value;
        }
    }
}

/// 1D squared distance transform via the Felzenszwalb-Huttenlocher lower
/// envelope of parabolas `q -> scale*(x-q)^2 + f[q]`, generalized with a
/// per-axis `scale` (the axis's squared pitch) for anisotropy.
fn edt_1d(f: &[f64], scale: f64, output: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let mut v = vec![0_usize; n];
    let mut z = vec![0.0_f64; n + 1];
    let mut k = 0_usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let mut s = intersection(q, v[k], f, scale);
        while s <= z[k] {
            if k == 0 {
                break;
            }
            k -= 1;
            s = intersection(q, v[k], f, scale);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, dst) in output.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dx = q as f64 - v[k] as f64;
        *dst = scale.mul_add(dx * dx, f[v[k]]);
    }
}

/// Intersection of the parabolas rooted at `i` and `j` in the lower
/// envelope, in the scaled (anisotropic) quadratic `scale*x^2`.
fn intersection(i: usize, j: usize, f: &[f64], scale: f64) -> f64 {
    if i == j {
        return f64::INFINITY;
    }
    let fi = scale.mul_add((i * i) as f64, f[i]);
    let fj = scale.mul_add((j * j) as f64, f[j]);
    (fi - fj) / (2.0 * scale * (i as f64 - j as f64))
}
