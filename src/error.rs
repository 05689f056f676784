//! TED error enums.

/// Error returned by [`crate::evaluate`] and the components it drives.
#[derive(Clone, Debug)]
pub enum TedError {
    /// The ground-truth and reconstruction volumes do not share a shape.
    SizeMismatch {
        /// `(depth, height, width)` of the ground-truth volume.
        expected: (usize, usize, usize),
        /// `(depth, height, width)` of the reconstruction volume.
        found: (usize, usize, usize),
    },
    /// The voxel pitch or tolerance threshold is not a finite, positive value.
    InvalidConfig(&'static str),
    /// The ILP has no feasible assignment. Should not happen for valid
    /// inputs; a safeguard against a malformed problem.
    InfeasibleProblem,
    /// The solver backend returned a non-optimal status.
    SolverFailure(String),
    /// An internal invariant was violated while reading back the solution.
    /// Indicates a builder bug, never a user-facing condition.
    InvariantViolation(&'static str),
}

impl std::fmt::Display for TedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SizeMismatch { expected, found } => write!(
                f,
                "volume size mismatch: ground truth is {:?}, reconstruction is {:?}",
                expected, found
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::InfeasibleProblem => write!(f, "no feasible relabeling exists under tolerance"),
            Self::SolverFailure(status) => write!(f, "solver did not return optimal: {status}"),
            Self::InvariantViolation(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for TedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
