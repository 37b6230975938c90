use thiserror::Error;

/// Errors raised by the solvers.
///
/// Running out of iterations is not an error; see [`crate::iteration::Status`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("invalid settings: {reason}")]
    InvalidSettings { reason: &'static str },

    #[error("invalid interval [{a}, {b}]: endpoints must be finite with a <= b")]
    InvalidInterval { a: f64, b: f64 },

    #[error("no sign change on [{a}, {b}]: f(a) = {fa}, f(b) = {fb}")]
    NoSignChange { a: f64, b: f64, fa: f64, fb: f64 },

    #[error("dimension mismatch in {context}: expected {expected}, got {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Jacobian is singular at Newton iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error("number of subintervals must be at least one")]
    InvalidStepCount,

    #[error("invalid time span ({start}, {end}): ends must be finite with start < end")]
    InvalidTimeSpan { start: f64, end: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
