//! Fixed-point iteration `x ← g(x)` with a residual-based stopping rule.
//!
//! The residual `r = g(x) - x` is a computable stand-in for the unknown error.
//! When `|g'(x*)|` is close to one the residual can be much smaller than the
//! error, so a small residual does not guarantee an accurate iterate.

use crate::error::{Error, Result};
use crate::state::State;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationSettings {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for IterationSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

impl IterationSettings {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Defaults for Newton's method on systems.
    pub fn newton_system() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 40,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::InvalidSettings {
                reason: "tolerance must be positive and finite",
            });
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidSettings {
                reason: "max_iterations must be greater than zero",
            });
        }
        Ok(())
    }
}

/// How an iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The last residual fell below the tolerance.
    Converged,
    /// The iteration cap was reached with the residual still above tolerance.
    MaxIterations,
    /// The final iterate or residual is NaN or infinite.
    NonFinite,
}

/// Outcome of a fixed-point or Newton solve.
///
/// `history_x` starts with the initial guess, so it always holds one more
/// entry than `history_r`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult<S> {
    pub value: S,
    pub residual: S,
    pub iterations: usize,
    pub status: Status,
    pub history_x: Vec<S>,
    pub history_r: Vec<S>,
}

impl<S: State> IterationResult<S> {
    pub(crate) fn finish(
        value: S,
        residual: S,
        iterations: usize,
        history_x: Vec<S>,
        history_r: Vec<S>,
        tolerance: f64,
    ) -> Self {
        let status = if !value.is_finite() || !residual.is_finite() {
            Status::NonFinite
        } else if residual.magnitude() < tolerance {
            Status::Converged
        } else {
            Status::MaxIterations
        };

        match status {
            Status::Converged => log::debug!(
                "converged after {} iterations, |r| = {:e}",
                iterations,
                residual.magnitude()
            ),
            Status::MaxIterations => log::warn!(
                "no convergence after {} iterations, |r| = {:e} (tol {:e})",
                iterations,
                residual.magnitude(),
                tolerance
            ),
            Status::NonFinite => {
                log::warn!("iterate became non-finite after {} iterations", iterations)
            }
        }

        Self {
            value,
            residual,
            iterations,
            status,
            history_x,
            history_r,
        }
    }

    pub fn converged(&self) -> bool {
        self.status == Status::Converged
    }

    pub fn residual_norm(&self) -> f64 {
        self.residual.magnitude()
    }

    pub fn residual_norms(&self) -> Vec<f64> {
        self.history_r.iter().map(State::magnitude).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}

/// Iterates `x ← g(x)` from `x0`.
///
/// Stops after the first step whose residual `|g(x) - x|` is below
/// `settings.tolerance`, or after `settings.max_iterations` steps. At least one
/// step is always taken. Hitting the cap is not an error; inspect
/// [`IterationResult::status`].
pub fn fixed_point_iterate<S, G>(
    mut g: G,
    x0: S,
    settings: IterationSettings,
) -> Result<IterationResult<S>>
where
    S: State,
    G: FnMut(&S) -> S,
{
    settings.validate()?;

    let mut history_x = Vec::with_capacity(settings.max_iterations + 1);
    let mut history_r = Vec::with_capacity(settings.max_iterations);
    history_x.push(x0.clone());

    let mut x = x0;
    let mut iterations = 0usize;

    loop {
        let x_next = g(&x);
        let r = x_next.difference(&x);
        let r_norm = r.magnitude();
        iterations += 1;
        log::trace!("fixed-point iteration {}: |r| = {:e}", iterations, r_norm);

        history_x.push(x_next.clone());
        history_r.push(r);
        x = x_next;

        if iterations >= settings.max_iterations || r_norm < settings.tolerance {
            break;
        }
    }

    let residual = history_r
        .last()
        .cloned()
        .unwrap_or_else(|| x.difference(&x));

    Ok(IterationResult::finish(
        x,
        residual,
        iterations,
        history_x,
        history_r,
        settings.tolerance,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DVector, Vector2};

    #[test]
    fn exact_fixed_point_stops_after_one_step() {
        let result = fixed_point_iterate(|x: &f64| x * x, 1.0, IterationSettings::default())
            .expect("iteration should run");
        assert_eq!(result.iterations, 1);
        assert_eq!(result.residual, 0.0);
        assert_eq!(result.value, 1.0);
        assert_eq!(result.status, Status::Converged);
    }

    #[test]
    fn history_has_one_more_iterate_than_residual() {
        let result = fixed_point_iterate(|x: &f64| x.cos(), 1.0, IterationSettings::default())
            .expect("iteration should run");
        assert!(result.converged());
        assert_eq!(result.history_x.len(), result.history_r.len() + 1);
        assert_eq!(result.history_x.len(), result.iterations + 1);
        assert_eq!(result.history_x[0], 1.0);
        assert_eq!(*result.history_x.last().unwrap(), result.value);
        // Dottie number
        assert_relative_eq!(result.value, 0.739_085_133_215_160_6, epsilon = 1e-5);
        assert!(result.residual_norm() < 1e-6);
    }

    #[test]
    fn hitting_the_cap_is_not_an_error() {
        let settings = IterationSettings::new(1e-12, 5);
        let result = fixed_point_iterate(|x: &f64| x + 1.0, 0.0, settings)
            .expect("non-convergence is reported through status");
        assert_eq!(result.iterations, 5);
        assert_eq!(result.value, 5.0);
        assert_eq!(result.residual, 1.0);
        assert_eq!(result.status, Status::MaxIterations);
        assert!(!result.converged());
    }

    #[test]
    fn slow_contraction_reports_false_convergence() {
        // g'(x*) = 0.999: residual is a thousand times smaller than the error.
        let g = |x: &f64| 0.999 * x;
        let result = fixed_point_iterate(g, 1.0, IterationSettings::new(1e-3, 10_000))
            .expect("iteration should run");
        assert!(result.converged());
        assert!(result.value.abs() > 0.5);
    }

    #[test]
    fn vector_iteration_uses_euclidean_norm() {
        let g = |x: &DVector<f64>| x * 0.5;
        let x0 = DVector::from_vec(vec![3.0, 4.0]);
        let result = fixed_point_iterate(g, x0, IterationSettings::new(1e-3, 100))
            .expect("iteration should run");
        let norms = result.residual_norms();
        assert_relative_eq!(norms[0], 2.5, epsilon = 1e-15);
        assert!(norms.windows(2).all(|w| (w[1] / w[0] - 0.5).abs() < 1e-12));
        assert!(result.converged());
    }

    #[test]
    fn fixed_size_vectors_iterate_too() {
        let g = |x: &Vector2<f64>| Vector2::new(x[1].cos(), 0.5 * x[0]);
        let result = fixed_point_iterate(g, Vector2::new(0.0, 0.0), IterationSettings::default())
            .expect("iteration should run");
        assert!(result.converged());
        let x = result.value;
        assert!((x[0] - x[1].cos()).abs() < 1e-5);
    }

    #[test]
    fn nan_iterates_are_flagged() {
        let result = fixed_point_iterate(|_: &f64| f64::NAN, 1.0, IterationSettings::new(1e-6, 3))
            .expect("iteration should run");
        assert_eq!(result.iterations, 3);
        assert_eq!(result.status, Status::NonFinite);
        assert!(!result.is_finite());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = fixed_point_iterate(|x: &f64| *x, 0.0, IterationSettings::new(0.0, 10))
            .expect_err("zero tolerance");
        assert!(format!("{err}").contains("tolerance"));
        let err = fixed_point_iterate(|x: &f64| *x, 0.0, IterationSettings::new(1e-6, 0))
            .expect_err("zero cap");
        assert!(format!("{err}").contains("max_iterations"));
    }
}
