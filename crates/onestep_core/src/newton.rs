//! Newton's method for scalar equations and for systems.
//!
//! Convergence is quadratic near a simple root and only local: a poor initial
//! guess may diverge or land on a different root. A vanishing derivative in the
//! scalar solver is not trapped; it shows up as a non-finite iterate and a
//! [`Status::NonFinite`](crate::iteration::Status::NonFinite) result.

use crate::autodiff::Dual;
use crate::derivative::{evaluate, jacobian};
use crate::error::{Error, Result};
use crate::iteration::{fixed_point_iterate, IterationResult, IterationSettings};
use crate::state::State;
use crate::traits::DynamicalSystem;
use nalgebra::{DMatrix, DVector};

/// Scalar Newton iteration, the fixed-point iteration of `g(x) = x - f(x)/f'(x)`.
pub fn newton<F, D>(
    f: F,
    df: D,
    x0: f64,
    settings: IterationSettings,
) -> Result<IterationResult<f64>>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    fixed_point_iterate(|x: &f64| x - f(*x) / df(*x), x0, settings)
}

/// Scalar Newton iteration with `f'` taken from dual numbers.
pub fn newton_autodiff<F>(
    f: F,
    x0: f64,
    settings: IterationSettings,
) -> Result<IterationResult<f64>>
where
    F: Fn(Dual) -> Dual,
{
    fixed_point_iterate(
        |x: &f64| {
            let y = f(Dual::variable(*x));
            x - y.val / y.eps
        },
        x0,
        settings,
    )
}

/// Newton's method for `F(x) = 0` with `F: Rⁿ → Rⁿ` and Jacobian `J`.
///
/// Each iteration solves `J(x)·r = -F(x)` by partially pivoted LU and sets
/// `x ← x + r`. The recorded residual is the step `r`; iteration stops once
/// `‖r‖ < tolerance` or the cap is reached.
///
/// # Errors
///
/// [`Error::SingularJacobian`] when the linear solve has no meaningful
/// solution, [`Error::DimensionMismatch`] when `F` or `J` return the wrong
/// shape.
pub fn newton_system<F, J>(
    mut f: F,
    mut jac: J,
    x0: &DVector<f64>,
    settings: IterationSettings,
) -> Result<IterationResult<DVector<f64>>>
where
    F: FnMut(&DVector<f64>) -> DVector<f64>,
    J: FnMut(&DVector<f64>) -> DMatrix<f64>,
{
    settings.validate()?;
    let dim = x0.len();
    if dim == 0 {
        return Err(Error::DimensionMismatch {
            context: "initial guess",
            expected: 1,
            found: 0,
        });
    }

    let mut history_x = Vec::with_capacity(settings.max_iterations + 1);
    let mut history_r: Vec<DVector<f64>> = Vec::with_capacity(settings.max_iterations);
    history_x.push(x0.clone());

    let mut x = x0.clone();
    let mut iterations = 0usize;

    loop {
        let y = f(&x);
        if y.len() != dim {
            return Err(Error::DimensionMismatch {
                context: "function value",
                expected: dim,
                found: y.len(),
            });
        }
        let a = jac(&x);
        if a.nrows() != dim || a.ncols() != dim {
            return Err(Error::DimensionMismatch {
                context: "Jacobian",
                expected: dim,
                found: if a.nrows() != dim { a.nrows() } else { a.ncols() },
            });
        }

        let r = solve_step(a, -y, iterations + 1)?;
        let r_norm = r.norm();
        iterations += 1;
        log::trace!("newton iteration {}: |r| = {:e}", iterations, r_norm);

        x += &r;
        history_x.push(x.clone());
        history_r.push(r);

        if iterations >= settings.max_iterations || r_norm < settings.tolerance {
            break;
        }
    }

    let residual = history_r
        .last()
        .cloned()
        .unwrap_or_else(|| DVector::zeros(dim));

    Ok(IterationResult::finish(
        x,
        residual,
        iterations,
        history_x,
        history_r,
        settings.tolerance,
    ))
}

/// Newton's method on `F(x) = system(0, x)` with a dual-number Jacobian.
pub fn newton_system_autodiff<S>(
    system: &S,
    x0: &DVector<f64>,
    settings: IterationSettings,
) -> Result<IterationResult<DVector<f64>>>
where
    S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
{
    let dim = DynamicalSystem::<f64>::dimension(system);
    if x0.len() != dim {
        return Err(Error::DimensionMismatch {
            context: "initial guess",
            expected: dim,
            found: x0.len(),
        });
    }
    newton_system(
        |x| evaluate(system, 0.0, x.as_slice()),
        |x| jacobian(system, 0.0, x.as_slice()),
        x0,
        settings,
    )
}

/// Solves `a·r = rhs`, rejecting singular and numerically singular matrices.
fn solve_step(a: DMatrix<f64>, rhs: DVector<f64>, iteration: usize) -> Result<DVector<f64>> {
    let dim = a.nrows();
    let lu = a.lu();

    let pivots = lu.u().diagonal().map(f64::abs);
    let largest = pivots.max();
    let smallest = pivots.min();
    if !(largest.is_finite() && largest > 0.0)
        || smallest <= f64::EPSILON * dim as f64 * largest
    {
        log::warn!(
            "singular Jacobian at iteration {}: pivot ratio {:e}",
            iteration,
            smallest / largest
        );
        return Err(Error::SingularJacobian { iteration });
    }

    let step = lu
        .solve(&rhs)
        .ok_or(Error::SingularJacobian { iteration })?;
    if !State::is_finite(&step) {
        return Err(Error::SingularJacobian { iteration });
    }
    Ok(step)
}
