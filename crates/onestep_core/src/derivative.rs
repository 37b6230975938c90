//! Derivative and Jacobian providers consumed by the Newton-type solvers.
//!
//! Derivatives come either from dual numbers (exact to rounding, requires the
//! function to be written over [`Scalar`](crate::traits::Scalar)) or from finite
//! differences (any `f64` function).

use crate::autodiff::Dual;
use crate::error::{Error, Result};
use crate::traits::DynamicalSystem;
use nalgebra::{DMatrix, DVector};

/// Derivative of a scalar function at `x` by forward-mode autodiff.
pub fn derivative<F>(f: F, x: f64) -> f64
where
    F: Fn(Dual) -> Dual,
{
    f(Dual::variable(x)).eps
}

/// Central-difference approximation of `f'(x)` with step `h`.
pub fn central_difference<F>(f: F, x: f64, h: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    (f(x + h) - f(x - h)) / (2.0 * h)
}

/// Evaluates `system` at `(t, x)` into a fresh vector.
pub fn evaluate<S>(system: &S, t: f64, x: &[f64]) -> DVector<f64>
where
    S: DynamicalSystem<f64> + ?Sized,
{
    let mut out = DVector::zeros(x.len());
    system.apply(t, x, out.as_mut_slice());
    out
}

/// Dense Jacobian `∂f/∂x` at `(t, x)`, one dual-number sweep per column.
pub fn jacobian<S>(system: &S, t: f64, x: &[f64]) -> DMatrix<f64>
where
    S: DynamicalSystem<Dual> + ?Sized,
{
    let dim = x.len();
    let mut jacobian = DMatrix::zeros(dim, dim);
    let mut dual_x: Vec<Dual> = x.iter().map(|&v| Dual::constant(v)).collect();
    let mut dual_out = vec![Dual::constant(0.0); dim];
    let t_dual = Dual::constant(t);

    for j in 0..dim {
        dual_x[j].eps = 1.0;
        system.apply(t_dual, &dual_x, &mut dual_out);
        for i in 0..dim {
            jacobian[(i, j)] = dual_out[i].eps;
        }
        dual_x[j].eps = 0.0;
    }

    jacobian
}

/// Forward-difference Jacobian at `(t, x)`.
///
/// Column `j` uses the increment `step * max(1, |x_j|)`.
pub fn finite_difference_jacobian<S>(system: &S, t: f64, x: &[f64], step: f64) -> DMatrix<f64>
where
    S: DynamicalSystem<f64> + ?Sized,
{
    let dim = x.len();
    let base = evaluate(system, t, x);
    let mut jacobian = DMatrix::zeros(dim, dim);
    let mut shifted = x.to_vec();
    let mut out = vec![0.0; dim];

    for j in 0..dim {
        let h = step * x[j].abs().max(1.0);
        shifted[j] = x[j] + h;
        system.apply(t, &shifted, &mut out);
        for i in 0..dim {
            jacobian[(i, j)] = (out[i] - base[i]) / h;
        }
        shifted[j] = x[j];
    }

    jacobian
}

/// A system whose state Jacobian is available, as needed by implicit methods.
pub trait JacobianSystem: DynamicalSystem<f64> {
    /// Returns `∂f/∂u` at `(t, x)` as a `dim × dim` matrix.
    fn jacobian(&self, t: f64, x: &[f64]) -> DMatrix<f64>;
}

/// Attaches a dual-number Jacobian to a system written over both `f64` and `Dual`.
pub struct AutoDiff<S> {
    pub inner: S,
}

impl<S> AutoDiff<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: DynamicalSystem<f64>> DynamicalSystem<f64> for AutoDiff<S> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        self.inner.apply(t, x, out);
    }
}

impl<S> JacobianSystem for AutoDiff<S>
where
    S: DynamicalSystem<f64> + DynamicalSystem<Dual>,
{
    fn jacobian(&self, t: f64, x: &[f64]) -> DMatrix<f64> {
        jacobian(&self.inner, t, x)
    }
}

/// Attaches a forward-difference Jacobian to any `f64` system.
pub struct FiniteDifference<S> {
    pub inner: S,
    step: f64,
}

impl<S> FiniteDifference<S> {
    /// Default relative increment, about the square root of machine epsilon.
    pub const DEFAULT_STEP: f64 = 1.5e-8;

    pub fn new(inner: S) -> Self {
        Self {
            inner,
            step: Self::DEFAULT_STEP,
        }
    }

    pub fn with_step(inner: S, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::InvalidSettings {
                reason: "finite-difference step must be positive and finite",
            });
        }
        Ok(Self { inner, step })
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

impl<S: DynamicalSystem<f64>> DynamicalSystem<f64> for FiniteDifference<S> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        self.inner.apply(t, x, out);
    }
}

impl<S: DynamicalSystem<f64>> JacobianSystem for FiniteDifference<S> {
    fn jacobian(&self, t: f64, x: &[f64]) -> DMatrix<f64> {
        finite_difference_jacobian(&self.inner, t, x, self.step)
    }
}
