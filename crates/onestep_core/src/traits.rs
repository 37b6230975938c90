use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

use crate::error::Result;

/// A trait for types that can be used as scalars by the solvers.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` literal into the scalar type.
///
/// Every `Scalar` in this crate converts from `f64` without loss of meaning;
/// a failed conversion yields NaN so it shows up in the results.
pub(crate) fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// Right-hand side of an initial-value problem `u' = f(t, u)`.
///
/// Parameters of the problem live in the implementing type, so a system is
/// `f(u, p, t)` with `p` bound at construction.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// t: current time
    /// x: current state
    /// out: buffer to write du/dt into
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A one-step method `u_{n+1} = u_n + h·φ(u_n, t_n, h)`.
pub trait Steppable<S, T: Scalar> {
    /// Advances `state` from time `t` to `t + dt` in place.
    fn step(&mut self, system: &S, t: T, state: &mut [T], dt: T) -> Result<()>;

    /// Global order of accuracy of the method.
    fn order(&self) -> u32;
}
