pub mod autodiff;
pub mod bisection;
pub mod derivative;
pub mod diagnostics;
pub mod error;
pub mod iteration;
pub mod newton;
pub mod ode;
pub mod solvers;
pub mod state;
/// The `onestep_core` crate collects the solvers of an introductory
/// numerical-analysis course: iterate, converge, measure the residual.
///
/// Key components:
/// - **Traits**: `Scalar` (f64 or dual numbers), `DynamicalSystem` (right-hand sides), `Steppable` (one-step methods).
/// - **Iteration**: the fixed-point driver and its `IterationResult`, with Newton's method built on top.
/// - **Bisection**: bracketing root finder with an a priori iteration bound.
/// - **Solvers / ODE**: Forward Euler, Midpoint, RK4 and Backward Euler steppers and the fixed-step driver.
/// - **Autodiff / Derivative**: dual numbers and finite differences supplying derivatives and Jacobians.
/// - **Diagnostics**: global and local errors, convergence ratios and observed orders.
pub mod traits;

pub use error::{Error, Result};
pub use iteration::{fixed_point_iterate, IterationResult, IterationSettings, Status};
