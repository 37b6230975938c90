//! Fixed-step integration of initial-value problems.
//!
//! All drivers share one loop: `N` equal steps of size `h = (b - a)/N` from
//! `(a, u0)`, each produced by a [`Steppable`] method. Explicit methods applied
//! outside their stability region are not stopped; the trace simply grows or
//! oscillates and it is up to the caller to check [`Trace::is_finite`] or
//! [`Trace::max_abs`].

use crate::derivative::JacobianSystem;
use crate::error::{Error, Result};
use crate::solvers::{BackwardEuler, ForwardEuler, Midpoint, Rk4};
use crate::traits::{DynamicalSystem, Steppable};
use serde::{Deserialize, Serialize};

/// An initial-value problem `u' = f(t, u)`, `u(a) = u0`, on `[a, b]`.
#[derive(Debug, Clone)]
pub struct OdeProblem<S> {
    pub system: S,
    pub u0: Vec<f64>,
    pub tspan: (f64, f64),
}

impl<S: DynamicalSystem<f64>> OdeProblem<S> {
    pub fn new(system: S, u0: Vec<f64>, tspan: (f64, f64)) -> Result<Self> {
        let problem = Self { system, u0, tspan };
        problem.validate()?;
        Ok(problem)
    }

    pub fn dimension(&self) -> usize {
        self.u0.len()
    }

    fn validate(&self) -> Result<()> {
        let expected = self.system.dimension();
        if self.u0.len() != expected {
            return Err(Error::DimensionMismatch {
                context: "initial value",
                expected,
                found: self.u0.len(),
            });
        }
        let (start, end) = self.tspan;
        if !(start.is_finite() && end.is_finite()) || end <= start {
            return Err(Error::InvalidTimeSpan { start, end });
        }
        Ok(())
    }
}

/// Adapts a closure `f(u, p, t)` writing `du/dt` into its last argument.
pub struct FnSystem<F, P> {
    rhs: F,
    params: P,
    dimension: usize,
}

impl<F, P> FnSystem<F, P>
where
    F: Fn(&[f64], &P, f64, &mut [f64]),
{
    pub fn new(dimension: usize, params: P, rhs: F) -> Self {
        Self {
            rhs,
            params,
            dimension,
        }
    }

    pub fn params(&self) -> &P {
        &self.params
    }
}

impl<F, P> DynamicalSystem<f64> for FnSystem<F, P>
where
    F: Fn(&[f64], &P, f64, &mut [f64]),
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        (self.rhs)(x, &self.params, t, out);
    }
}

/// Node times `t_0..t_N` and states `u_0..u_N` of a fixed-step solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
}

impl Trace {
    /// Number of nodes, `N + 1`.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn step_size(&self) -> f64 {
        match (self.times.first(), self.times.get(1)) {
            (Some(t0), Some(t1)) => t1 - t0,
            _ => 0.0,
        }
    }

    pub fn final_state(&self) -> &[f64] {
        self.states.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values of component `index` at every node, or `None` when `index` is
    /// out of range.
    pub fn component(&self, index: usize) -> Option<Vec<f64>> {
        self.states.iter().map(|u| u.get(index).copied()).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.states.iter().flatten().all(|v| v.is_finite())
    }

    /// Largest absolute state component over the whole trace.
    pub fn max_abs(&self) -> f64 {
        self.states
            .iter()
            .flatten()
            .fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }
}

/// Integrates `problem` with `steps` equal steps of `stepper`.
pub fn integrate<S, M>(problem: &OdeProblem<S>, stepper: &mut M, steps: usize) -> Result<Trace>
where
    S: DynamicalSystem<f64>,
    M: Steppable<S, f64>,
{
    problem.validate()?;
    if steps == 0 {
        return Err(Error::InvalidStepCount);
    }

    let (a, b) = problem.tspan;
    let h = (b - a) / steps as f64;

    let mut times = Vec::with_capacity(steps + 1);
    let mut states = Vec::with_capacity(steps + 1);
    let mut state = problem.u0.clone();
    let mut reported_blowup = false;

    times.push(a);
    states.push(state.clone());

    for n in 0..steps {
        let t = a + n as f64 * h;
        stepper.step(&problem.system, t, &mut state, h)?;

        if !reported_blowup && state.iter().any(|v| !v.is_finite()) {
            log::warn!("state became non-finite at step {} (t = {})", n + 1, t + h);
            reported_blowup = true;
        }

        // Index-based times keep t_N == b without accumulated drift.
        times.push(if n + 1 == steps { b } else { a + (n + 1) as f64 * h });
        states.push(state.clone());
    }

    log::debug!(
        "integrated {} steps of h = {:e} with order-{} method",
        steps,
        h,
        stepper.order()
    );

    Ok(Trace { times, states })
}

pub fn forward_euler<S: DynamicalSystem<f64>>(
    problem: &OdeProblem<S>,
    steps: usize,
) -> Result<Trace> {
    integrate(problem, &mut ForwardEuler::<f64>::new(problem.dimension()), steps)
}

pub fn midpoint<S: DynamicalSystem<f64>>(problem: &OdeProblem<S>, steps: usize) -> Result<Trace> {
    integrate(problem, &mut Midpoint::<f64>::new(problem.dimension()), steps)
}

pub fn rk4<S: DynamicalSystem<f64>>(problem: &OdeProblem<S>, steps: usize) -> Result<Trace> {
    integrate(problem, &mut Rk4::<f64>::new(problem.dimension()), steps)
}

/// Backward Euler with the default inner Newton settings.
///
/// # Errors
///
/// Propagates [`Error::SingularJacobian`] from the implicit solve.
pub fn backward_euler<S: JacobianSystem>(problem: &OdeProblem<S>, steps: usize) -> Result<Trace> {
    integrate(problem, &mut BackwardEuler::new(), steps)
}
