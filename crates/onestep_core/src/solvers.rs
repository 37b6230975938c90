use crate::derivative::JacobianSystem;
use crate::error::Result;
use crate::iteration::IterationSettings;
use crate::newton::newton_system;
use crate::traits::{lit, DynamicalSystem, Scalar, Steppable};
use nalgebra::{DMatrix, DVector};

/// Forward (explicit) Euler: `u_{n+1} = u_n + h f(t_n, u_n)`.
pub struct ForwardEuler<T: Scalar> {
    k1: Vec<T>,
}

impl<T: Scalar> ForwardEuler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar, S: DynamicalSystem<T>> Steppable<S, T> for ForwardEuler<T> {
    fn step(&mut self, system: &S, t: T, state: &mut [T], dt: T) -> Result<()> {
        system.apply(t, state, &mut self.k1);
        for i in 0..state.len() {
            state[i] = state[i] + dt * self.k1[i];
        }
        Ok(())
    }

    fn order(&self) -> u32 {
        1
    }
}

/// Explicit midpoint: `u_{n+1} = u_n + h f(t_n + h/2, u_n + (h/2) f(t_n, u_n))`.
pub struct Midpoint<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> Midpoint<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar, S: DynamicalSystem<T>> Steppable<S, T> for Midpoint<T> {
    fn step(&mut self, system: &S, t: T, state: &mut [T], dt: T) -> Result<()> {
        let half_dt = dt * lit::<T>(0.5);

        system.apply(t, state, &mut self.k1);
        for i in 0..state.len() {
            self.tmp[i] = state[i] + half_dt * self.k1[i];
        }
        system.apply(t + half_dt, &self.tmp, &mut self.k2);

        for i in 0..state.len() {
            state[i] = state[i] + dt * self.k2[i];
        }
        Ok(())
    }

    fn order(&self) -> u32 {
        2
    }
}

/// Classic Runge-Kutta 4th order.
pub struct Rk4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> Rk4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar, S: DynamicalSystem<T>> Steppable<S, T> for Rk4<T> {
    fn step(&mut self, system: &S, t: T, state: &mut [T], dt: T) -> Result<()> {
        let half = lit::<T>(0.5);
        let sixth = lit::<T>(1.0 / 6.0);
        let two = lit::<T>(2.0);

        // v1 = f(t, u)
        system.apply(t, state, &mut self.k1);

        // v2 = f(t + h/2, u + h v1 / 2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t + dt * half, &self.tmp, &mut self.k2);

        // v3 = f(t + h/2, u + h v2 / 2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t + dt * half, &self.tmp, &mut self.k3);

        // v4 = f(t + h, u + h v3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t + dt, &self.tmp, &mut self.k4);

        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }
        Ok(())
    }

    fn order(&self) -> u32 {
        4
    }
}

/// Backward (implicit) Euler: `u_{n+1} = u_n + h f(t_{n+1}, u_{n+1})`.
///
/// Each step solves `x - u_n - h f(t_{n+1}, x) = 0` by Newton's method started
/// at `u_n`, with Jacobian `I - h ∂f/∂u`. A singular Newton matrix aborts the
/// step; running out of Newton iterations does not.
pub struct BackwardEuler {
    settings: IterationSettings,
}

impl BackwardEuler {
    pub fn new() -> Self {
        Self {
            settings: IterationSettings::newton_system(),
        }
    }

    pub fn with_settings(settings: IterationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> IterationSettings {
        self.settings
    }
}

impl Default for BackwardEuler {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: JacobianSystem> Steppable<S, f64> for BackwardEuler {
    fn step(&mut self, system: &S, t: f64, state: &mut [f64], dt: f64) -> Result<()> {
        let dim = state.len();
        let t_next = t + dt;
        let u_n = DVector::from_column_slice(state);
        let mut f_x = vec![0.0; dim];

        let result = newton_system(
            |x| {
                system.apply(t_next, x.as_slice(), &mut f_x);
                x - &u_n - DVector::from_column_slice(&f_x) * dt
            },
            |x| DMatrix::identity(dim, dim) - system.jacobian(t_next, x.as_slice()) * dt,
            &u_n,
            self.settings,
        )?;

        if !result.converged() {
            log::warn!(
                "implicit step at t = {} ended with {:?} after {} Newton iterations",
                t,
                result.status,
                result.iterations
            );
        }

        state.copy_from_slice(result.value.as_slice());
        Ok(())
    }

    fn order(&self) -> u32 {
        1
    }
}
