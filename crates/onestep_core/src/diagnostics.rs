//! Error measurements used to check convergence orders empirically.
//!
//! None of this runs inside a solve; it consumes traces and residual
//! histories after the fact.

use crate::error::Result as SolveResult;
use crate::ode::Trace;
use crate::traits::{DynamicalSystem, Steppable};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// `max_n ‖u_n - reference(t_n)‖_∞` over every node of the trace.
pub fn global_error<R>(trace: &Trace, reference: R) -> f64
where
    R: Fn(f64) -> Vec<f64>,
{
    trace
        .times
        .iter()
        .zip(&trace.states)
        .map(|(&t, u)| max_abs_difference(u, &reference(t)))
        .fold(0.0, f64::max)
}

/// `‖u_N - reference(t_N)‖_∞` at the last node only.
pub fn final_error<R>(trace: &Trace, reference: R) -> f64
where
    R: Fn(f64) -> Vec<f64>,
{
    match trace.times.last() {
        Some(&t) => max_abs_difference(trace.final_state(), &reference(t)),
        None => 0.0,
    }
}

/// `|r_{k+1}| / |r_k|^q` for consecutive residuals.
///
/// A sequence that settles to a nonzero constant indicates convergence of
/// order `q`. Zero residuals produce infinite or NaN ratios.
pub fn convergence_ratios(residuals: &[f64], q: f64) -> Vec<f64> {
    residuals
        .windows(2)
        .map(|w| w[1].abs() / w[0].abs().powf(q))
        .collect()
}

/// Observed orders `log(e_i / e_{i+1}) / log(N_{i+1} / N_i)` between
/// consecutive runs.
pub fn observed_orders(steps: &[usize], errors: &[f64]) -> Vec<f64> {
    steps
        .windows(2)
        .zip(errors.windows(2))
        .map(|(n, e)| (e[0] / e[1]).ln() / (n[1] as f64 / n[0] as f64).ln())
        .collect()
}

/// One-step error from an exact state: steps `h` from `exact_now` at `t` and
/// compares with `exact_next`, the true solution at `t + h`.
pub fn local_truncation_error<S, M>(
    stepper: &mut M,
    system: &S,
    t: f64,
    h: f64,
    exact_now: &[f64],
    exact_next: &[f64],
) -> SolveResult<f64>
where
    S: DynamicalSystem<f64>,
    M: Steppable<S, f64>,
{
    let mut state = exact_now.to_vec();
    stepper.step(system, t, &mut state, h)?;
    Ok(max_abs_difference(&state, exact_next))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRow {
    pub steps: usize,
    pub step_size: f64,
    pub error: f64,
}

/// Global errors over a sequence of step counts plus the observed orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceStudy {
    pub rows: Vec<StudyRow>,
    pub orders: Vec<f64>,
}

/// Runs `solve` for every `N` in `steps` and measures the global error
/// against `reference`.
pub fn convergence_study<F, R>(
    mut solve: F,
    steps: &[usize],
    reference: R,
) -> Result<ConvergenceStudy>
where
    F: FnMut(usize) -> SolveResult<Trace>,
    R: Fn(f64) -> Vec<f64>,
{
    if steps.len() < 2 {
        bail!("A convergence study needs at least two step counts.");
    }

    let mut rows = Vec::with_capacity(steps.len());
    for &n in steps {
        let trace = solve(n).with_context(|| format!("Integration with N = {n} failed."))?;
        let error = global_error(&trace, &reference);
        log::debug!("N = {}: global error {:e}", n, error);
        rows.push(StudyRow {
            steps: n,
            step_size: trace.step_size(),
            error,
        });
    }

    let errors: Vec<f64> = rows.iter().map(|row| row.error).collect();
    let orders = observed_orders(steps, &errors);
    Ok(ConvergenceStudy { rows, orders })
}

/// Infinite when the lengths disagree.
fn max_abs_difference(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivative::AutoDiff;
    use crate::iteration::IterationSettings;
    use crate::newton::newton;
    use crate::ode::{backward_euler, forward_euler, midpoint, rk4, OdeProblem};
    use crate::solvers::{ForwardEuler, Rk4};
    use crate::traits::Scalar;
    use approx::assert_relative_eq;

    struct Decay;

    impl<T: Scalar> DynamicalSystem<T> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
            out[0] = -x[0];
        }
    }

    fn exact(t: f64) -> Vec<f64> {
        vec![(-t).exp()]
    }

    fn problem() -> OdeProblem<AutoDiff<Decay>> {
        OdeProblem::new(AutoDiff::new(Decay), vec![1.0], (0.0, 1.0)).expect("valid problem")
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn global_error_is_zero_for_exact_trace() {
        let trace = Trace {
            times: vec![0.0, 0.5, 1.0],
            states: vec![exact(0.0), exact(0.5), exact(1.0)],
        };
        assert_eq!(global_error(&trace, exact), 0.0);
        assert_eq!(final_error(&trace, exact), 0.0);
    }

    #[test]
    fn global_error_takes_the_worst_node() {
        let trace = Trace {
            times: vec![0.0, 1.0],
            states: vec![vec![1.5, 0.0], vec![0.0, -0.25]],
        };
        let reference = |_t: f64| vec![1.0, 0.0];
        assert_eq!(global_error(&trace, reference), 1.0);
        assert_eq!(final_error(&trace, reference), 1.0);
    }

    #[test]
    fn reference_of_the_wrong_length_is_infinite_error() {
        let trace = Trace {
            times: vec![0.0, 1.0],
            states: vec![exact(0.0), exact(1.0)],
        };
        assert_eq!(global_error(&trace, |_t: f64| Vec::new()), f64::INFINITY);
        assert_eq!(final_error(&trace, |_t: f64| vec![0.0, 0.0]), f64::INFINITY);
    }

    #[test]
    fn ratios_distinguish_linear_from_quadratic() {
        let linear = [1.0, 0.5, 0.25, 0.125];
        assert!(convergence_ratios(&linear, 1.0).iter().all(|r| (r - 0.5).abs() < 1e-15));

        let result = newton(|x| x * x - 2.0, |x| 2.0 * x, 1.0, IterationSettings::new(1e-12, 40))
            .expect("newton should run");
        let residuals = result.residual_norms();
        let quadratic = convergence_ratios(&residuals[..4], 2.0);
        let last = quadratic[quadratic.len() - 1];
        assert!((last - 1.0 / (2.0 * 2f64.sqrt())).abs() < 0.01, "ratios {quadratic:?}");
    }

    #[test]
    fn observed_orders_recover_method_orders() {
        let steps = [10, 20, 40, 80];
        let euler = convergence_study(|n| forward_euler(&problem(), n), &steps, exact)
            .expect("study should run");
        let mid = convergence_study(|n| midpoint(&problem(), n), &steps, exact)
            .expect("study should run");
        let classic = convergence_study(|n| rk4(&problem(), n), &steps, exact)
            .expect("study should run");
        let implicit = convergence_study(|n| backward_euler(&problem(), n), &steps, exact)
            .expect("study should run");

        assert_eq!(euler.rows.len(), 4);
        assert_relative_eq!(euler.rows[1].step_size, 0.05, epsilon = 1e-15);
        for (study, order) in [(&euler, 1.0), (&mid, 2.0), (&classic, 4.0), (&implicit, 1.0)] {
            let last = study.orders[study.orders.len() - 1];
            assert!((last - order).abs() < 0.1, "orders {:?}", study.orders);
        }
    }

    #[test]
    fn rk4_error_drops_by_ten_thousand() {
        let study = convergence_study(|n| rk4(&problem(), n), &[10, 100], exact)
            .expect("study should run");
        let ratio = study.rows[0].error / study.rows[1].error;
        assert!(ratio > 5e3 && ratio < 2e4, "ratio {ratio}");
    }

    #[test]
    fn local_errors_scale_one_order_above_global() {
        let euler = |h: f64| {
            local_truncation_error(
                &mut ForwardEuler::<f64>::new(1),
                &Decay,
                0.0,
                h,
                &exact(0.0),
                &exact(h),
            )
            .expect("step should run")
        };
        let classic = |h: f64| {
            local_truncation_error(
                &mut Rk4::<f64>::new(1),
                &Decay,
                0.0,
                h,
                &exact(0.0),
                &exact(h),
            )
            .expect("step should run")
        };
        // Local error is O(h^{p+1}).
        assert_relative_eq!(euler(0.01) / euler(0.005), 4.0, max_relative = 0.02);
        assert_relative_eq!(classic(0.1) / classic(0.05), 32.0, max_relative = 0.05);
    }

    #[test]
    fn study_needs_two_runs_and_reports_failures() {
        assert_err_contains(
            convergence_study(|n| rk4(&problem(), n), &[10], exact),
            "at least two",
        );
        assert_err_contains(
            convergence_study(|n| rk4(&problem(), n), &[0, 10], exact),
            "N = 0",
        );
        assert_err_contains(
            convergence_study(|n| rk4(&problem(), n), &[0, 10], exact),
            "at least one",
        );
    }
}
