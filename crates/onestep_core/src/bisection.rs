use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Outcome of a bisection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootResult {
    /// Midpoint of the final bracket.
    pub root: f64,
    /// Final bracket `[a, b]`.
    pub bracket: [f64; 2],
    /// Half-width of the final bracket, a bound on `|root - x*|`.
    pub error_bound: f64,
    pub iterations: usize,
    /// Every bracket visited, starting with the initial one.
    pub history: Vec<[f64; 2]>,
}

/// A priori number of halvings needed to reach `tol` on `[a, b]`:
/// `ceil(log2((b - a) / tol) - 1)`, never negative.
pub fn bisection_iteration_bound(a: f64, b: f64, tol: f64) -> usize {
    let k = (((b - a) / tol).log2() - 1.0).ceil();
    if k.is_finite() && k > 0.0 {
        k as usize
    } else {
        0
    }
}

/// Finds a root of `f` in `[a, b]` by repeated halving.
///
/// Requires `f(a)·f(b) < 0`. Each step keeps the half whose ends still differ
/// in sign and the loop ends once the half-width `(b - a)/2` drops below `tol`.
/// Convergence is unconditional and linear with rate 1/2.
///
/// # Errors
///
/// [`Error::InvalidInterval`] for non-finite ends or `a > b`,
/// [`Error::NoSignChange`] when the sign-change precondition fails,
/// [`Error::InvalidSettings`] for a non-positive tolerance.
pub fn bisection<F>(f: F, a: f64, b: f64, tol: f64) -> Result<RootResult>
where
    F: Fn(f64) -> f64,
{
    if !(a.is_finite() && b.is_finite()) || a > b {
        return Err(Error::InvalidInterval { a, b });
    }
    if !(tol.is_finite() && tol > 0.0) {
        return Err(Error::InvalidSettings {
            reason: "tolerance must be positive and finite",
        });
    }

    let (mut a, mut b) = (a, b);
    let mut fa = f(a);
    let fb = f(b);
    if !opposite_signs(fa, fb) {
        return Err(Error::NoSignChange { a, b, fa, fb });
    }

    let mut history = vec![[a, b]];
    let mut iterations = 0usize;

    while (b - a) / 2.0 >= tol {
        let m = 0.5 * (a + b);
        if m <= a || m >= b {
            log::debug!("bracket [{a}, {b}] cannot be split further");
            break;
        }

        let fm = f(m);
        iterations += 1;
        if fm == 0.0 {
            a = m;
            b = m;
            history.push([a, b]);
            break;
        }
        if opposite_signs(fm, fa) {
            b = m;
        } else {
            a = m;
            fa = fm;
        }
        log::trace!("bisection iteration {}: [{:e}, {:e}]", iterations, a, b);
        history.push([a, b]);
    }

    log::debug!("bisection finished after {iterations} iterations");

    Ok(RootResult {
        root: 0.5 * (a + b),
        bracket: [a, b],
        error_bound: 0.5 * (b - a),
        iterations,
        history,
    })
}

/// Strict sign change without forming `x * y`, which underflows for tiny
/// values. Zero and NaN fail.
fn opposite_signs(x: f64, y: f64) -> bool {
    (x < 0.0 && y > 0.0) || (x > 0.0 && y < 0.0)
}
