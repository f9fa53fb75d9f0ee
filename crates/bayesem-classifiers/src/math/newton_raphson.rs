use crate::error::{ClassifierError, Result};

/// A real function of one variable with an analytic first derivative.
pub trait DifferentiableFunction {
    fn value(&self, x: f64) -> f64;
    fn derivative(&self, x: f64) -> f64;
}

/// Newton-Raphson root finder over a bracketing interval.
///
/// Iteration starts at the interval midpoint and stops once two successive
/// iterates are within `absolute_accuracy`. The interval only seeds the start
/// point; the returned root may lie outside it and callers must check.
#[derive(Debug, Clone, Copy)]
pub struct NewtonRaphsonSolver {
    absolute_accuracy: f64,
}

impl Default for NewtonRaphsonSolver {
    fn default() -> Self {
        Self {
            absolute_accuracy: 1e-6,
        }
    }
}

impl NewtonRaphsonSolver {
    pub fn new(absolute_accuracy: f64) -> Self {
        Self { absolute_accuracy }
    }

    pub fn absolute_accuracy(&self) -> f64 {
        self.absolute_accuracy
    }

    /// Find a root of `f` starting from the midpoint of `[min, max]`.
    ///
    /// # Errors
    ///
    /// * `InvalidInterval` if `min >= max` or either bound is not finite.
    /// * `TooManyEvaluations` once `max_evaluations` function evaluations have
    ///   been spent without convergence.
    /// * `Diverged` when an iterate becomes NaN or infinite (zero derivative or
    ///   a pole hit exactly); more iterations cannot recover from that.
    pub fn solve<F: DifferentiableFunction>(
        &self,
        max_evaluations: usize,
        f: &F,
        min: f64,
        max: f64,
    ) -> Result<f64> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(ClassifierError::InvalidInterval { min, max });
        }

        let mut x0 = 0.5 * (min + max);
        let mut evaluations = 0;
        loop {
            if evaluations >= max_evaluations {
                return Err(ClassifierError::TooManyEvaluations {
                    max: max_evaluations,
                });
            }
            evaluations += 1;

            let x1 = x0 - f.value(x0) / f.derivative(x0);
            if !x1.is_finite() {
                return Err(ClassifierError::Diverged { evaluations });
            }
            if (x1 - x0).abs() <= self.absolute_accuracy {
                log::trace!("Newton-Raphson converged to {} after {} evaluations", x1, evaluations);
                return Ok(x1);
            }
            x0 = x1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quadratic {
        offset: f64,
    }

    impl DifferentiableFunction for Quadratic {
        fn value(&self, x: f64) -> f64 {
            x * x - self.offset
        }

        fn derivative(&self, x: f64) -> f64 {
            2.0 * x
        }
    }

    #[test]
    fn test_finds_square_root() {
        let solver = NewtonRaphsonSolver::default();
        let root = solver.solve(100, &Quadratic { offset: 2.0 }, 0.0, 4.0).unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_no_real_root_exhausts_evaluations() {
        // x^2 + 1 has no real root; iterates wander without settling.
        let solver = NewtonRaphsonSolver::default();
        let result = solver.solve(50, &Quadratic { offset: -1.0 }, 0.5, 3.0);
        assert!(matches!(
            result,
            Err(ClassifierError::TooManyEvaluations { max: 50 }) | Err(ClassifierError::Diverged { .. })
        ));
    }

    #[test]
    fn test_zero_derivative_diverges() {
        // Midpoint of [-1, 1] is 0 where the derivative vanishes.
        let solver = NewtonRaphsonSolver::default();
        let result = solver.solve(10, &Quadratic { offset: 1.0 }, -1.0, 1.0);
        assert!(matches!(result, Err(ClassifierError::Diverged { evaluations: 1 })));
    }

    #[test]
    fn test_empty_interval_rejected() {
        let solver = NewtonRaphsonSolver::default();
        let result = solver.solve(10, &Quadratic { offset: 1.0 }, 0.0, 0.0);
        assert!(matches!(result, Err(ClassifierError::InvalidInterval { .. })));
    }
}
