//! Finite-difference approximations of the dynamics derivatives.
//!
//! Useful for systems that do not implement
//! [`dynamics_state_first_derivative`](crate::DynamicalSystem::dynamics_state_first_derivative)
//! or [`dynamics_control_first_derivative`](crate::DynamicalSystem::dynamics_control_first_derivative),
//! and for checking hand-written implementations.

use std::ops::Deref;

use nalgebra::{convert, DMatrix, DVector, RealField};
use num_traits::{One, Zero};
use thiserror::Error;

use crate::core::{DynamicalSystem, SystemError};

/// Square root of double precision machine epsilon, the base of the
/// forward-difference step.
pub const EPSILON_SQRT: f64 = 0.000000014901161193847656;

/// Error when computing the Jacobian matrix.
#[derive(Debug, Error)]
pub enum JacobianError {
    /// Error that occurred when evaluating the system.
    #[error("{0}")]
    System(#[from] SystemError),
}

/// Computes the step for differentiating in a variable with given value.
fn step_size<S: RealField + Copy>(xj: S) -> S {
    let eps: S = convert(EPSILON_SQRT);

    // The step is relative to the magnitude of the variable, but at least
    // eps, so that variables close to zero still get a reasonable step.
    let step = eps * xj.abs().max(S::one()) * S::one().copysign(xj);
    if step == S::zero() {
        eps
    } else {
        step
    }
}

fn check_dim(expected: usize, found: usize) -> Result<(), JacobianError> {
    if expected != found {
        Err(SystemError::InvalidDimensionality { expected, found }.into())
    } else {
        Ok(())
    }
}

/// Partial derivative of the dynamics with respect to the state.
#[derive(Debug)]
pub struct StateJacobian<F: DynamicalSystem> {
    jac: DMatrix<F::Scalar>,
    fx: DVector<F::Scalar>,
    fx_step: DVector<F::Scalar>,
}

impl<F: DynamicalSystem> StateJacobian<F> {
    /// Initializes the Jacobian matrix with zeros.
    pub fn zeros(f: &F) -> Self {
        let n = f.state_space_size();
        Self {
            jac: DMatrix::zeros(n, n),
            fx: DVector::zeros(n),
            fx_step: DVector::zeros(n),
        }
    }

    /// Computes the Jacobian matrix of the system in given state and time
    /// using the currently stored control input. See
    /// [`compute`](StateJacobian::compute) for more details.
    pub fn new(
        f: &F,
        x: &mut DVector<F::Scalar>,
        time: F::Scalar,
    ) -> Result<Self, JacobianError> {
        let mut jac = Self::zeros(f);
        jac.compute(f, x, time)?;
        Ok(jac)
    }

    /// Computes the Jacobian matrix of the system in given state and time
    /// using the currently stored control input.
    ///
    /// The parameter `x` is mutable to allow temporary mutations avoiding
    /// unnecessary allocations, but after this method ends, the content of the
    /// vector is exactly the same as before.
    pub fn compute(
        &mut self,
        f: &F,
        x: &mut DVector<F::Scalar>,
        time: F::Scalar,
    ) -> Result<&mut Self, JacobianError> {
        let n = f.state_space_size();
        check_dim(n, x.len())?;

        f.dynamics(x, time, &mut self.fx)?;
        check_dim(n, self.fx.len())?;

        for j in 0..n {
            let xj = x[j];
            let step = step_size(xj);

            x[j] = xj + step;
            let result = f.dynamics(x, time, &mut self.fx_step);
            x[j] = xj;
            result?;
            check_dim(n, self.fx_step.len())?;

            // J[i, j] = (f(x + e_j * step) - f(x)) / step
            let mut col = self.jac.column_mut(j);
            col.copy_from(&self.fx_step);
            col -= &self.fx;
            col /= step;
        }

        Ok(self)
    }
}

impl<F: DynamicalSystem> Deref for StateJacobian<F> {
    type Target = DMatrix<F::Scalar>;

    fn deref(&self) -> &Self::Target {
        &self.jac
    }
}

/// Partial derivative of the dynamics with respect to the control input.
#[derive(Debug)]
pub struct ControlJacobian<F: DynamicalSystem> {
    jac: DMatrix<F::Scalar>,
    fx: DVector<F::Scalar>,
    fx_step: DVector<F::Scalar>,
}

impl<F: DynamicalSystem> ControlJacobian<F> {
    /// Initializes the Jacobian matrix with zeros.
    pub fn zeros(f: &F) -> Self {
        let n = f.state_space_size();
        let m = f.control_space_size();
        Self {
            jac: DMatrix::zeros(n, m),
            fx: DVector::zeros(n),
            fx_step: DVector::zeros(n),
        }
    }

    /// Computes the Jacobian matrix of the system in given state and time
    /// around the currently stored control input. See
    /// [`compute`](ControlJacobian::compute) for more details.
    pub fn new(f: &mut F, x: &DVector<F::Scalar>, time: F::Scalar) -> Result<Self, JacobianError> {
        let mut jac = Self::zeros(f);
        jac.compute(f, x, time)?;
        Ok(jac)
    }

    /// Computes the Jacobian matrix of the system in given state and time
    /// around the currently stored control input.
    ///
    /// The system is mutable because the control input is perturbed through
    /// [`set_control_input`](DynamicalSystem::set_control_input). The original
    /// control input is restored before this method returns, even on failure.
    pub fn compute(
        &mut self,
        f: &mut F,
        x: &DVector<F::Scalar>,
        time: F::Scalar,
    ) -> Result<&mut Self, JacobianError> {
        check_dim(f.state_space_size(), x.len())?;

        let original = f.control_input().clone();
        let result = self.compute_perturbed(f, x, time, original.clone());
        f.set_control_input(&original)?;
        result?;
        Ok(self)
    }

    fn compute_perturbed(
        &mut self,
        f: &mut F,
        x: &DVector<F::Scalar>,
        time: F::Scalar,
        mut u: DVector<F::Scalar>,
    ) -> Result<(), JacobianError> {
        let n = f.state_space_size();
        f.dynamics(x, time, &mut self.fx)?;
        check_dim(n, self.fx.len())?;

        for j in 0..u.len() {
            let uj = u[j];
            let step = step_size(uj);

            u[j] = uj + step;
            f.set_control_input(&u)?;
            f.dynamics(x, time, &mut self.fx_step)?;
            check_dim(n, self.fx_step.len())?;
            u[j] = uj;

            let mut col = self.jac.column_mut(j);
            col.copy_from(&self.fx_step);
            col -= &self.fx;
            col /= step;
        }

        Ok(())
    }
}

impl<F: DynamicalSystem> Deref for ControlJacobian<F> {
    type Target = DMatrix<F::Scalar>;

    fn deref(&self) -> &Self::Target {
        &self.jac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DynamicalSystemExt;
    use crate::testing::{DoubleIntegrator, Pendulum};

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};

    use crate::core::SystemBuffers;

    // Writes one element more than the declared state dimension.
    struct Overflowing {
        buffers: SystemBuffers<f64>,
    }

    impl DynamicalSystem for Overflowing {
        type Scalar = f64;

        fn buffers(&self) -> &SystemBuffers<f64> {
            &self.buffers
        }

        fn buffers_mut(&mut self) -> &mut SystemBuffers<f64> {
            &mut self.buffers
        }

        fn dynamics(
            &self,
            _state: &DVector<f64>,
            _time: f64,
            state_dynamics: &mut DVector<f64>,
        ) -> Result<(), SystemError> {
            *state_dynamics = DVector::zeros(3);
            Ok(())
        }
    }

    #[test]
    fn double_integrator_state_jacobian() {
        let f = DoubleIntegrator::new();
        let mut x = dvector![1.0, -2.0];

        let jac = StateJacobian::new(&f, &mut x, 0.0).unwrap();
        assert_abs_diff_eq!(&*jac, &dmatrix![0.0, 1.0; 0.0, 0.0], epsilon = 10e-6);
        assert_eq!(x, dvector![1.0, -2.0]);
    }

    #[test]
    fn pendulum_state_jacobian() {
        let mut f = Pendulum::new(1.0, 2.0, 0.1);
        f.set_control_input(&dvector![0.5]).unwrap();
        let mut x = dvector![0.3, -1.0];

        let jac = StateJacobian::new(&f, &mut x, 0.0).unwrap();
        let expected = f.state_jacobian(&x, 0.0).unwrap();
        assert_abs_diff_eq!(&*jac, &expected, epsilon = 10e-6);
    }

    #[test]
    fn pendulum_control_jacobian_restores_control() {
        let mut f = Pendulum::new(0.5, 2.0, 0.0);
        f.set_control_input(&dvector![1.5]).unwrap();
        let x = dvector![0.3, -1.0];

        let jac = ControlJacobian::new(&mut f, &x, 0.0).unwrap();
        let expected = f.control_jacobian(&x, 0.0).unwrap();
        assert_abs_diff_eq!(&*jac, &expected, epsilon = 10e-6);
        assert_eq!(f.control_input(), &dvector![1.5]);
    }

    #[test]
    fn wrong_state_size() {
        let f = DoubleIntegrator::new();
        let mut x = dvector![1.0, 2.0, 3.0];

        assert!(matches!(
            StateJacobian::new(&f, &mut x, 0.0),
            Err(JacobianError::System(SystemError::InvalidDimensionality {
                expected: 2,
                found: 3
            }))
        ));
    }

    #[test]
    fn wrong_dynamics_output_size() {
        let mut f = Overflowing {
            buffers: SystemBuffers::new(2, 1),
        };
        let mut x = dvector![1.0, 2.0];

        assert!(matches!(
            StateJacobian::new(&f, &mut x, 0.0),
            Err(JacobianError::System(SystemError::InvalidDimensionality {
                expected: 2,
                found: 3
            }))
        ));
        assert_eq!(x, dvector![1.0, 2.0]);

        f.set_control_input(&dvector![0.5]).unwrap();
        assert!(matches!(
            ControlJacobian::new(&mut f, &x, 0.0),
            Err(JacobianError::System(SystemError::InvalidDimensionality {
                expected: 2,
                found: 3
            }))
        ));
        assert_eq!(f.control_input(), &dvector![0.5]);
    }

    #[test]
    fn control_jacobian_wrong_state_size() {
        let mut f = DoubleIntegrator::new();
        f.set_control_input(&dvector![1.0]).unwrap();

        assert!(matches!(
            ControlJacobian::new(&mut f, &dvector![1.0, 2.0, 3.0], 0.0),
            Err(JacobianError::System(SystemError::InvalidDimensionality {
                expected: 2,
                found: 3
            }))
        ));
        assert_eq!(f.control_input(), &dvector![1.0]);
    }
}
