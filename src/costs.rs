//! Ready-made costs.
//!
//! * [Quadratic](quadratic) -- General quadratic cost with time-varying
//!   Hessian and gradient providers.
//! * [L2 norm](l2_norm) -- Weighted tracking of a desired point or trajectory
//!   by selected state and control components.

pub mod l2_norm;
pub mod quadratic;
mod tracking;

pub use l2_norm::L2NormCost;
pub use quadratic::{QuadraticCost, QuadraticTerm, SharedHessian};
