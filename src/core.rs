//! Core abstractions and types.
//!
//! *Users* are mainly interested in implementing the [`DynamicalSystem`]
//! trait and in configuring the ready-made [costs](crate::costs). Costs with
//! custom algebra implement the [`Cost`] trait, usually with the help of
//! [`TimeVarying`] providers.

mod cost;
mod sparsity;
mod system;
mod trajectory;

pub use cost::*;
pub use sparsity::*;
pub use system::*;
pub use trajectory::*;
