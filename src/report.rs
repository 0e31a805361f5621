use std::fmt::Display;

use log::error;

/// Sends an error to the diagnostic sink and hands it back, so that call
/// sites can write `return Err(report(...))`.
pub(crate) fn report<E: Display>(component: &str, operation: &str, err: E) -> E {
    error!("[{}::{}] {}", component, operation, err);
    err
}
