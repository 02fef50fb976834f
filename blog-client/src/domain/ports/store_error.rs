//! Errors shared by the profile and post store ports.

use super::{Constraint, define_port_error};

define_port_error! {
    /// Failures reported by the persistent store.
    pub enum StoreError {
        /// The store could not be reached or the request timed out.
        Transport { message: String } => "store transport failed: {message}",
        /// The addressed record does not exist.
        NotFound { message: String } => "store record not found: {message}",
        /// A unique constraint rejected the write.
        ConstraintViolation { constraint: Constraint } => "store constraint violated: {constraint}",
        /// A store-side access policy refused the request.
        Rejected { message: String } => "store rejected the request: {message}",
    }
}
