//! Outbound adapters implementing the domain ports.
//!
//! - **memory**: an in-process authentication provider and store used by
//!   the walkthrough binary and the integration tests.
//!
//! Adapters translate between their own representation and domain types
//! and report failures through the port error enums. They hold no
//! business rules beyond the policies the real store enforces itself.

pub mod memory;
