//! Blog publishing client core.
//!
//! Authenticated users manage a profile and author posts that are either
//! drafts or published; anonymous visitors read published posts by author
//! or by slug. This crate owns the session-scoped authorization and
//! content-visibility model. The persistent store and the authentication
//! provider are reached through the ports in [`domain::ports`];
//! [`outbound::memory`] provides an in-process implementation of both.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;
