//! Core types and orchestration for the Circle profile screen.
//!
//! This crate is deliberately free of HTTP and terminal dependencies. It owns
//! the rule that the viewer's record and the profile subject's record are
//! always re-fetched together after anything that could change either of them.

pub mod affordance;
pub mod controller;
pub mod edit;
pub mod error;
pub mod format;
pub mod session;
pub mod source;
pub mod user;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
