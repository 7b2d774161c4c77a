//! Common utilities for the quire layout engine.
//!
//! This crate provides shared infrastructure used by the layout engine and
//! the command line front end:
//! - **Warning System** - deduplicated diagnostics for degraded input

pub mod warning;
