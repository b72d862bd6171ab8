//! Core library for the SSA registry service.
//!
//! The issuance workflow lives under [`workflows::issuance`]; everything else
//! here is service plumbing (configuration, telemetry, in-memory stores, and
//! the top-level error type used by the binary).

pub mod config;
pub mod error;
pub mod infra;
pub mod telemetry;
pub mod workflows;
