//! Core library components.
//!
//! Key derivation, the encrypted store, profile management, and the runner
//! that materializes profiles for a command.

pub mod agent;
pub mod check;
pub mod cipher;
pub mod config;
pub mod constants;
pub mod domain;
pub mod paths;
pub mod profiles;
pub mod resolve;
pub mod rotate;
pub mod runner;
pub mod store;
pub mod validation;
