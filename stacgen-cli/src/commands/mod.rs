//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, path)
//! - [`generate`] - One-shot item assembly from a job file
//! - [`parsers`] - Registered metadata parsers
//! - [`validate`] - Cloud-optimized GeoTIFF check
//! - [`worker`] - Queue worker (main command)

pub mod config;
pub mod generate;
pub mod parsers;
pub mod validate;
pub mod worker;
