//! Maestro command-line driver
//!
//! Parses arguments, loads configuration and runs one SDK operation per
//! invocation.

pub mod cli;
pub mod commands;
pub mod config;
