//! # quards (library)
//!
//! The binary's configuration and command layer, exposed as a library so
//! integration tests can drive commands without spawning a process.

pub mod cli;
pub mod config;
