//! CLI module for the purebg library
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{exit_code_for, main, Cli, CliOutputFormat};
