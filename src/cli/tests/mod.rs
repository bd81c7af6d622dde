//! CLI tests module
//!
//! Tests for argument parsing and for command implementations run against a
//! workflow saved in a temporary directory.

mod commands;
mod support;
