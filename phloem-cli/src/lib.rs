//! Phloem CLI library
//!
//! Exposes profile configuration, list loading and report output for the
//! `phloem` binary and its tests.

pub mod config;
pub mod lists;
pub mod output;
