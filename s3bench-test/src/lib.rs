//! Test utilities for s3bench.
//!
//! This crate provides utilities to facilitate testing of the benchmark setup. See the modules for
//! all available utilities.

pub mod statsd;
pub mod tracing;
