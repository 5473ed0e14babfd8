//! Setup stage of a load test against an S3-compatible object storage service.
//!
//! A benchmark run works on a [`TestMatrix`]: a fixed set of named payloads with random contents,
//! written to temporary files, together with a StatsD client for reporting and a connection handle
//! to the service under test. The matrix is described by a string of `tag=size` pairs:
//!
//! ```text
//! small=1024,medium=0x10000,large=16777216
//! ```
//!
//! Each *tag* labels the payload in reported metrics, each *size* is the payload length in bytes.
//! Parsing lives in [`entry`], file creation in [`element`], and the assembly of a whole matrix in
//! [`matrix`].
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod connection;
pub mod element;
pub mod entry;
pub mod error;
pub mod matrix;
pub mod metrics;
pub mod observability;

pub use crate::element::TestElement;
pub use crate::error::{MatrixError, MatrixResult};
pub use crate::matrix::TestMatrix;
