//! Prepares the test matrix of an S3 benchmark agent.
//!
//! See [`s3bench::cli`] for the available options.
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    s3bench::cli::execute()
}
