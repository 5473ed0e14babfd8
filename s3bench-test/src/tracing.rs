use tracing_subscriber::EnvFilter;

/// Log targets that are captured at full verbosity in tests.
const TARGETS: &[&str] = &["s3bench", "s3bench_test"];

/// Sets up logging for a test.
///
/// Output goes through the test runner's capture, so it only shows up for failing tests. If
/// `RUST_LOG` is set, it is used as-is; otherwise all benchmark targets log at `TRACE` and
/// everything else at `WARN`. Calling this more than once is harmless.
///
/// # Example
///
/// ```
/// s3bench_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        TARGETS.iter().fold(EnvFilter::new("WARN"), |filter, target| {
            filter.add_directive(format!("{target}=TRACE").parse().unwrap())
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .without_time()
        .compact()
        .try_init()
        .ok();
}
