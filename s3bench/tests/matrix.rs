use std::collections::HashSet;
use std::fs;

use s3bench::config::Config;
use s3bench::{MatrixError, TestMatrix};
use s3bench_test::statsd::TestCollector;

fn config(collector: &TestCollector, matrix: &str) -> Config {
    Config {
        statsd: Some(collector.addr().to_string()),
        matrix: Some(matrix.into()),
        ..Default::default()
    }
}

#[test]
fn repeated_runs_use_distinct_paths() {
    s3bench_test::tracing::init();
    let collector = TestCollector::new();
    let config = config(&collector, "a=16,b=32");

    let first = TestMatrix::build("agent", (), &config).unwrap();
    let second = TestMatrix::build("agent", (), &config).unwrap();

    let paths: HashSet<_> = first
        .elements()
        .iter()
        .chain(second.elements())
        .map(|element| element.path().to_owned())
        .collect();
    assert_eq!(paths.len(), 4);

    assert_eq!(collector.received().len(), 2);
}

#[test]
fn agents_do_not_collide() {
    let collector = TestCollector::new();
    let config = config(&collector, "shared=8");

    let one = TestMatrix::build("agent-1", (), &config).unwrap();
    let two = TestMatrix::build("agent-2", (), &config).unwrap();

    let one = one.element("shared").unwrap();
    let two = two.element("shared").unwrap();
    assert_ne!(one.path(), two.path());
    assert_eq!(fs::read(one.path()).unwrap().len(), 8);
    assert_eq!(fs::read(two.path()).unwrap().len(), 8);
}

#[test]
fn connection_is_handed_over() {
    #[derive(Debug, PartialEq)]
    struct Connection(&'static str);

    let collector = TestCollector::new();
    let matrix = TestMatrix::build("agent", Connection("s3"), &config(&collector, "a=1")).unwrap();

    assert_eq!(matrix.connection(), &Connection("s3"));

    let (connection, elements, metrics) = matrix.into_parts();
    assert_eq!(connection, Connection("s3"));
    assert_eq!(elements.len(), 1);
    metrics.check().unwrap();
}

#[test]
fn errors_name_offending_value() {
    let collector = TestCollector::new();

    let err = TestMatrix::build("agent", (), &config(&collector, "a=1,b=0x")).unwrap_err();
    assert!(matches!(err, MatrixError::InvalidSize { ref value, .. } if value == "0x"));
    assert_eq!(err.to_string(), "unable to convert `0x` to an integer");
}
