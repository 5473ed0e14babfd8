//! The test matrix: all test elements plus the run metadata of one benchmark invocation.

use crate::config::Config;
use crate::element::TestElement;
use crate::entry::parse_matrix;
use crate::error::{MatrixError, MatrixResult};
use crate::metrics::{DEFAULT_PREFIX, MetricsReporter};

/// Everything the benchmark driver needs for one run.
///
/// `C` is the connection handle for the storage service under test. The matrix does not use it,
/// it only hands it over to the driver.
#[derive(Debug)]
pub struct TestMatrix<C> {
    agent_id: String,
    connection: C,
    elements: Vec<TestElement>,
    metrics: MetricsReporter,
    debug: bool,
}

impl<C> TestMatrix<C> {
    /// Builds the matrix described by `config`.
    ///
    /// Validation happens before any side effect. A missing `statsd` host or `matrix` fails first,
    /// then the whole matrix string is parsed, including the check for duplicate tags. After that,
    /// the metrics client is created and this agent is registered with one `agent_id` increment.
    /// Finally, one element is created per entry, in order.
    ///
    /// No partial matrix is ever returned. If creating an element fails, the files of all elements
    /// created so far are removed.
    pub fn build(agent_id: &str, connection: C, config: &Config) -> MatrixResult<Self> {
        let debug = config.debug;

        let statsd_host = match config.statsd.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => host,
            _ => return Err(MatrixError::MissingStatsdHost),
        };
        if debug {
            tracing::info!(statsd_host, "using statsd host");
        }

        let prefix = config.prefix();
        if config.prefix.as_deref().is_none_or(str::is_empty) {
            tracing::info!("statsd prefix not defined, using standard `{DEFAULT_PREFIX}` prefix");
        } else if debug {
            tracing::info!(prefix, "using statsd prefix");
        }

        let matrix = config.matrix.as_deref().unwrap_or_default();
        let specs = parse_matrix(matrix)?;

        let metrics = MetricsReporter::new(statsd_host, prefix)?;
        metrics.register_agent()?;

        let scratch_dir = config.scratch_dir.as_deref();
        let elements = specs
            .into_iter()
            .map(|spec| TestElement::from_spec(agent_id, spec, scratch_dir, debug))
            .collect::<MatrixResult<Vec<_>>>()?;

        tracing::debug!(agent_id, elements = elements.len(), "built test matrix");

        Ok(Self {
            agent_id: agent_id.to_owned(),
            connection,
            elements,
            metrics,
            debug,
        })
    }

    /// Identifier of the agent running this matrix.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Connection handle for the storage service under test.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// All test elements, in the order they were specified.
    pub fn elements(&self) -> &[TestElement] {
        &self.elements
    }

    /// Looks up an element by its tag.
    pub fn element(&self, tag: &str) -> Option<&TestElement> {
        self.elements.iter().find(|element| element.tag() == tag)
    }

    /// The metrics reporter for this run.
    pub fn metrics(&self) -> &MetricsReporter {
        &self.metrics
    }

    /// Whether verbose logging was requested.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Total size of all test elements in bytes.
    pub fn total_size(&self) -> u64 {
        self.elements.iter().map(TestElement::size).sum()
    }

    /// Splits the matrix into its parts, giving up ownership of the elements.
    pub fn into_parts(self) -> (C, Vec<TestElement>, MetricsReporter) {
        (self.connection, self.elements, self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use s3bench_test::statsd::TestCollector;

    use super::*;

    fn config(statsd: Option<String>, matrix: Option<&str>, dir: &Path) -> Config {
        Config {
            statsd,
            matrix: matrix.map(str::to_owned),
            scratch_dir: Some(dir.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn builds_elements_in_order() {
        s3bench_test::tracing::init();
        let collector = TestCollector::new();
        let dir = tempfile::tempdir().unwrap();
        let config = config(
            Some(collector.addr().to_string()),
            Some("a=10,b=0,c=4096"),
            dir.path(),
        );

        let matrix = TestMatrix::build("agent-1", (), &config).unwrap();

        let elements: Vec<_> = matrix
            .elements()
            .iter()
            .map(|e| (e.tag(), e.size(), fs::metadata(e.path()).unwrap().len()))
            .collect();
        assert_eq!(elements, [("a", 10, 10), ("b", 0, 0), ("c", 4096, 4096)]);
        assert_eq!(matrix.agent_id(), "agent-1");
        assert_eq!(matrix.total_size(), 4106);
        assert_eq!(matrix.element("b").unwrap().size(), 0);
        assert!(!matrix.debug());

        assert_eq!(collector.received(), ["s3b.agent_id:1|c"]);
        assert_eq!(matrix.metrics().prefix(), DEFAULT_PREFIX);
    }

    #[test]
    fn uses_configured_prefix() {
        let collector = TestCollector::new();
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            prefix: Some("bench".into()),
            debug: true,
            ..config(Some(collector.addr().to_string()), Some("x=1"), dir.path())
        };

        let matrix = TestMatrix::build("agent-1", (), &config).unwrap();

        assert!(matrix.debug());
        assert_eq!(collector.received(), ["bench.agent_id:1|c"]);
    }

    #[test]
    fn missing_statsd_host_fails_first() {
        let dir = tempfile::tempdir().unwrap();

        for statsd in [None, Some(String::new()), Some("  ".into())] {
            let config = config(statsd, Some("a=1"), dir.path());
            let err = TestMatrix::build("agent-1", (), &config).unwrap_err();
            assert!(matches!(err, MatrixError::MissingStatsdHost), "{err:?}");
        }

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_matrix_fails_before_metrics() {
        let collector = TestCollector::new();
        let dir = tempfile::tempdir().unwrap();

        for matrix in [None, Some("")] {
            let config = config(Some(collector.addr().to_string()), matrix, dir.path());
            let err = TestMatrix::build("agent-1", (), &config).unwrap_err();
            assert!(matches!(err, MatrixError::MissingMatrix), "{err:?}");
        }

        assert!(collector.received().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn invalid_entry_has_no_side_effects() {
        let collector = TestCollector::new();
        let dir = tempfile::tempdir().unwrap();

        for matrix in ["a=1,b=big", "a=1,a=2", "a=1,,b=2"] {
            let config = config(Some(collector.addr().to_string()), Some(matrix), dir.path());
            assert!(TestMatrix::build("agent-1", (), &config).is_err(), "{matrix}");
        }

        assert!(collector.received().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_element_removes_created_files() {
        let collector = TestCollector::new();
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        fs::create_dir(&scratch).unwrap();

        // A tag with a path separator makes file creation fail after `a` was written.
        let config = config(
            Some(collector.addr().to_string()),
            Some("a=10,nested/b=10"),
            &scratch,
        );
        let err = TestMatrix::build("agent-1", (), &config).unwrap_err();

        assert!(
            matches!(&err, MatrixError::TempFile { stage: "create", .. }),
            "{err:?}"
        );
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[test]
    fn dropping_matrix_removes_files() {
        let collector = TestCollector::new();
        let dir = tempfile::tempdir().unwrap();
        let config = config(Some(collector.addr().to_string()), Some("a=1,b=2"), dir.path());

        let matrix = TestMatrix::build("agent-1", (), &config).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);

        drop(matrix);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
