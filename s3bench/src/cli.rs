use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use bytesize::ByteSize;
use yansi::Paint;

use crate::config::{Config, Overrides};
use crate::connection::S3Connection;
use crate::matrix::TestMatrix;
use crate::observability;

/// Prepares the test matrix for an S3 benchmark agent.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// log every test element as it is created
    #[argh(switch, short = 'd')]
    debug: bool,

    /// address of the StatsD collector, as `host[:port]`
    #[argh(option)]
    statsd: Option<String>,

    /// namespace for all metric keys (default: `s3b`)
    #[argh(option)]
    prefix: Option<String>,

    /// comma-separated `tag=size` pairs describing the test objects
    #[argh(option, short = 'm')]
    matrix: Option<String>,

    /// identifier of this agent (default: random)
    #[argh(option)]
    agent_id: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            debug: self.debug.then_some(true),
            statsd: self.statsd.clone(),
            prefix: self.prefix.clone(),
            matrix: self.matrix.clone(),
            agent_id: self.agent_id.clone(),
        }
    }
}

/// Parses the command line and builds the test matrix.
///
/// Any failure is returned, which makes the process print it and exit with a nonzero status.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let config = Config::load(args.config.as_deref(), &args.overrides())
        .context("failed to load configuration")?;

    observability::init_tracing(&config);
    tracing::debug!(?config);

    prepare(&config)
}

fn prepare(config: &Config) -> Result<()> {
    let agent_id = config.agent_id();
    tracing::info!(agent_id = %agent_id, "preparing test matrix");

    let connection = S3Connection::new(&config.storage)?;
    tracing::debug!(?connection);

    let matrix = TestMatrix::build(&agent_id, connection, config)?;
    print_matrix(&matrix);
    matrix.metrics().check()?;

    if config.keep_files {
        let (_connection, elements, _metrics) = matrix.into_parts();
        for element in elements {
            let path = element.keep().context("failed to keep element file")?;
            tracing::debug!(path = %path.display(), "kept element file");
        }
    }

    Ok(())
}

fn print_matrix<C>(matrix: &TestMatrix<C>) {
    println!(
        "{} {} ({} elements, {})",
        "## Matrix".bold(),
        matrix.agent_id().bold().blue(),
        matrix.elements().len().bold(),
        ByteSize::b(matrix.total_size()).bold()
    );

    for element in matrix.elements() {
        println!(
            "  {} {:>10}  {}",
            element.tag().green(),
            ByteSize::b(element.size()),
            element.path().display().dim()
        );
    }
}
