//! Test elements: fixed-size payloads with random content, backed by temporary files.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tempfile::{Builder, TempPath};

use crate::entry::ElementSpec;
use crate::error::{MatrixError, MatrixResult};

/// Random data is generated and written in chunks of this size.
const CHUNK_SIZE: usize = 64 * 1024;

/// A single test object of a matrix.
///
/// The element owns its backing file, which is deleted when the element is dropped. Use
/// [`keep`](Self::keep) to retain it.
#[derive(Debug)]
pub struct TestElement {
    tag: String,
    path: TempPath,
    size: u64,
}

impl TestElement {
    /// Parses `tag=size` and creates the backing file.
    ///
    /// The file is created in `dir`, or in the platform temp directory if `None`. Its name starts
    /// with `{agent_id}_{tag}` followed by a random suffix, so concurrent agents and repeated runs
    /// never collide.
    pub fn build(
        agent_id: &str,
        entry: &str,
        dir: Option<&Path>,
        debug: bool,
    ) -> MatrixResult<Self> {
        let spec = ElementSpec::parse(entry)?;
        Self::from_spec(agent_id, spec, dir, debug)
    }

    /// Creates the backing file for an already parsed entry.
    pub fn from_spec(
        agent_id: &str,
        spec: ElementSpec,
        dir: Option<&Path>,
        debug: bool,
    ) -> MatrixResult<Self> {
        let ElementSpec { tag, size } = spec;
        let io_error = |stage: &'static str| {
            let tag = tag.clone();
            move |source| MatrixError::TempFile { tag, stage, source }
        };

        let prefix = format!("{agent_id}_{tag}");
        let mut builder = Builder::new();
        builder.prefix(&prefix);
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(io_error("create"))?;

        tracing::trace!(path = %file.path().display(), "created temp file");

        let mut rng = StdRng::try_from_os_rng().map_err(|err| MatrixError::Random(err.into()))?;
        let mut writer = BufWriter::new(file);
        write_random(&mut writer, &mut rng, size).map_err(io_error("write"))?;

        let file = writer
            .into_inner()
            .map_err(|err| err.into_error())
            .map_err(io_error("write"))?;
        file.as_file().sync_all().map_err(io_error("close"))?;
        let path = file.into_temp_path();

        if debug {
            tracing::info!(
                tag = %tag,
                path = %path.display(),
                size = %ByteSize::b(size),
                "created test element"
            );
        }

        Ok(Self { tag, path, size })
    }

    /// The label of this element in reported metrics.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the backing file in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Keeps the backing file on disk after this element is dropped, returning its path.
    pub fn keep(self) -> io::Result<PathBuf> {
        self.path.keep().map_err(|err| err.error)
    }
}

fn write_random(writer: &mut impl Write, rng: &mut impl RngCore, size: u64) -> io::Result<()> {
    // On 32-bit targets `remaining` may not fit into `usize`.
    let chunk_len =
        |remaining: u64| usize::try_from(remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE));
    let mut chunk = vec![0; chunk_len(size)];
    let mut remaining = size;

    while remaining > 0 {
        let len = chunk_len(remaining);
        let buf = &mut chunk[..len];
        rng.fill_bytes(buf);
        writer.write_all(buf)?;
        remaining -= len as u64;
    }

    writer.flush()
}
