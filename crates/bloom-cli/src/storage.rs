//! Filter files on disk
//!
//! A filter file holds exactly the wire encoding of one filter. Writes go to
//! a temporary file in the target directory which is then renamed over the
//! target, so readers see either the old or the new filter, never a mix.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use bloom_filters::AnyFilter;
use tempfile::NamedTempFile;
use tracing::debug;

/// Read and decode a filter file
pub fn read_filter(path: &Path) -> Result<AnyFilter> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read filter file {}", path.display()))?;
    let filter = AnyFilter::from_bytes(&bytes)
        .with_context(|| format!("Corrupt filter file {}", path.display()))?;
    debug!(
        "[bloom] Loaded {} filter {} from {}",
        filter.layout(),
        filter.params(),
        path.display()
    );
    Ok(filter)
}

/// Atomically write a filter file
///
/// With `overwrite` false an existing file at `path` is an error and is
/// left untouched.
pub fn write_filter(path: &Path, filter: &AnyFilter, overwrite: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(&filter.to_bytes())
        .context("Failed to write filter bytes")?;
    tmp.as_file()
        .sync_all()
        .context("Failed to flush filter bytes")?;

    if overwrite {
        tmp.persist(path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
    } else {
        if path.exists() {
            bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        tmp.persist_noclobber(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }

    debug!("[bloom] Wrote {} filter to {}", filter.layout(), path.display());
    Ok(())
}
