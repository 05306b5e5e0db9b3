//! Emits a resolved layout as `ftyp`, `moov`, `mdat`.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::Builder;
use tracing::{debug, info};

use crate::error::{RemuxError, Result};
use crate::layout::ResolvedLayout;

/// Write the file to `writer` in fast-start order. Returns bytes written.
pub fn write_layout<W: Write>(layout: &ResolvedLayout<'_>, writer: &mut W) -> io::Result<u64> {
    writer.write_all(&layout.ftyp)?;
    writer.write_all(&layout.moov)?;
    let mdat = layout.mdat.write_stream(writer)?;
    writer.flush()?;
    Ok(layout.ftyp.len() as u64 + layout.moov.len() as u64 + mdat)
}

/// Write the file to `path`, replacing whatever was there.
///
/// Bytes are staged in a temporary file in the destination directory and only
/// renamed over `path` once fully flushed, so a failed write never leaves a
/// truncated destination behind. A replaced destination keeps its
/// permissions; a new one gets the usual mode for a created file.
pub fn write_file(layout: &ResolvedLayout<'_>, path: &Path) -> Result<u64> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let to_err = |err: io::Error| RemuxError::destination_io(Some(path.to_path_buf()), err);

    let existing = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(to_err(err)),
    };
    let mut builder = Builder::new();
    builder.prefix(".opus-remux");
    if let Some(permissions) = staged_permissions(existing.as_ref()) {
        builder.permissions(permissions);
    }
    let staged = builder.tempfile_in(dir).map_err(to_err)?;
    debug!(staging = %staged.path().display(), "staging output");

    let written = {
        let mut out = BufWriter::new(staged.as_file());
        write_layout(layout, &mut out).map_err(to_err)?
    };
    staged.as_file().sync_all().map_err(to_err)?;

    let file = staged.persist(path).map_err(|err| to_err(err.error))?;
    // The create mode was narrowed by the umask; a replaced file keeps its own.
    if let Some(permissions) = existing {
        file.set_permissions(permissions).map_err(to_err)?;
    }

    info!(path = %path.display(), bytes = written, "wrote mp4");
    Ok(written)
}

/// Mode for the staged file. Without an existing destination this is `0666`,
/// which the process umask narrows at creation like any other new file.
#[cfg(unix)]
fn staged_permissions(existing: Option<&fs::Permissions>) -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(existing.cloned().unwrap_or_else(|| fs::Permissions::from_mode(0o666)))
}

#[cfg(not(unix))]
fn staged_permissions(existing: Option<&fs::Permissions>) -> Option<fs::Permissions> {
    existing.cloned()
}
