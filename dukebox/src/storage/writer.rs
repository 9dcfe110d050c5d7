//! Writing new jars.
//!
//! Jars written to disk first go to a temporary file in the same directory. Only once everything is written, the file is
//! moved to its destination. If writing fails, the temporary file is deleted, so that a half written jar is never seen.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use zip::ZipWriter;
use crate::storage::{JarEntry, JarEntryEnum};

/// Creates the parent directory of `path`, and a temporary file in it.
pub(crate) fn temp_file_for(path: &Path) -> Result<NamedTempFile> {
	let parent = path.parent()
		.filter(|parent| !parent.as_os_str().is_empty())
		.unwrap_or(Path::new("."));
	std::fs::create_dir_all(parent)
		.with_context(|| anyhow!("failed to create directory {parent:?}"))?;
	NamedTempFile::new_in(parent)
		.with_context(|| anyhow!("failed to create temporary file in {parent:?}"))
}

/// Writes a new jar to `path`, with the entries `f` writes.
///
/// An existing file at `path` is only replaced if `f` succeeds.
pub fn write_file<T>(path: &Path, f: impl FnOnce(&mut ZipWriter<&mut File>) -> Result<T>) -> Result<T> {
	let mut temp = temp_file_for(path)?;

	let mut zip = ZipWriter::new(temp.as_file_mut());
	let value = f(&mut zip)?;
	zip.finish()
		.with_context(|| anyhow!("failed to finish writing jar {path:?}"))?
		.flush()?;

	temp.persist(path)
		.with_context(|| anyhow!("failed to move jar to {path:?}"))?;
	Ok(value)
}

/// Writes a new jar into a `Vec<u8>`.
pub fn write_vec<T>(f: impl FnOnce(&mut ZipWriter<Cursor<Vec<u8>>>) -> Result<T>) -> Result<(T, Vec<u8>)> {
	let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
	let value = f(&mut zip)?;
	Ok((value, zip.finish()?.into_inner()))
}

/// Writes a single entry, keeping its file times.
pub fn write_entry<W: Write + Seek>(zip: &mut ZipWriter<W>, entry: &JarEntry) -> Result<()> {
	let options = entry.attrs.to_file_options();
	match &entry.data {
		JarEntryEnum::Dir => {
			zip.add_directory(entry.name.as_str(), options)
				.with_context(|| anyhow!("failed to add directory {:?}", entry.name))?;
		},
		JarEntryEnum::Class(data) | JarEntryEnum::Other(data) => {
			zip.start_file(entry.name.as_str(), options)
				.with_context(|| anyhow!("failed to start entry {:?}", entry.name))?;
			zip.write_all(data)
				.with_context(|| anyhow!("failed to write entry {:?}", entry.name))?;
		},
	}
	Ok(())
}
