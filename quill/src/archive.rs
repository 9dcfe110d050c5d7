//! Mappings stored inside a jar, in the tiny v2 format.
//!
//! Such a jar contains an entry with a name ending in `mappings.tiny`, usually `mappings/mappings.tiny`.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};
use crate::error::MappingError;
use crate::tree::mappings::MappingTree;

/// The entry name the mappings are written to.
pub const MAPPINGS_ENTRY: &str = "mappings/mappings.tiny";

const MAPPINGS_SUFFIX: &str = "mappings.tiny";

pub fn read_file(path: impl AsRef<Path>) -> Result<MappingTree> {
	let file = File::open(&path)
		.with_context(|| anyhow!("failed to open mappings jar {:?}", path.as_ref()))?;
	read(file)
		.with_context(|| anyhow!("failed to read mappings from jar {:?}", path.as_ref()))
}

/// Reads the mappings from the first entry ending in `mappings.tiny`.
///
/// An empty jar, or one without such an entry, is a [`MappingError::Format`].
pub fn read(reader: impl Read + Seek) -> Result<MappingTree> {
	let mut zip = ZipArchive::new(reader)
		.map_err(|e| MappingError::format(format!("not a zip archive: {e}")))?;

	if zip.len() == 0 {
		return Err(MappingError::format("Mappings jar is empty"));
	}

	let index = (0..zip.len())
		.find(|&index| zip.name_for_index(index).is_some_and(|name| name.ends_with(MAPPINGS_SUFFIX)))
		.ok_or_else(|| MappingError::format(format!("No {MAPPINGS_SUFFIX} found in mappings jar")))?;

	let mut file = zip.by_index(index)?;
	let mut data = Vec::new();
	file.read_to_end(&mut data)
		.with_context(|| anyhow!("failed to read entry {:?}", file.name()))?;

	crate::tiny_v2::read(data.as_slice())
}

/// Writes a jar containing the mappings at [`MAPPINGS_ENTRY`] into a `Vec<u8>`.
pub fn write_vec(tree: &MappingTree) -> Result<Vec<u8>> {
	let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
	write_zip(tree, &mut zip)?;
	Ok(zip.finish()?.into_inner())
}

/// Writes a jar containing the mappings to the given path.
///
/// The jar is first written to a temporary file next to the path, and only moved there once complete.
pub fn write_file(tree: &MappingTree, path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
	std::fs::create_dir_all(parent)
		.with_context(|| anyhow!("failed to create directory {parent:?}"))?;

	let mut temp = NamedTempFile::new_in(parent)
		.with_context(|| anyhow!("failed to create temporary file in {parent:?}"))?;

	let mut zip = ZipWriter::new(temp.as_file_mut());
	write_zip(tree, &mut zip)?;
	zip.finish()?.flush()?;

	temp.persist(path)
		.with_context(|| anyhow!("failed to move mappings jar to {path:?}"))?;
	Ok(())
}

fn write_zip<W: Write + Seek>(tree: &MappingTree, zip: &mut ZipWriter<W>) -> Result<()> {
	zip.start_file(MAPPINGS_ENTRY, FileOptions::<()>::default())?;
	crate::tiny_v2::write(tree, zip)
}

#[cfg(test)]
mod testing {
	use std::io::{Cursor, Write};
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use zip::write::FileOptions;
	use zip::ZipWriter;
	use crate::error::MappingError;
	use crate::tree::mappings::MappingTree;

	fn jar(entries: &[(&str, &str)]) -> Result<Vec<u8>> {
		let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
		for (name, content) in entries {
			zip.start_file(*name, FileOptions::<()>::default())?;
			zip.write_all(content.as_bytes())?;
		}
		Ok(zip.finish()?.into_inner())
	}

	fn is_format_error(error: &anyhow::Error) -> bool {
		matches!(error.downcast_ref::<MappingError>(), Some(MappingError::Format(_)))
	}

	#[test]
	fn finds_payload_by_suffix() -> Result<()> {
		let data = jar(&[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n"), ("a/b/mappings.tiny", "tiny\t2\t0\tofficial\tnamed\nc\ta\tApple\n")])?;
		let tree = super::read(Cursor::new(data))?;
		tree.namespaces().check_that(&["official", "named"])?;
		assert_eq!(tree.class_count(), 1);
		Ok(())
	}

	#[test]
	fn empty_and_missing_payload() -> Result<()> {
		let error = super::read(Cursor::new(jar(&[])?)).unwrap_err();
		assert!(is_format_error(&error), "{error:?}");

		let error = super::read(Cursor::new(jar(&[("readme.txt", "hi")])?)).unwrap_err();
		assert!(is_format_error(&error), "{error:?}");
		Ok(())
	}

	#[test]
	fn written_file_reads_back() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("cache").join("mappings.jar");

		let mut tree = MappingTree::with_namespaces(&["official", "named"])?;
		let official = tree.require_namespace("official")?;
		let named = tree.require_namespace("named")?;
		let a = tree.get_or_create_class(official, "a")?;
		tree.set_class_name(a, named, Some("Apple"))?;

		super::write_file(&tree, &path)?;
		assert_eq!(super::read_file(&path)?, tree);
		assert_eq!(super::read(Cursor::new(super::write_vec(&tree)?))?, tree);
		Ok(())
	}
}
