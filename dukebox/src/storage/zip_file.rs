use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use zip::ZipArchive;
use crate::storage::Jar;

/// A jar stored at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJar {
	pub path: PathBuf,
}

impl FileJar {
	pub fn new(path: impl Into<PathBuf>) -> FileJar {
		FileJar { path: path.into() }
	}
}

impl Jar for FileJar {
	type Opened<'a> = ZipArchive<BufReader<File>> where Self: 'a;

	fn open(&self) -> Result<Self::Opened<'_>> {
		let file = File::open(&self.path)
			.with_context(|| anyhow!("could not open jar {:?}", self.path))?;
		ZipArchive::new(BufReader::new(file))
			.with_context(|| anyhow!("failed to read zip archive from {:?}", self.path))
	}

	/// Never writes anything, the jar is already stored on disk.
	fn put_to_file<'a>(&'a self, _suggested: &'a Path) -> Result<&'a Path> {
		Ok(&self.path)
	}
}
