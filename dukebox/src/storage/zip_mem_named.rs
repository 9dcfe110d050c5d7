use anyhow::{anyhow, Context, Result};
use std::fmt::{Debug, Formatter};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipArchive;
use crate::storage::Jar;

/// A jar held in memory, with a name for messages.
#[derive(Clone, PartialEq, Eq)]
pub struct NamedMemJar {
	pub name: String,
	/// The bytes of the zip archive.
	pub data: Vec<u8>,
}

impl NamedMemJar {
	pub fn new(name: impl Into<String>, data: Vec<u8>) -> NamedMemJar {
		NamedMemJar { name: name.into(), data }
	}
}

/// [`Debug`] only prints the name and size, not the actual data.
impl Debug for NamedMemJar {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NamedMemJar")
			.field("name", &self.name)
			.field("size", &self.data.len())
			.finish_non_exhaustive()
	}
}

impl Jar for NamedMemJar {
	type Opened<'a> = ZipArchive<Cursor<&'a [u8]>> where Self: 'a;

	fn open(&self) -> Result<Self::Opened<'_>> {
		ZipArchive::new(Cursor::new(self.data.as_slice()))
			.with_context(|| anyhow!("failed to read zip archive from {self:?}"))
	}

	/// Writes the data to the suggested path, through a temporary file.
	fn put_to_file<'a>(&'a self, suggested: &'a Path) -> Result<&'a Path> {
		let mut temp = crate::storage::writer::temp_file_for(suggested)?;
		temp.write_all(&self.data)
			.with_context(|| anyhow!("failed to write in-memory jar {:?}", self.name))?;
		temp.persist(suggested)
			.with_context(|| anyhow!("failed to move in-memory jar {:?} to {suggested:?}", self.name))?;
		Ok(suggested)
	}
}
