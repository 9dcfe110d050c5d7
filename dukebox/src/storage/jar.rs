use std::path::Path;
use anyhow::Result;
use quill::remapper::SuperClasses;
use crate::storage::OpenedJar;

/// Represents a `.jar` in some form.
///
/// This can be in memory, like [`NamedMemJar`][crate::storage::NamedMemJar], or a file, like
/// [`FileJar`][crate::storage::FileJar].
///
/// You can [`open`][Jar::open] a jar to get to its content. See [`OpenedJar`] for more.
///
/// A [`Jar`] also provides a method to store it to a suggested path. Note that the suggested path may
/// also not be used (like [`FileJar`][crate::storage::FileJar] does).
pub trait Jar {
	type Opened<'a>: OpenedJar where Self: 'a;

	/// Opens the jar for reading.
	fn open(&self) -> Result<Self::Opened<'_>>;

	/// Asks the jar implementation for storing the jar to the suggested path.
	///
	/// Returns the path the jar was actually stored to.
	///
	/// The reason for a suggested path only is that some implementors (like [`FileJar`][crate::storage::FileJar]) are
	/// already stored on disk, and this would require copying the file.
	fn put_to_file<'a>(&'a self, suggested: &'a Path) -> Result<&'a Path>;

	/// Reads the super class and interfaces of every class in the jar.
	fn super_classes(&self) -> Result<SuperClasses> {
		self.open()?.super_classes()
	}
}
