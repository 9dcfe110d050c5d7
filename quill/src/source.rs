//! The mapping files given to a [`MappingResolver`][crate::provider::MappingResolver].

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{anyhow, bail, Context, Error, Result};
use crate::error::MappingError;

/// The coordinate of the dependency a mapping file comes from.
///
/// Only the name and version are used, for the identity key of the resolved mappings.
///
/// Parses from `group:name:version` and `name:version`, and displays in the same format.
/// ```
/// use std::str::FromStr;
/// # use pretty_assertions::assert_eq;
/// use quill::source::Coord;
///
/// let a = Coord::from_str("net.fabricmc:yarn:1.20.1+build.10").unwrap();
/// assert_eq!(a.group.as_deref(), Some("net.fabricmc"));
/// assert_eq!(a.to_string(), "net.fabricmc:yarn:1.20.1+build.10");
///
/// let b = Coord::from_str("mojmap:1.20.1").unwrap();
/// assert_eq!(b.group, None);
/// assert_eq!(b.key(), "mojmap-1.20.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coord {
	pub group: Option<String>,
	pub name: String,
	pub version: String,
}

impl Coord {
	pub fn new(name: &str, version: &str) -> Coord {
		Coord { group: None, name: name.to_owned(), version: version.to_owned() }
	}

	/// The part this coordinate contributes to the identity key.
	pub fn key(&self) -> String {
		format!("{}-{}", self.name, self.version)
	}
}

impl Display for Coord {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(group) = &self.group {
			write!(f, "{group}:")?;
		}
		write!(f, "{}:{}", self.name, self.version)
	}
}

impl FromStr for Coord {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts: Vec<&str> = s.split(':').collect();
		let (group, name, version) = match parts.as_slice() {
			[name, version] => (None, *name, *version),
			[group, name, version] => (Some(*group), *name, *version),
			_ => bail!("expected `group:name:version` or `name:version`, got {s:?}"),
		};
		if name.is_empty() || version.is_empty() {
			bail!("name and version may not be empty: {s:?}");
		}
		Ok(Coord {
			group: group.map(str::to_owned),
			name: name.to_owned(),
			version: version.to_owned(),
		})
	}
}

/// How a mapping file is read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceKind {
	/// Tiny v2, with any number of namespaces.
	Columnar,
	/// ProGuard mappings, from the readable names to the obfuscated ones.
	TwoColumn,
	/// A jar containing a tiny v2 file.
	Archive,
}

impl SourceKind {
	/// Detects the kind from the file name. Unknown file names are a [`MappingError::Format`].
	pub fn detect(path: &Path) -> Result<SourceKind> {
		let file_name = path.file_name()
			.and_then(|name| name.to_str())
			.with_context(|| anyhow!("mapping source {path:?} has no file name"))?;
		let extension = path.extension().and_then(|extension| extension.to_str()).unwrap_or("");

		if extension.eq_ignore_ascii_case("zip") || extension.eq_ignore_ascii_case("jar") {
			Ok(SourceKind::Archive)
		} else if extension == "tiny" {
			Ok(SourceKind::Columnar)
		} else if file_name == "client_mappings.txt" || file_name == "server_mappings.txt" || extension == "txt" {
			Ok(SourceKind::TwoColumn)
		} else {
			Err(MappingError::format(format!("unknown mapping source type for file {path:?}")))
		}
	}
}

/// A mapping file, together with where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSource {
	pub coord: Coord,
	pub path: PathBuf,
}

impl MappingSource {
	pub fn new(coord: Coord, path: impl Into<PathBuf>) -> MappingSource {
		MappingSource { coord, path: path.into() }
	}

	pub fn kind(&self) -> Result<SourceKind> {
		SourceKind::detect(&self.path)
	}
}

#[cfg(test)]
mod testing {
	use std::path::Path;
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::error::MappingError;
	use crate::source::{Coord, SourceKind};

	#[test]
	fn kinds_from_file_names() -> Result<()> {
		assert_eq!(SourceKind::detect(Path::new("a/yarn-1.20.1-v2.jar"))?, SourceKind::Archive);
		assert_eq!(SourceKind::detect(Path::new("intermediary.ZIP"))?, SourceKind::Archive);
		assert_eq!(SourceKind::detect(Path::new("mappings.tiny"))?, SourceKind::Columnar);
		assert_eq!(SourceKind::detect(Path::new("x/client_mappings.txt"))?, SourceKind::TwoColumn);

		let error = SourceKind::detect(Path::new("mappings.srg")).unwrap_err();
		assert!(matches!(error.downcast_ref::<MappingError>(), Some(MappingError::Format(_))));
		Ok(())
	}

	#[test]
	fn bad_coords() {
		assert!("a".parse::<Coord>().is_err());
		assert!("a:b:c:d".parse::<Coord>().is_err());
		assert!("a:".parse::<Coord>().is_err());
	}
}
