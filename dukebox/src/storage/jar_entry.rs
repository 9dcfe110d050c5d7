use std::fmt::{Debug, Formatter};
use crate::storage::BasicFileAttributes;

/// An entry of a jar, read into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct JarEntry {
	pub name: String,
	pub attrs: BasicFileAttributes,
	pub data: JarEntryEnum,
}

impl JarEntry {
	/// The name of the class stored in this entry, based on the path only.
	pub fn class_name(&self) -> Option<&str> {
		match self.data {
			JarEntryEnum::Class(_) => self.name.strip_suffix(".class"),
			_ => None,
		}
	}
}

/// The data of an entry of a jar.
///
/// The [`Debug`] implementation doesn't try to print the contents.
#[derive(Clone, PartialEq, Eq)]
pub enum JarEntryEnum {
	Dir,
	Class(Vec<u8>),
	Other(Vec<u8>),
}

impl JarEntryEnum {
	/// Sorts the data into a class or another file, based on the entry name.
	pub fn new(name: &str, is_dir: bool, data: Vec<u8>) -> JarEntryEnum {
		if is_dir {
			JarEntryEnum::Dir
		} else if name.ends_with(".class") {
			JarEntryEnum::Class(data)
		} else {
			JarEntryEnum::Other(data)
		}
	}

	pub fn bytes(&self) -> Option<&[u8]> {
		match self {
			JarEntryEnum::Dir => None,
			JarEntryEnum::Class(data) | JarEntryEnum::Other(data) => Some(data),
		}
	}
}

/// [`Debug`] only prints the type and size, not the contents.
impl Debug for JarEntryEnum {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			JarEntryEnum::Dir => write!(f, "Dir"),
			JarEntryEnum::Class(data) => write!(f, "Class({} bytes)", data.len()),
			JarEntryEnum::Other(data) => write!(f, "Other({} bytes)", data.len()),
		}
	}
}
