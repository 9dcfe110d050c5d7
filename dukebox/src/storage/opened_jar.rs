use anyhow::{anyhow, Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::warn;
use quill::remapper::SuperClasses;
use crate::storage::{JarEntry, JarEntryEnum};

/// Represents an opened jar.
///
/// An opened jar can be read. Entries are identified by their index, from `0` to [`len`][OpenedJar::len].
///
/// With the [`names`][OpenedJar::names] and [`by_name`][OpenedJar::by_name] methods, an opened jar
/// supports lookup by file name. Note that [`names`][OpenedJar::names] also returns the corresponding
/// indices, which avoids slow string lookup.
pub trait OpenedJar {
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Reads the entry at the given index into memory.
	fn by_index(&mut self, index: usize) -> Result<JarEntry>;

	fn names(&self) -> impl Iterator<Item=(usize, &'_ str)>;

	fn by_name(&mut self, name: &str) -> Result<Option<JarEntry>>;

	/// Reads all entries into memory, in the order they're stored in.
	fn entries(&mut self) -> Result<Vec<JarEntry>> {
		(0..self.len())
			.map(|index| self.by_index(index).with_context(|| anyhow!("failed to read entry {index}")))
			.collect()
	}

	fn super_classes(&mut self) -> Result<SuperClasses> {
		Ok(super_classes(&self.entries()?))
	}
}

/// Reads the super class and interfaces of each class entry.
///
/// Classes that can't be read are left out, with a warning.
pub fn super_classes(entries: &[JarEntry]) -> SuperClasses {
	let mut super_classes = IndexMap::new();

	for entry in entries {
		let JarEntryEnum::Class(data) = &entry.data else {
			continue;
		};

		let result = duke::read_class(data).and_then(|class| {
			let mut set = IndexSet::new();
			if let Some(super_class) = class.super_name()? {
				set.insert(super_class.to_owned());
			}
			for interface in class.interface_names()? {
				set.insert(interface.to_owned());
			}
			Ok((class.name()?.to_owned(), set))
		});

		match result {
			Ok((name, set)) => {
				super_classes.insert(name, set);
			},
			Err(e) => warn!("failed to read the inheritance of {:?}: {e:#}", entry.name),
		}
	}

	SuperClasses { super_classes }
}
