//! The multi-namespace mapping tree.
//!
//! A [`MappingTree`][mappings::MappingTree] stores classes, and for each class its fields and methods, and for each method its
//! parameters and local variables. Every one of these carries one name per namespace, which may be absent.

pub mod events;
pub mod mappings;

pub use names::{Names, Namespace, Namespaces};

pub mod names {
	use std::fmt::{Debug, Formatter};
	use anyhow::{bail, Result};

	/// Describes a given namespace of a mapping tree.
	///
	/// Ids are dense and assigned in the order the namespaces were added. They are only meaningful for the tree that
	/// handed them out.
	#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
	pub struct Namespace(pub(crate) usize);

	impl Namespace {
		pub fn id(self) -> usize {
			self.0
		}
	}

	/// A struct storing the names of the namespaces, in declaration order.
	#[derive(Clone, PartialEq, Eq, Default)]
	pub struct Namespaces {
		names: Vec<String>,
	}

	impl Namespaces {
		pub fn len(&self) -> usize {
			self.names.len()
		}

		pub fn is_empty(&self) -> bool {
			self.names.is_empty()
		}

		pub fn get(&self, name: &str) -> Option<Namespace> {
			self.names.iter()
				.position(|namespace| namespace == name)
				.map(Namespace)
		}

		/// Returns the id of the namespace, adding it if it doesn't exist yet.
		pub(crate) fn add(&mut self, name: &str) -> Result<Namespace> {
			if name.is_empty() || name.contains(char::is_whitespace) {
				bail!("invalid namespace name {name:?}: must be non-empty and without whitespace");
			}
			if let Some(namespace) = self.get(name) {
				return Ok(namespace);
			}
			self.names.push(name.to_owned());
			Ok(Namespace(self.names.len() - 1))
		}

		pub(crate) fn rename(&mut self, namespace: Namespace, to: &str) -> Result<()> {
			if let Some(existing) = self.get(to) {
				if existing != namespace {
					bail!("can't rename namespace {:?} to {to:?}: that name is already used in {self:?}", self.name(namespace));
				}
			}
			self.names[namespace.0] = to.to_owned();
			Ok(())
		}

		pub fn name(&self, namespace: Namespace) -> &str {
			&self.names[namespace.0]
		}

		pub fn names(&self) -> impl Iterator<Item=&str> {
			self.names.iter().map(String::as_str)
		}

		pub fn iter(&self) -> impl Iterator<Item=(Namespace, &str)> {
			self.names.iter()
				.enumerate()
				.map(|(id, name)| (Namespace(id), name.as_str()))
		}

		/// Returns an error if the names of `self` aren't the names given in the argument.
		/// This can be used to check that after reading mappings, you have the correct namespaces in them.
		pub fn check_that(&self, names: &[&str]) -> Result<()> {
			if self.names != names {
				bail!("expected namespaces {names:?}, got {self:?}");
			}
			Ok(())
		}
	}

	impl Debug for Namespaces {
		fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
			f.debug_list()
				.entries(&self.names)
				.finish()
		}
	}

	/// A struct storing names for namespaces. Namespaces beyond the end have no name.
	///
	/// Empty strings are never stored, they are turned into [`None`].
	#[derive(Clone, PartialEq, Eq, Default, Hash)]
	pub struct Names {
		names: Vec<Option<String>>,
	}

	impl Names {
		pub fn get(&self, namespace: Namespace) -> Option<&str> {
			self.names.get(namespace.0)?.as_deref()
		}

		/// Sets the name, returning the old one.
		pub fn set(&mut self, namespace: Namespace, name: Option<&str>) -> Option<String> {
			let name = name.filter(|name| !name.is_empty());
			if self.names.len() <= namespace.0 {
				if name.is_none() {
					return None;
				}
				self.names.resize(namespace.0 + 1, None);
			}
			let old = std::mem::replace(&mut self.names[namespace.0], name.map(str::to_owned));
			// keep equality independent of how the names were set
			while self.names.last().is_some_and(Option::is_none) {
				self.names.pop();
			}
			old
		}

		/// Returns `true` if there's no name for any namespace.
		pub fn is_empty(&self) -> bool {
			self.names.iter().all(Option::is_none)
		}

		/// The names that are present, with their namespace.
		pub fn iter(&self) -> impl Iterator<Item=(Namespace, &str)> {
			self.names.iter()
				.enumerate()
				.filter_map(|(id, name)| Some((Namespace(id), name.as_deref()?)))
		}

		/// The first present name, in namespace order.
		pub fn first(&self) -> Option<(Namespace, &str)> {
			self.iter().next()
		}
	}

	impl Debug for Names {
		fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
			f.debug_list()
				.entries(&self.names)
				.finish()
		}
	}

	/// Note that empty inputs are converted into `None`.
	impl<S: AsRef<str>> FromIterator<Option<S>> for Names {
		fn from_iter<I: IntoIterator<Item=Option<S>>>(iter: I) -> Self {
			let mut names: Vec<Option<String>> = iter.into_iter()
				.map(|name| name.filter(|x| !x.as_ref().is_empty()).map(|x| x.as_ref().to_owned()))
				.collect();
			while names.last().is_some_and(Option::is_none) {
				names.pop();
			}
			Names { names }
		}
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::tree::names::{Names, Namespaces};

	#[test]
	fn namespaces_are_dense_and_unique() -> Result<()> {
		let mut namespaces = Namespaces::default();
		let official = namespaces.add("official")?;
		let named = namespaces.add("named")?;
		assert_eq!((official.id(), named.id()), (0, 1));
		assert_eq!(namespaces.add("official")?, official);
		assert_eq!(namespaces.len(), 2);
		assert!(namespaces.add("").is_err());
		assert!(namespaces.add("a b").is_err());
		namespaces.check_that(&["official", "named"])
	}

	#[test]
	fn names_store_no_empty_strings() -> Result<()> {
		let mut namespaces = Namespaces::default();
		let a = namespaces.add("a")?;
		let b = namespaces.add("b")?;
		let c = namespaces.add("c")?;

		let mut names: Names = [Some("x"), Some(""), None].into_iter().collect();
		assert_eq!(names.get(a), Some("x"));
		assert_eq!(names.get(b), None);
		assert_eq!(names.get(c), None);

		assert_eq!(names.set(c, Some("z")), None);
		assert_eq!(names.set(a, Some("")), Some("x".to_owned()));
		assert_eq!(names.first(), Some((c, "z")));
		assert!(!names.is_empty());
		names.set(c, None);
		assert!(names.is_empty());

		let equal: Names = [None::<&str>, None].into_iter().collect();
		assert_eq!(equal, Names::default());
		Ok(())
	}
}
