//! Renames declared in code instead of coming from a file.

use anyhow::Result;
use sha2::{Digest, Sha256};
use crate::tree::mappings::MappingTree;
use crate::tree::names::Namespace;

/// A small tree of renames from one namespace to another, merged into the resolved mappings after all files.
///
/// Its names always win over the names from files.
///
/// ```
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// use quill::stub::StubOverlay;
///
/// let mut stub = StubOverlay::new("official", "named")?;
/// stub.class("a", "net/example/Apple")?
///     .method("a", "b", "()V", "bite")?;
/// assert_eq!(stub.hash()?.len(), 16);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StubOverlay {
	tree: MappingTree,
	source: Namespace,
	target: Namespace,
}

impl StubOverlay {
	pub fn new(source: &str, target: &str) -> Result<StubOverlay> {
		let mut tree = MappingTree::new();
		let source = tree.add_namespace(source)?;
		let target = tree.add_namespace(target)?;
		Ok(StubOverlay { tree, source, target })
	}

	/// The namespace the renames are declared from.
	pub fn source(&self) -> &str {
		self.tree.namespaces().name(self.source)
	}

	pub fn target(&self) -> &str {
		self.tree.namespaces().name(self.target)
	}

	pub fn is_empty(&self) -> bool {
		self.tree.class_count() == 0
	}

	pub fn tree(&self) -> &MappingTree {
		&self.tree
	}

	pub fn class(&mut self, from: &str, to: &str) -> Result<&mut StubOverlay> {
		let id = self.tree.get_or_create_class(self.source, from)?;
		self.tree.set_class_name(id, self.target, Some(to))?;
		Ok(self)
	}

	/// Renames a field. The owner is given in the source namespace, and gets added if it isn't declared.
	pub fn field(&mut self, owner: &str, name: &str, desc: &str, to: &str) -> Result<&mut StubOverlay> {
		let class = self.tree.get_or_create_class(self.source, owner)?;
		let field = self.tree.get_or_create_field(class, self.source, name, Some(desc))?;
		field.names.set(self.target, Some(to));
		Ok(self)
	}

	/// Renames a method. The owner is given in the source namespace, and gets added if it isn't declared.
	pub fn method(&mut self, owner: &str, name: &str, desc: &str, to: &str) -> Result<&mut StubOverlay> {
		let class = self.tree.get_or_create_class(self.source, owner)?;
		let method = self.tree.get_or_create_method(class, self.source, name, Some(desc))?;
		method.names.set(self.target, Some(to));
		Ok(self)
	}

	/// A hash of the content, being the first 16 hex digits of the SHA-256 of the tiny v2 form.
	pub fn hash(&self) -> Result<String> {
		let data = crate::tiny_v2::write_vec(&self.tree)?;
		let digest = Sha256::digest(&data);
		Ok(digest.iter().take(8).map(|byte| format!("{byte:02x}")).collect())
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::stub::StubOverlay;

	#[test]
	fn hash_depends_on_content() -> Result<()> {
		let mut a = StubOverlay::new("official", "named")?;
		let mut b = StubOverlay::new("official", "named")?;
		assert_eq!(a.hash()?, b.hash()?);

		a.class("a", "Apple")?;
		b.class("a", "Apricot")?;
		assert!(a.hash()? != b.hash()?);

		b.class("a", "Apple")?;
		assert_eq!(a.hash()?, b.hash()?);
		assert!(a.hash()?.chars().all(|c| c.is_ascii_hexdigit()));
		Ok(())
	}

	#[test]
	fn members_create_their_owner() -> Result<()> {
		let mut stub = StubOverlay::new("official", "named")?;
		stub.field("a", "b", "I", "count")?;
		let official = stub.tree().require_namespace("official")?;
		let named = stub.tree().require_namespace("named")?;
		let class = stub.tree().class(official, "a");
		assert_eq!(class.map(|c| c.fields[0].names.get(named)), Some(Some("count")));
		assert_eq!(class.and_then(|c| c.name(named)), None);
		Ok(())
	}
}
