use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use crate::error::MappingError;
use crate::remapper::ClassRemapper;
use crate::tree::names::{Names, Namespace, Namespaces};

/// Identifies a class of a [`MappingTree`]. Only valid for the tree that handed it out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

/// A descriptor, together with the namespace it's written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
	pub namespace: Namespace,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
	names: Names,
	pub fields: Vec<FieldEntry>,
	pub methods: Vec<MethodEntry>,
	pub comment: Option<String>,
}

impl ClassEntry {
	/// The names of the class. Changing them goes through [`MappingTree::set_class_name`], as the tree keeps a lookup table.
	pub fn names(&self) -> &Names {
		&self.names
	}

	pub fn name(&self, namespace: Namespace) -> Option<&str> {
		self.names.get(namespace)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
	pub names: Names,
	pub desc: Option<Descriptor>,
	pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
	pub names: Names,
	pub desc: Option<Descriptor>,
	pub params: Vec<ParamEntry>,
	pub locals: Vec<LocalEntry>,
	pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamEntry {
	pub lv_index: u16,
	pub names: Names,
	pub comment: Option<String>,
}

/// Identifies a local variable of a method.
///
/// Local variable table indices get reused for variables with different lifetimes, so these also need the start offset and
/// row of the local variable table to be unique.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalKey {
	pub lv_index: u16,
	pub start_offset: u32,
	/// The row in the local variable table, [`None`] if unknown.
	pub lvt_row: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
	pub key: LocalKey,
	pub names: Names,
	pub comment: Option<String>,
}

impl MethodEntry {
	pub fn param(&self, lv_index: u16) -> Option<&ParamEntry> {
		self.params.iter().find(|param| param.lv_index == lv_index)
	}

	pub fn get_or_create_param(&mut self, lv_index: u16) -> &mut ParamEntry {
		let index = match self.params.iter().position(|param| param.lv_index == lv_index) {
			Some(index) => index,
			None => {
				self.params.push(ParamEntry { lv_index, names: Names::default(), comment: None });
				self.params.len() - 1
			},
		};
		&mut self.params[index]
	}

	pub fn local(&self, key: LocalKey) -> Option<&LocalEntry> {
		self.locals.iter().find(|local| local.key == key)
	}

	pub fn get_or_create_local(&mut self, key: LocalKey) -> &mut LocalEntry {
		let index = match self.locals.iter().position(|local| local.key == key) {
			Some(index) => index,
			None => {
				self.locals.push(LocalEntry { key, names: Names::default(), comment: None });
				self.locals.len() - 1
			},
		};
		&mut self.locals[index]
	}
}

/// The kind of a member of a class, for the lookup methods of [`MappingTree`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemberKind {
	Field,
	Method,
}

/// An in-memory table of classes and their members, each carrying a name per namespace.
///
/// Classes are kept in insertion order, and so are their members. This order is the order of
/// [`MappingTree::events`][crate::tree::events], and the order in which they're written.
#[derive(Debug, Clone, Default)]
pub struct MappingTree {
	namespaces: Namespaces,
	classes: Vec<ClassEntry>,
	/// For each namespace, the class names in it.
	lookup: Vec<IndexMap<String, usize>>,
}

impl PartialEq for MappingTree {
	fn eq(&self, other: &Self) -> bool {
		self.namespaces == other.namespaces && self.classes == other.classes
	}
}

impl Eq for MappingTree {}

impl MappingTree {
	pub fn new() -> MappingTree {
		MappingTree::default()
	}

	pub fn with_namespaces(names: &[&str]) -> Result<MappingTree> {
		let mut tree = MappingTree::new();
		for name in names {
			tree.add_namespace(name)?;
		}
		Ok(tree)
	}

	pub fn namespaces(&self) -> &Namespaces {
		&self.namespaces
	}

	/// Returns the id of the namespace, adding it at the end if it doesn't exist yet.
	pub fn add_namespace(&mut self, name: &str) -> Result<Namespace> {
		let namespace = self.namespaces.add(name)?;
		while self.lookup.len() < self.namespaces.len() {
			self.lookup.push(IndexMap::new());
		}
		Ok(namespace)
	}

	pub fn namespace(&self, name: &str) -> Option<Namespace> {
		self.namespaces.get(name)
	}

	/// Like [`MappingTree::namespace`], but fails with a [`MappingError::Configuration`] if the namespace doesn't exist.
	pub fn require_namespace(&self, name: &str) -> Result<Namespace> {
		self.namespace(name)
			.ok_or_else(|| MappingError::configuration(format!("namespace {name:?} not found in mappings, only got {:?}", self.namespaces)))
	}

	/// Gives a namespace a new name.
	pub fn rename_namespace(&mut self, from: &str, to: &str) -> Result<()> {
		let namespace = self.namespace(from)
			.ok_or_else(|| anyhow!("can't rename namespace {from:?} to {to:?}: it doesn't exist in {:?}", self.namespaces))?;
		self.namespaces.rename(namespace, to)
	}

	pub fn classes(&self) -> impl Iterator<Item=&ClassEntry> {
		self.classes.iter()
	}

	pub fn class_ids(&self) -> impl Iterator<Item=ClassId> {
		(0..self.classes.len()).map(ClassId)
	}

	pub fn class_count(&self) -> usize {
		self.classes.len()
	}

	pub fn class_id(&self, namespace: Namespace, name: &str) -> Option<ClassId> {
		self.lookup.get(namespace.0)?.get(name).copied().map(ClassId)
	}

	pub fn class(&self, namespace: Namespace, name: &str) -> Option<&ClassEntry> {
		self.class_id(namespace, name).map(|id| &self.classes[id.0])
	}

	pub fn get(&self, id: ClassId) -> &ClassEntry {
		&self.classes[id.0]
	}

	pub fn get_mut(&mut self, id: ClassId) -> &mut ClassEntry {
		&mut self.classes[id.0]
	}

	pub fn get_or_create_class(&mut self, namespace: Namespace, name: &str) -> Result<ClassId> {
		if name.is_empty() {
			bail!("can't create class with empty name in namespace {:?}", self.namespaces.name(namespace));
		}
		if let Some(id) = self.class_id(namespace, name) {
			return Ok(id);
		}
		self.check_namespace(namespace)?;

		let id = ClassId(self.classes.len());
		let mut names = Names::default();
		names.set(namespace, Some(name));
		self.classes.push(ClassEntry { names, fields: Vec::new(), methods: Vec::new(), comment: None });
		self.lookup[namespace.0].insert(name.to_owned(), id.0);
		Ok(id)
	}

	/// Sets (or with [`None`] removes) the name of a class in a namespace, returning the old one.
	///
	/// Fails if another class already uses that name in that namespace, or if this would remove the last name of the class.
	pub fn set_class_name(&mut self, id: ClassId, namespace: Namespace, name: Option<&str>) -> Result<Option<String>> {
		self.check_namespace(namespace)?;
		let name = name.filter(|name| !name.is_empty());

		if let Some(name) = name {
			if let Some(other) = self.class_id(namespace, name) {
				if other != id {
					bail!("class name {name:?} in namespace {:?} is already used by class {:?}",
						self.namespaces.name(namespace), self.classes[other.0].names);
				}
			}
		}

		let class = &mut self.classes[id.0];
		let old = class.names.set(namespace, name);
		if class.names.is_empty() {
			class.names.set(namespace, old.as_deref());
			bail!("can't remove the last name of a class: {old:?}");
		}

		if let Some(old) = &old {
			self.lookup[namespace.0].shift_remove(old);
		}
		if let Some(name) = name {
			self.lookup[namespace.0].insert(name.to_owned(), id.0);
		}
		Ok(old)
	}

	fn check_namespace(&self, namespace: Namespace) -> Result<()> {
		if namespace.0 >= self.namespaces.len() {
			bail!("namespace id {} is out of range for namespaces {:?}", namespace.0, self.namespaces);
		}
		Ok(())
	}

	/// Re-expresses a descriptor in another namespace, by mapping all class names in it.
	///
	/// Class names without a name in that namespace stay unchanged.
	pub fn descriptor_in(&self, desc: &Descriptor, namespace: Namespace) -> Result<String> {
		if desc.namespace == namespace {
			return Ok(desc.value.clone());
		}
		self.class_remapper(desc.namespace, namespace).map_desc(&desc.value)
	}

	/// Finds a member by its name and (if given) its descriptor in the given namespace.
	///
	/// Members without a descriptor match any descriptor.
	pub fn find_member(&self, class: ClassId, kind: MemberKind, namespace: Namespace, name: &str, desc: Option<&str>) -> Result<Option<usize>> {
		let class = &self.classes[class.0];
		let candidates: Vec<(&Names, Option<&Descriptor>)> = match kind {
			MemberKind::Field => class.fields.iter().map(|f| (&f.names, f.desc.as_ref())).collect(),
			MemberKind::Method => class.methods.iter().map(|m| (&m.names, m.desc.as_ref())).collect(),
		};

		for (index, (names, member_desc)) in candidates.into_iter().enumerate() {
			if names.get(namespace) != Some(name) {
				continue;
			}
			match (desc, member_desc) {
				(Some(desc), Some(member_desc)) => {
					if self.descriptor_in(member_desc, namespace)? == desc {
						return Ok(Some(index));
					}
				},
				_ => return Ok(Some(index)),
			}
		}
		Ok(None)
	}

	pub fn field(&self, class: ClassId, namespace: Namespace, name: &str, desc: Option<&str>) -> Result<Option<&FieldEntry>> {
		Ok(self.find_member(class, MemberKind::Field, namespace, name, desc)?
			.map(|index| &self.classes[class.0].fields[index]))
	}

	pub fn method(&self, class: ClassId, namespace: Namespace, name: &str, desc: Option<&str>) -> Result<Option<&MethodEntry>> {
		Ok(self.find_member(class, MemberKind::Method, namespace, name, desc)?
			.map(|index| &self.classes[class.0].methods[index]))
	}

	/// Finds or creates a field. A newly created field stores the descriptor in the namespace given.
	pub fn get_or_create_field(&mut self, class: ClassId, namespace: Namespace, name: &str, desc: Option<&str>) -> Result<&mut FieldEntry> {
		self.check_namespace(namespace)?;
		let index = match self.find_member(class, MemberKind::Field, namespace, name, desc)? {
			Some(index) => index,
			None => {
				let mut names = Names::default();
				names.set(namespace, Some(name));
				let desc = desc.map(|value| Descriptor { namespace, value: value.to_owned() });
				let fields = &mut self.classes[class.0].fields;
				fields.push(FieldEntry { names, desc, comment: None });
				fields.len() - 1
			},
		};
		Ok(&mut self.classes[class.0].fields[index])
	}

	/// Finds or creates a method. A newly created method stores the descriptor in the namespace given.
	pub fn get_or_create_method(&mut self, class: ClassId, namespace: Namespace, name: &str, desc: Option<&str>) -> Result<&mut MethodEntry> {
		self.check_namespace(namespace)?;
		let index = match self.find_member(class, MemberKind::Method, namespace, name, desc)? {
			Some(index) => index,
			None => {
				let mut names = Names::default();
				names.set(namespace, Some(name));
				let desc = desc.map(|value| Descriptor { namespace, value: value.to_owned() });
				let methods = &mut self.classes[class.0].methods;
				methods.push(MethodEntry { names, desc, params: Vec::new(), locals: Vec::new(), comment: None });
				methods.len() - 1
			},
		};
		Ok(&mut self.classes[class.0].methods[index])
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::error::MappingError;
	use crate::tree::mappings::{Descriptor, LocalKey, MappingTree};

	#[test]
	fn classes_are_found_in_every_namespace() -> Result<()> {
		let mut tree = MappingTree::with_namespaces(&["official", "named"])?;
		let official = tree.require_namespace("official")?;
		let named = tree.require_namespace("named")?;

		let a = tree.get_or_create_class(official, "a")?;
		tree.set_class_name(a, named, Some("net/example/Apple"))?;
		assert_eq!(tree.get_or_create_class(named, "net/example/Apple")?, a);
		assert_eq!(tree.class(official, "a").map(|c| c.name(named)), Some(Some("net/example/Apple")));

		tree.set_class_name(a, named, Some("net/example/Banana"))?;
		assert_eq!(tree.class_id(named, "net/example/Apple"), None);
		assert_eq!(tree.class_id(named, "net/example/Banana"), Some(a));

		let b = tree.get_or_create_class(official, "b")?;
		assert!(tree.set_class_name(b, named, Some("net/example/Banana")).is_err());
		assert!(tree.set_class_name(b, official, None).is_err());
		assert_eq!(tree.class_count(), 2);
		Ok(())
	}

	#[test]
	fn missing_namespace_is_configuration_error() -> Result<()> {
		let tree = MappingTree::with_namespaces(&["official"])?;
		let error = tree.require_namespace("named").unwrap_err();
		assert!(matches!(error.downcast_ref::<MappingError>(), Some(MappingError::Configuration(_))));
		Ok(())
	}

	#[test]
	fn descriptors_are_translated() -> Result<()> {
		let mut tree = MappingTree::with_namespaces(&["official", "named"])?;
		let official = tree.require_namespace("official")?;
		let named = tree.require_namespace("named")?;
		let a = tree.get_or_create_class(official, "a")?;
		tree.set_class_name(a, named, Some("Apple"))?;

		let desc = Descriptor { namespace: official, value: "(La;[La;Ljava/lang/String;)La;".to_owned() };
		assert_eq!(tree.descriptor_in(&desc, named)?, "(LApple;[LApple;Ljava/lang/String;)LApple;");

		let method = tree.get_or_create_method(a, official, "b", Some(&desc.value))?;
		method.names.set(named, Some("bite"));
		assert!(tree.method(a, named, "bite", Some("(LApple;[LApple;Ljava/lang/String;)LApple;"))?.is_some());
		assert!(tree.method(a, named, "bite", Some("()V"))?.is_none());
		assert!(tree.method(a, named, "bite", None)?.is_some());
		Ok(())
	}

	#[test]
	fn locals_use_the_full_key() -> Result<()> {
		let mut tree = MappingTree::with_namespaces(&["official"])?;
		let official = tree.require_namespace("official")?;
		let a = tree.get_or_create_class(official, "a")?;
		let method = tree.get_or_create_method(a, official, "b", Some("()V"))?;

		let first = LocalKey { lv_index: 1, start_offset: 0, lvt_row: Some(0) };
		let second = LocalKey { lv_index: 1, start_offset: 10, lvt_row: Some(1) };
		method.get_or_create_local(first).names.set(official, Some("x"));
		method.get_or_create_local(second).names.set(official, Some("y"));
		method.get_or_create_local(first);
		method.get_or_create_param(0).names.set(official, Some("this"));

		assert_eq!(method.locals.len(), 2);
		assert_eq!(method.local(second).and_then(|l| l.names.get(official)), Some("y"));
		assert_eq!(method.param(0).and_then(|p| p.names.get(official)), Some("this"));
		Ok(())
	}
}
