//! Remappers for remapping class names, descriptors, signatures, fields, methods, parameters and local variables.
//!
//! For remapping just classes, descriptors and signatures, you're interested in [`ClassRemapper`].
//! If you also want to remap member names, use the [`MemberRemapper`].
//!
//! Implementors of these traits can be created by [`MappingTree::class_remapper`] for remapping classes between two
//! namespaces of a tree, and by [`RenamePlan::remapper`] for applying a resolved plan.
//!
//! In case you want to implement a remapper yourself, you only need to define the trait methods that don't have
//! a default implementation.
//!
//! # What is a "remapper"?
//! A remapper answers the question for you "what is the name of X in namespace Y?"

use anyhow::{anyhow, bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use crate::fallback::{RenamePlan, RenameRecord};
use crate::tree::mappings::{LocalKey, MappingTree};
use crate::tree::names::Namespace;

/// A remapper supporting remapping of class names, descriptors and signatures.
pub trait ClassRemapper {
	/// Maps a class name to a new one, if the mapping exists.
	///
	/// If the mapping doesn't exist, returns `Ok(None)`.
	fn map_class_fail(&self, class: &str) -> Result<Option<String>>;

	/// Maps a class name to a new one, if the mapping doesn't exist, return the old one.
	///
	/// Do not implement this yourself.
	fn map_class(&self, class: &str) -> Result<String> {
		Ok(self.map_class_fail(class)?.unwrap_or_else(|| class.to_owned()))
	}

	/// Maps any class name, including array classes (like the ones found in `Class` constants), which are descriptors.
	///
	/// Do not implement this yourself.
	fn map_class_any(&self, class: &str) -> Result<String> {
		if class.starts_with('[') {
			self.map_desc(class)
		} else {
			self.map_class(class)
		}
	}

	/// Maps a field, method or return descriptor to a new one.
	///
	/// Note that this relies on the fact that for non-existing class mappings class names are just copied over.
	///
	/// Do not implement this yourself.
	fn map_desc(&self, desc: &str) -> Result<String> {
		let mut s = String::with_capacity(desc.len());

		let mut iter = desc.chars();
		while let Some(ch) = iter.next() {
			s.push(ch);

			if ch == 'L' {
				let mut class_name = String::new();
				for ch in iter.by_ref() {
					class_name.push(ch);
					if ch == ';' {
						break;
					}
				}
				if class_name.pop() != Some(';') {
					bail!("descriptor {desc:?} has a missing semicolon somewhere");
				}

				s.push_str(&self.map_class(&class_name)?);
				s.push(';');
			}
		}

		Ok(s)
	}

	/// Maps a class, method or field signature (the contents of a `Signature` attribute) to a new one.
	///
	/// Do not implement this yourself.
	fn map_signature(&self, signature: &str) -> Result<String> {
		let mut mapper = SignatureMapper { remapper: self, input: signature, pos: 0, out: String::with_capacity(signature.len()) };
		mapper.signature()
			.with_context(|| anyhow!("failed to remap signature {signature:?}"))?;
		Ok(mapper.out)
	}
}

/// A small recursive descent parser for signatures, copying everything and mapping the class names.
struct SignatureMapper<'a, R: ?Sized> {
	remapper: &'a R,
	input: &'a str,
	pos: usize,
	out: String,
}

impl<R: ClassRemapper + ?Sized> SignatureMapper<'_, R> {
	fn peek(&self) -> Option<char> {
		self.input[self.pos..].chars().next()
	}

	fn expect(&mut self, expected: char) -> Result<()> {
		match self.peek() {
			Some(ch) if ch == expected => {
				self.copy();
				Ok(())
			},
			other => bail!("expected {expected:?} at {}, got {other:?}", self.pos),
		}
	}

	fn copy(&mut self) {
		if let Some(ch) = self.peek() {
			self.out.push(ch);
			self.pos += ch.len_utf8();
		}
	}

	fn identifier(&mut self, delimiters: &[char]) -> Result<&str> {
		let start = self.pos;
		while let Some(ch) = self.peek() {
			if delimiters.contains(&ch) {
				break;
			}
			self.pos += ch.len_utf8();
		}
		if start == self.pos {
			bail!("expected an identifier at {start}");
		}
		Ok(&self.input[start..self.pos])
	}

	fn signature(&mut self) -> Result<()> {
		if self.peek() == Some('<') {
			self.type_parameters()?;
		}
		if self.peek() == Some('(') {
			self.copy();
			while self.peek() != Some(')') {
				self.java_type()?;
			}
			self.expect(')')?;
			if self.peek() == Some('V') {
				self.copy();
			} else {
				self.java_type()?;
			}
			while self.peek() == Some('^') {
				self.copy();
				self.reference_type()?;
			}
		} else {
			// a class signature consists of the super class and all interfaces, a field signature of one type
			while self.peek().is_some() {
				self.reference_type()?;
			}
		}
		if self.pos != self.input.len() {
			bail!("left over input at {}", self.pos);
		}
		Ok(())
	}

	fn type_parameters(&mut self) -> Result<()> {
		self.expect('<')?;
		while self.peek() != Some('>') {
			let name = self.identifier(&[':', '>'])?.to_owned();
			self.out.push_str(&name);
			if self.peek() != Some(':') {
				bail!("type parameter {name:?} without bound");
			}
			while self.peek() == Some(':') {
				self.copy();
				if matches!(self.peek(), Some('L' | 'T' | '[')) {
					self.reference_type()?;
				}
			}
		}
		self.expect('>')
	}

	fn java_type(&mut self) -> Result<()> {
		match self.peek() {
			Some('B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z') => {
				self.copy();
				Ok(())
			},
			_ => self.reference_type(),
		}
	}

	fn reference_type(&mut self) -> Result<()> {
		match self.peek() {
			Some('L') => self.class_type(),
			Some('T') => {
				self.copy();
				let name = self.identifier(&[';'])?.to_owned();
				self.out.push_str(&name);
				self.expect(';')
			},
			Some('[') => {
				self.copy();
				self.java_type()
			},
			other => bail!("expected a reference type at {}, got {other:?}", self.pos),
		}
	}

	fn class_type(&mut self) -> Result<()> {
		self.expect('L')?;
		let mut name = self.identifier(&['<', '.', ';'])?.to_owned();
		let mapped = self.remapper.map_class(&name)?;
		self.out.push_str(&mapped);

		loop {
			if self.peek() == Some('<') {
				self.type_arguments()?;
			}
			match self.peek() {
				Some('.') => {
					self.copy();
					let inner = self.identifier(&['<', '.', ';'])?.to_owned();
					let outer_mapped = self.remapper.map_class(&name)? + "$";
					name = format!("{name}${inner}");
					let mapped = self.remapper.map_class(&name)?;
					let simple = match mapped.strip_prefix(&outer_mapped) {
						Some(simple) => simple,
						None => mapped.rsplit('$').next().unwrap_or(&mapped),
					};
					self.out.push_str(simple);
				},
				Some(';') => {
					self.copy();
					return Ok(());
				},
				other => bail!("unexpected {other:?} in class type signature at {}", self.pos),
			}
		}
	}

	fn type_arguments(&mut self) -> Result<()> {
		self.expect('<')?;
		while self.peek() != Some('>') {
			match self.peek() {
				Some('*') => self.copy(),
				Some('+' | '-') => {
					self.copy();
					self.reference_type()?;
				},
				Some(_) => self.reference_type()?,
				None => bail!("unterminated type arguments"),
			}
		}
		self.expect('>')
	}
}

/// A remapper supporting remapping fields, methods, parameters and local variables, as well as class names and descriptors.
///
/// If you only want to remap class names and descriptors, consider using [`ClassRemapper`] instead.
pub trait MemberRemapper: ClassRemapper {
	/// Maps a field name to a new one, if the mapping exists. The owner, name and descriptor are the old ones.
	fn map_field_fail(&self, owner: &str, name: &str, desc: &str) -> Result<Option<String>>;

	/// Maps a method name to a new one, if the mapping exists. The owner, name and descriptor are the old ones.
	fn map_method_fail(&self, owner: &str, name: &str, desc: &str) -> Result<Option<String>>;

	/// Maps the name of a method parameter, given by its local variable index.
	fn map_param_fail(&self, owner: &str, method: &str, desc: &str, lv_index: u16) -> Result<Option<String>> {
		let _ = (owner, method, desc, lv_index);
		Ok(None)
	}

	/// Maps the name of a local variable.
	fn map_local_fail(&self, owner: &str, method: &str, desc: &str, key: LocalKey) -> Result<Option<String>> {
		let _ = (owner, method, desc, key);
		Ok(None)
	}

	/// Do not implement this yourself.
	fn map_field(&self, owner: &str, name: &str, desc: &str) -> Result<String> {
		Ok(self.map_field_fail(owner, name, desc)?.unwrap_or_else(|| name.to_owned()))
	}

	/// Do not implement this yourself.
	fn map_method(&self, owner: &str, name: &str, desc: &str) -> Result<String> {
		Ok(self.map_method_fail(owner, name, desc)?.unwrap_or_else(|| name.to_owned()))
	}
}

/// Maps classes between two namespaces of a [`MappingTree`].
#[derive(Debug, Clone, Copy)]
pub struct TreeClassRemapper<'a> {
	tree: &'a MappingTree,
	from: Namespace,
	to: Namespace,
}

impl ClassRemapper for TreeClassRemapper<'_> {
	fn map_class_fail(&self, class: &str) -> Result<Option<String>> {
		Ok(self.tree.class(self.from, class)
			.and_then(|entry| entry.name(self.to))
			.map(str::to_owned))
	}
}

impl MappingTree {
	pub fn class_remapper(&self, from: Namespace, to: Namespace) -> TreeClassRemapper<'_> {
		TreeClassRemapper { tree: self, from, to }
	}
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct MemberKey<'a> {
	owner: &'a str,
	name: &'a str,
}

/// For looking up a [`MemberKey`] with strings of a shorter lifetime.
#[derive(Debug, PartialEq, Eq, Hash)]
struct MemberReq<'q> {
	owner: &'q str,
	name: &'q str,
}

impl<'a> indexmap::Equivalent<MemberKey<'a>> for MemberReq<'_> {
	fn equivalent(&self, key: &MemberKey<'a>) -> bool {
		self.owner == key.owner && self.name == key.name
	}
}

#[derive(Debug)]
struct MemberTarget<'a> {
	desc: Option<&'a str>,
	to: &'a str,
	params: IndexMap<u16, &'a str>,
	locals: IndexMap<LocalKey, &'a str>,
}

/// Finds the target of the member with the given descriptor. Members without descriptor match any descriptor.
fn find_target<'s, 'a>(targets: &'s [MemberTarget<'a>], desc: &str) -> Option<&'s MemberTarget<'a>> {
	targets.iter().find(|target| target.desc == Some(desc))
		.or_else(|| targets.iter().find(|target| target.desc.is_none()))
}

/// The lookup tables for a [`RenamePlan`].
///
/// Field and method lookups walk up the inheritance chain given by the [`SuperClassProvider`], so that a reference to an
/// inherited member through a subclass gets renamed as well.
#[derive(Debug)]
pub struct PlanRemapper<'a, 'i, I> {
	classes: IndexMap<&'a str, &'a str>,
	fields: IndexMap<MemberKey<'a>, Vec<MemberTarget<'a>>>,
	methods: IndexMap<MemberKey<'a>, Vec<MemberTarget<'a>>>,
	inheritance: &'i I,
}

impl<I> PlanRemapper<'_, '_, I> {
	fn class_target(&self, class: &str) -> Option<&str> {
		self.classes.get(class).copied()
	}

	fn member_target(&self, methods: bool, owner: &str, name: &str, desc: &str) -> Option<&MemberTarget<'_>> {
		let table = if methods { &self.methods } else { &self.fields };
		table.get(&MemberReq { owner, name })
			.and_then(|targets| find_target(targets, desc))
	}
}

impl<I: SuperClassProvider> PlanRemapper<'_, '_, I> {
	fn map_member_fail(&self, methods: bool, owner: &str, name: &str, desc: &str) -> Result<Option<String>> {
		let mut visited = IndexSet::new();
		self.map_member_fail_inner(methods, owner, name, desc, &mut visited)
	}

	fn map_member_fail_inner(&self, methods: bool, owner: &str, name: &str, desc: &str, visited: &mut IndexSet<String>) -> Result<Option<String>> {
		// a broken jar may contain a cycle
		if !visited.insert(owner.to_owned()) {
			return Ok(None);
		}
		if let Some(target) = self.member_target(methods, owner, name, desc) {
			return Ok(Some(target.to.to_owned()));
		}
		if let Some(super_classes) = self.inheritance.get_super_classes(owner)? {
			for super_class in super_classes {
				if let Some(remapped) = self.map_member_fail_inner(methods, super_class, name, desc, visited)? {
					return Ok(Some(remapped));
				}
			}
		}
		Ok(None)
	}
}

impl<I: SuperClassProvider> ClassRemapper for PlanRemapper<'_, '_, I> {
	fn map_class_fail(&self, class: &str) -> Result<Option<String>> {
		Ok(self.class_target(class).map(str::to_owned))
	}
}

impl<I: SuperClassProvider> MemberRemapper for PlanRemapper<'_, '_, I> {
	fn map_field_fail(&self, owner: &str, name: &str, desc: &str) -> Result<Option<String>> {
		self.map_member_fail(false, owner, name, desc)
	}

	fn map_method_fail(&self, owner: &str, name: &str, desc: &str) -> Result<Option<String>> {
		if name == "<init>" || name == "<clinit>" {
			return Ok(None);
		}
		self.map_member_fail(true, owner, name, desc)
	}

	fn map_param_fail(&self, owner: &str, method: &str, desc: &str, lv_index: u16) -> Result<Option<String>> {
		Ok(self.member_target(true, owner, method, desc)
			.and_then(|target| target.params.get(&lv_index))
			.map(|&to| to.to_owned()))
	}

	fn map_local_fail(&self, owner: &str, method: &str, desc: &str, key: LocalKey) -> Result<Option<String>> {
		let Some(target) = self.member_target(true, owner, method, desc) else {
			return Ok(None);
		};
		if let Some(&to) = target.locals.get(&key) {
			return Ok(Some(to.to_owned()));
		}
		// the row might not be known, match on index and start only
		Ok(target.locals.iter()
			.find(|(k, _)| k.lv_index == key.lv_index && k.start_offset == key.start_offset && (k.lvt_row.is_none() || key.lvt_row.is_none()))
			.map(|(_, &to)| to.to_owned()))
	}
}

impl RenamePlan {
	/// Builds the lookup tables for this plan.
	pub fn remapper<'i, I>(&self, inheritance: &'i I) -> PlanRemapper<'_, 'i, I> {
		let mut classes = IndexMap::new();
		let mut fields: IndexMap<MemberKey, Vec<MemberTarget>> = IndexMap::new();
		let mut methods: IndexMap<MemberKey, Vec<MemberTarget>> = IndexMap::new();

		for record in &self.records {
			match record {
				RenameRecord::Class { from, to } => {
					classes.insert(from.as_str(), to.as_str());
				},
				RenameRecord::Field { owner, name, desc, to } => {
					fields.entry(MemberKey { owner, name }).or_default().push(MemberTarget {
						desc: desc.as_deref(),
						to,
						params: IndexMap::new(),
						locals: IndexMap::new(),
					});
				},
				RenameRecord::Method { owner, name, desc, to } => {
					methods.entry(MemberKey { owner, name }).or_default().push(MemberTarget {
						desc: desc.as_deref(),
						to,
						params: IndexMap::new(),
						locals: IndexMap::new(),
					});
				},
				RenameRecord::Param { owner, method, desc, lv_index, to } => {
					if let Some(target) = find_target_mut(&mut methods, owner, method, desc.as_deref()) {
						target.params.insert(*lv_index, to);
					}
				},
				RenameRecord::Local { owner, method, desc, key, to } => {
					if let Some(target) = find_target_mut(&mut methods, owner, method, desc.as_deref()) {
						target.locals.insert(*key, to);
					}
				},
			}
		}

		PlanRemapper { classes, fields, methods, inheritance }
	}
}

fn find_target_mut<'s, 'a>(
	methods: &'s mut IndexMap<MemberKey<'a>, Vec<MemberTarget<'a>>>,
	owner: &str,
	name: &str,
	desc: Option<&str>,
) -> Option<&'s mut MemberTarget<'a>> {
	methods.get_mut(&MemberReq { owner, name })?
		.iter_mut()
		.rev()
		.find(|target| target.desc == desc)
}

/// Gives the direct super class and the interfaces of a class.
pub trait SuperClassProvider {
	fn get_super_classes(&self, class: &str) -> Result<Option<&IndexSet<String>>>;
}

/// The inheritance of the classes of a jar, see `dukebox` for building it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuperClasses {
	pub super_classes: IndexMap<String, IndexSet<String>>,
}

impl SuperClassProvider for SuperClasses {
	fn get_super_classes(&self, class: &str) -> Result<Option<&IndexSet<String>>> {
		Ok(self.super_classes.get(class))
	}
}

impl<S: SuperClassProvider> SuperClassProvider for Vec<S> {
	fn get_super_classes(&self, class: &str) -> Result<Option<&IndexSet<String>>> {
		for i in self {
			if let Some(x) = i.get_super_classes(class)? {
				return Ok(Some(x));
			}
		}
		Ok(None)
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSuperClassProvider;

impl SuperClassProvider for NoSuperClassProvider {
	fn get_super_classes(&self, _class: &str) -> Result<Option<&IndexSet<String>>> {
		Ok(None)
	}
}
