//! Turning a [`MappingTree`] into a flat list of renames from one namespace to another.
//!
//! For each entity, the name in the target namespace is used, and if that's missing, the name in the fallback namespace.
//! Classes without either keep their name, all other entities without either are left out of the plan. Every class
//! without a target name is reported, even if the fallback namespace has one.

use anyhow::Result;
use log::{debug, trace};
use crate::error::{EntryWarning, MappingError};
use crate::tree::events::TreeEvent;
use crate::tree::mappings::{ClassEntry, Descriptor, LocalKey, MappingTree};
use crate::tree::names::{Names, Namespace};

/// A single rename. All names and descriptors are the ones of the source side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameRecord {
	Class {
		from: String,
		to: String,
	},
	Field {
		owner: String,
		name: String,
		desc: Option<String>,
		to: String,
	},
	Method {
		owner: String,
		name: String,
		desc: Option<String>,
		to: String,
	},
	Param {
		owner: String,
		method: String,
		desc: Option<String>,
		lv_index: u16,
		to: String,
	},
	Local {
		owner: String,
		method: String,
		desc: Option<String>,
		key: LocalKey,
		to: String,
	},
}

/// The renames between two namespaces, in the traversal order of the tree they come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
	pub source: String,
	pub target: String,
	pub records: Vec<RenameRecord>,
	pub warnings: Vec<EntryWarning>,
}

impl RenamePlan {
	/// The class renames, from old to new name.
	pub fn classes(&self) -> impl Iterator<Item=(&str, &str)> {
		self.records.iter().filter_map(|record| match record {
			RenameRecord::Class { from, to } => Some((from.as_str(), to.as_str())),
			_ => None,
		})
	}
}

/// The namespaces looked at, in the order they're looked at.
struct Lookup {
	source: Option<Namespace>,
	fallback: Option<Namespace>,
	target: Namespace,
}

impl Lookup {
	/// The source side name, together with the namespace it was found in.
	fn from<'a>(&self, names: &'a Names) -> Option<(Namespace, &'a str)> {
		[self.source, self.fallback].into_iter()
			.flatten()
			.find_map(|namespace| Some((namespace, names.get(namespace)?)))
	}

	fn to<'a>(&self, names: &'a Names) -> Option<&'a str> {
		names.get(self.target)
			.or_else(|| self.fallback.and_then(|fallback| names.get(fallback)))
	}
}

/// The source side of the class and method currently visited, [`None`] if they were left out.
///
/// Events come in tree order, so all members following a class event belong to that class.
#[derive(Default)]
struct Current {
	class: Option<String>,
	method: Option<(String, Option<String>)>,
}

/// Resolves the renames from `source` to `target`, falling back to names in `fallback`.
///
/// Fails with a [`MappingError::Configuration`] if the target namespace doesn't exist. A missing fallback namespace is
/// replaced by the source namespace, with a warning. Entities that can't be renamed are reported in
/// [`RenamePlan::warnings`], resolving them never fails.
///
/// Parameters and local variables are only included with `include_locals`.
pub fn resolve(tree: &MappingTree, source: &str, fallback: &str, target: &str, include_locals: bool) -> Result<RenamePlan> {
	let target_namespace = tree.namespace(target)
		.ok_or_else(|| MappingError::configuration(format!("target namespace {target:?} not found in mappings, only got {:?}", tree.namespaces())))?;

	let mut warnings = Vec::new();

	let source_namespace = tree.namespace(source);
	if source_namespace.is_none() {
		warnings.push(EntryWarning::logged(
			format!("namespace {source:?}"),
			format!("source namespace not found in mappings {:?}, only names from the fallback namespace are used", tree.namespaces()),
		));
	}

	let fallback_namespace = match tree.namespace(fallback) {
		Some(namespace) => Some(namespace),
		None => {
			warnings.push(EntryWarning::logged(
				format!("namespace {fallback:?}"),
				format!("fallback namespace not found in mappings {:?}, falling back to {source:?}", tree.namespaces()),
			));
			source_namespace
		},
	};

	let lookup = Lookup { source: source_namespace, fallback: fallback_namespace, target: target_namespace };

	let mut records = Vec::new();
	let mut current = Current::default();

	for event in tree.events() {
		match event {
			TreeEvent::Namespaces(_) => {},
			TreeEvent::Class(class) => {
				current.method = None;
				current.class = resolve_class(tree, &lookup, class, target, &mut records, &mut warnings);
			},
			TreeEvent::Field(_, field) => {
				let Some(owner) = current.class.as_deref() else { continue };
				let Some((from, desc)) = member_from(tree, &lookup, &field.names, field.desc.as_ref(), "field", owner, &mut warnings) else { continue };
				match lookup.to(&field.names) {
					Some(to) => records.push(RenameRecord::Field { owner: owner.to_owned(), name: from, desc, to: to.to_owned() }),
					None => trace!("no name for field {owner}.{from} in {target:?}, keeping it"),
				}
			},
			TreeEvent::Method(_, method) => {
				current.method = None;
				let Some(owner) = current.class.as_deref() else { continue };
				let Some((from, desc)) = member_from(tree, &lookup, &method.names, method.desc.as_ref(), "method", owner, &mut warnings) else { continue };
				match lookup.to(&method.names) {
					Some(to) => records.push(RenameRecord::Method { owner: owner.to_owned(), name: from.clone(), desc: desc.clone(), to: to.to_owned() }),
					None => trace!("no name for method {owner}.{from} in {target:?}, keeping it"),
				}
				// parameters may have names even if the method keeps its name
				current.method = Some((from, desc));
			},
			TreeEvent::Param(_, _, param) => {
				if !include_locals {
					continue;
				}
				let Some((owner, name, desc)) = current.method() else { continue };
				if let Some(to) = lookup.to(&param.names) {
					records.push(RenameRecord::Param {
						owner: owner.to_owned(),
						method: name.to_owned(),
						desc: desc.map(str::to_owned),
						lv_index: param.lv_index,
						to: to.to_owned(),
					});
				}
			},
			TreeEvent::Local(_, _, local) => {
				if !include_locals {
					continue;
				}
				let Some((owner, name, desc)) = current.method() else { continue };
				if let Some(to) = lookup.to(&local.names) {
					records.push(RenameRecord::Local {
						owner: owner.to_owned(),
						method: name.to_owned(),
						desc: desc.map(str::to_owned),
						key: local.key,
						to: to.to_owned(),
					});
				}
			},
		}
	}

	debug!("resolved {} renames from {source:?} to {target:?} (fallback {fallback:?}), with {} warnings", records.len(), warnings.len());

	Ok(RenamePlan {
		source: source.to_owned(),
		target: target.to_owned(),
		records,
		warnings,
	})
}

/// Adds the rename for the class, returning its source side name, or [`None`] if it has none.
fn resolve_class(
	tree: &MappingTree,
	lookup: &Lookup,
	class: &ClassEntry,
	target: &str,
	records: &mut Vec<RenameRecord>,
	warnings: &mut Vec<EntryWarning>,
) -> Option<String> {
	let Some((_, from)) = lookup.from(class.names()) else {
		warnings.push(EntryWarning::logged(
			format!("class {:?}", class.names()),
			format!("class has no name in the source or fallback namespace of {:?}, skipping it", tree.namespaces()),
		));
		return None;
	};

	let to = match class.names().get(lookup.target) {
		Some(to) => to,
		None => {
			let to = lookup.to(class.names()).unwrap_or(from);
			warnings.push(EntryWarning::logged(
				format!("class {from}"),
				format!("class has no name in {target:?}, using {to:?}"),
			));
			to
		},
	};

	records.push(RenameRecord::Class { from: from.to_owned(), to: to.to_owned() });
	Some(from.to_owned())
}

/// The source side name and descriptor of a member, with a warning if there's none.
fn member_from(
	tree: &MappingTree,
	lookup: &Lookup,
	names: &Names,
	desc: Option<&Descriptor>,
	kind: &str,
	owner: &str,
	warnings: &mut Vec<EntryWarning>,
) -> Option<(String, Option<String>)> {
	let Some((namespace, from)) = lookup.from(names) else {
		warnings.push(EntryWarning::logged(
			format!("{kind} {owner}.{names:?}"),
			format!("{kind} has no name in the source or fallback namespace, skipping it"),
		));
		return None;
	};

	// the descriptor must be in the same namespace as the name it's looked up with
	match desc.map(|desc| tree.descriptor_in(desc, namespace)).transpose() {
		Ok(desc) => Some((from.to_owned(), desc)),
		Err(e) => {
			warnings.push(EntryWarning::logged(
				format!("{kind} {owner}.{from}"),
				format!("{:#}", e.context("invalid descriptor, skipping it")),
			));
			None
		},
	}
}

impl Current {
	fn method(&self) -> Option<(&str, &str, Option<&str>)> {
		let owner = self.class.as_deref()?;
		let (name, desc) = self.method.as_ref()?;
		Some((owner, name, desc.as_deref()))
	}
}
