//! Visiting a whole [`MappingTree`] as a flat sequence of events.
//!
//! The order is always: the namespaces, then for each class the class itself, its fields, and its methods each
//! followed by their parameters and local variables.

use std::iter::once;
use crate::tree::mappings::{ClassEntry, FieldEntry, LocalEntry, MappingTree, MethodEntry, ParamEntry};
use crate::tree::names::Namespaces;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TreeEvent<'a> {
	Namespaces(&'a Namespaces),
	Class(&'a ClassEntry),
	Field(&'a ClassEntry, &'a FieldEntry),
	Method(&'a ClassEntry, &'a MethodEntry),
	Param(&'a ClassEntry, &'a MethodEntry, &'a ParamEntry),
	Local(&'a ClassEntry, &'a MethodEntry, &'a LocalEntry),
}

impl MappingTree {
	/// Iterates over everything in this tree, in insertion order.
	pub fn events(&self) -> impl Iterator<Item=TreeEvent<'_>> {
		once(TreeEvent::Namespaces(self.namespaces()))
			.chain(self.classes().flat_map(class_events))
	}
}

fn class_events(class: &ClassEntry) -> impl Iterator<Item=TreeEvent<'_>> {
	once(TreeEvent::Class(class))
		.chain(class.fields.iter().map(move |field| TreeEvent::Field(class, field)))
		.chain(class.methods.iter().flat_map(move |method| {
			once(TreeEvent::Method(class, method))
				.chain(method.params.iter().map(move |param| TreeEvent::Param(class, method, param)))
				.chain(method.locals.iter().map(move |local| TreeEvent::Local(class, method, local)))
		}))
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::tree::events::TreeEvent;
	use crate::tree::mappings::{LocalKey, MappingTree};

	#[test]
	fn events_follow_insertion_order() -> Result<()> {
		let mut tree = MappingTree::with_namespaces(&["official"])?;
		let official = tree.require_namespace("official")?;
		let b = tree.get_or_create_class(official, "b")?;
		let a = tree.get_or_create_class(official, "a")?;
		let method = tree.get_or_create_method(b, official, "m", Some("(I)V"))?;
		method.get_or_create_param(1);
		method.get_or_create_local(LocalKey { lv_index: 2, start_offset: 0, lvt_row: None });
		tree.get_or_create_field(b, official, "f", Some("I"))?;
		tree.get_or_create_field(a, official, "g", Some("J"))?;

		let kinds: Vec<&str> = tree.events()
			.map(|event| match event {
				TreeEvent::Namespaces(_) => "namespaces",
				TreeEvent::Class(_) => "class",
				TreeEvent::Field(..) => "field",
				TreeEvent::Method(..) => "method",
				TreeEvent::Param(..) => "param",
				TreeEvent::Local(..) => "local",
			})
			.collect();
		assert_eq!(kinds, ["namespaces", "class", "field", "method", "param", "local", "class", "field"]);
		Ok(())
	}
}
