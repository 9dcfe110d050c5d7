use std::fmt::{Display, Formatter};
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use crate::tree::mappings::{ClassId, Descriptor, FieldEntry, MappingTree, MemberKind, MethodEntry};
use crate::tree::names::{Names, Namespace, Namespaces};

/// What to do when both trees have a different name for the same entity in the same namespace.
///
/// In both cases the name from the tree merged in wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
	/// Log a warning and return the conflict from [`MappingTree::merge`].
	#[default]
	Report,
	/// The incoming tree is authoritative, only log at debug level.
	Overwrite,
}

/// Two different names for the same entity, of which `incoming` was kept.
///
/// An empty `incoming` means that the class lost its name to another class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
	pub namespace: String,
	pub entity: String,
	pub existing: String,
	pub incoming: String,
}

impl Display for NameConflict {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "conflicting names for {} in namespace {:?}: {:?} replaced by {:?}", self.entity, self.namespace, self.existing, self.incoming)
	}
}

struct Conflicts {
	policy: ConflictPolicy,
	found: Vec<NameConflict>,
}

impl Conflicts {
	/// Returns whether the incoming name needs to be written.
	fn check(&mut self, namespace: &str, entity: impl FnOnce() -> String, existing: Option<&str>, incoming: &str) -> bool {
		match existing {
			Some(existing) if existing == incoming => false,
			Some(existing) => {
				let conflict = NameConflict {
					namespace: namespace.to_owned(),
					entity: entity(),
					existing: existing.to_owned(),
					incoming: incoming.to_owned(),
				};
				self.record(conflict);
				true
			},
			None => true,
		}
	}

	/// For a class name that moves from the class `holder` to another class. The holder loses that name.
	fn taken(&mut self, namespace: &str, holder: &str, name: &str) {
		self.record(NameConflict {
			namespace: namespace.to_owned(),
			entity: format!("class {holder}"),
			existing: name.to_owned(),
			incoming: String::new(),
		});
	}

	fn record(&mut self, conflict: NameConflict) {
		match self.policy {
			ConflictPolicy::Report => {
				warn!("{conflict}");
				self.found.push(conflict);
			},
			ConflictPolicy::Overwrite => debug!("{conflict}"),
		}
	}

	fn merge_names(&mut self, names: &mut Names, incoming: &Names, namespaces: &[Namespace], other: &Namespaces, entity: impl Fn() -> String) {
		for (other_namespace, name) in incoming.iter() {
			let namespace = namespaces[other_namespace.id()];
			if self.check(other.name(other_namespace), &entity, names.get(namespace), name) {
				names.set(namespace, Some(name));
			}
		}
	}
}

fn merge_comment(comment: &mut Option<String>, incoming: &Option<String>) {
	if incoming.is_some() {
		comment.clone_from(incoming);
	}
}

/// The names to look an entity up with, the one of the switch namespace first.
fn candidates(names: &Names, switch: Namespace) -> Vec<(Namespace, &str)> {
	names.get(switch).map(|name| (switch, name)).into_iter()
		.chain(names.iter().filter(|&(namespace, _)| namespace != switch))
		.collect()
}

/// Gives a name of an entity for messages, preferring the namespace used for matching.
fn display_name<'a>(names: &'a Names, switch: Namespace) -> &'a str {
	names.get(switch)
		.or_else(|| names.first().map(|(_, name)| name))
		.unwrap_or("<unnamed>")
}

impl MappingTree {
	/// Merges another tree into this one.
	///
	/// All namespaces of `other` get added to this tree, if they don't exist yet. Classes are matched by their name in the
	/// `switch` namespace first, and then by any other name. Members are matched the same way, within their class.
	/// Everything not matched gets added.
	///
	/// If an entity already has a different name in some namespace, the incoming one is kept and the conflict is handled
	/// according to the policy. The returned conflicts are the ones of [`ConflictPolicy::Report`].
	///
	/// A class name the incoming tree gives to another class than the one holding it moves to that class. The class
	/// holding it loses its name in that namespace, which is a conflict too.
	pub fn merge(&mut self, other: &MappingTree, switch: &str, policy: ConflictPolicy) -> Result<Vec<NameConflict>> {
		let other_switch = other.require_namespace(switch)
			.with_context(|| anyhow!("namespace to merge on isn't in the incoming mappings"))?;

		let namespaces: Vec<Namespace> = other.namespaces().names()
			.map(|name| self.add_namespace(name))
			.collect::<Result<_>>()?;

		let mut conflicts = Conflicts { policy, found: Vec::new() };

		// all classes first, so that descriptors can be translated with the complete class table
		let mut class_ids = Vec::with_capacity(other.class_count());
		for other_class in other.classes() {
			let lookups = candidates(other_class.names(), other_switch);

			let existing = lookups.iter()
				.find_map(|&(namespace, name)| self.class_id(namespaces[namespace.id()], name));

			let id = match existing {
				Some(id) => id,
				None => {
					let &(namespace, name) = lookups.first()
						.with_context(|| anyhow!("class without any name in incoming mappings"))?;
					self.get_or_create_class(namespaces[namespace.id()], name)?
				},
			};

			for (other_namespace, name) in other_class.names().iter() {
				let namespace = namespaces[other_namespace.id()];
				let entity = || format!("class {}", display_name(other_class.names(), other_switch));
				if conflicts.check(other.namespaces().name(other_namespace), entity, self.get(id).name(namespace), name) {
					if let Some(holder) = self.class_id(namespace, name).filter(|&holder| holder != id) {
						let holder_name = display_name(self.get(holder).names(), namespaces[other_switch.id()]).to_owned();
						conflicts.taken(other.namespaces().name(other_namespace), &holder_name, name);
						self.set_class_name(holder, namespace, None)
							.with_context(|| anyhow!("failed to move class name {name:?} away from class {holder_name:?}"))?;
					}
					self.set_class_name(id, namespace, Some(name))
						.with_context(|| anyhow!("failed to merge class {:?}", other_class.names()))?;
				}
			}
			merge_comment(&mut self.get_mut(id).comment, &other_class.comment);

			class_ids.push(id);
		}

		for (other_class, &id) in other.classes().zip(&class_ids) {
			let class_name = display_name(other_class.names(), other_switch);

			for field in &other_class.fields {
				let index = self.find_or_create_member(other, id, MemberKind::Field, &field.names, field.desc.as_ref(), other_switch, &namespaces)?;
				let entry = &mut self.get_mut(id).fields[index];
				conflicts.merge_names(&mut entry.names, &field.names, &namespaces, other.namespaces(), || {
					format!("field {class_name}.{}", display_name(&field.names, other_switch))
				});
				merge_comment(&mut entry.comment, &field.comment);
			}

			for method in &other_class.methods {
				let index = self.find_or_create_member(other, id, MemberKind::Method, &method.names, method.desc.as_ref(), other_switch, &namespaces)?;
				let entry = &mut self.get_mut(id).methods[index];
				let method_name = || format!("method {class_name}.{}", display_name(&method.names, other_switch));
				conflicts.merge_names(&mut entry.names, &method.names, &namespaces, other.namespaces(), &method_name);
				merge_comment(&mut entry.comment, &method.comment);

				for param in &method.params {
					let target = entry.get_or_create_param(param.lv_index);
					conflicts.merge_names(&mut target.names, &param.names, &namespaces, other.namespaces(), || {
						format!("parameter {} of {}", param.lv_index, method_name())
					});
					merge_comment(&mut target.comment, &param.comment);
				}

				for local in &method.locals {
					let target = entry.get_or_create_local(local.key);
					conflicts.merge_names(&mut target.names, &local.names, &namespaces, other.namespaces(), || {
						format!("local variable {:?} of {}", local.key, method_name())
					});
					merge_comment(&mut target.comment, &local.comment);
				}
			}
		}

		Ok(conflicts.found)
	}

	/// Finds the member in this tree, looking it up with the names and descriptor from the other tree, creating it if needed.
	#[allow(clippy::too_many_arguments)]
	fn find_or_create_member(
		&mut self,
		other: &MappingTree,
		class: ClassId,
		kind: MemberKind,
		names: &Names,
		desc: Option<&Descriptor>,
		other_switch: Namespace,
		namespaces: &[Namespace],
	) -> Result<usize> {
		let mut lookups = Vec::new();
		for (other_namespace, name) in candidates(names, other_switch) {
			let desc = desc.map(|desc| other.descriptor_in(desc, other_namespace)).transpose()?;
			lookups.push((namespaces[other_namespace.id()], name, desc));
		}

		for (namespace, name, desc) in &lookups {
			if let Some(index) = self.find_member(class, kind, *namespace, name, desc.as_deref())? {
				return Ok(index);
			}
		}

		let (namespace, name, desc) = lookups.into_iter().next()
			.with_context(|| anyhow!("{kind:?} without any name in incoming mappings"))?;
		let mut names = Names::default();
		names.set(namespace, Some(name));
		let desc = desc.map(|value| Descriptor { namespace, value });

		let class = self.get_mut(class);
		Ok(match kind {
			MemberKind::Field => {
				class.fields.push(FieldEntry { names, desc, comment: None });
				class.fields.len() - 1
			},
			MemberKind::Method => {
				class.methods.push(MethodEntry { names, desc, params: Vec::new(), locals: Vec::new(), comment: None });
				class.methods.len() - 1
			},
		})
	}
}

#[cfg(test)]
mod testing {
	use anyhow::{anyhow, Result};
	use pretty_assertions::assert_eq;
	use crate::action::merge::{ConflictPolicy, NameConflict};
	use crate::tree::mappings::MappingTree;

	fn tree(input: &str) -> Result<MappingTree> {
		crate::tiny_v2::read(input.as_bytes())
	}

	#[test]
	fn members_are_matched_through_translated_descriptors() -> Result<()> {
		let mut base = tree("tiny\t2\t0\tofficial\tintermediary\nc\ta\tclass_1\nc\tb\tclass_2\n\tm\t(La;)Lb;\tc\tmethod_3\n")?;
		let incoming = tree("tiny\t2\t0\tintermediary\tnamed\nc\tclass_2\tBanana\n\tm\t(Lclass_1;)Lclass_2;\tmethod_3\tpeel\n\t\tp\t1\t\tapple\n")?;

		let conflicts = base.merge(&incoming, "intermediary", ConflictPolicy::Report)?;
		assert_eq!(conflicts, vec![]);
		base.namespaces().check_that(&["official", "intermediary", "named"])?;

		let named = base.require_namespace("named")?;
		let official = base.require_namespace("official")?;
		let banana = base.class(named, "Banana").ok_or_else(|| anyhow!("no class Banana"))?;
		assert_eq!(banana.name(official), Some("b"));
		assert_eq!(banana.methods.len(), 1);
		assert_eq!(banana.methods[0].names.get(named), Some("peel"));
		assert_eq!(banana.methods[0].param(1).and_then(|p| p.names.get(named)), Some("apple"));
		Ok(())
	}

	#[test]
	fn conflicts_are_reported_and_incoming_wins() -> Result<()> {
		let mut base = tree("tiny\t2\t0\tofficial\tnamed\nc\ta\tApple\n\tf\tI\tb\tseeds\n")?;
		let incoming = tree("tiny\t2\t0\tofficial\tnamed\nc\ta\tApple\n\tf\tI\tb\tpips\n")?;

		let conflicts = base.merge(&incoming, "official", ConflictPolicy::Report)?;
		assert_eq!(conflicts, vec![NameConflict {
			namespace: "named".to_owned(),
			entity: "field a.b".to_owned(),
			existing: "seeds".to_owned(),
			incoming: "pips".to_owned(),
		}]);

		let named = base.require_namespace("named")?;
		let apple = base.class(named, "Apple").ok_or_else(|| anyhow!("no class Apple"))?;
		assert_eq!(apple.fields.len(), 1);
		assert_eq!(apple.fields[0].names.get(named), Some("pips"));

		let incoming = tree("tiny\t2\t0\tofficial\tnamed\nc\ta\tPear\n")?;
		assert_eq!(base.merge(&incoming, "official", ConflictPolicy::Overwrite)?, vec![]);
		assert!(base.class(named, "Pear").is_some());
		assert!(base.class(named, "Apple").is_none());
		Ok(())
	}

	#[test]
	fn class_names_move_to_the_incoming_class() -> Result<()> {
		let mut base = tree("tiny\t2\t0\tofficial\tnamed\nc\ta\tApple\nc\tb\tBanana\n")?;
		let incoming = tree("tiny\t2\t0\tofficial\tnamed\nc\tb\tApple\n")?;

		let conflicts = base.merge(&incoming, "official", ConflictPolicy::Report)?;
		assert_eq!(conflicts, vec![
			NameConflict {
				namespace: "named".to_owned(),
				entity: "class b".to_owned(),
				existing: "Banana".to_owned(),
				incoming: "Apple".to_owned(),
			},
			NameConflict {
				namespace: "named".to_owned(),
				entity: "class a".to_owned(),
				existing: "Apple".to_owned(),
				incoming: String::new(),
			},
		]);

		let official = base.require_namespace("official")?;
		let named = base.require_namespace("named")?;
		assert_eq!(base.class(official, "a").ok_or_else(|| anyhow!("no class a"))?.name(named), None);
		assert_eq!(base.class(named, "Apple").and_then(|class| class.name(official)), Some("b"));
		assert!(base.class(named, "Banana").is_none());

		// moving the only name of a class would lose the class
		let mut base = tree("tiny\t2\t0\tofficial\tnamed\nc\ta\tApple\nc\t\tPear\n")?;
		let incoming = tree("tiny\t2\t0\tofficial\tnamed\nc\ta\tPear\n")?;
		assert!(base.merge(&incoming, "official", ConflictPolicy::Overwrite).is_err());
		Ok(())
	}

	#[test]
	fn missing_switch_namespace_fails() -> Result<()> {
		let mut base = MappingTree::with_namespaces(&["official"])?;
		let incoming = MappingTree::with_namespaces(&["named"])?;
		assert!(base.merge(&incoming, "official", ConflictPolicy::Report).is_err());
		Ok(())
	}
}
