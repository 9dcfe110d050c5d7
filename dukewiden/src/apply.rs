//! Applying an access widener to the classes of a jar.

use std::path::Path;
use anyhow::{anyhow, Result};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use rayon::prelude::*;
use duke::access;
use duke::attribute::{self, InnerClasses};
use dukebox::storage::{self, FileJar, Jar, JarEntry, JarEntryEnum, OpenedJar};
use quill::error::{EntryWarning, MappingError};
use crate::{Access, AccessWidener, Target};

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
	/// Fail if the namespace of the access widener isn't the one of the jar, instead of copying the jar unchanged.
	pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
	Applied,
	/// The access widener is for another namespace, the output is a copy of the input.
	SkippedNamespaceMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
	pub outcome: ApplyOutcome,
	pub output: FileJar,
	/// The classes that got their access changed.
	pub widened_classes: IndexSet<String>,
	pub warnings: Vec<EntryWarning>,
}

/// The accesses to add to a class, method or field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Widening {
	accessible: bool,
	extendable: bool,
	mutable: bool,
}

impl Widening {
	fn add(&mut self, access: Access) {
		match access {
			Access::Accessible => self.accessible = true,
			Access::Extendable => self.extendable = true,
			Access::Mutable => self.mutable = true,
		}
	}

	/// Applies to class and method flags.
	fn apply(self, flags: u16) -> u16 {
		let mut flags = flags;
		if self.accessible || self.extendable {
			flags = access::make_public(flags);
		}
		if self.extendable {
			flags = access::make_non_final(flags);
		}
		flags
	}

	fn apply_field(self, flags: u16) -> u16 {
		let mut flags = flags;
		if self.accessible {
			flags = access::make_public(flags);
		}
		if self.mutable {
			flags = access::make_non_final(flags);
		}
		flags
	}
}

#[derive(Debug, Default)]
struct ClassTargets {
	class: Widening,
	/// By name, then descriptor.
	methods: IndexMap<String, IndexMap<String, Widening>>,
	fields: IndexMap<String, IndexMap<String, Widening>>,
}

#[derive(Debug, Default)]
struct Targets {
	classes: IndexMap<String, ClassTargets>,
	/// The classes to look at: the ones with rules, and their outer classes, for the `InnerClasses` attribute.
	wanted: IndexSet<String>,
}

impl Targets {
	fn new(widener: &AccessWidener) -> Targets {
		let mut targets = Targets::default();
		for rule in &widener.rules {
			let class = targets.classes.entry(rule.target.class().to_owned()).or_default();
			match &rule.target {
				Target::Class { .. } => class.class.add(rule.access),
				Target::Method { name, desc, .. } => {
					class.methods.entry(name.clone()).or_default().entry(desc.clone()).or_default().add(rule.access);
				},
				Target::Field { name, desc, .. } => {
					class.fields.entry(name.clone()).or_default().entry(desc.clone()).or_default().add(rule.access);
				},
			}
		}

		for class in targets.classes.keys() {
			let mut name = class.as_str();
			targets.wanted.insert(name.to_owned());
			while let Some((outer, _)) = name.rsplit_once('$') {
				targets.wanted.insert(outer.to_owned());
				name = outer;
			}
		}
		targets
	}

	fn class(&self, class: &str) -> Widening {
		self.classes.get(class).map(|targets| targets.class).unwrap_or_default()
	}
}

/// Applies the access widener to the jar, writing the result to `output`.
///
/// The access widener must be in `namespace`, the namespace of the jar. If it isn't, this fails with
/// [`MappingError::NamespaceMismatch`] if [`ApplyOptions::strict`] is set, and otherwise copies the jar unchanged.
///
/// A class that fails to be changed is copied unchanged, with a warning. Another warning lists the classes that have
/// rules but aren't in the jar.
pub fn apply(widener: &AccessWidener, namespace: &str, jar: &impl Jar, output: &Path, options: &ApplyOptions) -> Result<ApplyResult> {
	if widener.namespace != namespace {
		let message = format!("access widener namespace {:?} doesn't match the namespace {namespace:?} of the jar", widener.namespace);
		if options.strict {
			return Err(MappingError::namespace_mismatch(message));
		}
		let warning = EntryWarning::logged(output.display().to_string(), format!("{message}, copying the jar without applying it"));

		let entries = jar.open()?.entries()?;
		storage::write_file(output, |zip| {
			for entry in &entries {
				storage::write_entry(zip, entry)?;
			}
			Ok(())
		})?;

		return Ok(ApplyResult {
			outcome: ApplyOutcome::SkippedNamespaceMismatch,
			output: FileJar::new(output),
			widened_classes: IndexSet::new(),
			warnings: vec![warning],
		});
	}

	let targets = Targets::new(widener);
	let entries = jar.open()?.entries()?;

	let (widened_classes, mut warnings, found) = storage::write_file(output, |zip| {
		let processed: Vec<Processed> = entries.into_par_iter()
			.map(|entry| widen_entry(entry, &targets))
			.collect();

		let mut widened_classes = IndexSet::new();
		let mut warnings = Vec::new();
		let mut found = IndexSet::new();
		for processed in processed {
			if let Some(class) = processed.found {
				if processed.widened {
					widened_classes.insert(class.clone());
				}
				found.insert(class);
			}
			warnings.extend(processed.warning);
			storage::write_entry(zip, &processed.entry)?;
		}
		Ok((widened_classes, warnings, found))
	})?;

	let missing: Vec<&str> = targets.classes.keys()
		.map(String::as_str)
		.filter(|class| !found.contains(*class))
		.collect();
	if !missing.is_empty() {
		warnings.push(EntryWarning::logged(output.display().to_string(), format!("access widener did not find the following classes: {missing:?}")));
	}

	info!("widened {} classes into {output:?}", widened_classes.len());
	Ok(ApplyResult {
		outcome: ApplyOutcome::Applied,
		output: FileJar::new(output),
		widened_classes,
		warnings,
	})
}

struct Processed {
	entry: JarEntry,
	/// The name of the class, if it's one that was looked at.
	found: Option<String>,
	widened: bool,
	warning: Option<EntryWarning>,
}

fn widen_entry(entry: JarEntry, targets: &Targets) -> Processed {
	let Some(class) = entry.class_name().filter(|class| targets.wanted.contains(*class)).map(str::to_owned) else {
		return Processed { entry, found: None, widened: false, warning: None };
	};
	let JarEntryEnum::Class(bytes) = &entry.data else {
		return Processed { entry, found: None, widened: false, warning: None };
	};

	match widen_class(bytes, &class, targets) {
		Ok(Some(data)) => {
			debug!("widened {class}");
			let entry = JarEntry { data: JarEntryEnum::Class(data), ..entry };
			Processed { entry, found: Some(class), widened: true, warning: None }
		},
		Ok(None) => Processed { entry, found: Some(class), widened: false, warning: None },
		Err(e) => {
			let warning = EntryWarning::logged(&entry.name, format!("failed to apply access widener to {class}, copying it unchanged: {e:#}"));
			Processed { entry, found: Some(class), widened: false, warning: Some(warning) }
		},
	}
}

/// Widens the class, returning the new bytes, or [`None`] if nothing changed.
fn widen_class(bytes: &[u8], name: &str, targets: &Targets) -> Result<Option<Vec<u8>>> {
	let mut class = duke::read_class(bytes)?;
	if class.name()? != name {
		return Err(anyhow!("entry is named after {name:?}, but the class is {:?}", class.name()?));
	}

	let mut changed = false;

	if let Some(own) = targets.classes.get(name) {
		let flags = own.class.apply(class.access);
		changed |= flags != class.access;
		class.access = flags;

		for method in &mut class.methods {
			let widening = own.methods.get(method.name(&class.pool)?)
				.map(|descs| Ok::<_, anyhow::Error>(descs.get(method.descriptor(&class.pool)?))).transpose()?.flatten();
			if let Some(widening) = widening {
				let flags = widening.apply(method.access);
				changed |= flags != method.access;
				method.access = flags;
			}
		}
		for field in &mut class.fields {
			let widening = own.fields.get(field.name(&class.pool)?)
				.map(|descs| Ok::<_, anyhow::Error>(descs.get(field.descriptor(&class.pool)?))).transpose()?.flatten();
			if let Some(widening) = widening {
				let flags = widening.apply_field(field.access);
				changed |= flags != field.access;
				field.access = flags;
			}
		}
	}

	for attribute in &mut class.attributes {
		if attribute.name(&class.pool)? != attribute::INNER_CLASSES {
			continue;
		}
		attribute::modify(attribute, |InnerClasses(inner_classes): &mut InnerClasses| {
			let mut inner_changed = false;
			for inner in inner_classes {
				let widening = targets.class(class.pool.get_class(inner.inner_class_info_index)?);
				let flags = widening.apply(inner.inner_class_access_flags);
				inner_changed |= flags != inner.inner_class_access_flags;
				inner.inner_class_access_flags = flags;
			}
			changed |= inner_changed;
			Ok(inner_changed)
		})?;
	}

	if changed {
		Ok(Some(class.to_bytes()?))
	} else {
		Ok(None)
	}
}
