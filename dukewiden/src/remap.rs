//! Remapping access wideners to another namespace.

use anyhow::{anyhow, Context, Result};
use log::debug;
use quill::error::{EntryWarning, MappingError};
use quill::remapper::{MemberRemapper, NoSuperClassProvider};
use quill::tree::mappings::MappingTree;
use crate::{AccessWidener, Rule, Target};

#[derive(Debug, Clone, PartialEq)]
pub enum RemapOutcome {
	Remapped(AccessWidener),
	/// The namespace of the access widener isn't in the mappings. The access widener is the unchanged input.
	Skipped {
		widener: AccessWidener,
		warning: EntryWarning,
	},
}

/// Remaps the access widener from its own namespace to `target`.
///
/// Names come from the source namespace of the mappings, that is the one of the access widener, and fall back to it.
/// If the mappings don't have the namespace of the access widener, this fails with
/// [`MappingError::NamespaceMismatch`] if `strict` is set, or otherwise returns [`RemapOutcome::Skipped`].
pub fn remap(widener: &AccessWidener, tree: &MappingTree, target: &str, strict: bool) -> Result<RemapOutcome> {
	if widener.namespace == target {
		return Ok(RemapOutcome::Remapped(widener.clone()));
	}

	if tree.namespace(&widener.namespace).is_none() {
		let message = format!("can't remap access widener from namespace {:?}, the mappings only have {:?}", widener.namespace, tree.namespaces());
		if strict {
			return Err(MappingError::namespace_mismatch(message));
		}
		let warning = EntryWarning::logged(format!("access widener in {:?}", widener.namespace), format!("{message}, leaving it as it is"));
		return Ok(RemapOutcome::Skipped { widener: widener.clone(), warning });
	}

	let plan = quill::fallback::resolve(tree, &widener.namespace, &widener.namespace, target, false)?;
	let remapper = plan.remapper(&NoSuperClassProvider);

	Ok(RemapOutcome::Remapped(remap_with(widener, &remapper, target)?))
}

/// Remaps all rules with the given remapper, giving an access widener in the `target` namespace.
pub fn remap_with<R: MemberRemapper + ?Sized>(widener: &AccessWidener, remapper: &R, target: &str) -> Result<AccessWidener> {
	let mut remapped = AccessWidener::new(widener.version, target);

	for rule in &widener.rules {
		let target = remap_target(&rule.target, remapper)
			.with_context(|| anyhow!("failed to remap access widener rule for {:?}", rule.target))?;
		remapped.add(Rule { access: rule.access, transitive: rule.transitive, target })?;
	}

	debug!("remapped {} access widener rules from {:?} to {target:?}", remapped.rules.len(), widener.namespace);
	Ok(remapped)
}

fn remap_target<R: MemberRemapper + ?Sized>(target: &Target, remapper: &R) -> Result<Target> {
	Ok(match target {
		Target::Class { class } => Target::Class { class: remapper.map_class(class)? },
		Target::Method { class, name, desc } => Target::Method {
			class: remapper.map_class(class)?,
			name: remapper.map_method(class, name, desc)?,
			desc: remapper.map_desc(desc)?,
		},
		Target::Field { class, name, desc } => Target::Field {
			class: remapper.map_class(class)?,
			name: remapper.map_field(class, name, desc)?,
			desc: remapper.map_desc(desc)?,
		},
	})
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use quill::error::MappingError;
	use crate::remap::RemapOutcome;

	const MAPPINGS: &str = "\
tiny\t2\t0\tofficial\tnamed
c\ta\tnet/example/Apple
\tf\tI\tb\tseeds
\tm\t(La;)V\tc\tbite
";

	#[test]
	fn remap() -> Result<()> {
		let tree = quill::tiny_v2::read(MAPPINGS.as_bytes())?;
		let widener = crate::read(b"\
accessWidener v1 official
accessible class a
accessible method a c (La;)V
mutable field a b I
accessible class x
")?;

		let RemapOutcome::Remapped(remapped) = super::remap(&widener, &tree, "named", true)? else {
			panic!("expected the access widener to be remapped");
		};
		assert_eq!(crate::write_string(&remapped), "\
accessWidener\tv1\tnamed
accessible\tclass\tnet/example/Apple
accessible\tmethod\tnet/example/Apple\tbite\t(Lnet/example/Apple;)V
mutable\tfield\tnet/example/Apple\tseeds\tI
accessible\tclass\tx
");

		// remapping to its own namespace changes nothing
		assert_eq!(super::remap(&widener, &tree, "official", true)?, RemapOutcome::Remapped(widener.clone()));

		// a missing target namespace is always an error
		let error = super::remap(&widener, &tree, "intermediary", false).unwrap_err();
		assert!(matches!(error.downcast_ref::<MappingError>(), Some(MappingError::Configuration(_))), "{error:?}");
		Ok(())
	}

	#[test]
	fn namespace_mismatch() -> Result<()> {
		let tree = quill::tiny_v2::read(MAPPINGS.as_bytes())?;
		let widener = crate::read(b"accessWidener v1 intermediary\naccessible class class_1\n")?;

		let error = super::remap(&widener, &tree, "named", true).unwrap_err();
		assert!(matches!(error.downcast_ref::<MappingError>(), Some(MappingError::NamespaceMismatch(_))), "{error:?}");

		let RemapOutcome::Skipped { widener: skipped, .. } = super::remap(&widener, &tree, "named", false)? else {
			panic!("expected the access widener to be skipped");
		};
		assert_eq!(skipped, widener);
		Ok(())
	}
}
