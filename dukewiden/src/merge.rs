//! Merging access wideners from several sources into one.

use anyhow::{anyhow, Context, Result};
use log::info;
use rayon::prelude::*;
use quill::error::EntryWarning;
use quill::tree::mappings::MappingTree;
use crate::{AccessWidener, Version};
use crate::remap::RemapOutcome;

/// An access widener merged from others, in the target namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
	pub widener: AccessWidener,
	/// A warning for each input that was skipped.
	pub warnings: Vec<EntryWarning>,
}

/// Remaps each access widener to `target`, and merges them into one.
///
/// The inputs are remapped in parallel, and then unioned in order. Since a union doesn't care about order or duplicates,
/// the resulting rules are the same for any order of the inputs.
///
/// Inputs with a namespace that the mappings don't have fail the merge with `strict`, and are left out otherwise.
pub fn merge(inputs: &[(String, AccessWidener)], tree: &MappingTree, target: &str, strict: bool) -> Result<Merged> {
	let outcomes = inputs.par_iter()
		.map(|(name, widener)| {
			crate::remap::remap(widener, tree, target, strict)
				.with_context(|| anyhow!("failed to remap access widener {name:?}"))
		})
		.collect::<Result<Vec<_>>>()?;

	let mut merged = AccessWidener::new(Version::V1, target);
	let mut warnings = Vec::new();

	for ((name, _), outcome) in inputs.iter().zip(outcomes) {
		match outcome {
			RemapOutcome::Remapped(widener) => {
				merged.extend(widener)
					.with_context(|| anyhow!("failed to merge access widener {name:?}"))?;
			},
			RemapOutcome::Skipped { warning, .. } => {
				warnings.push(EntryWarning::new(name, format!("not merged: {}", warning.message)));
			},
		}
	}

	info!("merged {} access wideners into {} rules in namespace {target:?}", inputs.len() - warnings.len(), merged.rules.len());
	Ok(Merged { widener: merged, warnings })
}
