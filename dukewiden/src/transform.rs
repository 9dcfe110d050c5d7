use std::path::Path;
use anyhow::{anyhow, Context, Result};
use dukebox::transform::{Resource, ResourceTransformer};
use quill::error::{EntryWarning, MappingError};
use quill::remapper::MemberRemapper;

/// Remaps the access wideners (files ending in `.accesswidener` or `.aw`) inside a jar while it's remapped.
///
/// Access wideners are expected to be in the `source` namespace of the remap. Others fail the remap if `strict` is set,
/// or are copied unchanged, with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessWidenerTransformer {
	pub source: String,
	pub target: String,
	pub strict: bool,
}

impl AccessWidenerTransformer {
	pub fn new(source: impl Into<String>, target: impl Into<String>, strict: bool) -> AccessWidenerTransformer {
		AccessWidenerTransformer { source: source.into(), target: target.into(), strict }
	}
}

impl ResourceTransformer for AccessWidenerTransformer {
	fn claims(&self, path: &str) -> bool {
		Path::new(path).extension()
			.and_then(|extension| extension.to_str())
			.is_some_and(|extension| extension.eq_ignore_ascii_case("accesswidener") || extension.eq_ignore_ascii_case("aw"))
	}

	fn transform(&self, path: &str, data: &[u8], remapper: &dyn MemberRemapper) -> Result<Resource> {
		let widener = crate::read(data)
			.with_context(|| anyhow!("failed to read access widener {path:?}"))?;

		if widener.namespace != self.source {
			let message = format!("can't remap access widener from namespace {:?}, expected {:?}", widener.namespace, self.source);
			if self.strict {
				return Err(MappingError::namespace_mismatch(message))
					.with_context(|| anyhow!("in access widener {path:?}"));
			}
			let mut resource = Resource::new(path, data.to_vec());
			resource.warnings.push(EntryWarning::logged(path, format!("{message}, writing the original")));
			return Ok(resource);
		}

		let remapped = crate::remap::remap_with(&widener, remapper, &self.target)?;
		Ok(Resource::new(path, crate::write_string(&remapped).into_bytes()))
	}
}
