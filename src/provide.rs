//! Providing jars remapped to a namespace, remapping them only if needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use dukebox::remap::RemapOptions;
use dukebox::storage::FileJar;
use dukewiden::transform::AccessWidenerTransformer;
use quill::provider::{Grouping, MappingResolver};
use quill::tree::mappings::MappingTree;
use crate::config::Config;

/// A jar remapped by [`Provider::provide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Provided {
	pub(crate) path: PathBuf,
	/// The classes that were rewritten, from their old to their new name. Empty if the jar was already there.
	pub(crate) touched_classes: Vec<(String, String)>,
	pub(crate) warnings: usize,
}

#[derive(Debug)]
pub(crate) struct Provider {
	resolver: MappingResolver,
	source_namespace: String,
	fallback_namespace: String,
}

impl Provider {
	pub(crate) fn new(config: &Config) -> Result<Provider> {
		Ok(Provider {
			resolver: config.resolver()?,
			source_namespace: config.source_namespace.clone(),
			fallback_namespace: config.fallback_namespace().to_owned(),
		})
	}

	pub(crate) fn resolve(&mut self, grouping: Grouping, refresh: bool) -> Result<Arc<MappingTree>> {
		let tree = self.resolver.resolve(grouping, refresh)?;
		for conflict in self.resolver.conflicts(grouping) {
			warn!("conflicting mappings for {grouping}: {conflict:?}");
		}
		Ok(tree)
	}

	/// Gives the jar `input` remapped to `target`, remapping it if it isn't there yet, or if `refresh` is set.
	pub(crate) fn provide(&mut self, grouping: Grouping, input: &Path, target: &str, refresh: bool) -> Result<Provided> {
		let output = self.resolver.remapped_output_path(grouping, input, target)?;
		if output.exists() && !refresh {
			debug!("using already remapped {output:?}");
			return Ok(Provided { path: output, touched_classes: Vec::new(), warnings: 0 });
		}

		self.remap(grouping, input, target, &output, refresh)
			.with_context(|| anyhow!("failed to provide {input:?} remapped to {target:?}"))
	}

	/// Remaps the jar `input` to `target`, writing it to `output`.
	pub(crate) fn remap(&mut self, grouping: Grouping, input: &Path, target: &str, output: &Path, refresh: bool) -> Result<Provided> {
		let tree = self.resolve(grouping, refresh)?;
		let plan = quill::fallback::resolve(&tree, &self.source_namespace, &self.fallback_namespace, target, true)?;

		let options = RemapOptions::default()
			.with_transformer(AccessWidenerTransformer::new(&self.source_namespace, target, false));
		let result = dukebox::remap::remap(&FileJar::new(input), &plan, &options, output)?;

		info!("remapped {input:?} to {target:?} into {output:?}: {} classes, {} warnings",
			result.touched_classes.len(), plan.warnings.len() + result.warnings.len());

		Ok(Provided {
			path: result.output.path,
			touched_classes: result.touched_classes.into_iter().collect(),
			warnings: plan.warnings.len() + result.warnings.len(),
		})
	}
}

#[cfg(test)]
mod testing {
	use std::path::Path;
	use anyhow::{anyhow, Result};
	use pretty_assertions::assert_eq;
	use duke::access;
	use duke::builder::ClassBuilder;
	use dukebox::storage::{BasicFileAttributes, FileJar, Jar, JarEntry, JarEntryEnum, OpenedJar};
	use quill::provider::Grouping;
	use crate::config::Config;
	use crate::provide::Provider;

	fn write_input(path: &Path) -> Result<()> {
		let mut class = ClassBuilder::new(access::PUBLIC, "a", Some("java/lang/Object"))?;
		class.add_field(access::PUBLIC, "b", "I", Vec::new())?;
		let entries = [
			JarEntry { name: "a.class".to_owned(), attrs: BasicFileAttributes::default(), data: JarEntryEnum::Class(duke::write_class(&class.build())?) },
			JarEntry {
				name: "example.accesswidener".to_owned(),
				attrs: BasicFileAttributes::default(),
				data: JarEntryEnum::Other(b"accessWidener v1 official\nmutable field a b I\n".to_vec()),
			},
		];
		dukebox::storage::write_file(path, |zip| {
			for entry in &entries {
				dukebox::storage::write_entry(zip, entry)?;
			}
			Ok(())
		})
	}

	#[test]
	fn provide() -> Result<()> {
		let dir = tempfile::tempdir()?;
		std::fs::write(dir.path().join("named.tiny"), "tiny\t2\t0\tofficial\tnamed\nc\ta\tnet/example/Apple\n\tf\tI\tb\tseeds\n")?;
		std::fs::write(dir.path().join("remap.json"), r#"{
			"cache_dir": "cache",
			"version": "1.0",
			"sources": { "combined": [ { "coord": "named:1", "path": "named.tiny" } ] }
		}"#)?;
		let input = dir.path().join("game.jar");
		write_input(&input)?;

		let config = Config::read(&dir.path().join("remap.json"))?;
		let mut provider = Provider::new(&config)?;

		let provided = provider.provide(Grouping::Combined, &input, "named", false)?;
		assert_eq!(provided.path, dir.path().join("named-1").join("game-mapped-named-1-named.jar"));
		assert_eq!(provided.touched_classes, [("a".to_owned(), "net/example/Apple".to_owned())]);
		assert_eq!(provided.warnings, 0);

		let mut opened = FileJar::new(&provided.path).open()?;
		let widener = OpenedJar::by_name(&mut opened, "example.accesswidener")?
			.ok_or_else(|| anyhow!("no access widener"))?;
		assert_eq!(widener.data, JarEntryEnum::Other(b"accessWidener\tv1\tnamed\nmutable\tfield\tnet/example/Apple\tseeds\tI\n".to_vec()));

		// the second time, the jar is already there
		let again = provider.provide(Grouping::Combined, &input, "named", false)?;
		assert_eq!(again.path, provided.path);
		assert!(again.touched_classes.is_empty());

		let refreshed = provider.provide(Grouping::Combined, &input, "named", true)?;
		assert_eq!(refreshed.touched_classes.len(), 1);
		Ok(())
	}
}
