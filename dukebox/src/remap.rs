//! Remapping all classes of a jar.
//!
//! Each class entry is remapped on its own, in parallel. The remapped entries are then written in the order of the input jar.
//! A class that fails to remap is copied unchanged, and reported as an [`EntryWarning`]. Failing to read the input or to
//! write the output fails the whole remap, and no output is left behind.
//!
//! Non-class entries are copied, or given to a [`ResourceTransformer`]. With [`RemapOptions::fix_meta_inf`], signature
//! files are dropped and the manifest and service files are fixed up for the renamed classes.

mod class;
pub use class::{remap_class, RemappedClass};

use std::fmt::{Debug, Formatter};
use std::io::{Seek, Write};
use std::path::Path;
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use rayon::prelude::*;
use zip::ZipWriter;
use quill::error::EntryWarning;
use quill::fallback::RenamePlan;
use quill::remapper::MemberRemapper;
use crate::meta_inf;
use crate::storage::{self, BasicFileAttributes, FileJar, Jar, JarEntry, JarEntryEnum, NamedMemJar, OpenedJar};
use crate::transform::{ResourceTransformer, ServiceFileTransformer};

#[derive(Clone)]
pub struct RemapOptions {
	/// Drop signature files, remove the digests from the manifest, and remap the manifest's main class and the service files.
	pub fix_meta_inf: bool,
	/// Rebuild the `SourceFile` attribute of renamed classes from their new name.
	pub rebuild_source_file_names: bool,
	/// Rename parameters and local variables.
	pub remap_locals: bool,
	/// Transformers for non-class entries, the first one claiming an entry gets it.
	pub transformers: Vec<Arc<dyn ResourceTransformer>>,
}

impl Default for RemapOptions {
	fn default() -> Self {
		RemapOptions {
			fix_meta_inf: true,
			rebuild_source_file_names: true,
			remap_locals: true,
			transformers: Vec::new(),
		}
	}
}

impl Debug for RemapOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RemapOptions")
			.field("fix_meta_inf", &self.fix_meta_inf)
			.field("rebuild_source_file_names", &self.rebuild_source_file_names)
			.field("remap_locals", &self.remap_locals)
			.field("transformers", &self.transformers)
			.finish()
	}
}

impl RemapOptions {
	pub fn with_transformer(mut self, transformer: impl ResourceTransformer + 'static) -> RemapOptions {
		self.transformers.push(Arc::new(transformer));
		self
	}
}

/// The outcome of remapping a jar.
#[derive(Debug, Clone, PartialEq)]
pub struct RemapResult<J> {
	/// The remapped jar.
	pub output: J,
	/// Every class that was rewritten, from its old to its new name.
	///
	/// Classes that failed to remap aren't in here, they're copied as they are.
	pub touched_classes: IndexMap<String, String>,
	pub warnings: Vec<EntryWarning>,
}

/// Remaps the jar according to the plan, writing the result to `output`.
///
/// The inheritance needed for finding inherited members is read from the jar itself.
pub fn remap(jar: &impl Jar, plan: &RenamePlan, options: &RemapOptions, output: &Path) -> Result<RemapResult<FileJar>> {
	info!("remapping jar from {} to {} into {output:?}", plan.source, plan.target);

	let entries = jar.open()?.entries()?;
	let super_classes = storage::super_classes(&entries);
	let remapper = plan.remapper(&super_classes);

	let (touched_classes, warnings) = storage::write_file(output, |zip| remap_entries(entries, &remapper, options, zip))
		.with_context(|| anyhow!("failed to remap jar into {output:?}"))?;

	info!("remapped {} classes into {output:?}, with {} warnings", touched_classes.len(), warnings.len());
	Ok(RemapResult { output: FileJar::new(output), touched_classes, warnings })
}

/// Remaps the jar with any remapper, writing the result to `output`.
pub fn remap_with<R: MemberRemapper + Sync>(jar: &impl Jar, remapper: &R, options: &RemapOptions, output: &Path) -> Result<RemapResult<FileJar>> {
	let entries = jar.open()?.entries()?;

	let (touched_classes, warnings) = storage::write_file(output, |zip| remap_entries(entries, remapper, options, zip))
		.with_context(|| anyhow!("failed to remap jar into {output:?}"))?;

	Ok(RemapResult { output: FileJar::new(output), touched_classes, warnings })
}

/// Remaps the jar with any remapper, into a jar in memory.
pub fn remap_to_mem<R: MemberRemapper + Sync>(jar: &impl Jar, remapper: &R, options: &RemapOptions, name: impl Into<String>) -> Result<RemapResult<NamedMemJar>> {
	let entries = jar.open()?.entries()?;

	let ((touched_classes, warnings), data) = storage::write_vec(|zip| remap_entries(entries, remapper, options, zip))?;

	Ok(RemapResult { output: NamedMemJar::new(name, data), touched_classes, warnings })
}

/// An entry after remapping, [`None`] if it's dropped.
struct Processed {
	entry: Option<JarEntry>,
	touched: Option<(String, String)>,
	warnings: Vec<EntryWarning>,
}

impl Processed {
	fn keep(entry: JarEntry) -> Processed {
		Processed { entry: Some(entry), touched: None, warnings: Vec::new() }
	}
}

fn remap_entries<R, W>(entries: Vec<JarEntry>, remapper: &R, options: &RemapOptions, zip: &mut ZipWriter<W>)
	-> Result<(IndexMap<String, String>, Vec<EntryWarning>)>
where
	R: MemberRemapper + Sync,
	W: Write + Seek,
{
	let processed: Vec<Processed> = entries.into_par_iter()
		.map(|entry| process(entry, remapper, options))
		.collect::<Result<_>>()?;

	let mut touched_classes = IndexMap::new();
	let mut warnings = Vec::new();
	let mut written = IndexSet::new();

	for processed in processed {
		warnings.extend(processed.warnings);
		if let Some((old, new)) = processed.touched {
			touched_classes.insert(old, new);
		}

		let Some(entry) = processed.entry else {
			continue;
		};
		if !written.insert(entry.name.clone()) {
			warnings.push(EntryWarning::logged(&entry.name, "another entry was already written to this path, dropping this one"));
			continue;
		}
		storage::write_entry(zip, &entry)?;
	}

	Ok((touched_classes, warnings))
}

fn process<R: MemberRemapper>(entry: JarEntry, remapper: &R, options: &RemapOptions) -> Result<Processed> {
	let JarEntry { name, attrs, data } = entry;

	match data {
		JarEntryEnum::Dir => Ok(Processed::keep(JarEntry { name, attrs, data: JarEntryEnum::Dir })),
		JarEntryEnum::Class(bytes) => Ok(match remap_class(&bytes, remapper, options) {
			Ok(class) => {
				let path = class_path(&name, &class.old_name, &class.new_name);
				Processed {
					entry: Some(JarEntry { name: path, attrs, data: JarEntryEnum::Class(class.data) }),
					touched: Some((class.old_name, class.new_name)),
					warnings: Vec::new(),
				}
			},
			Err(e) => {
				let warning = EntryWarning::logged(&name, format!("failed to remap class, copying it unchanged: {e:#}"));
				Processed {
					entry: Some(JarEntry { name, attrs, data: JarEntryEnum::Class(bytes) }),
					touched: None,
					warnings: vec![warning],
				}
			},
		}),
		JarEntryEnum::Other(bytes) => process_resource(name, attrs, bytes, remapper, options),
	}
}

fn process_resource<R: MemberRemapper>(name: String, attrs: BasicFileAttributes, bytes: Vec<u8>, remapper: &R, options: &RemapOptions) -> Result<Processed> {
	if options.fix_meta_inf {
		if meta_inf::is_signature_file(&name) {
			debug!("dropping signature file {name:?}");
			return Ok(Processed { entry: None, touched: None, warnings: Vec::new() });
		}
		if name == meta_inf::MANIFEST {
			return Ok(match meta_inf::fix_manifest(&bytes, remapper) {
				Ok(data) => Processed::keep(JarEntry { name, attrs, data: JarEntryEnum::Other(data) }),
				Err(e) => {
					let warning = EntryWarning::logged(&name, format!("failed to fix the manifest, copying it unchanged: {e:#}"));
					Processed { entry: Some(JarEntry { name, attrs, data: JarEntryEnum::Other(bytes) }), touched: None, warnings: vec![warning] }
				},
			});
		}
	}

	let services: &dyn ResourceTransformer = &ServiceFileTransformer;
	let transformer = options.transformers.iter()
		.map(|transformer| transformer.as_ref())
		.find(|transformer| transformer.claims(&name))
		.or_else(|| (options.fix_meta_inf && services.claims(&name)).then_some(services));

	let Some(transformer) = transformer else {
		return Ok(Processed::keep(JarEntry { name, attrs, data: JarEntryEnum::Other(bytes) }));
	};

	let resource = transformer.transform(&name, &bytes, remapper)
		.with_context(|| anyhow!("failed to transform {name:?} with {transformer:?}"))?;
	Ok(Processed {
		entry: Some(JarEntry { name: resource.path, attrs, data: JarEntryEnum::Other(resource.data) }),
		touched: None,
		warnings: resource.warnings,
	})
}

/// The path of a renamed class entry, keeping any prefix like the one of `META-INF/versions/9/`.
fn class_path(path: &str, old: &str, new: &str) -> String {
	match path.strip_suffix(".class").and_then(|path| path.strip_suffix(old)) {
		Some(prefix) => format!("{prefix}{new}.class"),
		None => path.to_owned(),
	}
}
