//! Resolving the mappings of a grouping from its mapping files, with a cache on disk.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use anyhow::{anyhow, bail, Context, Error, Result};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use crate::action::merge::{ConflictPolicy, NameConflict};
use crate::source::{MappingSource, SourceKind};
use crate::stub::StubOverlay;
use crate::tree::mappings::MappingTree;

/// The namespace of the readable column of ProGuard mappings.
pub const TWO_COLUMN_NAMED: &str = "named";

/// Which jar some mappings are for.
///
/// The client and server mappings also contain all the combined mappings, in front of their own.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grouping {
	Combined,
	Client,
	Server,
}

impl Display for Grouping {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Grouping::Combined => "combined",
			Grouping::Client => "client",
			Grouping::Server => "server",
		})
	}
}

impl FromStr for Grouping {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"combined" => Ok(Grouping::Combined),
			"client" => Ok(Grouping::Client),
			"server" => Ok(Grouping::Server),
			_ => bail!("unknown grouping {s:?}, expected one of `combined`, `client` or `server`"),
		}
	}
}

/// Resolves and caches the mappings for each [`Grouping`].
///
/// Resolved trees are kept in memory, so that each grouping is only resolved once per resolver. On disk, the resolved
/// tree is stored in a jar named after the identity key of the grouping, see [`MappingResolver::identity_key`].
/// There's no locking for that file, resolvers running at the same time in different processes must be kept apart by
/// the caller.
#[derive(Debug)]
pub struct MappingResolver {
	cache_dir: PathBuf,
	source_namespace: String,
	sources: IndexMap<Grouping, Vec<MappingSource>>,
	stubs: IndexMap<Grouping, StubOverlay>,
	trees: IndexMap<Grouping, Arc<MappingTree>>,
	keys: IndexMap<Grouping, String>,
	conflicts: IndexMap<Grouping, Vec<NameConflict>>,
}

impl MappingResolver {
	/// Creates a resolver writing its cache into the given directory.
	///
	/// The source namespace is the namespace of the jars to remap, like `official`. The obfuscated column of ProGuard
	/// mappings gets this name.
	pub fn new(cache_dir: impl Into<PathBuf>, source_namespace: &str) -> MappingResolver {
		MappingResolver {
			cache_dir: cache_dir.into(),
			source_namespace: source_namespace.to_owned(),
			sources: IndexMap::new(),
			stubs: IndexMap::new(),
			trees: IndexMap::new(),
			keys: IndexMap::new(),
			conflicts: IndexMap::new(),
		}
	}

	pub fn source_namespace(&self) -> &str {
		&self.source_namespace
	}

	pub fn cache_dir(&self) -> &Path {
		&self.cache_dir
	}

	/// Adds a mapping file. Files are merged in the order they're added.
	pub fn add_source(&mut self, grouping: Grouping, source: MappingSource) {
		self.sources.entry(grouping).or_default().push(source);
		self.invalidate(grouping);
	}

	/// Gives the stub overlay of the grouping, creating one from the source namespace to the target namespace if there's none.
	pub fn stub(&mut self, grouping: Grouping, target: &str) -> Result<&mut StubOverlay> {
		self.invalidate(grouping);
		if !self.stubs.contains_key(&grouping) {
			let stub = StubOverlay::new(&self.source_namespace, target)?;
			self.stubs.insert(grouping, stub);
		}
		let stub = self.stubs.get_mut(&grouping)
			.with_context(|| anyhow!("stub for {grouping} was just added"))?;
		if stub.target() != target {
			bail!("stub for {grouping} already maps to {:?}, not to {target:?}", stub.target());
		}
		Ok(stub)
	}

	fn active_stub(&self, grouping: Grouping) -> Option<&StubOverlay> {
		self.stubs.get(&grouping).filter(|stub| !stub.is_empty())
	}

	fn invalidate(&mut self, grouping: Grouping) {
		let affected: &[Grouping] = match grouping {
			Grouping::Combined => &[Grouping::Combined, Grouping::Client, Grouping::Server],
			grouping => &[grouping],
		};
		for grouping in affected {
			self.trees.shift_remove(grouping);
			self.keys.shift_remove(grouping);
			self.conflicts.shift_remove(grouping);
		}
	}

	/// The mapping files of the grouping, in merge order.
	pub fn sources(&self, grouping: Grouping) -> Vec<&MappingSource> {
		let combined = if grouping == Grouping::Combined {
			None
		} else {
			self.sources.get(&Grouping::Combined)
		};
		combined.into_iter()
			.chain(self.sources.get(&grouping))
			.flatten()
			.collect()
	}

	/// Gives the key identifying the mappings of the grouping.
	///
	/// This consists of `name-version` of each source (without duplicates, sorted), and `stub-<hash>` if there's a
	/// stub overlay, all joined with `+`. Without any of these the key is `empty`.
	///
	/// Two different sets of mapping files with the same key are treated as the same mappings.
	pub fn identity_key(&mut self, grouping: Grouping) -> Result<String> {
		if let Some(key) = self.keys.get(&grouping) {
			return Ok(key.clone());
		}

		let mut parts: Vec<String> = self.sources(grouping).into_iter()
			.map(|source| source.coord.key())
			.collect::<IndexSet<String>>()
			.into_iter()
			.collect();
		parts.sort();

		if let Some(stub) = self.active_stub(grouping) {
			parts.push(format!("stub-{}", stub.hash()?));
		}

		let key = if parts.is_empty() {
			"empty".to_owned()
		} else {
			parts.join("+")
		};
		self.keys.insert(grouping, key.clone());
		Ok(key)
	}

	/// The path of the jar the resolved mappings are cached in.
	pub fn cache_path(&mut self, grouping: Grouping) -> Result<PathBuf> {
		let key = self.identity_key(grouping)?;
		Ok(self.cache_dir.join(format!("mappings-{key}-{grouping}.jar")))
	}

	/// The conflicting names found while merging the mapping files of the grouping, when they were last merged.
	pub fn conflicts(&self, grouping: Grouping) -> &[NameConflict] {
		self.conflicts.get(&grouping).map_or(&[], Vec::as_slice)
	}

	/// Resolves the mappings of the grouping.
	///
	/// If the cache jar exists, it's read. Otherwise (or if `refresh` is set) all mapping files are merged and the cache
	/// jar is written.
	pub fn resolve(&mut self, grouping: Grouping, refresh: bool) -> Result<Arc<MappingTree>> {
		if !refresh {
			if let Some(tree) = self.trees.get(&grouping) {
				return Ok(tree.clone());
			}
		}

		let path = self.cache_path(grouping)?;
		let tree = if path.exists() && !refresh {
			debug!("reading cached mappings for {grouping} from {path:?}");
			crate::archive::read_file(&path)?
		} else {
			let (tree, conflicts) = self.merge_sources(grouping)
				.with_context(|| anyhow!("failed to resolve mappings for {grouping}"))?;
			crate::archive::write_file(&tree, &path)
				.with_context(|| anyhow!("failed to write mappings cache {path:?}"))?;
			self.conflicts.insert(grouping, conflicts);
			tree
		};

		info!("mappings for {grouping}: namespaces {:?}, {} classes", tree.namespaces(), tree.class_count());

		let tree = Arc::new(tree);
		self.trees.insert(grouping, tree.clone());
		Ok(tree)
	}

	fn merge_sources(&self, grouping: Grouping) -> Result<(MappingTree, Vec<NameConflict>)> {
		let mut tree = MappingTree::new();
		let mut conflicts = Vec::new();

		for source in self.sources(grouping) {
			let kind = source.kind()?;
			debug!("merging {kind:?} mappings {} from {:?}", source.coord, source.path);

			let (incoming, switch) = match kind {
				SourceKind::Columnar | SourceKind::Archive => {
					let incoming = if kind == SourceKind::Archive {
						crate::archive::read_file(&source.path)?
					} else {
						crate::tiny_v2::read_file(&source.path)?
					};
					let switch = incoming.namespaces().names().next()
						.with_context(|| anyhow!("mappings {:?} have no namespaces", source.path))?
						.to_owned();
					(incoming, switch)
				},
				SourceKind::TwoColumn => {
					let incoming = crate::proguard::read_file(&source.path, TWO_COLUMN_NAMED, &self.source_namespace)?;
					(incoming, self.source_namespace.clone())
				},
			};

			conflicts.extend(tree.merge(&incoming, &switch, ConflictPolicy::Report)
				.with_context(|| anyhow!("failed to merge mappings {:?}", source.path))?);
		}

		if let Some(stub) = self.active_stub(grouping) {
			tree.merge(stub.tree(), stub.source(), ConflictPolicy::Overwrite)
				.context("failed to merge stub mappings")?;
		}

		Ok((tree, conflicts))
	}

	/// The path a jar remapped to the target namespace with the mappings of the grouping is stored at.
	///
	/// This is `<dir>/<key>/<stem>-mapped-<key>-<target>.<extension>`, where `<dir>` is the directory of the input, or the
	/// cache directory if there's a stub overlay (since these are specific to the project).
	pub fn remapped_output_path(&mut self, grouping: Grouping, input: &Path, target: &str) -> Result<PathBuf> {
		let key = self.identity_key(grouping)?;
		let stem = input.file_stem()
			.and_then(|stem| stem.to_str())
			.with_context(|| anyhow!("input {input:?} has no file name"))?;

		let parent = if self.active_stub(grouping).is_some() {
			self.cache_dir.clone()
		} else {
			input.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
		};

		let file_name = match input.extension().and_then(|extension| extension.to_str()) {
			Some(extension) => format!("{stem}-mapped-{key}-{target}.{extension}"),
			None => format!("{stem}-mapped-{key}-{target}"),
		};
		Ok(parent.join(&key).join(file_name))
	}
}

#[cfg(test)]
mod testing {
	use std::path::{Path, PathBuf};
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::provider::{Grouping, MappingResolver};
	use crate::source::{Coord, MappingSource};

	#[test]
	fn identity_keys_are_sorted_and_deduplicated() -> Result<()> {
		let mut resolver = MappingResolver::new("/cache", "official");
		assert_eq!(resolver.identity_key(Grouping::Combined)?, "empty");

		resolver.add_source(Grouping::Combined, MappingSource::new(Coord::new("yarn", "1.0"), "yarn.jar"));
		resolver.add_source(Grouping::Client, MappingSource::new(Coord::new("intermediary", "1.0"), "intermediary.jar"));
		resolver.add_source(Grouping::Client, MappingSource::new(Coord::new("yarn", "1.0"), "other/yarn.jar"));

		assert_eq!(resolver.identity_key(Grouping::Combined)?, "yarn-1.0");
		assert_eq!(resolver.identity_key(Grouping::Client)?, "intermediary-1.0+yarn-1.0");
		assert_eq!(resolver.identity_key(Grouping::Server)?, "yarn-1.0");

		let sources: Vec<&Path> = resolver.sources(Grouping::Client).into_iter().map(|s| s.path.as_path()).collect();
		assert_eq!(sources, [Path::new("yarn.jar"), Path::new("intermediary.jar"), Path::new("other/yarn.jar")]);

		resolver.stub(Grouping::Server, "named")?.class("a", "Apple")?;
		let key = resolver.identity_key(Grouping::Server)?;
		assert!(key.starts_with("yarn-1.0+stub-"), "{key}");
		assert!(resolver.stub(Grouping::Server, "intermediary").is_err());
		Ok(())
	}

	#[test]
	fn output_paths() -> Result<()> {
		let mut resolver = MappingResolver::new("/cache", "official");
		resolver.add_source(Grouping::Combined, MappingSource::new(Coord::new("yarn", "2"), "yarn.jar"));

		assert_eq!(
			resolver.remapped_output_path(Grouping::Combined, Path::new("/libs/minecraft.jar"), "named")?,
			PathBuf::from("/libs/yarn-2/minecraft-mapped-yarn-2-named.jar"),
		);
		assert_eq!(resolver.cache_path(Grouping::Client)?, PathBuf::from("/cache/mappings-yarn-2-client.jar"));

		resolver.stub(Grouping::Combined, "named")?.class("a", "Apple")?;
		let path = resolver.remapped_output_path(Grouping::Combined, Path::new("/libs/minecraft.jar"), "named")?;
		assert!(path.starts_with("/cache"), "{path:?}");
		Ok(())
	}

	#[test]
	fn groupings_parse() -> Result<()> {
		for grouping in [Grouping::Combined, Grouping::Client, Grouping::Server] {
			assert_eq!(grouping.to_string().parse::<Grouping>()?, grouping);
		}
		assert!("both".parse::<Grouping>().is_err());
		Ok(())
	}
}
