//! The configuration file of a project.
//!
//! ```json
//! {
//!   "cache_dir": ".cache/remap",
//!   "version": "1.20.1",
//!   "source_namespace": "official",
//!   "fallback_namespace": "intermediary",
//!   "sources": {
//!     "combined": [ { "coord": "net.fabricmc:intermediary:1.20.1", "path": "mappings/intermediary.jar" } ],
//!     "client": [ { "coord": "mojmap:1.20.1", "path": "mappings/client.txt" } ]
//!   },
//!   "stubs": [
//!     { "grouping": "client", "target": "named", "classes": [ { "from": "a", "to": "net/example/Apple" } ] }
//!   ]
//! }
//! ```
//!
//! Relative paths are relative to the directory of the configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::Deserialize;
use quill::provider::{Grouping, MappingResolver};
use quill::source::{Coord, MappingSource};

fn official() -> String {
	"official".to_owned()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
	/// The cache directory, each version gets its own directory in it.
	pub(crate) cache_dir: PathBuf,
	pub(crate) version: String,
	#[serde(default = "official")]
	pub(crate) source_namespace: String,
	/// The namespace names are taken from if the source namespace has none, defaults to the source namespace.
	#[serde(default)]
	pub(crate) fallback_namespace: Option<String>,
	#[serde(default)]
	pub(crate) sources: Sources,
	#[serde(default)]
	pub(crate) stubs: Vec<StubConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Sources {
	#[serde(default)]
	pub(crate) combined: Vec<SourceConfig>,
	#[serde(default)]
	pub(crate) client: Vec<SourceConfig>,
	#[serde(default)]
	pub(crate) server: Vec<SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SourceConfig {
	/// Either `group:name:version` or `name:version`.
	pub(crate) coord: String,
	pub(crate) path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StubConfig {
	pub(crate) grouping: String,
	pub(crate) target: String,
	#[serde(default)]
	pub(crate) classes: Vec<ClassStub>,
	#[serde(default)]
	pub(crate) fields: Vec<MemberStub>,
	#[serde(default)]
	pub(crate) methods: Vec<MemberStub>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ClassStub {
	pub(crate) from: String,
	pub(crate) to: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MemberStub {
	pub(crate) owner: String,
	pub(crate) name: String,
	pub(crate) desc: String,
	pub(crate) to: String,
}

impl Config {
	pub(crate) fn read(path: &Path) -> Result<Config> {
		let file = std::fs::File::open(path)
			.with_context(|| anyhow!("failed to open configuration {path:?}"))?;
		let mut config: Config = serde_json::from_reader(std::io::BufReader::new(file))
			.with_context(|| anyhow!("failed to parse configuration {path:?}"))?;

		let base = path.parent().unwrap_or(Path::new("."));
		config.cache_dir = base.join(&config.cache_dir);
		for source in config.sources.combined.iter_mut().chain(&mut config.sources.client).chain(&mut config.sources.server) {
			source.path = base.join(&source.path);
		}

		debug!("read configuration {path:?}: {config:?}");
		Ok(config)
	}

	pub(crate) fn fallback_namespace(&self) -> &str {
		self.fallback_namespace.as_deref().unwrap_or(&self.source_namespace)
	}

	/// The cache directory of the version.
	pub(crate) fn version_cache_dir(&self) -> PathBuf {
		self.cache_dir.join(&self.version)
	}

	/// Creates a resolver with all the sources and stubs.
	pub(crate) fn resolver(&self) -> Result<MappingResolver> {
		let mut resolver = MappingResolver::new(self.version_cache_dir(), &self.source_namespace);

		for (grouping, sources) in [
			(Grouping::Combined, &self.sources.combined),
			(Grouping::Client, &self.sources.client),
			(Grouping::Server, &self.sources.server),
		] {
			for source in sources {
				let coord = Coord::from_str(&source.coord)
					.with_context(|| anyhow!("invalid coordinate for mappings {:?}", source.path))?;
				resolver.add_source(grouping, MappingSource::new(coord, &source.path));
			}
		}

		for stub_config in &self.stubs {
			let grouping = Grouping::from_str(&stub_config.grouping)?;
			let stub = resolver.stub(grouping, &stub_config.target)?;
			for class in &stub_config.classes {
				stub.class(&class.from, &class.to)?;
			}
			for field in &stub_config.fields {
				stub.field(&field.owner, &field.name, &field.desc, &field.to)?;
			}
			for method in &stub_config.methods {
				stub.method(&method.owner, &method.name, &method.desc, &method.to)?;
			}
		}

		Ok(resolver)
	}
}
