//! Transforming the non-class entries of a jar while remapping it.
//!
//! The [remap engine][crate::remap] gives each non-class entry to the first [`ResourceTransformer`] that
//! [claims][ResourceTransformer::claims] its path. Entries no transformer claims are copied.

use std::fmt::Debug;
use anyhow::{anyhow, Context, Result};
use quill::error::EntryWarning;
use quill::remapper::{ClassRemapper, MemberRemapper};

/// The result of transforming a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
	/// The path to store the resource at, usually the path it was read from.
	pub path: String,
	pub data: Vec<u8>,
	pub warnings: Vec<EntryWarning>,
}

impl Resource {
	pub fn new(path: impl Into<String>, data: Vec<u8>) -> Resource {
		Resource { path: path.into(), data, warnings: Vec::new() }
	}
}

/// Transforms a non-class entry of a jar.
///
/// Transformers are shared between the threads remapping a jar.
pub trait ResourceTransformer: Debug + Send + Sync {
	/// Returns `true` if this transformer wants to handle the entry at `path`.
	fn claims(&self, path: &str) -> bool;

	/// Transforms the entry.
	///
	/// The `remapper` is the one used for the classes of the jar.
	///
	/// Returning an error fails the whole remap. For recoverable problems, add a warning to the returned [`Resource`].
	fn transform(&self, path: &str, data: &[u8], remapper: &dyn MemberRemapper) -> Result<Resource>;
}

/// Remaps the class names in `META-INF/services` files, and renames the files themselves.
///
/// A service file is named after the (dotted) interface name, and lists implementing classes, one per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceFileTransformer;

const SERVICES: &str = "META-INF/services/";

fn map_dotted<R: ClassRemapper + ?Sized>(remapper: &R, name: &str) -> Result<String> {
	let internal = name.replace('.', "/");
	Ok(remapper.map_class(&internal)?.replace('/', "."))
}

impl ResourceTransformer for ServiceFileTransformer {
	fn claims(&self, path: &str) -> bool {
		path.strip_prefix(SERVICES).is_some_and(|name| !name.is_empty() && !name.contains('/'))
	}

	fn transform(&self, path: &str, data: &[u8], remapper: &dyn MemberRemapper) -> Result<Resource> {
		let Some(service) = path.strip_prefix(SERVICES) else {
			return Ok(Resource::new(path, data.to_vec()));
		};
		let text = std::str::from_utf8(data)
			.with_context(|| anyhow!("service file {path:?} isn't valid utf-8"))?;

		let mut out = String::with_capacity(text.len());
		for line in text.split_inclusive('\n') {
			let content = line.split('#').next().unwrap_or_default();
			let name = content.trim();
			if name.is_empty() {
				out.push_str(line);
			} else {
				// keep whitespace and comments around the name
				let start = line.find(name).unwrap_or_default();
				out.push_str(&line[..start]);
				out.push_str(&map_dotted(remapper, name)?);
				out.push_str(&line[start + name.len()..]);
			}
		}

		let path = format!("{SERVICES}{}", map_dotted(remapper, service)?);
		Ok(Resource::new(path, out.into_bytes()))
	}
}
