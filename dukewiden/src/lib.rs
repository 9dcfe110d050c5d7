//! Crate for access wideners: files that make classes, methods and fields of compiled classes accessible, extendable or
//! mutable.
//!
//! An access widener is written for one namespace, given in its header. It's [read][read()] into an [`AccessWidener`],
//! [remapped][remap] to the namespace of the jar it's meant for, possibly [merged][merge] with others, and then
//! [applied][apply] to the jar.
//!
//! ```txt
//! accessWidener	v2	named
//! accessible	class	net/example/Apple
//! accessible	method	net/example/Apple	bite	()V
//! mutable	field	net/example/Apple	seeds	I
//! ```

use std::fmt::{Display, Formatter};
use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexSet;
use quill::error::MappingError;

mod read;
mod write;
pub mod remap;
pub mod merge;
pub mod apply;
pub mod transform;

pub use read::{read, read_file};
pub use write::{write_file, write_string};

/// The version from the header. Transitive rules need [`Version::V2`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
	V1,
	V2,
}

impl Version {
	fn parse(s: &str) -> Result<Version> {
		match s {
			"v1" => Ok(Version::V1),
			"v2" => Ok(Version::V2),
			s => Err(MappingError::format(format!("unknown access widener version {s:?}, only know of v1 and v2"))),
		}
	}
}

impl Display for Version {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Version::V1 => "v1",
			Version::V2 => "v2",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Access {
	/// Makes the target `public`.
	Accessible,
	/// Makes the class or method `public` and removes `final`.
	Extendable,
	/// Removes `final` from a field.
	Mutable,
}

impl Access {
	fn parse(s: &str) -> Result<Access> {
		match s {
			"accessible" => Ok(Access::Accessible),
			"extendable" => Ok(Access::Extendable),
			"mutable" => Ok(Access::Mutable),
			s => Err(MappingError::format(format!("unknown access {s:?}, expected one of accessible, extendable or mutable"))),
		}
	}
}

impl Display for Access {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Access::Accessible => "accessible",
			Access::Extendable => "extendable",
			Access::Mutable => "mutable",
		})
	}
}

/// What a rule is for. Names are internal names, like `net/example/Apple`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
	Class { class: String },
	Method { class: String, name: String, desc: String },
	Field { class: String, name: String, desc: String },
}

impl Target {
	/// The class the target is or is in.
	pub fn class(&self) -> &str {
		match self {
			Target::Class { class } | Target::Method { class, .. } | Target::Field { class, .. } => class,
		}
	}

	fn kind(&self) -> &'static str {
		match self {
			Target::Class { .. } => "class",
			Target::Method { .. } => "method",
			Target::Field { .. } => "field",
		}
	}
}

/// A single line of an access widener.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rule {
	pub access: Access,
	/// If the rule also applies to mods depending on the one declaring it.
	pub transitive: bool,
	pub target: Target,
}

impl Rule {
	/// Creates a rule, checking that the access can be used on the target.
	pub fn new(access: Access, transitive: bool, target: Target) -> Result<Rule> {
		match (access, &target) {
			(Access::Mutable, Target::Class { .. } | Target::Method { .. }) => {
				return Err(MappingError::format(format!("mutable can only be used on fields, not on {} {}", target.kind(), target.class())));
			},
			(Access::Extendable, Target::Field { class, name, .. }) => {
				return Err(MappingError::format(format!("extendable can't be used on fields, got field {class}.{name}")));
			},
			_ => {},
		}
		if target.class().contains('.') {
			return Err(MappingError::format(format!("class names must be written like a/b/C, not like a.b.C, got {:?}", target.class())));
		}
		Ok(Rule { access, transitive, target })
	}
}

/// The rules of an access widener, in one namespace.
///
/// Two access wideners are equal if they have the same version, namespace and rules, in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessWidener {
	pub version: Version,
	pub namespace: String,
	pub rules: IndexSet<Rule>,
}

impl AccessWidener {
	pub fn new(version: Version, namespace: impl Into<String>) -> AccessWidener {
		AccessWidener { version, namespace: namespace.into(), rules: IndexSet::new() }
	}

	/// Adds the rule, returning `false` if it's already there.
	pub fn add(&mut self, rule: Rule) -> Result<bool> {
		if rule.transitive && self.version < Version::V2 {
			bail!("transitive rules need version v2, but the access widener is {}", self.version);
		}
		Ok(self.rules.insert(rule))
	}

	/// Adds all rules of `other`, raising the version to the one of `other` if needed.
	///
	/// Both need to be in the same namespace.
	pub fn extend(&mut self, other: AccessWidener) -> Result<()> {
		if other.namespace != self.namespace {
			return Err(MappingError::namespace_mismatch(format!(
				"can't merge access widener in namespace {:?} into one in namespace {:?}", other.namespace, self.namespace
			)));
		}
		self.version = self.version.max(other.version);
		for rule in other.rules {
			self.add(rule)
				.with_context(|| anyhow!("while merging access wideners in namespace {:?}", self.namespace))?;
		}
		Ok(())
	}

	/// The classes targeted by any rule.
	pub fn classes(&self) -> IndexSet<&str> {
		self.rules.iter().map(|rule| rule.target.class()).collect()
	}
}
