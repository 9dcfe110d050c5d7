//! The kinds of failures callers may want to tell apart.
//!
//! Everything in this workspace returns [`anyhow::Result`]. If a failure has one of the root causes here, you can find it with
//! [`anyhow::Error::downcast_ref`]:
//!
//! ```
//! use quill::error::MappingError;
//! use quill::tree::mappings::MappingTree;
//!
//! let tree = MappingTree::with_namespaces(&["official"]).unwrap();
//! let error = tree.require_namespace("named").unwrap_err();
//! assert!(matches!(error.downcast_ref::<MappingError>(), Some(MappingError::Configuration(_))));
//! ```

use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
	/// The requested namespace doesn't exist, renaming can't be done at all.
	#[error("configuration error: {0}")]
	Configuration(String),
	/// A mapping or access widener source couldn't be parsed, or an archive lacks the expected payload.
	#[error("format error: {0}")]
	Format(String),
	/// The namespace of an access widener isn't one of the namespaces of the mappings.
	#[error("namespace mismatch: {0}")]
	NamespaceMismatch(String),
}

impl MappingError {
	pub fn configuration(message: impl Into<String>) -> anyhow::Error {
		MappingError::Configuration(message.into()).into()
	}

	pub fn format(message: impl Into<String>) -> anyhow::Error {
		MappingError::Format(message.into()).into()
	}

	pub fn namespace_mismatch(message: impl Into<String>) -> anyhow::Error {
		MappingError::NamespaceMismatch(message.into()).into()
	}
}

/// A recovered failure for a single entry of an archive (or a single entity of a tree).
///
/// These never stop an operation, they are collected and handed back to the caller after being logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWarning {
	/// The archive entry path or the entity that caused the warning.
	pub entry: String,
	pub message: String,
}

impl EntryWarning {
	pub fn new(entry: impl Into<String>, message: impl Into<String>) -> EntryWarning {
		EntryWarning { entry: entry.into(), message: message.into() }
	}

	/// Creates the warning, after logging it.
	pub fn logged(entry: impl Into<String>, message: impl Into<String>) -> EntryWarning {
		let warning = EntryWarning::new(entry, message);
		log::warn!("{warning}");
		warning
	}
}

impl Display for EntryWarning {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.entry, self.message)
	}
}
