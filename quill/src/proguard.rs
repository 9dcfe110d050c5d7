//! Reading the two column mappings in the format ProGuard writes, as shipped for the client and server jars.
//!
//! ```text
//! # a comment
//! net.example.Apple -> a:
//!     int seeds -> b
//!     1:4:void bite(net.example.Apple,int[]) -> c
//! ```
//!
//! The left column is the readable name, the right column the obfuscated one. Class names are converted to the internal
//! form, and member types into descriptors. Descriptors are stored in the readable namespace, use
//! [`MappingTree::descriptor_in`] for getting them in the other one.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use crate::error::MappingError;
use crate::tree::mappings::{ClassId, MappingTree};

/// Reads a ProGuard mappings file, by opening the file given by the path.
///
/// See [`read`] for the meaning of the namespace names.
pub fn read_file(path: impl AsRef<Path>, named: &str, obfuscated: &str) -> Result<MappingTree> {
	let file = File::open(&path)
		.with_context(|| anyhow!("failed to open mappings file {:?}", path.as_ref()))?;
	read(file, named, obfuscated)
		.with_context(|| anyhow!("failed to read mappings file {:?} as proguard file", path.as_ref()))
}

/// Reads ProGuard mappings into a tree with the namespaces `named` (the left column) and `obfuscated` (the right column).
///
/// Syntax errors are reported as [`MappingError::Format`].
///
/// ```
/// let input = "\
/// net.example.Apple -> a:
///     net.example.Apple next -> b
/// ";
/// let tree = quill::proguard::read(input.as_bytes(), "named", "official").unwrap();
/// let official = tree.require_namespace("official").unwrap();
/// let named = tree.require_namespace("named").unwrap();
/// let apple = tree.class(official, "a").unwrap();
/// assert_eq!(apple.name(named), Some("net/example/Apple"));
///
/// let next = &apple.fields[0];
/// assert_eq!(next.names.get(official), Some("b"));
/// assert_eq!(tree.descriptor_in(next.desc.as_ref().unwrap(), official).unwrap(), "La;");
/// ```
pub fn read(reader: impl Read, named: &str, obfuscated: &str) -> Result<MappingTree> {
	read_inner(reader, named, obfuscated).map_err(|error| {
		if error.is::<std::io::Error>() || error.is::<MappingError>() {
			error
		} else {
			MappingError::format(format!("{error:#}"))
		}
	})
}

fn read_inner(reader: impl Read, named: &str, obfuscated: &str) -> Result<MappingTree> {
	let mut tree = MappingTree::new();
	let named = tree.add_namespace(named)?;
	let obfuscated = tree.add_namespace(obfuscated)?;

	let mut class: Option<ClassId> = None;

	for (line_number, line) in BufReader::new(reader).lines().enumerate() {
		let line = line?;
		let line_number = line_number + 1;

		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}

		let (left, right) = trimmed.split_once(" -> ")
			.with_context(|| anyhow!("expected ` -> ` in line {line_number}: {line:?}"))?;

		if !line.starts_with(char::is_whitespace) {
			let right = right.strip_suffix(':')
				.with_context(|| anyhow!("expected class line to end with `:` in line {line_number}: {line:?}"))?;
			let id = tree.get_or_create_class(named, &internal_name(left))?;
			tree.set_class_name(id, obfuscated, Some(&internal_name(right)))
				.with_context(|| anyhow!("in line {line_number}"))?;
			class = Some(id);
			continue;
		}

		let class = class
			.with_context(|| anyhow!("member outside of class in line {line_number}: {line:?}"))?;

		let (java_type, name) = left.split_once(' ')
			.with_context(|| anyhow!("expected type and name in line {line_number}: {line:?}"))?;

		if let Some(open) = name.find('(') {
			let close = name.rfind(')')
				.with_context(|| anyhow!("unclosed argument list in line {line_number}: {line:?}"))?;
			let method_name = &name[..open];
			if method_name == "<init>" || method_name == "<clinit>" {
				continue;
			}

			// leading line numbers are `a:b:`, before the return type
			let return_type = java_type.rsplit(':').next().unwrap_or(java_type);

			let mut desc = String::from("(");
			for arg in name[open + 1..close].split(',').filter(|arg| !arg.is_empty()) {
				desc.push_str(&descriptor(arg)?);
			}
			desc.push(')');
			desc.push_str(&descriptor(return_type)?);

			let method = tree.get_or_create_method(class, named, method_name, Some(&desc))?;
			method.names.set(obfuscated, Some(right));
		} else {
			let desc = descriptor(java_type)?;
			let field = tree.get_or_create_field(class, named, name, Some(&desc))?;
			field.names.set(obfuscated, Some(right));
		}
	}

	Ok(tree)
}

fn internal_name(name: &str) -> String {
	name.replace('.', "/")
}

/// Converts a Java source type, like `int[]` or `java.lang.String`, into a descriptor.
fn descriptor(java_type: &str) -> Result<String> {
	let mut element = java_type.trim();
	let mut desc = String::new();
	while let Some(stripped) = element.strip_suffix("[]") {
		desc.push('[');
		element = stripped;
	}
	match element {
		"" => bail!("empty type in {java_type:?}"),
		"byte" => desc.push('B'),
		"char" => desc.push('C'),
		"double" => desc.push('D'),
		"float" => desc.push('F'),
		"int" => desc.push('I'),
		"long" => desc.push('J'),
		"short" => desc.push('S'),
		"boolean" => desc.push('Z'),
		"void" => desc.push('V'),
		class => {
			desc.push('L');
			desc.push_str(&internal_name(class));
			desc.push(';');
		},
	}
	Ok(desc)
}
