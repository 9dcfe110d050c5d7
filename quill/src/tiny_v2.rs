//! Functions to read and write mappings in the "Tiny v2" format.
//!
//! # Reading
//! You can read a `.tiny` file using the [`read_file`] method, by passing a path.
//! If you already have a [`Read`]er, you can use the [`read`] method.
//!
//! It's recommended to check that the namespaces are indeed the ones expected.
//! See [`Namespaces::check_that`][crate::tree::Namespaces::check_that] for more info.
//!
//! # Writing
//! For writing `.tiny` files, there are the [`write`][fn@write] as well as the [`write_vec`] and [`write_string`] methods.
//!
//! Writing keeps the order of the tree, so reading what was written gives the same order again. Descriptors are always
//! written in the first namespace. If any name contains a tab, a line break or a backslash, the `escaped-names` property is
//! written, and all names and descriptors are escaped like comments are.

use std::fs::File;
use std::borrow::Cow;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use crate::error::MappingError;
use crate::lines::{escape, needs_escaping, Level, Row, Rows};
use crate::tree::mappings::{ClassId, Descriptor, FieldEntry, LocalEntry, LocalKey, MappingTree, MethodEntry, ParamEntry};
use crate::tree::names::{Names, Namespace};

/// The header property saying that names and descriptors are escaped like comments.
const ESCAPED_NAMES: &str = "escaped-names";

/// Reads a `.tiny` file (tiny v2), by opening the file given by the path.
pub fn read_file(path: impl AsRef<Path>) -> Result<MappingTree> {
	let file = File::open(&path)
		.with_context(|| anyhow!("failed to open mappings file {:?}", path.as_ref()))?;
	read(file)
		.with_context(|| anyhow!("failed to read mappings file {:?} as tiny v2 file", path.as_ref()))
}

#[allow(clippy::tabs_in_doc_comments)]
/// Reads the tiny v2 format, from the given reader.
///
/// Syntax errors are reported as [`MappingError::Format`].
///
/// ```
/// # use pretty_assertions::assert_eq;
/// let string = "\
/// tiny	2	0	namespaceA	namespaceB	namespaceC
/// c	A	B	C
/// 	f	LA;	a	b	c
/// 	m	(LA;)V	a	b	c
/// 		p	1	x		z
/// ";
///
/// let tree = quill::tiny_v2::read(string.as_bytes()).unwrap();
///
/// tree.namespaces().check_that(&["namespaceA", "namespaceB", "namespaceC"]).unwrap();
/// assert_eq!(tree.class_count(), 1);
/// ```
pub fn read(reader: impl Read) -> Result<MappingTree> {
	read_inner(reader).map_err(|error| {
		if error.is::<std::io::Error>() || error.is::<MappingError>() {
			error
		} else {
			MappingError::format(format!("{error:#}"))
		}
	})
}

fn read_inner(reader: impl Read) -> Result<MappingTree> {
	let mut rows = Rows::new(BufReader::new(reader)).peekable();

	let mut header = rows.next().context("no header line")??;
	let header_line_number = header.number();

	if header.kind != "tiny" || header.field("major version")? != "2" || header.field("minor version")? != "0" {
		bail!("header version isn't tiny v2.0, in line {header:?}");
	}

	let mut tree = MappingTree::new();
	let namespaces = header.rest().iter()
		.map(|name| tree.add_namespace(name))
		.collect::<Result<Vec<Namespace>>>()
		.with_context(|| anyhow!("on line {header_line_number}"))?;
	if namespaces.is_empty() {
		bail!("no namespaces in header, in line {header_line_number}");
	}
	let n = namespaces.len();

	// properties, one tab deep, before the first class
	let mut escaped = false;
	while let Some(Ok(row)) = rows.peek() {
		if row.depth() != 1 {
			break;
		}
		if row.kind == ESCAPED_NAMES {
			escaped = true;
		}
		rows.next();
	}

	Level::top(&mut rows).each(|level, mut row| {
		if row.kind != "c" {
			return level.skip_nested();
		}
		let class = add_class(&mut tree, &namespaces, row.names(n, escaped)?)?;
		let class = tree.get_mut(class);

		level.nested().each(|level, mut row| {
			match row.kind.as_str() {
				"f" => {
					let desc = descriptor(namespaces[0], row.name_field("field descriptor", escaped)?);
					class.fields.push(FieldEntry { names: row.names(n, escaped)?, desc, comment: None });
					let field = class.fields.last_mut().context("field was just added")?;

					level.nested().each(|level, row| only_comment(level, row, &mut field.comment))
						.context("reading field sub-sections")
				},
				"m" => {
					let desc = descriptor(namespaces[0], row.name_field("method descriptor", escaped)?);
					class.methods.push(MethodEntry { names: row.names(n, escaped)?, desc, params: Vec::new(), locals: Vec::new(), comment: None });
					let method = class.methods.last_mut().context("method was just added")?;

					level.nested().each(|level, mut row| {
						match row.kind.as_str() {
							"p" => {
								let lv_index = row.parse_field("parameter index")?;
								if method.param(lv_index).is_some() {
									bail!("duplicate parameter with index {lv_index}");
								}
								method.params.push(ParamEntry { lv_index, names: row.names(n, escaped)?, comment: None });
								let param = method.params.last_mut().context("parameter was just added")?;

								level.nested().each(|level, row| only_comment(level, row, &mut param.comment))
									.context("reading parameter sub-sections")
							},
							"v" => {
								let lv_index = row.parse_field("local variable index")?;
								let start_offset = row.parse_field("local variable start")?;
								let lvt_row: i64 = row.parse_field("local variable table row")?;
								let lvt_row = if lvt_row < 0 { None } else { Some(u32::try_from(lvt_row)?) };
								let key = LocalKey { lv_index, start_offset, lvt_row };
								if method.local(key).is_some() {
									bail!("duplicate local variable {key:?}");
								}
								method.locals.push(LocalEntry { key, names: row.names(n, escaped)?, comment: None });
								let local = method.locals.last_mut().context("local variable was just added")?;

								level.nested().each(|level, row| only_comment(level, row, &mut local.comment))
									.context("reading local variable sub-sections")
							},
							"c" => add_comment(&mut method.comment, row),
							_ => level.skip_nested(),
						}
					}).context("reading method sub-sections")
				},
				"c" => add_comment(&mut class.comment, row),
				_ => level.skip_nested(),
			}
		}).context("reading class sub-sections")
	}).context("reading lines")?;

	if let Some(row) = rows.next() {
		bail!("expected end of input, got: {row:?}");
	}

	Ok(tree)
}

fn add_class(tree: &mut MappingTree, namespaces: &[Namespace], names: Names) -> Result<ClassId> {
	let (first, name) = names.first()
		.with_context(|| anyhow!("class without any name: {names:?}"))?;
	let id = tree.get_or_create_class(first, name)?;
	for &namespace in namespaces {
		if let Some(name) = names.get(namespace) {
			tree.set_class_name(id, namespace, Some(name))?;
		}
	}
	Ok(id)
}

fn descriptor(namespace: Namespace, value: String) -> Option<Descriptor> {
	if value.is_empty() {
		None
	} else {
		Some(Descriptor { namespace, value })
	}
}

fn add_comment(comment: &mut Option<String>, row: Row) -> Result<()> {
	let new = row.comment()?;
	if let Some(comment) = comment {
		bail!("only one comment is allowed, got {comment:?} and {new:?}")
	} else {
		*comment = Some(new);
		Ok(())
	}
}

/// For rows below fields, parameters and local variables, which can only have a comment.
fn only_comment<R: BufRead>(level: &mut Level<'_, R>, row: Row, comment: &mut Option<String>) -> Result<()> {
	if row.kind == "c" {
		add_comment(comment, row)
	} else {
		level.skip_nested()
	}
}

/// Writes the given mappings into a `String`, in the tiny v2 format.
///
/// This is equivalent to first calling [`write_vec`] and then [`String::from_utf8`].
///
/// This method is of most use in test cases, where you also use the `pretty_assertions` crate for viewing string diffs.
pub fn write_string(tree: &MappingTree) -> Result<String> {
	let vec = write_vec(tree)?;
	String::from_utf8(vec).context("failed to convert written mappings to utf8")
}

/// Writes the given mappings into a `Vec<u8>`, in the tiny v2 format.
pub fn write_vec(tree: &MappingTree) -> Result<Vec<u8>> {
	let mut vec = Vec::new();
	write(tree, &mut vec)?;
	Ok(vec)
}

fn write_names(w: &mut impl Write, namespaces: &[Namespace], names: &Names, escaped: bool) -> Result<()> {
	for &namespace in namespaces {
		write!(w, "\t{}", maybe_escape(names.get(namespace).unwrap_or(""), escaped))?;
	}
	writeln!(w)?;
	Ok(())
}

fn maybe_escape(string: &str, escaped: bool) -> Cow<'_, str> {
	if escaped {
		Cow::Owned(escape(string))
	} else {
		Cow::Borrowed(string)
	}
}

/// Returns `true` if any name or descriptor of the tree has to be escaped to be written.
fn has_names_to_escape(tree: &MappingTree) -> bool {
	let names = |names: &Names| names.iter().any(|(_, name)| needs_escaping(name));
	let desc = |desc: &Option<Descriptor>| desc.as_ref().is_some_and(|desc| needs_escaping(&desc.value));

	tree.classes().any(|class| {
		names(class.names())
			|| class.fields.iter().any(|field| names(&field.names) || desc(&field.desc))
			|| class.methods.iter().any(|method| {
				names(&method.names) || desc(&method.desc)
					|| method.params.iter().any(|param| names(&param.names))
					|| method.locals.iter().any(|local| names(&local.names))
			})
	})
}

fn write_comment(w: &mut impl Write, depth: usize, comment: &Option<String>) -> Result<()> {
	if let Some(comment) = comment {
		writeln!(w, "{}c\t{}", "\t".repeat(depth), escape(comment))?;
	}
	Ok(())
}

fn write_descriptor(tree: &MappingTree, first: Option<Namespace>, desc: &Option<Descriptor>) -> Result<String> {
	match (first, desc) {
		(Some(first), Some(desc)) => tree.descriptor_in(desc, first),
		_ => Ok(String::new()),
	}
}

#[allow(clippy::tabs_in_doc_comments)]
/// Writes the given mappings to the given writer, in the tiny v2 format.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// let input = "\
/// tiny	2	0	namespaceA	namespaceB
/// c	D	E
/// c	A	B
/// 	c	A class that comes after D.
/// 	m	(LD;)V	methodB	methodBSecondName
/// 		v	1	0	-1	x	local
/// 	f	I	aIsAfterB	c
/// ";
///
/// let tree = quill::tiny_v2::read(input.as_bytes()).unwrap();
/// let written = quill::tiny_v2::write_string(&tree).unwrap();
///
/// let output = "\
/// tiny	2	0	namespaceA	namespaceB
/// c	D	E
/// c	A	B
/// 	c	A class that comes after D.
/// 	f	I	aIsAfterB	c
/// 	m	(LD;)V	methodB	methodBSecondName
/// 		v	1	0	-1	x	local
/// ";
///
/// assert_eq!(written, output);
/// ```
pub fn write(tree: &MappingTree, w: &mut impl Write) -> Result<()> {
	// the buffering makes it much faster
	let mut w = BufWriter::new(w);
	let w = &mut w;

	let namespaces: Vec<Namespace> = tree.namespaces().iter().map(|(namespace, _)| namespace).collect();
	let first = namespaces.first().copied();

	write!(w, "tiny\t2\t0")?;
	for name in tree.namespaces().names() {
		write!(w, "\t{name}")?;
	}
	writeln!(w)?;

	let escaped = has_names_to_escape(tree);
	if escaped {
		writeln!(w, "\t{ESCAPED_NAMES}")?;
	}

	for class in tree.classes() {
		write!(w, "c")?;
		write_names(w, &namespaces, class.names(), escaped)?;
		write_comment(w, 1, &class.comment)?;

		for field in &class.fields {
			write!(w, "\tf\t{}", maybe_escape(&write_descriptor(tree, first, &field.desc)?, escaped))?;
			write_names(w, &namespaces, &field.names, escaped)?;
			write_comment(w, 2, &field.comment)?;
		}

		for method in &class.methods {
			write!(w, "\tm\t{}", maybe_escape(&write_descriptor(tree, first, &method.desc)?, escaped))?;
			write_names(w, &namespaces, &method.names, escaped)?;
			write_comment(w, 2, &method.comment)?;

			for param in &method.params {
				write!(w, "\t\tp\t{}", param.lv_index)?;
				write_names(w, &namespaces, &param.names, escaped)?;
				write_comment(w, 3, &param.comment)?;
			}

			for local in &method.locals {
				let row = local.key.lvt_row.map_or(-1, i64::from);
				write!(w, "\t\tv\t{}\t{}\t{row}", local.key.lv_index, local.key.start_offset)?;
				write_names(w, &namespaces, &local.names, escaped)?;
				write_comment(w, 3, &local.comment)?;
			}
		}
	}

	w.flush()?;
	Ok(())
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::error::MappingError;

	#[test]
	fn comments_are_escaped() -> Result<()> {
		let input = "tiny\t2\t0\ta\tb\nc\tA\tB\n\tc\tline one\\nline\\ttwo \\\\ done\n";
		let tree = super::read(input.as_bytes())?;
		let a = tree.require_namespace("a")?;
		let class = tree.class(a, "A").ok_or_else(|| anyhow::anyhow!("no class A"))?;
		assert_eq!(class.comment.as_deref(), Some("line one\nline\ttwo \\ done"));
		assert_eq!(super::write_string(&tree)?, input);
		Ok(())
	}

	#[test]
	fn properties_and_unknown_rows_are_skipped() -> Result<()> {
		let input = "tiny\t2\t0\ta\tb\n\tescaped-names\n\tsomething\tvalue\nc\tA\\tX\tB\n\tx\tunknown\n\t\tx\tnested\n\tf\tI\tf\tg\n";
		let tree = super::read(input.as_bytes())?;
		let a = tree.require_namespace("a")?;
		let class = tree.class(a, "A\tX").ok_or_else(|| anyhow::anyhow!("no class"))?;
		assert_eq!(class.fields.len(), 1);
		Ok(())
	}

	#[test]
	fn names_are_escaped_only_when_needed() -> Result<()> {
		let plain = "tiny\t2\t0\ta\tb\nc\tA\tB\n";
		assert_eq!(super::write_string(&super::read(plain.as_bytes())?)?, plain);

		let input = "tiny\t2\t0\ta\tb\n\tescaped-names\nc\tA\\tX\tB\n\tf\tLA\\tX;\tf\tg\n";
		let tree = super::read(input.as_bytes())?;
		let a = tree.require_namespace("a")?;
		let class = tree.class(a, "A\tX").ok_or_else(|| anyhow::anyhow!("no class"))?;
		assert_eq!(class.fields[0].desc.as_ref().map(|desc| desc.value.as_str()), Some("LA\tX;"));
		assert_eq!(super::write_string(&tree)?, input);
		Ok(())
	}

	#[test]
	fn broken_input_is_format_error() {
		for input in ["", "tiny\t3\t0\ta\n", "tiny\t2\t0\ta\tb\nc\tA\n", "tiny\t2\t0\ta\n\t\tm\t()V\tx\n"] {
			let error = super::read(input.as_bytes()).unwrap_err();
			assert!(matches!(error.downcast_ref::<MappingError>(), Some(MappingError::Format(_))), "{input:?}: {error:?}");
		}
	}
}
