//! The rows of a tiny v2 file, and walking them by their nesting depth.
//!
//! A row is one line: some leading tabs giving its depth, then tab separated fields. The first field says what the row is.

use std::cmp::Ordering;
use std::io::{BufRead, Lines};
use std::iter::{Enumerate, Peekable};
use std::str::FromStr;
use anyhow::{anyhow, bail, Context, Error, Result};
use crate::tree::names::Names;

#[derive(Debug)]
pub(crate) struct Row {
	number: usize,
	depth: usize,
	pub(crate) kind: String,
	fields: std::vec::IntoIter<String>,
}

impl Row {
	fn parse(number: usize, line: &str) -> Row {
		let content = line.trim_start_matches('\t');
		// a tab is one byte, so this is a valid char boundary
		let depth = line.len() - content.len();

		let mut fields = content.split('\t').map(str::to_owned);
		// splitting always gives at least one part
		let kind = fields.next().unwrap_or_default();

		Row { number, depth, kind, fields: fields.collect::<Vec<_>>().into_iter() }
	}

	pub(crate) fn number(&self) -> usize {
		self.number
	}

	pub(crate) fn depth(&self) -> usize {
		self.depth
	}

	/// Takes the next field, `what` names it for the error message.
	pub(crate) fn field(&mut self, what: &str) -> Result<String> {
		self.fields.next()
			.with_context(|| anyhow!("missing {what} in {} row on line {}", self.kind, self.number))
	}

	pub(crate) fn parse_field<T>(&mut self, what: &str) -> Result<T>
	where
		T: FromStr,
		T::Err: Into<Error>,
	{
		let field = self.field(what)?;
		field.parse::<T>()
			.map_err(Into::<Error>::into)
			.with_context(|| anyhow!("invalid {what} {field:?} in {} row on line {}", self.kind, self.number))
	}

	/// Takes the next field, unescaping it if `escaped` is set.
	pub(crate) fn name_field(&mut self, what: &str, escaped: bool) -> Result<String> {
		let field = self.field(what)?;
		if escaped {
			unescape(&field)
		} else {
			Ok(field)
		}
	}

	/// Takes the remaining fields as one name per namespace. There must be exactly `namespaces` of them.
	pub(crate) fn names(self, namespaces: usize, escaped: bool) -> Result<Names> {
		let fields = self.rest();
		if fields.len() != namespaces {
			bail!("expected {namespaces} names, got {} on line: {fields:?}", fields.len());
		}
		fields.into_iter()
			.map(|field| if escaped { unescape(&field).map(Some) } else { Ok(Some(field)) })
			.collect()
	}

	/// Takes the only remaining field, a comment, which is always escaped.
	pub(crate) fn comment(mut self) -> Result<String> {
		let comment = self.field("comment")?;
		if !self.fields.as_slice().is_empty() {
			bail!("comment on line {} is followed by more fields: {:?}", self.number, self.fields.as_slice());
		}
		unescape(&comment)
	}

	pub(crate) fn rest(self) -> Vec<String> {
		self.fields.collect()
	}
}

/// The rows of a reader, numbered from one.
pub(crate) struct Rows<R> {
	lines: Enumerate<Lines<R>>,
}

impl<R: BufRead> Rows<R> {
	pub(crate) fn new(reader: R) -> Rows<R> {
		Rows { lines: reader.lines().enumerate() }
	}
}

impl<R: BufRead> Iterator for Rows<R> {
	type Item = Result<Row>;

	fn next(&mut self) -> Option<Self::Item> {
		let (index, line) = self.lines.next()?;
		Some(line.map(|line| Row::parse(index + 1, &line)).map_err(Error::from))
	}
}

/// The rows at one depth, ending at the first row that's less deep.
pub(crate) struct Level<'a, R: BufRead> {
	depth: usize,
	rows: &'a mut Peekable<Rows<R>>,
}

impl<'a, R: BufRead> Level<'a, R> {
	/// The rows after the header properties, starting at depth zero.
	pub(crate) fn top(rows: &'a mut Peekable<Rows<R>>) -> Level<'a, R> {
		Level { depth: 0, rows }
	}

	/// The rows nested below the row just given out.
	pub(crate) fn nested(&mut self) -> Level<'_, R> {
		Level { depth: self.depth + 1, rows: self.rows }
	}

	pub(crate) fn each(mut self, mut f: impl FnMut(&mut Self, Row) -> Result<()>) -> Result<()> {
		while let Some(row) = self.next_row() {
			let row = row?;
			let number = row.number();
			f(&mut self, row)
				.with_context(|| anyhow!("in line {number}"))?;
		}
		Ok(())
	}

	/// Skips everything nested below the row just given out.
	pub(crate) fn skip_nested(&mut self) -> Result<()> {
		self.nested().each(|level, _| level.skip_nested())
	}

	fn next_row(&mut self) -> Option<Result<Row>> {
		let row = match self.rows.peek()? {
			Ok(row) => row,
			Err(_) => return self.rows.next(),
		};
		match row.depth().cmp(&self.depth) {
			Ordering::Less => None,
			Ordering::Equal => self.rows.next(),
			Ordering::Greater => Some(Err(anyhow!("line {} is nested {} deep, expected at most {}", row.number(), row.depth(), self.depth))),
		}
	}
}

pub(crate) fn unescape(string: &str) -> Result<String> {
	let mut out = String::with_capacity(string.len());
	let mut chars = string.chars();
	while let Some(ch) = chars.next() {
		if ch == '\\' {
			out.push(match chars.next() {
				Some('\\') => '\\',
				Some('n') => '\n',
				Some('r') => '\r',
				Some('t') => '\t',
				Some('0') => '\0',
				other => bail!("invalid escape sequence \\{other:?} in {string:?}"),
			});
		} else {
			out.push(ch);
		}
	}
	Ok(out)
}

/// Returns `true` if the string can't be written without escaping.
pub(crate) fn needs_escaping(string: &str) -> bool {
	string.contains(&['\\', '\n', '\r', '\t', '\0'][..])
}

pub(crate) fn escape(string: &str) -> String {
	let mut out = String::with_capacity(string.len());
	for ch in string.chars() {
		match ch {
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			'\0' => out.push_str("\\0"),
			ch => out.push(ch),
		}
	}
	out
}

#[cfg(test)]
mod testing {
	use std::io::Cursor;
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::lines::{escape, needs_escaping, unescape, Level, Rows};

	#[test]
	fn rows_know_their_depth() -> Result<()> {
		let mut rows = Rows::new(Cursor::new("c\ta\tb\n\t\tp\t1\t\tx\n"));
		let mut row = rows.next().transpose()?.ok_or_else(|| anyhow::anyhow!("no row"))?;
		assert_eq!((row.number(), row.depth(), row.kind.as_str()), (1, 0, "c"));
		assert_eq!(row.field("name")?, "a");

		let mut row = rows.next().transpose()?.ok_or_else(|| anyhow::anyhow!("no row"))?;
		assert_eq!((row.number(), row.depth(), row.kind.as_str()), (2, 2, "p"));
		assert_eq!(row.parse_field::<u16>("index")?, 1);
		assert_eq!(row.rest(), ["", "x"]);
		assert!(rows.next().is_none());
		Ok(())
	}

	#[test]
	fn levels_stop_at_shallower_rows() -> Result<()> {
		let mut rows = Rows::new(Cursor::new("a\n\tb\n\t\tc\n\td\ne\n")).peekable();
		let mut seen = Vec::new();
		Level::top(&mut rows).each(|level, row| {
			seen.push(row.kind);
			level.nested().each(|level, row| {
				seen.push(format!("-{}", row.kind));
				level.skip_nested()
			})
		})?;
		assert_eq!(seen, ["a", "-b", "-d", "e"]);

		let mut rows = Rows::new(Cursor::new("a\n\t\tb\n")).peekable();
		assert!(Level::top(&mut rows).each(|level, _| level.nested().each(|_, _| Ok(()))).is_err());
		Ok(())
	}

	#[test]
	fn escaping() -> Result<()> {
		let raw = "a\tb\nc\\d\0";
		assert!(needs_escaping(raw));
		assert!(!needs_escaping("net/example/Apple$1"));
		assert_eq!(escape(raw), "a\\tb\\nc\\\\d\\0");
		assert_eq!(unescape(&escape(raw))?, raw);
		assert!(unescape("trailing\\").is_err());
		assert!(unescape("\\x").is_err());
		Ok(())
	}
}
