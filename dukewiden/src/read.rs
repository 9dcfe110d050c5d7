use std::path::Path;
use anyhow::{anyhow, Context, Result};
use quill::error::MappingError;
use crate::{Access, AccessWidener, Rule, Target, Version};

/// Reads an access widener from a file.
pub fn read_file(path: impl AsRef<Path>) -> Result<AccessWidener> {
	let path = path.as_ref();
	let bytes = std::fs::read(path)
		.with_context(|| anyhow!("failed to read access widener {path:?}"))?;
	read(&bytes)
		.with_context(|| anyhow!("failed to parse access widener {path:?}"))
}

/// Reads an access widener.
///
/// Anything after a `#` is a comment. Blank lines are skipped.
pub fn read(bytes: &[u8]) -> Result<AccessWidener> {
	let text = std::str::from_utf8(bytes)
		.map_err(|e| MappingError::format(format!("access widener isn't valid utf-8: {e}")))?;

	let mut lines = text.lines()
		.enumerate()
		.map(|(index, line)| (index + 1, line.split('#').next().unwrap_or_default().trim_end()))
		.filter(|(_, line)| !line.trim().is_empty());

	let (line_number, header) = lines.next()
		.ok_or_else(|| MappingError::format("access widener is empty"))?;
	let mut widener = read_header(header)
		.with_context(|| anyhow!("in line {line_number}"))?;

	for (line_number, line) in lines {
		let rule = read_rule(widener.version, line)
			.with_context(|| anyhow!("in line {line_number}"))?;
		widener.add(rule)
			.with_context(|| anyhow!("in line {line_number}"))?;
	}

	Ok(widener)
}

fn read_header(line: &str) -> Result<AccessWidener> {
	match line.split_whitespace().collect::<Vec<_>>().as_slice() {
		["accessWidener", version, namespace] => Ok(AccessWidener::new(Version::parse(version)?, *namespace)),
		_ => Err(MappingError::format(format!("expected a header like \"accessWidener v2 named\", got {line:?}"))),
	}
}

fn read_rule(version: Version, line: &str) -> Result<Rule> {
	let tokens: Vec<&str> = line.split_whitespace().collect();
	let [access, kind, class, member @ ..] = tokens.as_slice() else {
		return Err(MappingError::format(format!("expected at least an access, a kind and a class, got {line:?}")));
	};

	let (transitive, access) = match access.strip_prefix("transitive-") {
		Some(access) if version >= Version::V2 => (true, access),
		Some(_) => return Err(MappingError::format(format!("transitive rules need version v2, got {line:?}"))),
		None => (false, *access),
	};
	let access = Access::parse(access)?;
	let class = (*class).to_owned();

	let target = match (*kind, member) {
		("class", []) => Target::Class { class },
		("method", [name, desc]) => Target::Method { class, name: (*name).to_owned(), desc: (*desc).to_owned() },
		("method", [name_desc]) => {
			let (name, desc) = name_desc.find('(')
				.map(|index| name_desc.split_at(index))
				.filter(|(name, _)| !name.is_empty())
				.ok_or_else(|| MappingError::format(format!("expected a method name and descriptor, got {name_desc:?}")))?;
			Target::Method { class, name: name.to_owned(), desc: desc.to_owned() }
		},
		("field", [name, desc]) => Target::Field { class, name: (*name).to_owned(), desc: (*desc).to_owned() },
		("class" | "method" | "field", _) => {
			return Err(MappingError::format(format!("wrong number of names for a {kind} rule: {line:?}")));
		},
		(kind, _) => return Err(MappingError::format(format!("unknown kind {kind:?}, expected one of class, method or field"))),
	};

	Rule::new(access, transitive, target)
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use quill::error::MappingError;
	use crate::{Access, Rule, Target, Version};

	#[test]
	fn read() -> Result<()> {
		let widener = super::read(b"\
# made by hand
accessWidener\tv2\tnamed

accessible class net/example/Apple # the fruit
accessible\tmethod\tnet/example/Apple\tbite\t()V
extendable method net/example/Apple eat(I)Z
transitive-mutable field net/example/Apple seeds I
accessible class net/example/Apple
")?;

		assert_eq!(widener.version, Version::V2);
		assert_eq!(widener.namespace, "named");
		let apple = || "net/example/Apple".to_owned();
		assert_eq!(widener.rules.into_iter().collect::<Vec<_>>(), [
			Rule { access: Access::Accessible, transitive: false, target: Target::Class { class: apple() } },
			Rule { access: Access::Accessible, transitive: false, target: Target::Method { class: apple(), name: "bite".to_owned(), desc: "()V".to_owned() } },
			Rule { access: Access::Extendable, transitive: false, target: Target::Method { class: apple(), name: "eat".to_owned(), desc: "(I)Z".to_owned() } },
			Rule { access: Access::Mutable, transitive: true, target: Target::Field { class: apple(), name: "seeds".to_owned(), desc: "I".to_owned() } },
		]);
		Ok(())
	}

	#[test]
	fn broken() {
		for input in [
			"",
			"# only a comment\n",
			"accessWidener v3 named\n",
			"accessWidener v1\n",
			"accessWidener v1 named\ntransitive-accessible class a\n",
			"accessWidener v2 named\naccessible class\n",
			"accessWidener v2 named\naccessible class a b\n",
			"accessWidener v2 named\naccessible method a b\n",
			"accessWidener v2 named\naccessible method a (I)V\n",
			"accessWidener v2 named\naccessible field a b\n",
			"accessWidener v2 named\naccessible record a\n",
			"accessWidener v2 named\nvisible class a\n",
			"accessWidener v2 named\nmutable method a b ()V\n",
			"accessWidener v2 named\nextendable field a b I\n",
		] {
			let error = super::read(input.as_bytes()).unwrap_err();
			assert!(matches!(error.downcast_ref::<MappingError>(), Some(MappingError::Format(_))), "{input:?}: {error:?}");
		}
	}
}
