use std::fmt::Write;
use std::io::Write as _;
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use crate::{AccessWidener, Rule, Target, Version};

/// Writes the access widener, with the rules sorted by class, and tabs between the words.
///
/// The version is raised to [`Version::V2`] if there are transitive rules.
pub fn write_string(widener: &AccessWidener) -> String {
	let version = if widener.rules.iter().any(|rule| rule.transitive) {
		widener.version.max(Version::V2)
	} else {
		widener.version
	};

	let mut rules: Vec<&Rule> = widener.rules.iter().collect();
	rules.sort_by(|a, b| {
		a.target.class().cmp(b.target.class())
			.then_with(|| a.target.cmp(&b.target))
			.then_with(|| a.access.cmp(&b.access))
			.then_with(|| a.transitive.cmp(&b.transitive))
	});

	let mut out = format!("accessWidener\t{version}\t{}\n", widener.namespace);
	for rule in rules {
		let transitive = if rule.transitive { "transitive-" } else { "" };
		// writing into a string doesn't fail
		let _ = match &rule.target {
			Target::Class { class } => writeln!(out, "{transitive}{}\tclass\t{class}", rule.access),
			Target::Method { class, name, desc } => writeln!(out, "{transitive}{}\tmethod\t{class}\t{name}\t{desc}", rule.access),
			Target::Field { class, name, desc } => writeln!(out, "{transitive}{}\tfield\t{class}\t{name}\t{desc}", rule.access),
		};
	}
	out
}

/// Writes the access widener to a file, replacing it only once everything is written.
pub fn write_file(widener: &AccessWidener, path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
	std::fs::create_dir_all(parent)
		.with_context(|| anyhow!("failed to create directory {parent:?}"))?;

	let mut temp = NamedTempFile::new_in(parent)
		.with_context(|| anyhow!("failed to create temporary file in {parent:?}"))?;
	temp.write_all(write_string(widener).as_bytes())
		.with_context(|| anyhow!("failed to write access widener for {path:?}"))?;

	temp.persist(path)
		.with_context(|| anyhow!("failed to move access widener to {path:?}"))?;
	Ok(())
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;

	#[test]
	fn write() -> Result<()> {
		let widener = crate::read(b"\
accessWidener v1 official
mutable field b c I
accessible method a d(I)V
accessible class b
extendable class a
accessible class a
")?;

		let expected = "\
accessWidener\tv1\tofficial
accessible\tclass\ta
extendable\tclass\ta
accessible\tmethod\ta\td\t(I)V
accessible\tclass\tb
mutable\tfield\tb\tc\tI
";
		let actual = super::write_string(&widener);
		assert_eq!(actual, expected, "left: actual, right: expected");
		assert_eq!(crate::read(actual.as_bytes())?, widener);

		let dir = tempfile::tempdir()?;
		let path = dir.path().join("out").join("merged.accesswidener");
		std::fs::create_dir_all(dir.path().join("out"))?;
		std::fs::write(&path, "accessWidener\tv2\tnamed\nthis is replaced\n")?;
		super::write_file(&widener, &path)?;
		assert_eq!(std::fs::read_to_string(&path)?, expected);

		// nothing but the widener is left in the directory
		let files = std::fs::read_dir(dir.path().join("out"))?.count();
		assert_eq!(files, 1);
		Ok(())
	}
}
