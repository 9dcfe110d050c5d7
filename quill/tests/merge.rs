
use anyhow::{anyhow, Result};
use pretty_assertions::assert_eq;
use quill::action::merge::ConflictPolicy;

#[test]
fn merge() -> Result<()> {
	let columnar = include_str!("merge_input_columnar.tiny");
	let two_column = include_str!("merge_input_client_mappings.txt");
	let expected = include_str!("merge_output.tiny");

	let mut tree = quill::tiny_v2::read(columnar.as_bytes())?;
	let incoming = quill::proguard::read(two_column.as_bytes(), "official", "obf")?;

	let conflicts = tree.merge(&incoming, "obf", ConflictPolicy::Report)?;
	assert_eq!(conflicts, vec![]);

	let actual = quill::tiny_v2::write_string(&tree)?;

	assert_eq!(actual, expected, "left: actual, right: expected");

	Ok(())
}

#[test]
fn merged_classes_keep_their_own_members() -> Result<()> {
	let mut tree = quill::tiny_v2::read(include_str!("merge_input_columnar.tiny").as_bytes())?;
	let incoming = quill::proguard::read(include_str!("merge_input_client_mappings.txt").as_bytes(), "official", "obf")?;
	tree.merge(&incoming, "obf", ConflictPolicy::Report)?;

	let obf = tree.require_namespace("obf")?;
	let intermediary = tree.require_namespace("intermediary")?;
	let official = tree.require_namespace("official")?;

	let a = tree.class(official, "A").ok_or_else(|| anyhow!("no class A"))?;
	assert_eq!(a.name(obf), Some("a"));
	assert_eq!(a.name(intermediary), None);
	assert_eq!(a.fields.len(), 1);
	assert_eq!(a.methods.len(), 1);

	let b = tree.class(obf, "b").ok_or_else(|| anyhow!("no class b"))?;
	assert_eq!(b.name(intermediary), Some("class_2"));
	assert_eq!(b.fields.iter().map(|f| f.names.get(obf)).collect::<Vec<_>>(), [Some("c")]);
	assert_eq!(b.methods.iter().map(|m| m.names.get(obf)).collect::<Vec<_>>(), [Some("d")]);

	Ok(())
}

#[test]
fn chained_files() -> Result<()> {
	let intermediary = "\
tiny\t2\t0\tofficial\tintermediary
c\ta\tclass_1
\tm\t(La;)I\tb\tmethod_2
c\tc\tclass_3
";
	let named = "\
tiny\t2\t0\tintermediary\tnamed
c\tclass_1\tnet/example/Apple
\tc\tA fruit.
\tm\t(Lclass_1;)I\tmethod_2\tcompare
\t\tp\t1\t\tother
c\tclass_4\tnet/example/Unused
";
	let expected = "\
tiny\t2\t0\tofficial\tintermediary\tnamed
c\ta\tclass_1\tnet/example/Apple
\tc\tA fruit.
\tm\t(La;)I\tb\tmethod_2\tcompare
\t\tp\t1\t\t\tother
c\tc\tclass_3\t
c\t\tclass_4\tnet/example/Unused
";

	let mut tree = quill::tiny_v2::read(intermediary.as_bytes())?;
	tree.merge(&quill::tiny_v2::read(named.as_bytes())?, "intermediary", ConflictPolicy::Report)?;

	assert_eq!(quill::tiny_v2::write_string(&tree)?, expected);

	Ok(())
}
