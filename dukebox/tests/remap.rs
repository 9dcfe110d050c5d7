
use anyhow::{anyhow, bail, Result};
use pretty_assertions::assert_eq;
use duke::access;
use duke::attribute::{self, AttributeData, Code, LocalVariableTable};
use duke::builder::{ClassBuilder, Local};
use duke::pool::MemberRefKind;
use dukebox::remap::{RemapOptions, RemapResult};
use dukebox::storage::{BasicFileAttributes, Jar, JarEntry, JarEntryEnum, NamedMemJar, OpenedJar};
use dukebox::transform::{Resource, ResourceTransformer};
use quill::fallback::RenamePlan;
use quill::remapper::{ClassRemapper, MemberRemapper, NoSuperClassProvider};

const MAPPINGS: &str = "\
tiny\t2\t0\tofficial\tnamed
c\ta\tnet/example/Apple
\tf\tI\tb\tseeds
\tm\t(La;)I\tc\tcompare
\t\tp\t1\t\tother
c\td\tnet/example/Main
";

fn plan() -> Result<RenamePlan> {
	let tree = quill::tiny_v2::read(MAPPINGS.as_bytes())?;
	quill::fallback::resolve(&tree, "official", "official", "named", true)
}

/// `class a { int b; int c(a o) { return o.b; } }`
fn apple() -> Result<Vec<u8>> {
	let mut class = ClassBuilder::new(access::PUBLIC, "a", Some("java/lang/Object"))?;
	class.add_field(access::PRIVATE, "b", "I", Vec::new())?;

	let field = class.pool().put_member_ref(MemberRefKind::Field, "a", "b", "I")?;
	let [high, low] = field.to_be_bytes();
	let code = class.code(vec![0x2b, 0xb4, high, low, 0xac], 1, &[
		Local { name: "this", desc: "La;", index: 0 },
		Local { name: "o", desc: "La;", index: 1 },
	])?;
	class.add_method(access::PUBLIC, "c", "(La;)I", vec![code])?;

	duke::write_class(&class.build())
}

fn main_class() -> Result<Vec<u8>> {
	let mut class = ClassBuilder::new(access::PUBLIC, "d", Some("java/lang/Object"))?;
	class.add_field(access::PUBLIC | access::STATIC, "apple", "La;", Vec::new())?;
	duke::write_class(&class.build())
}

fn entry(name: &str, data: JarEntryEnum) -> JarEntry {
	JarEntry { name: name.to_owned(), attrs: BasicFileAttributes::default(), data }
}

fn jar(entries: &[JarEntry]) -> Result<NamedMemJar> {
	let ((), data) = dukebox::storage::write_vec(|zip| {
		for entry in entries {
			dukebox::storage::write_entry(zip, entry)?;
		}
		Ok(())
	})?;
	Ok(NamedMemJar::new("input.jar", data))
}

fn read(jar: &impl Jar) -> Result<Vec<JarEntry>> {
	jar.open()?.entries()
}

fn find<'a>(entries: &'a [JarEntry], name: &str) -> Result<&'a [u8]> {
	entries.iter()
		.find(|entry| entry.name == name)
		.and_then(|entry| entry.data.bytes())
		.ok_or_else(|| anyhow!("no entry {name:?} in {entries:?}"))
}

fn remap(input: &NamedMemJar, plan: &RenamePlan, options: &RemapOptions) -> Result<RemapResult<NamedMemJar>> {
	let super_classes = input.super_classes()?;
	let remapper = plan.remapper(&super_classes);
	dukebox::remap::remap_to_mem(input, &remapper, options, "output.jar")
}

#[test]
fn remap_jar() -> Result<()> {
	let input = jar(&[
		entry("a.class", JarEntryEnum::Class(apple()?)),
		entry("d.class", JarEntryEnum::Class(main_class()?)),
		entry("assets/", JarEntryEnum::Dir),
		entry("assets/apple.png", JarEntryEnum::Other(vec![1, 2, 3])),
	])?;

	let result = remap(&input, &plan()?, &RemapOptions::default())?;
	assert_eq!(result.warnings, vec![]);
	assert_eq!(result.touched_classes.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect::<Vec<_>>(), [
		("a", "net/example/Apple"),
		("d", "net/example/Main"),
	]);

	let entries = read(&result.output)?;
	assert_eq!(entries.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>(), [
		"net/example/Apple.class",
		"net/example/Main.class",
		"assets/",
		"assets/apple.png",
	]);
	assert_eq!(find(&entries, "assets/apple.png")?, [1, 2, 3]);

	let apple = duke::read_class(find(&entries, "net/example/Apple.class")?)?;
	assert_eq!(apple.name()?, "net/example/Apple");
	assert_eq!(apple.fields[0].name(&apple.pool)?, "seeds");

	let method = &apple.methods[0];
	assert_eq!(method.name(&apple.pool)?, "compare");
	assert_eq!(method.descriptor(&apple.pool)?, "(Lnet/example/Apple;)I");

	let code = apple.find_attribute(&method.attributes, attribute::CODE)?
		.ok_or_else(|| anyhow!("no code"))?;
	let code = Code::parse(code)?;
	let field = u16::from_be_bytes([code.code[2], code.code[3]]);
	let field = apple.pool.get_member_ref(field)?;
	assert_eq!((field.class, field.name, field.desc), ("net/example/Apple", "seeds", "I"));

	let table = apple.find_attribute(&code.attributes, attribute::LOCAL_VARIABLE_TABLE)?
		.ok_or_else(|| anyhow!("no local variable table"))?;
	let names = LocalVariableTable::parse(table)?.0.iter()
		.map(|local| Ok((apple.pool.get_utf8(local.name_index)?, apple.pool.get_utf8(local.descriptor_index)?)))
		.collect::<Result<Vec<_>>>()?;
	assert_eq!(names, [("this", "Lnet/example/Apple;"), ("other", "Lnet/example/Apple;")]);

	let main = duke::read_class(find(&entries, "net/example/Main.class")?)?;
	assert_eq!(main.fields[0].descriptor(&main.pool)?, "Lnet/example/Apple;");

	Ok(())
}

#[test]
fn locals_can_be_kept() -> Result<()> {
	let input = jar(&[entry("a.class", JarEntryEnum::Class(apple()?))])?;
	let options = RemapOptions { remap_locals: false, ..RemapOptions::default() };

	// without locals in the plan, the names stay
	let tree = quill::tiny_v2::read(MAPPINGS.as_bytes())?;
	let plan = quill::fallback::resolve(&tree, "official", "official", "named", false)?;
	let result = remap(&input, &plan, &options)?;

	let entries = read(&result.output)?;
	let apple = duke::read_class(find(&entries, "net/example/Apple.class")?)?;
	let code = apple.find_attribute(&apple.methods[0].attributes, attribute::CODE)?
		.ok_or_else(|| anyhow!("no code"))?;
	let code = Code::parse(code)?;
	let table = apple.find_attribute(&code.attributes, attribute::LOCAL_VARIABLE_TABLE)?
		.ok_or_else(|| anyhow!("no local variable table"))?;
	let local = &LocalVariableTable::parse(table)?.0[1];
	assert_eq!(apple.pool.get_utf8(local.name_index)?, "o");

	Ok(())
}

#[test]
fn nothing_to_rename_keeps_classes_as_they_are() -> Result<()> {
	let apple = apple()?;
	let main = main_class()?;
	let input = jar(&[
		entry("a.class", JarEntryEnum::Class(apple.clone())),
		entry("d.class", JarEntryEnum::Class(main.clone())),
	])?;

	let tree = quill::tiny_v2::read("tiny\t2\t0\tofficial\tnamed\nc\tx\tnet/example/Unrelated\n".as_bytes())?;
	let plan = quill::fallback::resolve(&tree, "official", "official", "named", true)?;

	let result = remap(&input, &plan, &RemapOptions::default())?;
	assert_eq!(result.warnings, vec![]);
	assert_eq!(result.touched_classes.get("a").map(String::as_str), Some("a"));

	let entries = read(&result.output)?;
	assert_eq!(find(&entries, "a.class")?, apple.as_slice());
	assert_eq!(find(&entries, "d.class")?, main.as_slice());

	// and the same for a remapper knowing nothing at all
	let plan = RenamePlan { source: "a".to_owned(), target: "b".to_owned(), records: Vec::new(), warnings: Vec::new() };
	let remapper = plan.remapper(&NoSuperClassProvider);
	let result = dukebox::remap::remap_to_mem(&input, &remapper, &RemapOptions::default(), "output.jar")?;
	assert_eq!(find(&read(&result.output)?, "a.class")?, apple.as_slice());

	Ok(())
}

#[test]
fn broken_classes_are_copied() -> Result<()> {
	let broken = b"\xca\xfe\xba\xbe\x00\x00".to_vec();
	let input = jar(&[
		entry("a.class", JarEntryEnum::Class(apple()?)),
		entry("broken.class", JarEntryEnum::Class(broken.clone())),
	])?;

	let result = remap(&input, &plan()?, &RemapOptions::default())?;
	assert_eq!(result.warnings.len(), 1);
	assert_eq!(result.warnings[0].entry, "broken.class");
	assert!(!result.touched_classes.contains_key("broken"));
	assert!(result.touched_classes.contains_key("a"));

	let entries = read(&result.output)?;
	assert_eq!(find(&entries, "broken.class")?, broken.as_slice());
	assert!(find(&entries, "net/example/Apple.class").is_ok());
	Ok(())
}

#[test]
fn meta_inf_is_fixed() -> Result<()> {
	let manifest = "\
Manifest-Version: 1.0\r
Main-Class: d\r
\r
Name: a.class\r
SHA-256-Digest: AAAA\r
\r
";
	let input = jar(&[
		entry("META-INF/MANIFEST.MF", JarEntryEnum::Other(manifest.as_bytes().to_vec())),
		entry("META-INF/SIGNER.SF", JarEntryEnum::Other(b"signature".to_vec())),
		entry("META-INF/SIGNER.RSA", JarEntryEnum::Other(b"signature".to_vec())),
		entry("META-INF/services/a", JarEntryEnum::Other(b"# apples\nd\n".to_vec())),
		entry("a.class", JarEntryEnum::Class(apple()?)),
	])?;

	let result = remap(&input, &plan()?, &RemapOptions::default())?;
	let entries = read(&result.output)?;
	assert_eq!(entries.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>(), [
		"META-INF/MANIFEST.MF",
		"META-INF/services/net.example.Apple",
		"net/example/Apple.class",
	]);
	assert_eq!(std::str::from_utf8(find(&entries, "META-INF/MANIFEST.MF")?)?,
		"Manifest-Version: 1.0\r\nMain-Class: net.example.Main\r\n\r\n");
	assert_eq!(find(&entries, "META-INF/services/net.example.Apple")?, b"# apples\nnet.example.Main\n");

	// and without fixing, everything stays
	let options = RemapOptions { fix_meta_inf: false, ..RemapOptions::default() };
	let result = remap(&input, &plan()?, &options)?;
	let entries = read(&result.output)?;
	assert_eq!(entries.len(), 5);
	assert_eq!(find(&entries, "META-INF/MANIFEST.MF")?, manifest.as_bytes());
	assert_eq!(find(&entries, "META-INF/services/a")?, b"# apples\nd\n");

	Ok(())
}

#[derive(Debug)]
struct Shouting;

impl ResourceTransformer for Shouting {
	fn claims(&self, path: &str) -> bool {
		path.ends_with(".txt")
	}

	fn transform(&self, path: &str, data: &[u8], remapper: &dyn MemberRemapper) -> Result<Resource> {
		if data == b"fail" {
			bail!("can't shout {path:?}");
		}
		let text = std::str::from_utf8(data)?;
		Ok(Resource::new(path, remapper.map_class(text)?.to_uppercase().into_bytes()))
	}
}

#[test]
fn transformers() -> Result<()> {
	let input = jar(&[entry("name.txt", JarEntryEnum::Other(b"a".to_vec()))])?;
	let options = RemapOptions::default().with_transformer(Shouting);

	let result = remap(&input, &plan()?, &options)?;
	assert_eq!(find(&read(&result.output)?, "name.txt")?, b"NET/EXAMPLE/APPLE");

	// failing transformers fail the remap, without leaving anything behind
	let input = jar(&[
		entry("a.class", JarEntryEnum::Class(apple()?)),
		entry("name.txt", JarEntryEnum::Other(b"fail".to_vec())),
	])?;
	let dir = tempfile::tempdir()?;
	let output = dir.path().join("output.jar");
	let error = dukebox::remap::remap(&input, &plan()?, &options, &output).unwrap_err();
	assert!(format!("{error:#}").contains("can't shout"), "{error:#}");
	assert!(!output.exists());

	Ok(())
}

#[test]
fn remap_to_file() -> Result<()> {
	let input = jar(&[entry("a.class", JarEntryEnum::Class(apple()?))])?;
	let dir = tempfile::tempdir()?;
	let output = dir.path().join("out").join("output.jar");

	let result = dukebox::remap::remap(&input, &plan()?, &RemapOptions::default(), &output)?;
	assert_eq!(result.output.path, output);

	let mut opened = result.output.open()?;
	let entry = OpenedJar::by_name(&mut opened, "net/example/Apple.class")?
		.ok_or_else(|| anyhow!("no remapped class"))?;
	assert_eq!(entry.class_name(), Some("net/example/Apple"));
	Ok(())
}
