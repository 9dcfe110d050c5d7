
use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use pretty_assertions::assert_eq;
use quill::remapper::{ClassRemapper, MemberRemapper, SuperClasses};
use quill::tree::mappings::LocalKey;

fn super_classes() -> SuperClasses {
	let set = |classes: &[&str]| classes.iter().map(|x| (*x).to_owned()).collect::<IndexSet<String>>();
	SuperClasses { super_classes: IndexMap::from([
		("classS1".to_owned(), set(&["classS2", "classS3", "classS4"])),
		("classS2".to_owned(), set(&["classS5"])),
		("classS3".to_owned(), set(&["classS5"])),
		("classS4".to_owned(), set(&["classS5"])),
		("classS5".to_owned(), set(&["java/lang/Object"])),
	]) }
}

#[test]
fn remap() -> Result<()> {
	let input = include_str!("remap_input.tiny");
	let tree = quill::tiny_v2::read(input.as_bytes())?;
	tree.namespaces().check_that(&["namespaceA", "namespaceB"])?;

	let plan = quill::fallback::resolve(&tree, "namespaceA", "namespaceA", "namespaceB", true)?;
	assert_eq!(plan.warnings, vec![]);

	let super_classes = super_classes();
	let remapper = plan.remapper(&super_classes);

	let class = |class: &str| -> Result<String> {
		remapper.map_class(class)
	};
	let field = |class: &str, field: &str, desc: &str| -> Result<(String, String, String)> {
		Ok((remapper.map_class(class)?, remapper.map_field(class, field, desc)?, remapper.map_desc(desc)?))
	};
	let method = |class: &str, method: &str, desc: &str| -> Result<(String, String, String)> {
		Ok((remapper.map_class(class)?, remapper.map_method(class, method, desc)?, remapper.map_desc(desc)?))
	};
	let owned = |a: &str, b: &str, c: &str| (a.to_owned(), b.to_owned(), c.to_owned());

	assert_eq!(class("classA1")?, "classB1");
	assert_eq!(class("classA2")?, "classB2");
	assert_eq!(class("classA2$innerA1")?, "classB2$innerB1");
	assert_eq!(class("classA3")?, "classB3");
	assert_eq!(class("classA4L")?, "classB4L");
	assert_eq!(class("java/lang/Object")?, "java/lang/Object");
	assert_eq!(remapper.map_class_any("[[LclassA1;")?, "[[LclassB1;");

	assert_eq!(field("classA1", "field1A1", "I")?, owned("classB1", "field1B1", "I"));
	assert_eq!(field("classA1", "field1A2", "Ljava/lang/Object;")?, owned("classB1", "field1B2", "Ljava/lang/Object;"));
	assert_eq!(field("classA1", "field1A3", "LclassA1;")?, owned("classB1", "field1B3", "LclassB1;"));
	assert_eq!(field("classA1", "field1A4", "LclassA2$innerA1;")?, owned("classB1", "field1B4", "LclassB2$innerB1;"));
	// the descriptor is part of the lookup
	assert_eq!(field("classA1", "field1A4", "[LclassA2$innerA1;")?, owned("classB1", "field1A4", "[LclassB2$innerB1;"));

	assert_eq!(method("classA2", "method2A1", "()V")?, owned("classB2", "method2B1", "()V"));
	assert_eq!(method("classA2", "method2A2", "(I)I")?, owned("classB2", "method2B2", "(I)I"));
	assert_eq!(method("classA2", "method2A3", "(Ljava/lang/Integer;)Ljava/lang/Object;")?,
		owned("classB2", "method2B3", "(Ljava/lang/Integer;)Ljava/lang/Object;"));
	assert_eq!(method("classA2$innerA1", "<init>", "()V")?, owned("classB2$innerB1", "<init>", "()V"));

	assert_eq!(method("classA3", "method3A1", "(BCDFJSZ)V")?, owned("classB3", "method3B1", "(BCDFJSZ)V"));
	assert_eq!(method("classA3", "method3A2", "(LclassA1;LclassA2$innerA1;LclassA2;)LclassA3;")?,
		owned("classB3", "method3B2", "(LclassB1;LclassB2$innerB1;LclassB2;)LclassB3;"));
	assert_eq!(method("classA3", "method3A3", "([B[C[D[F[J[S[Z)I")?, owned("classB3", "method3B3", "([B[C[D[F[J[S[Z)I"));

	assert_eq!(field("classA4L", "field4A1", "LclassA4L;")?, owned("classB4L", "field4B1", "LclassB4L;"));
	assert_eq!(method("classA4L", "method4A1", "(LclassA4L;)LclassA4L;")?, owned("classB4L", "method4B1", "(LclassB4L;)LclassB4L;"));

	assert_eq!(remapper.map_param_fail("classA3", "method3A3", "([B[C[D[F[J[S[Z)I", 0)?, Some("b".to_owned()));
	assert_eq!(remapper.map_param_fail("classA3", "method3A3", "([B[C[D[F[J[S[Z)I", 1)?, None);
	let key = LocalKey { lv_index: 8, start_offset: 4, lvt_row: Some(3) };
	assert_eq!(remapper.map_local_fail("classA3", "method3A3", "([B[C[D[F[J[S[Z)I", key)?, Some("s".to_owned()));

	// Tests for super classes:
	assert_eq!(class("classS1")?, "classS1_");
	assert_eq!(class("classS5")?, "classS5_");

	assert_eq!(field("classS1", "fieldFromS1", "I")?, owned("classS1_", "fieldFromS1_", "I"));
	assert_eq!(field("classS1", "fieldFromS2", "I")?, owned("classS1_", "fieldFromS2_", "I"));
	assert_eq!(field("classS1", "fieldFromS3", "I")?, owned("classS1_", "fieldFromS3_", "I"));
	assert_eq!(field("classS1", "fieldFromS4", "I")?, owned("classS1_", "fieldFromS4_", "I"));
	assert_eq!(field("classS1", "fieldFromS5", "I")?, owned("classS1_", "fieldFromS5_", "I"));
	assert_eq!(field("classS2", "fieldFromS5", "I")?, owned("classS2_", "fieldFromS5_", "I"));
	assert_eq!(field("classS5", "fieldFromS1", "I")?, owned("classS5_", "fieldFromS1", "I"));

	assert_eq!(method("classS1", "methodFromS1", "(I)I")?, owned("classS1_", "methodFromS1_", "(I)I"));
	assert_eq!(method("classS1", "methodFromS4", "(I)I")?, owned("classS1_", "methodFromS4_", "(I)I"));
	assert_eq!(method("classS1", "methodFromS5", "(I)I")?, owned("classS1_", "methodFromS5_", "(I)I"));
	assert_eq!(method("classS3", "methodFromS5", "(I)I")?, owned("classS3_", "methodFromS5_", "(I)I"));
	assert_eq!(method("classS4", "methodFromS2", "(I)I")?, owned("classS4_", "methodFromS2", "(I)I"));

	Ok(())
}

#[test]
fn inheritance_cycles_end() -> Result<()> {
	let tree = quill::tiny_v2::read("tiny\t2\t0\ta\tb\nc\tX\tY\n".as_bytes())?;
	let plan = quill::fallback::resolve(&tree, "a", "a", "b", false)?;

	let set = |class: &str| IndexSet::from([class.to_owned()]);
	let super_classes = SuperClasses { super_classes: IndexMap::from([
		("X".to_owned(), set("Z")),
		("Z".to_owned(), set("X")),
	]) };
	let remapper = plan.remapper(&super_classes);

	assert_eq!(remapper.map_field("X", "f", "I")?, "f");
	Ok(())
}

#[test]
fn signatures() -> Result<()> {
	let tree = quill::tiny_v2::read("\
tiny\t2\t0\ta\tb
c\tA\tApple
c\tA$B\tApple$Seed
c\tC\tCherry
".as_bytes())?;
	let a = tree.require_namespace("a")?;
	let b = tree.require_namespace("b")?;
	let remapper = tree.class_remapper(a, b);

	assert_eq!(remapper.map_signature("Ljava/util/List<LA;>;")?, "Ljava/util/List<LApple;>;");
	assert_eq!(remapper.map_signature("<T:LA;U::Ljava/lang/Comparable<-TT;>;>LC;")?,
		"<T:LApple;U::Ljava/lang/Comparable<-TT;>;>LCherry;");
	assert_eq!(remapper.map_signature("LA<TT;>.B;")?, "LApple<TT;>.Seed;");
	assert_eq!(remapper.map_signature("<E:Ljava/lang/Exception;>([LA;Ljava/util/Map<*+LC;>;)V^TE;^LA;")?,
		"<E:Ljava/lang/Exception;>([LApple;Ljava/util/Map<*+LCherry;>;)V^TE;^LApple;");

	assert!(remapper.map_signature("LA").is_err());
	Ok(())
}
