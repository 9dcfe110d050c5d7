use anyhow::{anyhow, bail, Context, Result};
use crate::{ClassRead, ClassWrite, MAGIC};
use crate::pool::Pool;

/// Class files newer than this (Java 23) are rejected.
const MAX_MAJOR_VERSION: u16 = 67;

/// A class file, with everything but the constant pool and the attribute names left as indices and raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
	pub minor_version: u16,
	pub major_version: u16,
	pub pool: Pool,
	pub access: u16,
	pub this_class: u16,
	/// Zero for `java/lang/Object` and `module-info`.
	pub super_class: u16,
	pub interfaces: Vec<u16>,
	pub fields: Vec<Member>,
	pub methods: Vec<Member>,
	pub attributes: Vec<Attribute>,
}

/// Either a field or a method.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
	pub access: u16,
	pub name_index: u16,
	pub descriptor_index: u16,
	pub attributes: Vec<Attribute>,
}

/// An attribute, with its contents left unparsed.
///
/// Use the types in [`crate::attribute`] to parse the contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
	pub name_index: u16,
	pub data: Vec<u8>,
}

impl Attribute {
	pub(crate) fn read(reader: &mut impl ClassRead) -> Result<Attribute> {
		let name_index = reader.read_u16()?;
		let length = reader.read_u32_as_usize()?;
		let data = reader.read_u8_vec(length)?;
		Ok(Attribute { name_index, data })
	}

	pub(crate) fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		writer.write_u16(self.name_index)?;
		writer.write_usize_as_u32(self.data.len())?;
		writer.write_u8_slice(&self.data)
	}

	pub(crate) fn read_list(reader: &mut impl ClassRead) -> Result<Vec<Attribute>> {
		reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Attribute::read(r)
		)
	}

	pub(crate) fn write_list(writer: &mut impl ClassWrite, attributes: &[Attribute]) -> Result<()> {
		writer.write_slice(attributes,
			|w, size| w.write_usize_as_u16(size),
			|w, attribute| attribute.write(w)
		)
	}

	pub fn name<'a>(&self, pool: &'a Pool) -> Result<&'a str> {
		pool.get_utf8(self.name_index)
			.context("while getting attribute name")
	}
}

impl Member {
	fn read(reader: &mut impl ClassRead) -> Result<Member> {
		Ok(Member {
			access: reader.read_u16()?,
			name_index: reader.read_u16()?,
			descriptor_index: reader.read_u16()?,
			attributes: Attribute::read_list(reader)?,
		})
	}

	fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		writer.write_u16(self.access)?;
		writer.write_u16(self.name_index)?;
		writer.write_u16(self.descriptor_index)?;
		Attribute::write_list(writer, &self.attributes)
	}

	pub fn name<'a>(&self, pool: &'a Pool) -> Result<&'a str> {
		pool.get_utf8(self.name_index)
			.context("while getting member name")
	}

	pub fn descriptor<'a>(&self, pool: &'a Pool) -> Result<&'a str> {
		pool.get_utf8(self.descriptor_index)
			.context("while getting member descriptor")
	}
}

impl ClassFile {
	pub(crate) fn read(reader: &mut impl ClassRead) -> Result<ClassFile> {
		let magic = reader.read_u32()?;
		if magic != MAGIC {
			bail!("wrong magic: got {magic:#x}, expected 0xCAFEBABE");
		}

		let minor_version = reader.read_u16()?;
		let major_version = reader.read_u16()?;
		if major_version > MAX_MAJOR_VERSION {
			bail!("unsupported class file version: {major_version}.{minor_version}");
		}

		let pool = Pool::read(reader)?;
		let access = reader.read_u16()?;
		let this_class = reader.read_u16()?;
		let super_class = reader.read_u16()?;
		let interfaces = reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| r.read_u16()
		)?;
		let fields = reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Member::read(r).context("while reading field")
		)?;
		let methods = reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Member::read(r).context("while reading method")
		)?;
		let attributes = Attribute::read_list(reader)?;

		let class = ClassFile {
			minor_version,
			major_version,
			pool,
			access,
			this_class,
			super_class,
			interfaces,
			fields,
			methods,
			attributes,
		};

		// make sure the class name can be resolved, everything further down relies on it
		class.name()?;

		Ok(class)
	}

	pub(crate) fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		writer.write_u32(MAGIC)?;
		writer.write_u16(self.minor_version)?;
		writer.write_u16(self.major_version)?;
		self.pool.write(writer)?;
		writer.write_u16(self.access)?;
		writer.write_u16(self.this_class)?;
		writer.write_u16(self.super_class)?;
		writer.write_slice(&self.interfaces,
			|w, size| w.write_usize_as_u16(size),
			|w, &interface| w.write_u16(interface)
		)?;
		writer.write_slice(&self.fields,
			|w, size| w.write_usize_as_u16(size),
			|w, field| field.write(w)
		)?;
		writer.write_slice(&self.methods,
			|w, size| w.write_usize_as_u16(size),
			|w, method| method.write(w)
		)?;
		Attribute::write_list(writer, &self.attributes)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<ClassFile> {
		let mut reader = bytes;
		let class = ClassFile::read(&mut reader)?;
		if !reader.is_empty() {
			bail!("found {} bytes after the end of class {:?}", reader.len(), class.name()?);
		}
		Ok(class)
	}

	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		let mut vec = Vec::new();
		self.write(&mut vec)
			.with_context(|| anyhow!("failed to write class {:?}", self.name().unwrap_or("<unknown>")))?;
		Ok(vec)
	}

	pub fn name(&self) -> Result<&str> {
		self.pool.get_class(self.this_class)
			.context("while getting name of class")
	}

	pub fn super_name(&self) -> Result<Option<&str>> {
		self.pool.get_optional(self.super_class, Pool::get_class)
			.context("while getting super class name")
	}

	pub fn interface_names(&self) -> Result<Vec<&str>> {
		self.interfaces.iter()
			.map(|&index| self.pool.get_class(index).context("while getting interface name"))
			.collect()
	}

	/// Finds the first attribute of the given name in the list.
	pub fn find_attribute<'a>(&self, attributes: &'a [Attribute], name: &str) -> Result<Option<&'a Attribute>> {
		for attribute in attributes {
			if attribute.name(&self.pool)? == name {
				return Ok(Some(attribute));
			}
		}
		Ok(None)
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::class_file::ClassFile;

	/// A class file compiled by `javac` 17 from `package a; public class B { int c; void d() {} }`.
	const B_CLASS: &[u8] = &[
		0xca, 0xfe, 0xba, 0xbe, 0x00, 0x00, 0x00, 0x3d, 0x00, 0x10, 0x0a, 0x00, 0x02, 0x00, 0x03, 0x07,
		0x00, 0x04, 0x0c, 0x00, 0x05, 0x00, 0x06, 0x01, 0x00, 0x10, 0x6a, 0x61, 0x76, 0x61, 0x2f, 0x6c,
		0x61, 0x6e, 0x67, 0x2f, 0x4f, 0x62, 0x6a, 0x65, 0x63, 0x74, 0x01, 0x00, 0x06, 0x3c, 0x69, 0x6e,
		0x69, 0x74, 0x3e, 0x01, 0x00, 0x03, 0x28, 0x29, 0x56, 0x07, 0x00, 0x08, 0x01, 0x00, 0x03, 0x61,
		0x2f, 0x42, 0x01, 0x00, 0x01, 0x63, 0x01, 0x00, 0x01, 0x49, 0x01, 0x00, 0x04, 0x43, 0x6f, 0x64,
		0x65, 0x01, 0x00, 0x0f, 0x4c, 0x69, 0x6e, 0x65, 0x4e, 0x75, 0x6d, 0x62, 0x65, 0x72, 0x54, 0x61,
		0x62, 0x6c, 0x65, 0x01, 0x00, 0x01, 0x64, 0x01, 0x00, 0x0a, 0x53, 0x6f, 0x75, 0x72, 0x63, 0x65,
		0x46, 0x69, 0x6c, 0x65, 0x01, 0x00, 0x06, 0x42, 0x2e, 0x6a, 0x61, 0x76, 0x61, 0x00, 0x21, 0x00,
		0x07, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x00, 0x0a, 0x00, 0x00, 0x00,
		0x02, 0x00, 0x01, 0x00, 0x05, 0x00, 0x06, 0x00, 0x01, 0x00, 0x0b, 0x00, 0x00, 0x00, 0x1d, 0x00,
		0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x2a, 0xb7, 0x00, 0x01, 0xb1, 0x00, 0x00, 0x00, 0x01,
		0x00, 0x0c, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0d,
		0x00, 0x06, 0x00, 0x01, 0x00, 0x0b, 0x00, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
		0x00, 0x01, 0xb1, 0x00, 0x00, 0x00, 0x01, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00,
		0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x0e, 0x00, 0x00, 0x00, 0x02, 0x00, 0x0f,
	];

	#[test]
	fn read_javac_output() -> Result<()> {
		let class = ClassFile::from_bytes(B_CLASS)?;

		assert_eq!(class.major_version, 61);
		assert_eq!(class.name()?, "a/B");
		assert_eq!(class.super_name()?, Some("java/lang/Object"));
		assert_eq!(class.interface_names()?, Vec::<&str>::new());

		let fields: Vec<_> = class.fields.iter()
			.map(|f| Ok((f.name(&class.pool)?, f.descriptor(&class.pool)?)))
			.collect::<Result<_>>()?;
		assert_eq!(fields, vec![("c", "I")]);

		let methods: Vec<_> = class.methods.iter()
			.map(|m| Ok((m.name(&class.pool)?, m.descriptor(&class.pool)?)))
			.collect::<Result<_>>()?;
		assert_eq!(methods, vec![("<init>", "()V"), ("d", "()V")]);

		let source_file = class.find_attribute(&class.attributes, "SourceFile")?;
		assert!(source_file.is_some());
		Ok(())
	}

	#[test]
	fn write_is_byte_exact() -> Result<()> {
		let class = ClassFile::from_bytes(B_CLASS)?;
		assert_eq!(class.to_bytes()?, B_CLASS);
		Ok(())
	}

	#[test]
	fn trailing_bytes_and_bad_magic_fail() {
		let mut longer = B_CLASS.to_vec();
		longer.push(0);
		assert!(ClassFile::from_bytes(&longer).is_err());

		let mut wrong = B_CLASS.to_vec();
		wrong[0] = 0;
		assert!(ClassFile::from_bytes(&wrong).is_err());
	}
}
