//! Building class files from scratch, mainly for generating test inputs.

use anyhow::{anyhow, Context, Result};
use crate::attribute::{self, AttributeData, Code, LocalVariable, LocalVariableTable};
use crate::class_file::{Attribute, ClassFile, Member};
use crate::pool::Pool;

/// Builds a [`ClassFile`] with version 52 (Java 8).
///
/// ```
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// use duke::access;
/// use duke::builder::ClassBuilder;
///
/// let mut builder = ClassBuilder::new(access::PUBLIC | access::SUPER, "a/B", Some("java/lang/Object"))?;
/// builder.add_field(access::PRIVATE, "c", "I", Vec::new())?;
/// let class = builder.build();
/// assert_eq!(class.name()?, "a/B");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClassBuilder {
	class: ClassFile,
}

/// A local variable spanning the whole method body.
#[derive(Debug, Clone, Copy)]
pub struct Local<'a> {
	pub name: &'a str,
	pub desc: &'a str,
	pub index: u16,
}

impl ClassBuilder {
	pub fn new(access: u16, name: &str, super_name: Option<&str>) -> Result<ClassBuilder> {
		let mut pool = Pool::new();
		let this_class = pool.put_class(name)?;
		let super_class = match super_name {
			Some(super_name) => pool.put_class(super_name)?,
			None => 0,
		};
		Ok(ClassBuilder {
			class: ClassFile {
				minor_version: 0,
				major_version: 52,
				pool,
				access,
				this_class,
				super_class,
				interfaces: Vec::new(),
				fields: Vec::new(),
				methods: Vec::new(),
				attributes: Vec::new(),
			},
		})
	}

	/// Gives access to the constant pool, for creating the entries the bytecode references.
	pub fn pool(&mut self) -> &mut Pool {
		&mut self.class.pool
	}

	pub fn add_interface(&mut self, name: &str) -> Result<()> {
		let index = self.class.pool.put_class(name)?;
		self.class.interfaces.push(index);
		Ok(())
	}

	pub fn add_field(&mut self, access: u16, name: &str, desc: &str, attributes: Vec<Attribute>) -> Result<()> {
		let member = self.member(access, name, desc, attributes)?;
		self.class.fields.push(member);
		Ok(())
	}

	pub fn add_method(&mut self, access: u16, name: &str, desc: &str, attributes: Vec<Attribute>) -> Result<()> {
		let member = self.member(access, name, desc, attributes)?;
		self.class.methods.push(member);
		Ok(())
	}

	fn member(&mut self, access: u16, name: &str, desc: &str, attributes: Vec<Attribute>) -> Result<Member> {
		Ok(Member {
			access,
			name_index: self.class.pool.put_utf8(name)?,
			descriptor_index: self.class.pool.put_utf8(desc)?,
			attributes,
		})
	}

	pub fn add_attribute(&mut self, attribute: Attribute) {
		self.class.attributes.push(attribute);
	}

	/// Creates an attribute with the given name, for use with [`ClassBuilder::add_attribute`] or for a member.
	pub fn attribute<T: AttributeData>(&mut self, name: &str, data: &T) -> Result<Attribute> {
		Ok(Attribute {
			name_index: self.class.pool.put_utf8(name)?,
			data: data.to_data().with_context(|| anyhow!("failed to write attribute {name:?}"))?,
		})
	}

	/// Creates a `Code` attribute, with a `LocalVariableTable` if `locals` isn't empty.
	pub fn code(&mut self, code: Vec<u8>, max_stack: u16, locals: &[Local]) -> Result<Attribute> {
		let length = u16::try_from(code.len())
			.with_context(|| anyhow!("code of length {} too long", code.len()))?;

		let mut table = Vec::new();
		for local in locals {
			table.push(LocalVariable {
				start_pc: 0,
				length,
				name_index: self.class.pool.put_utf8(local.name)?,
				descriptor_index: self.class.pool.put_utf8(local.desc)?,
				index: local.index,
			});
		}

		let max_locals = locals.iter().map(|local| local.index + 1).max().unwrap_or(0);

		let attributes = if table.is_empty() {
			Vec::new()
		} else {
			vec![self.attribute(attribute::LOCAL_VARIABLE_TABLE, &LocalVariableTable(table))?]
		};

		let code = Code {
			max_stack,
			max_locals,
			code,
			exception_table: Vec::new(),
			attributes,
		};
		self.attribute(attribute::CODE, &code)
	}

	pub fn build(self) -> ClassFile {
		self.class
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::access;
	use crate::attribute::{self, AttributeData, Code, LocalVariableTable};
	use crate::builder::{ClassBuilder, Local};
	use crate::class_file::ClassFile;

	#[test]
	fn built_class_reads_back() -> Result<()> {
		let mut builder = ClassBuilder::new(access::PUBLIC, "a/B", Some("java/lang/Object"))?;
		builder.add_interface("java/lang/Runnable")?;
		builder.add_field(access::PRIVATE, "c", "I", Vec::new())?;
		let code = builder.code(vec![0xb1], 0, &[Local { name: "this", desc: "La/B;", index: 0 }])?;
		builder.add_method(access::PUBLIC, "run", "()V", vec![code])?;
		let class = builder.build();

		let read = ClassFile::from_bytes(&class.to_bytes()?)?;
		assert_eq!(read, class);
		assert_eq!(read.interface_names()?, vec!["java/lang/Runnable"]);

		let method = &read.methods[0];
		let code = read.find_attribute(&method.attributes, attribute::CODE)?.map(Code::parse).transpose()?;
		let code = code.ok_or_else(|| anyhow::anyhow!("no code"))?;
		assert_eq!(code.max_locals, 1);
		let lvt = LocalVariableTable::parse(&code.attributes[0])?;
		assert_eq!(read.pool.get_utf8(lvt.0[0].name_index)?, "this");
		Ok(())
	}
}
