//! Parsers for the attributes that contain symbolic references.
//!
//! Each type here reads itself from the [`Attribute::data`] and writes itself back into a new vec. Attributes not listed
//! here either only contain indices to `Class` pool entries, or contain no names at all.

use anyhow::{anyhow, bail, Context, Result};
use crate::{ClassRead, ClassWrite};
use crate::class_file::Attribute;

pub const CODE: &str = "Code";
pub const SIGNATURE: &str = "Signature";
pub const SOURCE_FILE: &str = "SourceFile";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
pub const RECORD: &str = "Record";
pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
pub const METHOD_PARAMETERS: &str = "MethodParameters";
pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";

/// The contents of an attribute, parsed from and written back to [`Attribute::data`].
pub trait AttributeData: Sized {
	fn read_from(reader: &mut &[u8]) -> Result<Self>;
	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()>;

	fn parse(attribute: &Attribute) -> Result<Self> {
		let mut reader = attribute.data.as_slice();
		let data = Self::read_from(&mut reader)?;
		if !reader.is_empty() {
			bail!("{} bytes left over after parsing attribute", reader.len());
		}
		Ok(data)
	}

	fn to_data(&self) -> Result<Vec<u8>> {
		let mut vec = Vec::new();
		self.write_to(&mut vec)?;
		Ok(vec)
	}
}

/// An attribute that only consists of a single pool index, like `Signature` or `SourceFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleIndex(pub u16);

impl AttributeData for SingleIndex {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(SingleIndex(reader.read_u16()?))
	}
	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_u16(self.0)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
	pub start_pc: u16,
	pub end_pc: u16,
	pub handler_pc: u16,
	/// Zero for `finally` blocks.
	pub catch_type: u16,
}

/// The `Code` attribute. The bytecode itself stays untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
	pub max_stack: u16,
	pub max_locals: u16,
	pub code: Vec<u8>,
	pub exception_table: Vec<ExceptionHandler>,
	pub attributes: Vec<Attribute>,
}

impl AttributeData for Code {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		let max_stack = reader.read_u16()?;
		let max_locals = reader.read_u16()?;
		let code_length = reader.read_u32_as_usize()?;
		let code = reader.read_u8_vec(code_length)?;
		let exception_table = reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(ExceptionHandler {
				start_pc: r.read_u16()?,
				end_pc: r.read_u16()?,
				handler_pc: r.read_u16()?,
				catch_type: r.read_u16()?,
			})
		)?;
		let attributes = Attribute::read_list(reader)?;
		Ok(Code { max_stack, max_locals, code, exception_table, attributes })
	}

	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_u16(self.max_stack)?;
		writer.write_u16(self.max_locals)?;
		writer.write_usize_as_u32(self.code.len())?;
		writer.write_u8_slice(&self.code)?;
		writer.write_slice(&self.exception_table,
			|w, size| w.write_usize_as_u16(size),
			|w, handler| {
				w.write_u16(handler.start_pc)?;
				w.write_u16(handler.end_pc)?;
				w.write_u16(handler.handler_pc)?;
				w.write_u16(handler.catch_type)
			}
		)?;
		Attribute::write_list(writer, &self.attributes)
	}
}

/// An entry of the `LocalVariableTable` or `LocalVariableTypeTable` attribute. For the latter, the descriptor is a signature.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
	pub start_pc: u16,
	pub length: u16,
	pub name_index: u16,
	pub descriptor_index: u16,
	pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariableTable(pub Vec<LocalVariable>);

impl AttributeData for LocalVariableTable {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(LocalVariableTable(reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(LocalVariable {
				start_pc: r.read_u16()?,
				length: r.read_u16()?,
				name_index: r.read_u16()?,
				descriptor_index: r.read_u16()?,
				index: r.read_u16()?,
			})
		)?))
	}

	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_slice(&self.0,
			|w, size| w.write_usize_as_u16(size),
			|w, lv| {
				w.write_u16(lv.start_pc)?;
				w.write_u16(lv.length)?;
				w.write_u16(lv.name_index)?;
				w.write_u16(lv.descriptor_index)?;
				w.write_u16(lv.index)
			}
		)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClass {
	pub inner_class_info_index: u16,
	/// Zero for local and anonymous classes.
	pub outer_class_info_index: u16,
	/// Zero for anonymous classes.
	pub inner_name_index: u16,
	pub inner_class_access_flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClasses(pub Vec<InnerClass>);

impl AttributeData for InnerClasses {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(InnerClasses(reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(InnerClass {
				inner_class_info_index: r.read_u16()?,
				outer_class_info_index: r.read_u16()?,
				inner_name_index: r.read_u16()?,
				inner_class_access_flags: r.read_u16()?,
			})
		)?))
	}

	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_slice(&self.0,
			|w, size| w.write_usize_as_u16(size),
			|w, inner| {
				w.write_u16(inner.inner_class_info_index)?;
				w.write_u16(inner.outer_class_info_index)?;
				w.write_u16(inner.inner_name_index)?;
				w.write_u16(inner.inner_class_access_flags)
			}
		)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnclosingMethod {
	pub class_index: u16,
	/// A `NameAndType` index, zero if the class isn't enclosed by a method.
	pub method_index: u16,
}

impl AttributeData for EnclosingMethod {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(EnclosingMethod {
			class_index: reader.read_u16()?,
			method_index: reader.read_u16()?,
		})
	}

	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_u16(self.class_index)?;
		writer.write_u16(self.method_index)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordComponent {
	pub name_index: u16,
	pub descriptor_index: u16,
	pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record(pub Vec<RecordComponent>);

impl AttributeData for Record {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(Record(reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(RecordComponent {
				name_index: r.read_u16()?,
				descriptor_index: r.read_u16()?,
				attributes: Attribute::read_list(r)?,
			})
		)?))
	}

	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_slice(&self.0,
			|w, size| w.write_usize_as_u16(size),
			|w, component| {
				w.write_u16(component.name_index)?;
				w.write_u16(component.descriptor_index)?;
				Attribute::write_list(w, &component.attributes)
			}
		)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodParameter {
	/// Zero for parameters without a name.
	pub name_index: u16,
	pub access_flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodParameters(pub Vec<MethodParameter>);

impl AttributeData for MethodParameters {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(MethodParameters(reader.read_vec(
			|r| r.read_u8_as_usize(),
			|r| Ok(MethodParameter {
				name_index: r.read_u16()?,
				access_flags: r.read_u16()?,
			})
		)?))
	}

	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_slice(&self.0,
			|w, size| w.write_usize_as_u8(size),
			|w, parameter| {
				w.write_u16(parameter.name_index)?;
				w.write_u16(parameter.access_flags)
			}
		)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
	/// A `Utf8` index holding a field descriptor.
	pub type_index: u16,
	/// Pairs of `Utf8` index of the element name and the value.
	pub element_value_pairs: Vec<(u16, ElementValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
	/// A primitive or string constant, the tag is one of `BCDFIJSZs`.
	Const { tag: u8, const_value_index: u16 },
	Enum { type_name_index: u16, const_name_index: u16 },
	/// A `Utf8` index holding a return descriptor.
	Class { class_info_index: u16 },
	Annotation(Annotation),
	Array(Vec<ElementValue>),
}

impl Annotation {
	fn read(reader: &mut impl ClassRead) -> Result<Annotation> {
		let type_index = reader.read_u16()?;
		let element_value_pairs = reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok((r.read_u16()?, ElementValue::read(r)?))
		)?;
		Ok(Annotation { type_index, element_value_pairs })
	}

	fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		writer.write_u16(self.type_index)?;
		writer.write_slice(&self.element_value_pairs,
			|w, size| w.write_usize_as_u16(size),
			|w, (name_index, value)| {
				w.write_u16(*name_index)?;
				value.write(w)
			}
		)
	}
}

impl ElementValue {
	fn read(reader: &mut impl ClassRead) -> Result<ElementValue> {
		let tag = reader.read_u8()?;
		Ok(match tag {
			b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => ElementValue::Const {
				tag,
				const_value_index: reader.read_u16()?,
			},
			b'e' => ElementValue::Enum {
				type_name_index: reader.read_u16()?,
				const_name_index: reader.read_u16()?,
			},
			b'c' => ElementValue::Class { class_info_index: reader.read_u16()? },
			b'@' => ElementValue::Annotation(Annotation::read(reader)?),
			b'[' => ElementValue::Array(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| ElementValue::read(r)
			)?),
			tag => bail!("unknown element value tag {:?}", tag as char),
		})
	}

	fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		match self {
			&ElementValue::Const { tag, const_value_index } => {
				writer.write_u8(tag)?;
				writer.write_u16(const_value_index)
			},
			&ElementValue::Enum { type_name_index, const_name_index } => {
				writer.write_u8(b'e')?;
				writer.write_u16(type_name_index)?;
				writer.write_u16(const_name_index)
			},
			&ElementValue::Class { class_info_index } => {
				writer.write_u8(b'c')?;
				writer.write_u16(class_info_index)
			},
			ElementValue::Annotation(annotation) => {
				writer.write_u8(b'@')?;
				annotation.write(writer)
			},
			ElementValue::Array(values) => {
				writer.write_u8(b'[')?;
				writer.write_slice(values,
					|w, size| w.write_usize_as_u16(size),
					|w, value| value.write(w)
				)
			},
		}
	}
}

impl AttributeData for ElementValue {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		ElementValue::read(reader)
	}
	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		self.write(writer)
	}
}

/// The `Runtime(In)VisibleAnnotations` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotations(pub Vec<Annotation>);

impl AttributeData for Annotations {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(Annotations(reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Annotation::read(r)
		)?))
	}
	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_slice(&self.0,
			|w, size| w.write_usize_as_u16(size),
			|w, annotation| annotation.write(w)
		)
	}
}

/// The `Runtime(In)VisibleParameterAnnotations` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterAnnotations(pub Vec<Vec<Annotation>>);

impl AttributeData for ParameterAnnotations {
	fn read_from(reader: &mut &[u8]) -> Result<Self> {
		Ok(ParameterAnnotations(reader.read_vec(
			|r| r.read_u8_as_usize(),
			|r| r.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Annotation::read(r)
			)
		)?))
	}
	fn write_to(&self, writer: &mut Vec<u8>) -> Result<()> {
		writer.write_slice(&self.0,
			|w, size| w.write_usize_as_u8(size),
			|w, annotations| w.write_slice(annotations,
				|w, size| w.write_usize_as_u16(size),
				|w, annotation| annotation.write(w)
			)
		)
	}
}

/// Parses the attribute, applies `f` and writes the result back if `f` returned `true`.
pub fn modify<T: AttributeData>(attribute: &mut Attribute, f: impl FnOnce(&mut T) -> Result<bool>) -> Result<()> {
	let mut data = T::parse(attribute)?;
	if f(&mut data)? {
		attribute.data = data.to_data()
			.with_context(|| anyhow!("failed to write back attribute with name index {}", attribute.name_index))?;
	}
	Ok(())
}
