//! Remapping a single class file, at the level of its constant pool.
//!
//! Constants are never changed if something else might share them: `Utf8` and `NameAndType` entries stay as they are, and
//! renamed ones are added (or found, if an equal one exists already). Only `Class`, member reference and `MethodType` entries
//! are changed in place, as these are only ever used for one thing. A remapper that doesn't rename anything leaves the
//! constant pool as it is.

use anyhow::{anyhow, bail, Context, Result};
use duke::attribute::{self, Annotation, Annotations, AttributeData, Code, ElementValue, EnclosingMethod, InnerClasses, LocalVariable, LocalVariableTable, MethodParameters, ParameterAnnotations, Record, SingleIndex};
use duke::{access, Attribute, ClassFile, Member, Pool, PoolEntry};
use quill::remapper::MemberRemapper;
use quill::tree::mappings::LocalKey;
use crate::remap::RemapOptions;

/// A class after remapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RemappedClass {
	pub old_name: String,
	pub new_name: String,
	/// The bytes of the new class file.
	pub data: Vec<u8>,
}

/// Remaps the class file given as bytes.
pub fn remap_class<R: MemberRemapper>(bytes: &[u8], remapper: &R, options: &RemapOptions) -> Result<RemappedClass> {
	let mut class = duke::read_class(bytes)?;
	let old_name = class.name()?.to_owned();

	let mut rewriter = ClassRewriter {
		remapper,
		options,
		old: class.pool.clone(),
		pool: std::mem::take(&mut class.pool),
		owner: old_name.clone(),
	};
	rewriter.rewrite(&mut class)
		.with_context(|| anyhow!("failed to remap class {old_name:?}"))?;
	class.pool = rewriter.pool;

	let new_name = class.name()?.to_owned();
	let data = class.to_bytes()?;

	Ok(RemappedClass { old_name, new_name, data })
}

/// The parameters of a method, as local variable slots.
struct MethodContext {
	name: String,
	desc: String,
	/// The slot of each parameter, as declared in the descriptor.
	params: Vec<u16>,
	/// The first slot not taken by `this` or a parameter.
	first_local: u16,
}

impl MethodContext {
	fn new(name: String, desc: String, is_static: bool) -> Result<MethodContext> {
		let args = desc.strip_prefix('(')
			.and_then(|desc| desc.split_once(')'))
			.map(|(args, _)| args)
			.with_context(|| anyhow!("invalid method descriptor {desc:?}"))?;

		let mut params = Vec::new();
		let mut slot = if is_static { 0 } else { 1 };
		let mut chars = args.chars();
		while let Some(ch) = chars.next() {
			params.push(slot);
			let mut ch = ch;
			let mut array = false;
			while ch == '[' {
				array = true;
				ch = chars.next().with_context(|| anyhow!("array without element type in descriptor {desc:?}"))?;
			}
			match ch {
				'L' => {
					chars.by_ref().find(|&ch| ch == ';')
						.with_context(|| anyhow!("unterminated class type in descriptor {desc:?}"))?;
				},
				'B' | 'C' | 'F' | 'I' | 'S' | 'Z' | 'J' | 'D' => {},
				ch => bail!("unknown type {ch:?} in descriptor {desc:?}"),
			}
			slot += if !array && (ch == 'J' || ch == 'D') { 2 } else { 1 };
		}

		Ok(MethodContext { name, desc, params, first_local: slot })
	}
}

struct ClassRewriter<'r, R> {
	remapper: &'r R,
	options: &'r RemapOptions,
	/// The pool as it was read, all names are looked up in here.
	old: Pool,
	/// The pool that's written.
	pool: Pool,
	/// The old name of the class.
	owner: String,
}

impl<R: MemberRemapper> ClassRewriter<'_, R> {
	fn rewrite(&mut self, class: &mut ClassFile) -> Result<()> {
		self.constants()?;

		for field in &mut class.fields {
			self.field(field)?;
		}
		for method in &mut class.methods {
			self.method(method)?;
		}

		let new_name = self.remapper.map_class(&self.owner)?;
		for attribute in &mut class.attributes {
			let name = attribute.name(&self.old)?.to_owned();
			match name.as_str() {
				attribute::SIGNATURE => self.signature(attribute)?,
				attribute::SOURCE_FILE => if self.options.rebuild_source_file_names && new_name != self.owner {
					attribute::modify(attribute, |data: &mut SingleIndex| self.source_file(data, &new_name))?;
				},
				attribute::INNER_CLASSES => attribute::modify(attribute, |data: &mut InnerClasses| self.inner_classes(data))?,
				attribute::ENCLOSING_METHOD => attribute::modify(attribute, |data: &mut EnclosingMethod| self.enclosing_method(data))?,
				attribute::RECORD => attribute::modify(attribute, |data: &mut Record| self.record(data))?,
				_ => self.annotations(&name, attribute)?,
			}
		}

		Ok(())
	}

	/// Adds the string to the pool, unless it's equal to the string at `index` in the old pool.
	fn utf8(&mut self, index: u16, new: &str) -> Result<u16> {
		if self.old.get_utf8(index)? == new {
			Ok(index)
		} else {
			self.pool.put_utf8(new)
		}
	}

	/// Remaps the descriptor at the given `Utf8` index, returning `true` if it changed.
	fn desc(&mut self, index: &mut u16) -> Result<bool> {
		let new = self.remapper.map_desc(self.old.get_utf8(*index)?)?;
		self.set_utf8(index, &new)
	}

	fn set_utf8(&mut self, index: &mut u16, new: &str) -> Result<bool> {
		let new_index = self.utf8(*index, new)?;
		let changed = new_index != *index;
		*index = new_index;
		Ok(changed)
	}

	fn constants(&mut self) -> Result<()> {
		let entries: Vec<(u16, PoolEntry)> = self.old.entries()
			.map(|(index, entry)| (index, entry.clone()))
			.collect();

		for (index, entry) in entries {
			match entry {
				PoolEntry::Class { name_index } => {
					let name = self.old.get_utf8(name_index)?;
					let new = self.remapper.map_class_any(name)?;
					if new != name {
						let name_index = self.pool.put_utf8(&new)?;
						*self.pool.get_mut(index)? = PoolEntry::Class { name_index };
					}
				},
				PoolEntry::FieldRef { .. } | PoolEntry::MethodRef { .. } | PoolEntry::InterfaceMethodRef { .. } => {
					let member = self.old.get_member_ref(index)?;
					let new_name = if member.kind == duke::pool::MemberRefKind::Field {
						self.remapper.map_field(member.class, member.name, member.desc)?
					} else {
						self.remapper.map_method(member.class, member.name, member.desc)?
					};
					let new_desc = self.remapper.map_desc(member.desc)?;
					if new_name != member.name || new_desc != member.desc {
						let new_name_and_type = self.pool.put_name_and_type(&new_name, &new_desc)?;
						match self.pool.get_mut(index)? {
							PoolEntry::FieldRef { name_and_type_index, .. }
							| PoolEntry::MethodRef { name_and_type_index, .. }
							| PoolEntry::InterfaceMethodRef { name_and_type_index, .. } => *name_and_type_index = new_name_and_type,
							entry => bail!("pool entry at index {index} changed its kind to {entry:?}"),
						}
					}
				},
				PoolEntry::InvokeDynamic { name_and_type_index, .. } | PoolEntry::Dynamic { name_and_type_index, .. } => {
					let (name, desc) = self.old.get_name_and_type(name_and_type_index)?;
					let new_desc = self.remapper.map_desc(desc)?;
					if new_desc != desc {
						let new_name_and_type = self.pool.put_name_and_type(name, &new_desc)?;
						match self.pool.get_mut(index)? {
							PoolEntry::InvokeDynamic { name_and_type_index, .. }
							| PoolEntry::Dynamic { name_and_type_index, .. } => *name_and_type_index = new_name_and_type,
							entry => bail!("pool entry at index {index} changed its kind to {entry:?}"),
						}
					}
				},
				PoolEntry::MethodType { descriptor_index } => {
					let desc = self.old.get_utf8(descriptor_index)?;
					let new = self.remapper.map_desc(desc)?;
					if new != desc {
						let descriptor_index = self.pool.put_utf8(&new)?;
						*self.pool.get_mut(index)? = PoolEntry::MethodType { descriptor_index };
					}
				},
				_ => {},
			}
		}

		Ok(())
	}

	fn field(&mut self, field: &mut Member) -> Result<()> {
		let name = field.name(&self.old)?;
		let desc = field.descriptor(&self.old)?;
		let new_name = self.remapper.map_field(&self.owner, name, desc)?;

		self.set_utf8(&mut field.name_index, &new_name)?;
		self.desc(&mut field.descriptor_index)?;

		for attribute in &mut field.attributes {
			let name = attribute.name(&self.old)?.to_owned();
			match name.as_str() {
				attribute::SIGNATURE => self.signature(attribute)?,
				_ => self.annotations(&name, attribute)?,
			}
		}
		Ok(())
	}

	fn method(&mut self, method: &mut Member) -> Result<()> {
		let name = method.name(&self.old)?.to_owned();
		let desc = method.descriptor(&self.old)?.to_owned();
		let new_name = self.remapper.map_method(&self.owner, &name, &desc)?;

		self.set_utf8(&mut method.name_index, &new_name)?;
		self.desc(&mut method.descriptor_index)?;

		let context = MethodContext::new(name, desc, method.access & access::STATIC != 0)?;

		for attribute in &mut method.attributes {
			self.method_attribute(&context, attribute)
				.with_context(|| anyhow!("in method {:?}{:?}", context.name, context.desc))?;
		}
		Ok(())
	}

	fn method_attribute(&mut self, context: &MethodContext, attribute: &mut Attribute) -> Result<()> {
		let name = attribute.name(&self.old)?.to_owned();
		match name.as_str() {
			attribute::SIGNATURE => self.signature(attribute),
			attribute::CODE => attribute::modify(attribute, |code: &mut Code| self.code(context, code)),
			attribute::METHOD_PARAMETERS if self.options.remap_locals => {
				attribute::modify(attribute, |data: &mut MethodParameters| self.method_parameters(context, data))
			},
			attribute::ANNOTATION_DEFAULT => attribute::modify(attribute, |value: &mut ElementValue| self.element_value(value)),
			_ => self.annotations(&name, attribute),
		}
	}

	fn signature(&mut self, attribute: &mut Attribute) -> Result<()> {
		attribute::modify(attribute, |SingleIndex(index): &mut SingleIndex| {
			let new = self.remapper.map_signature(self.old.get_utf8(*index)?)?;
			self.set_utf8(index, &new)
		})
	}

	/// Handles the annotation attributes, leaving any other attribute as it is.
	fn annotations(&mut self, name: &str, attribute: &mut Attribute) -> Result<()> {
		match name {
			attribute::RUNTIME_VISIBLE_ANNOTATIONS | attribute::RUNTIME_INVISIBLE_ANNOTATIONS => {
				attribute::modify(attribute, |Annotations(annotations): &mut Annotations| {
					let mut changed = false;
					for annotation in annotations {
						changed |= self.annotation(annotation)?;
					}
					Ok(changed)
				})
			},
			attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS | attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
				attribute::modify(attribute, |ParameterAnnotations(parameters): &mut ParameterAnnotations| {
					let mut changed = false;
					for annotation in parameters.iter_mut().flatten() {
						changed |= self.annotation(annotation)?;
					}
					Ok(changed)
				})
			},
			_ => Ok(()),
		}
	}

	fn annotation(&mut self, annotation: &mut Annotation) -> Result<bool> {
		let mut changed = self.desc(&mut annotation.type_index)?;
		for (_, value) in &mut annotation.element_value_pairs {
			changed |= self.element_value(value)?;
		}
		Ok(changed)
	}

	fn element_value(&mut self, value: &mut ElementValue) -> Result<bool> {
		match value {
			ElementValue::Const { .. } => Ok(false),
			ElementValue::Enum { type_name_index, .. } => self.desc(type_name_index),
			ElementValue::Class { class_info_index } => self.desc(class_info_index),
			ElementValue::Annotation(annotation) => self.annotation(annotation),
			ElementValue::Array(values) => {
				let mut changed = false;
				for value in values {
					changed |= self.element_value(value)?;
				}
				Ok(changed)
			},
		}
	}

	fn code(&mut self, context: &MethodContext, code: &mut Code) -> Result<bool> {
		// rows of the local variable table, to give the type table entries the same names
		let mut rows = Vec::new();
		for attribute in &code.attributes {
			if attribute.name(&self.old)? == attribute::LOCAL_VARIABLE_TABLE {
				rows.extend(LocalVariableTable::parse(attribute)?.0.into_iter().map(|lv| (lv.index, lv.start_pc)));
			}
		}

		let mut changed = false;
		for attribute in &mut code.attributes {
			let name = attribute.name(&self.old)?.to_owned();
			let is_type_table = match name.as_str() {
				attribute::LOCAL_VARIABLE_TABLE => false,
				attribute::LOCAL_VARIABLE_TYPE_TABLE => true,
				_ => continue,
			};

			let before = attribute.data.clone();
			attribute::modify(attribute, |LocalVariableTable(table): &mut LocalVariableTable| {
				let mut changed = false;
				for lv in table.iter_mut() {
					let row = rows.iter().position(|&(index, start_pc)| index == lv.index && start_pc == lv.start_pc);
					changed |= self.local_variable(context, lv, row, is_type_table)?;
				}
				Ok(changed)
			})?;
			changed |= attribute.data != before;
		}
		Ok(changed)
	}

	fn local_variable(&mut self, context: &MethodContext, lv: &mut LocalVariable, row: Option<usize>, is_type_table: bool) -> Result<bool> {
		let mut changed = if is_type_table {
			let new = self.remapper.map_signature(self.old.get_utf8(lv.descriptor_index)?)?;
			self.set_utf8(&mut lv.descriptor_index, &new)?
		} else {
			self.desc(&mut lv.descriptor_index)?
		};

		if self.options.remap_locals {
			let new_name = if lv.index < context.first_local && lv.start_pc == 0 {
				self.remapper.map_param_fail(&self.owner, &context.name, &context.desc, lv.index)?
			} else {
				let key = LocalKey {
					lv_index: lv.index,
					start_offset: u32::from(lv.start_pc),
					lvt_row: row.map(u32::try_from).transpose()?,
				};
				self.remapper.map_local_fail(&self.owner, &context.name, &context.desc, key)?
			};
			if let Some(new_name) = new_name {
				changed |= self.set_utf8(&mut lv.name_index, &new_name)?;
			}
		}
		Ok(changed)
	}

	fn method_parameters(&mut self, context: &MethodContext, MethodParameters(parameters): &mut MethodParameters) -> Result<bool> {
		let mut changed = false;
		for (parameter, &slot) in parameters.iter_mut().zip(&context.params) {
			if let Some(new_name) = self.remapper.map_param_fail(&self.owner, &context.name, &context.desc, slot)? {
				if parameter.name_index == 0 {
					parameter.name_index = self.pool.put_utf8(&new_name)?;
					changed = true;
				} else {
					changed |= self.set_utf8(&mut parameter.name_index, &new_name)?;
				}
			}
		}
		Ok(changed)
	}

	fn source_file(&mut self, SingleIndex(index): &mut SingleIndex, new_name: &str) -> Result<bool> {
		let old = self.old.get_utf8(*index)?;
		let extension = old.rsplit_once('.').map_or("java", |(_, extension)| extension);

		let simple = new_name.rsplit_once('/').map_or(new_name, |(_, simple)| simple);
		let outer = simple.split('$').next().unwrap_or(simple);

		let new = format!("{outer}.{extension}");
		self.set_utf8(index, &new)
	}

	fn inner_classes(&mut self, InnerClasses(classes): &mut InnerClasses) -> Result<bool> {
		let mut changed = false;
		for inner in classes {
			// anonymous classes have no name
			if inner.inner_name_index == 0 {
				continue;
			}
			let old_inner = self.old.get_class(inner.inner_class_info_index)?;
			let new_inner = self.remapper.map_class(old_inner)?;
			if new_inner == old_inner {
				continue;
			}

			let from_outer = if inner.outer_class_info_index != 0 {
				let new_outer = self.remapper.map_class(self.old.get_class(inner.outer_class_info_index)?)?;
				new_inner.strip_prefix(new_outer.as_str())
					.and_then(|rest| rest.strip_prefix('$'))
					.map(str::to_owned)
			} else {
				None
			};
			let simple = from_outer.unwrap_or_else(|| simple_name(&new_inner));

			changed |= self.set_utf8(&mut inner.inner_name_index, &simple)?;
		}
		Ok(changed)
	}

	fn enclosing_method(&mut self, data: &mut EnclosingMethod) -> Result<bool> {
		if data.method_index == 0 {
			return Ok(false);
		}
		let owner = self.old.get_class(data.class_index)?;
		let (name, desc) = self.old.get_name_and_type(data.method_index)?;

		let new_name = self.remapper.map_method(owner, name, desc)?;
		let new_desc = self.remapper.map_desc(desc)?;
		if new_name == name && new_desc == desc {
			return Ok(false);
		}
		data.method_index = self.pool.put_name_and_type(&new_name, &new_desc)?;
		Ok(true)
	}

	fn record(&mut self, Record(components): &mut Record) -> Result<bool> {
		let mut changed = false;
		for component in components {
			let name = self.old.get_utf8(component.name_index)?;
			let desc = self.old.get_utf8(component.descriptor_index)?;
			let new_name = self.remapper.map_field(&self.owner, name, desc)?;

			changed |= self.set_utf8(&mut component.name_index, &new_name)?;
			changed |= self.desc(&mut component.descriptor_index)?;

			for attribute in &mut component.attributes {
				let before = attribute.data.clone();
				let name = attribute.name(&self.old)?.to_owned();
				match name.as_str() {
					attribute::SIGNATURE => self.signature(attribute)?,
					_ => self.annotations(&name, attribute)?,
				}
				changed |= attribute.data != before;
			}
		}
		Ok(changed)
	}
}

/// The simple name of a class, as written in the source: `a/b/C$1D` becomes `D`.
fn simple_name(class: &str) -> String {
	let name = class.rsplit_once('/').map_or(class, |(_, name)| name);
	let name = name.rsplit_once('$').map_or(name, |(_, name)| name);
	let without_digits = name.trim_start_matches(|ch: char| ch.is_ascii_digit());
	let simple = if without_digits.is_empty() { name } else { without_digits };
	simple.to_owned()
}
