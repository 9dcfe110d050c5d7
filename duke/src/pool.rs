use std::fmt::{Debug, Formatter};
use anyhow::{anyhow, bail, Context, Result};
use crate::{ClassRead, ClassWrite, jstring};

mod tag {
	pub(super) const UTF8: u8 = 1;
	pub(super) const INTEGER: u8 = 3;
	pub(super) const FLOAT: u8 = 4;
	pub(super) const LONG: u8 = 5;
	pub(super) const DOUBLE: u8 = 6;
	pub(super) const CLASS: u8 = 7;
	pub(super) const STRING: u8 = 8;
	pub(super) const FIELD_REF: u8 = 9;
	pub(super) const METHOD_REF: u8 = 10;
	pub(super) const INTERFACE_METHOD_REF: u8 = 11;
	pub(super) const NAME_AND_TYPE: u8 = 12;
	pub(super) const METHOD_HANDLE: u8 = 15;
	pub(super) const METHOD_TYPE: u8 = 16;
	pub(super) const DYNAMIC: u8 = 17;
	pub(super) const INVOKE_DYNAMIC: u8 = 18;
	pub(super) const MODULE: u8 = 19;
	pub(super) const PACKAGE: u8 = 20;
}

/// An entry of the constant pool, with all indices left unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolEntry {
	Class { name_index: u16 },
	FieldRef { class_index: u16, name_and_type_index: u16 },
	MethodRef { class_index: u16, name_and_type_index: u16 },
	InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
	String { string_index: u16 },
	Integer { bytes: u32 },
	Float { bytes: u32 },
	Long { bytes: u64 },
	Double { bytes: u64 },
	NameAndType { name_index: u16, descriptor_index: u16 },
	Utf8 { string: String },
	MethodHandle { reference_kind: u8, reference_index: u16 },
	MethodType { descriptor_index: u16 },
	Dynamic { bootstrap_method_attribute_index: u16, name_and_type_index: u16 },
	InvokeDynamic { bootstrap_method_attribute_index: u16, name_and_type_index: u16 },
	Module { name_index: u16 },
	Package { name_index: u16 },
}

impl PoolEntry {
	/// Long and double entries take up two slots of the pool.
	fn is_wide(&self) -> bool {
		matches!(self, PoolEntry::Long { .. } | PoolEntry::Double { .. })
	}

	fn read(reader: &mut impl ClassRead, index: usize) -> Result<PoolEntry> {
		Ok(match reader.read_u8()? {
			tag::UTF8 => {
				let length = reader.read_u16_as_usize()?;
				let vec = reader.read_u8_vec(length)?;
				let string = jstring::decode(vec)
					.with_context(|| anyhow!("failed to decode `Utf8` pool entry at index {index}"))?;
				PoolEntry::Utf8 { string }
			},
			tag::INTEGER => PoolEntry::Integer { bytes: reader.read_u32()? },
			tag::FLOAT => PoolEntry::Float { bytes: reader.read_u32()? },
			tag::LONG => PoolEntry::Long { bytes: reader.read_u64()? },
			tag::DOUBLE => PoolEntry::Double { bytes: reader.read_u64()? },
			tag::CLASS => PoolEntry::Class { name_index: reader.read_u16()? },
			tag::STRING => PoolEntry::String { string_index: reader.read_u16()? },
			tag::FIELD_REF => PoolEntry::FieldRef {
				class_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			tag::METHOD_REF => PoolEntry::MethodRef {
				class_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			tag::INTERFACE_METHOD_REF => PoolEntry::InterfaceMethodRef {
				class_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			tag::NAME_AND_TYPE => PoolEntry::NameAndType {
				name_index: reader.read_u16()?,
				descriptor_index: reader.read_u16()?,
			},
			tag::METHOD_HANDLE => PoolEntry::MethodHandle {
				reference_kind: reader.read_u8()?,
				reference_index: reader.read_u16()?,
			},
			tag::METHOD_TYPE => PoolEntry::MethodType { descriptor_index: reader.read_u16()? },
			tag::DYNAMIC => PoolEntry::Dynamic {
				bootstrap_method_attribute_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			tag::INVOKE_DYNAMIC => PoolEntry::InvokeDynamic {
				bootstrap_method_attribute_index: reader.read_u16()?,
				name_and_type_index: reader.read_u16()?,
			},
			tag::MODULE => PoolEntry::Module { name_index: reader.read_u16()? },
			tag::PACKAGE => PoolEntry::Package { name_index: reader.read_u16()? },
			tag => bail!("unknown constant pool tag {tag} at pool index {index}"),
		})
	}

	fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		match self {
			PoolEntry::Utf8 { string } => {
				writer.write_u8(tag::UTF8)?;
				let bytes = jstring::encode(string);
				writer.write_usize_as_u16(bytes.len())?;
				writer.write_u8_slice(&bytes)?;
			},
			&PoolEntry::Integer { bytes } => {
				writer.write_u8(tag::INTEGER)?;
				writer.write_u32(bytes)?;
			},
			&PoolEntry::Float { bytes } => {
				writer.write_u8(tag::FLOAT)?;
				writer.write_u32(bytes)?;
			},
			&PoolEntry::Long { bytes } => {
				writer.write_u8(tag::LONG)?;
				writer.write_u64(bytes)?;
			},
			&PoolEntry::Double { bytes } => {
				writer.write_u8(tag::DOUBLE)?;
				writer.write_u64(bytes)?;
			},
			&PoolEntry::Class { name_index } => {
				writer.write_u8(tag::CLASS)?;
				writer.write_u16(name_index)?;
			},
			&PoolEntry::String { string_index } => {
				writer.write_u8(tag::STRING)?;
				writer.write_u16(string_index)?;
			},
			&PoolEntry::FieldRef { class_index, name_and_type_index } => {
				writer.write_u8(tag::FIELD_REF)?;
				writer.write_u16(class_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			&PoolEntry::MethodRef { class_index, name_and_type_index } => {
				writer.write_u8(tag::METHOD_REF)?;
				writer.write_u16(class_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			&PoolEntry::InterfaceMethodRef { class_index, name_and_type_index } => {
				writer.write_u8(tag::INTERFACE_METHOD_REF)?;
				writer.write_u16(class_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			&PoolEntry::NameAndType { name_index, descriptor_index } => {
				writer.write_u8(tag::NAME_AND_TYPE)?;
				writer.write_u16(name_index)?;
				writer.write_u16(descriptor_index)?;
			},
			&PoolEntry::MethodHandle { reference_kind, reference_index } => {
				writer.write_u8(tag::METHOD_HANDLE)?;
				writer.write_u8(reference_kind)?;
				writer.write_u16(reference_index)?;
			},
			&PoolEntry::MethodType { descriptor_index } => {
				writer.write_u8(tag::METHOD_TYPE)?;
				writer.write_u16(descriptor_index)?;
			},
			&PoolEntry::Dynamic { bootstrap_method_attribute_index, name_and_type_index } => {
				writer.write_u8(tag::DYNAMIC)?;
				writer.write_u16(bootstrap_method_attribute_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			&PoolEntry::InvokeDynamic { bootstrap_method_attribute_index, name_and_type_index } => {
				writer.write_u8(tag::INVOKE_DYNAMIC)?;
				writer.write_u16(bootstrap_method_attribute_index)?;
				writer.write_u16(name_and_type_index)?;
			},
			&PoolEntry::Module { name_index } => {
				writer.write_u8(tag::MODULE)?;
				writer.write_u16(name_index)?;
			},
			&PoolEntry::Package { name_index } => {
				writer.write_u8(tag::PACKAGE)?;
				writer.write_u16(name_index)?;
			},
		}
		Ok(())
	}
}

/// The kind of a resolved member reference, see [`Pool::get_member_ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRefKind {
	Field,
	Method,
	InterfaceMethod,
}

/// A `FieldRef`, `MethodRef` or `InterfaceMethodRef` with all its strings looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
	pub kind: MemberRefKind,
	pub class: &'a str,
	pub name: &'a str,
	pub desc: &'a str,
}

/// The constant pool of a class file.
///
/// Indices are the ones used in the class file: index `0` is never valid and long and double entries take up two indices.
#[derive(Clone, PartialEq, Eq)]
pub struct Pool {
	/// We store a [`None`] for the zero index, as well as for the upper indices of [`PoolEntry::Double`] and [`PoolEntry::Long`].
	inner: Vec<Option<PoolEntry>>,
}

impl Default for Pool {
	fn default() -> Self {
		Pool::new()
	}
}

impl Debug for Pool {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_map()
			.entries(self.entries())
			.finish()
	}
}

impl Pool {
	pub fn new() -> Pool {
		Pool { inner: vec![None] }
	}

	/// Reads the constant pool from the specified reader. The first thing read is an `u16` specifying the size of the constant pool.
	pub(crate) fn read(reader: &mut impl ClassRead) -> Result<Pool> {
		let mut pool = vec![None];

		let constant_pool_count = reader.read_u16_as_usize()?;
		while pool.len() < constant_pool_count {
			let entry = PoolEntry::read(reader, pool.len())?;
			let wide = entry.is_wide();
			pool.push(Some(entry));
			if wide {
				pool.push(None);
			}
		}

		if pool.len() != constant_pool_count {
			bail!("last pool entry is a long or double, reaching beyond the constant pool count of {constant_pool_count}");
		}

		Ok(Pool { inner: pool })
	}

	pub(crate) fn write(&self, writer: &mut impl ClassWrite) -> Result<()> {
		writer.write_usize_as_u16(self.inner.len())
			.context("too many constant pool entries")?;
		for entry in self.inner.iter().flatten() {
			entry.write(writer)?;
		}
		Ok(())
	}

	/// The `constant_pool_count` of the class file: one more than the largest valid index.
	pub fn count(&self) -> usize {
		self.inner.len()
	}

	/// Iterates over all entries together with their index.
	pub fn entries(&self) -> impl Iterator<Item=(u16, &PoolEntry)> {
		self.inner.iter()
			.enumerate()
			.filter_map(|(index, entry)| Some((index as u16, entry.as_ref()?)))
	}

	pub fn get(&self, index: u16) -> Result<&PoolEntry> {
		if let Some(Some(entry)) = self.inner.get(index as usize) {
			Ok(entry)
		} else {
			bail!("pool entry at index {index:?} is not there: either index too large, zero, or the upper half of long or double");
		}
	}

	pub fn get_mut(&mut self, index: u16) -> Result<&mut PoolEntry> {
		if let Some(Some(entry)) = self.inner.get_mut(index as usize) {
			Ok(entry)
		} else {
			bail!("pool entry at index {index:?} is not there: either index too large, zero, or the upper half of long or double");
		}
	}

	/// Returns [`None`] if `index` is zero, otherwise returns [`Some`] of the result of the function `f`.
	pub fn get_optional<'a, T: 'a>(&'a self, index: u16, f: impl Fn(&'a Pool, u16) -> Result<T>) -> Result<Option<T>> {
		if index == 0 {
			Ok(None)
		} else {
			Ok(Some(f(self, index)?))
		}
	}

	pub fn get_utf8(&self, index: u16) -> Result<&str> {
		let PoolEntry::Utf8 { string } = self.get(index)? else {
			bail!("pool entry at index {index} not `Utf8`: {:?}", self.get(index)?);
		};
		Ok(string)
	}

	pub fn get_class(&self, index: u16) -> Result<&str> {
		let &PoolEntry::Class { name_index } = self.get(index)? else {
			bail!("pool entry at index {index} not `Class`: {:?}", self.get(index)?);
		};
		self.get_utf8(name_index)
			.with_context(|| anyhow!("while getting `Class` at index {index}"))
	}

	pub fn get_name_and_type(&self, index: u16) -> Result<(&str, &str)> {
		let &PoolEntry::NameAndType { name_index, descriptor_index } = self.get(index)? else {
			bail!("pool entry at index {index} not `NameAndType`: {:?}", self.get(index)?);
		};
		let name = self.get_utf8(name_index)
			.with_context(|| anyhow!("while getting name of `NameAndType` at index {index}"))?;
		let desc = self.get_utf8(descriptor_index)
			.with_context(|| anyhow!("while getting descriptor of `NameAndType` at index {index}"))?;
		Ok((name, desc))
	}

	pub fn get_member_ref(&self, index: u16) -> Result<MemberRef<'_>> {
		let (kind, class_index, name_and_type_index) = match *self.get(index)? {
			PoolEntry::FieldRef { class_index, name_and_type_index } => (MemberRefKind::Field, class_index, name_and_type_index),
			PoolEntry::MethodRef { class_index, name_and_type_index } => (MemberRefKind::Method, class_index, name_and_type_index),
			PoolEntry::InterfaceMethodRef { class_index, name_and_type_index } =>
				(MemberRefKind::InterfaceMethod, class_index, name_and_type_index),
			ref entry => bail!("pool entry at index {index} is not a member reference: {entry:?}"),
		};
		let class = self.get_class(class_index)?;
		let (name, desc) = self.get_name_and_type(name_and_type_index)?;
		Ok(MemberRef { kind, class, name, desc })
	}

	/// Appends an entry, without checking if an equal entry already exists.
	pub fn push(&mut self, entry: PoolEntry) -> Result<u16> {
		let index = u16::try_from(self.inner.len())
			.with_context(|| anyhow!("constant pool is full, can't add {entry:?}"))?;
		let wide = entry.is_wide();
		self.inner.push(Some(entry));
		if wide {
			self.inner.push(None);
		}
		if self.inner.len() > u16::MAX as usize {
			bail!("constant pool grew beyond {} entries", u16::MAX);
		}
		Ok(index)
	}

	/// Returns the index of an equal entry if there's one, otherwise appends the entry.
	pub fn put(&mut self, entry: PoolEntry) -> Result<u16> {
		let found = self.entries()
			.find(|(_, e)| **e == entry)
			.map(|(index, _)| index);
		match found {
			Some(index) => Ok(index),
			None => self.push(entry),
		}
	}

	pub fn put_utf8(&mut self, string: &str) -> Result<u16> {
		let found = self.entries()
			.find(|(_, e)| matches!(e, PoolEntry::Utf8 { string: s } if s == string))
			.map(|(index, _)| index);
		match found {
			Some(index) => Ok(index),
			None => self.push(PoolEntry::Utf8 { string: string.to_owned() }),
		}
	}

	pub fn put_class(&mut self, name: &str) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		self.put(PoolEntry::Class { name_index })
	}

	pub fn put_string(&mut self, string: &str) -> Result<u16> {
		let string_index = self.put_utf8(string)?;
		self.put(PoolEntry::String { string_index })
	}

	pub fn put_name_and_type(&mut self, name: &str, desc: &str) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		let descriptor_index = self.put_utf8(desc)?;
		self.put(PoolEntry::NameAndType { name_index, descriptor_index })
	}

	pub fn put_member_ref(&mut self, kind: MemberRefKind, class: &str, name: &str, desc: &str) -> Result<u16> {
		let class_index = self.put_class(class)?;
		let name_and_type_index = self.put_name_and_type(name, desc)?;
		self.put(match kind {
			MemberRefKind::Field => PoolEntry::FieldRef { class_index, name_and_type_index },
			MemberRefKind::Method => PoolEntry::MethodRef { class_index, name_and_type_index },
			MemberRefKind::InterfaceMethod => PoolEntry::InterfaceMethodRef { class_index, name_and_type_index },
		})
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::pool::{MemberRefKind, Pool, PoolEntry};

	#[test]
	fn wide_entries_take_two_slots() -> Result<()> {
		let mut pool = Pool::new();
		assert_eq!(pool.push(PoolEntry::Long { bytes: 7 })?, 1);
		assert_eq!(pool.put_utf8("a")?, 3);
		assert!(pool.get(2).is_err());
		assert_eq!(pool.count(), 4);

		let mut bytes = Vec::new();
		pool.write(&mut bytes)?;
		let read = Pool::read(&mut bytes.as_slice())?;
		assert_eq!(read, pool);
		Ok(())
	}

	#[test]
	fn put_reuses_existing_entries() -> Result<()> {
		let mut pool = Pool::new();
		let a = pool.put_member_ref(MemberRefKind::Method, "a/B", "c", "()V")?;
		let count = pool.count();
		let b = pool.put_member_ref(MemberRefKind::Method, "a/B", "c", "()V")?;
		assert_eq!(a, b);
		assert_eq!(pool.count(), count);

		let field = pool.put_member_ref(MemberRefKind::Field, "a/B", "c", "()V")?;
		assert_ne!(a, field);
		assert_eq!(pool.count(), count + 1);

		let member = pool.get_member_ref(field)?;
		assert_eq!((member.kind, member.class, member.name, member.desc), (MemberRefKind::Field, "a/B", "c", "()V"));
		Ok(())
	}

	#[test]
	fn index_zero_is_invalid() {
		let pool = Pool::new();
		assert!(pool.get(0).is_err());
		assert!(matches!(pool.get_optional(0, Pool::get_class), Ok(None)));
	}
}
