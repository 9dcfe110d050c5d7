//! A crate for reading and writing [Java Class Files](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html) at the
//! level of the constant pool.
//!
//! Unlike a full class model, a [`ClassFile`] keeps the method bodies and any attribute it doesn't know about as raw bytes. This
//! makes it possible to rename the symbolic references of a class without touching its bytecode: everything the JVM resolves by
//! name goes through the constant pool.

pub mod access;
pub mod attribute;
pub mod builder;
pub mod class_file;
pub mod pool;
mod jstring;

use anyhow::{anyhow, Context, Result};
use std::io::{Read, Write};

pub use class_file::{Attribute, ClassFile, Member};
pub use pool::{Pool, PoolEntry};

pub(crate) const MAGIC: u32 = 0xCAFE_BABE;

/// Reads a single java class file from the given bytes.
///
/// Fails if there are bytes left over after the class file ends.
pub fn read_class(bytes: &[u8]) -> Result<ClassFile> {
	ClassFile::from_bytes(bytes)
}

/// Writes a class file into a new vec.
pub fn write_class(class: &ClassFile) -> Result<Vec<u8>> {
	class.to_bytes()
}

pub(crate) trait ClassRead {
	fn read_n<const N: usize>(&mut self) -> Result<[u8; N]>;
	fn read_u8(&mut self) -> Result<u8> {
		Ok(u8::from_be_bytes(self.read_n().context("couldn't read u8, perhaps the data's end is reached?")?))
	}
	fn read_u16(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.read_n().context("couldn't read u16, perhaps the data's end is reached?")?))
	}
	fn read_u32(&mut self) -> Result<u32> {
		Ok(u32::from_be_bytes(self.read_n().context("couldn't read u32, perhaps the data's end is reached?")?))
	}
	fn read_u64(&mut self) -> Result<u64> {
		Ok(u64::from_be_bytes(self.read_n().context("couldn't read u64, perhaps the data's end is reached?")?))
	}

	fn read_u8_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u8()? as usize)
	}
	fn read_u16_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u16()? as usize)
	}
	fn read_u32_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u32()? as usize)
	}
	fn read_u8_vec(&mut self, size: usize) -> Result<Vec<u8>>;
	fn read_vec<T, S, E>(&mut self, get_size: S, mut get_element: E) -> Result<Vec<T>>
		where
			S: FnOnce(&mut Self) -> Result<usize>,
			E: FnMut(&mut Self) -> Result<T>
	{
		let size = get_size(self)?;
		let mut vec = Vec::with_capacity(size);
		for _ in 0..size {
			vec.push(get_element(self)?);
		}
		Ok(vec)
	}
}

impl<T: Read> ClassRead for T {
	fn read_n<const N: usize>(&mut self) -> Result<[u8; N]> {
		let mut buf = [0u8; N];
		self.read_exact(&mut buf)?;
		Ok(buf)
	}
	fn read_u8_vec(&mut self, size: usize) -> Result<Vec<u8>> {
		let mut vec = vec![0; size];
		self.read_exact(&mut vec)
			.with_context(|| anyhow!("couldn't read {size} bytes, perhaps the data's end is reached?"))?;
		Ok(vec)
	}
}

pub(crate) trait ClassWrite {
	fn write_u8(&mut self, value: u8) -> Result<()> {
		self.write_u8_slice(&[value]).context("couldn't write u8")
	}
	fn write_u16(&mut self, value: u16) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u16")
	}
	fn write_u32(&mut self, value: u32) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u32")
	}
	fn write_u64(&mut self, value: u64) -> Result<()> {
		self.write_u8_slice(&value.to_be_bytes()).context("couldn't write u64")
	}

	fn write_usize_as_u8(&mut self, value: usize) -> Result<()> {
		self.write_u8(u8::try_from(value).with_context(|| anyhow!("failed to convert {value} to u8 for writing: value too large"))?)
	}
	fn write_usize_as_u16(&mut self, value: usize) -> Result<()> {
		self.write_u16(u16::try_from(value).with_context(|| anyhow!("failed to convert {value} to u16 for writing: value too large"))?)
	}
	fn write_usize_as_u32(&mut self, value: usize) -> Result<()> {
		self.write_u32(u32::try_from(value).with_context(|| anyhow!("failed to convert {value} to u32 for writing: value too large"))?)
	}

	fn write_u8_slice(&mut self, buf: &[u8]) -> Result<()>;
	fn write_slice<'t, T>(
		&mut self,
		slice: &'t [T],
		put_size: impl FnOnce(&mut Self, usize) -> Result<()>,
		mut put_element: impl FnMut(&mut Self, &'t T) -> Result<()>
	) -> Result<()> {
		put_size(self, slice.len())?;
		for value in slice {
			put_element(self, value)?;
		}
		Ok(())
	}
}

impl<T: Write> ClassWrite for T {
	fn write_u8_slice(&mut self, buf: &[u8]) -> Result<()> {
		self.write_all(buf).context("failed to write &[u8]")
	}
}
