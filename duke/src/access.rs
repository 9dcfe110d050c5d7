//! Access flags of classes, fields, methods and inner class entries.
//!
//! The bit values are shared between the different kinds of flags, only some of them mean different things
//! (like [`SUPER`] and [`SYNCHRONIZED`]).

use std::fmt::{Debug, Formatter};

pub const PUBLIC: u16 = 0x0001;
pub const PRIVATE: u16 = 0x0002;
pub const PROTECTED: u16 = 0x0004;
pub const STATIC: u16 = 0x0008;
pub const FINAL: u16 = 0x0010;
pub const SUPER: u16 = 0x0020;
pub const SYNCHRONIZED: u16 = 0x0020;
pub const VOLATILE: u16 = 0x0040;
pub const BRIDGE: u16 = 0x0040;
pub const TRANSIENT: u16 = 0x0080;
pub const VARARGS: u16 = 0x0080;
pub const NATIVE: u16 = 0x0100;
pub const INTERFACE: u16 = 0x0200;
pub const ABSTRACT: u16 = 0x0400;
pub const STRICT: u16 = 0x0800;
pub const SYNTHETIC: u16 = 0x1000;
pub const ANNOTATION: u16 = 0x2000;
pub const ENUM: u16 = 0x4000;

/// Makes the flags `public`, removing `private` and `protected`.
pub fn make_public(access: u16) -> u16 {
	(access & !(PRIVATE | PROTECTED)) | PUBLIC
}

/// Removes the `final` flag.
pub fn make_non_final(access: u16) -> u16 {
	access & !FINAL
}

/// Wraps access flags of a method for printing them in a readable way.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MethodAccess(pub u16);

impl Debug for MethodAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let a = self.0;
		f.write_str("{ ")?;
		if a & PUBLIC != 0       { f.write_str("public ")?; }
		if a & PRIVATE != 0      { f.write_str("private ")?; }
		if a & PROTECTED != 0    { f.write_str("protected ")?; }
		if a & STATIC != 0       { f.write_str("static ")?; }
		if a & FINAL != 0        { f.write_str("final ")?; }
		if a & SYNCHRONIZED != 0 { f.write_str("synchronized ")?; }
		if a & BRIDGE != 0       { f.write_str("bridge ")?; }
		if a & VARARGS != 0      { f.write_str("varargs ")?; }
		if a & NATIVE != 0       { f.write_str("native ")?; }
		if a & ABSTRACT != 0     { f.write_str("abstract ")?; }
		if a & STRICT != 0       { f.write_str("strict ")?; }
		if a & SYNTHETIC != 0    { f.write_str("synthetic ")?; }
		f.write_str("}")
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::access::{FINAL, make_non_final, make_public, MethodAccess, PRIVATE, PROTECTED, PUBLIC, STATIC};

	#[test]
	fn public_replaces_other_visibility() {
		assert_eq!(make_public(PRIVATE | STATIC), PUBLIC | STATIC);
		assert_eq!(make_public(PROTECTED | FINAL), PUBLIC | FINAL);
		assert_eq!(make_public(0), PUBLIC);
	}

	#[test]
	fn non_final() {
		assert_eq!(make_non_final(PUBLIC | FINAL), PUBLIC);
		assert_eq!(make_non_final(PUBLIC), PUBLIC);
	}

	#[test]
	fn debug() {
		assert_eq!(format!("{:?}", MethodAccess(PUBLIC | STATIC | FINAL)), "{ public static final }");
	}
}
