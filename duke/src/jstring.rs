//! Conversion between the "modified UTF-8" of the Java Virtual Machine Specification and rust strings.
//!
//! The format stores `\0` using two bytes and encodes characters outside the basic multilingual plane as a surrogate pair of
//! three bytes each. See <https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.4.7>.

use anyhow::{anyhow, Context, Result};
use java_string::{JavaStr, JavaString};

/// Decodes the bytes of a `CONSTANT_Utf8_info` entry.
///
/// Strings containing unpaired surrogates are valid for the JVM but can't be represented as a rust string, these fail.
pub(crate) fn decode(bytes: Vec<u8>) -> Result<String> {
	let java = JavaString::from_modified_utf8(bytes)
		.with_context(|| anyhow!("invalid java utf8 contents"))?;
	java.into_string()
		.with_context(|| anyhow!("java utf8 string contains unpaired surrogates"))
}

/// Encodes a string into the bytes of a `CONSTANT_Utf8_info` entry.
pub(crate) fn encode(string: &str) -> Vec<u8> {
	JavaStr::from_str(string).to_modified_utf8().into_owned()
}
