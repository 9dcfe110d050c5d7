//! Reading and writing jars, and remapping the classes inside of them.
//!
//! A jar is anything implementing [`Jar`][storage::Jar]: a file on disk ([`FileJar`][storage::FileJar]) or one held in memory
//! ([`NamedMemJar`][storage::NamedMemJar]). New jars are always written to a temporary file first, see [`storage::write_file`].
//!
//! The [`remap`] module renames classes and members of all classes in a jar, based on a
//! [`RenamePlan`][quill::fallback::RenamePlan] or any other [`MemberRemapper`][quill::remapper::MemberRemapper].

pub mod storage;
pub mod remap;
pub mod transform;
mod meta_inf;
