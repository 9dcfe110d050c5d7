//! Crate for reading, writing and merging mapping files, and for resolving the renames between two namespaces.
//!
//! Mappings are kept in a [`MappingTree`][tree::mappings::MappingTree], storing one name per namespace for each class,
//! field, method, parameter and local variable. Mappings can be read from and written to Tiny v2 files (see [`tiny_v2`]),
//! read from ProGuard files (see [`proguard`]), and read from and written to jars containing a Tiny v2 file (see [`archive`]).
//!
//! The [`provider`] merges the mapping files of a project into a single tree, caching the result on disk. From a tree,
//! [`fallback::resolve`] gives the renames from one namespace to another, which are applied with the [`remapper`]s.

mod lines;

pub mod error;
pub mod tree;
pub mod remapper;

pub mod tiny_v2;
pub mod proguard;
pub mod archive;

pub mod action;
pub mod stub;
pub mod source;
pub mod provider;
pub mod fallback;
