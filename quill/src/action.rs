//! Operations on whole mapping trees.

pub mod merge;
