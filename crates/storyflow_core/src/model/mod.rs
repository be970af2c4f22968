//! Board domain model.
//!
//! # Responsibility
//! - Define the canonical board/section/todo/file shapes.
//! - Provide pure tree operations over nested sections.
//!
//! # Invariants
//! - Section ids are unique across one board tree.
//! - Tree operations never mutate their input.

pub mod board;
pub mod section_tree;
