//! Board use-case services.
//!
//! # Responsibility
//! - Orchestrate tree operations, navigation and store writes into user actions.
//! - Keep UI/FFI layers decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass the store contract; writes are whole documents.

pub mod board_service;
pub mod board_session;
pub mod board_transfer;
pub mod navigation;
pub mod section_edit;
