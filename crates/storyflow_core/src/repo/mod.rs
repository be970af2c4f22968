//! Persistence gateway for board documents.
//!
//! # Responsibility
//! - Define the fetch/subscribe/persist contract consumed by services.
//! - Isolate SQLite and JSON encoding details from orchestration.
//!
//! # Invariants
//! - Boards are written as whole documents; no partial updates.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod board_store;
