//! Deterministic, pure logic shared by the converter.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (source text, model replies) and return deterministic outputs
//! suitable for tests.

pub mod continuation;
pub mod extract;
pub mod metadata;
pub mod naming;
pub mod stats;
pub mod types;
