//! Agent pipeline that converts legacy C sources to Java/Spring (and SQL
//! DBIO sources to MyBatis mappers) through a hosted model.
//!
//! All code understanding is delegated to the model. The crate keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (metadata, reply parsing,
//!   continuation stitching, naming, statistics). No I/O.
//! - **[`io`]**: Side-effecting operations (config, HTTP model client,
//!   prompt rendering, session transcripts, source discovery).
//!
//! [`agents`] wrap one prompt each; [`pipeline`] sequences them into the
//! refinement loop, and [`convert`] / [`batch`] apply it to files and
//! directories.

pub mod agents;
pub mod batch;
pub mod convert;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
