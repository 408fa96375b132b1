//! # TupleDB Testkit
//!
//! Test utilities for TupleDB.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - Property-based test generators using proptest
//! - A model-checking harness for cross-crate integration tests
//!
//! ## Usage
//!
//! ```rust
//! use tupledb_codec::tuple;
//! use tupledb_core::ScanArgs;
//! use tupledb_testkit::{seed_people, with_temp_db};
//!
//! with_temp_db(|db| {
//!     seed_people(db);
//!     let rows = db.scan(&ScanArgs::prefix(tuple!["person"])).unwrap();
//!     assert_eq!(rows.len(), 5);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
