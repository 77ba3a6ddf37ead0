//! notes-to-sheets - migrate exported note archives into a tabular destination
//!
//! This crate provides the core functionality for the `nts` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`source`] - Reading exported note records and attachment bytes
//! - [`validate`] - Schema validation of raw note records
//! - [`model`] - Raw and processed note types
//! - [`pipeline`] - Processing, reconciliation and batched writes
//! - [`storage`] - The destination interface and its SQLite implementation
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};
