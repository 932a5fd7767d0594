#![doc = "harpin-upload-core: the upload workflow behind the harpin-upload CLI."]

//! This crate holds everything except argument parsing and terminal output:
//! settings, the [`contract::IngestApi`] network seam and its `reqwest`
//! implementation, validators, the concurrency gate, the retry combinator and
//! the upload orchestrator in [`ingest`].
//!
//! # Usage
//! Build a [`config::Settings`], resolve [`contract::Credentials`], construct a
//! [`client::HarpinClient`] and hand all three to [`ingest::run_upload`].

pub mod client;
pub mod concurrency;
pub mod config;
pub mod contract;
pub mod credentials;
pub mod error;
pub mod ingest;
pub mod progress;
pub mod retry;
pub mod validate;
