//! Corpus ingestion: directory enumeration and per-file parsing.
//!
//! Ingestion is deliberately tolerant: one malformed file must never abort
//! a corpus load. Every file therefore produces an explicit outcome — a
//! [`Document`], a typed [`IngestError`] recorded in the report, or a
//! `skipped` entry for unsupported extensions — and the batch always runs
//! to completion.

pub mod loader;
mod parsers;

pub use loader::{Document, IngestError, IngestFailure, IngestReport, load_directory};
