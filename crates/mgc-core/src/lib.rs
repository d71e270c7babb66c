//! Core domain models for mgc
//!
//! This crate contains:
//! - The shared error type, including the fatal invariant violations
//! - The replacement report model (per-obfuscator tables, omissions)

pub mod error;
pub mod report;

pub use error::{Error, FatalError, Result};
pub use report::{ObfuscatorReport, Occurrence, Replacement, ReplacementReport, Report};
