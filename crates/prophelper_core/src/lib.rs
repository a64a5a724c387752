//! Turns Wikidata property proposal pages into QuickStatements import scripts.
//!
//! The pipeline runs per proposal section: comments are stripped, the page is
//! split into sections, nested `{{...}}` templates are extracted into a table
//! behind `%%N%%` placeholders, fields are parsed, templates are reinterpreted
//! by tag, and the command generator walks the fields to emit ordered,
//! tab-delimited import lines.

pub mod commands;
pub mod config;
pub mod datatype;
pub mod error;
pub mod fetch;
pub mod fields;
pub mod markup;
pub mod proposal;
pub mod reinterpret;
pub mod template;

pub use commands::{CommandScript, CreationOutcome, Rejection};
pub use error::ProposalError;
pub use proposal::{Proposal, ScriptMode, SectionOutcome, SectionReport};
