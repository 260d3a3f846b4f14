//! Confluence ingestion library
//!
//! Fetches the pages of a Confluence space through the REST API, validates
//! every response against its declared shape, converts storage markup into
//! normalized plain text and, optionally, replaces embedded images with
//! AI-generated descriptions before the conversion.

pub mod cli;
pub mod color;
pub mod commands;
pub mod confluence;
pub mod credentials;
pub mod error;
pub mod images;
pub mod pipeline;
pub mod plaintext;
pub mod processed_page;
pub mod vision;
