//! Confluence module providing the API abstraction, the HTTP client, response
//! models with their derived JSON schemas, and offset pagination.

pub mod api;
pub mod client;
pub mod models;
pub mod pagination;
pub mod schema;

pub use api::{BinaryBody, ConfluenceApi, Endpoint};
pub use client::ConfluenceClient;
pub use models::{Attachment, ContentPage, ListingPage, Space, SpaceContent};
pub use pagination::{ListingRequest, fetch_page_attachments, fetch_spaces, paginate};
