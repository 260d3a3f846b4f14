//! confluence-ingest - Turn Confluence spaces into plain-text page records
//!
//! This is the main entry point for the CLI application.

#[tokio::main]
async fn main() {
  confluence_ingest::cli::run().await;
}
