//! SchoolID Worker Service Entry Point
//!
//! Loads configuration, initializes storage, and starts the HTTP server.

use schoolid_worker::run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run().await
}
