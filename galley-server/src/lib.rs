//! Galley Server - inventory backend for expiry-tracked stock
//!
//! # Architecture overview
//!
//! - **Database** (`db`): embedded SurrealDB storage with one
//!   repository per table
//! - **Services** (`services`): expiry evaluation, lot cascade, sale
//!   recording, and the image store gateway
//! - **HTTP API** (`api`): RESTful interface over axum
//!
//! # Module structure
//!
//! ```text
//! galley-server/src/
//! ├── core/          # configuration, state, server
//! ├── db/            # database layer (models, repositories)
//! ├── services/      # expiry + image storage
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # logger, id source
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod services;
pub mod utils;

// Re-export common types
pub use core::{Config, Server, ServerState};
pub use services::{ExpiryService, ExpiryStatus, ImageStorage};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load .env and initialize logging
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    utils::logger::init_logger();
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ______      ____
  / ____/___ _/ / /__  __  __
 / / __/ __ `/ / / _ \/ / / /
/ /_/ / /_/ / / /  __/ /_/ /
\____/\__,_/_/_/\___/\__, /
                    /____/
    "#
    );
}
