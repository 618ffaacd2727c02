//! wp-migrator - WordPress to Rocket.net migration wizard
//!
//! Collects source and destination settings in a three-step wizard, submits
//! them to a migration service and streams the service's progress log back
//! line by line.
//!
//! ## Quick Start
//!
//! ```bash
//! # Interactive wizard
//! wp-migrator
//!
//! # Headless run
//! WP_PASSWORD=... ROCKET_API_TOKEN=... wp-migrator run \
//!     --admin-url https://example.com/wp-admin/ --username admin \
//!     --rocket-name my-new-site
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod migration;
pub mod tui;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorCode, MigratorError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
