//! # cosmos-orm
//!
//! Provider options and model introspection for an object mapper backed by a
//! Cosmos-style document database.
//!
//! ## Overview
//!
//! Two independent pieces live here:
//!
//! - **Provider options**: [`CosmosOptions`] is an immutable, copy-on-write
//!   descriptor of how to reach the database. It enforces that an account
//!   endpoint/key pair and a connection string are never both configured,
//!   produces a deterministic service-provider hash and redacted diagnostics,
//!   and registers the provider's services with a host container.
//! - **Model introspection**: [`ModelExt`] answers read-only questions about an
//!   already-built entity model (entity lookup by runtime type, shared and
//!   dependent types, global defaults, indexer detection, debug dumps).
//!
//! ## Quick Start
//!
//! ```rust
//! use cosmos_orm::{ContextOptions, CosmosOptions, OptionsExtensionInfo};
//!
//! let cosmos = CosmosOptions::new()
//!     .with_connection_string("AccountEndpoint=https://localhost:8081;AccountKey=c2VjcmV0")?
//!     .with_database_name("Blogs");
//!
//! let context = ContextOptions::new().with_extension(cosmos.clone());
//! context.validate()?;
//!
//! println!("{}", cosmos.info().log_fragment());
//! # Ok::<(), cosmos_orm::Error>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`options`] | Cosmos options descriptor, derived info, file/env configuration |
//! | [`infrastructure`] | Extension traits, context aggregate, service registry and cache |
//! | [`resilience`] | Execution strategies (retry policy) and the retrying executor |
//! | [`metadata`] | Entity model and the introspection facade |
//! | [`error`] | Error types |

pub mod error;
pub mod infrastructure;
pub mod metadata;
pub mod options;
pub mod resilience;

pub use error::{Error, ErrorContext};
pub use infrastructure::{ContextOptions, OptionsExtension, OptionsExtensionInfo};
pub use metadata::{InMemoryModel, Model, ModelBuilder, ModelExt};
pub use options::{ConnectionMode, CosmosOptions, OptionsConfig};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
