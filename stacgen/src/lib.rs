//! stacgen - STAC item generation for geospatial deliveries
//!
//! This library turns job messages (file references plus optional provider
//! metadata) into STAC items and delivers them to a queue or catalog API.
//!
//! # Pipeline
//!
//! - [`asset`] classifies file references by extension
//! - [`raster`] reads GeoTIFF structure and checks the cloud-optimized layout
//! - [`parser`] extracts provider metadata through registered parsers
//! - [`item`] assembles and merges the item
//! - [`publish`] creates or updates the item in a catalog API
//! - [`worker`] drives all of the above from a job queue
//!
//! ```no_run
//! use std::sync::Arc;
//! use stacgen::config::ConfigFile;
//! use stacgen::http::ReqwestClient;
//! use stacgen::item::ItemAssembler;
//! use stacgen::job::JobMessage;
//! use stacgen::parser::ParserRegistry;
//! use stacgen::resolver::AssetResolver;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigFile::load()?;
//! let assembler = ItemAssembler::new(
//!     ReqwestClient::new()?,
//!     Arc::new(ParserRegistry::with_builtin()),
//!     AssetResolver::new(&config.mounts),
//!     &config,
//! )?;
//! let item = assembler
//!     .assemble(&JobMessage::with_files(["/data/scene.tif"]))
//!     .await?;
//! println!("{}", item.to_document());
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod config;
pub mod error;
pub mod http;
pub mod item;
pub mod job;
pub mod logging;
pub mod parser;
pub mod publish;
pub mod queue;
pub mod raster;
pub mod resolver;
pub mod worker;

/// Version of the stacgen library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
