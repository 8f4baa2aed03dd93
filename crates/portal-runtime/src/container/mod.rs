//! # Service Container
//!
//! Configuration plus the single place where storage, the event bus and
//! every portal service are constructed and handed to each other.

pub mod config;
pub mod services;

pub use config::{ConfigError, PortalConfig, StorageBackend};
pub use services::{ContainerError, PortalContainer};
