//! Network clients for external services
//!
//! - Resolver: client IP lookup + stream URL backend

pub mod resolver;

pub use resolver::{EndpointResolver, ResolutionError, ResolutionStage, StreamResolver};
