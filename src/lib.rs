// mdcache: GitHub-hosted markdown served as sanitized HTML.
// A stale-while-revalidate cache sits in front of the upstream fetch and render pipeline.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod markdown;
pub mod server;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
