//! Visitor counter endpoint.
//!
//! Each `POST` atomically adds one to a named counter in a durable store and
//! returns the new value; `OPTIONS` answers the CORS preflight without
//! touching the store.
//!
//! ```text
//! POST /     -> 200 {"count": 42}
//!            -> 500 {"error": "counter store timed out after 3000ms"}
//! OPTIONS /  -> 200 (empty), Access-Control-Allow-* headers
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: Counter stores with an atomic increment-with-default
//! - [`counter`]: The increment-and-get operation
//! - [`api`]: HTTP routes, handlers and CORS
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod counter;
pub mod error;
pub mod metrics;
pub mod store;
pub mod utils;

pub use config::Config;
pub use counter::CounterService;
pub use error::{Result, ServiceError, StoreError};
