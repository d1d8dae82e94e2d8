//! # Rust PLogic Library
//!
//! Driver for ASI programmable logic cards: addressable boards on a shared
//! ASCII serial bus that hold an array of reconfigurable logic cells plus
//! physical front-panel and backplane I/O. The library exposes each card as a
//! set of named, typed properties backed by a value cache, and hides the
//! card's register-indirect addressing behind a pointer-position cache.
//!
//! ## Crate Structure
//!
//! - **`adapters`**: The `Transport` seam, with a `serialport`-backed
//!   implementation and an in-memory simulated card for tests and dry runs.
//! - **`config`**: Loading and validating bus and card configuration from TOML
//!   files and environment variables. See `config::AppConfig`.
//! - **`error`**: The `PlogicError` enum for centralized error handling.
//! - **`hardware`**: Wire protocol, pointer register, value codes, the property
//!   table and the `PlogicCard` façade.
//! - **`logging`**: `tracing-subscriber` setup.

pub mod adapters;
pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;

pub use error::{PlogicError, PlogicResult};
pub use hardware::PlogicCard;
