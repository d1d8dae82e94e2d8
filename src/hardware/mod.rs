//! Logic card driver
//!
//! Layered bottom-up:
//! - [`codes`]: address space and enumerated value codes
//! - [`protocol`]: addressed command building and reply decoding
//! - [`pointer`]: the card's pointer register with its position cache
//! - [`properties`]: property keys, descriptors and the property table
//! - [`plogic`]: [`PlogicCard`], the named-property view of one card

pub mod codes;
pub mod plogic;
pub mod pointer;
pub mod properties;
pub mod protocol;

pub use plogic::{CardOptions, OutputSnapshot, PlogicCard};
