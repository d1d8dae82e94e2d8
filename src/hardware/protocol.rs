//! Addressed command builder and reply parser.
//!
//! Protocol Overview:
//! - Format: ASCII, one command per line, one reply per command
//! - Card-local commands: `{Address}{Mnemonic} {Field}?` or `{Field}={Value}`
//!   (e.g. `1CCA Y=3`)
//! - Axis commands: `{Mnemonic} {Axis}...` (e.g. `M M=5`, `W M`, `PM M?`)
//! - Acknowledgment: replies start with `:A` on success; `:N-<code>` on error.
//!   Trigger-source queries are acknowledged by the axis letter instead.
//!
//! Reply payloads are decoded strictly: anything that is not an integer where
//! one is promised is a decode failure.

use crate::adapters::Transport;
use crate::error::{DecodeStrategy, PlogicError, PlogicResult};
use std::time::Duration;
use tracing::debug;

/// Acknowledgment token of a successful command.
pub const ACK: &str = ":A";

/// Command channel to one card: the transport plus the card's bus address.
pub struct CardLink<T> {
    transport: T,
    address: char,
}

impl<T: Transport> CardLink<T> {
    /// Wrap a transport for the card at `address`.
    pub fn new(transport: T, address: char) -> Self {
        Self { transport, address }
    }

    /// Bus address character.
    pub fn address(&self) -> char {
        self.address
    }

    /// Prefix a card-local command fragment with the bus address.
    ///
    /// `addressed("CCA Y?")` on card `1` yields `1CCA Y?`.
    pub fn addressed(&self, fragment: &str) -> String {
        format!("{}{}", self.address, fragment)
    }

    /// Send `command` and require the reply to start with `ack`.
    pub fn query_verify(&mut self, command: &str, ack: &str) -> PlogicResult<String> {
        self.query_verify_delayed(command, ack, Duration::ZERO)
    }

    /// Like [`query_verify`](Self::query_verify) with a settling delay between
    /// sending and reading, for slow commands such as saving to flash.
    pub fn query_verify_delayed(
        &mut self,
        command: &str,
        ack: &str,
        settle: Duration,
    ) -> PlogicResult<String> {
        let reply = self.query_raw_delayed(command, settle)?;
        if !reply.starts_with(ack) {
            return Err(PlogicError::Protocol {
                command: command.to_string(),
                expected: ack.to_string(),
                reply,
            });
        }
        Ok(reply)
    }

    /// Send `command` and return the reply without checking it.
    pub fn query_raw(&mut self, command: &str) -> PlogicResult<String> {
        self.query_raw_delayed(command, Duration::ZERO)
    }

    fn query_raw_delayed(&mut self, command: &str, settle: Duration) -> PlogicResult<String> {
        debug!(address = %self.address, command, "bus command");
        let reply = self.transport.query(command, settle)?;
        debug!(address = %self.address, command, reply = %reply, "bus reply");
        Ok(reply)
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// First whitespace-delimited token of `rest`, parsed as an integer.
fn parse_leading_integer(rest: &str) -> Option<i64> {
    rest.split_whitespace().next()?.parse().ok()
}

/// Integer immediately following the acknowledgment `token`.
///
/// `":A 37"` with token `":A"` decodes to 37.
pub fn parse_after_token(reply: &str, token: &str) -> PlogicResult<i64> {
    reply
        .strip_prefix(token)
        .and_then(parse_leading_integer)
        .ok_or_else(|| PlogicError::Decode {
            strategy: DecodeStrategy::AfterToken,
            reply: reply.to_string(),
        })
}

/// Integer following the first `=`.
///
/// `":A Y=5"` decodes to 5, `"M=2 :A"` decodes to 2.
pub fn parse_after_equals(reply: &str) -> PlogicResult<i64> {
    reply
        .split_once('=')
        .and_then(|(_, rest)| parse_leading_integer(rest))
        .ok_or_else(|| PlogicError::Decode {
            strategy: DecodeStrategy::AfterEquals,
            reply: reply.to_string(),
        })
}

/// Integer suffix after the last `_` of a firmware build name.
///
/// `"TIGER_PLOGIC_24"` decodes to 24. The whole suffix must be numeric.
pub fn parse_after_underscore(reply: &str) -> PlogicResult<i64> {
    reply
        .trim()
        .rsplit_once('_')
        .and_then(|(_, suffix)| suffix.parse().ok())
        .ok_or_else(|| PlogicError::Decode {
            strategy: DecodeStrategy::AfterUnderscore,
            reply: reply.to_string(),
        })
}
