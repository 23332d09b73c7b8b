//! Charge request arbitration
//!
//! The single shared charge-intent flag. Three writers (local button, MQTT
//! bridge, cloud command) and one reader (the charge controller). Policy is
//! last-writer-wins with no source priority; the writing source is recorded
//! alongside the flag so future prioritization does not require
//! rearchitecting.

use crate::logging::get_logger;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Where a charge request write originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandSource {
    LocalButton = 0,
    Broker = 1,
    Cloud = 2,
}

impl CommandSource {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CommandSource::LocalButton),
            1 => Some(CommandSource::Broker),
            2 => Some(CommandSource::Cloud),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            CommandSource::LocalButton => "local_button",
            CommandSource::Broker => "broker",
            CommandSource::Cloud => "cloud",
        }
    }
}

const SOURCE_NONE: u8 = u8::MAX;

/// Shared charge-intent flag with source attribution
pub struct ChargeArbiter {
    requested: AtomicBool,
    last_source: AtomicU8,
    logger: crate::logging::StructuredLogger,
}

impl Default for ChargeArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChargeArbiter {
    pub fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            last_source: AtomicU8::new(SOURCE_NONE),
            logger: get_logger("arbiter"),
        }
    }

    /// Overwrite the request flag. Last writer wins regardless of source.
    pub fn set_request(&self, on: bool, source: CommandSource) {
        self.requested.store(on, Ordering::SeqCst);
        self.last_source.store(source as u8, Ordering::SeqCst);
        self.logger.debug(&format!(
            "charge request set to {} by {}",
            on,
            source.as_str()
        ));
    }

    /// Flip the request flag (local button semantics). Returns the new value.
    pub fn toggle(&self, source: CommandSource) -> bool {
        let new = !self.requested.fetch_xor(true, Ordering::SeqCst);
        self.last_source.store(source as u8, Ordering::SeqCst);
        self.logger
            .debug(&format!("charge request toggled to {} by {}", new, source.as_str()));
        new
    }

    /// Current request flag
    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Source of the most recent write, if any write happened
    pub fn last_source(&self) -> Option<CommandSource> {
        CommandSource::from_u8(self.last_source.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initially_off_with_no_source() {
        let arbiter = ChargeArbiter::new();
        assert!(!arbiter.requested());
        assert_eq!(arbiter.last_source(), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let arbiter = ChargeArbiter::new();
        arbiter.set_request(true, CommandSource::LocalButton);
        arbiter.set_request(false, CommandSource::Broker);
        arbiter.set_request(true, CommandSource::Cloud);
        assert!(arbiter.requested());
        assert_eq!(arbiter.last_source(), Some(CommandSource::Cloud));
    }

    #[test]
    fn test_no_source_priority() {
        let arbiter = ChargeArbiter::new();
        // The cloud turning charging on does not outrank a later broker off
        arbiter.set_request(true, CommandSource::Cloud);
        arbiter.set_request(false, CommandSource::Broker);
        assert!(!arbiter.requested());
        assert_eq!(arbiter.last_source(), Some(CommandSource::Broker));
    }

    #[test]
    fn test_toggle() {
        let arbiter = ChargeArbiter::new();
        assert!(arbiter.toggle(CommandSource::LocalButton));
        assert!(arbiter.requested());
        assert!(!arbiter.toggle(CommandSource::LocalButton));
        assert!(!arbiter.requested());
        assert_eq!(arbiter.last_source(), Some(CommandSource::LocalButton));
    }
}
