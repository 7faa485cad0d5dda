//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use serial_master::codec::{decode_integer, decode_sequence, encode_integer, encode_sequence};
#[allow(unused_imports)]
pub use serial_master::emulator::{DecodedCommand, DeviceEmulator, Received};
#[allow(unused_imports)]
pub use serial_master::{
    AckLine, Command, Error, FixedPortLister, Session, SessionConfig, SessionParams, SessionState,
};

use std::time::Duration;

/// Session settings for in-memory links: no warm-up, generous but bounded acknowledgement wait
#[allow(dead_code)]
pub fn test_config() -> SessionConfig {
    SessionConfig::default()
        .with_warmup(Duration::ZERO)
        .with_response_timeout(Some(Duration::from_secs(5)))
}

#[allow(dead_code)]
pub fn cmd(operation_id: u8, params: &[i64]) -> Command {
    Command::new(operation_id, params.to_vec()).expect("valid command")
}

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}

/// The reference command used by the firmware's application test
#[allow(dead_code)]
pub const SAMPLE_PARAMS: [i64; 6] = [12, 14, 14, 15, 16, 17];

/// Wire bytes of `(55, SAMPLE_PARAMS)` at int_width 2
#[allow(dead_code)]
pub const SAMPLE_FRAME_HEX: &str = "37000c000e000e000f00100011";
