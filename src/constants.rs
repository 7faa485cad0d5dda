// Protocol constants shared by the master and the client

use std::time::Duration;

/// Operation id reserved for the one-time setup frame
pub const SETUP_SENTINEL: u8 = 0xFF;

/// Operation id of the padding frame, a no-op on the device
pub const EMPTY_OPERATION: u8 = 0x00;

/// Width of each value in the setup frame (1 byte, signed)
pub const SETUP_INT_WIDTH: usize = 1;

/// Number of values carried by the setup frame
pub const SETUP_PARAM_COUNT: usize = 3;

/// Size of the setup frame on the wire (4 bytes)
pub const SETUP_FRAME_SIZE: usize = 1 + SETUP_PARAM_COUNT * SETUP_INT_WIDTH;

/// Widest integer a parameter can be encoded into (an `i64` fills 8 bytes)
pub const MAX_INT_WIDTH: usize = 8;

/// Integer widths the reference client firmware accepts during setup
pub const FIRMWARE_INT_WIDTHS: [usize; 3] = [1, 2, 4];

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Device reset settle time after opening the port
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(3);

/// Line the reference client sends after the setup frame and after every batch
pub const ACK_LINE: &[u8] = b"\r\n";
