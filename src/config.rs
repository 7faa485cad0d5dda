//! Session configuration.
//!
//! Binaries load this from JSON and let command line flags override individual fields:
//!
//! ```json
//! { "baud_rate": 115200, "warmup_ms": 3000, "response_timeout_ms": 500 }
//! ```

use crate::constants::{DEFAULT_BAUD_RATE, DEFAULT_WARMUP};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub baud_rate: u32,
    /// Settle time after the port opens; the client resets on connect.
    #[serde(rename = "warmup_ms", with = "duration_ms")]
    pub warmup: Duration,
    /// Deadline for each acknowledgement line. `None` waits indefinitely.
    #[serde(rename = "response_timeout_ms", with = "opt_duration_ms")]
    pub response_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            warmup: DEFAULT_WARMUP,
            response_timeout: None,
        }
    }
}

impl SessionConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }
}

mod duration_ms {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(millis(value).map_err(S::Error::custom)?)
    }

    pub(super) fn millis(value: &Duration) -> Result<u64, String> {
        u64::try_from(value.as_millis()).map_err(|_| format!("{value:?} does not fit in u64 milliseconds"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod opt_duration_ms {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&super::duration_ms::millis(d).map_err(S::Error::custom)?),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
