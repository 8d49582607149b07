//! Session configuration
//!
//! [`RigConfig`] starts from a model's port record and can be changed with
//! string tokens (`set_conf timeout=800`) or deserialized from a settings file.

use std::time::Duration;

use rig_protocol::caps::RigCaps;
use rig_protocol::RigError;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_TTL;
use crate::port::PortTiming;

/// Configuration tokens and their descriptions
pub const TOKENS: &[(&str, &str)] = &[
    ("timeout", "Read timeout in ms"),
    ("retry", "Max number of retries"),
    ("write_delay", "Delay between bytes written, in ms"),
    ("post_write_delay", "Delay after a frame is written, in ms"),
    ("cache_timeout", "Cache time to live for every kind, in ms"),
];

/// Tunable session parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub timeout_ms: u64,
    pub retry: u32,
    pub write_delay_ms: u64,
    pub post_write_delay_ms: u64,
    pub cache_timeout_ms: u64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            retry: 3,
            write_delay_ms: 0,
            post_write_delay_ms: 0,
            cache_timeout_ms: DEFAULT_TTL.as_millis() as u64,
        }
    }
}

impl RigConfig {
    /// Defaults declared by a model
    pub fn from_caps(caps: &RigCaps) -> Self {
        Self {
            timeout_ms: caps.port.timeout_ms,
            retry: caps.port.retry,
            write_delay_ms: caps.port.write_delay_ms,
            post_write_delay_ms: caps.port.post_write_delay_ms,
            ..Self::default()
        }
    }

    pub fn timing(&self) -> PortTiming {
        PortTiming {
            timeout: Duration::from_millis(self.timeout_ms),
            write_delay: Duration::from_millis(self.write_delay_ms),
            post_write_delay: Duration::from_millis(self.post_write_delay_ms),
        }
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    /// Set a token from its string value
    pub fn set(&mut self, token: &str, value: &str) -> Result<(), RigError> {
        let parse = |v: &str| -> Result<u64, RigError> {
            v.trim()
                .parse::<u64>()
                .map_err(|_| RigError::InvalidParam(format!("{}: '{}' is not a number", token, v)))
        };
        match token {
            "timeout" => self.timeout_ms = parse(value)?,
            "retry" => {
                self.retry = u32::try_from(parse(value)?)
                    .map_err(|_| RigError::InvalidParam(format!("retry: '{}' too large", value)))?
            }
            "write_delay" => self.write_delay_ms = parse(value)?,
            "post_write_delay" => self.post_write_delay_ms = parse(value)?,
            "cache_timeout" => self.cache_timeout_ms = parse(value)?,
            _ => return Err(RigError::Config(format!("unknown token '{}'", token))),
        }
        Ok(())
    }

    /// Current value of a token
    pub fn get(&self, token: &str) -> Result<String, RigError> {
        let v = match token {
            "timeout" => self.timeout_ms,
            "retry" => u64::from(self.retry),
            "write_delay" => self.write_delay_ms,
            "post_write_delay" => self.post_write_delay_ms,
            "cache_timeout" => self.cache_timeout_ms,
            _ => return Err(RigError::Config(format!("unknown token '{}'", token))),
        };
        Ok(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_roundtrip() {
        let mut c = RigConfig::default();
        for (token, _) in TOKENS {
            c.set(token, "42").unwrap();
            assert_eq!(c.get(token).unwrap(), "42");
        }
    }

    #[test]
    fn test_unknown_token() {
        let mut c = RigConfig::default();
        assert!(matches!(c.set("baud", "9600"), Err(RigError::Config(_))));
        assert!(matches!(c.get("baud"), Err(RigError::Config(_))));
    }

    #[test]
    fn test_bad_value() {
        let mut c = RigConfig::default();
        assert!(matches!(
            c.set("timeout", "soon"),
            Err(RigError::InvalidParam(_))
        ));
        assert_eq!(c.timeout_ms, 1000);
    }

    #[test]
    fn test_timing() {
        let c = RigConfig {
            timeout_ms: 400,
            write_delay_ms: 5,
            ..Default::default()
        };
        let t = c.timing();
        assert_eq!(t.timeout, Duration::from_millis(400));
        assert_eq!(t.write_delay, Duration::from_millis(5));
        assert_eq!(t.post_write_delay, Duration::ZERO);
    }

    #[test]
    fn test_serde_partial() {
        let c: RigConfig = serde_json::from_str(r#"{"retry": 0}"#).unwrap();
        assert_eq!(c.retry, 0);
        assert_eq!(c.cache_timeout_ms, 500);
    }
}
