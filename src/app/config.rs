use anyhow::{bail, Context};
use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8787;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 180;
const DEFAULT_CONTROL_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub room: RoomSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    /// A room with no control traffic for this long closes itself.
    pub idle_timeout: Duration,
    pub control_capacity: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            control_capacity: DEFAULT_CONTROL_CAPACITY,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT has invalid value '{raw}'"))?,
            None => DEFAULT_PORT,
        };
        let idle_secs = match var("ROOM_IDLE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("ROOM_IDLE_TIMEOUT_SECS has invalid value '{raw}'"))?,
            None => DEFAULT_IDLE_TIMEOUT_SECS,
        };
        if idle_secs == 0 {
            bail!("ROOM_IDLE_TIMEOUT_SECS must be greater than zero");
        }
        let control_capacity = match var("ROOM_CONTROL_CAPACITY") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("ROOM_CONTROL_CAPACITY has invalid value '{raw}'"))?,
            None => DEFAULT_CONTROL_CAPACITY,
        };
        if control_capacity == 0 {
            bail!("ROOM_CONTROL_CAPACITY must be greater than zero");
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            room: RoomSettings {
                idle_timeout: Duration::from_secs(idle_secs),
                control_capacity,
            },
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.address(), "0.0.0.0:8787");
        assert_eq!(config.room, RoomSettings::default());
        assert_eq!(config.room.idle_timeout, Duration::from_secs(180));
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", " 2222 "),
            ("ROOM_IDLE_TIMEOUT_SECS", "30"),
            ("ROOM_CONTROL_CAPACITY", "16"),
        ]))
        .unwrap();
        assert_eq!(config.address(), "127.0.0.1:2222");
        assert_eq!(config.room.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.room.control_capacity, 16);
    }

    #[test]
    fn rejects_invalid_values() {
        let error = AppConfig::from_lookup(lookup(&[("PORT", "ssh")]))
            .expect_err("non-numeric port should fail");
        assert!(error.to_string().contains("PORT has invalid value"));
        assert!(AppConfig::from_lookup(lookup(&[("ROOM_IDLE_TIMEOUT_SECS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("ROOM_CONTROL_CAPACITY", "0")])).is_err());
    }
}
