//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::util::time::DEFAULT_TICK_RATE_HZ;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines (`LOG_FORMAT=json`)
    pub log_json: bool,

    /// Maximum simultaneous matches
    pub max_matches: usize,
    /// Default players per match
    pub match_capacity: usize,
    /// Simulation ticks per second
    pub tick_rate_hz: u32,
    /// Fixed RNG seed for reproducible match tokens and spawn jitter
    pub rng_seed: Option<u64>,

    /// Allowed client origins for CORS (comma separated, `*` for any)
    pub client_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT takes precedence over SERVER_ADDR
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.trim().eq_ignore_ascii_case("json")),

            max_matches: parse_positive(&lookup, "MAX_MATCHES", 16)?,
            match_capacity: parse_positive(&lookup, "MATCH_CAPACITY", 8)?,
            tick_rate_hz: parse_positive(&lookup, "TICK_RATE_HZ", DEFAULT_TICK_RATE_HZ as usize)?
                as u32,
            rng_seed: lookup("RNG_SEED")
                .map(|raw| raw.trim().parse::<u64>())
                .transpose()
                .map_err(|_| ConfigError::InvalidNumber("RNG_SEED"))?,

            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
        })
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidNumber(key)),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Environment variable {0} must be a positive integer")]
    InvalidNumber(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.max_matches, 16);
        assert_eq!(config.match_capacity, 8);
        assert_eq!(config.tick_rate_hz, 25);
        assert_eq!(config.client_origin, "*");
        assert!(!config.log_json);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_rng_seed_parsed() {
        let config = Config::from_lookup(lookup_from(&[("RNG_SEED", "42")])).unwrap();
        assert_eq!(config.rng_seed, Some(42));
        let err = Config::from_lookup(lookup_from(&[("RNG_SEED", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber("RNG_SEED")));
    }

    #[test]
    fn test_json_log_format() {
        let config = Config::from_lookup(lookup_from(&[("LOG_FORMAT", "JSON")])).unwrap();
        assert!(config.log_json);
    }

    #[test]
    fn test_port_overrides_server_addr() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("SERVER_ADDR", "127.0.0.1:7000"),
        ]))
        .unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Config::from_lookup(lookup_from(&[("MAX_MATCHES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber("MAX_MATCHES")));
    }

    #[test]
    fn test_bad_address_rejected() {
        let err = Config::from_lookup(lookup_from(&[("SERVER_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress));
    }
}
