use crate::{
    amount::Amount,
    error::ConfigError,
};
use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MIN_DEPOSIT: Amount = Amount::from_whole(1);
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 3;
/// Storage key of the remembered provider labels.
pub const SESSION_KEY: &str = "connectedWallets";

pub const POLL_INTERVAL_ENV: &str = "PRESALE_POLL_INTERVAL_MS";
pub const MIN_DEPOSIT_ENV: &str = "PRESALE_MIN_DEPOSIT";
pub const SESSION_FILE_ENV: &str = "PRESALE_SESSION_FILE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Period of the background synchronization.
    pub poll_interval: Duration,
    /// Smallest deposit the dispatcher forwards to the chain.
    pub min_deposit: Amount,
    /// Decimal places used when rendering the wallet balance.
    pub display_decimals: u32,
    pub session_key: String,
    pub session_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_deposit: DEFAULT_MIN_DEPOSIT,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
            session_key: SESSION_KEY.to_string(),
            session_path: session_store::default_store_path(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` returns.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: POLL_INTERVAL_ENV,
                reason: format!("'{raw}' is not a number of milliseconds"),
            })?;
            if millis == 0 {
                return Err(ConfigError::Invalid {
                    key: POLL_INTERVAL_ENV,
                    reason: "poll interval must be positive".to_string(),
                });
            }
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(MIN_DEPOSIT_ENV) {
            config.min_deposit = raw.parse().map_err(|e| ConfigError::Invalid {
                key: MIN_DEPOSIT_ENV,
                reason: format!("{e}"),
            })?;
        }

        if let Some(raw) = lookup(SESSION_FILE_ENV) {
            config.session_path = session_store::resolve_store_path(Some(&raw));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(
        pairs: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key: &str| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn from_lookup__nothing_set__uses_defaults() {
        let config = SyncConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.min_deposit, Amount::from_whole(1));
    }

    #[test]
    fn from_lookup__overrides_are_applied() {
        // given
        let lookup = lookup_from(&[
            (POLL_INTERVAL_ENV, "250"),
            (MIN_DEPOSIT_ENV, "0.5"),
            (SESSION_FILE_ENV, "/tmp/presale/session.json"),
        ]);

        // when
        let config = SyncConfig::from_lookup(lookup).unwrap();

        // then
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.min_deposit, "0.5".parse::<Amount>().unwrap());
        assert_eq!(config.session_path, PathBuf::from("/tmp/presale/session.json"));
    }

    #[test]
    fn from_lookup__zero_or_garbage_interval__is_rejected() {
        let zero = SyncConfig::from_lookup(lookup_from(&[(POLL_INTERVAL_ENV, "0")]));
        assert!(matches!(zero, Err(ConfigError::Invalid { key, .. }) if key == POLL_INTERVAL_ENV));
        let garbage = SyncConfig::from_lookup(lookup_from(&[(POLL_INTERVAL_ENV, "soon")]));
        assert!(garbage.is_err());
    }

    #[test]
    fn from_lookup__bad_minimum__is_rejected() {
        let result = SyncConfig::from_lookup(lookup_from(&[(MIN_DEPOSIT_ENV, "one")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key, .. }) if key == MIN_DEPOSIT_ENV));
    }
}
