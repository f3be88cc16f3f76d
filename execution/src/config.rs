use commonware_utils::{from_hex_formatted, hex};
use peerless_types::{
    betting::{
        DEFAULT_MAX_REORGANIZATION_DEPTH, DEFAULT_ODDS_DIVISOR, MAX_SCRIPT_LENGTH, PERMILLE,
    },
    Script,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(self.as_ref()))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = from_hex_formatted(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a hex string"))?;
        Ok(Self(bytes))
    }
}

/// Betting state and payout policy, as read from YAML.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Heights of history kept for rollback.
    #[serde(default = "default_max_reorg_depth")]
    pub max_reorg_depth: u64,
    /// Fixed-point scale of oracle odds.
    #[serde(default = "default_odds_divisor")]
    pub odds_divisor: u32,
    /// Share of settled volume paid to the oracle operator.
    #[serde(default = "default_oracle_reward_permille")]
    pub oracle_reward_permille: u64,
    pub oracle_reward_script: HexBytes,
    #[serde(default = "default_chain_games_winner_permille")]
    pub chain_games_winner_permille: u64,
    #[serde(default = "default_chain_games_fee_permille")]
    pub chain_games_fee_permille: u64,
}

fn default_max_reorg_depth() -> u64 {
    DEFAULT_MAX_REORGANIZATION_DEPTH
}

fn default_odds_divisor() -> u32 {
    DEFAULT_ODDS_DIVISOR
}

fn default_oracle_reward_permille() -> u64 {
    24
}

fn default_chain_games_winner_permille() -> u64 {
    800
}

fn default_chain_games_fee_permille() -> u64 {
    20
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{field} must be at most {max} permille (got {value})")]
    PermilleOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("oracle_reward_script must be 1..={max} bytes (got {len})")]
    InvalidScript { len: usize, max: usize },
}

/// Payout amounts that depend on policy rather than on ledger state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutPolicy {
    pub odds_divisor: u32,
    pub oracle_reward_permille: u64,
    pub oracle_reward_script: Script,
    pub chain_games_winner_permille: u64,
    pub chain_games_fee_permille: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub max_reorg_depth: u64,
    pub payout: PayoutPolicy,
}

impl Config {
    /// Defaults for everything except the reward script.
    pub fn new(oracle_reward_script: Script) -> Self {
        Self {
            max_reorg_depth: default_max_reorg_depth(),
            odds_divisor: default_odds_divisor(),
            oracle_reward_permille: default_oracle_reward_permille(),
            oracle_reward_script: HexBytes(oracle_reward_script),
            chain_games_winner_permille: default_chain_games_winner_permille(),
            chain_games_fee_permille: default_chain_games_fee_permille(),
        }
    }

    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        ensure_nonzero("max_reorg_depth", self.max_reorg_depth)?;
        ensure_nonzero("odds_divisor", self.odds_divisor as u64)?;
        ensure_permille("oracle_reward_permille", self.oracle_reward_permille)?;
        ensure_permille(
            "chain_games_winner_permille",
            self.chain_games_winner_permille,
        )?;
        ensure_permille("chain_games_fee_permille", self.chain_games_fee_permille)?;
        let shares = self.chain_games_winner_permille + self.chain_games_fee_permille;
        if shares > PERMILLE {
            return Err(ConfigError::PermilleOutOfRange {
                field: "chain_games_winner_permille + chain_games_fee_permille",
                value: shares,
                max: PERMILLE,
            });
        }
        let script = self.oracle_reward_script.0;
        if script.is_empty() || script.len() > MAX_SCRIPT_LENGTH {
            return Err(ConfigError::InvalidScript {
                len: script.len(),
                max: MAX_SCRIPT_LENGTH,
            });
        }

        Ok(ValidatedConfig {
            max_reorg_depth: self.max_reorg_depth,
            payout: PayoutPolicy {
                odds_divisor: self.odds_divisor,
                oracle_reward_permille: self.oracle_reward_permille,
                oracle_reward_script: script,
                chain_games_winner_permille: self.chain_games_winner_permille,
                chain_games_fee_permille: self.chain_games_fee_permille,
            },
        })
    }
}

fn ensure_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn ensure_permille(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > PERMILLE {
        return Err(ConfigError::PermilleOutOfRange {
            field,
            value,
            max: PERMILLE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_defaults_apply() {
        let config = Config::from_yaml("oracle_reward_script: \"0x76a914\"\n").unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.max_reorg_depth, 100);
        assert_eq!(validated.payout.odds_divisor, 10_000);
        assert_eq!(validated.payout.oracle_reward_permille, 24);
        assert_eq!(validated.payout.oracle_reward_script, vec![0x76, 0xa9, 0x14]);
        assert_eq!(validated.payout.chain_games_winner_permille, 800);
        assert_eq!(validated.payout.chain_games_fee_permille, 20);
    }

    #[test]
    fn yaml_overrides_and_json_roundtrip() {
        let yaml = "max_reorg_depth: 10\nodds_divisor: 100\noracle_reward_permille: 0\noracle_reward_script: \"aa\"\n";
        let config = Config::from_yaml(yaml).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: Config = serde_json::from_str(&json).unwrap();
        let validated = decoded.validate().unwrap();
        assert_eq!(validated.max_reorg_depth, 10);
        assert_eq!(validated.payout.odds_divisor, 100);
        assert_eq!(validated.payout.oracle_reward_permille, 0);
    }

    #[test]
    fn missing_script_is_a_yaml_error() {
        assert!(matches!(
            Config::from_yaml("max_reorg_depth: 5\n"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            Config::from_yaml("oracle_reward_script: \"zz\"\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::new(vec![1]);
        config.max_reorg_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNonZero {
                field: "max_reorg_depth",
                ..
            })
        ));

        let mut config = Config::new(vec![1]);
        config.odds_divisor = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNonZero {
                field: "odds_divisor",
                ..
            })
        ));

        let mut config = Config::new(vec![1]);
        config.chain_games_winner_permille = 990;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PermilleOutOfRange { value: 1010, .. })
        ));

        assert!(matches!(
            Config::new(Vec::new()).validate(),
            Err(ConfigError::InvalidScript { len: 0, .. })
        ));
    }
}
