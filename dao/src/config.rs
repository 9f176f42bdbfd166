//! DAO deployment configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use hopestream_types::{Address, AntiSybilParams, GovernanceParams, ProgressiveCurve};
use hopestream_utils::LogFormat;

use crate::DaoError;

/// Identities and parameters for one DAO deployment.
///
/// Can be loaded from a TOML file via [`DaoConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaoConfig {
    /// Privileged vault administrator; also administers the timelock.
    #[serde(default = "default_admin")]
    pub admin: Address,

    /// Initial recipient of milestone releases.
    #[serde(default = "default_beneficiary")]
    pub beneficiary: Address,

    /// Optional automation identity allowed to trigger releases.
    #[serde(default)]
    pub relayer: Option<Address>,

    #[serde(default = "default_vault")]
    pub vault: Address,

    /// Governance identity of the vault once wired.
    #[serde(default = "default_timelock")]
    pub timelock: Address,

    #[serde(default = "default_governor")]
    pub governor: Address,

    #[serde(default)]
    pub anti_sybil: AntiSybilParams,

    #[serde(default)]
    pub curve: ProgressiveCurve,

    #[serde(default)]
    pub governance: GovernanceParams,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_admin() -> Address {
    Address::repeat_byte(0x01)
}

fn default_beneficiary() -> Address {
    Address::repeat_byte(0x02)
}

fn default_vault() -> Address {
    Address::repeat_byte(0x10)
}

fn default_timelock() -> Address {
    Address::repeat_byte(0x11)
}

fn default_governor() -> Address {
    Address::repeat_byte(0x12)
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaoConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, DaoError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaoError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, DaoError> {
        toml::from_str(s).map_err(|e| DaoError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, DaoError> {
        toml::to_string_pretty(self).map_err(|e| DaoError::Config(e.to_string()))
    }

    /// Check parameters and identities before wiring a DAO from them.
    pub fn validate(&self) -> Result<(), DaoError> {
        self.anti_sybil.validate()?;
        self.governance.validate()?;
        let named = [
            ("admin", self.admin),
            ("beneficiary", self.beneficiary),
            ("vault", self.vault),
            ("timelock", self.timelock),
            ("governor", self.governor),
        ];
        for (name, addr) in named {
            if addr.is_zero() {
                return Err(DaoError::Config(format!("{name} address must be non-zero")));
            }
        }
        if self.relayer.is_some_and(|r| r.is_zero()) {
            return Err(DaoError::Config("relayer address must be non-zero".into()));
        }
        let components = [self.vault, self.timelock, self.governor];
        for (i, a) in components.iter().enumerate() {
            if components[i + 1..].contains(a) {
                return Err(DaoError::Config(format!(
                    "vault, timelock and governor must be distinct ({a} repeats)"
                )));
            }
        }
        Ok(())
    }
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            beneficiary: default_beneficiary(),
            relayer: None,
            vault: default_vault(),
            timelock: default_timelock(),
            governor: default_governor(),
            anti_sybil: AntiSybilParams::default(),
            curve: ProgressiveCurve::default(),
            governance: GovernanceParams::default(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
