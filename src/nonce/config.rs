use std::time::Duration;

use crate::NonceError;

/// Length of a nonce in the reference design.
pub const DEFAULT_NONCE_LENGTH: usize = 32;

/// Time-to-live of a nonce in the reference design.
///
/// Short enough to make expiry observable in tests; production deployments
/// should pick a value that fits their threat model.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_millis(250);

/// Predefined configuration presets for common deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Reference configuration.
    ///
    /// - TTL: 250 milliseconds
    /// - Nonce length: 32 characters
    Testing,

    /// Production-ready configuration.
    ///
    /// - TTL: 5 minutes (enough for a caller to knock and then act)
    /// - Nonce length: 32 characters
    Production,

    /// High-security configuration.
    ///
    /// - TTL: 30 seconds
    /// - Nonce length: 48 characters
    HighSecurity,

    /// Load configuration from environment variables.
    ///
    /// Reads configuration from:
    /// - `PEASANT_NONCE_TTL_MS`: TTL in milliseconds (default: 250)
    /// - `PEASANT_NONCE_LENGTH`: Nonce length in characters (default: 32)
    FromEnv,
}

/// Configuration of nonce issuance on the bastion.
///
/// # Environment Variables
///
/// `NonceConfig::default()` honours:
/// - `PEASANT_NONCE_TTL_MS`: TTL in milliseconds (default: 250)
/// - `PEASANT_NONCE_LENGTH`: Nonce length in characters (default: 32)
///
/// # Example
///
/// ```rust
/// use peasant::NonceConfig;
/// use std::time::Duration;
///
/// let config = NonceConfig {
///     ttl: Duration::from_secs(60),
///     nonce_length: 32,
/// };
/// assert!(config.validate().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct NonceConfig {
    /// How long an issued nonce stays consumable
    pub ttl: Duration,
    /// Number of characters in a generated nonce
    pub nonce_length: usize,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            ttl: std::env::var("PEASANT_NONCE_TTL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_NONCE_TTL),
            nonce_length: std::env::var("PEASANT_NONCE_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_NONCE_LENGTH),
        }
    }
}

impl NonceConfig {
    /// Validates the configuration and returns any warnings.
    ///
    /// Warnings describe settings that work but are likely a mistake. Settings
    /// that cannot work at all are reported by [`NonceConfig::ensure_usable`].
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.ttl < Duration::from_millis(100) {
            warnings.push(
                "Very short TTL (< 100 milliseconds) may expire nonces before callers use them"
                    .to_string(),
            );
        }
        if self.ttl > Duration::from_secs(3600) {
            warnings.push("Long TTL (> 1 hour) widens the replay window".to_string());
        }
        if self.nonce_length < 16 {
            warnings.push(
                "Short nonce length (< 16 characters) makes collisions and guessing feasible"
                    .to_string(),
            );
        }

        warnings
    }

    /// Rejects settings that cannot produce a working bastion.
    pub fn ensure_usable(&self) -> Result<(), NonceError> {
        if self.ttl.is_zero() {
            return Err(NonceError::ConfigError(
                "nonce TTL must be greater than zero".to_string(),
            ));
        }
        if self.nonce_length == 0 {
            return Err(NonceError::ConfigError(
                "nonce length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a summary of the current configuration.
    pub fn summary(&self) -> String {
        format!(
            "NonceConfig {{ TTL: {}ms, Nonce length: {} }}",
            self.ttl.as_millis(),
            self.nonce_length,
        )
    }
}

impl From<ConfigPreset> for NonceConfig {
    fn from(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Testing => Self {
                ttl: DEFAULT_NONCE_TTL,
                nonce_length: DEFAULT_NONCE_LENGTH,
            },
            ConfigPreset::Production => Self {
                ttl: Duration::from_secs(300),
                nonce_length: DEFAULT_NONCE_LENGTH,
            },
            ConfigPreset::HighSecurity => Self {
                ttl: Duration::from_secs(30),
                nonce_length: 48,
            },
            ConfigPreset::FromEnv => Self::default(),
        }
    }
}
