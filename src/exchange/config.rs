use std::time::Duration;

const HOUR: u64 = 3600;
const DEFAULT_TTL: Duration = Duration::from_secs(24 * HOUR);
const DEFAULT_MAX_TTL: Duration = Duration::from_secs(7 * 24 * HOUR);

/// Predefined configuration presets for common deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Production configuration.
    ///
    /// - Default TTL: 24 hours
    /// - Maximum TTL: 7 days
    /// - Sweep interval: 10 minutes
    Production,

    /// Development-friendly configuration.
    ///
    /// Short lifetimes so expiry can be observed by hand:
    /// - Default TTL: 1 hour
    /// - Maximum TTL: 24 hours
    /// - Sweep interval: 1 minute
    Development,

    /// Load configuration from environment variables.
    ///
    /// Reads configuration from:
    /// - `ONCE_SHARE_DEFAULT_TTL_HOURS` (default: 24)
    /// - `ONCE_SHARE_MAX_TTL_HOURS` (default: 168)
    /// - `ONCE_SHARE_SWEEP_INTERVAL_SECS` (default: 600)
    /// - `ONCE_SHARE_MAX_GENERATION_ATTEMPTS` (default: 3)
    FromEnv,
}

/// Configuration for an exchange store.
///
/// # Example
///
/// ```rust
/// use once_share::ExchangeConfig;
/// use std::time::Duration;
///
/// let config = ExchangeConfig {
///     default_ttl: Duration::from_secs(2 * 3600),
///     ..ExchangeConfig::default()
/// };
/// assert!(config.validate().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Lifetime applied when a create request names none (or a zero one)
    pub default_ttl: Duration,
    /// Upper bound on caller-supplied lifetimes; longer requests are clamped
    pub max_ttl: Duration,
    /// How often the reclamation sweeper runs
    pub sweep_interval: Duration,
    /// Handle generation attempts per create before giving up
    pub max_generation_attempts: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_ttl: DEFAULT_MAX_TTL,
            sweep_interval: Duration::from_secs(600),
            max_generation_attempts: 3,
        }
    }
}

impl ExchangeConfig {
    /// Builds a configuration from `ONCE_SHARE_*` environment variables.
    ///
    /// Absent or unparseable values fall back to the production defaults,
    /// as do zero TTLs.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_u64("ONCE_SHARE_DEFAULT_TTL_HOURS")
                .filter(|h| *h > 0)
                .map(|h| Duration::from_secs(h.saturating_mul(HOUR)))
                .unwrap_or(defaults.default_ttl),
            max_ttl: env_u64("ONCE_SHARE_MAX_TTL_HOURS")
                .filter(|h| *h > 0)
                .map(|h| Duration::from_secs(h.saturating_mul(HOUR)))
                .unwrap_or(defaults.max_ttl),
            sweep_interval: env_u64("ONCE_SHARE_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            max_generation_attempts: std::env::var("ONCE_SHARE_MAX_GENERATION_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_generation_attempts),
        }
    }

    /// Resolves the lifetime of a new share.
    ///
    /// `None` and zero select `default_ttl`; anything above `max_ttl` is
    /// clamped down to it. A zero `default_ttl` or `max_ttl` is treated as
    /// unset, so the result is never zero.
    pub fn resolve_ttl(&self, requested: Option<Duration>) -> Duration {
        let max_ttl = non_zero_or(self.max_ttl, DEFAULT_MAX_TTL);
        let default_ttl = non_zero_or(self.default_ttl, DEFAULT_TTL);
        match requested {
            Some(ttl) if !ttl.is_zero() => ttl.min(max_ttl),
            _ => default_ttl.min(max_ttl),
        }
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.default_ttl.is_zero() {
            warnings.push("Default TTL is zero; the 24 hour default applies".to_string());
        } else if self.default_ttl.as_secs() < 60 {
            warnings.push(
                "Very short default TTL (< 1 minute) leaves recipients little time".to_string(),
            );
        }
        if !self.max_ttl.is_zero() && self.default_ttl > self.max_ttl {
            warnings.push("Default TTL exceeds maximum TTL and will be clamped".to_string());
        }
        if self.max_ttl.is_zero() {
            warnings.push("Maximum TTL is zero; the 7 day default applies".to_string());
        } else if self.max_ttl.as_secs() > 30 * 24 * HOUR {
            warnings.push("Long maximum TTL (> 30 days) keeps secrets in memory".to_string());
        }

        if self.sweep_interval.as_secs() < 60 {
            warnings.push(
                "Very short sweep interval (< 1 minute) adds lock contention for no benefit"
                    .to_string(),
            );
        }

        if self.max_generation_attempts == 0 {
            warnings.push("Zero generation attempts makes every create fail".to_string());
        }

        warnings
    }

    /// Returns a summary of the current configuration.
    pub fn summary(&self) -> String {
        format!(
            "ExchangeConfig {{ Default TTL: {}s, Max TTL: {}s, Sweep Interval: {}s, Generation Attempts: {} }}",
            self.default_ttl.as_secs(),
            self.max_ttl.as_secs(),
            self.sweep_interval.as_secs(),
            self.max_generation_attempts,
        )
    }
}

impl From<ConfigPreset> for ExchangeConfig {
    fn from(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Production => Self::default(),
            ConfigPreset::Development => Self {
                default_ttl: Duration::from_secs(HOUR),
                max_ttl: Duration::from_secs(24 * HOUR),
                sweep_interval: Duration::from_secs(60),
                max_generation_attempts: 3,
            },
            ConfigPreset::FromEnv => Self::from_env(),
        }
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() { fallback } else { value }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
