use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::money::Rate;
use crate::types::{RemainderPolicy, DEFAULT_REMAINDER_POLICY};

/// lowest monthly rate accepted by default
pub const MIN_RATE_PERCENT: u32 = 1;

/// highest monthly rate accepted by default
pub const MAX_RATE_PERCENT: u32 = 100;

/// longest loan term accepted by default (50 years)
pub const MAX_DURATION_MONTHS: u32 = 600;

/// window of the upcoming-payments view
pub const UPCOMING_WINDOW_DAYS: u32 = 7;

/// widest upcoming-payments window a config may ask for
pub const MAX_UPCOMING_WINDOW_DAYS: u32 = 366;

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub rate_bounds: RateBounds,
    pub max_duration_months: u32,
    pub remainder_policy: RemainderPolicy,
    pub upcoming_window_days: u32,
}

/// inclusive range of monthly rates the engine accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBounds {
    pub min_percent: u32,
    pub max_percent: u32,
}

impl RateBounds {
    pub fn new(min_percent: u32, max_percent: u32) -> Self {
        Self {
            min_percent,
            max_percent,
        }
    }

    pub fn contains(&self, rate: Rate) -> bool {
        (self.min_percent..=self.max_percent).contains(&rate.percent())
    }
}

impl Default for RateBounds {
    fn default() -> Self {
        Self::new(MIN_RATE_PERCENT, MAX_RATE_PERCENT)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rate_bounds: RateBounds::default(),
            max_duration_months: MAX_DURATION_MONTHS,
            remainder_policy: DEFAULT_REMAINDER_POLICY,
            upcoming_window_days: UPCOMING_WINDOW_DAYS,
        }
    }
}

impl LedgerConfig {
    /// reproduces schedules exactly as the legacy dashboard generated them
    pub fn legacy_compatible() -> Self {
        Self {
            remainder_policy: RemainderPolicy::Truncate,
            ..Self::default()
        }
    }

    /// parse and validate a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_bounds.min_percent > self.rate_bounds.max_percent {
            return Err(LedgerError::invalid(format!(
                "rate bounds are inverted: min {} > max {}",
                self.rate_bounds.min_percent, self.rate_bounds.max_percent
            )));
        }

        if self.max_duration_months == 0 {
            return Err(LedgerError::invalid("max_duration_months must be at least 1"));
        }

        if self.upcoming_window_days > MAX_UPCOMING_WINDOW_DAYS {
            return Err(LedgerError::invalid(format!(
                "upcoming_window_days {} exceeds the maximum of {}",
                self.upcoming_window_days, MAX_UPCOMING_WINDOW_DAYS
            )));
        }

        Ok(())
    }
}
