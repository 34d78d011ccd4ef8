use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_QUOTE: &str = "USD";

#[derive(Error, Debug, PartialEq)]
pub enum AlertError {
    #[error("Invalid trading pair '{0}': expected BASE/QUOTE, e.g. BTC/USDT")]
    InvalidPair(String),
    #[error("Invalid price threshold '{0}': must be a positive number")]
    InvalidThreshold(String),
    #[error("Invalid condition '{0}': expected 'above' or 'below'")]
    InvalidCondition(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Above,
    Below,
}

impl Condition {
    /// Strict comparison: a price sitting exactly on the threshold never triggers.
    pub fn is_met(self, price: f64, threshold: f64) -> bool {
        match self {
            Condition::Above => price > threshold,
            Condition::Below => price < threshold,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Above => write!(f, "above"),
            Condition::Below => write!(f, "below"),
        }
    }
}

impl FromStr for Condition {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Condition::Above),
            "below" => Ok(Condition::Below),
            other => Err(AlertError::InvalidCondition(other.to_string())),
        }
    }
}

/// A BASE/QUOTE pair as typed by the user, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    /// Display label, e.g. `BTC/USDT`.
    pub fn name(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Exchange symbol used for price lookups, e.g. `BTC-USDT`.
    pub fn symbol(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        let mut parts = normalized.split(['/', '-']);

        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => Ok(Self {
                base: base.to_string(),
                quote: quote.to_string(),
            }),
            _ => Err(AlertError::InvalidPair(s.trim().to_string())),
        }
    }
}

/// A persisted watch rule on a trading pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub name: String,
    pub symbol: String,
    pub condition: Condition,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    /// None means the default alert sound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_file: Option<PathBuf>,
}

impl Alert {
    /// Builds an alert from a user-typed pair such as `btc/usdt` or `ETH-USDT`.
    pub fn from_pair(pair: &str, condition: Condition, price: f64) -> Result<Self, AlertError> {
        let pair: TradingPair = pair.parse()?;

        if !price.is_finite() || price <= 0.0 {
            return Err(AlertError::InvalidThreshold(price.to_string()));
        }

        Ok(Self {
            name: pair.name(),
            symbol: pair.symbol(),
            condition,
            price,
            quote: Some(pair.quote),
            sound_file: None,
        })
    }

    pub fn with_sound(mut self, sound_file: PathBuf) -> Self {
        self.sound_file = Some(sound_file);
        self
    }

    pub fn quote_label(&self) -> &str {
        self.quote.as_deref().unwrap_or(DEFAULT_QUOTE)
    }

    pub fn evaluate(&self, price: f64) -> bool {
        self.condition.is_met(price, self.price)
    }

    pub fn trigger_message(&self, observed: f64) -> String {
        format!(
            "🚨 ALERT! {} price is {} {} {} (current: {} {})",
            self.name,
            self.condition,
            self.price,
            self.quote_label(),
            observed,
            self.quote_label()
        )
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} {}",
            self.name,
            self.condition,
            self.price,
            self.quote_label()
        )?;
        if let Some(sound) = self.sound_file.as_ref().and_then(|p| p.file_name()) {
            write!(f, " - Sound: {}", sound.to_string_lossy())?;
        }
        Ok(())
    }
}

pub fn evaluate(alert: &Alert, price: f64) -> bool {
    alert.evaluate(price)
}

/// Parses a threshold typed by the user.
pub fn parse_threshold(input: &str) -> Result<f64, AlertError> {
    match input.trim().parse::<f64>() {
        Ok(p) if p.is_finite() && p > 0.0 => Ok(p),
        _ => Err(AlertError::InvalidThreshold(input.trim().to_string())),
    }
}
