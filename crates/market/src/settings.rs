use agora_config::{ConfigError, Settings};
use agora_core::Price;

use crate::{MarketError, MarketResult};

/// Market parameters read from one market settings object
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSettings {
    pub tick_size: f64,
    /// Price at time 0; falls back to `fundamentalPrice`
    pub market_price: Price,
    /// Fundamental at time 0; falls back to `marketPrice`
    pub fundamental_price: Price,
    pub outstanding_shares: Option<i64>,
    pub fundamental_drift: f64,
    pub fundamental_volatility: f64,
}

impl MarketSettings {
    pub fn from_settings(settings: &Settings) -> MarketResult<Self> {
        let tick_size = settings.required_f64("tickSize")?;
        if tick_size <= 0.0 {
            return Err(MarketError::InvalidTickSize(tick_size));
        }

        let market_price = settings.optional_f64("marketPrice")?;
        let fundamental_price = settings.optional_f64("fundamentalPrice")?;
        let (market_price, fundamental_price) = match (market_price, fundamental_price) {
            (Some(m), Some(f)) => (m, f),
            (Some(m), None) => (m, m),
            (None, Some(f)) => (f, f),
            (None, None) => {
                return Err(ConfigError::Missing("fundamentalPrice or marketPrice".to_string()).into());
            }
        };

        let outstanding_shares = settings.optional_i64("outstandingShares")?;
        if let Some(shares) = outstanding_shares {
            if shares <= 0 {
                return Err(MarketError::InvalidOutstandingShares(shares));
            }
        }

        Ok(Self {
            tick_size,
            market_price,
            fundamental_price,
            outstanding_shares,
            fundamental_drift: settings.optional_f64("fundamentalDrift")?.unwrap_or(0.0),
            fundamental_volatility: settings
                .optional_f64("fundamentalVolatility")?
                .unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> MarketResult<MarketSettings> {
        MarketSettings::from_settings(&Settings::from_value(value).unwrap())
    }

    #[test]
    fn test_price_fallbacks() {
        let s = parse(json!({"tickSize": 0.01, "marketPrice": 300.0})).unwrap();
        assert_eq!(s.fundamental_price, 300.0);
        assert_eq!(s.fundamental_drift, 0.0);
        assert_eq!(s.fundamental_volatility, 0.0);

        let s = parse(json!({"tickSize": 0.01, "fundamentalPrice": 250.0, "fundamentalDrift": 0.001}))
            .unwrap();
        assert_eq!(s.market_price, 250.0);
        assert_eq!(s.fundamental_drift, 0.001);
    }

    #[test]
    fn test_required_fields() {
        assert!(matches!(
            parse(json!({"marketPrice": 300.0})),
            Err(MarketError::Config(ConfigError::Missing(k))) if k == "tickSize"
        ));
        assert!(matches!(
            parse(json!({"tickSize": 0.01})),
            Err(MarketError::Config(ConfigError::Missing(_)))
        ));
        assert!(matches!(
            parse(json!({"tickSize": 0.0, "marketPrice": 1.0})),
            Err(MarketError::InvalidTickSize(_))
        ));
        assert!(matches!(
            parse(json!({"tickSize": 0.01, "marketPrice": 1.0, "outstandingShares": 1.5})),
            Err(MarketError::Config(ConfigError::InvalidType { .. }))
        ));
    }
}
