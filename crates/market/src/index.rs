use agora_core::{MarketId, Price, Time};

use crate::{Market, MarketError, MarketKind, MarketResult};

impl Market {
    /// Component markets of an index, empty for a continuous market
    pub fn components(&self) -> &[MarketId] {
        match self.kind() {
            MarketKind::Index { components } => components.as_slice(),
            MarketKind::Continuous => &[],
        }
    }

    /// Register `component` in this index
    pub fn add_component(&mut self, component: &Market) -> MarketResult<()> {
        let market_id = self.market_id();
        let component_id = component.market_id();
        if component.outstanding_shares().is_none() {
            return Err(MarketError::MissingOutstandingShares(component_id));
        }
        let MarketKind::Index { components } = self.kind_mut() else {
            return Err(MarketError::NotIndexMarket(market_id));
        };
        if components.contains(&component_id) {
            return Err(MarketError::DuplicateComponent(component_id));
        }
        components.push(component_id);
        Ok(())
    }

    pub fn compute_market_index(&self, time: Time, markets: &[Market]) -> MarketResult<Price> {
        self.weighted_average(markets, |market| market.get_market_price(time))
    }

    pub fn compute_fundamental_index(&self, time: Time, markets: &[Market]) -> MarketResult<Price> {
        self.weighted_average(markets, |market| market.get_fundamental_price(time))
    }

    /// Index value at `time`, from component market prices
    pub fn get_index(&self, time: Time, markets: &[Market]) -> MarketResult<Price> {
        self.compute_market_index(time, markets)
    }

    pub fn is_all_markets_running(&self, markets: &[Market]) -> MarketResult<bool> {
        for id in self.components() {
            if !lookup(markets, *id)?.is_running() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn weighted_average<F>(&self, markets: &[Market], price_of: F) -> MarketResult<Price>
    where
        F: Fn(&Market) -> MarketResult<Price>,
    {
        if !self.is_index() {
            return Err(MarketError::NotIndexMarket(self.market_id()));
        }
        let mut total_value = 0.0;
        let mut total_shares: i64 = 0;
        for id in self.components() {
            let market = lookup(markets, *id)?;
            let shares = market
                .outstanding_shares()
                .ok_or(MarketError::MissingOutstandingShares(*id))?;
            total_value += price_of(market)? * shares as f64;
            total_shares += shares;
        }
        if total_shares == 0 {
            return Err(MarketError::MissingValue {
                series: "index components",
                time: self.get_time(),
            });
        }
        Ok(total_value / total_shares as f64)
    }
}

fn lookup(markets: &[Market], market_id: MarketId) -> MarketResult<&Market> {
    markets
        .get(market_id)
        .ok_or(MarketError::UnknownMarket(market_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn component(market_id: MarketId, price: Price, shares: i64) -> Market {
        let mut market = Market::new(market_id, format!("Market-{market_id}"), 0.01, price)
            .unwrap()
            .with_outstanding_shares(Some(shares));
        market.update_time(price);
        market
    }

    #[test]
    fn test_equal_shares_is_mean() {
        let markets = vec![component(0, 300.0, 1000), component(1, 310.0, 1000)];
        let mut index = Market::new_index(2, "Index", 0.01, 305.0).unwrap();
        index.add_component(&markets[0]).unwrap();
        index.add_component(&markets[1]).unwrap();

        assert_relative_eq!(index.compute_fundamental_index(0, &markets).unwrap(), 305.0);
        assert_relative_eq!(index.get_index(0, &markets).unwrap(), 305.0);
    }

    #[test]
    fn test_share_weighting() {
        let markets = vec![component(0, 100.0, 3000), component(1, 200.0, 1000)];
        let mut index = Market::new_index(2, "Index", 0.01, 125.0).unwrap();
        index.add_component(&markets[0]).unwrap();
        index.add_component(&markets[1]).unwrap();
        assert_relative_eq!(index.compute_market_index(0, &markets).unwrap(), 125.0);
    }

    #[test]
    fn test_component_registration_rules() {
        let markets = vec![component(0, 300.0, 1000)];
        let bare = Market::new(1, "Bare", 0.01, 300.0).unwrap();
        let mut index = Market::new_index(2, "Index", 0.01, 300.0).unwrap();

        index.add_component(&markets[0]).unwrap();
        assert!(matches!(
            index.add_component(&markets[0]),
            Err(MarketError::DuplicateComponent(0))
        ));
        assert!(matches!(
            index.add_component(&bare),
            Err(MarketError::MissingOutstandingShares(1))
        ));

        let mut continuous = component(3, 300.0, 1000);
        assert!(matches!(
            continuous.add_component(&markets[0]),
            Err(MarketError::NotIndexMarket(3))
        ));
        assert!(continuous.components().is_empty());
    }

    #[test]
    fn test_all_markets_running() {
        let mut markets = vec![component(0, 300.0, 1000), component(1, 300.0, 1000)];
        let mut index = Market::new_index(2, "Index", 0.01, 300.0).unwrap();
        index.add_component(&markets[0]).unwrap();
        index.add_component(&markets[1]).unwrap();

        assert!(!index.is_all_markets_running(&markets).unwrap());
        for market in markets.iter_mut() {
            market.set_running(true);
        }
        assert!(index.is_all_markets_running(&markets).unwrap());
    }
}
