use std::collections::HashMap;

use agora_core::{ExpirationLog, MarketId, Price};
use agora_fundamentals::Fundamentals;
use log::{debug, info};

use crate::{Market, MarketError, MarketResult};

/// Parameters of the fundamental process driving one market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundamentalParams {
    pub initial: Price,
    pub drift: f64,
    pub volatility: f64,
}

/// Owner of every market and of the shared fundamental generator
///
/// Markets are stored in registration order, so a `MarketId` is an index
/// into [`Exchange::markets`]. Agents and events only ever see markets
/// through this arena.
#[derive(Debug)]
pub struct Exchange {
    markets: Vec<Market>,
    fundamentals: Fundamentals,
    names: HashMap<String, MarketId>,
    group_names: Vec<String>,
    groups: HashMap<String, Vec<MarketId>>,
}

impl Exchange {
    pub fn new(fundamentals: Fundamentals) -> Self {
        Self {
            markets: Vec::new(),
            fundamentals,
            names: HashMap::new(),
            group_names: Vec::new(),
            groups: HashMap::new(),
        }
    }

    /// Id the next registered market must carry
    pub fn next_market_id(&self) -> MarketId {
        self.markets.len()
    }

    /// Register a market, optionally under a group name.
    ///
    /// Continuous markets are also registered in the fundamental generator;
    /// index markets derive their fundamental from their components.
    pub fn add_market(
        &mut self,
        market: Market,
        fundamental: FundamentalParams,
        group_name: Option<&str>,
    ) -> MarketResult<MarketId> {
        let market_id = market.market_id();
        if market_id != self.markets.len() {
            return Err(MarketError::UnexpectedMarketId {
                expected: self.markets.len(),
                got: market_id,
            });
        }
        if self.names.contains_key(market.name()) {
            return Err(MarketError::DuplicateMarketName(market.name().to_string()));
        }
        if !market.is_index() {
            self.fundamentals.add_market(
                market_id,
                fundamental.initial,
                fundamental.drift,
                fundamental.volatility,
                0,
            )?;
        }

        info!(
            "Registering market: id={}, name={}, index={}",
            market_id,
            market.name(),
            market.is_index()
        );
        self.names.insert(market.name().to_string(), market_id);
        if let Some(group_name) = group_name {
            if !self.groups.contains_key(group_name) {
                self.group_names.push(group_name.to_string());
            }
            self.groups
                .entry(group_name.to_string())
                .or_default()
                .push(market_id);
        }
        self.markets.push(market);
        Ok(market_id)
    }

    /// Attach an already registered market to an already registered index
    pub fn add_index_component(&mut self, index_id: MarketId, component_id: MarketId) -> MarketResult<()> {
        if index_id == component_id {
            return Err(MarketError::DuplicateComponent(component_id));
        }
        let component = self.market(component_id)?;
        if component.is_index() {
            return Err(MarketError::NotIndexMarket(component_id));
        }
        let (index, component) = pair_mut(&mut self.markets, index_id, component_id)?;
        index.add_component(component)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn markets_mut(&mut self) -> &mut [Market] {
        &mut self.markets
    }

    pub fn market(&self, market_id: MarketId) -> MarketResult<&Market> {
        self.markets
            .get(market_id)
            .ok_or(MarketError::UnknownMarket(market_id))
    }

    pub fn market_mut(&mut self, market_id: MarketId) -> MarketResult<&mut Market> {
        self.markets
            .get_mut(market_id)
            .ok_or(MarketError::UnknownMarket(market_id))
    }

    pub fn market_id(&self, name: &str) -> Option<MarketId> {
        self.names.get(name).copied()
    }

    pub fn market_by_name(&self, name: &str) -> MarketResult<&Market> {
        let market_id = self
            .market_id(name)
            .ok_or_else(|| MarketError::UnknownMarketName(name.to_string()))?;
        self.market(market_id)
    }

    /// Markets registered under `group_name`, in registration order
    pub fn group(&self, group_name: &str) -> Option<&[MarketId]> {
        self.groups.get(group_name).map(Vec::as_slice)
    }

    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    /// Resolve a group name, or failing that a single market name
    pub fn resolve(&self, name: &str) -> MarketResult<Vec<MarketId>> {
        if let Some(ids) = self.group(name) {
            return Ok(ids.to_vec());
        }
        self.market_id(name)
            .map(|id| vec![id])
            .ok_or_else(|| MarketError::UnknownMarketName(name.to_string()))
    }

    pub fn fundamentals(&self) -> &Fundamentals {
        &self.fundamentals
    }

    pub fn fundamentals_mut(&mut self) -> &mut Fundamentals {
        &mut self.fundamentals
    }

    pub fn set_running_all(&mut self, running: bool) {
        for market in self.markets.iter_mut() {
            market.set_running(running);
        }
    }

    /// Move every market one step forward.
    ///
    /// Continuous markets go first so that index markets read component
    /// fundamentals of the new step.
    pub fn advance_markets(&mut self) -> MarketResult<Vec<ExpirationLog>> {
        let mut logs = Vec::new();
        for market in self.markets.iter_mut().filter(|m| !m.is_index()) {
            let next_time = market.get_time() + 1;
            let next = self
                .fundamentals
                .get_fundamental_price(market.market_id(), next_time)?;
            logs.extend(market.update_time(next));
        }

        for position in 0..self.markets.len() {
            if !self.markets[position].is_index() {
                continue;
            }
            let index = &self.markets[position];
            let next = index.compute_fundamental_index(index.get_time() + 1, &self.markets)?;
            logs.extend(self.markets[position].update_time(next));
        }
        debug!("advanced {} markets, {} expirations", self.markets.len(), logs.len());
        Ok(logs)
    }

    /// Scale the current fundamental price of a market by `scale`
    pub fn change_fundamental_price(&mut self, market_id: MarketId, scale: f64) -> MarketResult<()> {
        let market = self
            .markets
            .get_mut(market_id)
            .ok_or(MarketError::UnknownMarket(market_id))?;
        market.change_fundamental_price(scale, &mut self.fundamentals)
    }
}

fn pair_mut(
    markets: &mut [Market],
    first: MarketId,
    second: MarketId,
) -> MarketResult<(&mut Market, &Market)> {
    if first >= markets.len() {
        return Err(MarketError::UnknownMarket(first));
    }
    if second >= markets.len() {
        return Err(MarketError::UnknownMarket(second));
    }
    if first < second {
        let (head, tail) = markets.split_at_mut(second);
        Ok((&mut head[first], &tail[0]))
    } else {
        let (head, tail) = markets.split_at_mut(first);
        Ok((&mut tail[0], &head[second]))
    }
}
