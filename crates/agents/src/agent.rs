//! Agent contract and shared portfolio state

use std::collections::BTreeMap;

use agora_config::{JsonRandom, Settings};
use agora_core::{Action, AgentId, CancelLog, ExecutionLog, MarketId, OrderLog, Volume};
use agora_market::Exchange;
use rand::rngs::StdRng;

use crate::{AgentError, AgentResult};

/// Identity, portfolio and private PRNG of one agent
#[derive(Debug, Clone)]
pub struct AgentBase {
    agent_id: AgentId,
    name: String,
    cash_amount: f64,
    /// Presence of a key marks the market as accessible
    asset_volumes: BTreeMap<MarketId, Volume>,
    rng: StdRng,
}

impl AgentBase {
    pub fn new(agent_id: AgentId, name: impl Into<String>, rng: StdRng) -> Self {
        Self {
            agent_id,
            name: name.into(),
            cash_amount: 0.0,
            asset_volumes: BTreeMap::new(),
            rng,
        }
    }

    /// Read `cashAmount` and `assetVolume` (scalars or distributions) and open
    /// every accessible market. Asset volumes are truncated to integers.
    pub fn setup(&mut self, settings: &Settings, accessible_markets: &[MarketId]) -> AgentResult<()> {
        self.cash_amount = settings.random_f64("cashAmount", &mut self.rng)?;
        let asset_volume = settings.required("assetVolume")?.clone();
        for &market_id in accessible_markets {
            self.set_market_accessible(market_id)?;
            let volume = JsonRandom::new(&mut self.rng).random(&asset_volume)?;
            self.set_asset_volume(market_id, volume as Volume)?;
        }
        Ok(())
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cash_amount(&self) -> f64 {
        self.cash_amount
    }

    pub fn set_cash_amount(&mut self, cash_amount: f64) {
        self.cash_amount = cash_amount;
    }

    pub fn update_cash_amount(&mut self, delta: f64) {
        self.cash_amount += delta;
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn asset_volumes(&self) -> &BTreeMap<MarketId, Volume> {
        &self.asset_volumes
    }

    /// Accessible markets in id order
    pub fn accessible_market_ids(&self) -> Vec<MarketId> {
        self.asset_volumes.keys().copied().collect()
    }

    pub fn is_market_accessible(&self, market_id: MarketId) -> bool {
        self.asset_volumes.contains_key(&market_id)
    }

    pub fn set_market_accessible(&mut self, market_id: MarketId) -> AgentResult<()> {
        if self.is_market_accessible(market_id) {
            return Err(AgentError::AlreadyAccessible {
                agent_id: self.agent_id,
                market_id,
            });
        }
        self.asset_volumes.insert(market_id, 0);
        Ok(())
    }

    pub fn get_asset_volume(&self, market_id: MarketId) -> AgentResult<Volume> {
        self.asset_volumes
            .get(&market_id)
            .copied()
            .ok_or(AgentError::NotAccessible {
                agent_id: self.agent_id,
                market_id,
            })
    }

    pub fn set_asset_volume(&mut self, market_id: MarketId, volume: Volume) -> AgentResult<()> {
        *self.volume_mut(market_id)? = volume;
        Ok(())
    }

    pub fn update_asset_volume(&mut self, market_id: MarketId, delta: Volume) -> AgentResult<()> {
        *self.volume_mut(market_id)? += delta;
        Ok(())
    }

    fn volume_mut(&mut self, market_id: MarketId) -> AgentResult<&mut Volume> {
        let agent_id = self.agent_id;
        self.asset_volumes
            .get_mut(&market_id)
            .ok_or(AgentError::NotAccessible { agent_id, market_id })
    }
}

/// A trading participant
///
/// The simulator calls [`Agent::submit_orders`] with read-only access to all
/// markets; the agent answers with orders and cancels stamped with its own
/// id. Portfolio changes happen only through settlement, never inside
/// `submit_orders`.
pub trait Agent: Send {
    fn base(&self) -> &AgentBase;

    fn base_mut(&mut self) -> &mut AgentBase;

    /// Class name used in configuration files
    fn class_name(&self) -> &str;

    /// Read class-specific settings. Called once, after every market exists.
    fn setup(
        &mut self,
        settings: &Settings,
        accessible_markets: &[MarketId],
        exchange: &Exchange,
    ) -> AgentResult<()>;

    /// Decide this step's orders and cancels
    fn submit_orders(&mut self, exchange: &Exchange) -> AgentResult<Vec<Action>>;

    /// High-frequency agents are sampled from a separate pool after the
    /// normal agents of each step
    fn is_high_frequency(&self) -> bool {
        false
    }

    /// Called when one of this agent's orders was accepted
    fn submitted_order(&mut self, _log: &OrderLog) {}

    /// Called after settlement of a fill involving this agent
    fn executed_order(&mut self, _log: &ExecutionLog) {}

    /// Called when one of this agent's cancels was accepted
    fn canceled_order(&mut self, _log: &CancelLog) {}

    fn agent_id(&self) -> AgentId {
        self.base().agent_id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::json;

    fn base() -> AgentBase {
        AgentBase::new(3, "Agent-3", StdRng::seed_from_u64(1))
    }

    #[test]
    fn test_setup_reads_portfolio() {
        let settings = Settings::from_value(json!({
            "cashAmount": 10000,
            "assetVolume": [50, 60],
        }))
        .unwrap();
        let mut agent = base();
        agent.setup(&settings, &[0, 2]).unwrap();

        assert_eq!(agent.cash_amount(), 10000.0);
        assert_eq!(agent.accessible_market_ids(), vec![0, 2]);
        for market_id in [0, 2] {
            let volume = agent.get_asset_volume(market_id).unwrap();
            assert!((50..60).contains(&volume));
        }
        assert!(!agent.is_market_accessible(1));
    }

    #[test]
    fn test_setup_requires_portfolio_keys() {
        let settings = Settings::from_value(json!({"cashAmount": 10})).unwrap();
        assert!(matches!(
            base().setup(&settings, &[0]),
            Err(AgentError::Config(_))
        ));
        let settings = Settings::from_value(json!({"assetVolume": 10})).unwrap();
        assert!(base().setup(&settings, &[0]).is_err());
    }

    #[test]
    fn test_volume_updates_need_access() {
        let mut agent = base();
        assert!(matches!(
            agent.update_asset_volume(0, 1),
            Err(AgentError::NotAccessible { agent_id: 3, market_id: 0 })
        ));
        agent.set_market_accessible(0).unwrap();
        assert!(agent.set_market_accessible(0).is_err());
        agent.update_asset_volume(0, 5).unwrap();
        agent.update_asset_volume(0, -7).unwrap();
        assert_eq!(agent.get_asset_volume(0).unwrap(), -2);

        agent.update_cash_amount(-12.5);
        assert_eq!(agent.cash_amount(), -12.5);
    }
}
