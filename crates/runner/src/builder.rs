//! Simulation setup from a JSON document
//!
//! Markets, agents and sessions are listed by type name under `simulation`;
//! each type name points at a top-level settings object that may `extends`
//! another one and may expand into several instances (`numMarkets`,
//! `numAgents`, or a `from`/`to` id range).

use agora_agents::AgentBase;
use agora_config::{ConfigError, ConfigResult, Settings, json_extends};
use agora_core::{EventId, MarketId, Session};
use agora_events::EventBase;
use agora_fundamentals::Fundamentals;
use agora_market::{Exchange, FundamentalParams, MarketError, MarketSettings};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::registry::ClassRegistry;
use crate::session::SessionSettings;
use crate::simulator::Simulator;
use crate::SimulationResult;

const INSTANCE_FIELDS: [&str; 3] = ["from", "to", "prefix"];

/// Builds a [`Simulator`] from a parsed configuration document
pub struct SimulationBuilder<'a> {
    whole: &'a Map<String, Value>,
    simulation: Settings,
    registry: &'a ClassRegistry,
    rng: StdRng,
}

impl<'a> SimulationBuilder<'a> {
    pub fn new(config: &'a Value, registry: &'a ClassRegistry, seed: u64) -> ConfigResult<Self> {
        let whole = config.as_object().ok_or_else(|| ConfigError::InvalidType {
            key: "(root)".to_string(),
            expected: "an object",
        })?;
        let simulation = whole
            .get("simulation")
            .cloned()
            .ok_or_else(|| ConfigError::Missing("simulation".to_string()))?;
        Ok(Self {
            whole,
            simulation: Settings::from_value(simulation)?,
            registry,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// `simulation.numParallel`, if present
    pub fn num_parallel(&self) -> ConfigResult<Option<usize>> {
        match self.simulation.optional_i64("numParallel")? {
            Some(n) if n < 1 => Err(ConfigError::InvalidValue {
                key: "simulation.numParallel".to_string(),
                reason: format!("must be positive, got {n}"),
            }),
            Some(n) => Ok(Some(n as usize)),
            None => Ok(None),
        }
    }

    /// Derive every PRNG from the root seed and register markets,
    /// correlations, agents, sessions and their events, in that order
    pub fn build(mut self) -> SimulationResult<Simulator> {
        let driver_rng = StdRng::seed_from_u64(self.rng.r#gen());
        let fundamentals = Fundamentals::with_rng(StdRng::seed_from_u64(self.rng.r#gen()));
        let mut simulator = Simulator::new(Exchange::new(fundamentals), driver_rng);

        self.generate_markets(simulator.exchange_mut())?;
        self.set_fundamental_correlations(simulator.exchange_mut())?;
        self.generate_agents(&mut simulator)?;
        self.generate_sessions(&mut simulator)?;

        info!(
            "Simulation built: {} markets, {} agents, {} sessions, {} events",
            simulator.exchange().len(),
            simulator.n_agents(),
            simulator.sessions().len(),
            simulator.n_events()
        );
        Ok(simulator)
    }

    /// Settings object named `name` with its `extends` chain resolved
    fn resolved(&self, name: &str, count_key: Option<&str>) -> ConfigResult<(Settings, Instances)> {
        let raw = self
            .whole
            .get(name)
            .and_then(Value::as_object)
            .ok_or_else(|| ConfigError::UnknownName(name.to_string()))?;
        let raw_settings = Settings::from_value(Value::Object(raw.clone()))?;
        let instances = match count_key {
            Some(count_key) => Instances::from_settings(name, &raw_settings, count_key)?,
            None => Instances::single(name),
        };

        let mut excludes: Vec<&str> = INSTANCE_FIELDS.to_vec();
        excludes.extend(count_key);
        let merged = json_extends(self.whole, name, raw, &excludes)?;
        Ok((Settings::from_value(Value::Object(merged))?, instances))
    }

    fn generate_markets(&self, exchange: &mut Exchange) -> SimulationResult<()> {
        for type_name in self.simulation.str_list("markets")? {
            let (settings, instances) = self.resolved(&type_name, Some("numMarkets"))?;
            let factory = self.registry.market(settings.required_str("class")?)?;
            let market_settings = MarketSettings::from_settings(&settings)?;
            let fundamental = FundamentalParams {
                initial: market_settings.fundamental_price,
                drift: market_settings.fundamental_drift,
                volatility: market_settings.fundamental_volatility,
            };

            for name in instances.names() {
                let market = factory(exchange.next_market_id(), &name, &market_settings)?;
                let is_index = market.is_index();
                let market_id = exchange.add_market(market, fundamental, Some(&type_name))?;
                if is_index {
                    for component_id in resolve_all(exchange, &settings.str_list("markets")?)? {
                        exchange.add_index_component(market_id, component_id)?;
                    }
                }
            }
        }
        info!("{} markets registered", exchange.len());
        Ok(())
    }

    fn set_fundamental_correlations(&self, exchange: &mut Exchange) -> SimulationResult<()> {
        let Some(correlations) = self.simulation.get("fundamentalCorrelations") else {
            return Ok(());
        };
        let correlations = correlations.as_object().ok_or_else(|| ConfigError::InvalidType {
            key: "simulation.fundamentalCorrelations".to_string(),
            expected: "an object",
        })?;

        for (kind, value) in correlations {
            if kind != "pairwise" {
                return Err(ConfigError::InvalidValue {
                    key: format!("simulation.fundamentalCorrelations.{kind}"),
                    reason: "only pairwise correlations are supported".to_string(),
                }
                .into());
            }
            for (market_id1, market_id2, corr) in pairwise(exchange, value)? {
                exchange
                    .fundamentals_mut()
                    .set_correlation(market_id1, market_id2, corr, 0)
                    .map_err(MarketError::from)?;
            }
        }
        Ok(())
    }

    fn generate_agents(&mut self, simulator: &mut Simulator) -> SimulationResult<()> {
        for type_name in self.simulation.str_list("agents")? {
            let (settings, instances) = self.resolved(&type_name, Some("numAgents"))?;
            let factory = self.registry.agent(settings.required_str("class")?)?;
            let accessible = resolve_all(simulator.exchange(), &settings.str_list("markets")?)?;

            for name in instances.names() {
                let rng = StdRng::seed_from_u64(self.rng.r#gen());
                let mut agent = factory(AgentBase::new(simulator.n_agents(), name, rng));
                agent.setup(&settings, &accessible, simulator.exchange())?;
                simulator.add_agent(agent, Some(&type_name))?;
            }
        }
        info!("{} agents registered", simulator.n_agents());
        Ok(())
    }

    /// Sessions run back to back from time 0; each carries its own events
    fn generate_sessions(&mut self, simulator: &mut Simulator) -> SimulationResult<()> {
        let entries = self
            .simulation
            .required("sessions")?
            .as_array()
            .ok_or_else(|| ConfigError::InvalidType {
                key: "simulation.sessions".to_string(),
                expected: "a list of objects",
            })?
            .clone();

        let mut start_time = 0;
        for (session_id, entry) in entries.iter().enumerate() {
            let session_settings = SessionSettings::from_value(entry)?;
            let event_names = session_settings.events.clone();
            let session = session_settings.into_session(session_id, start_time);
            start_time = session.next_start_time();

            for event_name in event_names {
                let event_id: EventId = simulator.n_events();
                self.generate_event(simulator, &session, event_id, &event_name)?;
            }
            simulator.add_session(session);
        }
        Ok(())
    }

    fn generate_event(
        &mut self,
        simulator: &mut Simulator,
        session: &Session,
        event_id: EventId,
        name: &str,
    ) -> SimulationResult<()> {
        let (settings, _) = self.resolved(name, None)?;
        let factory = self.registry.event(settings.required_str("class")?)?;
        let rng = StdRng::seed_from_u64(self.rng.r#gen());
        let mut event = factory(EventBase::new(event_id, name, session, rng));
        event.setup(&settings, simulator.exchange())?;
        simulator.add_event(event)?;
        Ok(())
    }
}

/// How many instances one settings object expands to, and their names
#[derive(Debug, Clone, PartialEq)]
struct Instances {
    prefix: String,
    ids: std::ops::Range<i64>,
}

impl Instances {
    fn single(name: &str) -> Self {
        Self {
            prefix: name.to_string(),
            ids: 0..1,
        }
    }

    fn from_settings(name: &str, settings: &Settings, count_key: &str) -> ConfigResult<Self> {
        let count = settings.optional_i64(count_key)?;
        let from = settings.optional_i64("from")?;
        let to = settings.optional_i64("to")?;

        let ids = match (count, from, to) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(ConfigError::Inconsistent(format!(
                    "{name}.{count_key} and {name}.from/{name}.to cannot be used together"
                )));
            }
            (None, Some(from), Some(to)) => from..to,
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(ConfigError::Inconsistent(format!(
                    "both {name}.from and {name}.to are required"
                )));
            }
            (Some(count), None, None) => 0..count,
            (None, None, None) => 0..1,
        };
        if ids.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: name.to_string(),
                reason: format!("expands to no instances ({}..{})", ids.start, ids.end),
            });
        }

        let prefix = match settings.optional_str("prefix")? {
            Some(prefix) => prefix.to_string(),
            None if ids.end - ids.start > 1 => format!("{name}-"),
            None => name.to_string(),
        };
        Ok(Self { prefix, ids })
    }

    /// The id is appended only when there is more than one instance
    fn names(&self) -> Vec<String> {
        if self.ids.end - self.ids.start == 1 {
            return vec![self.prefix.clone()];
        }
        self.ids.clone().map(|i| format!("{}{}", self.prefix, i)).collect()
    }
}

/// Market ids named by a list of group or market names, in list order
fn resolve_all(exchange: &Exchange, names: &[String]) -> SimulationResult<Vec<MarketId>> {
    let mut market_ids = Vec::new();
    for name in names {
        market_ids.extend(exchange.resolve(name)?);
    }
    Ok(market_ids)
}

/// `[[name, name, rho], ...]` resolved to market ids
fn pairwise(exchange: &Exchange, value: &Value) -> SimulationResult<Vec<(MarketId, MarketId, f64)>> {
    let invalid = || ConfigError::InvalidType {
        key: "simulation.fundamentalCorrelations.pairwise".to_string(),
        expected: "a list of [market name, market name, correlation]",
    };
    let entries = value.as_array().ok_or_else(invalid)?;

    let mut pairs = Vec::with_capacity(entries.len());
    for entry in entries {
        let (first, second, corr) = match entry.as_array().map(Vec::as_slice) {
            Some([Value::String(first), Value::String(second), corr]) => {
                (first, second, corr.as_f64().ok_or_else(invalid)?)
            }
            _ => return Err(invalid().into()),
        };
        let market_id = |name: &str| {
            exchange
                .market_id(name)
                .ok_or_else(|| MarketError::UnknownMarketName(name.to_string()))
        };
        pairs.push((market_id(first)?, market_id(second)?, corr));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulationError;
    use serde_json::json;

    fn instances(value: Value) -> ConfigResult<Instances> {
        Instances::from_settings("Agents", &Settings::from_value(value).unwrap(), "numAgents")
    }

    fn market_only_config() -> Value {
        json!({
            "simulation": {
                "markets": ["Spot", "Index"],
                "agents": ["Noise"],
                "sessions": [
                    {"sessionName": "warmup", "iterationSteps": 10, "withOrderPlacement": true,
                     "withOrderExecution": false, "withPrint": false},
                    {"sessionName": "main", "iterationSteps": 20, "withOrderPlacement": true,
                     "withOrderExecution": true, "withPrint": false, "events": ["Limit"]}
                ],
                "fundamentalCorrelations": {"pairwise": [["Spot-0", "Spot-1", 0.5]]},
                "numParallel": 2
            },
            "Spot": {
                "class": "Market",
                "numMarkets": 2,
                "tickSize": 0.01,
                "marketPrice": 300.0,
                "outstandingShares": 1000,
                "fundamentalVolatility": 0.001
            },
            "Index": {
                "class": "IndexMarket",
                "extends": "Spot",
                "markets": ["Spot"]
            },
            "Noise": {
                "class": "TestAgent",
                "from": 10,
                "to": 13,
                "prefix": "noise-",
                "cashAmount": 10000,
                "assetVolume": 50,
                "markets": ["Spot"]
            },
            "Limit": {
                "class": "PriceLimitRule",
                "targetMarkets": ["Spot"],
                "triggerChangeRate": 0.1
            }
        })
    }

    #[test]
    fn test_instance_names() {
        let names = instances(json!({"numAgents": 3})).unwrap().names();
        assert_eq!(names, vec!["Agents-0", "Agents-1", "Agents-2"]);

        let names = instances(json!({})).unwrap().names();
        assert_eq!(names, vec!["Agents"]);

        let names = instances(json!({"from": 5, "to": 7, "prefix": "a"})).unwrap().names();
        assert_eq!(names, vec!["a5", "a6"]);

        let names = instances(json!({"numAgents": 1, "prefix": "solo"})).unwrap().names();
        assert_eq!(names, vec!["solo"]);
    }

    #[test]
    fn test_instance_errors() {
        assert!(matches!(
            instances(json!({"numAgents": 3, "from": 0, "to": 3})),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            instances(json!({"from": 0})),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            instances(json!({"from": 4, "to": 4})),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_build() {
        let config = market_only_config();
        let registry = ClassRegistry::default();
        let builder = SimulationBuilder::new(&config, &registry, 3).unwrap();
        assert_eq!(builder.num_parallel().unwrap(), Some(2));
        let simulator = builder.build().unwrap();

        let exchange = simulator.exchange();
        assert_eq!(exchange.len(), 3);
        assert_eq!(exchange.group("Spot"), Some(&[0, 1][..]));
        let index = exchange.market_by_name("Index").unwrap();
        assert!(index.is_index());
        assert_eq!(index.components(), &[0, 1]);
        assert_eq!(exchange.fundamentals().correlation(0, 1), Some(0.5));

        let names: Vec<&str> = simulator.agents().map(|agent| agent.name()).collect();
        assert_eq!(names, vec!["noise-10", "noise-11", "noise-12"]);
        assert_eq!(simulator.agent_group("Noise"), Some(&[0, 1, 2][..]));
        assert_eq!(simulator.agent(1).unwrap().base().cash_amount(), 10_000.0);

        let sessions = simulator.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].start_time, 10);
        assert_eq!(sessions[1].end_time(), 29);

        let limits = simulator.events_by_name("Limit");
        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].base().session_id(), 1);
    }

    #[test]
    fn test_same_seed_same_agents() {
        let config = market_only_config();
        let registry = ClassRegistry::default();
        let build = |seed| SimulationBuilder::new(&config, &registry, seed).unwrap().build().unwrap();
        let first = build(11);
        let second = build(11);
        let times: Vec<i64> = (0..=20).collect();
        let fundamentals = |simulator: &Simulator| {
            let mut fundamentals = simulator.exchange().fundamentals().clone();
            fundamentals.get_fundamental_prices(0, &times).unwrap()
        };
        assert_eq!(fundamentals(&first), fundamentals(&second));
        assert_eq!(
            first.agent(0).unwrap().base().asset_volumes(),
            second.agent(0).unwrap().base().asset_volumes()
        );
    }

    #[test]
    fn test_unknown_class_and_name() {
        let mut config = market_only_config();
        config["Noise"]["class"] = json!("Martian");
        let registry = ClassRegistry::default();
        let result = SimulationBuilder::new(&config, &registry, 0).unwrap().build();
        assert!(matches!(result, Err(SimulationError::Config(ConfigError::UnknownClass(_)))));

        let mut config = market_only_config();
        config["simulation"]["agents"] = json!(["Nobody"]);
        let result = SimulationBuilder::new(&config, &registry, 0).unwrap().build();
        assert!(matches!(result, Err(SimulationError::Config(ConfigError::UnknownName(_)))));
    }

    #[test]
    fn test_unknown_market_reference() {
        let mut config = market_only_config();
        config["Noise"]["markets"] = json!(["Nowhere"]);
        let registry = ClassRegistry::default();
        let result = SimulationBuilder::new(&config, &registry, 0).unwrap().build();
        assert!(matches!(
            result,
            Err(SimulationError::Market(MarketError::UnknownMarketName(_)))
        ));
    }

    #[test]
    fn test_missing_simulation() {
        let registry = ClassRegistry::default();
        assert!(matches!(
            SimulationBuilder::new(&json!({}), &registry, 0),
            Err(ConfigError::Missing(_))
        ));
    }
}
