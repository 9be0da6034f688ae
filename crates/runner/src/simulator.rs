//! Simulator - owner of everything a run touches
//!
//! Markets live in the [`Exchange`] arena; agents and events are stored by
//! id. The simulator exposes the building blocks of one step (advance,
//! order intake, execution and settlement, hook dispatch) and the runners
//! in [`crate::runner`] sequence them.

use std::collections::HashMap;

use agora_agents::Agent;
use agora_core::{
    Action, AgentId, Cancel, CancelLog, EventId, ExecutionLog, Log, MarketId, MarketStepLog, Order,
    OrderLog, Session, SessionBeginLog, SessionEndLog, SessionId, SimulationBeginLog,
    SimulationEndLog, Time,
};
use agora_events::{DispatchPoint, Event, EventHook};
use agora_market::Exchange;
use agora_ports::Logger;
use log::{debug, info};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::loggers::LogBus;
use crate::{SimulationError, SimulationResult};

/// Hook indices filed by time; `None` collects hooks firing at every time
type DispatchTable = [HashMap<Option<Time>, Vec<usize>>; DispatchPoint::COUNT];

/// One agent's actions for one step
pub type ActionBatch = (AgentId, Vec<Action>);

pub struct Simulator {
    exchange: Exchange,
    agents: Vec<Box<dyn Agent>>,
    agent_names: HashMap<String, AgentId>,
    agent_groups: HashMap<String, Vec<AgentId>>,
    normal_agents: Vec<AgentId>,
    high_frequency_agents: Vec<AgentId>,
    sessions: Vec<Session>,
    events: Vec<Box<dyn Event>>,
    event_names: HashMap<String, Vec<EventId>>,
    hooks: Vec<EventHook>,
    dispatch: DispatchTable,
    current_session: Option<SessionId>,
    /// Driver PRNG: agent sampling and the high-frequency coin flip
    rng: StdRng,
    bus: LogBus,
}

impl Simulator {
    pub fn new(exchange: Exchange, rng: StdRng) -> Self {
        Self {
            exchange,
            agents: Vec::new(),
            agent_names: HashMap::new(),
            agent_groups: HashMap::new(),
            normal_agents: Vec::new(),
            high_frequency_agents: Vec::new(),
            sessions: Vec::new(),
            events: Vec::new(),
            event_names: HashMap::new(),
            hooks: Vec::new(),
            dispatch: Default::default(),
            current_session: None,
            rng,
            bus: LogBus::new(),
        }
    }

    // ============ Registration ============

    /// Register an agent whose `setup` already ran
    pub fn add_agent(&mut self, agent: Box<dyn Agent>, group_name: Option<&str>) -> SimulationResult<AgentId> {
        let agent_id = agent.agent_id();
        if agent_id != self.agents.len() {
            return Err(SimulationError::UnexpectedAgentId {
                expected: self.agents.len(),
                got: agent_id,
            });
        }
        if self.agent_names.contains_key(agent.name()) {
            return Err(SimulationError::DuplicateName(agent.name().to_string()));
        }

        debug!(
            "Registering agent: id={}, name={}, class={}",
            agent_id,
            agent.name(),
            agent.class_name()
        );
        self.agent_names.insert(agent.name().to_string(), agent_id);
        if let Some(group_name) = group_name {
            self.agent_groups
                .entry(group_name.to_string())
                .or_default()
                .push(agent_id);
        }
        if agent.is_high_frequency() {
            self.high_frequency_agents.push(agent_id);
        } else {
            self.normal_agents.push(agent_id);
        }
        self.agents.push(agent);
        Ok(agent_id)
    }

    pub fn add_session(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// Register an event whose `setup` already ran and file its hooks
    pub fn add_event(&mut self, event: Box<dyn Event>) -> SimulationResult<EventId> {
        let event_id = event.event_id();
        if event_id != self.events.len() {
            return Err(SimulationError::UnexpectedEventId {
                expected: self.events.len(),
                got: event_id,
            });
        }

        for hook in event.hook_registration()? {
            if hook.event_id != event_id {
                return Err(SimulationError::ForeignHook {
                    event_id,
                    claimed: hook.event_id,
                });
            }
            let position = self.hooks.len();
            let slot = &mut self.dispatch[hook.dispatch_point().index()];
            match &hook.times {
                Some(times) => {
                    for &time in times {
                        slot.entry(Some(time)).or_default().push(position);
                    }
                }
                None => slot.entry(None).or_default().push(position),
            }
            self.hooks.push(hook);
        }

        debug!(
            "Registering event: id={}, name={}, class={}, session={}",
            event_id,
            event.name(),
            event.class_name(),
            event.base().session_id()
        );
        self.event_names
            .entry(event.name().to_string())
            .or_default()
            .push(event_id);
        self.events.push(event);
        Ok(event_id)
    }

    pub fn add_logger(&mut self, logger: Box<dyn Logger>) {
        self.bus.add_sink(logger);
    }

    // ============ Lookup ============

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn exchange_mut(&mut self) -> &mut Exchange {
        &mut self.exchange
    }

    pub fn agents(&self) -> impl Iterator<Item = &dyn Agent> {
        self.agents.iter().map(|agent| agent.as_ref())
    }

    pub fn n_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, agent_id: AgentId) -> SimulationResult<&dyn Agent> {
        self.agents
            .get(agent_id)
            .map(|agent| agent.as_ref())
            .ok_or(SimulationError::UnknownAgent(agent_id))
    }

    pub fn agent_mut(&mut self, agent_id: AgentId) -> SimulationResult<&mut Box<dyn Agent>> {
        self.agents
            .get_mut(agent_id)
            .ok_or(SimulationError::UnknownAgent(agent_id))
    }

    pub fn agent_by_name(&self, name: &str) -> Option<&dyn Agent> {
        let agent_id = *self.agent_names.get(name)?;
        self.agents.get(agent_id).map(|agent| agent.as_ref())
    }

    pub fn agent_group(&self, group_name: &str) -> Option<&[AgentId]> {
        self.agent_groups.get(group_name).map(Vec::as_slice)
    }

    pub fn normal_agent_ids(&self) -> &[AgentId] {
        &self.normal_agents
    }

    pub fn high_frequency_agent_ids(&self) -> &[AgentId] {
        &self.high_frequency_agents
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.current_session
    }

    pub fn n_events(&self) -> usize {
        self.events.len()
    }

    pub fn event(&self, event_id: EventId) -> Option<&dyn Event> {
        self.events.get(event_id).map(|event| event.as_ref())
    }

    /// Every event instance carrying `name`, one per session that lists it
    pub fn events_by_name(&self, name: &str) -> Vec<&dyn Event> {
        self.event_names
            .get(name)
            .map(|ids| ids.iter().filter_map(|&id| self.event(id)).collect())
            .unwrap_or_default()
    }

    pub fn change_fundamental_price(&mut self, market_id: MarketId, scale: f64) -> SimulationResult<()> {
        self.exchange.change_fundamental_price(market_id, scale)?;
        Ok(())
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    // ============ Run scopes ============

    pub fn begin_simulation(&mut self) {
        info!(
            "Simulation begins: {} markets, {} agents, {} sessions, {} events",
            self.exchange.len(),
            self.agents.len(),
            self.sessions.len(),
            self.events.len()
        );
        self.bus.write(SimulationBeginLog {
            n_markets: self.exchange.len(),
            n_agents: self.agents.len(),
            n_sessions: self.sessions.len(),
        });
    }

    /// Emit the closing record and flush every sink.
    ///
    /// Fails with the first output error any sink hit during the run.
    pub fn end_simulation(&mut self) -> SimulationResult<()> {
        let final_time = self
            .exchange
            .markets()
            .iter()
            .map(|market| market.get_time())
            .max()
            .unwrap_or(-1);
        self.bus.write(SimulationEndLog { final_time });
        let closed = self.bus.close();
        info!("Simulation ends at t={}", final_time);
        closed?;
        Ok(())
    }

    /// Open the markets for the session's execution mode, then fire
    /// session-before hooks
    pub fn begin_session(&mut self, session: &Session) -> SimulationResult<()> {
        info!(
            "Session {} ({}) begins at t={}",
            session.session_id, session.name, session.start_time
        );
        self.current_session = Some(session.session_id);
        self.exchange.set_running_all(session.with_order_execution);
        self.dispatch_before_session(session)?;
        self.bus.write(SessionBeginLog {
            session_id: session.session_id,
            session_name: session.name.clone(),
            start_time: session.start_time,
        });
        Ok(())
    }

    pub fn end_session(&mut self, session: &Session) -> SimulationResult<()> {
        self.dispatch_after_session(session)?;
        self.bus.write(SessionEndLog {
            session_id: session.session_id,
            session_name: session.name.clone(),
            end_time: session.end_time(),
        });
        self.bus.flush();
        info!("Session {} ({}) ends at t={}", session.session_id, session.name, session.end_time());
        Ok(())
    }

    /// Advance every market one step, then fire market-before hooks
    pub fn begin_step(&mut self, session: &Session) -> SimulationResult<()> {
        let expirations = self.exchange.advance_markets()?;
        self.bus.bulk_write(expirations);
        for market_id in 0..self.exchange.len() {
            self.dispatch_before_step_for_market(market_id)?;
            let snapshot = self.market_step_log(session, market_id)?;
            self.bus.write(Log::MarketStepBegin(snapshot));
        }
        Ok(())
    }

    /// Fire market-after hooks and flush the step's records
    pub fn end_step(&mut self, session: &Session) -> SimulationResult<()> {
        for market_id in 0..self.exchange.len() {
            self.dispatch_after_step_for_market(market_id)?;
            let snapshot = self.market_step_log(session, market_id)?;
            self.bus.write(Log::MarketStepEnd(snapshot));
        }
        self.bus.flush();
        Ok(())
    }

    fn market_step_log(&self, session: &Session, market_id: MarketId) -> SimulationResult<MarketStepLog> {
        let market = self.exchange.market(market_id)?;
        Ok(MarketStepLog {
            session_id: session.session_id,
            session_name: session.name.clone(),
            with_print: session.with_print,
            market_id,
            market_name: market.name().to_string(),
            market_time: market.get_time(),
            market_price: market.market_price().ok(),
            fundamental_price: market.fundamental_price().ok(),
        })
    }

    // ============ Agent sampling ============

    /// Normal agents in a fresh random order
    pub fn shuffled_normal_agents(&mut self) -> Vec<AgentId> {
        let mut agent_ids = self.normal_agents.clone();
        agent_ids.shuffle(&mut self.rng);
        agent_ids
    }

    /// Ask shuffled normal agents for actions until `max_normal_orders` of
    /// them returned something
    pub fn collect_normal_actions(&mut self, session: &Session) -> SimulationResult<Vec<ActionBatch>> {
        let mut batches = Vec::new();
        for agent_id in self.shuffled_normal_agents() {
            if batches.len() >= session.max_normal_orders {
                break;
            }
            let agent = self
                .agents
                .get_mut(agent_id)
                .ok_or(SimulationError::UnknownAgent(agent_id))?;
            let actions = agent.submit_orders(&self.exchange)?;
            if !actions.is_empty() {
                batches.push((agent_id, actions));
            }
        }
        Ok(batches)
    }

    /// High-frequency pass: skipped entirely unless a uniform draw falls
    /// within the session's submission rate. Each submitting agent's actions
    /// are handled before the next agent is asked.
    pub fn run_high_frequency_agents(&mut self, session: &Session) -> SimulationResult<()> {
        if self.high_frequency_agents.is_empty() {
            return Ok(());
        }
        if session.high_frequency_submission_rate < self.rng.r#gen::<f64>() {
            return Ok(());
        }
        let mut agent_ids = self.high_frequency_agents.clone();
        agent_ids.shuffle(&mut self.rng);

        let mut submitted = 0;
        for agent_id in agent_ids {
            if submitted >= session.max_high_frequency_orders {
                break;
            }
            let agent = self
                .agents
                .get_mut(agent_id)
                .ok_or(SimulationError::UnknownAgent(agent_id))?;
            let actions = agent.submit_orders(&self.exchange)?;
            if !actions.is_empty() {
                self.handle_actions(session, vec![(agent_id, actions)])?;
                submitted += 1;
            }
        }
        Ok(())
    }

    // ============ Order intake ============

    /// Apply batches in order. A batch carrying another agent's id is
    /// rejected before any of its actions reach a market.
    pub fn handle_actions(&mut self, session: &Session, batches: Vec<ActionBatch>) -> SimulationResult<()> {
        for (author, actions) in batches {
            if let Some(spoofed) = actions.iter().find(|action| action.agent_id() != author) {
                return Err(SimulationError::SpoofedAction {
                    author,
                    claimed: spoofed.agent_id(),
                });
            }
            for action in actions {
                match action {
                    Action::Order(order) => self.handle_order(session, order)?,
                    Action::Cancel(cancel) => self.handle_cancel(session, cancel)?,
                }
            }
        }
        Ok(())
    }

    fn handle_order(&mut self, session: &Session, mut order: Order) -> SimulationResult<()> {
        self.dispatch_before_order(&mut order)?;
        let market_id = order.market_id;
        let log = self.exchange.market_mut(market_id)?.add_order(order)?;
        self.agent_mut(log.agent_id)?.submitted_order(&log);
        self.bus.write(log.clone());
        self.dispatch_after_order(&log)?;
        self.execute(session, market_id)
    }

    fn handle_cancel(&mut self, session: &Session, mut cancel: Cancel) -> SimulationResult<()> {
        self.dispatch_before_cancel(&mut cancel)?;
        let market_id = cancel.market_id;
        let log = self.exchange.market_mut(market_id)?.cancel_order(&mut cancel)?;
        self.agent_mut(log.agent_id)?.canceled_order(&log);
        self.bus.write(log.clone());
        self.dispatch_after_cancel(&log)?;
        self.execute(session, market_id)
    }

    /// Match the market if the session executes orders and the market is
    /// open, settling every fill
    fn execute(&mut self, session: &Session, market_id: MarketId) -> SimulationResult<()> {
        if !session.with_order_execution {
            return Ok(());
        }
        let market = self.exchange.market_mut(market_id)?;
        if !market.is_running() {
            return Ok(());
        }
        for log in market.execution()? {
            self.settle(&log)?;
            self.bus.write(log.clone());
            self.dispatch_after_execution(&log)?;
        }
        Ok(())
    }

    /// Move cash and assets between the two sides of a fill
    fn settle(&mut self, log: &ExecutionLog) -> SimulationResult<()> {
        let notional = log.price * log.volume as f64;

        let buyer = self.agent_mut(log.buy_agent_id)?;
        buyer.base_mut().update_cash_amount(-notional);
        buyer.base_mut().update_asset_volume(log.market_id, log.volume)?;

        let seller = self.agent_mut(log.sell_agent_id)?;
        seller.base_mut().update_cash_amount(notional);
        seller.base_mut().update_asset_volume(log.market_id, -log.volume)?;

        self.agent_mut(log.buy_agent_id)?.executed_order(log);
        if log.sell_agent_id != log.buy_agent_id {
            self.agent_mut(log.sell_agent_id)?.executed_order(log);
        }
        Ok(())
    }

    // ============ Hook dispatch ============

    /// Events hooked at `point` for `time`: always-on hooks first, then the
    /// ones filed under `time`. Hooks whose market filter rejects
    /// `market_id` are left out.
    fn hooked_events(
        &self,
        point: DispatchPoint,
        time: Time,
        market_id: Option<MarketId>,
    ) -> SimulationResult<Vec<EventId>> {
        let slot = &self.dispatch[point.index()];
        let positions = slot
            .get(&None)
            .into_iter()
            .chain(slot.get(&Some(time)))
            .flatten();

        let mut event_ids = Vec::new();
        for &position in positions {
            let hook = &self.hooks[position];
            if let Some(market_id) = market_id {
                if !hook.accepts_market(self.exchange.market(market_id)?) {
                    continue;
                }
            }
            event_ids.push(hook.event_id);
        }
        Ok(event_ids)
    }

    fn dispatch_before_order(&mut self, order: &mut Order) -> SimulationResult<()> {
        let time = self.exchange.market(order.market_id)?.get_time();
        for event_id in self.hooked_events(DispatchPoint::BeforeOrder, time, None)? {
            self.events[event_id].before_order(&mut self.exchange, order)?;
        }
        Ok(())
    }

    fn dispatch_after_order(&mut self, log: &OrderLog) -> SimulationResult<()> {
        for event_id in self.hooked_events(DispatchPoint::AfterOrder, log.time, None)? {
            self.events[event_id].after_order(&mut self.exchange, log)?;
        }
        Ok(())
    }

    fn dispatch_before_cancel(&mut self, cancel: &mut Cancel) -> SimulationResult<()> {
        let time = self.exchange.market(cancel.market_id)?.get_time();
        for event_id in self.hooked_events(DispatchPoint::BeforeCancel, time, None)? {
            self.events[event_id].before_cancel(&mut self.exchange, cancel)?;
        }
        Ok(())
    }

    fn dispatch_after_cancel(&mut self, log: &CancelLog) -> SimulationResult<()> {
        for event_id in self.hooked_events(DispatchPoint::AfterCancel, log.cancel_time, None)? {
            self.events[event_id].after_cancel(&mut self.exchange, log)?;
        }
        Ok(())
    }

    fn dispatch_after_execution(&mut self, log: &ExecutionLog) -> SimulationResult<()> {
        for event_id in self.hooked_events(DispatchPoint::AfterExecution, log.time, None)? {
            self.events[event_id].after_execution(&mut self.exchange, log)?;
        }
        Ok(())
    }

    fn dispatch_before_session(&mut self, session: &Session) -> SimulationResult<()> {
        for event_id in self.hooked_events(DispatchPoint::BeforeSession, session.start_time, None)? {
            self.events[event_id].before_session(&mut self.exchange, session)?;
        }
        Ok(())
    }

    fn dispatch_after_session(&mut self, session: &Session) -> SimulationResult<()> {
        for event_id in self.hooked_events(DispatchPoint::AfterSession, session.end_time(), None)? {
            self.events[event_id].after_session(&mut self.exchange, session)?;
        }
        Ok(())
    }

    fn dispatch_before_step_for_market(&mut self, market_id: MarketId) -> SimulationResult<()> {
        let time = self.exchange.market(market_id)?.get_time();
        let point = DispatchPoint::BeforeStepForMarket;
        for event_id in self.hooked_events(point, time, Some(market_id))? {
            self.events[event_id].before_step_for_market(&mut self.exchange, market_id)?;
        }
        Ok(())
    }

    fn dispatch_after_step_for_market(&mut self, market_id: MarketId) -> SimulationResult<()> {
        let time = self.exchange.market(market_id)?.get_time();
        let point = DispatchPoint::AfterStepForMarket;
        for event_id in self.hooked_events(point, time, Some(market_id))? {
            self.events[event_id].after_step_for_market(&mut self.exchange, market_id)?;
        }
        Ok(())
    }
}

/// Mutable access to a subset of agents, in the order of `agent_ids`,
/// next to shared access to the exchange
pub(crate) fn split_agents<'a>(
    simulator: &'a mut Simulator,
    agent_ids: &[AgentId],
) -> SimulationResult<(Vec<&'a mut Box<dyn Agent>>, &'a Exchange)> {
    let mut rank = HashMap::with_capacity(agent_ids.len());
    for (position, &agent_id) in agent_ids.iter().enumerate() {
        if agent_id >= simulator.agents.len() {
            return Err(SimulationError::UnknownAgent(agent_id));
        }
        rank.insert(agent_id, position);
    }

    let mut selected: Vec<(usize, &'a mut Box<dyn Agent>)> = simulator
        .agents
        .iter_mut()
        .enumerate()
        .filter_map(|(agent_id, agent)| rank.get(&agent_id).map(|&position| (position, agent)))
        .collect();
    selected.sort_by_key(|(position, _)| *position);
    let agents = selected.into_iter().map(|(_, agent)| agent).collect();
    Ok((agents, &simulator.exchange))
}
