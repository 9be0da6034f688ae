use agora_config::Settings;
use agora_core::{
    Cancel, CancelLog, EventId, ExecutionLog, MarketId, Order, OrderLog, Session, SessionId, Time,
};
use agora_market::Exchange;
use rand::rngs::StdRng;

use crate::{EventHook, EventResult};

/// Identity of an event and the session that created it
#[derive(Debug, Clone)]
pub struct EventBase {
    event_id: EventId,
    name: String,
    session_id: SessionId,
    session_start_time: Time,
    rng: StdRng,
}

impl EventBase {
    pub fn new(event_id: EventId, name: impl Into<String>, session: &Session, rng: StdRng) -> Self {
        Self {
            event_id,
            name: name.into(),
            session_id: session.session_id,
            session_start_time: session.start_time,
            rng,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn session_start_time(&self) -> Time {
        self.session_start_time
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

/// Something that reacts to the step loop through hooks
///
/// Only the callbacks matching the hooks returned by
/// [`Event::hook_registration`] are ever called. Order and cancel callbacks
/// that run before the action may rewrite it in place.
pub trait Event: Send {
    fn base(&self) -> &EventBase;

    fn class_name(&self) -> &str;

    /// Read class-specific settings. Called once, after every market and
    /// agent exists.
    fn setup(&mut self, settings: &Settings, exchange: &Exchange) -> EventResult<()>;

    fn hook_registration(&self) -> EventResult<Vec<EventHook>>;

    fn before_order(&mut self, _exchange: &mut Exchange, _order: &mut Order) -> EventResult<()> {
        Ok(())
    }

    fn after_order(&mut self, _exchange: &mut Exchange, _log: &OrderLog) -> EventResult<()> {
        Ok(())
    }

    fn before_cancel(&mut self, _exchange: &mut Exchange, _cancel: &mut Cancel) -> EventResult<()> {
        Ok(())
    }

    fn after_cancel(&mut self, _exchange: &mut Exchange, _log: &CancelLog) -> EventResult<()> {
        Ok(())
    }

    fn after_execution(&mut self, _exchange: &mut Exchange, _log: &ExecutionLog) -> EventResult<()> {
        Ok(())
    }

    fn before_session(&mut self, _exchange: &mut Exchange, _session: &Session) -> EventResult<()> {
        Ok(())
    }

    fn after_session(&mut self, _exchange: &mut Exchange, _session: &Session) -> EventResult<()> {
        Ok(())
    }

    fn before_step_for_market(
        &mut self,
        _exchange: &mut Exchange,
        _market_id: MarketId,
    ) -> EventResult<()> {
        Ok(())
    }

    fn after_step_for_market(
        &mut self,
        _exchange: &mut Exchange,
        _market_id: MarketId,
    ) -> EventResult<()> {
        Ok(())
    }

    fn event_id(&self) -> EventId {
        self.base().event_id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }
}

/// Markets named by a `targetMarkets` list of group or market names
pub(crate) fn resolve_targets(settings: &Settings, exchange: &Exchange) -> EventResult<Vec<MarketId>> {
    let mut targets = Vec::new();
    for name in settings.str_list("targetMarkets")? {
        for market_id in exchange.resolve(&name)? {
            if !targets.contains(&market_id) {
                targets.push(market_id);
            }
        }
    }
    Ok(targets)
}
