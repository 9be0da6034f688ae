use agora_core::{EventId, MarketId, Time};
use agora_market::Market;

use crate::{EventError, EventResult};

/// The kind of action a hook watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookType {
    Order,
    Cancel,
    Execution,
    Session,
    Market,
}

/// Restricts a market hook to some markets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketFilter {
    /// Continuous markets only
    Continuous,
    /// Index markets only
    Index,
    /// One market
    Instance(MarketId),
}

impl MarketFilter {
    pub fn accepts(&self, market: &Market) -> bool {
        match self {
            MarketFilter::Continuous => !market.is_index(),
            MarketFilter::Index => market.is_index(),
            MarketFilter::Instance(market_id) => market.market_id() == *market_id,
        }
    }
}

/// The nine places in the step loop where hooks fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchPoint {
    BeforeOrder,
    AfterOrder,
    BeforeCancel,
    AfterCancel,
    AfterExecution,
    BeforeSession,
    AfterSession,
    BeforeStepForMarket,
    AfterStepForMarket,
}

impl DispatchPoint {
    pub const COUNT: usize = 9;

    pub const ALL: [DispatchPoint; Self::COUNT] = [
        DispatchPoint::BeforeOrder,
        DispatchPoint::AfterOrder,
        DispatchPoint::BeforeCancel,
        DispatchPoint::AfterCancel,
        DispatchPoint::AfterExecution,
        DispatchPoint::BeforeSession,
        DispatchPoint::AfterSession,
        DispatchPoint::BeforeStepForMarket,
        DispatchPoint::AfterStepForMarket,
    ];

    /// Slot in a dispatch table of `COUNT` entries
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Subscription of one event to one dispatch point
///
/// `times == None` fires at every time; otherwise only at the listed times.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHook {
    pub event_id: EventId,
    pub hook_type: HookType,
    pub is_before: bool,
    pub times: Option<Vec<Time>>,
    pub market_filter: Option<MarketFilter>,
}

impl EventHook {
    pub fn new(event_id: EventId, hook_type: HookType, is_before: bool) -> EventResult<Self> {
        if hook_type == HookType::Execution && is_before {
            return Err(EventError::BeforeHookNotAllowed(hook_type));
        }
        Ok(Self {
            event_id,
            hook_type,
            is_before,
            times: None,
            market_filter: None,
        })
    }

    pub fn at_times(mut self, times: impl IntoIterator<Item = Time>) -> Self {
        self.times = Some(times.into_iter().collect());
        self
    }

    pub fn for_markets(mut self, filter: MarketFilter) -> EventResult<Self> {
        if self.hook_type != HookType::Market {
            return Err(EventError::FilterNotAllowed(self.hook_type));
        }
        self.market_filter = Some(filter);
        Ok(self)
    }

    pub fn dispatch_point(&self) -> DispatchPoint {
        match (self.hook_type, self.is_before) {
            (HookType::Order, true) => DispatchPoint::BeforeOrder,
            (HookType::Order, false) => DispatchPoint::AfterOrder,
            (HookType::Cancel, true) => DispatchPoint::BeforeCancel,
            (HookType::Cancel, false) => DispatchPoint::AfterCancel,
            (HookType::Execution, _) => DispatchPoint::AfterExecution,
            (HookType::Session, true) => DispatchPoint::BeforeSession,
            (HookType::Session, false) => DispatchPoint::AfterSession,
            (HookType::Market, true) => DispatchPoint::BeforeStepForMarket,
            (HookType::Market, false) => DispatchPoint::AfterStepForMarket,
        }
    }

    /// Whether the market filter, if any, lets `market` through
    pub fn accepts_market(&self, market: &Market) -> bool {
        self.market_filter
            .as_ref()
            .is_none_or(|filter| filter.accepts(market))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_hooks_are_after_only() {
        assert!(matches!(
            EventHook::new(0, HookType::Execution, true),
            Err(EventError::BeforeHookNotAllowed(HookType::Execution))
        ));
        let hook = EventHook::new(0, HookType::Execution, false).unwrap();
        assert_eq!(hook.dispatch_point(), DispatchPoint::AfterExecution);
    }

    #[test]
    fn test_filters_only_on_market_hooks() {
        let hook = EventHook::new(1, HookType::Order, true).unwrap();
        assert!(hook.for_markets(MarketFilter::Index).is_err());

        let hook = EventHook::new(1, HookType::Market, false)
            .unwrap()
            .at_times([3, 4])
            .for_markets(MarketFilter::Instance(2))
            .unwrap();
        assert_eq!(hook.dispatch_point(), DispatchPoint::AfterStepForMarket);
        assert_eq!(hook.times, Some(vec![3, 4]));
    }

    #[test]
    fn test_market_filter() {
        let spot = Market::new(0, "Spot", 0.01, 100.0).unwrap();
        let index = Market::new_index(1, "Index", 0.01, 100.0).unwrap();
        assert!(MarketFilter::Continuous.accepts(&spot));
        assert!(!MarketFilter::Continuous.accepts(&index));
        assert!(MarketFilter::Index.accepts(&index));
        assert!(MarketFilter::Instance(0).accepts(&spot));
        assert!(!MarketFilter::Instance(0).accepts(&index));

        let unfiltered = EventHook::new(0, HookType::Market, true).unwrap();
        assert!(unfiltered.accepts_market(&index));
    }

    #[test]
    fn test_dispatch_points_are_distinct_slots() {
        for (position, point) in DispatchPoint::ALL.iter().enumerate() {
            assert_eq!(point.index(), position);
        }
    }
}
