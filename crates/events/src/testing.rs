use agora_config::Settings;
use agora_core::{Session, Time};
use agora_fundamentals::Fundamentals;
use agora_market::{Exchange, FundamentalParams, Market};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;

use crate::EventBase;

/// Running continuous markets at the given prices, advanced to time 0
pub(crate) fn exchange(prices: &[f64]) -> Exchange {
    let mut exchange = Exchange::new(Fundamentals::new(42));
    for (id, &price) in prices.iter().enumerate() {
        let market = Market::new(id, format!("Market-{id}"), 0.01, price).unwrap();
        let params = FundamentalParams {
            initial: price,
            drift: 0.0,
            volatility: 0.0,
        };
        exchange.add_market(market, params, Some("Market")).unwrap();
    }
    exchange.set_running_all(true);
    exchange.advance_markets().unwrap();
    exchange
}

pub(crate) fn event_base(session_start_time: Time) -> EventBase {
    let session = Session::new(0, "main", session_start_time);
    EventBase::new(0, "event", &session, StdRng::seed_from_u64(0))
}

pub(crate) fn settings(value: Value) -> Settings {
    Settings::from_value(value).unwrap()
}
