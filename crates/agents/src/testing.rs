use agora_config::Settings;
use agora_fundamentals::Fundamentals;
use agora_market::{Exchange, FundamentalParams, Market};
use serde_json::Value;

/// Running continuous markets at the given prices, advanced to time 0
pub(crate) fn exchange(prices: &[f64]) -> Exchange {
    let mut exchange = Exchange::new(Fundamentals::new(42));
    for (id, &price) in prices.iter().enumerate() {
        let market = Market::new(id, format!("Market-{id}"), 0.01, price)
            .unwrap()
            .with_outstanding_shares(Some(1000));
        exchange.add_market(market, flat(price), Some("Market")).unwrap();
    }
    exchange.set_running_all(true);
    exchange.advance_markets().unwrap();
    exchange
}

pub(crate) fn settings(value: Value) -> Settings {
    Settings::from_value(value).unwrap()
}

/// Two-level setup: continuous components `0..n`, then one index market `n`
/// over all of them. Everything is running at time 0.
pub(crate) fn index_exchange(components: &[f64], index_price: f64) -> Exchange {
    let mut exchange = Exchange::new(Fundamentals::new(42));
    for (id, &price) in components.iter().enumerate() {
        let market = Market::new(id, format!("Spot-{id}"), 0.01, price)
            .unwrap()
            .with_outstanding_shares(Some(1000));
        exchange.add_market(market, flat(price), Some("Spot")).unwrap();
    }
    let index_id = components.len();
    let index = Market::new_index(index_id, "Index", 0.01, index_price).unwrap();
    exchange.add_market(index, flat(index_price), None).unwrap();
    for component_id in 0..index_id {
        exchange.add_index_component(index_id, component_id).unwrap();
    }
    exchange.set_running_all(true);
    exchange.advance_markets().unwrap();
    exchange
}

fn flat(price: f64) -> FundamentalParams {
    FundamentalParams {
        initial: price,
        drift: 0.0,
        volatility: 0.0,
    }
}
