use std::fmt;

use agora_core::{
    Cancel, CancelLog, ExecutionLog, ExpirationLog, MarketId, Order, OrderId, OrderLog, Price, Side,
    Time, Volume,
};
use agora_fundamentals::Fundamentals;
use agora_matching::{OrderBook, PriceTimeMatching, plan_sweep};
use agora_ports::{BookError, MatchingAlgorithm};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::{MarketError, MarketResult, MarketSettings};

/// Time series grow by this many steps at a time
const CHUNK_SIZE: usize = 100;

/// Continuous markets match their own book; index markets additionally
/// track a share-weighted basket of component markets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketKind {
    Continuous,
    Index { components: Vec<MarketId> },
}

/// A continuous double-auction market
///
/// Per-step state lives in parallel series indexed by time. `time` is `-1`
/// until the first [`Market::update_time`].
pub struct Market {
    market_id: MarketId,
    name: String,
    kind: MarketKind,
    tick_size: f64,
    tick: Decimal,
    outstanding_shares: Option<i64>,
    running: bool,
    time: Time,

    market_prices: Vec<Option<Price>>,
    last_executed_prices: Vec<Option<Price>>,
    mid_prices: Vec<Option<Price>>,
    fundamental_prices: Vec<Option<Price>>,
    executed_volumes: Vec<Volume>,
    executed_total_prices: Vec<f64>,
    n_buy_orders: Vec<u64>,
    n_sell_orders: Vec<u64>,

    buy_book: OrderBook,
    sell_book: OrderBook,
    next_order_id: OrderId,
    matching: Box<dyn MatchingAlgorithm>,
}

impl fmt::Debug for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Market")
            .field("market_id", &self.market_id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("time", &self.time)
            .field("running", &self.running)
            .field("matching", &self.matching.name())
            .finish_non_exhaustive()
    }
}

impl Market {
    /// Create a continuous market whose price at time 0 is `initial_price`
    pub fn new(
        market_id: MarketId,
        name: impl Into<String>,
        tick_size: f64,
        initial_price: Price,
    ) -> MarketResult<Self> {
        if tick_size.is_nan() || tick_size <= 0.0 {
            return Err(MarketError::InvalidTickSize(tick_size));
        }
        let tick = to_decimal(tick_size).ok_or(MarketError::InvalidTickSize(tick_size))?;
        Ok(Self {
            market_id,
            name: name.into(),
            kind: MarketKind::Continuous,
            tick_size,
            tick,
            outstanding_shares: None,
            running: false,
            time: -1,
            market_prices: vec![Some(initial_price)],
            last_executed_prices: Vec::new(),
            mid_prices: Vec::new(),
            fundamental_prices: Vec::new(),
            executed_volumes: Vec::new(),
            executed_total_prices: Vec::new(),
            n_buy_orders: Vec::new(),
            n_sell_orders: Vec::new(),
            buy_book: OrderBook::new(Side::Buy),
            sell_book: OrderBook::new(Side::Sell),
            next_order_id: 0,
            matching: Box::new(PriceTimeMatching::new()),
        })
    }

    /// Create an index market with no components yet
    pub fn new_index(
        market_id: MarketId,
        name: impl Into<String>,
        tick_size: f64,
        initial_price: Price,
    ) -> MarketResult<Self> {
        let mut market = Self::new(market_id, name, tick_size, initial_price)?;
        market.kind = MarketKind::Index {
            components: Vec::new(),
        };
        Ok(market)
    }

    pub fn from_settings(
        market_id: MarketId,
        name: impl Into<String>,
        settings: &MarketSettings,
        index: bool,
    ) -> MarketResult<Self> {
        let market = if index {
            Self::new_index(market_id, name, settings.tick_size, settings.market_price)?
        } else {
            Self::new(market_id, name, settings.tick_size, settings.market_price)?
        };
        Ok(market.with_outstanding_shares(settings.outstanding_shares))
    }

    pub fn with_outstanding_shares(mut self, outstanding_shares: Option<i64>) -> Self {
        self.outstanding_shares = outstanding_shares;
        self
    }

    pub fn with_matching(mut self, matching: Box<dyn MatchingAlgorithm>) -> Self {
        self.matching = matching;
        self
    }

    pub fn market_id(&self) -> MarketId {
        self.market_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &MarketKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut MarketKind {
        &mut self.kind
    }

    pub fn is_index(&self) -> bool {
        matches!(self.kind, MarketKind::Index { .. })
    }

    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    pub fn outstanding_shares(&self) -> Option<i64> {
        self.outstanding_shares
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn get_time(&self) -> Time {
        self.time
    }

    pub fn matching_name(&self) -> &str {
        self.matching.name()
    }

    // ============ Time series ============

    fn check_time(&self, time: Time) -> MarketResult<usize> {
        if time > self.time {
            return Err(MarketError::FutureTime {
                requested: time,
                now: self.time,
            });
        }
        usize::try_from(time).map_err(|_| MarketError::NegativeTime(time))
    }

    fn value_at<T: Copy>(&self, values: &[T], series: &'static str, time: Time) -> MarketResult<T> {
        let index = self.check_time(time)?;
        values
            .get(index)
            .copied()
            .ok_or(MarketError::MissingValue { series, time })
    }

    fn required_at(&self, values: &[Option<Price>], series: &'static str, time: Time) -> MarketResult<Price> {
        self.value_at(values, series, time)?
            .ok_or(MarketError::MissingValue { series, time })
    }

    /// Current market price
    pub fn market_price(&self) -> MarketResult<Price> {
        self.get_market_price(self.time)
    }

    pub fn get_market_price(&self, time: Time) -> MarketResult<Price> {
        self.required_at(&self.market_prices, "market price", time)
    }

    pub fn get_market_prices(&self, times: impl IntoIterator<Item = Time>) -> MarketResult<Vec<Price>> {
        times.into_iter().map(|t| self.get_market_price(t)).collect()
    }

    pub fn get_mid_price(&self, time: Time) -> MarketResult<Option<Price>> {
        self.value_at(&self.mid_prices, "mid price", time)
    }

    pub fn get_mid_prices(&self, times: impl IntoIterator<Item = Time>) -> MarketResult<Vec<Option<Price>>> {
        times.into_iter().map(|t| self.get_mid_price(t)).collect()
    }

    pub fn get_last_executed_price(&self, time: Time) -> MarketResult<Option<Price>> {
        self.value_at(&self.last_executed_prices, "last executed price", time)
    }

    pub fn get_last_executed_prices(
        &self,
        times: impl IntoIterator<Item = Time>,
    ) -> MarketResult<Vec<Option<Price>>> {
        times
            .into_iter()
            .map(|t| self.get_last_executed_price(t))
            .collect()
    }

    /// Current fundamental price
    pub fn fundamental_price(&self) -> MarketResult<Price> {
        self.get_fundamental_price(self.time)
    }

    pub fn get_fundamental_price(&self, time: Time) -> MarketResult<Price> {
        self.required_at(&self.fundamental_prices, "fundamental price", time)
    }

    pub fn get_fundamental_prices(&self, times: impl IntoIterator<Item = Time>) -> MarketResult<Vec<Price>> {
        times
            .into_iter()
            .map(|t| self.get_fundamental_price(t))
            .collect()
    }

    pub fn get_executed_volume(&self, time: Time) -> MarketResult<Volume> {
        self.value_at(&self.executed_volumes, "executed volume", time)
    }

    pub fn get_executed_volumes(&self, times: impl IntoIterator<Item = Time>) -> MarketResult<Vec<Volume>> {
        times.into_iter().map(|t| self.get_executed_volume(t)).collect()
    }

    pub fn get_executed_total_price(&self, time: Time) -> MarketResult<f64> {
        self.value_at(&self.executed_total_prices, "executed total price", time)
    }

    pub fn get_executed_total_prices(&self, times: impl IntoIterator<Item = Time>) -> MarketResult<Vec<f64>> {
        times
            .into_iter()
            .map(|t| self.get_executed_total_price(t))
            .collect()
    }

    pub fn get_n_buy_order(&self, time: Time) -> MarketResult<u64> {
        self.value_at(&self.n_buy_orders, "number of buy orders", time)
    }

    pub fn get_n_buy_orders(&self, times: impl IntoIterator<Item = Time>) -> MarketResult<Vec<u64>> {
        times.into_iter().map(|t| self.get_n_buy_order(t)).collect()
    }

    pub fn get_n_sell_order(&self, time: Time) -> MarketResult<u64> {
        self.value_at(&self.n_sell_orders, "number of sell orders", time)
    }

    pub fn get_n_sell_orders(&self, times: impl IntoIterator<Item = Time>) -> MarketResult<Vec<u64>> {
        times.into_iter().map(|t| self.get_n_sell_order(t)).collect()
    }

    /// Volume weighted average execution price over `0..=time`.
    /// NaN while nothing has been executed.
    pub fn get_vwap(&self, time: Time) -> MarketResult<f64> {
        let index = self.check_time(time)?;
        let end = (index + 1).min(self.executed_volumes.len());
        let volume: Volume = self.executed_volumes[..end].iter().sum();
        if volume == 0 {
            return Ok(f64::NAN);
        }
        let total: f64 = self.executed_total_prices[..end].iter().sum();
        Ok(total / volume as f64)
    }

    fn fill_until(&mut self, index: usize) {
        if self.mid_prices.len() > index {
            return;
        }
        let length = (index / CHUNK_SIZE + 1) * CHUNK_SIZE;
        grow(&mut self.market_prices, length, None);
        grow(&mut self.mid_prices, length, None);
        grow(&mut self.last_executed_prices, length, None);
        grow(&mut self.fundamental_prices, length, None);
        grow(&mut self.executed_volumes, length, 0);
        grow(&mut self.executed_total_prices, length, 0.0);
        grow(&mut self.n_buy_orders, length, 0);
        grow(&mut self.n_sell_orders, length, 0);
    }

    fn current_index(&self) -> MarketResult<usize> {
        usize::try_from(self.time).map_err(|_| MarketError::NotStarted(self.market_id))
    }

    // ============ Book views ============

    pub fn get_best_buy_price(&self) -> Option<Price> {
        self.buy_book.get_best_price()
    }

    pub fn get_best_sell_price(&self) -> Option<Price> {
        self.sell_book.get_best_price()
    }

    pub fn get_buy_order_book(&self) -> Vec<(Option<Price>, Volume)> {
        self.buy_book.price_volume()
    }

    pub fn get_sell_order_book(&self) -> Vec<(Option<Price>, Volume)> {
        self.sell_book.price_volume()
    }

    pub fn buy_book(&self) -> &OrderBook {
        &self.buy_book
    }

    pub fn sell_book(&self) -> &OrderBook {
        &self.sell_book
    }

    /// A live order in either book
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.buy_book
            .get(order_id)
            .or_else(|| self.sell_book.get(order_id))
    }

    fn book_mut(&mut self, side: Side) -> &mut OrderBook {
        match side {
            Side::Buy => &mut self.buy_book,
            Side::Sell => &mut self.sell_book,
        }
    }

    // ============ Tick grid ============

    /// Tick index of `price`: rounded down for buys, up for sells
    pub fn convert_to_tick_level(&self, price: Price, is_buy: bool) -> MarketResult<i64> {
        let ratio = to_decimal(price).ok_or(MarketError::InvalidPrice(price))? / self.tick;
        let level = if is_buy { ratio.floor() } else { ratio.ceil() };
        level.to_i64().ok_or(MarketError::InvalidPrice(price))
    }

    pub fn convert_to_price(&self, tick_level: i64) -> Price {
        (Decimal::from(tick_level) * self.tick)
            .to_f64()
            .unwrap_or(tick_level as f64 * self.tick_size)
    }

    fn is_on_tick(&self, price: Price) -> MarketResult<bool> {
        let price = to_decimal(price).ok_or(MarketError::InvalidPrice(price))?;
        Ok((price % self.tick).is_zero())
    }

    // ============ Clock ============

    /// Advance one step. Driver only.
    ///
    /// Expires orders, records the fundamental for the new step and carries
    /// the previous step's prices forward. While running, the market price
    /// follows the last execution, else the mid price.
    pub fn update_time(&mut self, next_fundamental_price: Price) -> Vec<ExpirationLog> {
        self.time += 1;
        let mut logs = self.buy_book.set_time(self.time);
        logs.extend(self.sell_book.set_time(self.time));

        let t = self.time.max(0) as usize;
        self.fill_until(t);
        self.fundamental_prices[t] = Some(next_fundamental_price);
        if t > 0 {
            self.last_executed_prices[t] = self.last_executed_prices[t - 1];
            self.mid_prices[t] = self.mid_prices[t - 1];
            self.market_prices[t] = self.market_prices[t - 1];
            if self.running {
                if let Some(price) = self.last_executed_prices[t - 1] {
                    self.market_prices[t] = Some(price);
                } else if let Some(price) = self.mid_prices[t - 1] {
                    self.market_prices[t] = Some(price);
                }
            }
        } else if self.market_prices[t].is_none() {
            self.market_prices[t] = Some(next_fundamental_price);
        }
        logs
    }

    /// Jump to an arbitrary step. Unlike [`Market::update_time`], carried
    /// values are the last non-missing ones before `time`.
    pub fn set_time(&mut self, time: Time, next_fundamental_price: Price) -> MarketResult<Vec<ExpirationLog>> {
        let t = usize::try_from(time).map_err(|_| MarketError::NegativeTime(time))?;
        self.time = time;
        let mut logs = self.buy_book.set_time(time);
        logs.extend(self.sell_book.set_time(time));

        self.fill_until(t);
        self.fundamental_prices[t] = Some(next_fundamental_price);
        if t > 0 {
            self.last_executed_prices[t] = last_present(&self.last_executed_prices[..t]);
            self.mid_prices[t] = last_present(&self.mid_prices[..t]);
            self.market_prices[t] = last_present(&self.market_prices[..t]);
            if self.running {
                if self.last_executed_prices[t - 1].is_some() {
                    self.market_prices[t] = self.last_executed_prices[t];
                } else if self.mid_prices[t - 1].is_some() {
                    self.market_prices[t] = self.mid_prices[t];
                }
            }
        } else if self.market_prices[t].is_none() {
            self.market_prices[t] = Some(next_fundamental_price);
        }
        Ok(logs)
    }

    fn update_market_price(&mut self) {
        let Ok(t) = self.current_index() else {
            return;
        };
        self.mid_prices[t] = match (self.get_best_buy_price(), self.get_best_sell_price()) {
            (Some(buy), Some(sell)) => Some((buy + sell) / 2.0),
            _ => None,
        };
        if self.running {
            if let Some(price) = self.last_executed_prices[t].or(self.mid_prices[t]) {
                self.market_prices[t] = Some(price);
            }
        }
    }

    // ============ Order flow ============

    /// Accept an order into the book. Driver only.
    ///
    /// Off-grid limit prices are rounded (down for buys, up for sells)
    /// with a warning.
    pub fn add_order(&mut self, mut order: Order) -> MarketResult<OrderLog> {
        if order.market_id != self.market_id {
            return Err(MarketError::WrongMarket {
                expected: self.market_id,
                got: order.market_id,
            });
        }
        if order.order_id.is_some() || order.placed_at.is_some() {
            return Err(MarketError::AlreadySubmitted);
        }
        order.validate()?;
        let t = self.current_index()?;

        if let Some(price) = order.price {
            if price <= 0.0 {
                log::warn!(
                    "market {}: order price {price} is not positive",
                    self.name
                );
            }
            if !self.is_on_tick(price)? {
                let level = self.convert_to_tick_level(price, order.is_buy())?;
                let rounded = self.convert_to_price(level);
                log::warn!(
                    "market {}: order price {price} does not accord to the tick size {}; modified to {rounded}",
                    self.name,
                    self.tick_size
                );
                order.price = Some(rounded);
            }
        }

        let order_id = self.next_order_id;
        self.next_order_id += 1;
        order.order_id = Some(order_id);

        let log = OrderLog {
            order_id,
            market_id: self.market_id,
            time: self.time,
            agent_id: order.agent_id,
            is_buy: order.is_buy(),
            kind: order.kind,
            volume: order.volume,
            price: order.price,
            ttl: order.ttl,
        };
        let side = order.side;
        self.book_mut(side).add(order)?;
        self.update_market_price();
        match side {
            Side::Buy => self.n_buy_orders[t] += 1,
            Side::Sell => self.n_sell_orders[t] += 1,
        }
        Ok(log)
    }

    /// Withdraw a resting order on behalf of its owner. Driver only.
    pub fn cancel_order(&mut self, cancel: &mut Cancel) -> MarketResult<CancelLog> {
        if cancel.market_id != self.market_id {
            return Err(MarketError::WrongMarket {
                expected: self.market_id,
                got: cancel.market_id,
            });
        }
        let book = self.book_mut(cancel.side);
        let owner = book
            .get(cancel.order_id)
            .map(|order| order.agent_id)
            .ok_or(BookError::UnknownOrder(cancel.order_id))?;
        if owner != cancel.agent_id {
            return Err(MarketError::NotOrderOwner {
                order_id: cancel.order_id,
                agent_id: cancel.agent_id,
                owner,
            });
        }
        let order = book.cancel(cancel)?;
        self.update_market_price();

        Ok(CancelLog {
            order_id: cancel.order_id,
            market_id: self.market_id,
            cancel_time: cancel.placed_at.unwrap_or(self.time),
            order_time: order.placed_at.unwrap_or(self.time),
            agent_id: order.agent_id,
            is_buy: order.is_buy(),
            kind: order.kind,
            volume: order.volume,
            price: order.price,
            ttl: order.ttl,
        })
    }

    /// Whether the books still hold a pair that would trade
    pub fn remain_executable_orders(&self) -> bool {
        !plan_sweep(self.matching.as_ref(), &self.buy_book, &self.sell_book).is_empty()
    }

    /// Run one matching sweep and apply every planned fill. Driver only.
    ///
    /// Afterwards no executable pair remains. Cash and asset settlement is
    /// left to the caller.
    pub fn execution(&mut self) -> MarketResult<Vec<ExecutionLog>> {
        if !self.running {
            return Err(MarketError::NotRunning(self.market_id));
        }
        let fills = plan_sweep(self.matching.as_ref(), &self.buy_book, &self.sell_book);
        if fills.is_empty() {
            return Ok(Vec::new());
        }
        let t = self.current_index()?;

        let mut logs = Vec::with_capacity(fills.len());
        for fill in fills {
            let buy_agent_id = self
                .buy_book
                .get(fill.buy_order_id)
                .map(|order| order.agent_id)
                .ok_or(BookError::UnknownOrder(fill.buy_order_id))?;
            let sell_agent_id = self
                .sell_book
                .get(fill.sell_order_id)
                .map(|order| order.agent_id)
                .ok_or(BookError::UnknownOrder(fill.sell_order_id))?;

            self.buy_book
                .change_order_volume(fill.buy_order_id, -fill.volume)?;
            self.sell_book
                .change_order_volume(fill.sell_order_id, -fill.volume)?;
            self.last_executed_prices[t] = Some(fill.price);
            self.executed_volumes[t] += fill.volume;
            self.executed_total_prices[t] += fill.volume as f64 * fill.price;

            logs.push(ExecutionLog {
                market_id: self.market_id,
                time: self.time,
                buy_agent_id,
                sell_agent_id,
                buy_order_id: fill.buy_order_id,
                sell_order_id: fill.sell_order_id,
                price: fill.price,
                volume: fill.volume,
            });
        }
        self.update_market_price();
        log::debug!(
            "market {} t={}: {} executions",
            self.name,
            self.time,
            logs.len()
        );
        Ok(logs)
    }

    /// Scale the current fundamental price by `scale`, here and in
    /// `fundamentals`, so later steps regenerate from the new anchor.
    pub fn change_fundamental_price(&mut self, scale: f64, fundamentals: &mut Fundamentals) -> MarketResult<()> {
        let t = self.current_index()?;
        let new_price = self.fundamental_price()? * scale;
        self.fundamental_prices[t] = Some(new_price);
        if fundamentals.contains(self.market_id) {
            fundamentals.set_fundamental_price(self.market_id, self.time, new_price)?;
        }
        Ok(())
    }
}

fn grow<T: Clone>(values: &mut Vec<T>, length: usize, fill: T) {
    if values.len() < length {
        values.resize(length, fill);
    }
}

/// Shortest decimal that reads back as `value`, so `0.01` stays `0.01`
fn to_decimal(value: f64) -> Option<Decimal> {
    value.to_string().parse().ok()
}

fn last_present(values: &[Option<Price>]) -> Option<Price> {
    values.iter().rev().find_map(|value| *value)
}
