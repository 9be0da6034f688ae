use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use agora_core::{Cancel, ExpirationLog, Order, OrderId, Price, Side, Time, Volume};
use agora_ports::{BookError, BookResult};
use priority_queue::PriorityQueue;

/// Heap key for a resting order. Greater means closer to the top of the book.
///
/// Market orders outrank limit orders; among limit orders the better price
/// wins (higher for buy, lower for sell); ties break by earlier `placed_at`,
/// then by smaller `order_id`.
#[derive(Debug, Clone, Copy)]
pub struct OrderPriority {
    side: Side,
    price: Option<Price>,
    placed_at: Time,
    order_id: OrderId,
}

impl OrderPriority {
    fn of(order: &Order, order_id: OrderId, placed_at: Time) -> Self {
        Self {
            side: order.side,
            price: order.price,
            placed_at,
            order_id,
        }
    }
}

impl Ord for OrderPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_price = match (self.price, other.price) {
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => Ordering::Equal,
            (Some(mine), Some(theirs)) => match self.side {
                Side::Buy => mine.total_cmp(&theirs),
                Side::Sell => theirs.total_cmp(&mine),
            },
        };
        by_price
            .then_with(|| other.placed_at.cmp(&self.placed_at))
            .then_with(|| other.order_id.cmp(&self.order_id))
    }
}

impl PartialOrd for OrderPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderPriority {}

/// One side of a market's order book
///
/// Live orders sit in an indexed priority queue so that cancels, fills and
/// expirations can remove any entry, not only the top. Orders with a ttl are
/// also indexed by expiration time so each step only touches what expires.
#[derive(Debug, Clone)]
pub struct OrderBook {
    side: Side,
    queue: PriorityQueue<OrderId, OrderPriority>,
    orders: HashMap<OrderId, Order>,
    time: Time,
    expire_time_list: BTreeMap<Time, Vec<OrderId>>,
}

impl OrderBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            queue: PriorityQueue::new(),
            orders: HashMap::new(),
            time: 0,
            expire_time_list: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Place an order stamped with the book's current time
    pub fn add(&mut self, mut order: Order) -> BookResult<()> {
        if order.side != self.side {
            return Err(BookError::WrongSide {
                order: order.side,
                book: self.side,
            });
        }
        let order_id = order.order_id.ok_or(BookError::MissingOrderId)?;
        if self.orders.contains_key(&order_id) {
            return Err(BookError::DuplicateOrder(order_id));
        }

        order.placed_at = Some(self.time);
        if let Some(ttl) = order.ttl {
            self.expire_time_list
                .entry(self.time + ttl)
                .or_default()
                .push(order_id);
        }
        self.queue
            .push(order_id, OrderPriority::of(&order, order_id, self.time));
        self.orders.insert(order_id, order);
        Ok(())
    }

    /// Withdraw a resting order. Returns the order as it was in the book.
    pub fn cancel(&mut self, cancel: &mut Cancel) -> BookResult<Order> {
        let mut order = self.remove(cancel.order_id)?;
        order.canceled = true;
        cancel.placed_at = Some(self.time);
        Ok(order)
    }

    /// Apply a fill (negative delta) or top-up. Orders reaching zero leave the book.
    ///
    /// Returns the remaining volume.
    pub fn change_order_volume(&mut self, order_id: OrderId, delta: Volume) -> BookResult<Volume> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(BookError::UnknownOrder(order_id))?;
        let volume = order.volume + delta;
        if volume < 0 {
            return Err(BookError::NegativeVolume { order_id, volume });
        }
        order.volume = volume;
        if volume == 0 {
            self.remove(order_id)?;
        }
        Ok(volume)
    }

    pub fn get_best_order(&self) -> Option<&Order> {
        self.queue
            .peek()
            .and_then(|(order_id, _)| self.orders.get(order_id))
    }

    /// Price of the top order. `None` when empty or when the top is a market order.
    pub fn get_best_price(&self) -> Option<Price> {
        self.get_best_order().and_then(|order| order.price)
    }

    /// Live orders from the top of the book downwards.
    ///
    /// Heap keys are borrowed and popped lazily, so a caller that stops after
    /// the top few orders pays for those only.
    pub fn sorted_orders(&self) -> impl Iterator<Item = &Order> + '_ {
        let mut heap: BinaryHeap<&OrderPriority> =
            self.queue.iter().map(|(_, priority)| priority).collect();
        std::iter::from_fn(move || heap.pop())
            .filter_map(move |priority| self.orders.get(&priority.order_id))
    }

    /// Advance the book clock and drop every order whose expiration is before `time`
    pub fn set_time(&mut self, time: Time) -> Vec<ExpirationLog> {
        self.time = time;
        let still_alive = self.expire_time_list.split_off(&time);
        let expired = std::mem::replace(&mut self.expire_time_list, still_alive);

        let mut logs = Vec::new();
        for order_id in expired.into_values().flatten() {
            // Filled or canceled orders stay indexed until their slot passes
            let Ok(order) = self.remove(order_id) else {
                continue;
            };
            logs.push(ExpirationLog {
                order_id: order.order_id,
                market_id: order.market_id,
                time,
                order_time: order.placed_at,
                agent_id: order.agent_id,
                is_buy: order.is_buy(),
                kind: order.kind,
                volume: order.volume,
                price: order.price,
                ttl: order.ttl,
            });
        }
        logs
    }

    /// Aggregated volume per price level.
    ///
    /// Market orders are reported under `None` first; limit levels follow,
    /// descending for the buy side and ascending for the sell side.
    pub fn price_volume(&self) -> Vec<(Option<Price>, Volume)> {
        let mut market_volume: Volume = 0;
        let mut levels: Vec<(Price, Volume)> = Vec::new();
        for order in self.orders.values() {
            match order.price {
                None => market_volume += order.volume,
                Some(price) => levels.push((price, order.volume)),
            }
        }
        levels.sort_by(|(a, _), (b, _)| match self.side {
            Side::Buy => b.total_cmp(a),
            Side::Sell => a.total_cmp(b),
        });

        let mut result: Vec<(Option<Price>, Volume)> = Vec::new();
        if market_volume > 0 {
            result.push((None, market_volume));
        }
        for (price, volume) in levels {
            match result.last_mut() {
                Some((Some(last), total)) if *last == price => *total += volume,
                _ => result.push((Some(price), volume)),
            }
        }
        result
    }

    fn remove(&mut self, order_id: OrderId) -> BookResult<Order> {
        let order = self
            .orders
            .remove(&order_id)
            .ok_or(BookError::UnknownOrder(order_id))?;
        self.queue.remove(&order_id);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(mut order: Order, order_id: OrderId) -> Order {
        order.order_id = Some(order_id);
        order
    }

    #[test]
    fn test_buy_book_price_priority() {
        let mut book = OrderBook::new(Side::Buy);
        book.add(placed(Order::limit(0, 0, Side::Buy, 99.0, 1), 0)).unwrap();
        book.add(placed(Order::limit(1, 0, Side::Buy, 101.0, 1), 1)).unwrap();
        book.add(placed(Order::limit(2, 0, Side::Buy, 100.0, 1), 2)).unwrap();

        let prices: Vec<_> = book.sorted_orders().map(|o| o.price.unwrap()).collect();
        assert_eq!(prices, vec![101.0, 100.0, 99.0]);
        assert_eq!(book.get_best_price(), Some(101.0));
    }

    #[test]
    fn test_sell_book_prefers_market_then_lower_price() {
        let mut book = OrderBook::new(Side::Sell);
        book.add(placed(Order::limit(0, 0, Side::Sell, 101.0, 1), 0)).unwrap();
        book.add(placed(Order::limit(1, 0, Side::Sell, 100.0, 1), 1)).unwrap();
        book.add(placed(Order::market(2, 0, Side::Sell, 1), 2)).unwrap();

        let ids: Vec<_> = book.sorted_orders().map(|o| o.order_id.unwrap()).collect();
        assert_eq!(ids, vec![2, 1, 0]);
        assert_eq!(book.get_best_price(), None);
    }

    #[test]
    fn test_time_then_id_breaks_ties() {
        let mut book = OrderBook::new(Side::Sell);
        book.set_time(3);
        book.add(placed(Order::limit(0, 0, Side::Sell, 100.0, 1), 5)).unwrap();
        book.add(placed(Order::limit(1, 0, Side::Sell, 100.0, 1), 4)).unwrap();
        book.set_time(1);
        book.add(placed(Order::limit(2, 0, Side::Sell, 100.0, 1), 9)).unwrap();

        let ids: Vec<_> = book.sorted_orders().map(|o| o.order_id.unwrap()).collect();
        assert_eq!(ids, vec![9, 4, 5]);
    }

    #[test]
    fn test_partial_walk_leaves_book_intact() {
        let mut book = OrderBook::new(Side::Buy);
        for (i, price) in [100.0, 104.0, 98.0, 103.0, 101.0, 99.0, 102.0].into_iter().enumerate() {
            book.add(placed(Order::limit(0, 0, Side::Buy, price, 1), i as OrderId)).unwrap();
        }

        let top: Vec<_> = book.sorted_orders().take(3).map(|o| o.price.unwrap()).collect();
        assert_eq!(top, vec![104.0, 103.0, 102.0]);

        assert_eq!(book.len(), 7);
        assert_eq!(book.get_best_price(), Some(104.0));
        let all: Vec<_> = book.sorted_orders().map(|o| o.price.unwrap()).collect();
        assert_eq!(all, vec![104.0, 103.0, 102.0, 101.0, 100.0, 99.0, 98.0]);
    }

    #[test]
    fn test_wrong_side_rejected() {
        let mut book = OrderBook::new(Side::Buy);
        let result = book.add(placed(Order::limit(0, 0, Side::Sell, 100.0, 1), 0));
        assert_eq!(
            result,
            Err(BookError::WrongSide {
                order: Side::Sell,
                book: Side::Buy
            })
        );
    }

    #[test]
    fn test_duplicate_and_unassigned_orders_rejected() {
        let mut book = OrderBook::new(Side::Buy);
        assert_eq!(
            book.add(Order::limit(0, 0, Side::Buy, 1.0, 1)),
            Err(BookError::MissingOrderId)
        );
        book.add(placed(Order::limit(0, 0, Side::Buy, 1.0, 1), 3)).unwrap();
        assert_eq!(
            book.add(placed(Order::limit(0, 0, Side::Buy, 1.0, 1), 3)),
            Err(BookError::DuplicateOrder(3))
        );
    }

    #[test]
    fn test_cancel_removes_top_and_inner_orders() {
        let mut book = OrderBook::new(Side::Buy);
        book.set_time(2);
        for (id, price) in [(0, 100.0), (1, 101.0), (2, 102.0)] {
            book.add(placed(Order::limit(id as usize, 0, Side::Buy, price, 1), id)).unwrap();
        }

        let mut cancel = Cancel::new(2, 0, 2, Side::Buy);
        let canceled = book.cancel(&mut cancel).unwrap();
        assert!(canceled.canceled);
        assert_eq!(cancel.placed_at, Some(2));
        assert_eq!(book.get_best_price(), Some(101.0));

        let mut cancel = Cancel::new(0, 0, 0, Side::Buy);
        book.cancel(&mut cancel).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.get_best_price(), Some(101.0));

        let mut missing = Cancel::new(0, 0, 0, Side::Buy);
        assert_eq!(book.cancel(&mut missing), Err(BookError::UnknownOrder(0)));
    }

    #[test]
    fn test_change_order_volume() {
        let mut book = OrderBook::new(Side::Sell);
        book.add(placed(Order::limit(0, 0, Side::Sell, 100.0, 5), 0)).unwrap();

        assert_eq!(book.change_order_volume(0, -3), Ok(2));
        assert_eq!(book.get(0).unwrap().volume, 2);
        assert_eq!(
            book.change_order_volume(0, -3),
            Err(BookError::NegativeVolume {
                order_id: 0,
                volume: -1
            })
        );
        assert_eq!(book.change_order_volume(0, -2), Ok(0));
        assert!(book.is_empty());
    }

    #[test]
    fn test_expiration_after_ttl() {
        let mut book = OrderBook::new(Side::Buy);
        book.set_time(0);
        book.add(placed(Order::limit(0, 0, Side::Buy, 50.0, 1).with_ttl(2), 0)).unwrap();
        book.add(placed(Order::limit(1, 0, Side::Buy, 49.0, 1), 1)).unwrap();

        assert!(book.set_time(1).is_empty());
        assert!(book.set_time(2).is_empty());
        assert!(book.contains(0));

        let logs = book.set_time(3);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].order_id, Some(0));
        assert_eq!(logs[0].time, 3);
        assert_eq!(logs[0].order_time, Some(0));
        assert!(!book.contains(0));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_filled_order_does_not_expire_twice() {
        let mut book = OrderBook::new(Side::Sell);
        book.add(placed(Order::limit(0, 0, Side::Sell, 10.0, 1).with_ttl(1), 0)).unwrap();
        book.change_order_volume(0, -1).unwrap();
        assert!(book.set_time(5).is_empty());
    }

    #[test]
    fn test_price_volume_ordering() {
        let mut book = OrderBook::new(Side::Buy);
        book.add(placed(Order::limit(0, 0, Side::Buy, 99.0, 2), 0)).unwrap();
        book.add(placed(Order::limit(0, 0, Side::Buy, 101.0, 1), 1)).unwrap();
        book.add(placed(Order::limit(0, 0, Side::Buy, 99.0, 3), 2)).unwrap();
        book.add(placed(Order::market(0, 0, Side::Buy, 4), 3)).unwrap();

        assert_eq!(
            book.price_volume(),
            vec![(None, 4), (Some(101.0), 1), (Some(99.0), 5)]
        );

        let mut sells = OrderBook::new(Side::Sell);
        sells.add(placed(Order::limit(0, 0, Side::Sell, 103.0, 1), 0)).unwrap();
        sells.add(placed(Order::limit(0, 0, Side::Sell, 102.0, 1), 1)).unwrap();
        assert_eq!(sells.price_volume(), vec![(Some(102.0), 1), (Some(103.0), 1)]);
    }
}
