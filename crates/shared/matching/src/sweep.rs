use agora_core::{OrderId, Price, Volume};
use agora_ports::MatchingAlgorithm;

use crate::OrderBook;

/// One planned execution between the two books
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub volume: Volume,
}

/// Walk both books from the top and pair orders until they stop crossing.
///
/// The books are not modified; the caller materialises the returned fills.
/// Market-vs-market pairs take the price of the first priced pair that
/// follows them. If none follows, they are dropped and the plan is empty.
pub fn plan_sweep<M>(algorithm: &M, buy_book: &OrderBook, sell_book: &OrderBook) -> Vec<Fill>
where
    M: MatchingAlgorithm + ?Sized,
{
    let mut buys = buy_book.sorted_orders();
    let mut sells = sell_book.sorted_orders();
    let (Some(mut buy), Some(mut sell)) = (buys.next(), sells.next()) else {
        return Vec::new();
    };
    let mut buy_left = buy.volume;
    let mut sell_left = sell.volume;

    let mut fills: Vec<Fill> = Vec::new();
    let mut deferred: Vec<(OrderId, OrderId, Volume)> = Vec::new();

    loop {
        if !algorithm.can_match(buy, sell) {
            break;
        }
        let (Some(buy_id), Some(sell_id)) = (buy.order_id, sell.order_id) else {
            break;
        };

        let volume = buy_left.min(sell_left);
        match algorithm.execution_price(buy, sell) {
            Some(price) => {
                fills.extend(deferred.drain(..).map(|(buy_order_id, sell_order_id, volume)| Fill {
                    buy_order_id,
                    sell_order_id,
                    price,
                    volume,
                }));
                fills.push(Fill {
                    buy_order_id: buy_id,
                    sell_order_id: sell_id,
                    price,
                    volume,
                });
            }
            None => deferred.push((buy_id, sell_id, volume)),
        }

        buy_left -= volume;
        sell_left -= volume;
        if buy_left == 0 {
            match buys.next() {
                Some(next) => {
                    buy = next;
                    buy_left = next.volume;
                }
                None => break,
            }
        }
        if sell_left == 0 {
            match sells.next() {
                Some(next) => {
                    sell = next;
                    sell_left = next.volume;
                }
                None => break,
            }
        }
    }

    fills
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PriceTimeMatching;
    use agora_core::{Order, Side};

    fn book(side: Side, orders: Vec<Order>) -> OrderBook {
        let mut book = OrderBook::new(side);
        for order in orders {
            book.add(order).unwrap();
        }
        book
    }

    fn with_id(mut order: Order, order_id: OrderId) -> Order {
        order.order_id = Some(order_id);
        order
    }

    #[test]
    fn test_empty_books_plan_nothing() {
        let buys = OrderBook::new(Side::Buy);
        let sells = book(Side::Sell, vec![with_id(Order::limit(0, 0, Side::Sell, 1.0, 1), 0)]);
        assert!(plan_sweep(&PriceTimeMatching, &buys, &sells).is_empty());
    }

    #[test]
    fn test_partial_fill_walks_levels() {
        let buys = book(Side::Buy, vec![with_id(Order::limit(0, 0, Side::Buy, 102.0, 5), 0)]);
        let sells = book(
            Side::Sell,
            vec![
                with_id(Order::limit(1, 0, Side::Sell, 100.0, 2), 1),
                with_id(Order::limit(2, 0, Side::Sell, 101.0, 2), 2),
                with_id(Order::limit(3, 0, Side::Sell, 103.0, 2), 3),
            ],
        );

        let fills = plan_sweep(&PriceTimeMatching, &buys, &sells);
        assert_eq!(fills.len(), 2);
        assert_eq!((fills[0].sell_order_id, fills[0].volume), (1, 2));
        assert_eq!((fills[1].sell_order_id, fills[1].volume), (2, 2));
        // Same step: the buy has the smaller id and sets the price
        assert!(fills.iter().all(|f| f.price == 102.0));
    }

    #[test]
    fn test_market_pair_takes_following_limit_price() {
        let buys = book(
            Side::Buy,
            vec![with_id(Order::market(0, 0, Side::Buy, 3), 0)],
        );
        let sells = book(
            Side::Sell,
            vec![
                with_id(Order::market(1, 0, Side::Sell, 1), 1),
                with_id(Order::limit(2, 0, Side::Sell, 99.5, 4), 2),
            ],
        );

        let fills = plan_sweep(&PriceTimeMatching, &buys, &sells);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].sell_order_id, 1);
        assert_eq!(fills[0].price, 99.5);
        assert_eq!(fills[1].volume, 2);
    }

    #[test]
    fn test_market_pair_without_limit_price_is_dropped() {
        let buys = book(Side::Buy, vec![with_id(Order::market(0, 0, Side::Buy, 1), 0)]);
        let sells = book(Side::Sell, vec![with_id(Order::market(1, 0, Side::Sell, 1), 1)]);
        assert!(plan_sweep(&PriceTimeMatching, &buys, &sells).is_empty());
    }
}
