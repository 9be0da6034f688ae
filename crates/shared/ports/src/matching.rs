use agora_core::{Order, Price};

/// Port for execution-price policies
///
/// A policy decides, for one buy/sell pair taken from the top of the books,
/// whether the pair crosses and at which price it trades:
/// - Price-Time: the resting (earlier) order sets the price
/// - etc.
pub trait MatchingAlgorithm: Send + Sync {
    /// Check if two resting orders can trade against each other
    fn can_match(&self, buy_order: &Order, sell_order: &Order) -> bool;

    /// Price for a crossing pair. `None` defers the price (market vs market).
    fn execution_price(&self, buy_order: &Order, sell_order: &Order) -> Option<Price>;

    /// Get the name of the algorithm
    fn name(&self) -> &str;
}
