use agora_core::{OrderId, Side, Volume};
use thiserror::Error;

/// Contract violations raised by an order book side
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("Order side {order:?} does not match book side {book:?}")]
    WrongSide { order: Side, book: Side },

    #[error("Order has not been assigned an id by its market")]
    MissingOrderId,

    #[error("Order {0} is already in the book")]
    DuplicateOrder(OrderId),

    #[error("Order {0} is not in the book")]
    UnknownOrder(OrderId),

    #[error("Order {order_id} volume would become negative ({volume})")]
    NegativeVolume { order_id: OrderId, volume: Volume },
}

pub type BookResult<T> = std::result::Result<T, BookError>;
