mod order;
mod order_kind;
mod session;
mod side;

pub use order::{Action, Cancel, Order, OrderError};
pub use order_kind::OrderKind;
pub use session::Session;
pub use side::Side;
