//! Order-book depth semantics of order status transitions.
//!
//! [`depth_delta`] is the single definition of how one order change moves
//! the displayed depth of its price level. Book publication and any
//! consumer rebuilding books from order events must agree on it.

use blockdex_types::{OrderChange, OrderStatus};

/// Signed change in resting quantity at the order's price level.
///
/// - `Ack` adds the full quantity.
/// - `PartialFill` / `FullyFill` remove what this execution consumed.
/// - `Expired` / `IocNoFill` / `Canceled` remove the unexecuted remainder
///   (`cum_qty - quantity`, never positive).
///
/// Any other status is a logic error upstream: it is logged and contributes
/// nothing.
#[must_use]
pub fn depth_delta(status: OrderStatus, quantity: i64, cum_qty: i64, last_executed_qty: i64) -> i64 {
    match status {
        OrderStatus::Ack => quantity,
        OrderStatus::PartialFill | OrderStatus::FullyFill => -last_executed_qty,
        OrderStatus::Expired | OrderStatus::IocNoFill | OrderStatus::Canceled => cum_qty - quantity,
        other => {
            tracing::error!(status = %other, "Order status has no depth semantics; using zero delta");
            0
        }
    }
}

/// [`depth_delta`] of an order change.
#[must_use]
pub fn change_delta(change: &OrderChange) -> i64 {
    depth_delta(
        change.status,
        change.qty,
        change.cum_qty,
        change.last_executed_qty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_adds_quantity() {
        assert_eq!(depth_delta(OrderStatus::Ack, 100, 0, 0), 100);
    }

    #[test]
    fn fills_remove_last_execution() {
        assert_eq!(depth_delta(OrderStatus::PartialFill, 100, 30, 30), -30);
        assert_eq!(depth_delta(OrderStatus::FullyFill, 100, 100, 70), -70);
    }

    #[test]
    fn closes_remove_remainder() {
        assert_eq!(depth_delta(OrderStatus::Canceled, 100, 0, 0), -100);
        assert_eq!(depth_delta(OrderStatus::Expired, 100, 60, 10), -40);
        assert_eq!(depth_delta(OrderStatus::IocNoFill, 5, 0, 0), -5);
    }

    #[test]
    fn lifecycle_nets_to_zero() {
        let q = 1_000;
        let deltas = [
            depth_delta(OrderStatus::Ack, q, 0, 0),
            depth_delta(OrderStatus::PartialFill, q, 300, 300),
            depth_delta(OrderStatus::PartialFill, q, 550, 250),
            depth_delta(OrderStatus::Expired, q, 550, 250),
        ];
        assert_eq!(deltas.iter().sum::<i64>(), 0);

        let filled = [
            depth_delta(OrderStatus::Ack, q, 0, 0),
            depth_delta(OrderStatus::PartialFill, q, 400, 400),
            depth_delta(OrderStatus::FullyFill, q, q, 600),
        ];
        assert_eq!(filled.iter().sum::<i64>(), 0);
    }

    #[test]
    fn unpublishable_status_is_zero() {
        assert_eq!(depth_delta(OrderStatus::FailedBlocking, 100, 0, 0), 0);
        assert_eq!(depth_delta(OrderStatus::FailedMatching, 100, 50, 50), 0);
    }
}
