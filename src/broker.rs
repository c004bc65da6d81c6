//! Execution seam
//!
//! The signal engine only needs to submit a sell and ask whether a position
//! is open. [`SimBroker`] is the in-process implementation used by the replay
//! harness: market orders fill at the next bar's open, and an armed
//! stop/target bracket closes the short when a later bar touches it.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{Bar, Order, OrderExecution, OrderId, OrderStatus, OrderType, Side};

/// Order submission and position state provided by the execution side
pub trait Broker {
    /// Submit a sell order and return its handle
    fn submit_sell(&mut self, size: f64, order_type: OrderType, price: f64) -> OrderId;

    /// True while a position (or an order that will open one) exists
    fn has_open_position(&self) -> bool;
}

/// Open short held by the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct SimPosition {
    pub size: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop: Option<f64>,
    pub target: Option<f64>,
}

/// Single-position simulated broker
#[derive(Debug, Default)]
pub struct SimBroker {
    next_id: OrderId,
    pending: Option<Order>,
    position: Option<SimPosition>,
    bracket: Option<(f64, f64)>,
    /// Time stamped on newly created orders
    clock: Option<DateTime<Utc>>,
}

impl SimBroker {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Advance the broker clock to the bar being processed
    pub fn set_time(&mut self, now: DateTime<Utc>) {
        self.clock = Some(now);
    }

    /// Arm a stop/target bracket for the pending or open short
    pub fn set_bracket(&mut self, stop: f64, target: f64) {
        match self.position.as_mut() {
            Some(pos) => {
                pos.stop = Some(stop);
                pos.target = Some(target);
            }
            None => self.bracket = Some((stop, target)),
        }
    }

    pub fn position(&self) -> Option<&SimPosition> {
        self.position.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fill the pending market order at `bar.open`
    pub fn fill_pending(&mut self, bar: &Bar) -> Option<Order> {
        let mut order = self.pending.take()?;
        order.status = OrderStatus::Completed;
        order.executed = Some(OrderExecution {
            price: bar.open,
            size: order.size,
            datetime: bar.datetime,
        });

        let (stop, target) = match self.bracket.take() {
            Some((s, t)) => (Some(s), Some(t)),
            None => (None, None),
        };
        self.position = Some(SimPosition {
            size: order.size,
            entry_price: bar.open,
            entry_time: bar.datetime,
            stop,
            target,
        });

        info!(
            order_id = order.id,
            price = bar.open,
            time = %bar.datetime,
            "SELL EXECUTED"
        );
        Some(order)
    }

    /// Close the open short if `bar` reaches its stop (checked first) or target
    pub fn check_exits(&mut self, bar: &Bar) -> Option<Order> {
        let pos = self.position.as_ref()?;

        let exit_price = match (pos.stop, pos.target) {
            (Some(stop), _) if bar.high >= stop => Some(stop.max(bar.open)),
            (_, Some(target)) if bar.low <= target => Some(target.min(bar.open)),
            _ => None,
        }?;

        let size = pos.size;
        self.position = None;
        let id = self.allocate_id();
        debug!(order_id = id, price = exit_price, "Bracket exit triggered");
        info!(order_id = id, price = exit_price, time = %bar.datetime, "BUY EXECUTED");

        Some(Order {
            id,
            side: Side::Buy,
            order_type: OrderType::Market,
            status: OrderStatus::Completed,
            size,
            price: Some(exit_price),
            executed: Some(OrderExecution {
                price: exit_price,
                size,
                datetime: bar.datetime,
            }),
            created_time: bar.datetime,
        })
    }

    fn allocate_id(&mut self) -> OrderId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }
}

impl Broker for SimBroker {
    fn submit_sell(&mut self, size: f64, order_type: OrderType, price: f64) -> OrderId {
        let id = self.allocate_id();
        let created_time = self.clock.unwrap_or_else(Utc::now);
        debug!(order_id = id, size, price, ?order_type, "Sell order submitted");

        self.pending = Some(Order {
            id,
            side: Side::Sell,
            order_type,
            status: OrderStatus::Submitted,
            size,
            price: Some(price),
            executed: None,
            created_time,
        });
        id
    }

    fn has_open_position(&self) -> bool {
        self.pending.is_some() || self.position.is_some()
    }
}
