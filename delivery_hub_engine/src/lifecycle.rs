//! The order lifecycle state machine.
//!
//! A fixed, directed transition table over [`OrderStatus`]. `Cancelled` and `Delivered` are terminal; nothing
//! leaves them, including a second cancellation. Cancellation is legal from every non-terminal state. All forward
//! transitions are monotonic: once an order is `Ready` it can never go back to `InPreparation`.
//!
//! The table is consulted inside the storage layer's compare-and-set status write, so concurrent writers that
//! race on the same order serialize and the loser is judged against the winner's committed state.
use crate::db_types::OrderStatus;

impl OrderStatus {
    /// True for statuses that permit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Delivered)
    }

    /// The full transition table. Keep this exhaustive and boring; every legal edge is spelled out.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self.is_terminal() || *self == next {
            return false;
        }
        // Cancellation is always available until the order terminates.
        if next == Cancelled {
            return true;
        }
        matches!(
            (*self, next),
            (New, Accepted)
                | (New, Rejected)
                | (Accepted, InPreparation)
                | (InPreparation, Ready)
                | (Ready, PickedUp)
                | (Ready, OnRoute)
                | (PickedUp, OnRoute)
                | (PickedUp, Delivered)
                | (OnRoute, Delivered)
        )
    }
}
