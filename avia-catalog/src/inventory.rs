use crate::flight::Flight;

/// Seat counter rules for a single flight.
///
/// These operate on the plain struct; stores apply them inside a transaction
/// (or express them as a guarded `UPDATE`) so concurrent reservations cannot
/// take the counter below zero.
pub struct SeatInventory;

impl SeatInventory {
    pub fn has_available_seats(flight: &Flight, count: i32) -> bool {
        flight.seats_available >= count
    }

    /// Take `count` seats. On failure the counter is left untouched.
    pub fn reserve(flight: &mut Flight, count: i32) -> Result<(), InventoryError> {
        if count <= 0 {
            return Err(InventoryError::InvalidCount(count));
        }

        if !Self::has_available_seats(flight, count) {
            return Err(InventoryError::InsufficientSeats {
                flight_id: flight.id,
                requested: count,
                available: flight.seats_available,
            });
        }

        flight.seats_available -= count;
        Ok(())
    }

    /// Give `count` seats back, never beyond `seats_total`.
    ///
    /// Over-release is clamped silently rather than reported.
    pub fn release(flight: &mut Flight, count: i32) {
        if count <= 0 {
            return;
        }
        flight.seats_available = flight
            .seats_available
            .saturating_add(count)
            .min(flight.seats_total);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("Insufficient seats on flight {flight_id}: requested {requested}, available {available}")]
    InsufficientSeats {
        flight_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("Seat count must be positive, got {0}")]
    InvalidCount(i32),
}
