use avia_catalog::Flight;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::OrderError;

/// Refund marker written when a paid order is cancelled with a refund.
pub const REFUND_PROCESSED: &str = "processed";

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

/// A purchase made through checkout. `total` is in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total: i64,
    pub refund_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub status: OrderStatus,
    pub total: i64,
}

impl NewOrder {
    pub fn into_order(self, id: i64, now: DateTime<Utc>) -> Order {
        Order {
            id,
            user_id: self.user_id,
            status: self.status,
            total: self.total,
            refund_status: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Issued ticket; never modified after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: i64,
    pub order_id: i64,
    pub flight_id: i64,
    pub ticket_number: String,
    pub passenger_name: String,
    pub seat_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub order_id: i64,
    pub flight_id: i64,
    pub ticket_number: String,
    pub passenger_name: String,
    pub seat_number: Option<String>,
}

impl NewTicket {
    pub fn into_ticket(self, id: i64, now: DateTime<Utc>) -> Ticket {
        Ticket {
            id,
            order_id: self.order_id,
            flight_id: self.flight_id,
            ticket_number: self.ticket_number,
            passenger_name: self.passenger_name,
            seat_number: self.seat_number,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub flight_id: i64,
    pub passenger_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Passenger for the ticket, falling back to the account holder's name.
    pub fn passenger_or(&self, fallback: &str) -> String {
        let name = self.passenger_name.trim();
        if name.is_empty() {
            fallback.to_string()
        } else {
            name.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub user_id: i64,
    pub flight_id: i64,
    pub passenger_name: String,
}

impl NewCartItem {
    pub fn into_item(self, id: i64, now: DateTime<Utc>) -> CartItem {
        CartItem {
            id,
            user_id: self.user_id,
            flight_id: self.flight_id,
            passenger_name: self.passenger_name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A cart row with its flight. `flight` is `None` when the flight has been deleted.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: CartItem,
    pub flight: Option<Flight>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IssuedTicket {
    pub ticket_number: String,
    pub passenger: String,
}

/// Result of a successful checkout
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub status: OrderStatus,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<IssuedTicket>,
}

/// Listing row for order overviews.
#[derive(Debug, Clone)]
pub struct OrderOverview {
    pub order: Order,
    pub tickets_count: i64,
    pub user_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_string(&OrderStatus::Refunded).unwrap(), "\"refunded\"");
    }

    #[test]
    fn test_passenger_fallback() {
        let now = Utc::now();
        let mut item = NewCartItem { user_id: 1, flight_id: 2, passenger_name: "  ".into() }
            .into_item(1, now);
        assert_eq!(item.passenger_or("Ivan Petrov"), "Ivan Petrov");

        item.passenger_name = "Anna Petrova".into();
        assert_eq!(item.passenger_or("Ivan Petrov"), "Anna Petrova");
    }
}
