use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cabin category a flight is sold in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FlightCategory {
    #[default]
    Economy,
    Basic,
    Business,
}

impl FlightCategory {
    pub const ALL: [FlightCategory; 3] = [
        FlightCategory::Economy,
        FlightCategory::Basic,
        FlightCategory::Business,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightCategory::Economy => "economy",
            FlightCategory::Basic => "basic",
            FlightCategory::Business => "business",
        }
    }
}

impl fmt::Display for FlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightCategory {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlightCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Airport {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub city: String,
}

impl Airport {
    /// Case-insensitive substring match on the city name, as used by search.
    pub fn city_matches(&self, query: &str) -> bool {
        self.city.to_lowercase().contains(&query.to_lowercase())
    }

    /// `"Moscow (SVO)"`
    pub fn label(&self) -> String {
        format!("{} ({})", self.city, self.code)
    }
}

/// A scheduled flight together with its seat counters.
///
/// `price` is an integer amount in minor currency units. The seat counters
/// satisfy `0 <= seats_available <= seats_total`; only
/// [`SeatInventory`](crate::inventory::SeatInventory) moves `seats_available`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: i64,
    pub flight_number: String,
    pub departure_airport_id: i64,
    pub arrival_airport_id: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub seats_total: i32,
    pub seats_available: i32,
    pub category: FlightCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a flight; seats start fully available.
#[derive(Debug, Clone)]
pub struct NewFlight {
    pub flight_number: String,
    pub departure_airport_id: i64,
    pub arrival_airport_id: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
    pub seats_total: i32,
    pub category: FlightCategory,
}

impl NewFlight {
    pub fn into_flight(self, id: i64, now: DateTime<Utc>) -> Flight {
        Flight {
            id,
            flight_number: self.flight_number,
            departure_airport_id: self.departure_airport_id,
            arrival_airport_id: self.arrival_airport_id,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            price: self.price,
            seats_total: self.seats_total,
            seats_available: self.seats_total,
            category: self.category,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial admin update. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct FlightUpdate {
    pub price: Option<i64>,
    pub seats_total: Option<i32>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub category: Option<FlightCategory>,
}

impl FlightUpdate {
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.seats_total.is_none()
            && self.departure_time.is_none()
            && self.arrival_time.is_none()
            && self.category.is_none()
    }

    /// Applies the update in place. Shrinking `seats_total` below the current
    /// availability pulls `seats_available` down with it.
    pub fn apply(&self, flight: &mut Flight, now: DateTime<Utc>) {
        if let Some(price) = self.price {
            flight.price = price;
        }
        if let Some(total) = self.seats_total {
            flight.seats_total = total;
            if flight.seats_available > flight.seats_total {
                flight.seats_available = flight.seats_total;
            }
        }
        if let Some(departure) = self.departure_time {
            flight.departure_time = departure;
        }
        if let Some(arrival) = self.arrival_time {
            flight.arrival_time = arrival;
        }
        if let Some(category) = self.category {
            flight.category = category;
        }
        flight.updated_at = now;
    }
}

/// A flight joined with both of its airports, the shape search and admin listings return.
#[derive(Debug, Clone, Serialize)]
pub struct FlightListing {
    pub flight: Flight,
    pub departure: Airport,
    pub arrival: Airport,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown flight category: {0}")]
    UnknownCategory(String),
    #[error("Invalid date format")]
    InvalidDate,
    #[error("Invalid passengers count: {0}")]
    InvalidPassengers(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample_flight() -> Flight {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        NewFlight {
            flight_number: "SU100".to_string(),
            departure_airport_id: 1,
            arrival_airport_id: 2,
            departure_time: now,
            arrival_time: now + chrono::Duration::hours(2),
            price: 100,
            seats_total: 5,
            category: FlightCategory::Economy,
        }
        .into_flight(1, now)
    }

    #[test]
    fn test_new_flight_starts_fully_available() {
        let flight = sample_flight();
        assert_eq!(flight.seats_available, flight.seats_total);
    }

    #[test]
    fn test_shrinking_capacity_clamps_availability() {
        let mut flight = sample_flight();
        let update = FlightUpdate { seats_total: Some(3), ..Default::default() };
        update.apply(&mut flight, Utc::now());
        assert_eq!(flight.seats_total, 3);
        assert_eq!(flight.seats_available, 3);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("business".parse::<FlightCategory>().unwrap(), FlightCategory::Business);
        assert!("first".parse::<FlightCategory>().is_err());
        assert_eq!(FlightCategory::default(), FlightCategory::Economy);
    }

    #[test]
    fn test_airport_city_match_is_case_insensitive() {
        let airport = Airport {
            id: 1,
            code: "SVO".to_string(),
            name: "Sheremetyevo".to_string(),
            city: "Moscow".to_string(),
        };
        assert!(airport.city_matches("mosc"));
        assert!(!airport.city_matches("Kazan"));
        assert_eq!(airport.label(), "Moscow (SVO)");
    }
}
