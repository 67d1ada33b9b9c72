use chrono::{NaiveDate, NaiveTime, DateTime, Utc};
use serde::Deserialize;

use crate::flight::{Airport, CatalogError, Flight, FlightCategory};

/// Raw query string of `GET /api/flights/search`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct FlightSearchParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
    pub passengers: Option<String>,
    pub category: Option<String>,
}

/// Validated search filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSearch {
    pub from_city: Option<String>,
    pub to_city: Option<String>,
    pub date: Option<NaiveDate>,
    pub passengers: i32,
    pub category: Option<FlightCategory>,
}

impl Default for FlightSearch {
    fn default() -> Self {
        Self {
            from_city: None,
            to_city: None,
            date: None,
            passengers: 1,
            category: None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<FlightSearchParams> for FlightSearch {
    type Error = CatalogError;

    fn try_from(params: FlightSearchParams) -> Result<Self, Self::Error> {
        let date = match non_blank(params.date) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .ok()
                    // chrono accepts "2025-3-1"; only the zero-padded form is valid here
                    .filter(|d| d.format("%Y-%m-%d").to_string() == raw)
                    .ok_or(CatalogError::InvalidDate)?,
            ),
            None => None,
        };

        let passengers = match non_blank(params.passengers) {
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| CatalogError::InvalidPassengers(raw.clone()))?
                .max(1),
            None => 1,
        };

        // Unknown categories are ignored rather than rejected.
        let category = non_blank(params.category).and_then(|c| c.parse().ok());

        Ok(Self {
            from_city: non_blank(params.from),
            to_city: non_blank(params.to),
            date,
            passengers,
            category,
        })
    }
}

impl FlightSearch {
    /// UTC bounds `[start, end)` of the requested departure day.
    pub fn departure_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.date.map(|d| {
            let start = d.and_time(NaiveTime::MIN).and_utc();
            (start, start + chrono::Duration::days(1))
        })
    }

    /// In-process form of the search predicate.
    pub fn matches(&self, flight: &Flight, departure: &Airport, arrival: &Airport) -> bool {
        if flight.seats_available < self.passengers {
            return false;
        }
        if let Some(city) = &self.from_city {
            if !departure.city_matches(city) {
                return false;
            }
        }
        if let Some(city) = &self.to_city {
            if !arrival.city_matches(city) {
                return false;
            }
        }
        if let Some((start, end)) = self.departure_window() {
            if flight.departure_time < start || flight.departure_time >= end {
                return false;
            }
        }
        if let Some(category) = self.category {
            if flight.category != category {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::tests::sample_flight;

    fn airport(id: i64, code: &str, city: &str) -> Airport {
        Airport { id, code: code.into(), name: format!("{} airport", city), city: city.into() }
    }

    #[test]
    fn test_params_validation() {
        let search = FlightSearch::try_from(FlightSearchParams {
            from: Some(" Moscow ".into()),
            date: Some("2025-03-01".into()),
            passengers: Some("2".into()),
            category: Some("first".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(search.from_city.as_deref(), Some("Moscow"));
        assert_eq!(search.passengers, 2);
        assert_eq!(search.category, None);
        assert_eq!(search.date, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        for raw in ["01.03.2025", "2025-3-1", "2025-02-30"] {
            let result = FlightSearch::try_from(FlightSearchParams {
                date: Some(raw.into()),
                ..Default::default()
            });
            assert!(matches!(result, Err(CatalogError::InvalidDate)), "{raw}");
        }
    }

    #[test]
    fn test_matches() {
        let flight = sample_flight();
        let svo = airport(1, "SVO", "Moscow");
        let led = airport(2, "LED", "Saint Petersburg");

        let mut search = FlightSearch {
            from_city: Some("mosc".into()),
            to_city: Some("petersburg".into()),
            date: NaiveDate::from_ymd_opt(2025, 3, 1),
            ..Default::default()
        };
        assert!(search.matches(&flight, &svo, &led));

        search.passengers = 6;
        assert!(!search.matches(&flight, &svo, &led));

        search.passengers = 1;
        search.date = NaiveDate::from_ymd_opt(2025, 3, 2);
        assert!(!search.matches(&flight, &svo, &led));

        search.date = None;
        search.category = Some(FlightCategory::Business);
        assert!(!search.matches(&flight, &svo, &led));
    }
}
