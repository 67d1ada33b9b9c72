pub mod flight;
pub mod inventory;
pub mod search;

pub use flight::{Airport, CatalogError, Flight, FlightCategory, FlightListing, FlightUpdate, NewFlight};
pub use inventory::{InventoryError, SeatInventory};
pub use search::{FlightSearch, FlightSearchParams};
