use avia_shared::RepoResult;
use chrono::{NaiveDate, Utc};
use rand::Rng;

use crate::repository::BookingTx;

pub const TICKET_PREFIX: &str = "ETK";

/// Mints `ETK-<YYYYMMDD>-<NNNN>` ticket numbers.
///
/// The random part only has 10,000 values per day, so `generate` keeps
/// drawing until the store reports the candidate unused. Under heavy daily
/// volume the retries grow without bound.
pub struct TicketNumberGenerator;

impl TicketNumberGenerator {
    pub fn candidate<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
        let serial: u16 = rng.gen_range(0..=9999);
        format!("{}-{}-{:04}", TICKET_PREFIX, date.format("%Y%m%d"), serial)
    }

    /// A fresh number unused among stored tickets, including tickets written
    /// earlier in `tx`.
    pub async fn generate(tx: &mut dyn BookingTx) -> RepoResult<String> {
        let mut collisions = 0u32;
        loop {
            let candidate = Self::candidate(Utc::now().date_naive(), &mut rand::thread_rng());
            if !tx.ticket_number_exists(&candidate).await? {
                if collisions > 0 {
                    tracing::debug!(collisions, "Ticket number found after collisions");
                }
                return Ok(candidate);
            }
            collisions += 1;
        }
    }

    pub fn is_well_formed(ticket_number: &str) -> bool {
        let mut parts = ticket_number.split('-');
        let (Some(prefix), Some(date), Some(serial), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };

        prefix == TICKET_PREFIX
            && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
            && date.len() == 8
            && serial.len() == 4
            && serial.chars().all(|c| c.is_ascii_digit())
    }
}
