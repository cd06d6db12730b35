//! Input validation for booking and catalog data.
//!
//! Seat codes, prices and free-text fields are checked here before any
//! repository write. Failures are `ValidationError`s: surfaced to the
//! caller with a readable reason and never retried.

use std::collections::HashSet;

use thiserror::Error;

/// Limits for validated fields.
pub mod limits {
    /// First seat row letter.
    pub const FIRST_ROW: char = 'A';
    /// Last seat row letter.
    pub const LAST_ROW: char = 'J';
    /// Highest seat column number (columns start at 1).
    pub const MAX_COLUMN: u32 = 10;
    /// Most seats one booking may reserve (the whole grid).
    pub const MAX_SEATS_PER_BOOKING: usize = 100;
    /// Minimum artist biography length in characters.
    pub const MIN_ARTIST_BIO_LENGTH: usize = 12;
}

/// Error constants for validation failures.
pub mod errmsg {
    pub const NO_SEATS: &str = "booking must request at least one seat";
    pub const TOO_MANY_SEATS: &str = "booking requests more seats than the venue holds";
    pub const INVALID_PRICE: &str = "price must be a non-negative finite number";
    pub const SEAT_ALREADY_BOOKED: &str = "seat already booked";
    pub const INVALID_SEAT: &str = "invalid seat code (rows A-J, columns 1-10)";
    pub const DUPLICATE_SEAT: &str = "seat requested more than once";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{msg}", msg = errmsg::NO_SEATS)]
    NoSeats,

    #[error("{msg} (max: {max}, got: {got})", msg = errmsg::TOO_MANY_SEATS)]
    TooManySeats { max: usize, got: usize },

    #[error("{msg}: {0}", msg = errmsg::SEAT_ALREADY_BOOKED)]
    SeatAlreadyBooked(String),

    #[error("{msg}: {0}", msg = errmsg::INVALID_SEAT)]
    InvalidSeat(String),

    #[error("{msg}: {0}", msg = errmsg::DUPLICATE_SEAT)]
    DuplicateSeat(String),

    #[error("{msg}", msg = errmsg::INVALID_PRICE)]
    InvalidPrice,

    #[error("invalid show time: {0}")]
    InvalidShowTime(String),

    #[error("artist bio must be at least {min} characters")]
    BioTooShort { min: usize },

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Canonical (upper-case) form of a seat code. Whitespace is kept, so a
/// padded code stays invalid.
pub fn normalize_seat(seat: &str) -> String {
    seat.to_ascii_uppercase()
}

/// Whether `seat` addresses a cell of the A-J x 1-10 grid.
///
/// Case-insensitive; equivalent to `^[A-J](10|[1-9])$`.
pub fn is_valid_seat(seat: &str) -> bool {
    let mut chars = seat.chars();
    let Some(row) = chars.next() else {
        return false;
    };
    if !(limits::FIRST_ROW..=limits::LAST_ROW).contains(&row.to_ascii_uppercase()) {
        return false;
    }
    let column = chars.as_str();
    // Rejects "0", "01", "+1" and anything past the last column.
    if column.is_empty() || column.starts_with('0') || !column.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    column
        .parse::<u32>()
        .is_ok_and(|n| (1..=limits::MAX_COLUMN).contains(&n))
}

/// Check a seat request against the seats already booked on a show.
///
/// Each requested seat is checked in order: already booked, then grid
/// validity, then repetition within the request. Returns the normalized
/// seat codes in request order.
pub fn check_seat_request(requested: &[String], booked: &HashSet<String>) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Err(ValidationError::NoSeats);
    }
    if requested.len() > limits::MAX_SEATS_PER_BOOKING {
        return Err(ValidationError::TooManySeats {
            max: limits::MAX_SEATS_PER_BOOKING,
            got: requested.len(),
        });
    }

    let mut seen = HashSet::with_capacity(requested.len());
    let mut seats = Vec::with_capacity(requested.len());
    for seat in requested {
        let seat = normalize_seat(seat);
        if booked.contains(&seat) {
            return Err(ValidationError::SeatAlreadyBooked(seat));
        }
        if !is_valid_seat(&seat) {
            return Err(ValidationError::InvalidSeat(seat));
        }
        if !seen.insert(seat.clone()) {
            return Err(ValidationError::DuplicateSeat(seat));
        }
        seats.push(seat);
    }
    Ok(seats)
}

pub fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::InvalidPrice);
    }
    Ok(())
}

pub fn validate_artist_bio(bio: &str) -> Result<()> {
    if bio.chars().count() < limits::MIN_ARTIST_BIO_LENGTH {
        return Err(ValidationError::BioTooShort {
            min: limits::MIN_ARTIST_BIO_LENGTH,
        });
    }
    Ok(())
}

pub fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}
