//! Eventro - ticket booking backend core
//!
//! Venues, events, shows and bookings kept in one partitioned key-value
//! table. Composite keys are built by [`keys`]; [`repository`] holds one
//! store per entity; [`services`] adds role checks and the booking
//! coordinator that keeps two customers from buying the same seat.

pub mod app;
pub mod config;
pub mod error;
pub mod keys;
pub mod model;
pub mod repository;
pub mod services;
pub mod storage;
pub mod utils;
pub mod validation;

pub use app::Eventro;
pub use error::{Error, Result};
