//! Read path for list and detail pages.

mod sample;
mod service;

pub use sample::sample_items;
pub use service::{Listing, ListingError, ListingService, ListingSource};
