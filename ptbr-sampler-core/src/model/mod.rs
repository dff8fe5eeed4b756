//! Sampling layer of the generator.
//!
//! Reference tables are loaded once into `Arc`-shared, read-only structures
//! (`dataset`). Samplers pre-compute weighted pools over them and never
//! mutate afterwards; every draw takes the caller's random source.
//! - Weighted selection primitive (`WeightedPool`)
//! - State, city and CEP selection (`LocationSampler`)
//! - Period-aware names (`NameSampler`)
//! - Mobile phone numbers (`phone`)
//! - Whole profiles (`ProfileComposer`)

/// Reference data tables, their JSON layouts and the postcard snapshot.
pub mod dataset;

/// Population-weighted state and city selection, region filters and CEP drawing.
pub mod location;

/// First, middle and last names by birth-decade bucket.
pub mod name;

/// Mobile numbers with Brazilian area codes.
pub mod phone;

/// Composition of names, locations, documents and phones into profiles.
///
/// Also hosts the seeded multi-threaded batch builder.
pub mod profile;

/// Cumulative-weight sampling with or without replacement.
pub mod weighted;
