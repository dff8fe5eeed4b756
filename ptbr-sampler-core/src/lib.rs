//! Synthetic Brazilian personal data.
//!
//! This crate samples realistic records from population-weighted reference
//! tables:
//! - Locations (state, city, CEP) weighted by population
//! - Names weighted by frequency within a birth-decade bucket
//! - CPF, RG, PIS, CNPJ and CEI numbers with valid check digits
//! - Complete profiles, sequentially or across threads
//!
//! Samplers are immutable and thread-safe. Randomness is always supplied by
//! the caller, so a seeded `ChaCha8Rng` makes any run reproducible.

/// Samplers and reference data.
pub mod model;

/// Document number generation and validation.
pub mod document;

/// Crate error type.
pub mod error;

/// File helpers and path handling.
pub mod io;

pub use document::{DocumentKind, DocumentNumber};
pub use error::{Error, Result};
pub use model::dataset::ReferenceData;
pub use model::location::{LocationFormat, LocationSampler, Region, RegionFilter};
pub use model::name::{NameFormat, NameOptions, NameSampler, NameStyle, TimePeriod};
pub use model::profile::{Profile, ProfileComposer, ProfileOptions, ProfileRecord};
pub use model::weighted::WeightedPool;
