use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dataset::ReferenceData;
use super::location::{LocationSampler, RegionFilter};
use super::name::{NameComponents, NameOptions, NameSampler};
use super::phone;
use crate::document::{self, DocumentKind, DocumentNumber};
use crate::error::{Error, Result};

/// Profiles built per chunk by [`ProfileComposer::build_profiles_parallel`].
///
/// Fixed so that chunk boundaries, and therefore chunk seeds, do not depend
/// on the machine's core count.
const CHUNK_SIZE: usize = 256;

/// What a profile contains.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileOptions {
	pub include_name: bool,
	pub include_location: bool,
	pub documents: BTreeSet<DocumentKind>,
	pub region_filter: Option<RegionFilter>,
	pub name: NameOptions,
	/// Append `/UF` to RG numbers.
	pub include_rg_issuer: bool,
	pub include_phone: bool,
	pub cep_with_dash: bool,
}

impl Default for ProfileOptions {
	/// Name, location, CPF and RG.
	fn default() -> Self {
		Self {
			include_name: true,
			include_location: true,
			documents: BTreeSet::from([DocumentKind::Cpf, DocumentKind::Rg]),
			region_filter: None,
			name: NameOptions::default(),
			include_rg_issuer: false,
			include_phone: false,
			cep_with_dash: true,
		}
	}
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProfileLocation {
	pub state: String,
	pub state_abbreviation: String,
	pub city: String,
	pub cep: String,
}

/// One synthetic person.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Profile {
	/// Name components, already in the requested style.
	pub name: Option<NameComponents>,
	pub location: Option<ProfileLocation>,
	pub documents: BTreeMap<DocumentKind, DocumentNumber>,
	pub phone: Option<String>,
}

impl Profile {
	pub fn document(&self, kind: DocumentKind) -> Option<&DocumentNumber> {
		self.documents.get(&kind)
	}

	/// First name, middle name and surnames joined by spaces.
	pub fn full_name(&self) -> Option<String> {
		self.name.as_ref().map(|name| {
			let mut parts = vec![name.first_name.as_str()];
			parts.extend(name.middle_name.as_deref());
			parts.extend(name.surnames.iter().map(String::as_str));
			parts.join(" ")
		})
	}

	/// Flattens the profile; missing parts become empty strings.
	pub fn to_record(&self) -> ProfileRecord {
		let mut record = ProfileRecord::default();
		if let Some(name) = &self.name {
			record.name = name.first_name.clone();
			record.middle_name = name.middle_name.clone().unwrap_or_default();
			record.surnames = name.surnames.join(" ");
		}
		if let Some(location) = &self.location {
			record.city = location.city.clone();
			record.state = location.state.clone();
			record.state_abbr = location.state_abbreviation.clone();
			record.cep = location.cep.clone();
		}
		for (kind, number) in &self.documents {
			let slot = match kind {
				DocumentKind::Cpf => &mut record.cpf,
				DocumentKind::Rg => &mut record.rg,
				DocumentKind::Pis => &mut record.pis,
				DocumentKind::Cnpj => &mut record.cnpj,
				DocumentKind::Cei => &mut record.cei,
			};
			*slot = number.formatted().to_owned();
		}
		record.phone = self.phone.clone().unwrap_or_default();
		record
	}
}

/// Flat, string-only view of a [`Profile`], one line of JSONL output.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileRecord {
	pub name: String,
	pub middle_name: String,
	pub surnames: String,
	pub city: String,
	pub state: String,
	pub state_abbr: String,
	pub cep: String,
	pub cpf: String,
	pub rg: String,
	pub pis: String,
	pub cnpj: String,
	pub cei: String,
	pub phone: String,
}

/// Combines the location and name samplers with the document generators.
///
/// Immutable once built and shared by reference between threads.
#[derive(Debug)]
pub struct ProfileComposer {
	locations: LocationSampler,
	names: NameSampler,
}

impl ProfileComposer {
	pub fn new(locations: LocationSampler, names: NameSampler) -> Self {
		Self { locations, names }
	}

	/// Builds both samplers over `reference`.
	pub fn from_reference(reference: &ReferenceData) -> Result<Self> {
		let locations = LocationSampler::new(reference.locations.clone())?;
		let names = NameSampler::new(reference.names.clone())?;
		Ok(Self::new(locations, names))
	}

	pub fn locations(&self) -> &LocationSampler {
		&self.locations
	}

	pub fn names(&self) -> &NameSampler {
		&self.names
	}

	/// Builds one profile.
	///
	/// The location is always drawn first, since the RG scheme and the phone
	/// area code depend on it, even when it is left out of the profile.
	///
	/// # Errors
	/// The first sampler error aborts the profile.
	pub fn build_profile<R: Rng + ?Sized>(&self, rng: &mut R, options: &ProfileOptions) -> Result<Profile> {
		let sample = self.locations.get_state_and_city(rng, options.region_filter.as_ref())?;
		let cep = self.locations.random_cep(rng, sample.city);
		let location = options.include_location.then(|| ProfileLocation {
			state: sample.state_name().to_owned(),
			state_abbreviation: sample.state_abbreviation().to_owned(),
			city: sample.city_name().to_owned(),
			cep: cep.format(options.cep_with_dash),
		});

		let name = if options.include_name {
			Some(self.names.get_random_name(rng, &options.name)?.styled(options.name.style))
		} else {
			None
		};

		let documents = options
			.documents
			.iter()
			.map(|kind| {
				let number =
					document::generate(*kind, rng, Some(sample.state_abbreviation()), options.include_rg_issuer);
				(*kind, number)
			})
			.collect();

		let phone = options.include_phone.then(|| phone::generate(rng, sample.city.ddd));

		Ok(Profile { name, location, documents, phone })
	}

	/// Builds `quantity` profiles from one random source.
	///
	/// # Errors
	/// [`Error::InvalidCount`] when `quantity` is 0, otherwise the first
	/// [`ProfileComposer::build_profile`] error.
	pub fn build_profiles<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		options: &ProfileOptions,
		quantity: usize,
	) -> Result<Vec<Profile>> {
		if quantity == 0 {
			return Err(Error::InvalidCount { requested: 0, available: 0 });
		}
		(0..quantity).map(|_| self.build_profile(rng, options)).collect()
	}

	/// Builds `quantity` profiles across worker threads.
	///
	/// The quantity is cut into chunks; chunk `i` draws from a ChaCha8 stream
	/// `i` seeded with `seed`, and chunks are reassembled in order. The result
	/// depends only on `seed`, `options` and `quantity`.
	pub fn build_profiles_parallel(&self, seed: u64, options: &ProfileOptions, quantity: usize) -> Result<Vec<Profile>> {
		if quantity == 0 {
			return Err(Error::InvalidCount { requested: 0, available: 0 });
		}

		let chunks: Vec<usize> =
			(0..quantity).step_by(CHUNK_SIZE).map(|start| CHUNK_SIZE.min(quantity - start)).collect();
		let workers = num_cpus::get().clamp(1, chunks.len());
		debug!(quantity, chunks = chunks.len(), workers, "building profiles in parallel");

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for worker in 0..workers {
				let tx = tx.clone();
				let chunks = &chunks;
				scope.spawn(move || {
					for (index, size) in chunks.iter().copied().enumerate().skip(worker).step_by(workers) {
						let mut rng = chunk_rng(seed, index);
						if tx.send((index, self.build_profiles(&mut rng, options, size))).is_err() {
							return;
						}
					}
				});
			}
		});
		drop(tx);

		let mut parts: Vec<Option<Result<Vec<Profile>>>> = (0..chunks.len()).map(|_| None).collect();
		for (index, built) in rx {
			parts[index] = Some(built);
		}

		let mut profiles = Vec::with_capacity(quantity);
		for part in parts.into_iter().flatten() {
			profiles.extend(part?);
		}
		Ok(profiles)
	}
}

fn chunk_rng(seed: u64, index: usize) -> ChaCha8Rng {
	let mut rng = ChaCha8Rng::seed_from_u64(seed);
	rng.set_stream(index as u64);
	rng
}
