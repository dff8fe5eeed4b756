use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::dataset::{Cep, City, LocationData, State, is_state_code};
use super::weighted::WeightedPool;
use crate::error::{Error, Result};

/// The five IBGE macro-regions.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Region {
	Norte,
	Nordeste,
	CentroOeste,
	Sudeste,
	Sul,
}

impl Region {
	pub const ALL: [Region; 5] = [Region::Norte, Region::Nordeste, Region::CentroOeste, Region::Sudeste, Region::Sul];

	/// State codes belonging to the region.
	pub fn states(self) -> &'static [&'static str] {
		match self {
			Region::Norte => &["AC", "AP", "AM", "PA", "RO", "RR", "TO"],
			Region::Nordeste => &["AL", "BA", "CE", "MA", "PB", "PE", "PI", "RN", "SE"],
			Region::CentroOeste => &["DF", "GO", "MT", "MS"],
			Region::Sudeste => &["ES", "MG", "RJ", "SP"],
			Region::Sul => &["PR", "RS", "SC"],
		}
	}
}

impl FromStr for Region {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let key: String = s.trim().to_lowercase().chars().filter(|c| c.is_ascii_alphabetic()).collect();
		match key.as_str() {
			"norte" | "north" => Ok(Region::Norte),
			"nordeste" | "northeast" => Ok(Region::Nordeste),
			"centrooeste" | "midwest" => Ok(Region::CentroOeste),
			"sudeste" | "southeast" => Ok(Region::Sudeste),
			"sul" | "south" => Ok(Region::Sul),
			_ => Err(Error::NoMatch(format!("region '{s}'"))),
		}
	}
}

/// Restricts state selection to a set of state codes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionFilter {
	states: BTreeSet<String>,
}

impl RegionFilter {
	/// Builds a filter from state codes (case-insensitive).
	///
	/// # Errors
	/// Returns [`Error::NoMatch`] for a code that is not one of the 27 units.
	pub fn from_states<I, S>(codes: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut states = BTreeSet::new();
		for code in codes {
			let code = code.as_ref().trim().to_uppercase();
			if !is_state_code(&code) {
				return Err(Error::NoMatch(format!("state code '{code}'")));
			}
			states.insert(code);
		}
		Ok(Self { states })
	}

	pub fn from_regions<I: IntoIterator<Item = Region>>(regions: I) -> Self {
		let states = regions
			.into_iter()
			.flat_map(|region| region.states().iter().map(|s| (*s).to_owned()))
			.collect();
		Self { states }
	}

	/// Adds every state of `other`.
	pub fn union(mut self, other: &Self) -> Self {
		self.states.extend(other.states.iter().cloned());
		self
	}

	pub fn contains(&self, code: &str) -> bool {
		self.states.contains(code)
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn states(&self) -> impl Iterator<Item = &str> {
		self.states.iter().map(String::as_str)
	}
}

impl fmt::Display for RegionFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let codes: Vec<&str> = self.states().collect();
		write!(f, "[{}]", codes.join(", "))
	}
}

/// A sampled state/city pair, borrowing the reference records.
#[derive(Clone, Copy, Debug)]
pub struct LocationSample<'a> {
	pub state: &'a State,
	pub city: &'a City,
}

impl LocationSample<'_> {
	pub fn state_name(&self) -> &str {
		&self.state.name
	}

	pub fn state_abbreviation(&self) -> &str {
		&self.state.abbreviation
	}

	pub fn city_name(&self) -> &str {
		&self.city.name
	}

	/// `(state_name, state_abbreviation, city_name)`.
	pub fn as_tuple(&self) -> (&str, &str, &str) {
		(self.state_name(), self.state_abbreviation(), self.city_name())
	}
}

/// How [`LocationSampler::get_random_location`] renders its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationFormat {
	/// `"City, State (ABBR), NNNNN-NNN"`
	Full { cep_with_dash: bool },
	CityOnly,
	StateAbbreviationOnly,
	StateNameOnly,
	CepOnly { with_dash: bool },
}

/// Two-stage population-weighted sampler: state first, then a city inside it.
///
/// Holds only immutable pools built at construction, so one instance can be
/// shared across threads; randomness is always supplied by the caller.
#[derive(Debug)]
pub struct LocationSampler {
	data: Arc<LocationData>,
	/// Indices into `data.states()`, weighted by state population.
	state_pool: WeightedPool<usize>,
	/// Per state code, indices into `data.cities()` weighted by city population.
	city_pools: HashMap<String, WeightedPool<usize>>,
}

impl LocationSampler {
	/// Pre-computes the state pool and one city pool per state.
	///
	/// States without any city are left out of the state pool.
	///
	/// # Errors
	/// Returns an error if a weight is invalid.
	pub fn new(data: Arc<LocationData>) -> Result<Self> {
		let mut by_state: HashMap<String, Vec<(usize, f64)>> = HashMap::new();
		for (index, city) in data.cities().iter().enumerate() {
			by_state.entry(city.state_abbreviation.clone()).or_default().push((index, city.population_weight));
		}

		let mut city_pools = HashMap::with_capacity(by_state.len());
		for (state, entries) in by_state {
			city_pools.insert(state, WeightedPool::new(entries)?);
		}

		let mut state_entries = Vec::with_capacity(data.states().len());
		for (index, state) in data.states().iter().enumerate() {
			if city_pools.contains_key(&state.abbreviation) {
				state_entries.push((index, state.population_weight));
			} else {
				warn!(state = %state.abbreviation, "state has no cities and will never be sampled");
			}
		}
		let state_pool = WeightedPool::new(state_entries)?;
		debug!(states = state_pool.len(), cities = data.cities().len(), "location sampler ready");

		Ok(Self { data, state_pool, city_pools })
	}

	pub fn data(&self) -> &LocationData {
		&self.data
	}

	/// Draws a state weighted by population, optionally restricted by `filter`.
	///
	/// # Errors
	/// Returns [`Error::NoMatch`] if the filter leaves no sampleable state.
	pub fn get_state<R: Rng + ?Sized>(&self, rng: &mut R, filter: Option<&RegionFilter>) -> Result<&State> {
		let states = self.data.states();
		let index = match filter {
			None => *self.state_pool.choose(rng)?,
			Some(filter) => {
				let excluded: HashSet<usize> = self
					.state_pool
					.iter()
					.map(|(index, _)| *index)
					.filter(|index| !filter.contains(&states[*index].abbreviation))
					.collect();
				match self.state_pool.sample(rng, 1, true, &excluded) {
					Ok(drawn) => drawn[0],
					Err(Error::EmptyPool) => return Err(Error::NoMatch(format!("region filter {filter}"))),
					Err(e) => return Err(e),
				}
			}
		};
		Ok(&states[index])
	}

	/// Draws a city of `state_abbreviation` weighted by population.
	///
	/// # Errors
	/// Returns [`Error::NoMatch`] if no city is loaded for that state.
	pub fn get_city<R: Rng + ?Sized>(&self, rng: &mut R, state_abbreviation: &str) -> Result<&City> {
		let pool = self
			.city_pools
			.get(state_abbreviation)
			.ok_or_else(|| Error::NoMatch(format!("cities for state '{state_abbreviation}'")))?;
		let index = match pool.choose(rng) {
			Ok(index) => *index,
			Err(Error::EmptyPool) => {
				return Err(Error::NoMatch(format!("populated cities for state '{state_abbreviation}'")));
			}
			Err(e) => return Err(e),
		};
		Ok(&self.data.cities()[index])
	}

	/// Draws a state then one of its cities.
	pub fn get_state_and_city<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		filter: Option<&RegionFilter>,
	) -> Result<LocationSample<'_>> {
		let state = self.get_state(rng, filter)?;
		let city = self.get_city(rng, &state.abbreviation)?;
		Ok(LocationSample { state, city })
	}

	/// Looks a city up by state code and exact name.
	pub fn city_by_name(&self, state_abbreviation: &str, city_name: &str) -> Option<&City> {
		self.data
			.cities()
			.iter()
			.find(|c| c.state_abbreviation == state_abbreviation && c.name == city_name)
	}

	/// Draws one of the city's listed CEPs, or a CEP uniformly inside its
	/// registered range when none are listed.
	pub fn random_cep<R: Rng + ?Sized>(&self, rng: &mut R, city: &City) -> Cep {
		if let Some(cep) = city.ceps.choose(rng) {
			return *cep;
		}
		let range = city.cep_range;
		let value = rng.random_range(range.begin().value()..=range.end().value());
		// Both ends are valid 8-digit CEPs, so every value between them is too.
		Cep::new(value).unwrap_or(range.begin())
	}

	/// Renders `"City, State (ABBR)"`, followed by `", NNNNN-NNN"` when `include_cep`.
	pub fn format_full_location<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		sample: &LocationSample<'_>,
		include_cep: bool,
		cep_with_dash: bool,
	) -> String {
		let base = format!("{}, {} ({})", sample.city_name(), sample.state_name(), sample.state_abbreviation());
		if !include_cep {
			return base;
		}
		let cep = self.random_cep(rng, sample.city);
		format!("{base}, {}", cep.format(cep_with_dash))
	}

	/// Draws a location, optionally restricted to `filter`, and renders it
	/// according to `format`.
	pub fn get_random_location<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		filter: Option<&RegionFilter>,
		format: LocationFormat,
	) -> Result<String> {
		let sample = self.get_state_and_city(rng, filter)?;
		Ok(match format {
			LocationFormat::Full { cep_with_dash } => self.format_full_location(rng, &sample, true, cep_with_dash),
			LocationFormat::CityOnly => sample.city_name().to_owned(),
			LocationFormat::StateAbbreviationOnly => sample.state_abbreviation().to_owned(),
			LocationFormat::StateNameOnly => sample.state_name().to_owned(),
			LocationFormat::CepOnly { with_dash } => self.random_cep(rng, sample.city).format(with_dash),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::dataset::CepRange;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;

	fn city(name: &str, uf: &str, weight: f64, begin: u32, end: u32) -> City {
		City {
			name: name.to_owned(),
			state_abbreviation: uf.to_owned(),
			population_weight: weight,
			cep_range: CepRange::new(Cep::new(begin).unwrap(), Cep::new(end).unwrap()).unwrap(),
			ceps: Vec::new(),
			ddd: None,
		}
	}

	fn state(name: &str, uf: &str, weight: f64) -> State {
		State { name: name.to_owned(), abbreviation: uf.to_owned(), population_weight: weight }
	}

	fn sampler() -> LocationSampler {
		let data = LocationData::new(
			vec![state("São Paulo", "SP", 22.0), state("Bahia", "BA", 7.0), state("Roraima", "RR", 0.3)],
			vec![
				city("São Paulo", "SP", 26.0, 1_000_000, 5_999_999),
				city("Campinas", "SP", 2.5, 13_000_000, 13_139_999),
				city("Salvador", "BA", 17.0, 40_000_000, 42_599_999),
				city("Feira de Santana", "BA", 4.3, 44_000_000, 44_099_999),
			],
		)
		.unwrap();
		LocationSampler::new(Arc::new(data)).unwrap()
	}

	#[test]
	fn sampled_city_belongs_to_sampled_state() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(5);
		for _ in 0..500 {
			let sample = sampler.get_state_and_city(&mut rng, None).unwrap();
			assert_eq!(sample.city.state_abbreviation, sample.state.abbreviation);
		}
	}

	#[test]
	fn states_without_cities_are_never_drawn() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(8);
		for _ in 0..500 {
			assert_ne!(sampler.get_state(&mut rng, None).unwrap().abbreviation, "RR");
		}
	}

	#[test]
	fn region_filter_restricts_states() {
		let sampler = sampler();
		let filter = RegionFilter::from_regions([Region::Nordeste]);
		let mut rng = ChaCha8Rng::seed_from_u64(13);
		for _ in 0..500 {
			let sample = sampler.get_state_and_city(&mut rng, Some(&filter)).unwrap();
			assert_eq!(sample.state_abbreviation(), "BA");
		}
	}

	#[test]
	fn filter_without_loaded_states_is_no_match() {
		let sampler = sampler();
		let filter = RegionFilter::from_regions([Region::Sul]);
		let mut rng = ChaCha8Rng::seed_from_u64(0);
		assert!(matches!(sampler.get_state(&mut rng, Some(&filter)), Err(Error::NoMatch(_))));

		let only_roraima = RegionFilter::from_states(["rr"]).unwrap();
		assert!(matches!(sampler.get_state(&mut rng, Some(&only_roraima)), Err(Error::NoMatch(_))));
	}

	#[test]
	fn unknown_state_codes_are_rejected() {
		assert!(matches!(RegionFilter::from_states(["SP", "XX"]), Err(Error::NoMatch(_))));
	}

	#[test]
	fn cep_stays_inside_city_range() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(21);
		for city in sampler.data().cities() {
			for _ in 0..200 {
				assert!(city.cep_range.contains(sampler.random_cep(&mut rng, city)));
			}
		}
	}

	#[test]
	fn listed_ceps_are_preferred_over_the_range() {
		let sampler = sampler();
		let listed = [Cep::new(1_001_000).unwrap(), Cep::new(1_310_100).unwrap()];
		let city = City { ceps: listed.to_vec(), ..city("São Paulo", "SP", 26.0, 1_000_000, 5_999_999) };
		let mut rng = ChaCha8Rng::seed_from_u64(34);
		let drawn: HashSet<Cep> = (0..200).map(|_| sampler.random_cep(&mut rng, &city)).collect();
		assert_eq!(drawn, listed.into_iter().collect());
	}

	#[test]
	fn full_location_layout() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(2);
		let sample = sampler.get_state_and_city(&mut rng, None).unwrap();

		let without_cep = sampler.format_full_location(&mut rng, &sample, false, true);
		assert_eq!(
			without_cep,
			format!("{}, {} ({})", sample.city_name(), sample.state_name(), sample.state_abbreviation())
		);

		let with_cep = sampler.format_full_location(&mut rng, &sample, true, true);
		let cep = with_cep.rsplit(", ").next().unwrap();
		assert_eq!(cep.len(), 9);
		assert_eq!(&cep[5..6], "-");
	}

	#[test]
	fn random_location_formats() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(4);
		let abbr = sampler.get_random_location(&mut rng, None, LocationFormat::StateAbbreviationOnly).unwrap();
		assert!(abbr == "SP" || abbr == "BA");

		let cep = sampler.get_random_location(&mut rng, None, LocationFormat::CepOnly { with_dash: false }).unwrap();
		assert_eq!(cep.len(), 8);
		assert!(cep.chars().all(|c| c.is_ascii_digit()));

		let bahia = RegionFilter::from_regions([Region::Nordeste]);
		for _ in 0..50 {
			let name = sampler.get_random_location(&mut rng, Some(&bahia), LocationFormat::StateNameOnly).unwrap();
			assert_eq!(name, "Bahia");
		}
	}

	#[test]
	fn region_names_parse() {
		assert_eq!("Centro-Oeste".parse::<Region>().unwrap(), Region::CentroOeste);
		assert_eq!("sul".parse::<Region>().unwrap(), Region::Sul);
		assert!("atlantida".parse::<Region>().is_err());
	}

	#[test]
	fn regions_cover_every_state_once() {
		let mut all: Vec<&str> = Region::ALL.iter().flat_map(|r| r.states().iter().copied()).collect();
		all.sort();
		let mut expected = crate::model::dataset::STATE_CODES.to_vec();
		expected.sort();
		assert_eq!(all, expected);
	}
}
