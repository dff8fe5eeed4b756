use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::io;

/// File holding states and cities, inside the data directory.
pub const LOCATIONS_FILE: &str = "locations.json";

/// File holding name frequency tables, inside the data directory.
pub const NAMES_FILE: &str = "names.json";

/// Postcard snapshot of both tables, preferred over the JSON files when present.
pub const SNAPSHOT_FILE: &str = "reference.bin";

/// The 27 Brazilian federative unit codes.
pub const STATE_CODES: [&str; 27] = [
	"AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
	"PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Returns `true` if `code` is one of the 27 unit codes.
pub fn is_state_code(code: &str) -> bool {
	STATE_CODES.contains(&code)
}

/// A Brazilian postal code, stored as its 8-digit number.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u32", into = "u32")]
pub struct Cep(u32);

impl Cep {
	/// Largest 8-digit value.
	pub const MAX: u32 = 99_999_999;

	pub fn new(value: u32) -> Result<Self> {
		if value > Self::MAX {
			return Err(Error::InvalidData(format!("CEP {value} has more than 8 digits")));
		}
		Ok(Self(value))
	}

	pub fn value(self) -> u32 {
		self.0
	}

	/// `NNNNN-NNN` with a dash, `NNNNNNNN` without.
	pub fn format(self, with_dash: bool) -> String {
		if with_dash {
			format!("{:05}-{:03}", self.0 / 1000, self.0 % 1000)
		} else {
			format!("{:08}", self.0)
		}
	}
}

impl TryFrom<u32> for Cep {
	type Error = Error;

	fn try_from(value: u32) -> Result<Self> {
		Self::new(value)
	}
}

impl From<Cep> for u32 {
	fn from(cep: Cep) -> u32 {
		cep.0
	}
}

impl FromStr for Cep {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let digits: String = s.trim().chars().filter(|c| *c != '-').collect();
		if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
			return Err(Error::InvalidData(format!("'{s}' is not a CEP")));
		}
		let value = digits.parse::<u32>().map_err(|_| Error::InvalidData(format!("'{s}' is not a CEP")))?;
		Self::new(value)
	}
}

impl fmt::Display for Cep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.format(true))
	}
}

/// Inclusive range of CEPs registered for a city.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CepRange {
	begin: Cep,
	end: Cep,
}

impl CepRange {
	/// # Errors
	/// Returns [`Error::InvalidData`] if `begin > end`.
	pub fn new(begin: Cep, end: Cep) -> Result<Self> {
		if begin > end {
			return Err(Error::InvalidData(format!("CEP range {begin}..{end} is reversed")));
		}
		Ok(Self { begin, end })
	}

	pub fn begin(&self) -> Cep {
		self.begin
	}

	pub fn end(&self) -> Cep {
		self.end
	}

	pub fn contains(&self, cep: Cep) -> bool {
		self.begin <= cep && cep <= self.end
	}
}

/// A federative unit and its share of the national population.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct State {
	pub name: String,
	pub abbreviation: String,
	pub population_weight: f64,
}

/// A city, its share of its state's population and its postal data.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct City {
	pub name: String,
	pub state_abbreviation: String,
	pub population_weight: f64,
	pub cep_range: CepRange,
	/// Individually registered CEPs; drawn from instead of the range when present.
	pub ceps: Vec<Cep>,
	/// Two-digit telephone area code.
	pub ddd: Option<u8>,
}

/// States and cities, validated and ready to be sampled.
///
/// # Invariants
/// - every abbreviation is one of [`STATE_CODES`]
/// - every city belongs to a loaded state
/// - every CEP range is ordered
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LocationData {
	states: Vec<State>,
	cities: Vec<City>,
}

impl LocationData {
	/// Validates and assembles location tables.
	///
	/// Cities whose state is not loaded are skipped with a warning.
	///
	/// # Errors
	/// Returns [`Error::InvalidData`] for an unknown state code or a reversed
	/// CEP range.
	pub fn new(states: Vec<State>, cities: Vec<City>) -> Result<Self> {
		for state in &states {
			if !is_state_code(&state.abbreviation) {
				return Err(Error::InvalidData(format!(
					"state '{}' has unknown abbreviation '{}'",
					state.name, state.abbreviation
				)));
			}
		}

		let mut kept = Vec::with_capacity(cities.len());
		for city in cities {
			if !is_state_code(&city.state_abbreviation) {
				return Err(Error::InvalidData(format!(
					"city '{}' has unknown state '{}'",
					city.name, city.state_abbreviation
				)));
			}
			CepRange::new(city.cep_range.begin, city.cep_range.end)?;
			if !states.iter().any(|s| s.abbreviation == city.state_abbreviation) {
				warn!(city = %city.name, state = %city.state_abbreviation, "skipping city of a state that is not loaded");
				continue;
			}
			kept.push(city);
		}

		Ok(Self { states, cities: kept })
	}

	/// Parses the `locations.json` layout.
	///
	/// ```json
	/// {"states": {"São Paulo": {"state_abbr": "SP", "population_percentage": 21.9}},
	///  "cities": {"3550308": {"city_name": "São Paulo", "city_uf": "SP",
	///             "population_percentage_state": 25.0,
	///             "cep_range_begins": "01000-000", "cep_range_ends": "05999-999",
	///             "ddd": 11}}}
	/// ```
	///
	/// A city may list explicit `"ceps"` instead of, or besides, its range.
	/// Without a range, the range spans the listed CEPs.
	pub fn from_json(json: &str) -> Result<Self> {
		Self::from_json_named(json, LOCATIONS_FILE)
	}

	fn from_json_named(json: &str, origin: &str) -> Result<Self> {
		let raw: RawLocations =
			serde_json::from_str(json).map_err(|source| Error::Json { origin: origin.to_owned(), source })?;

		let states = raw
			.states
			.into_iter()
			.map(|(name, state)| State {
				name,
				abbreviation: state.state_abbr,
				population_weight: state.population_percentage,
			})
			.collect();

		let cities = raw
			.cities
			.into_values()
			.map(|city| {
				let ceps = city.ceps.iter().map(|cep| cep.parse()).collect::<Result<Vec<Cep>>>()?;
				let cep_range = match (&city.cep_range_begins, &city.cep_range_ends) {
					(Some(begin), Some(end)) => CepRange::new(begin.parse()?, end.parse()?)?,
					_ => match (ceps.iter().min(), ceps.iter().max()) {
						(Some(&begin), Some(&end)) => CepRange::new(begin, end)?,
						_ => {
							return Err(Error::InvalidData(format!(
								"city '{}' has neither a CEP range nor CEPs",
								city.city_name
							)));
						}
					},
				};
				Ok(City {
					name: city.city_name,
					state_abbreviation: city.city_uf,
					population_weight: city.population_percentage_state,
					cep_range,
					ceps,
					ddd: city.ddd,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Self::new(states, cities)
	}

	pub fn states(&self) -> &[State] {
		&self.states
	}

	pub fn cities(&self) -> &[City] {
		&self.cities
	}
}

/// Name frequency tables.
///
/// First names are bucketed by time-period tag (see
/// [`TimePeriod`](crate::model::name::TimePeriod)); middle names and surnames
/// are shared by every period. `BTreeMap` keeps iteration order stable so
/// seeded runs are reproducible.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NameData {
	pub first_names: BTreeMap<String, BTreeMap<String, f64>>,
	#[serde(default)]
	pub middle_names: BTreeMap<String, f64>,
	pub surnames: BTreeMap<String, f64>,
}

impl NameData {
	/// Parses the `names.json` layout.
	pub fn from_json(json: &str) -> Result<Self> {
		Self::from_json_named(json, NAMES_FILE)
	}

	fn from_json_named(json: &str, origin: &str) -> Result<Self> {
		serde_json::from_str(json).map_err(|source| Error::Json { origin: origin.to_owned(), source })
	}
}

/// Both reference tables, loaded once and shared read-only.
#[derive(Clone, Debug)]
pub struct ReferenceData {
	pub locations: Arc<LocationData>,
	pub names: Arc<NameData>,
}

impl ReferenceData {
	pub fn new(locations: LocationData, names: NameData) -> Self {
		Self { locations: Arc::new(locations), names: Arc::new(names) }
	}

	/// Loads the reference tables from a data directory.
	///
	/// - Uses `reference.bin` (postcard) if it exists.
	/// - Otherwise parses `locations.json` and `names.json`.
	///
	/// # Errors
	/// Returns an error if a file is missing, unreadable or invalid.
	pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
		let folder = io::normalize_folder(dir);

		let snapshot = folder.join(SNAPSHOT_FILE);
		if snapshot.exists() {
			info!(path = %snapshot.display(), "loading reference snapshot");
			return Self::from_snapshot(&io::read_bytes(&snapshot)?);
		}
		Self::load_json(folder)
	}

	/// Parses `locations.json` and `names.json`, ignoring any snapshot.
	pub fn load_json<P: AsRef<Path>>(dir: P) -> Result<Self> {
		let folder = io::normalize_folder(dir);
		let locations_path = folder.join(LOCATIONS_FILE);
		let names_path = folder.join(NAMES_FILE);
		info!(dir = %folder.display(), "loading reference JSON files");

		let locations =
			LocationData::from_json_named(&io::read_text(&locations_path)?, &io::display_name(&locations_path))?;
		let names = NameData::from_json_named(&io::read_text(&names_path)?, &io::display_name(&names_path))?;

		info!(
			states = locations.states().len(),
			cities = locations.cities().len(),
			periods = names.first_names.len(),
			surnames = names.surnames.len(),
			"reference data loaded"
		);
		Ok(Self::new(locations, names))
	}

	/// Encodes both tables with postcard.
	pub fn to_snapshot(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(&(&*self.locations, &*self.names))?)
	}

	/// Decodes tables produced by [`ReferenceData::to_snapshot`].
	///
	/// Location tables go through [`LocationData::new`] again, so a stale or
	/// edited snapshot is held to the same checks as the JSON files.
	pub fn from_snapshot(bytes: &[u8]) -> Result<Self> {
		let (locations, names): (LocationData, NameData) = postcard::from_bytes(bytes)?;
		let locations = LocationData::new(locations.states, locations.cities)?;
		Ok(Self::new(locations, names))
	}

	/// Writes the postcard snapshot into `dir` and returns its path.
	pub fn write_snapshot<P: AsRef<Path>>(&self, dir: P) -> Result<std::path::PathBuf> {
		let path = io::normalize_folder(dir).join(SNAPSHOT_FILE);
		io::write_bytes(&path, &self.to_snapshot()?)?;
		info!(path = %path.display(), "reference snapshot written");
		Ok(path)
	}
}

#[derive(Deserialize)]
struct RawLocations {
	states: BTreeMap<String, RawState>,
	cities: BTreeMap<String, RawCity>,
}

#[derive(Deserialize)]
struct RawState {
	state_abbr: String,
	population_percentage: f64,
}

#[derive(Deserialize)]
struct RawCity {
	city_name: String,
	city_uf: String,
	population_percentage_state: f64,
	#[serde(default)]
	cep_range_begins: Option<String>,
	#[serde(default)]
	cep_range_ends: Option<String>,
	#[serde(default)]
	ceps: Vec<String>,
	#[serde(default)]
	ddd: Option<u8>,
}
