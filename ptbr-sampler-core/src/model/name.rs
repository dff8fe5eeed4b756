use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::dataset::NameData;
use super::weighted::WeightedPool;
use crate::error::{Error, Result};

/// Number of surnames kept by the "top surnames" restriction.
pub const TOP_SURNAMES: usize = 40;

/// Probability of drawing a middle name when it is not forced.
const MIDDLE_NAME_PROBABILITY: f64 = 0.5;

/// Connectives kept lower-case inside title-cased names.
const CONNECTIVES: [&str; 6] = ["da", "de", "do", "das", "dos", "e"];

/// Decade bucket of the first-name frequency tables.
///
/// `Until1930` holds every birth before 1930; each later variant holds the
/// ten years ending at its year (`Until1940` is 1930 to 1939).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
	Until1930,
	Until1940,
	Until1950,
	Until1960,
	Until1970,
	Until1980,
	Until1990,
	Until2000,
	#[default]
	Until2010,
}

impl TimePeriod {
	pub const ALL: [TimePeriod; 9] = [
		TimePeriod::Until1930,
		TimePeriod::Until1940,
		TimePeriod::Until1950,
		TimePeriod::Until1960,
		TimePeriod::Until1970,
		TimePeriod::Until1980,
		TimePeriod::Until1990,
		TimePeriod::Until2000,
		TimePeriod::Until2010,
	];

	/// Tag used in `names.json`.
	pub fn tag(self) -> &'static str {
		match self {
			TimePeriod::Until1930 => "until_1930",
			TimePeriod::Until1940 => "until_1940",
			TimePeriod::Until1950 => "until_1950",
			TimePeriod::Until1960 => "until_1960",
			TimePeriod::Until1970 => "until_1970",
			TimePeriod::Until1980 => "until_1980",
			TimePeriod::Until1990 => "until_1990",
			TimePeriod::Until2000 => "until_2000",
			TimePeriod::Until2010 => "until_2010",
		}
	}
}

impl fmt::Display for TimePeriod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

impl FromStr for TimePeriod {
	type Err = Error;

	/// Accepts the tag (`until_2010`, any case) or a four-digit birth year.
	///
	/// Years before 1930 map to `until_1930` and years from 2000 on map to
	/// `until_2010`.
	fn from_str(s: &str) -> Result<Self> {
		let key = s.trim().to_lowercase();
		if let Some(period) = TimePeriod::ALL.into_iter().find(|period| period.tag() == key) {
			return Ok(period);
		}
		if key.len() != 4 {
			return Err(Error::InvalidTimePeriod(s.to_owned()));
		}
		let year: u16 = key.parse().map_err(|_| Error::InvalidTimePeriod(s.to_owned()))?;
		let index = (usize::from(year.clamp(1920, 2000)) - 1920) / 10;
		Ok(TimePeriod::ALL[index])
	}
}

/// Output casing of a formatted name.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
	/// `Maria da Silva`
	#[default]
	TitleCase,
	/// `MARIA DA SILVA`, as stored in the frequency tables.
	Raw,
}

impl NameStyle {
	pub fn apply(self, text: &str) -> String {
		match self {
			NameStyle::Raw => text.to_uppercase(),
			NameStyle::TitleCase => text
				.split_whitespace()
				.enumerate()
				.map(|(index, word)| {
					let lower = word.to_lowercase();
					if index > 0 && CONNECTIVES.contains(&lower.as_str()) {
						lower
					} else {
						capitalize(&lower)
					}
				})
				.collect::<Vec<_>>()
				.join(" "),
		}
	}
}

fn capitalize(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Options driving [`NameSampler::get_random_name`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NameOptions {
	pub time_period: TimePeriod,
	pub style: NameStyle,
	/// Draw surnames only from the 40 most frequent.
	pub top_surnames_only: bool,
	/// One surname instead of two.
	pub single_surname: bool,
	/// Always include a middle name.
	pub always_middle: bool,
}

/// Which part of a name [`NameSampler::get_random_formatted`] returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameFormat {
	/// First name, optional middle name and surnames.
	#[default]
	Full,
	SurnameOnly,
	MiddleOnly,
}

/// A sampled name, kept in its stored casing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NameComponents {
	pub first_name: String,
	pub middle_name: Option<String>,
	/// One or two surnames, in order.
	pub surnames: Vec<String>,
}

impl NameComponents {
	/// Full name with every component, in `style`.
	pub fn format(&self, style: NameStyle) -> String {
		let mut parts: Vec<&str> = vec![self.first_name.as_str()];
		if let Some(middle) = &self.middle_name {
			parts.push(middle);
		}
		parts.extend(self.surnames.iter().map(String::as_str));
		style.apply(&parts.join(" "))
	}

	/// Surnames joined by a space, in `style`.
	pub fn surname(&self, style: NameStyle) -> String {
		style.apply(&self.surnames.join(" "))
	}

	/// Every component rewritten in `style`.
	pub fn styled(&self, style: NameStyle) -> Self {
		Self {
			first_name: style.apply(&self.first_name),
			middle_name: self.middle_name.as_deref().map(|middle| style.apply(middle)),
			surnames: self.surnames.iter().map(|surname| style.apply(surname)).collect(),
		}
	}
}

/// Samples first names by time period and shared middle names and surnames.
#[derive(Debug)]
pub struct NameSampler {
	data: Arc<NameData>,
	first_names: HashMap<TimePeriod, WeightedPool<String>>,
	middle_names: WeightedPool<String>,
	surnames: WeightedPool<String>,
	top_surnames: WeightedPool<String>,
}

impl NameSampler {
	/// Builds the per-period first-name pools, the middle-name pool, the
	/// surname pool and its top-40 restriction.
	///
	/// Buckets with an unknown period tag are skipped with a warning.
	///
	/// # Errors
	/// Returns an error if a weight is invalid.
	pub fn new(data: Arc<NameData>) -> Result<Self> {
		let mut first_names = HashMap::new();
		for (tag, table) in &data.first_names {
			match tag.parse::<TimePeriod>() {
				Ok(period) => {
					first_names.insert(period, pool_of(table)?);
				}
				Err(_) => warn!(tag = %tag, "ignoring first names of unknown time period"),
			}
		}

		let middle_names = pool_of(&data.middle_names)?;
		let surnames = pool_of(&data.surnames)?;
		let top_surnames = surnames.top(TOP_SURNAMES);
		debug!(
			periods = first_names.len(),
			middle_names = middle_names.len(),
			surnames = surnames.len(),
			"name sampler ready"
		);

		Ok(Self { data, first_names, middle_names, surnames, top_surnames })
	}

	pub fn data(&self) -> &NameData {
		&self.data
	}

	/// The restricted pool used when `top_surnames_only` is set.
	pub fn top_surnames(&self) -> &WeightedPool<String> {
		&self.top_surnames
	}

	/// Draws a first name, an optional middle name and one or two surnames.
	///
	/// The three component draws are independent of one another: a surname
	/// may coincide with the first name.
	///
	/// # Errors
	/// - [`Error::InvalidTimePeriod`] if the period bucket is missing or empty
	/// - [`Error::EmptyPool`] if surnames (or forced middle names) are missing
	pub fn get_random_name<R: Rng + ?Sized>(&self, rng: &mut R, options: &NameOptions) -> Result<NameComponents> {
		let first_name = self.first_name(rng, options.time_period)?;

		let middle_name = if options.always_middle {
			Some(self.middle_names.choose(rng)?.clone())
		} else if rng.random_bool(MIDDLE_NAME_PROBABILITY) {
			self.middle_names.choose(rng).ok().cloned()
		} else {
			None
		};

		let surnames = self.surnames(rng, options.top_surnames_only, options.single_surname)?;

		Ok(NameComponents { first_name, middle_name, surnames })
	}

	/// Same draw as [`NameSampler::get_random_name`], formatted in `options.style`.
	pub fn get_random_full_name<R: Rng + ?Sized>(&self, rng: &mut R, options: &NameOptions) -> Result<String> {
		Ok(self.get_random_name(rng, options)?.format(options.style))
	}

	/// Draws the part of a name selected by `format`, styled and shaped by `options`.
	pub fn get_random_formatted<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		options: &NameOptions,
		format: NameFormat,
	) -> Result<String> {
		match format {
			NameFormat::Full => self.get_random_full_name(rng, options),
			NameFormat::SurnameOnly => {
				self.get_random_surname(rng, options.top_surnames_only, options.single_surname, options.style)
			}
			NameFormat::MiddleOnly => self.get_random_middle_name(rng, options.style),
		}
	}

	/// Draws one or two surnames only.
	pub fn get_random_surname<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		top_surnames_only: bool,
		single_surname: bool,
		style: NameStyle,
	) -> Result<String> {
		let surnames = self.surnames(rng, top_surnames_only, single_surname)?;
		Ok(style.apply(&surnames.join(" ")))
	}

	/// Draws a middle name only.
	pub fn get_random_middle_name<R: Rng + ?Sized>(&self, rng: &mut R, style: NameStyle) -> Result<String> {
		Ok(style.apply(self.middle_names.choose(rng)?))
	}

	fn first_name<R: Rng + ?Sized>(&self, rng: &mut R, period: TimePeriod) -> Result<String> {
		let pool = self.first_names.get(&period).ok_or_else(|| Error::InvalidTimePeriod(period.to_string()))?;
		match pool.choose(rng) {
			Ok(name) => Ok(name.clone()),
			Err(Error::EmptyPool) => Err(Error::InvalidTimePeriod(period.to_string())),
			Err(e) => Err(e),
		}
	}

	/// Two distinct surnames (one if `single`, or if the pool only holds one).
	fn surnames<R: Rng + ?Sized>(&self, rng: &mut R, top_only: bool, single: bool) -> Result<Vec<String>> {
		let pool = if top_only { &self.top_surnames } else { &self.surnames };
		let count = if single { 1 } else { 2 };
		match pool.sample(rng, count, false, &HashSet::new()) {
			Err(Error::InvalidCount { available, .. }) if available > 0 => {
				pool.sample(rng, available, false, &HashSet::new())
			}
			other => other,
		}
	}
}

fn pool_of(table: &std::collections::BTreeMap<String, f64>) -> Result<WeightedPool<String>> {
	WeightedPool::new(table.iter().map(|(name, weight)| (name.clone(), *weight)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;
	use rstest::rstest;
	use std::collections::BTreeMap;

	fn table(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
		entries.iter().map(|(n, w)| ((*n).to_owned(), *w)).collect()
	}

	fn sampler() -> NameSampler {
		let mut first_names = BTreeMap::new();
		first_names.insert("until_1930".to_owned(), table(&[("MARIA", 10.0), ("JOSE", 8.0)]));
		first_names.insert("until_2010".to_owned(), table(&[("ENZO", 3.0), ("VALENTINA", 2.0)]));
		first_names.insert("until_1950".to_owned(), BTreeMap::new());
		first_names.insert("someday".to_owned(), table(&[("X", 1.0)]));

		let data = NameData {
			first_names,
			middle_names: table(&[("APARECIDA", 1.0), ("CRISTINA", 1.0)]),
			surnames: table(&[("SILVA", 5.0), ("SANTOS", 4.0), ("OLIVEIRA", 3.0)]),
		};
		NameSampler::new(Arc::new(data)).unwrap()
	}

	#[test]
	fn first_name_comes_from_the_requested_period() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(1);
		let options = NameOptions { time_period: TimePeriod::Until1930, ..Default::default() };
		for _ in 0..200 {
			let name = sampler.get_random_name(&mut rng, &options).unwrap();
			assert!(name.first_name == "MARIA" || name.first_name == "JOSE");
			assert_eq!(name.surnames.len(), 2);
			assert_ne!(name.surnames[0], name.surnames[1]);
		}
	}

	#[rstest]
	#[case(TimePeriod::Until1950)]
	#[case(TimePeriod::Until1970)]
	fn empty_or_missing_period_is_an_error(#[case] period: TimePeriod) {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(0);
		let options = NameOptions { time_period: period, ..Default::default() };
		assert!(matches!(sampler.get_random_name(&mut rng, &options), Err(Error::InvalidTimePeriod(_))));
	}

	#[test]
	fn single_surname_and_forced_middle_name() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(3);
		let options = NameOptions { single_surname: true, always_middle: true, ..Default::default() };
		for _ in 0..100 {
			let name = sampler.get_random_name(&mut rng, &options).unwrap();
			assert_eq!(name.surnames.len(), 1);
			assert!(name.middle_name.is_some());
		}
	}

	#[test]
	fn middle_name_is_optional_by_default() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(17);
		let names: Vec<_> =
			(0..200).map(|_| sampler.get_random_name(&mut rng, &NameOptions::default()).unwrap()).collect();
		assert!(names.iter().any(|n| n.middle_name.is_some()));
		assert!(names.iter().any(|n| n.middle_name.is_none()));
	}

	#[rstest]
	#[case(NameStyle::TitleCase, "Maria Aparecida da Silva")]
	#[case(NameStyle::Raw, "MARIA APARECIDA DA SILVA")]
	fn formats_components(#[case] style: NameStyle, #[case] expected: &str) {
		let name = NameComponents {
			first_name: "MARIA".to_owned(),
			middle_name: Some("APARECIDA".to_owned()),
			surnames: vec!["DA SILVA".to_owned()],
		};
		assert_eq!(name.format(style), expected);
	}

	#[test]
	fn full_name_string_matches_style() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(9);
		let options = NameOptions { style: NameStyle::Raw, ..Default::default() };
		let name = sampler.get_random_full_name(&mut rng, &options).unwrap();
		assert_eq!(name, name.to_uppercase());
		assert!(name.split(' ').count() >= 3);
	}

	#[test]
	fn surname_only_draws() {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(12);
		let surname = sampler.get_random_surname(&mut rng, false, true, NameStyle::TitleCase).unwrap();
		assert!(["Silva", "Santos", "Oliveira"].contains(&surname.as_str()));
		let middle = sampler.get_random_middle_name(&mut rng, NameStyle::Raw).unwrap();
		assert!(middle == "APARECIDA" || middle == "CRISTINA");
	}

	#[rstest]
	#[case(NameFormat::Full, 3)]
	#[case(NameFormat::SurnameOnly, 2)]
	#[case(NameFormat::MiddleOnly, 1)]
	fn formatted_parts(#[case] format: NameFormat, #[case] min_words: usize) {
		let sampler = sampler();
		let mut rng = ChaCha8Rng::seed_from_u64(15);
		let options = NameOptions { always_middle: true, ..Default::default() };
		for _ in 0..50 {
			let text = sampler.get_random_formatted(&mut rng, &options, format).unwrap();
			let words = text.split(' ').count();
			assert!(words >= min_words, "{text}");
			if format == NameFormat::MiddleOnly {
				assert!(text == "Aparecida" || text == "Cristina");
			}
		}
	}

	#[rstest]
	#[case("until_2010", TimePeriod::Until2010)]
	#[case("UNTIL_1930", TimePeriod::Until1930)]
	#[case("1980", TimePeriod::Until1990)]
	#[case("1929", TimePeriod::Until1930)]
	#[case("1888", TimePeriod::Until1930)]
	#[case("1930", TimePeriod::Until1940)]
	#[case("2009", TimePeriod::Until2010)]
	fn parses_time_periods(#[case] input: &str, #[case] expected: TimePeriod) {
		assert_eq!(input.parse::<TimePeriod>().unwrap(), expected);
	}

	#[rstest]
	#[case("until_2020")]
	#[case("19x0")]
	#[case("0")]
	#[case("")]
	fn rejects_unknown_time_periods(#[case] input: &str) {
		assert!(matches!(input.parse::<TimePeriod>(), Err(Error::InvalidTimePeriod(_))));
	}
}
