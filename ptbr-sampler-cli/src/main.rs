//! Command-line front end of the sampler.
//!
//! ```bash
//! # Five profiles from the south-east, as JSON lines, reproducible
//! ptbr-sampler sample -n 5 --regions sudeste --format jsonl --seed 42
//!
//! # Ten thousand profiles with phone numbers, built across all cores
//! ptbr-sampler sample -n 10000 --phone --parallel --output profiles.jsonl
//!
//! # Everything: all documents, phone, issuer and middle names
//! ptbr-sampler sample -n 3 --all
//!
//! # Partial outputs
//! ptbr-sampler name -n 5 --only surname --top-40
//! ptbr-sampler location -n 5 --only city --states SP,RJ
//! ptbr-sampler location -n 3 --state SP --city Campinas
//!
//! # Documents
//! ptbr-sampler document cnpj -n 3
//! ptbr-sampler document rg --state SP --issuer
//! ptbr-sampler validate cpf 529.982.247-25
//!
//! # Pre-build reference.bin for faster start-up
//! ptbr-sampler snapshot
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use ptbr_sampler_core::document::{self, DocumentKind};
use ptbr_sampler_core::model::dataset::is_state_code;
use ptbr_sampler_core::{
	Error, LocationFormat, NameFormat, NameOptions, NameStyle, Profile, ProfileComposer, ProfileOptions, ReferenceData,
	Region, RegionFilter, TimePeriod,
};

#[derive(Parser)]
#[command(name = "ptbr-sampler")]
#[command(about = "Synthetic Brazilian names, addresses and document numbers")]
#[command(long_about = None)]
struct Cli {
	/// Directory holding locations.json and names.json (or reference.bin)
	#[arg(long, global = true, env = "PTBR_SAMPLER_DATA_DIR", default_value = "./data")]
	data_dir: PathBuf,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Generate complete profiles
	Sample(SampleArgs),

	/// Generate names, or only their surname or middle-name part
	Name(NameArgs),

	/// Generate locations, or only their city, state or CEP part
	Location(LocationArgs),

	/// Generate document numbers
	Document {
		/// cpf, rg, pis, cnpj or cei
		kind: DocumentKind,

		#[arg(short = 'n', long, default_value_t = 1)]
		quantity: usize,

		/// Issuing state of generated RGs (random when omitted)
		#[arg(long)]
		state: Option<String>,

		/// Append the `/UF` issuer to RGs
		#[arg(long)]
		issuer: bool,

		/// Print digits without separators
		#[arg(long)]
		unformatted: bool,

		#[arg(long)]
		seed: Option<u64>,
	},

	/// Check a document number; exits with status 1 when invalid
	Validate {
		kind: DocumentKind,

		value: String,

		/// Expected RG issuing state
		#[arg(long)]
		state: Option<String>,
	},

	/// Parse the JSON reference files and write reference.bin next to them
	Snapshot,
}

/// Name shaping flags shared by `sample` and `name`.
#[derive(Args)]
struct NameFlags {
	/// Birth-decade bucket of first names, as a tag or a year
	#[arg(long, default_value = "until_2010")]
	time_period: TimePeriod,

	/// Upper-case names as stored in the tables
	#[arg(long)]
	raw: bool,

	/// Only draw surnames among the 40 most frequent
	#[arg(long = "top-40")]
	top_40: bool,

	#[arg(long)]
	one_surname: bool,

	#[arg(long)]
	always_middle: bool,
}

impl NameFlags {
	fn options(&self) -> NameOptions {
		NameOptions {
			time_period: self.time_period,
			style: if self.raw { NameStyle::Raw } else { NameStyle::TitleCase },
			top_surnames_only: self.top_40,
			single_surname: self.one_surname,
			always_middle: self.always_middle,
		}
	}
}

/// State and region restriction shared by `sample` and `location`.
#[derive(Args)]
struct FilterFlags {
	/// Restrict to these state codes, comma separated
	#[arg(long, value_delimiter = ',')]
	states: Vec<String>,

	/// Restrict to these regions (norte, nordeste, centro-oeste, sudeste, sul)
	#[arg(long, value_delimiter = ',')]
	regions: Vec<Region>,
}

impl FilterFlags {
	fn filter(&self) -> Result<Option<RegionFilter>, Error> {
		let mut filter: Option<RegionFilter> = None;
		if !self.states.is_empty() {
			filter = Some(RegionFilter::from_states(&self.states)?);
		}
		if !self.regions.is_empty() {
			let regions = RegionFilter::from_regions(self.regions.iter().copied());
			filter = Some(match filter {
				Some(states) => states.union(&regions),
				None => regions,
			});
		}
		Ok(filter)
	}
}

#[derive(Args)]
struct SampleArgs {
	#[arg(short = 'n', long, default_value_t = 1)]
	quantity: usize,

	/// Include every document, a phone, the RG issuer and a middle name
	#[arg(short = 'a', long)]
	all: bool,

	/// Documents to include, comma separated [default: cpf,rg]
	#[arg(long, value_delimiter = ',', conflicts_with = "all")]
	documents: Option<Vec<DocumentKind>>,

	#[command(flatten)]
	filter: FilterFlags,

	#[command(flatten)]
	name: NameFlags,

	/// Append the `/UF` issuer to RGs
	#[arg(long)]
	issuer: bool,

	/// Include a mobile phone number
	#[arg(long)]
	phone: bool,

	#[arg(long)]
	no_name: bool,

	#[arg(long)]
	no_location: bool,

	#[arg(long)]
	cep_without_dash: bool,

	/// Seed for reproducible output
	#[arg(long)]
	seed: Option<u64>,

	/// Build profiles across all cores
	#[arg(long)]
	parallel: bool,

	#[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
	format: OutputFormat,

	/// Write JSON lines to this file instead of printing
	#[arg(long, value_name = "PATH")]
	output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
	Plain,
	Jsonl,
}

#[derive(Args)]
struct NameArgs {
	#[arg(short = 'n', long, default_value_t = 1)]
	quantity: usize,

	/// Part of the name to print
	#[arg(long, value_enum, default_value_t = NamePart::Full)]
	only: NamePart,

	#[command(flatten)]
	name: NameFlags,

	#[arg(long)]
	seed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum NamePart {
	Full,
	Surname,
	Middle,
}

impl From<NamePart> for NameFormat {
	fn from(part: NamePart) -> Self {
		match part {
			NamePart::Full => NameFormat::Full,
			NamePart::Surname => NameFormat::SurnameOnly,
			NamePart::Middle => NameFormat::MiddleOnly,
		}
	}
}

#[derive(Args)]
struct LocationArgs {
	#[arg(short = 'n', long, default_value_t = 1)]
	quantity: usize,

	/// Part of the location to print
	#[arg(long, value_enum, default_value_t = LocationPart::Full, conflicts_with = "city")]
	only: LocationPart,

	#[command(flatten)]
	filter: FilterFlags,

	/// Print CEPs of this city instead of drawing a location
	#[arg(long, requires = "state")]
	city: Option<String>,

	/// State code of `--city`
	#[arg(long)]
	state: Option<String>,

	#[arg(long)]
	cep_without_dash: bool,

	#[arg(long)]
	seed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LocationPart {
	Full,
	City,
	StateAbbr,
	State,
	Cep,
}

impl LocationArgs {
	fn format(&self) -> LocationFormat {
		let with_dash = !self.cep_without_dash;
		match self.only {
			LocationPart::Full => LocationFormat::Full { cep_with_dash: with_dash },
			LocationPart::City => LocationFormat::CityOnly,
			LocationPart::StateAbbr => LocationFormat::StateAbbreviationOnly,
			LocationPart::State => LocationFormat::StateNameOnly,
			LocationPart::Cep => LocationFormat::CepOnly { with_dash },
		}
	}
}

impl SampleArgs {
	fn options(&self) -> Result<ProfileOptions, Error> {
		let mut name = self.name.options();
		name.always_middle |= self.all;

		let documents = match &self.documents {
			_ if self.all => DocumentKind::ALL.into_iter().collect(),
			Some(kinds) => kinds.iter().copied().collect::<BTreeSet<_>>(),
			None => ProfileOptions::default().documents,
		};

		Ok(ProfileOptions {
			include_name: !self.no_name,
			include_location: !self.no_location,
			documents,
			region_filter: self.filter.filter()?,
			name,
			include_rg_issuer: self.issuer || self.all,
			include_phone: self.phone || self.all,
			cep_with_dash: !self.cep_without_dash,
		})
	}
}

fn seeded(seed: Option<u64>) -> ChaCha8Rng {
	match seed {
		Some(seed) => ChaCha8Rng::seed_from_u64(seed),
		None => ChaCha8Rng::from_rng(&mut rand::rng()),
	}
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	match cli.command {
		Commands::Sample(args) => {
			let reference = ReferenceData::load(&cli.data_dir)?;
			let composer = ProfileComposer::from_reference(&reference)?;
			let options = args.options()?;
			let seed = args.seed.unwrap_or_else(|| rand::rng().random());

			let profiles = if args.parallel {
				composer.build_profiles_parallel(seed, &options, args.quantity)?
			} else {
				let mut rng = ChaCha8Rng::seed_from_u64(seed);
				composer.build_profiles(&mut rng, &options, args.quantity)?
			};
			info!(quantity = profiles.len(), seed, "profiles generated");

			match &args.output {
				Some(path) => {
					let mut writer = BufWriter::new(File::create(path)?);
					write_jsonl(&mut writer, &profiles)?;
					writer.flush()?;
					info!(path = %path.display(), "profiles saved");
				}
				None => {
					let mut stdout = std::io::stdout().lock();
					match args.format {
						OutputFormat::Jsonl => write_jsonl(&mut stdout, &profiles)?,
						OutputFormat::Plain => {
							for profile in &profiles {
								writeln!(stdout, "{}", plain_line(profile))?;
							}
						}
					}
				}
			}
		}
		Commands::Name(args) => {
			let reference = ReferenceData::load(&cli.data_dir)?;
			let composer = ProfileComposer::from_reference(&reference)?;
			let options = args.name.options();
			let mut rng = seeded(args.seed);
			for _ in 0..args.quantity {
				println!("{}", composer.names().get_random_formatted(&mut rng, &options, args.only.into())?);
			}
		}
		Commands::Location(args) => {
			let reference = ReferenceData::load(&cli.data_dir)?;
			let composer = ProfileComposer::from_reference(&reference)?;
			let locations = composer.locations();
			let mut rng = seeded(args.seed);

			match (&args.city, &args.state) {
				(Some(city), Some(state)) => {
					let state = state.trim().to_uppercase();
					let city = locations
						.city_by_name(&state, city)
						.ok_or_else(|| Error::NoMatch(format!("city '{city}' in {state}")))?;
					for _ in 0..args.quantity {
						println!("{}", locations.random_cep(&mut rng, city).format(!args.cep_without_dash));
					}
				}
				_ => {
					let filter = args.filter.filter()?;
					for _ in 0..args.quantity {
						println!("{}", locations.get_random_location(&mut rng, filter.as_ref(), args.format())?);
					}
				}
			}
		}
		Commands::Document { kind, quantity, state, issuer, unformatted, seed } => {
			if let Some(code) = &state {
				if !is_state_code(&code.trim().to_uppercase()) {
					return Err(Error::NoMatch(format!("state code '{code}'")).into());
				}
			}
			let mut rng = seeded(seed);
			for _ in 0..quantity {
				let number = document::generate(kind, &mut rng, state.as_deref(), issuer);
				if unformatted {
					println!("{}", number.unformatted());
				} else {
					println!("{number}");
				}
			}
		}
		Commands::Validate { kind, value, state } => {
			let parsed = match (kind, state.as_deref()) {
				(DocumentKind::Rg, Some(state)) => document::rg::parse_for_state(&value, state),
				_ => document::parse(kind, &value),
			};
			return Ok(match parsed {
				Ok(number) => {
					println!("valid {kind}: {number}");
					ExitCode::SUCCESS
				}
				Err(e) => {
					println!("invalid {kind}: {e}");
					ExitCode::FAILURE
				}
			});
		}
		Commands::Snapshot => {
			let reference = ReferenceData::load_json(&cli.data_dir)?;
			let path = reference.write_snapshot(&cli.data_dir)?;
			println!("{}", path.display());
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn write_jsonl<W: Write>(writer: &mut W, profiles: &[Profile]) -> Result<(), Box<dyn std::error::Error>> {
	for profile in profiles {
		serde_json::to_writer(&mut *writer, &profile.to_record())?;
		writer.write_all(b"\n")?;
	}
	Ok(())
}

/// `Name | City, State (UF), CEP | CPF: ... | RG: ... | Phone: ...`
fn plain_line(profile: &Profile) -> String {
	let mut parts = Vec::new();
	if let Some(name) = profile.full_name() {
		parts.push(name);
	}
	if let Some(location) = &profile.location {
		parts.push(format!(
			"{}, {} ({}), {}",
			location.city, location.state, location.state_abbreviation, location.cep
		));
	}
	for (kind, number) in &profile.documents {
		parts.push(format!("{kind}: {number}"));
	}
	if let Some(phone) = &profile.phone {
		parts.push(format!("Phone: {phone}"));
	}
	parts.join(" | ")
}
