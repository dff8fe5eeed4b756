use std::collections::BTreeSet;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use ptbr_sampler_core::document::{self, DocumentKind};
use ptbr_sampler_core::model::dataset::is_state_code;
use ptbr_sampler_core::{
	Error, LocationFormat, NameFormat, NameOptions, NameStyle, ProfileComposer, ProfileOptions, ProfileRecord,
	ReferenceData, Region, RegionFilter, TimePeriod,
};

/// Largest `quantity` accepted by one request.
const MAX_QUANTITY: usize = 10_000;

/// Requests at or above this size are built on every core.
const PARALLEL_THRESHOLD: usize = 1_000;

#[derive(Parser)]
#[command(name = "ptbr-sampler-server")]
#[command(about = "HTTP API over the Brazilian data sampler")]
struct Config {
	/// Directory holding locations.json and names.json (or reference.bin)
	#[arg(long, env = "PTBR_SAMPLER_DATA_DIR", default_value = "./data")]
	data_dir: PathBuf,

	#[arg(long, env = "PTBR_SAMPLER_BIND", default_value = "127.0.0.1")]
	bind: String,

	#[arg(long, env = "PTBR_SAMPLER_PORT", default_value_t = 5000)]
	port: u16,
}

/// Query parameters of `/v1/profiles`. Lists are comma separated.
#[derive(Deserialize)]
struct ProfileParams {
	quantity: Option<usize>,
	documents: Option<String>,
	states: Option<String>,
	regions: Option<String>,
	time_period: Option<String>,
	raw: Option<bool>,
	top_40: Option<bool>,
	one_surname: Option<bool>,
	always_middle: Option<bool>,
	issuer: Option<bool>,
	phone: Option<bool>,
	seed: Option<u64>,
}

/// Query parameters of `/v1/names`. `only` is `full`, `surname` or `middle`.
#[derive(Deserialize)]
struct NameParams {
	quantity: Option<usize>,
	only: Option<String>,
	time_period: Option<String>,
	raw: Option<bool>,
	top_40: Option<bool>,
	one_surname: Option<bool>,
	always_middle: Option<bool>,
	seed: Option<u64>,
}

/// Query parameters of `/v1/locations`.
///
/// `only` is `full`, `city`, `state_abbr`, `state` or `cep`. With `city` and
/// `state`, CEPs of that city are returned instead.
#[derive(Deserialize)]
struct LocationParams {
	quantity: Option<usize>,
	only: Option<String>,
	states: Option<String>,
	regions: Option<String>,
	city: Option<String>,
	state: Option<String>,
	cep_without_dash: Option<bool>,
	seed: Option<u64>,
}

#[derive(Deserialize)]
struct DocumentParams {
	quantity: Option<usize>,
	state: Option<String>,
	issuer: Option<bool>,
	seed: Option<u64>,
}

#[derive(Deserialize)]
struct ValidateParams {
	value: String,
	state: Option<String>,
}

#[derive(Serialize)]
struct Validation {
	kind: DocumentKind,
	value: String,
	valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	formatted: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	reason: Option<String>,
}

#[derive(Serialize)]
struct Health {
	status: &'static str,
	states: usize,
	cities: usize,
}

fn split_list(value: &Option<String>) -> Vec<&str> {
	value
		.as_deref()
		.map(|list| list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
		.unwrap_or_default()
}

fn region_filter(states: &Option<String>, regions: &Option<String>) -> Result<Option<RegionFilter>, Error> {
	let mut filter: Option<RegionFilter> = None;
	let states = split_list(states);
	if !states.is_empty() {
		filter = Some(RegionFilter::from_states(states)?);
	}
	let regions = split_list(regions).into_iter().map(str::parse::<Region>).collect::<Result<Vec<_>, _>>()?;
	if !regions.is_empty() {
		let regions = RegionFilter::from_regions(regions);
		filter = Some(match filter {
			Some(states) => states.union(&regions),
			None => regions,
		});
	}
	Ok(filter)
}

fn name_options(
	time_period: &Option<String>,
	raw: Option<bool>,
	top_40: Option<bool>,
	one_surname: Option<bool>,
	always_middle: Option<bool>,
) -> Result<NameOptions, Error> {
	let time_period = match time_period {
		Some(period) => period.parse::<TimePeriod>()?,
		None => TimePeriod::default(),
	};
	Ok(NameOptions {
		time_period,
		style: if raw.unwrap_or(false) { NameStyle::Raw } else { NameStyle::TitleCase },
		top_surnames_only: top_40.unwrap_or(false),
		single_surname: one_surname.unwrap_or(false),
		always_middle: always_middle.unwrap_or(false),
	})
}

impl NameParams {
	fn format(&self) -> Result<NameFormat, Error> {
		match self.only.as_deref().map(str::trim) {
			None | Some("full") => Ok(NameFormat::Full),
			Some("surname") => Ok(NameFormat::SurnameOnly),
			Some("middle") => Ok(NameFormat::MiddleOnly),
			Some(other) => Err(Error::NoMatch(format!("name part '{other}'"))),
		}
	}
}

impl LocationParams {
	fn format(&self) -> Result<LocationFormat, Error> {
		let with_dash = !self.cep_without_dash.unwrap_or(false);
		match self.only.as_deref().map(str::trim) {
			None | Some("full") => Ok(LocationFormat::Full { cep_with_dash: with_dash }),
			Some("city") => Ok(LocationFormat::CityOnly),
			Some("state_abbr") => Ok(LocationFormat::StateAbbreviationOnly),
			Some("state") => Ok(LocationFormat::StateNameOnly),
			Some("cep") => Ok(LocationFormat::CepOnly { with_dash }),
			Some(other) => Err(Error::NoMatch(format!("location part '{other}'"))),
		}
	}
}

impl ProfileParams {
	fn options(&self) -> Result<ProfileOptions, Error> {
		let filter = region_filter(&self.states, &self.regions)?;

		let documents = match &self.documents {
			Some(_) => split_list(&self.documents)
				.into_iter()
				.map(str::parse::<DocumentKind>)
				.collect::<Result<BTreeSet<_>, _>>()?,
			None => ProfileOptions::default().documents,
		};

		Ok(ProfileOptions {
			documents,
			region_filter: filter,
			name: name_options(&self.time_period, self.raw, self.top_40, self.one_surname, self.always_middle)?,
			include_rg_issuer: self.issuer.unwrap_or(false),
			include_phone: self.phone.unwrap_or(false),
			..ProfileOptions::default()
		})
	}
}

/// Maps sampler errors on request input to 4xx responses.
fn error_response(e: &Error) -> HttpResponse {
	match e {
		Error::NoMatch(_) | Error::InvalidTimePeriod(_) | Error::InvalidCount { .. } | Error::MalformedInput { .. } => {
			HttpResponse::BadRequest().body(e.to_string())
		}
		_ => {
			error!(error = %e, "request failed");
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

fn check_quantity(quantity: usize) -> Result<usize, HttpResponse> {
	if quantity == 0 || quantity > MAX_QUANTITY {
		return Err(HttpResponse::BadRequest().body(format!("quantity must be between 1 and {MAX_QUANTITY}")));
	}
	Ok(quantity)
}

fn check_state(state: Option<&str>) -> Result<(), HttpResponse> {
	match state {
		Some(code) if !is_state_code(&code.trim().to_uppercase()) => {
			Err(HttpResponse::BadRequest().body(format!("unknown state code '{code}'")))
		}
		_ => Ok(()),
	}
}

/// HTTP GET endpoint `/v1/profiles`
///
/// Returns a JSON array of flat profile records.
#[get("/v1/profiles")]
async fn get_profiles(composer: web::Data<ProfileComposer>, query: web::Query<ProfileParams>) -> impl Responder {
	let quantity = match check_quantity(query.quantity.unwrap_or(1)) {
		Ok(q) => q,
		Err(response) => return response,
	};
	let options = match query.options() {
		Ok(o) => o,
		Err(e) => return error_response(&e),
	};
	let seed = query.seed.unwrap_or_else(|| rand::rng().random());

	let built = web::block(move || {
		let profiles = if quantity >= PARALLEL_THRESHOLD {
			composer.build_profiles_parallel(seed, &options, quantity)?
		} else {
			let mut rng = ChaCha8Rng::seed_from_u64(seed);
			composer.build_profiles(&mut rng, &options, quantity)?
		};
		Ok::<Vec<ProfileRecord>, Error>(profiles.iter().map(|p| p.to_record()).collect())
	})
	.await;

	match built {
		Ok(Ok(records)) => HttpResponse::Ok().json(records),
		Ok(Err(e)) => error_response(&e),
		Err(_) => HttpResponse::InternalServerError().body("Worker failed"),
	}
}

fn seeded(seed: Option<u64>) -> ChaCha8Rng {
	match seed {
		Some(seed) => ChaCha8Rng::seed_from_u64(seed),
		None => ChaCha8Rng::from_rng(&mut rand::rng()),
	}
}

/// HTTP GET endpoint `/v1/names`
///
/// Returns a JSON array of names, or of their surname or middle-name part.
#[get("/v1/names")]
async fn get_names(composer: web::Data<ProfileComposer>, query: web::Query<NameParams>) -> impl Responder {
	let quantity = match check_quantity(query.quantity.unwrap_or(1)) {
		Ok(q) => q,
		Err(response) => return response,
	};
	let drawn = name_options(&query.time_period, query.raw, query.top_40, query.one_surname, query.always_middle)
		.and_then(|options| -> Result<Vec<String>, Error> {
			let format = query.format()?;
			let mut rng = seeded(query.seed);
			(0..quantity)
				.map(|_| composer.names().get_random_formatted(&mut rng, &options, format))
				.collect::<Result<Vec<_>, _>>()
		});
	match drawn {
		Ok(names) => HttpResponse::Ok().json(names),
		Err(e) => error_response(&e),
	}
}

/// HTTP GET endpoint `/v1/locations`
///
/// Returns a JSON array of rendered locations, or of CEPs of one city.
#[get("/v1/locations")]
async fn get_locations(composer: web::Data<ProfileComposer>, query: web::Query<LocationParams>) -> impl Responder {
	let quantity = match check_quantity(query.quantity.unwrap_or(1)) {
		Ok(q) => q,
		Err(response) => return response,
	};
	let locations = composer.locations();
	let mut rng = seeded(query.seed);

	let drawn: Result<Vec<String>, Error> = match (&query.city, &query.state) {
		(Some(city), Some(state)) => {
			let state = state.trim().to_uppercase();
			let with_dash = !query.cep_without_dash.unwrap_or(false);
			locations
				.city_by_name(&state, city)
				.ok_or_else(|| Error::NoMatch(format!("city '{city}' in {state}")))
				.map(|city| (0..quantity).map(|_| locations.random_cep(&mut rng, city).format(with_dash)).collect())
		}
		(Some(_), None) => Err(Error::NoMatch("city without a state".to_owned())),
		_ => region_filter(&query.states, &query.regions).and_then(|filter| -> Result<Vec<String>, Error> {
			let format = query.format()?;
			(0..quantity)
				.map(|_| locations.get_random_location(&mut rng, filter.as_ref(), format))
				.collect::<Result<Vec<_>, _>>()
		}),
	};
	match drawn {
		Ok(values) => HttpResponse::Ok().json(values),
		Err(e) => error_response(&e),
	}
}

/// HTTP GET endpoint `/v1/documents/{kind}`
///
/// Returns a JSON array of formatted numbers.
#[get("/v1/documents/{kind}")]
async fn get_documents(path: web::Path<String>, query: web::Query<DocumentParams>) -> impl Responder {
	let kind = match path.parse::<DocumentKind>() {
		Ok(k) => k,
		Err(e) => return error_response(&e),
	};
	let quantity = match check_quantity(query.quantity.unwrap_or(1)) {
		Ok(q) => q,
		Err(response) => return response,
	};
	if let Err(response) = check_state(query.state.as_deref()) {
		return response;
	}

	let mut rng = seeded(query.seed);
	let numbers: Vec<String> = (0..quantity)
		.map(|_| document::generate(kind, &mut rng, query.state.as_deref(), query.issuer.unwrap_or(false)).to_string())
		.collect();
	HttpResponse::Ok().json(numbers)
}

/// HTTP GET endpoint `/v1/validate/{kind}`
#[get("/v1/validate/{kind}")]
async fn get_validation(path: web::Path<String>, query: web::Query<ValidateParams>) -> impl Responder {
	let kind = match path.parse::<DocumentKind>() {
		Ok(k) => k,
		Err(e) => return error_response(&e),
	};
	let parsed = match (kind, query.state.as_deref()) {
		(DocumentKind::Rg, Some(state)) => document::rg::parse_for_state(&query.value, state),
		_ => document::parse(kind, &query.value),
	};
	let validation = match parsed {
		Ok(number) => Validation {
			kind,
			value: query.value.clone(),
			valid: true,
			formatted: Some(number.to_string()),
			reason: None,
		},
		Err(e) => Validation { kind, value: query.value.clone(), valid: false, formatted: None, reason: Some(e.to_string()) },
	};
	HttpResponse::Ok().json(validation)
}

#[get("/v1/health")]
async fn get_health(composer: web::Data<ProfileComposer>) -> impl Responder {
	let data = composer.locations().data();
	HttpResponse::Ok().json(Health { status: "ok", states: data.states().len(), cities: data.cities().len() })
}

/// Main entry point for the server.
///
/// Loads the reference data once, builds an immutable composer shared by
/// every worker without locking, and serves the `/v1` endpoints.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let config = Config::parse();

	let composer = ReferenceData::load(&config.data_dir).and_then(|reference| ProfileComposer::from_reference(&reference));
	let composer = match composer {
		Ok(c) => web::Data::new(c),
		Err(e) => {
			error!(error = %e, dir = %config.data_dir.display(), "failed to load reference data");
			return Err(std::io::Error::other(e));
		}
	};

	info!(bind = %config.bind, port = config.port, "starting server");
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::default().allow_any_origin().allowed_methods(vec!["GET"]))
			.app_data(composer.clone())
			.service(get_profiles)
			.service(get_names)
			.service(get_locations)
			.service(get_documents)
			.service(get_validation)
			.service(get_health)
	})
		.bind((config.bind.as_str(), config.port))?
		.run()
		.await
}
