//! Brazilian document numbers: generation, parsing and validation.
//!
//! CPF, PIS, CNPJ and CEI share one parameterized modulus-11 routine
//! ([`checksum::Mod11`]) described by a [`NumericDocument`]. RG has no
//! national formula and dispatches on the issuing state ([`rg::RgScheme`]).
//!
//! Every document exposes the same four operations:
//! - `generate(rng)` never fails
//! - `from_base(digits)` computes the check digits of caller-supplied digits
//! - `parse(input)` returns [`Error::MalformedInput`] for unparseable input or
//!   mismatching check digits
//! - `validate(input)` is `parse(input).is_ok()`
//!
//! Separators (`.`, `-`, `/` and spaces) are ignored when parsing.

pub mod cei;
pub mod checksum;
pub mod cnpj;
pub mod cpf;
pub mod pis;
pub mod rg;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::model::dataset::STATE_CODES;
use checksum::Mod11;

/// The five supported document types.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
	Cpf,
	Rg,
	Pis,
	Cnpj,
	Cei,
}

impl DocumentKind {
	pub const ALL: [DocumentKind; 5] =
		[DocumentKind::Cpf, DocumentKind::Rg, DocumentKind::Pis, DocumentKind::Cnpj, DocumentKind::Cei];

	/// Upper-case display label.
	pub fn label(self) -> &'static str {
		match self {
			DocumentKind::Cpf => "CPF",
			DocumentKind::Rg => "RG",
			DocumentKind::Pis => "PIS",
			DocumentKind::Cnpj => "CNPJ",
			DocumentKind::Cei => "CEI",
		}
	}

	/// Lower-case key used in records and query strings.
	pub fn key(self) -> &'static str {
		match self {
			DocumentKind::Cpf => "cpf",
			DocumentKind::Rg => "rg",
			DocumentKind::Pis => "pis",
			DocumentKind::Cnpj => "cnpj",
			DocumentKind::Cei => "cei",
		}
	}
}

impl fmt::Display for DocumentKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

impl FromStr for DocumentKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let key = s.trim().to_lowercase();
		DocumentKind::ALL
			.into_iter()
			.find(|kind| kind.key() == key)
			.ok_or_else(|| Error::NoMatch(format!("document kind '{s}'")))
	}
}

/// A document number with its check symbols and display form.
///
/// # Invariants
/// - `check` is what the document's checksum computes from `base`
/// - `formatted` is `base` followed by `check`, laid out with separators
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
	kind: DocumentKind,
	base: Vec<u8>,
	check: String,
	formatted: String,
	issuer: Option<String>,
}

impl DocumentNumber {
	pub(crate) fn new(
		kind: DocumentKind,
		base: Vec<u8>,
		check: String,
		formatted: String,
		issuer: Option<String>,
	) -> Self {
		Self { kind, base, check, formatted, issuer }
	}

	pub fn kind(&self) -> DocumentKind {
		self.kind
	}

	/// Base digits, without check symbols.
	pub fn base_digits(&self) -> &[u8] {
		&self.base
	}

	/// Check symbols (digits, or `X` for some RGs); empty when the document has none.
	pub fn check_digits(&self) -> &str {
		&self.check
	}

	/// Issuing state, for RGs generated or parsed with one.
	pub fn issuer(&self) -> Option<&str> {
		self.issuer.as_deref()
	}

	/// Display form with separators.
	pub fn formatted(&self) -> &str {
		&self.formatted
	}

	/// Base digits and check symbols without separators or issuer suffix.
	///
	/// A letter prefix (`MG` on Minas Gerais RGs) is kept, so the result
	/// parses back to the same number.
	pub fn unformatted(&self) -> String {
		let mut raw: String = self.formatted.chars().take_while(char::is_ascii_alphabetic).collect();
		raw.extend(self.base.iter().map(|d| char::from(b'0' + d)));
		raw.push_str(&self.check);
		raw
	}
}

impl fmt::Display for DocumentNumber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.formatted)
	}
}

impl Serialize for DocumentNumber {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.formatted)
	}
}

/// A fixed-length numeric document checked by [`Mod11`].
#[derive(Clone, Copy, Debug)]
pub struct NumericDocument {
	pub kind: DocumentKind,
	/// Number of base digits before the check digits.
	pub base_len: usize,
	pub checksum: Mod11,
	/// Display layout, one `#` per digit.
	pub layout: &'static str,
	/// Reject numbers made of a single repeated digit.
	pub reject_repeated: bool,
}

impl NumericDocument {
	/// Base digits plus check digits.
	pub fn total_len(&self) -> usize {
		self.base_len + self.checksum.check_len()
	}

	/// Draws random base digits and computes their check digits.
	pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> DocumentNumber {
		loop {
			let base: Vec<u8> = (0..self.base_len).map(|_| rng.random_range(0..10)).collect();
			if self.reject_repeated && is_repeated(&base) {
				continue;
			}
			return self.assemble(base);
		}
	}

	/// Computes the check digits of caller-supplied base digits.
	///
	/// # Errors
	/// Returns [`Error::MalformedInput`] if the length is wrong or a value is not a digit.
	pub fn from_base(&self, base: &[u8]) -> Result<DocumentNumber> {
		if base.len() != self.base_len {
			return Err(Error::malformed(
				self.kind.label(),
				&digits_to_string(base),
				format!("expected {} base digits, got {}", self.base_len, base.len()),
			));
		}
		if base.iter().any(|d| *d > 9) {
			return Err(Error::malformed(self.kind.label(), &format!("{base:?}"), "values must be 0 to 9"));
		}
		Ok(self.assemble(base.to_vec()))
	}

	/// Parses a formatted or bare number and checks its digits.
	///
	/// # Errors
	/// Returns [`Error::MalformedInput`] on an unexpected character, a wrong
	/// digit count, a repeated-digit number when those are rejected, or
	/// mismatching check digits.
	pub fn parse(&self, input: &str) -> Result<DocumentNumber> {
		let label = self.kind.label();
		let symbols = strip_separators(label, input)?;
		let mut digits = Vec::with_capacity(symbols.len());
		for c in symbols {
			let digit = c.to_digit(10).ok_or_else(|| Error::malformed(label, input, format!("unexpected character '{c}'")))?;
			digits.push(digit as u8);
		}
		if digits.len() != self.total_len() {
			return Err(Error::malformed(
				label,
				input,
				format!("expected {} digits, got {}", self.total_len(), digits.len()),
			));
		}
		if self.reject_repeated && is_repeated(&digits) {
			return Err(Error::malformed(label, input, "all digits are equal"));
		}

		let document = self.assemble(digits[..self.base_len].to_vec());
		if document.unformatted() != digits_to_string(&digits) {
			return Err(Error::malformed(label, input, "check digits do not match"));
		}
		Ok(document)
	}

	/// `true` if `input` parses and its check digits match.
	pub fn validate(&self, input: &str) -> bool {
		self.parse(input).is_ok()
	}

	fn assemble(&self, base: Vec<u8>) -> DocumentNumber {
		let check = self.checksum.compute(&base);
		let mut all = base.clone();
		all.extend_from_slice(&check);
		let formatted = apply_layout(self.layout, all.iter().map(|d| char::from(b'0' + d)));
		DocumentNumber::new(self.kind, base, digits_to_string(&check), formatted, None)
	}
}

/// Generates a document of `kind`.
///
/// `state` is the RG issuing state; when absent a state is drawn uniformly.
pub fn generate<R: Rng + ?Sized>(
	kind: DocumentKind,
	rng: &mut R,
	state: Option<&str>,
	include_issuer: bool,
) -> DocumentNumber {
	match kind {
		DocumentKind::Cpf => cpf::generate(rng),
		DocumentKind::Pis => pis::generate(rng),
		DocumentKind::Cnpj => cnpj::generate(rng),
		DocumentKind::Cei => cei::generate(rng),
		DocumentKind::Rg => match state {
			Some(state) => rg::generate(rng, state, include_issuer),
			None => {
				let state = STATE_CODES[rng.random_range(0..STATE_CODES.len())];
				rg::generate(rng, state, include_issuer)
			}
		},
	}
}

/// Parses a document of `kind`.
pub fn parse(kind: DocumentKind, input: &str) -> Result<DocumentNumber> {
	match kind {
		DocumentKind::Cpf => cpf::parse(input),
		DocumentKind::Pis => pis::parse(input),
		DocumentKind::Cnpj => cnpj::parse(input),
		DocumentKind::Cei => cei::parse(input),
		DocumentKind::Rg => rg::parse(input),
	}
}

/// `true` if `input` is a well-formed document of `kind` with matching check symbols.
pub fn validate(kind: DocumentKind, input: &str) -> bool {
	parse(kind, input).is_ok()
}

/// Drops separators and rejects characters other than ASCII alphanumerics.
pub(crate) fn strip_separators(label: &'static str, input: &str) -> Result<Vec<char>> {
	let mut symbols = Vec::with_capacity(input.len());
	for c in input.trim().chars() {
		match c {
			'.' | '-' | '/' | ' ' => {}
			c if c.is_ascii_alphanumeric() => symbols.push(c),
			c => return Err(Error::malformed(label, input, format!("unexpected character '{c}'"))),
		}
	}
	if symbols.is_empty() {
		return Err(Error::malformed(label, input, "no digits"));
	}
	Ok(symbols)
}

/// Replaces each `#` of `layout` with the next symbol.
pub(crate) fn apply_layout(layout: &str, mut symbols: impl Iterator<Item = char>) -> String {
	layout
		.chars()
		.filter_map(|c| if c == '#' { symbols.next() } else { Some(c) })
		.collect()
}

pub(crate) fn digits_to_string(digits: &[u8]) -> String {
	digits.iter().map(|d| char::from(b'0' + (d % 10))).collect()
}

fn is_repeated(digits: &[u8]) -> bool {
	digits.windows(2).all(|pair| pair[0] == pair[1])
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;
	use rstest::rstest;

	#[test]
	fn every_generated_document_validates() {
		let mut rng = ChaCha8Rng::seed_from_u64(2024);
		for kind in DocumentKind::ALL {
			for _ in 0..500 {
				let document = generate(kind, &mut rng, None, true);
				assert!(validate(kind, document.formatted()), "{kind} {document} should validate");
				assert!(validate(kind, &document.unformatted()), "{kind} {} should validate", document.unformatted());
			}
		}
	}

	#[rstest]
	#[case("cpf", DocumentKind::Cpf)]
	#[case("RG", DocumentKind::Rg)]
	#[case(" Cnpj ", DocumentKind::Cnpj)]
	fn parses_kinds(#[case] input: &str, #[case] expected: DocumentKind) {
		assert_eq!(input.parse::<DocumentKind>().unwrap(), expected);
	}

	#[test]
	fn unknown_kind_is_no_match() {
		assert!(matches!("cnh".parse::<DocumentKind>(), Err(Error::NoMatch(_))));
	}

	#[test]
	fn layout_fills_placeholders_in_order() {
		assert_eq!(apply_layout("##.#-#", "1234".chars()), "12.3-4");
	}

	#[rstest]
	#[case("")]
	#[case("   ")]
	#[case("123_456")]
	#[case("12,3")]
	fn separators_reject_garbage(#[case] input: &str) {
		assert!(matches!(strip_separators("CPF", input), Err(Error::MalformedInput { .. })));
	}

	#[test]
	fn serializes_as_formatted_string() {
		let document = cpf::from_base(&[5, 2, 9, 9, 8, 2, 2, 4, 7]).unwrap();
		assert_eq!(serde_json::to_string(&document).unwrap(), "\"529.982.247-25\"");
	}
}
