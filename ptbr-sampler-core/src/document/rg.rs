//! RG (Registro Geral). Each state issues its own numbering, so the format
//! and check symbol depend on the issuing state ([`RgScheme`]).
//!
//! An RG may carry its issuer as a `/UF` suffix (`39.841.256-X/SP`). Without
//! one, [`parse`] infers the scheme from the shape of the number: an `MG`
//! prefix, seven bare digits, or eight digits plus a check symbol accepted
//! by either the São Paulo or the Rio de Janeiro rule.

use std::fmt;

use rand::Rng;

use super::{DocumentKind, DocumentNumber, apply_layout, checksum, digits_to_string, strip_separators};
use crate::error::{Error, Result};
use crate::model::dataset::is_state_code;

const LABEL: &str = "RG";
const WEIGHTS: [u32; 8] = [2, 3, 4, 5, 6, 7, 8, 9];

/// Numbering scheme of an issuing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgScheme {
	/// 8 digits and a check symbol (`0`-`9` or `X`): `##.###.###-#`.
	SaoPaulo,
	/// 8 digits and a modulus-11 check digit: `##.###.###-#`.
	RioDeJaneiro,
	/// 8 digits with an `MG-` prefix and no check digit.
	MinasGerais,
	/// 7 digits, no check digit: `#.###.###`.
	Generic,
}

impl RgScheme {
	pub fn for_state(state: &str) -> Self {
		match state.trim().to_uppercase().as_str() {
			"SP" => RgScheme::SaoPaulo,
			"RJ" => RgScheme::RioDeJaneiro,
			"MG" => RgScheme::MinasGerais,
			_ => RgScheme::Generic,
		}
	}

	pub fn base_len(self) -> usize {
		match self {
			RgScheme::Generic => 7,
			_ => 8,
		}
	}

	pub fn has_check(self) -> bool {
		matches!(self, RgScheme::SaoPaulo | RgScheme::RioDeJaneiro)
	}

	fn layout(self) -> &'static str {
		match self {
			RgScheme::SaoPaulo | RgScheme::RioDeJaneiro => "##.###.###-#",
			RgScheme::MinasGerais => "MG-##.###.###",
			RgScheme::Generic => "#.###.###",
		}
	}

	/// Check symbol of `base`, if the scheme has one.
	pub fn check(self, base: &[u8]) -> Option<char> {
		match self {
			RgScheme::SaoPaulo => {
				let value = 11 - checksum::weighted_sum(base, &WEIGHTS) % 11;
				Some(match value {
					10 => 'X',
					11 => '0',
					v => char::from(b'0' + v as u8),
				})
			}
			RgScheme::RioDeJaneiro => Some(char::from(b'0' + checksum::check_digit(base, &WEIGHTS))),
			RgScheme::MinasGerais | RgScheme::Generic => None,
		}
	}

	fn assemble(self, base: Vec<u8>, issuer: Option<String>) -> DocumentNumber {
		let check = self.check(&base).map(String::from).unwrap_or_default();
		let mut formatted = apply_layout(self.layout(), digits_to_string(&base).chars().chain(check.chars()));
		if let Some(issuer) = &issuer {
			formatted.push('/');
			formatted.push_str(issuer);
		}
		DocumentNumber::new(DocumentKind::Rg, base, check, formatted, issuer)
	}
}

impl fmt::Display for RgScheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			RgScheme::SaoPaulo => "São Paulo",
			RgScheme::RioDeJaneiro => "Rio de Janeiro",
			RgScheme::MinasGerais => "Minas Gerais",
			RgScheme::Generic => "generic",
		};
		f.write_str(name)
	}
}

/// Generates an RG issued by `state`.
///
/// `state` is a UF code; anything else falls back to the generic scheme and
/// is never written as an issuer suffix.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, state: &str, include_issuer: bool) -> DocumentNumber {
	let scheme = RgScheme::for_state(state);
	let base: Vec<u8> = (0..scheme.base_len()).map(|_| rng.random_range(0..10)).collect();
	let state = state.trim().to_uppercase();
	let issuer = (include_issuer && is_state_code(&state)).then_some(state);
	scheme.assemble(base, issuer)
}

/// Builds the RG of `state` for caller-supplied base digits.
pub fn from_base(base: &[u8], state: &str, include_issuer: bool) -> Result<DocumentNumber> {
	let scheme = RgScheme::for_state(state);
	if base.len() != scheme.base_len() || base.iter().any(|d| *d > 9) {
		return Err(Error::malformed(
			LABEL,
			&format!("{base:?}"),
			format!("{scheme} RG takes {} base digits from 0 to 9", scheme.base_len()),
		));
	}
	let issuer = issuer_code(state)?;
	Ok(scheme.assemble(base.to_vec(), include_issuer.then_some(issuer)))
}

/// Parses an RG, taking its scheme from the `/UF` suffix or inferring it from its shape.
///
/// # Errors
/// Returns [`Error::MalformedInput`] for an unknown issuer, an unrecognized
/// shape, or a mismatching check symbol.
pub fn parse(input: &str) -> Result<DocumentNumber> {
	if let Some((_, suffix)) = split_issuer(input) {
		return parse_for_state(input, suffix);
	}

	let symbols = strip_separators(LABEL, input)?;
	if has_mg_prefix(&symbols) {
		return parse_symbols(input, &symbols, RgScheme::MinasGerais, None);
	}
	match symbols.len() {
		7 => parse_symbols(input, &symbols, RgScheme::Generic, None),
		9 => parse_symbols(input, &symbols, RgScheme::SaoPaulo, None)
			.or_else(|_| parse_symbols(input, &symbols, RgScheme::RioDeJaneiro, None)),
		n => Err(Error::malformed(LABEL, input, format!("cannot infer issuer from {n} symbols"))),
	}
}

/// Parses an RG issued by `state`. A `/UF` suffix in `input`, if present,
/// must name the same state.
pub fn parse_for_state(input: &str, state: &str) -> Result<DocumentNumber> {
	let state = issuer_code(state)?;
	let (body, issuer) = match split_issuer(input) {
		Some((body, suffix)) => {
			let suffix = issuer_code(suffix)?;
			if suffix != state {
				return Err(Error::malformed(LABEL, input, format!("issued by {suffix}, expected {state}")));
			}
			(body, Some(suffix))
		}
		None => (input, None),
	};
	let symbols = strip_separators(LABEL, body)?;
	parse_symbols(input, &symbols, RgScheme::for_state(&state), issuer)
}

/// `true` if [`parse`] accepts `input`.
pub fn validate(input: &str) -> bool {
	parse(input).is_ok()
}

/// `true` if [`parse_for_state`] accepts `input`.
pub fn validate_for_state(input: &str, state: &str) -> bool {
	parse_for_state(input, state).is_ok()
}

fn issuer_code(state: &str) -> Result<String> {
	let code = state.trim().to_uppercase();
	if is_state_code(&code) {
		Ok(code)
	} else {
		Err(Error::malformed(LABEL, state, "unknown issuer"))
	}
}

/// Splits `body/UF` when the text after the last `/` is alphabetic.
fn split_issuer(input: &str) -> Option<(&str, &str)> {
	let (body, suffix) = input.trim().rsplit_once('/')?;
	let suffix = suffix.trim();
	(!suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphabetic())).then_some((body, suffix))
}

fn has_mg_prefix(symbols: &[char]) -> bool {
	matches!(symbols, [m, g, ..] if m.eq_ignore_ascii_case(&'M') && g.eq_ignore_ascii_case(&'G'))
}

fn parse_symbols(input: &str, symbols: &[char], scheme: RgScheme, issuer: Option<String>) -> Result<DocumentNumber> {
	let symbols = match scheme {
		RgScheme::MinasGerais if has_mg_prefix(symbols) => &symbols[2..],
		_ => symbols,
	};
	let expected = scheme.base_len() + usize::from(scheme.has_check());
	if symbols.len() != expected {
		return Err(Error::malformed(
			LABEL,
			input,
			format!("{scheme} RG has {expected} symbols, got {}", symbols.len()),
		));
	}

	let mut base = Vec::with_capacity(scheme.base_len());
	for c in &symbols[..scheme.base_len()] {
		let digit = c.to_digit(10).ok_or_else(|| Error::malformed(LABEL, input, format!("unexpected character '{c}'")))?;
		base.push(digit as u8);
	}
	if let Some(expected) = scheme.check(&base) {
		let found = symbols[scheme.base_len()].to_ascii_uppercase();
		if found != expected {
			return Err(Error::malformed(LABEL, input, "check digit does not match"));
		}
	}
	Ok(scheme.assemble(base, issuer))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::dataset::STATE_CODES;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;
	use rstest::rstest;

	#[rstest]
	#[case("SP", RgScheme::SaoPaulo)]
	#[case("rj", RgScheme::RioDeJaneiro)]
	#[case("MG", RgScheme::MinasGerais)]
	#[case("BA", RgScheme::Generic)]
	#[case("AM", RgScheme::Generic)]
	fn schemes_by_state(#[case] state: &str, #[case] expected: RgScheme) {
		assert_eq!(RgScheme::for_state(state), expected);
	}

	#[rstest]
	#[case(&[1, 2, 3, 4, 5, 6, 7, 8], '2', '2')]
	#[case(&[3, 9, 8, 4, 1, 2, 5, 6], 'X', '0')]
	#[case(&[1, 0, 0, 0, 0, 0, 0, 0], '9', '9')]
	#[case(&[0, 0, 0, 0, 0, 0, 0, 5], 'X', '0')]
	fn check_symbols(#[case] base: &[u8], #[case] sao_paulo: char, #[case] rio: char) {
		assert_eq!(RgScheme::SaoPaulo.check(base), Some(sao_paulo));
		assert_eq!(RgScheme::RioDeJaneiro.check(base), Some(rio));
		assert_eq!(RgScheme::MinasGerais.check(base), None);
	}

	#[test]
	fn formats_each_scheme() {
		let base = [1, 2, 3, 4, 5, 6, 7, 8];
		assert_eq!(from_base(&base, "SP", true).unwrap().formatted(), "12.345.678-2/SP");
		assert_eq!(from_base(&base, "RJ", false).unwrap().formatted(), "12.345.678-2");
		assert_eq!(from_base(&base, "MG", false).unwrap().formatted(), "MG-12.345.678");
		assert_eq!(from_base(&base[..7], "BA", true).unwrap().formatted(), "1.234.567/BA");
		assert!(from_base(&base, "BA", false).is_err());
		assert!(from_base(&base, "XX", false).is_err());
	}

	#[rstest]
	#[case("39.841.256-X/SP", true)]
	#[case("39.841.256-x/sp", true)]
	#[case("39.841.256-0/RJ", true)]
	#[case("39.841.256-X/RJ", false)]
	#[case("39.841.256-X", true)]
	#[case("12.345.678-2/SP", true)]
	#[case("12.345.678-2/RJ", true)]
	#[case("12.345.678-3", false)]
	#[case("MG-12.345.678", true)]
	#[case("MG-12.345.678/MG", true)]
	#[case("1.234.567", true)]
	#[case("1.234.567/PE", true)]
	#[case("1.234.567/XX", false)]
	#[case("12.345.678", false)]
	#[case("12.345.678-2/MG", false)]
	fn validates(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(validate(input), expected, "{input}");
	}

	#[rstest]
	#[case("MG", "MG12345678")]
	#[case("SP", "123456782")]
	#[case("PE", "1234567")]
	fn unformatted_form_parses_back(#[case] state: &str, #[case] expected: &str) {
		let base = [1, 2, 3, 4, 5, 6, 7, 8];
		let len = RgScheme::for_state(state).base_len();
		let rg = from_base(&base[..len], state, true).unwrap();
		assert_eq!(rg.unformatted(), expected);
		assert_eq!(parse(&rg.unformatted()).unwrap().base_digits(), rg.base_digits());
	}

	#[test]
	fn suffix_must_match_requested_state() {
		assert!(validate_for_state("39.841.256-X/SP", "SP"));
		assert!(validate_for_state("39.841.256-X", "SP"));
		assert!(!validate_for_state("39.841.256-X/SP", "RJ"));
		assert!(matches!(parse_for_state("1.234.567", "ZZ"), Err(Error::MalformedInput { .. })));
	}

	#[test]
	fn issuer_is_kept_only_when_written() {
		assert_eq!(parse("39.841.256-X/SP").unwrap().issuer(), Some("SP"));
		assert_eq!(parse("39.841.256-X").unwrap().issuer(), None);
	}

	#[test]
	fn generated_rgs_validate_for_every_state() {
		let mut rng = ChaCha8Rng::seed_from_u64(99);
		for state in STATE_CODES {
			for _ in 0..100 {
				let with_issuer = generate(&mut rng, state, true);
				assert!(validate(with_issuer.formatted()), "{with_issuer}");
				assert!(with_issuer.formatted().ends_with(&format!("/{state}")));

				let bare = generate(&mut rng, state, false);
				assert!(validate_for_state(bare.formatted(), state), "{bare}");
				assert_eq!(bare.issuer(), None);
			}
		}
	}

	#[test]
	fn sao_paulo_issues_x_check_symbols() {
		let mut rng = ChaCha8Rng::seed_from_u64(1);
		let found = (0..2_000).any(|_| generate(&mut rng, "SP", false).check_digits() == "X");
		assert!(found);
	}
}
