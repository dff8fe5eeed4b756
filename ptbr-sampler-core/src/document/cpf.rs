//! CPF (Cadastro de Pessoas Físicas): 9 base digits and 2 check digits,
//! laid out as `###.###.###-##`. Numbers made of one repeated digit are
//! never issued and are rejected.

use rand::Rng;

use super::checksum::Mod11;
use super::{DocumentKind, DocumentNumber, NumericDocument};
use crate::error::Result;

pub const CPF: NumericDocument = NumericDocument {
	kind: DocumentKind::Cpf,
	base_len: 9,
	checksum: Mod11::new(&[&[10, 9, 8, 7, 6, 5, 4, 3, 2], &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]]),
	layout: "###.###.###-##",
	reject_repeated: true,
};

pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> DocumentNumber {
	CPF.generate(rng)
}

pub fn from_base(base: &[u8]) -> Result<DocumentNumber> {
	CPF.from_base(base)
}

pub fn parse(input: &str) -> Result<DocumentNumber> {
	CPF.parse(input)
}

pub fn validate(input: &str) -> bool {
	CPF.validate(input)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;
	use rstest::rstest;

	#[rstest]
	#[case(&[5, 2, 9, 9, 8, 2, 2, 4, 7], "529.982.247-25")]
	#[case(&[1, 2, 3, 4, 5, 6, 7, 8, 9], "123.456.789-09")]
	fn computes_known_check_digits(#[case] base: &[u8], #[case] expected: &str) {
		let cpf = from_base(base).unwrap();
		assert_eq!(cpf.formatted(), expected);
		assert!(validate(expected));
	}

	#[rstest]
	#[case("529.982.247-25")]
	#[case("52998224725")]
	#[case(" 529 982 247 25 ")]
	fn accepts_any_separator_style(#[case] input: &str) {
		assert_eq!(parse(input).unwrap().check_digits(), "25");
	}

	#[rstest]
	#[case("529.982.247-26")]
	#[case("111.111.111-11")]
	#[case("000.000.000-00")]
	#[case("529.982.247-2")]
	#[case("529.982.247-2a")]
	fn rejects_invalid(#[case] input: &str) {
		assert!(!validate(input));
		assert!(matches!(parse(input), Err(Error::MalformedInput { kind: "CPF", .. })));
	}

	#[test]
	fn wrong_base_length_is_malformed() {
		assert!(matches!(from_base(&[1, 2, 3]), Err(Error::MalformedInput { .. })));
		assert!(matches!(from_base(&[1, 2, 3, 4, 5, 6, 7, 8, 10]), Err(Error::MalformedInput { .. })));
	}

	#[test]
	fn generated_numbers_are_valid_and_never_repeated() {
		let mut rng = ChaCha8Rng::seed_from_u64(11);
		for _ in 0..2_000 {
			let cpf = generate(&mut rng);
			assert!(validate(cpf.formatted()));
			let raw = cpf.unformatted();
			assert_eq!(raw.len(), 11);
			assert!(raw.chars().any(|c| c != raw.chars().next().unwrap()));
		}
	}

	#[test]
	fn single_digit_changes_are_detected() {
		let mut rng = ChaCha8Rng::seed_from_u64(5);
		let mut detected = 0;
		let mut total = 0;
		for _ in 0..200 {
			let raw: Vec<u8> = generate(&mut rng).unformatted().bytes().map(|b| b - b'0').collect();
			for position in 0..raw.len() {
				for replacement in 0..10u8 {
					if replacement == raw[position] {
						continue;
					}
					let mut changed = raw.clone();
					changed[position] = replacement;
					let input: String = changed.iter().map(|d| char::from(b'0' + d)).collect();
					total += 1;
					if !validate(&input) {
						detected += 1;
					}
				}
			}
		}
		assert!(detected as f64 / total as f64 >= 0.99, "{detected}/{total}");
	}
}
