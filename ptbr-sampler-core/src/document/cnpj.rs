//! CNPJ (Cadastro Nacional da Pessoa Jurídica): 8 root digits, a 4-digit
//! branch number and 2 check digits, laid out as `##.###.###/####-##`.

use rand::Rng;

use super::checksum::Mod11;
use super::{DocumentKind, DocumentNumber, NumericDocument};
use crate::error::Result;

/// Branch number of a company's head office.
pub const HEAD_OFFICE: [u8; 4] = [0, 0, 0, 1];

pub const CNPJ: NumericDocument = NumericDocument {
	kind: DocumentKind::Cnpj,
	base_len: 12,
	checksum: Mod11::new(&[
		&[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2],
		&[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2],
	]),
	layout: "##.###.###/####-##",
	reject_repeated: true,
};

/// Generates a head-office CNPJ (branch `0001`) with a random root.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> DocumentNumber {
	loop {
		let mut base: Vec<u8> = (0..8).map(|_| rng.random_range(0..10)).collect();
		if base.windows(2).all(|pair| pair[0] == pair[1]) {
			continue;
		}
		base.extend_from_slice(&HEAD_OFFICE);
		if let Ok(cnpj) = CNPJ.from_base(&base) {
			return cnpj;
		}
	}
}

pub fn from_base(base: &[u8]) -> Result<DocumentNumber> {
	CNPJ.from_base(base)
}

pub fn parse(input: &str) -> Result<DocumentNumber> {
	CNPJ.parse(input)
}

pub fn validate(input: &str) -> bool {
	CNPJ.validate(input)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;
	use rstest::rstest;

	#[rstest]
	#[case(&[1, 1, 2, 2, 2, 3, 3, 3, 0, 0, 0, 1], "11.222.333/0001-81")]
	#[case(&[4, 5, 7, 2, 3, 1, 7, 4, 0, 0, 0, 1], "45.723.174/0001-10")]
	fn computes_known_check_digits(#[case] base: &[u8], #[case] expected: &str) {
		assert_eq!(from_base(base).unwrap().formatted(), expected);
	}

	#[rstest]
	#[case("11.222.333/0001-81", true)]
	#[case("11222333000181", true)]
	#[case("11.222.333/0001-82", false)]
	#[case("11.111.111/1111-11", false)]
	#[case("11.222.333/0001", false)]
	fn validates(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(validate(input), expected);
	}

	#[test]
	fn generated_numbers_are_head_offices() {
		let mut rng = ChaCha8Rng::seed_from_u64(3);
		for _ in 0..1_000 {
			let cnpj = generate(&mut rng);
			assert_eq!(&cnpj.base_digits()[8..], &HEAD_OFFICE);
			assert!(validate(cnpj.formatted()));
			assert_eq!(cnpj.formatted().len(), 18);
		}
	}

	#[test]
	fn single_digit_changes_are_detected() {
		let mut rng = ChaCha8Rng::seed_from_u64(8);
		let (mut detected, mut total) = (0u32, 0u32);
		for _ in 0..100 {
			let raw = generate(&mut rng).unformatted();
			for (position, original) in raw.char_indices() {
				for replacement in '0'..='9' {
					if replacement == original {
						continue;
					}
					let mut changed = raw.clone();
					changed.replace_range(position..position + 1, &replacement.to_string());
					total += 1;
					if !validate(&changed) {
						detected += 1;
					}
				}
			}
		}
		assert!(f64::from(detected) / f64::from(total) >= 0.99, "{detected}/{total}");
	}
}
