//! CEI (Cadastro Específico do INSS): 11 base digits and 1 modulus-11 check
//! digit, laid out as `##.###.#####/##`.

use rand::Rng;

use super::checksum::Mod11;
use super::{DocumentKind, DocumentNumber, NumericDocument};
use crate::error::Result;

pub const CEI: NumericDocument = NumericDocument {
	kind: DocumentKind::Cei,
	base_len: 11,
	checksum: Mod11::new(&[&[7, 4, 1, 8, 5, 2, 1, 6, 3, 7, 4]]),
	layout: "##.###.#####/##",
	reject_repeated: false,
};

pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> DocumentNumber {
	CEI.generate(rng)
}

pub fn from_base(base: &[u8]) -> Result<DocumentNumber> {
	CEI.from_base(base)
}

pub fn parse(input: &str) -> Result<DocumentNumber> {
	CEI.parse(input)
}

pub fn validate(input: &str) -> bool {
	CEI.validate(input)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;
	use rstest::rstest;

	#[rstest]
	#[case(&[1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4], "11.222.33344/40")]
	#[case(&[5, 1, 0, 0, 4, 2, 1, 8, 7, 3, 9], "51.004.21873/98")]
	fn computes_known_check_digit(#[case] base: &[u8], #[case] expected: &str) {
		let cei = from_base(base).unwrap();
		assert_eq!(cei.formatted(), expected);
		assert_eq!(cei.check_digits().len(), 1);
	}

	#[rstest]
	#[case("11.222.33344/40", true)]
	#[case("112223334440", true)]
	#[case("11.222.33344/41", false)]
	#[case("11.222.3334/40", false)]
	fn validates(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(validate(input), expected);
	}

	#[test]
	fn generated_numbers_validate() {
		let mut rng = ChaCha8Rng::seed_from_u64(55);
		for _ in 0..1_000 {
			let cei = generate(&mut rng);
			assert!(validate(cei.formatted()));
			assert_eq!(cei.unformatted().len(), 12);
		}
	}

	#[test]
	fn most_single_digit_changes_are_detected() {
		let mut rng = ChaCha8Rng::seed_from_u64(89);
		let (mut detected, mut total) = (0u32, 0u32);
		for _ in 0..200 {
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
		// remainders 0 and 1 share check digit 0
		assert!(f64::from(detected) / f64::from(total) >= 0.95, "{detected}/{total}");
	}
}
