use rand::Rng;

/// Brazilian telephone area codes (DDD) in use.
pub const DDD_CODES: [u8; 67] = [
	11, 12, 13, 14, 15, 16, 17, 18, 19, // SP
	21, 22, 24, 27, 28, // RJ, ES
	31, 32, 33, 34, 35, 37, 38, // MG
	41, 42, 43, 44, 45, 46, 47, 48, 49, // PR, SC
	51, 53, 54, 55, // RS
	61, 62, 63, 64, 65, 66, 67, 68, 69, // DF, GO, TO, MT, MS, AC, RO
	71, 73, 74, 75, 77, 79, // BA, SE
	81, 82, 83, 84, 85, 86, 87, 88, 89, // PE, AL, PB, RN, CE, PI
	91, 92, 93, 94, 95, 96, 97, 98, 99, // PA, AM, RR, AP, MA
];

pub fn is_valid_ddd(ddd: u8) -> bool {
	DDD_CODES.contains(&ddd)
}

/// Generates a mobile number `(DD) 9NNNN-NNNN`.
///
/// Uses `ddd` when it is a valid area code, otherwise draws one uniformly.
/// The digit after the leading `9` is 6 to 9, as in issued mobile ranges.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, ddd: Option<u8>) -> String {
	let ddd = match ddd {
		Some(ddd) if is_valid_ddd(ddd) => ddd,
		_ => DDD_CODES[rng.random_range(0..DDD_CODES.len())],
	};
	let prefix: u32 = rng.random_range(6..=9) * 1_000 + rng.random_range(0..1_000);
	let line: u32 = rng.random_range(0..10_000);
	format!("({ddd:02}) 9{prefix:04}-{line:04}")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand_chacha::ChaCha8Rng;

	fn is_mobile(phone: &str) -> bool {
		let bytes = phone.as_bytes();
		phone.len() == 15
			&& bytes[0] == b'('
			&& bytes[3] == b')'
			&& bytes[4] == b' '
			&& bytes[5] == b'9'
			&& (b'6'..=b'9').contains(&bytes[6])
			&& bytes[10] == b'-'
			&& phone.chars().enumerate().all(|(i, c)| matches!(i, 0 | 3 | 4 | 10) || c.is_ascii_digit())
	}

	#[test]
	fn codes_are_unique_and_sorted() {
		assert!(DDD_CODES.windows(2).all(|pair| pair[0] < pair[1]));
		assert!(is_valid_ddd(11));
		assert!(!is_valid_ddd(20));
		assert!(!is_valid_ddd(52));
	}

	#[test]
	fn keeps_valid_area_code() {
		let mut rng = ChaCha8Rng::seed_from_u64(4);
		for _ in 0..200 {
			let phone = generate(&mut rng, Some(21));
			assert!(phone.starts_with("(21) 9"), "{phone}");
			assert!(is_mobile(&phone), "{phone}");
		}
	}

	#[test]
	fn draws_area_code_when_missing_or_invalid() {
		let mut rng = ChaCha8Rng::seed_from_u64(6);
		for ddd in [None, Some(10), Some(0)] {
			let phone = generate(&mut rng, ddd);
			assert!(is_mobile(&phone), "{phone}");
			assert!(is_valid_ddd(phone[1..3].parse().unwrap()));
		}
	}
}
