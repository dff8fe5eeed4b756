/// Weighted modulus-11 check digits.
///
/// Each pass weighs every digit computed so far (base digits plus the check
/// digits of earlier passes) and appends one check digit: with `r` the
/// weighted sum modulo 11, the digit is `0` when `r < 2` and `11 - r`
/// otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mod11 {
	passes: &'static [&'static [u32]],
}

impl Mod11 {
	/// `passes[i]` must hold one weight per digit present at pass `i`.
	pub const fn new(passes: &'static [&'static [u32]]) -> Self {
		Self { passes }
	}

	/// Number of check digits.
	pub fn check_len(&self) -> usize {
		self.passes.len()
	}

	/// Computes all check digits of `base`.
	pub fn compute(&self, base: &[u8]) -> Vec<u8> {
		let mut digits = base.to_vec();
		let mut check = Vec::with_capacity(self.passes.len());
		for weights in self.passes {
			debug_assert_eq!(weights.len(), digits.len());
			let digit = check_digit(&digits, weights);
			digits.push(digit);
			check.push(digit);
		}
		check
	}
}

/// One modulus-11 check digit of `digits` under `weights`.
pub fn check_digit(digits: &[u8], weights: &[u32]) -> u8 {
	let remainder = weighted_sum(digits, weights) % 11;
	if remainder < 2 { 0 } else { (11 - remainder) as u8 }
}

/// Sum of `digits[i] * weights[i]`.
pub fn weighted_sum(digits: &[u8], weights: &[u32]) -> u32 {
	digits.iter().zip(weights).map(|(d, w)| u32::from(*d) * w).sum()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn small_remainders_map_to_zero() {
		// 1 * 11 = 11 -> r = 0
		assert_eq!(check_digit(&[1], &[11]), 0);
		// 1 * 12 = 12 -> r = 1
		assert_eq!(check_digit(&[1], &[12]), 0);
		// 1 * 2 = 2 -> r = 2 -> 9
		assert_eq!(check_digit(&[1], &[2]), 9);
	}

	#[test]
	fn passes_feed_previous_check_digits() {
		const TWO_PASS: Mod11 = Mod11::new(&[&[2], &[3, 2]]);
		// first: 5 * 2 = 10 -> 1; second: 5 * 3 + 1 * 2 = 17 -> r = 6 -> 5
		assert_eq!(TWO_PASS.compute(&[5]), vec![1, 5]);
		assert_eq!(TWO_PASS.check_len(), 2);
	}
}
