//! PIS/PASEP/NIT: 10 base digits and 1 check digit, laid out as `###.#####.##-#`.

use rand::Rng;

use super::checksum::Mod11;
use super::{DocumentKind, DocumentNumber, NumericDocument};
use crate::error::Result;

pub const PIS: NumericDocument = NumericDocument {
	kind: DocumentKind::Pis,
	base_len: 10,
	checksum: Mod11::new(&[&[3, 2, 9, 8, 7, 6, 5, 4, 3, 2]]),
	layout: "###.#####.##-#",
	reject_repeated: false,
};

pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> DocumentNumber {
	PIS.generate(rng)
}

pub fn from_base(base: &[u8]) -> Result<DocumentNumber> {
	PIS.from_base(base)
}

pub fn parse(input: &str) -> Result<DocumentNumber> {
	PIS.parse(input)
}

pub fn validate(input: &str) -> bool {
	PIS.validate(input)
}
