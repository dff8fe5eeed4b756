use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use rand::Rng;
use tracing::debug;

use crate::error::{Error, Result};

/// A pool of items drawn with probability proportional to their weight.
///
/// Draws use inverse-CDF sampling: a uniform value in `[0, total)` is mapped
/// through the cumulative weights with a binary search.
///
/// ## Invariants
/// - Every weight is finite and `>= 0`, and so is their sum
/// - `cumulative[i]` is the sum of `weights[0..=i]`
/// - Zero-weight items are kept for lookups but are never selected
#[derive(Clone, Debug)]
pub struct WeightedPool<T> {
	items: Vec<T>,
	weights: Vec<f64>,
	cumulative: Vec<f64>,
}

impl<T: Debug> WeightedPool<T> {
	/// Builds a pool from `(item, weight)` pairs.
	///
	/// # Errors
	/// Returns [`Error::InvalidWeight`] if a weight is negative or not finite,
	/// or if the weights overflow when summed.
	pub fn new<I>(entries: I) -> Result<Self>
	where
		I: IntoIterator<Item = (T, f64)>,
	{
		let mut items = Vec::new();
		let mut weights = Vec::new();
		for (item, weight) in entries {
			if !weight.is_finite() || weight < 0.0 {
				return Err(Error::InvalidWeight { item: format!("{item:?}"), weight });
			}
			items.push(item);
			weights.push(weight);
		}
		let cumulative = cumulate(weights.iter().copied());
		let total = cumulative.last().copied().unwrap_or(0.0);
		if !total.is_finite() {
			let item = items.last().map(|item| format!("{item:?}")).unwrap_or_default();
			return Err(Error::InvalidWeight { item, weight: total });
		}
		debug!(items = items.len(), "weighted pool built");
		Ok(Self { items, weights, cumulative })
	}
}

impl<T> WeightedPool<T> {
	/// Number of items in the pool, zero-weight ones included.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Sum of all weights.
	pub fn total_weight(&self) -> f64 {
		self.cumulative.last().copied().unwrap_or(0.0)
	}

	/// Iterates over `(item, weight)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
		self.items.iter().zip(self.weights.iter().copied())
	}

	/// Draws a single item.
	///
	/// # Errors
	/// Returns [`Error::EmptyPool`] if the pool has no positive weight.
	pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&T> {
		let index = pick(&self.cumulative, rng).ok_or(Error::EmptyPool)?;
		Ok(&self.items[index])
	}
}

impl<T: Clone> WeightedPool<T> {
	/// Returns a new pool holding the `n` highest-weight items.
	///
	/// Ties keep insertion order. If the pool holds fewer than `n` items the
	/// whole pool is returned.
	pub fn top(&self, n: usize) -> Self {
		let mut order: Vec<usize> = (0..self.items.len()).collect();
		order.sort_by(|a, b| self.weights[*b].total_cmp(&self.weights[*a]));
		order.truncate(n);

		let items: Vec<T> = order.iter().map(|i| self.items[*i].clone()).collect();
		let weights: Vec<f64> = order.iter().map(|i| self.weights[*i]).collect();
		let cumulative = cumulate(weights.iter().copied());
		Self { items, weights, cumulative }
	}
}

impl<T: Clone + Eq + Hash> WeightedPool<T> {
	/// Returns `true` if the pool holds `item`.
	pub fn contains(&self, item: &T) -> bool {
		self.items.contains(item)
	}

	/// Returns the weight of `item`, if present.
	pub fn weight_of(&self, item: &T) -> Option<f64> {
		self.items.iter().position(|i| i == item).map(|i| self.weights[i])
	}

	/// Draws `count` items.
	///
	/// Items in `exclude` and zero-weight items are removed before drawing.
	/// When `allow_repeats` is false, each drawn item is removed and the
	/// cumulative weights are rebuilt before the next draw.
	///
	/// # Errors
	/// - [`Error::EmptyPool`] if `count > 0` and nothing is selectable
	/// - [`Error::InvalidCount`] if more unique items are requested than available
	pub fn sample<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		count: usize,
		allow_repeats: bool,
		exclude: &HashSet<T>,
	) -> Result<Vec<T>> {
		if count == 0 {
			return Ok(Vec::new());
		}

		let mut effective: Vec<(usize, f64)> = self
			.iter()
			.enumerate()
			.filter(|(_, (item, weight))| *weight > 0.0 && !exclude.contains(*item))
			.map(|(index, (_, weight))| (index, weight))
			.collect();

		if effective.is_empty() {
			return Err(Error::EmptyPool);
		}
		if !allow_repeats && count > effective.len() {
			return Err(Error::InvalidCount { requested: count, available: effective.len() });
		}

		let mut drawn = Vec::with_capacity(count);
		if allow_repeats {
			let cumulative = cumulate(effective.iter().map(|(_, w)| *w));
			for _ in 0..count {
				let slot = pick(&cumulative, rng).ok_or(Error::EmptyPool)?;
				drawn.push(self.items[effective[slot].0].clone());
			}
		} else {
			for _ in 0..count {
				let cumulative = cumulate(effective.iter().map(|(_, w)| *w));
				let slot = pick(&cumulative, rng).ok_or(Error::EmptyPool)?;
				let (index, _) = effective.remove(slot);
				drawn.push(self.items[index].clone());
			}
		}

		Ok(drawn)
	}
}

/// Running sums of `weights`.
fn cumulate(weights: impl Iterator<Item = f64>) -> Vec<f64> {
	weights
		.scan(0.0, |acc, w| {
			*acc += w;
			Some(*acc)
		})
		.collect()
}

/// Maps a uniform draw through the cumulative weights.
///
/// Returns `None` if the total weight is zero.
fn pick<R: Rng + ?Sized>(cumulative: &[f64], rng: &mut R) -> Option<usize> {
	let total = *cumulative.last()?;
	if total <= 0.0 {
		return None;
	}
	let u = rng.random_range(0.0..total);
	// First slot whose running sum exceeds u; zero-weight slots share the
	// previous sum and so can never be the first to exceed it.
	let index = cumulative.partition_point(|c| *c <= u);
	Some(index.min(cumulative.len() - 1))
}
