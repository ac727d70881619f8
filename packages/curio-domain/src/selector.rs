use rand::Rng;

use crate::{categories::CategoryTable, work::Candidate};

/// Category base weight, multiplied by `full_text_boost` when the candidate carries full text.
pub fn candidate_weight(candidate: &Candidate, table: &CategoryTable, full_text_boost: f64) -> f64 {
	let base = table.weight(candidate.category.as_deref());

	if candidate.has_full_text() { base * full_text_boost } else { base }
}

/// Draws `k` candidates by category weight without replacement.
///
/// A pool no larger than `k` is returned unchanged without touching `rng`.
pub fn weighted_select<R>(
	pool: Vec<Candidate>,
	k: usize,
	table: &CategoryTable,
	full_text_boost: f64,
	rng: &mut R,
) -> Vec<Candidate>
where
	R: Rng + ?Sized,
{
	if pool.len() <= k {
		return pool;
	}

	let weights =
		pool.iter().map(|candidate| candidate_weight(candidate, table, full_text_boost)).collect();

	sample_without_replacement(pool, weights, k, rng)
}

/// Weighted sampling without replacement. Stops early once the remaining weight is zero.
pub fn sample_without_replacement<T, R>(
	items: Vec<T>,
	weights: Vec<f64>,
	k: usize,
	rng: &mut R,
) -> Vec<T>
where
	R: Rng + ?Sized,
{
	if items.len() <= k {
		return items;
	}

	let mut remaining: Vec<(T, f64)> = items
		.into_iter()
		.zip(weights.into_iter().chain(std::iter::repeat(0.0)))
		.map(|(item, weight)| (item, if weight.is_finite() && weight > 0.0 { weight } else { 0.0 }))
		.collect();
	let mut selected = Vec::with_capacity(k);

	for _ in 0..k {
		let total: f64 = remaining.iter().map(|(_, weight)| weight).sum();

		if total <= 0.0 {
			break;
		}

		let idx = draw_index(&remaining, total, rng);
		let (item, _) = remaining.remove(idx);

		selected.push(item);
	}

	selected
}

fn draw_index<T, R>(remaining: &[(T, f64)], total: f64, rng: &mut R) -> usize
where
	R: Rng + ?Sized,
{
	let target = rng.random::<f64>() * total;
	let mut cumulative = 0.0;
	let mut last_positive = 0;

	for (idx, (_, weight)) in remaining.iter().enumerate() {
		if *weight <= 0.0 {
			continue;
		}

		cumulative += weight;
		last_positive = idx;

		if target < cumulative {
			return idx;
		}
	}

	last_positive
}
