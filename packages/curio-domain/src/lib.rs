pub mod categories;
pub mod quality;
pub mod scoring;
pub mod selector;
pub mod work;

/// Rounds to two decimal places, the precision every persisted score uses.
pub fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}
