use std::collections::HashMap;

use curio_config::{CategoryConfig, Config};

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
	pub slug: String,
	pub display_name: String,
	pub field_ids: Vec<u32>,
	pub weight: f64,
	pub active: bool,
}
impl Category {
	/// Field ids joined as an OR filter, e.g. `28|32`.
	pub fn filter_value(&self) -> String {
		self.field_ids.iter().map(u32::to_string).collect::<Vec<_>>().join("|")
	}
}

/// Read-only category lookup built once at startup.
#[derive(Clone, Debug)]
pub struct CategoryTable {
	categories: Vec<Category>,
	by_slug: HashMap<String, usize>,
	default_weight: f64,
}
impl CategoryTable {
	pub fn from_config(cfg: &Config) -> Self {
		Self::new(&cfg.categories, cfg.selection.default_weight)
	}

	pub fn new(categories: &[CategoryConfig], default_weight: f64) -> Self {
		let categories: Vec<Category> = categories
			.iter()
			.map(|category| Category {
				slug: category.slug.clone(),
				display_name: category.display_name.clone(),
				field_ids: category.field_ids.clone(),
				weight: category.weight.unwrap_or(default_weight),
				active: category.active,
			})
			.collect();
		let by_slug = categories
			.iter()
			.enumerate()
			.map(|(idx, category)| (category.slug.clone(), idx))
			.collect();

		Self { categories, by_slug, default_weight }
	}

	pub fn get(&self, slug: &str) -> Option<&Category> {
		self.by_slug.get(slug).map(|idx| &self.categories[*idx])
	}

	/// Base sampling weight. Missing or unknown categories get the default weight.
	pub fn weight(&self, slug: Option<&str>) -> f64 {
		slug.and_then(|slug| self.get(slug)).map_or(self.default_weight, |category| category.weight)
	}

	pub fn list_active(&self) -> Vec<&Category> {
		let mut active: Vec<&Category> =
			self.categories.iter().filter(|category| category.active).collect();

		active.sort_by(|a, b| a.display_name.cmp(&b.display_name));

		active
	}

	pub fn len(&self) -> usize {
		self.categories.len()
	}

	pub fn is_empty(&self) -> bool {
		self.categories.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table() -> CategoryTable {
		CategoryTable::new(&curio_config::default_categories(), 0.05)
	}

	#[test]
	fn builtin_weights_and_default() {
		let table = table();

		assert_eq!(table.len(), 12);
		assert_eq!(table.weight(Some("ai_tech")), 0.15);
		assert_eq!(table.weight(Some("business")), 0.05);
		assert_eq!(table.weight(Some("unknown")), 0.05);
		assert_eq!(table.weight(None), 0.05);
	}

	#[test]
	fn filter_value_joins_field_ids() {
		let table = table();
		let brain = table.get("brain_mind").expect("brain_mind must exist.");

		assert_eq!(brain.filter_value(), "28|32");
		assert_eq!(table.get("physics").expect("physics must exist.").filter_value(), "31");
	}

	#[test]
	fn active_categories_sort_by_display_name() {
		let mut configs = curio_config::default_categories();

		configs[0].active = false;

		let table = CategoryTable::new(&configs, 0.05);
		let names: Vec<&str> =
			table.list_active().iter().map(|category| category.display_name.as_str()).collect();

		assert_eq!(names.len(), 11);
		assert_eq!(names.first(), Some(&"Arts & Culture"));
		assert!(!names.contains(&"AI & Technology"));

		let mut sorted = names.clone();

		sorted.sort();

		assert_eq!(names, sorted);
	}
}
