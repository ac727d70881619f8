pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_candidates.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_candidates.sql")),
				"tables/002_run_records.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_run_records.sql")),
				_ => {},
			}

			out.push('\n');

			continue;
		}

		out.push_str(line);
		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded() {
		let schema = render_schema();

		assert!(!schema.contains("\\ir "));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS candidates"));
		assert!(schema.contains("CREATE TABLE IF NOT EXISTS run_records"));
	}

	#[test]
	fn unknown_includes_are_dropped() {
		let out = expand_includes("\\ir tables/999_missing.sql\nSELECT 1;");

		assert_eq!(out, "\nSELECT 1;\n");
	}
}
