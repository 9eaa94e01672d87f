pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_time_entries.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_time_entries.sql")),
				"tables/002_import_jobs.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_import_jobs.sql")),
				"tables/003_user_preferences.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_user_preferences.sql")),
				"tables/004_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_projects.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expands_every_table_include() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));

		for table in ["time_entries", "import_jobs", "user_preferences", "projects"] {
			assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")), "{table}");
		}
	}

	#[test]
	fn keys_entries_on_source_item() {
		assert!(render_schema().contains("ON time_entries (user_id, source, external_item_id)"));
	}
}
