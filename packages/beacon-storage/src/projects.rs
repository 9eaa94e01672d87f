use crate::{Result, db::Db, models::Project};

pub async fn list_active_projects(db: &Db, company_id: &str) -> Result<Vec<Project>> {
	let rows = sqlx::query_as::<_, Project>(
		"\
SELECT project_id, company_id, name, client_name, client_is_internal, keywords
FROM projects
WHERE company_id = $1
	AND active
ORDER BY name, project_id",
	)
	.bind(company_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn insert_project(db: &Db, project: &Project) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO projects (project_id, company_id, name, client_name, client_is_internal, keywords)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(project.project_id)
	.bind(project.company_id.as_str())
	.bind(project.name.as_str())
	.bind(project.client_name.as_deref())
	.bind(project.client_is_internal)
	.bind(&project.keywords)
	.execute(&db.pool)
	.await?;

	Ok(())
}
