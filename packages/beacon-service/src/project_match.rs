use serde_json::{Value, json};

use crate::{
	BeaconService,
	estimate::{self, ModelFailure},
};
use beacon_domain::{
	entry::MatchedProject,
	estimate::{ProjectMatch, parse_project_match},
	prompt::{self, PromptInput, PromptKind},
	source::RawActivityItem,
};
use beacon_storage::models::Project;

/// A company's active projects as offered to the model.
pub(crate) struct ProjectCatalog {
	projects: Vec<Project>,
	ids: Vec<String>,
	json: String,
}
impl ProjectCatalog {
	pub(crate) fn new(projects: Vec<Project>) -> Self {
		let ids = projects.iter().map(|project| project.project_id.to_string()).collect();
		let json = Value::Array(
			projects
				.iter()
				.map(|project| {
					json!({
						"id": project.project_id.to_string(),
						"name": project.name,
						"client": project.client_name,
						"keywords": project.keywords,
					})
				})
				.collect(),
		)
		.to_string();

		Self { projects, ids, json }
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.projects.is_empty()
	}

	fn resolve(&self, project_id: &str) -> Option<MatchedProject> {
		self.projects.iter().find(|project| project.project_id.to_string() == project_id).map(
			|project| MatchedProject {
				project_id: project.project_id,
				name: project.name.clone(),
				client_name: project.client_name.clone(),
				client_is_internal: project.client_is_internal,
			},
		)
	}
}

pub(crate) async fn match_content(
	service: &BeaconService,
	catalog: &ProjectCatalog,
	context: &str,
	content: &str,
) -> Result<ProjectMatch, ModelFailure> {
	let template = prompt::template(PromptKind::ProjectMatch);
	let messages = prompt::render(
		template,
		&PromptInput { context, content, projects_json: Some(&catalog.json), ..Default::default() },
	);
	let known_ids: Vec<&str> = catalog.ids.iter().map(String::as_str).collect();

	estimate::ask(service, template.kind, &messages, |answer| {
		parse_project_match(answer, &known_ids)
	})
	.await
}

/// Project the model picked for `item`, or `None` when it picked none.
pub(crate) async fn match_item(
	service: &BeaconService,
	catalog: &ProjectCatalog,
	item: &RawActivityItem,
) -> Result<Option<MatchedProject>, ModelFailure> {
	let context = estimate::item_context(item);
	let answer = match_content(service, catalog, &context, &item.body).await?;

	Ok(answer.project_id.as_deref().and_then(|project_id| catalog.resolve(project_id)))
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use super::*;

	fn project(name: &str, internal: bool) -> Project {
		Project {
			project_id: Uuid::new_v4(),
			company_id: "c1".to_string(),
			name: name.to_string(),
			client_name: (!internal).then(|| "Acme".to_string()),
			client_is_internal: internal,
			keywords: vec!["launch".to_string()],
		}
	}

	#[test]
	fn catalog_offers_ids_names_clients_and_keywords() {
		let website = project("Website", false);
		let catalog = ProjectCatalog::new(vec![website.clone(), project("Ops", true)]);
		let offered: Value = serde_json::from_str(&catalog.json).expect("Catalog is JSON.");

		assert_eq!(offered[0]["id"], json!(website.project_id.to_string()));
		assert_eq!(offered[0]["client"], json!("Acme"));
		assert_eq!(offered[1]["client"], Value::Null);
		assert_eq!(offered[1]["keywords"], json!(["launch"]));
		assert_eq!(catalog.ids.len(), 2);
	}

	#[test]
	fn resolves_only_offered_projects() {
		let website = project("Website", false);
		let catalog = ProjectCatalog::new(vec![website.clone()]);
		let matched = catalog.resolve(&website.project_id.to_string()).expect("Known project.");

		assert_eq!(matched.name, "Website");
		assert!(!matched.client_is_internal);
		assert!(catalog.resolve(&Uuid::new_v4().to_string()).is_none());
	}
}
