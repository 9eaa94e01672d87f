use std::sync::Arc;

use beacon_service::BeaconService;
use beacon_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<BeaconService>,
}
impl AppState {
	pub async fn new(config: beacon_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(BeaconService::new(config, db)))
	}

	pub fn from_service(service: BeaconService) -> Self {
		Self { service: Arc::new(service) }
	}
}
