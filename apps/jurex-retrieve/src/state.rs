use std::sync::Arc;

use jurex_service::JurexService;
use jurex_storage::qdrant::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<JurexService>,
}
impl AppState {
	pub fn new(config: jurex_config::Config) -> color_eyre::Result<Self> {
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = JurexService::new(config, qdrant)?;

		Ok(Self { service: Arc::new(service) })
	}
}
