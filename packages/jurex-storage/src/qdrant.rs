pub const DENSE_VECTOR_NAME: &str = "dense";
pub const SPARSE_VECTOR_NAME: &str = "sparse";
pub const BM25_MODEL: &str = "qdrant/bm25";

use crate::Result;

/// Shared client for every silo collection; collections are addressed per query.
pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &jurex_config::Qdrant) -> Result<Self> {
		let mut builder = qdrant_client::Qdrant::from_url(&cfg.url);

		if let Some(api_key) = cfg.api_key.as_deref() {
			builder = builder.api_key(api_key);
		}

		let client = builder.build()?;

		Ok(Self { client, vector_dim: cfg.vector_dim })
	}
}
