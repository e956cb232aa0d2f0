pub mod answer;
pub mod context;
pub mod executor;
pub mod qdrant;
pub mod ranking;
pub mod retrieve;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

pub use answer::GroundedAnswer;
pub use context::{AssemblyError, ContextDocument, ContextEntry, ContextLimits};
pub use executor::{ExecutionLimits, RetrievedDocument, SearchHit, SiloRun, SiloSearch, SiloStatus};
use jurex_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use jurex_domain::{AliasTable, SiloRegistry};
use jurex_providers::{embedding, generation};
use jurex_storage::qdrant::QdrantStore;
pub use ranking::{RankedDocument, RankedResultSet, Tier, TierPolicy};
pub use retrieve::{RetrievalDiagnostics, RetrieveRequest, RetrieveResponse, SiloDiagnostics};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>>;
}

/// One similarity search against one silo.
///
/// Implementations must be safe to call concurrently for different silos.
pub trait SearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, search: &'a SiloSearch) -> BoxFuture<'a, Result<Vec<SearchHit>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { embedding, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider }
	}
}

pub struct JurexService {
	pub cfg: Config,
	pub silos: Arc<SiloRegistry>,
	pub aliases: Arc<AliasTable>,
	pub search: Arc<dyn SearchProvider>,
	pub providers: Providers,
}
impl JurexService {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Result<Self> {
		Self::with_providers(cfg, Arc::new(qdrant), Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		search: Arc<dyn SearchProvider>,
		providers: Providers,
	) -> Result<Self> {
		let silos = SiloRegistry::from_config(&cfg.silos)
			.map_err(|err| Error::InvalidConfig { message: err.to_string() })?;
		let aliases = AliasTable::with_extra(&cfg.jurisdiction.aliases)
			.map_err(|err| Error::InvalidConfig { message: err.to_string() })?;

		Ok(Self {
			cfg,
			silos: Arc::new(silos),
			aliases: Arc::new(aliases),
			search,
			providers,
		})
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(generation::generate(cfg, messages).await?) })
	}
}
