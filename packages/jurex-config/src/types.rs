use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub retrieval: Retrieval,
	pub context: ContextBudget,
	#[serde(default)]
	pub expansion: Expansion,
	#[serde(default)]
	pub jurisdiction: Jurisdiction,
	pub silos: Vec<Silo>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub api_key: Option<String>,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub generation: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	/// Optional. Replaces the built-in grounding system prompt.
	pub system_prompt: Option<String>,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	/// Results requested from each silo.
	pub top_k: u32,
	/// Size of the merged, cross-silo result set.
	pub merged_top_k: u32,
	pub silo_timeout_ms: u64,
	pub request_timeout_ms: u64,
	#[serde(default = "default_prefetch_multiplier")]
	pub prefetch_multiplier: u32,
	/// Optional. Points scoring below this are not returned by the search provider.
	#[serde(default = "default_score_threshold")]
	pub score_threshold: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ContextBudget {
	pub max_documents: u32,
	pub max_chars: u32,
	/// Optional. Longer document texts are clipped before rendering.
	pub max_doc_chars: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Expansion {
	pub enabled: bool,
	pub max_synonyms: u32,
}
impl Default for Expansion {
	fn default() -> Self {
		Self { enabled: true, max_synonyms: 6 }
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Jurisdiction {
	/// Extra aliases, mapping free-form names to canonical codes, e.g. "EDO_MEX" = "MEXICO".
	pub aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Silo {
	pub id: String,
	pub label: String,
	/// Lower ranks win ties and deduplication between silos of the same tier.
	pub priority: u32,
	#[serde(default)]
	pub fields: Vec<String>,
	pub jurisdiction_field: Option<String>,
	#[serde(default)]
	pub jurisdiction_primary: bool,
	/// Optional. Restricts jurisdiction-primary status to these codes; empty means every code.
	#[serde(default)]
	pub primary_jurisdictions: Vec<String>,
	#[serde(default)]
	pub rights_primary: bool,
	#[serde(default)]
	pub hybrid: bool,
	#[serde(default)]
	pub requires_jurisdiction: bool,
}

fn default_prefetch_multiplier() -> u32 {
	3
}

fn default_score_threshold() -> Option<f32> {
	Some(0.1)
}
