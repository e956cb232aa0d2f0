mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, ContextBudget, EmbeddingProviderConfig, Expansion, Jurisdiction, LlmProviderConfig,
	Providers, Qdrant, Retrieval, Service, Silo, Storage,
};

use std::{collections::HashSet, fs, path::Path};

/// Smallest context budget; leaves room for the enclosing tags and the no-results text.
pub const MIN_CONTEXT_CHARS: u32 = 64;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("generation", &cfg.providers.generation.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if !cfg.providers.generation.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.generation.temperature must be a finite number.".to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.merged_top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.merged_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.silo_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.silo_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.request_timeout_ms < cfg.retrieval.silo_timeout_ms {
		return Err(Error::Validation {
			message: "retrieval.request_timeout_ms must be at least retrieval.silo_timeout_ms."
				.to_string(),
		});
	}
	if cfg.retrieval.prefetch_multiplier == 0 {
		return Err(Error::Validation {
			message: "retrieval.prefetch_multiplier must be greater than zero.".to_string(),
		});
	}

	if let Some(threshold) = cfg.retrieval.score_threshold
		&& !threshold.is_finite()
	{
		return Err(Error::Validation {
			message: "retrieval.score_threshold must be a finite number.".to_string(),
		});
	}

	if cfg.context.max_documents == 0 {
		return Err(Error::Validation {
			message: "context.max_documents must be greater than zero.".to_string(),
		});
	}
	if cfg.context.max_chars < MIN_CONTEXT_CHARS {
		return Err(Error::Validation {
			message: format!("context.max_chars must be at least {MIN_CONTEXT_CHARS}."),
		});
	}
	if cfg.context.max_doc_chars == Some(0) {
		return Err(Error::Validation {
			message: "context.max_doc_chars must be greater than zero.".to_string(),
		});
	}

	validate_silos(cfg)?;

	for (alias, code) in &cfg.jurisdiction.aliases {
		if alias.trim().is_empty() {
			return Err(Error::Validation {
				message: "jurisdiction.aliases keys must be non-empty.".to_string(),
			});
		}
		if code.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("jurisdiction.aliases.{alias} must name a jurisdiction code."),
			});
		}
	}

	Ok(())
}

fn validate_silos(cfg: &Config) -> Result<()> {
	if cfg.silos.is_empty() {
		return Err(Error::Validation {
			message: "silos must declare at least one silo.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for silo in &cfg.silos {
		if silo.id.trim().is_empty() {
			return Err(Error::Validation { message: "silos.id must be non-empty.".to_string() });
		}
		if !seen.insert(silo.id.as_str()) {
			return Err(Error::Validation {
				message: format!("silos.id '{}' is declared more than once.", silo.id),
			});
		}

		if let Some(field) = silo.jurisdiction_field.as_deref()
			&& !silo.fields.iter().any(|exposed| exposed == field)
		{
			return Err(Error::Validation {
				message: format!(
					"silos.{}.jurisdiction_field '{field}' must be listed in silos.{}.fields.",
					silo.id, silo.id
				),
			});
		}

		if silo.jurisdiction_field.is_none()
			&& (silo.jurisdiction_primary || silo.requires_jurisdiction)
		{
			return Err(Error::Validation {
				message: format!(
					"silos.{} must set jurisdiction_field to be jurisdiction_primary or requires_jurisdiction.",
					silo.id
				),
			});
		}
		if !silo.primary_jurisdictions.is_empty() && !silo.jurisdiction_primary {
			return Err(Error::Validation {
				message: format!(
					"silos.{}.primary_jurisdictions requires jurisdiction_primary = true.",
					silo.id
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.api_key = None;
	}
	if cfg
		.providers
		.generation
		.system_prompt
		.as_deref()
		.map(|prompt| prompt.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.generation.system_prompt = None;
	}

	for silo in &mut cfg.silos {
		silo.id = silo.id.trim().to_string();

		if silo.jurisdiction_field.as_deref().map(|field| field.trim().is_empty()).unwrap_or(false)
		{
			silo.jurisdiction_field = None;
		}
	}
}
