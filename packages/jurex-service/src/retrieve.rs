use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};

use crate::{
	Error, JurexService, Result,
	context::{self, ContextDocument, ContextLimits},
	executor::{self, ExecutionLimits, SiloRun, SiloSearch, SiloStatus},
	ranking::{self, TierPolicy},
};
use jurex_domain::{
	Estado, FilterError, FilterExpression, Jurisdiction, RetrievalQuery, SiloSpec, TypeHint,
	compile_filter, compile_jurisdiction_filter, expansion, rights,
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RetrieveRequest {
	pub query: String,
	/// Free-form state name or code; unrecognized values degrade to no jurisdiction.
	pub jurisdiction: Option<String>,
	pub type_hint: Option<TypeHint>,
	pub top_k: Option<u32>,
	pub merged_top_k: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RetrieveResponse {
	pub context: ContextDocument,
	pub diagnostics: RetrievalDiagnostics,
}

#[derive(Clone, Debug, Serialize)]
pub struct RetrievalDiagnostics {
	pub jurisdiction: Option<Estado>,
	pub jurisdiction_unrecognized: bool,
	pub human_rights: bool,
	pub expanded_query: String,
	pub silos: Vec<SiloDiagnostics>,
	pub errored_silos: Vec<String>,
	pub found: usize,
	pub duplicates_removed: usize,
	pub truncated: usize,
	pub included: usize,
	pub dropped: usize,
	pub primary_gap: bool,
	pub no_results: bool,
	pub elapsed_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SiloDiagnostics {
	pub silo: String,
	pub status: SiloStatus,
	pub filter: Option<FilterExpression>,
	/// Hint fields this silo does not expose; the hint was not applied here.
	pub unsupported_fields: Vec<String>,
	pub found: usize,
	pub included: usize,
	pub dropped: usize,
	pub elapsed_ms: Option<u64>,
}

struct PlannedSilo<'a> {
	silo: &'a SiloSpec,
	filter: Option<FilterExpression>,
	unsupported_fields: Vec<String>,
}

struct SiloPlan<'a> {
	planned: Vec<PlannedSilo<'a>>,
	skipped: Vec<(String, String)>,
}

impl JurexService {
	/// Searches every applicable silo concurrently and assembles one ranked, budgeted context.
	///
	/// Silo failures and timeouts are reported in the diagnostics; only malformed requests and
	/// filter composition errors fail the call.
	pub async fn retrieve(&self, req: RetrieveRequest) -> Result<RetrieveResponse> {
		let started = Instant::now();
		let deadline = started + Duration::from_millis(self.cfg.retrieval.request_timeout_ms);
		let jurisdiction = self.resolve_jurisdiction(req.jurisdiction.as_deref());
		let estado = jurisdiction.and_then(Jurisdiction::estado);
		let top_k = req.top_k.unwrap_or(self.cfg.retrieval.top_k);
		let merged_top_k = req.merged_top_k.unwrap_or(self.cfg.retrieval.merged_top_k);

		if merged_top_k == 0 {
			return Err(Error::InvalidRequest {
				message: "merged_top_k must be greater than zero.".to_string(),
			});
		}

		let query = RetrievalQuery::new(&req.query, estado, req.type_hint, top_k)?;
		let plan = self.plan_silos(&query)?;
		let human_rights = rights::is_human_rights_query(query.text());
		let expanded_query = if self.cfg.expansion.enabled {
			expansion::expand_legal_query(query.text(), self.cfg.expansion.max_synonyms as usize)
		} else {
			query.text().to_string()
		};
		let mut runs = self.run_silos(&query, &plan, &expanded_query, deadline).await;

		for (silo, reason) in &plan.skipped {
			runs.insert(silo.clone(), SiloRun::skipped(silo, reason.clone()));
		}

		let found_per_silo: BTreeMap<String, usize> =
			runs.iter().map(|(silo, run)| (silo.clone(), run.documents.len())).collect();
		let policy = TierPolicy { jurisdiction: estado, human_rights };
		let documents = runs.values_mut().flat_map(|run| std::mem::take(&mut run.documents));
		let ranked = ranking::merge(documents, &self.silos, &policy, merged_top_k as usize);
		let context = context::assemble(&ranked, &ContextLimits::from_config(&self.cfg.context))?;
		let silos = self.silo_diagnostics(&plan, runs, &found_per_silo, &context);
		let errored_silos: Vec<String> = silos
			.iter()
			.filter(|silo| silo.status.is_error())
			.map(|silo| silo.silo.clone())
			.collect();
		let diagnostics = RetrievalDiagnostics {
			jurisdiction: estado,
			jurisdiction_unrecognized: matches!(jurisdiction, Some(Jurisdiction::Unknown)),
			human_rights,
			expanded_query,
			errored_silos,
			found: found_per_silo.values().sum(),
			duplicates_removed: ranked.duplicates_removed,
			truncated: ranked.truncated,
			included: context.included,
			dropped: context.dropped,
			primary_gap: ranked.primary_gap,
			no_results: ranked.is_empty(),
			elapsed_ms: started.elapsed().as_millis() as u64,
			silos,
		};

		if diagnostics.primary_gap {
			tracing::warn!(
				jurisdiction = ?estado,
				"No jurisdiction-primary documents were found for this query."
			);
		}

		tracing::info!(
			included = diagnostics.included,
			dropped = diagnostics.dropped,
			errored = diagnostics.errored_silos.len(),
			no_results = diagnostics.no_results,
			elapsed_ms = diagnostics.elapsed_ms,
			"Retrieval finished."
		);

		Ok(RetrieveResponse { context, diagnostics })
	}

	fn resolve_jurisdiction(&self, raw: Option<&str>) -> Option<Jurisdiction> {
		let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
		let jurisdiction = self.aliases.normalize(raw);

		if jurisdiction == Jurisdiction::Unknown {
			tracing::warn!(jurisdiction = raw, "Unrecognized jurisdiction; searching without it.");
		}

		Some(jurisdiction)
	}

	// Compiles every filter before any provider call so composition errors cost nothing.
	fn plan_silos<'a>(&'a self, query: &RetrievalQuery) -> Result<SiloPlan<'a>> {
		let mut planned = Vec::with_capacity(self.silos.len());
		let mut skipped = Vec::new();

		for silo in self.silos.iter() {
			if silo.requires_jurisdiction && query.jurisdiction().is_none() {
				skipped.push((silo.id.clone(), "Silo requires a jurisdiction.".to_string()));

				continue;
			}

			match compile_filter(query, silo) {
				Ok(filter) => planned.push(PlannedSilo { silo, filter, unsupported_fields: Vec::new() }),
				Err(FilterError::UnsupportedField(err)) => {
					tracing::warn!(
						silo = %silo.id,
						field = %err.field,
						"Silo does not expose the hinted field; applying jurisdiction only."
					);

					planned.push(PlannedSilo {
						silo,
						filter: compile_jurisdiction_filter(query, silo),
						unsupported_fields: vec![err.field],
					});
				},
				Err(FilterError::Composition(err)) => return Err(err.into()),
			}
		}

		Ok(SiloPlan { planned, skipped })
	}

	async fn run_silos(
		&self,
		query: &RetrievalQuery,
		plan: &SiloPlan<'_>,
		expanded_query: &str,
		deadline: Instant,
	) -> BTreeMap<String, SiloRun> {
		if plan.planned.is_empty() {
			return BTreeMap::new();
		}

		let vector = match time::timeout_at(deadline, self.embed_query(expanded_query)).await {
			Ok(Ok(vector)) => vector,
			Ok(Err(err)) => {
				tracing::error!(error = %err, "Query embedding failed; no silo can be searched.");

				return fail_all(plan, &err.to_string());
			},
			Err(_) => {
				tracing::error!("Query embedding exceeded the request deadline.");

				return fail_all(plan, "Query embedding exceeded the request deadline.");
			},
		};
		let retrieval = &self.cfg.retrieval;
		let searches = plan
			.planned
			.iter()
			.map(|planned| SiloSearch {
				silo: planned.silo.id.clone(),
				text: expanded_query.to_string(),
				vector: vector.clone(),
				filter: planned.filter.clone(),
				top_k: query.top_k(),
				hybrid: planned.silo.hybrid,
				prefetch_limit: query.top_k().saturating_mul(retrieval.prefetch_multiplier),
				score_threshold: retrieval.score_threshold,
			})
			.collect();
		let limits = ExecutionLimits {
			silo_timeout: Duration::from_millis(retrieval.silo_timeout_ms),
			deadline,
		};

		executor::execute(self.search.clone(), searches, limits).await
	}

	async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [text.to_string()];
		let mut vectors = self.providers.embedding.embed(cfg, &texts).await?;
		let vector = vectors.pop().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}

	fn silo_diagnostics(
		&self,
		plan: &SiloPlan<'_>,
		runs: BTreeMap<String, SiloRun>,
		found_per_silo: &BTreeMap<String, usize>,
		context: &ContextDocument,
	) -> Vec<SiloDiagnostics> {
		let mut out = Vec::with_capacity(runs.len());

		for (silo, run) in runs {
			let planned = plan.planned.iter().find(|planned| planned.silo.id == silo);
			let found = found_per_silo.get(&silo).copied().unwrap_or(0);
			let included = context.entries.iter().filter(|entry| entry.silo == silo).count();

			out.push(SiloDiagnostics {
				filter: planned.and_then(|planned| planned.filter.clone()),
				unsupported_fields: planned
					.map(|planned| planned.unsupported_fields.clone())
					.unwrap_or_default(),
				status: run.status,
				found,
				included,
				dropped: found.saturating_sub(included),
				elapsed_ms: run.elapsed_ms,
				silo,
			});
		}

		// Registry order keeps the report stable and readable.
		out.sort_by_key(|diag| {
			self.silos.iter().position(|silo| silo.id == diag.silo).unwrap_or(usize::MAX)
		});

		out
	}
}

fn fail_all(plan: &SiloPlan<'_>, reason: &str) -> BTreeMap<String, SiloRun> {
	plan.planned
		.iter()
		.map(|planned| (planned.silo.id.clone(), SiloRun::failed(&planned.silo.id, reason)))
		.collect()
}
