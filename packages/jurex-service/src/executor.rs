//! Concurrent per-silo search with per-silo and per-request time limits.

use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
	time::Duration,
};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::{
	task::JoinSet,
	time::{self, Instant},
};

use crate::{Result, SearchProvider};
use jurex_domain::FilterExpression;

const TEXT_FIELDS: [&str; 2] = ["texto", "text"];
const REFERENCE_FIELD: &str = "ref";
const ORIGIN_FIELD: &str = "origen";

#[derive(Clone, Debug, PartialEq)]
pub struct SiloSearch {
	pub silo: String,
	/// Lexical query text, used by the sparse prefetch of hybrid silos.
	pub text: String,
	pub vector: Vec<f32>,
	pub filter: Option<FilterExpression>,
	pub top_k: u32,
	pub hybrid: bool,
	pub prefetch_limit: u32,
	pub score_threshold: Option<f32>,
}

/// One raw point returned by a search provider.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
	pub id: String,
	pub score: f32,
	pub payload: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievedDocument {
	pub silo: String,
	pub id: String,
	pub score: f32,
	pub reference: Option<String>,
	pub origen: Option<String>,
	pub text: String,
	pub payload: Map<String, Value>,
}
impl RetrievedDocument {
	pub fn from_hit(silo: &str, hit: SearchHit) -> Self {
		let text = TEXT_FIELDS
			.iter()
			.find_map(|field| payload_str(&hit.payload, field))
			.unwrap_or_default()
			.to_string();
		let reference = payload_str(&hit.payload, REFERENCE_FIELD).map(str::to_string);
		let origen = payload_str(&hit.payload, ORIGIN_FIELD).map(str::to_string);

		Self {
			silo: silo.to_string(),
			id: hit.id,
			score: hit.score,
			reference,
			origen,
			text,
			payload: hit.payload,
		}
	}

	/// Cross-silo identity of the underlying legal text; falls back to the point id.
	pub fn dedup_key(&self) -> &str {
		self.reference.as_deref().unwrap_or(&self.id)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SiloStatus {
	Ok,
	Failed { reason: String },
	TimedOut,
	Skipped { reason: String },
}
impl SiloStatus {
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Failed { .. } | Self::TimedOut)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SiloRun {
	pub silo: String,
	pub status: SiloStatus,
	#[serde(skip)]
	pub documents: Vec<RetrievedDocument>,
	pub elapsed_ms: Option<u64>,
}
impl SiloRun {
	pub fn failed(silo: &str, reason: impl Into<String>) -> Self {
		Self::without_documents(silo, SiloStatus::Failed { reason: reason.into() })
	}

	pub fn skipped(silo: &str, reason: impl Into<String>) -> Self {
		Self::without_documents(silo, SiloStatus::Skipped { reason: reason.into() })
	}

	pub fn timed_out(silo: &str) -> Self {
		Self::without_documents(silo, SiloStatus::TimedOut)
	}

	fn without_documents(silo: &str, status: SiloStatus) -> Self {
		Self { silo: silo.to_string(), status, documents: Vec::new(), elapsed_ms: None }
	}
}

#[derive(Clone, Copy, Debug)]
pub struct ExecutionLimits {
	pub silo_timeout: Duration,
	/// Nothing is awaited past this instant; unfinished silos are reported as timed out.
	pub deadline: Instant,
}

/// Runs every search concurrently and returns one run per silo, keyed by silo id.
///
/// A failing, panicking, or slow silo never affects the others.
pub async fn execute(
	provider: Arc<dyn SearchProvider>,
	searches: Vec<SiloSearch>,
	limits: ExecutionLimits,
) -> BTreeMap<String, SiloRun> {
	let mut pending: BTreeSet<String> = searches.iter().map(|search| search.silo.clone()).collect();
	let mut runs = BTreeMap::new();
	let mut set = JoinSet::new();

	for search in searches {
		let provider = Arc::clone(&provider);
		let silo_timeout = limits.silo_timeout;

		set.spawn(async move {
			let started = Instant::now();
			let outcome = time::timeout(silo_timeout, provider.search(&search)).await;
			let elapsed = started.elapsed();

			(search, outcome, elapsed)
		});
	}

	let mut deadline_hit = false;

	loop {
		let next = time::timeout_at(limits.deadline, set.join_next()).await;

		match next {
			Ok(Some(Ok((search, outcome, elapsed)))) => {
				pending.remove(&search.silo);

				let run = match outcome {
					Ok(result) => finish_run(&search, result),
					Err(_) => {
						tracing::warn!(silo = %search.silo, "Silo search timed out.");

						SiloRun::timed_out(&search.silo)
					},
				};

				runs.insert(
					search.silo.clone(),
					SiloRun { elapsed_ms: Some(elapsed.as_millis() as u64), ..run },
				);
			},
			Ok(Some(Err(err))) => {
				tracing::error!(error = %err, "Silo search task did not complete.");
			},
			Ok(None) => break,
			Err(_) => {
				deadline_hit = true;

				set.abort_all();

				break;
			},
		}
	}

	for silo in pending {
		let run = if deadline_hit {
			tracing::warn!(silo = %silo, "Request deadline reached before the silo answered.");

			SiloRun::timed_out(&silo)
		} else {
			SiloRun::failed(&silo, "Search task aborted.")
		};

		runs.insert(silo, run);
	}

	runs
}

fn finish_run(search: &SiloSearch, result: Result<Vec<SearchHit>>) -> SiloRun {
	let hits = match result {
		Ok(hits) => hits,
		Err(err) => {
			tracing::warn!(silo = %search.silo, error = %err, "Silo search failed.");

			return SiloRun::failed(&search.silo, err.to_string());
		},
	};
	let mut documents = Vec::with_capacity(hits.len());

	for hit in hits {
		if !hit.score.is_finite() || hit.id.trim().is_empty() {
			tracing::warn!(silo = %search.silo, id = %hit.id, "Dropping malformed search hit.");

			continue;
		}

		documents.push(RetrievedDocument::from_hit(&search.silo, hit));
	}

	documents.sort_by(|a, b| b.score.total_cmp(&a.score));
	documents.truncate(search.top_k as usize);

	SiloRun { silo: search.silo.clone(), status: SiloStatus::Ok, documents, elapsed_ms: None }
}

fn payload_str<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
	payload.get(key).and_then(Value::as_str).filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_reads_text_reference_and_origin_from_payload() {
		let payload = serde_json::json!({
			"text": "Artículo 2448. Los contratos de arrendamiento...",
			"ref": "Código Civil CDMX, Art. 2448",
			"origen": "CCDMX",
			"entidad": "CIUDAD_DE_MEXICO",
		});
		let Value::Object(payload) = payload else { unreachable!() };
		let doc = RetrievedDocument::from_hit(
			"leyes_estatales",
			SearchHit { id: "a".to_string(), score: 0.5, payload },
		);

		assert_eq!(doc.text, "Artículo 2448. Los contratos de arrendamiento...");
		assert_eq!(doc.reference.as_deref(), Some("Código Civil CDMX, Art. 2448"));
		assert_eq!(doc.origen.as_deref(), Some("CCDMX"));
		assert_eq!(doc.dedup_key(), "Código Civil CDMX, Art. 2448");
	}

	#[test]
	fn dedup_key_falls_back_to_point_id() {
		let doc = RetrievedDocument::from_hit(
			"leyes_federales",
			SearchHit { id: "point-1".to_string(), score: 0.5, payload: Map::new() },
		);

		assert_eq!(doc.dedup_key(), "point-1");
		assert!(doc.text.is_empty());
	}
}
