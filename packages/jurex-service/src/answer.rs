use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::{Error, JurexService, Result, context::ContextDocument};
use jurex_domain::citation::{self, CitationReport};

const DEFAULT_SYSTEM_PROMPT: &str = "Eres un asistente jurídico especializado en derecho mexicano. \
Responde únicamente con base en los documentos proporcionados. \
Cita cada afirmación con el formato [Doc ID: <uuid>] usando solo los identificadores listados. \
Si los documentos no contienen la respuesta, dilo explícitamente.";

#[derive(Clone, Debug, Serialize)]
pub struct GroundedAnswer {
	/// Model output with unverified citations flagged inline.
	pub text: String,
	pub raw_text: String,
	pub citations: CitationReport,
}

impl JurexService {
	/// Generates an answer from an assembled context and checks every citation against it.
	pub async fn ground_answer(
		&self,
		question: &str,
		context: &ContextDocument,
	) -> Result<GroundedAnswer> {
		let question = question.trim();

		if question.is_empty() {
			return Err(Error::InvalidRequest { message: "question must be non-empty.".to_string() });
		}

		let cfg = &self.cfg.providers.generation;
		let messages = build_messages(
			cfg.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT),
			question,
			context,
		);
		let raw_text = self.providers.generation.generate(cfg, &messages).await?;
		let available: HashMap<String, Option<String>> = context
			.entries
			.iter()
			.map(|entry| (entry.id.to_ascii_lowercase(), entry.reference.clone()))
			.collect();
		let citations = citation::validate_citations(&raw_text, &available);

		if citations.invalid > 0 {
			tracing::warn!(
				invalid = citations.invalid,
				total = citations.total,
				"Answer cites documents that were not in the context."
			);
		}

		let text = citation::annotate_invalid_citations(&raw_text, &citations.invalid_ids());

		Ok(GroundedAnswer { text, raw_text, citations })
	}
}

fn build_messages(system_prompt: &str, question: &str, context: &ContextDocument) -> Vec<Value> {
	let citable = citation::valid_doc_ids_prompt(
		context.entries.iter().map(|entry| (entry.id.as_str(), entry.reference.as_deref())),
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({
			"role": "system",
			"content": format!("{citable}\n\nCONTEXTO:\n{}", context.text),
		}),
		serde_json::json!({ "role": "user", "content": question }),
	]
}
