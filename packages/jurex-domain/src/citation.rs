use std::{
	collections::{BTreeSet, HashMap},
	sync::OnceLock,
};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const UNVERIFIED_MARKER: &str = "⚠️ *[Cita no verificada]*";

const MAX_PROMPT_DOCS: usize = 15;
const MAX_PROMPT_REF_CHARS: usize = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStatus {
	Valid,
	Invalid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitationCheck {
	pub doc_id: String,
	pub status: CitationStatus,
	pub source_ref: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitationReport {
	pub total: usize,
	pub valid: usize,
	pub invalid: usize,
	pub confidence: f32,
	pub citations: Vec<CitationCheck>,
}
impl CitationReport {
	pub fn invalid_ids(&self) -> BTreeSet<String> {
		self.citations
			.iter()
			.filter(|check| check.status == CitationStatus::Invalid)
			.map(|check| check.doc_id.clone())
			.collect()
	}
}

fn doc_id_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();

	PATTERN.get_or_init(|| {
		Regex::new(r"(?i)\[Doc ID:\s*([a-f0-9\-]{36})\]").expect("Doc ID pattern must compile.")
	})
}

/// Unique cited ids, lowercased, in order of first appearance.
pub fn extract_doc_ids(text: &str) -> Vec<String> {
	let mut seen = BTreeSet::new();
	let mut out = Vec::new();

	for caps in doc_id_pattern().captures_iter(text) {
		let id = caps[1].to_ascii_lowercase();

		if seen.insert(id.clone()) {
			out.push(id);
		}
	}

	out
}

/// Checks every cited id against the documents that were actually supplied as context.
///
/// `available` maps lowercase doc ids to their reference labels.
pub fn validate_citations(text: &str, available: &HashMap<String, Option<String>>) -> CitationReport {
	let citations: Vec<CitationCheck> = extract_doc_ids(text)
		.into_iter()
		.map(|doc_id| match available.get(&doc_id) {
			Some(source_ref) => CitationCheck {
				doc_id,
				status: CitationStatus::Valid,
				source_ref: source_ref.clone(),
			},
			None => CitationCheck { doc_id, status: CitationStatus::Invalid, source_ref: None },
		})
		.collect();
	let valid = citations.iter().filter(|check| check.status == CitationStatus::Valid).count();
	let total = citations.len();
	let confidence = if total == 0 { 1.0 } else { valid as f32 / total as f32 };

	CitationReport { total, valid, invalid: total - valid, confidence, citations }
}

/// Appends [`UNVERIFIED_MARKER`] after each citation whose id is in `invalid_ids`.
pub fn annotate_invalid_citations(text: &str, invalid_ids: &BTreeSet<String>) -> String {
	if invalid_ids.is_empty() {
		return text.to_string();
	}

	doc_id_pattern()
		.replace_all(text, |caps: &Captures<'_>| {
			let original = &caps[0];

			if invalid_ids.contains(&caps[1].to_ascii_lowercase()) {
				format!("{original} {UNVERIFIED_MARKER}")
			} else {
				original.to_string()
			}
		})
		.into_owned()
}

/// Lists citable ids for a regeneration prompt.
pub fn valid_doc_ids_prompt<'a, I>(docs: I) -> String
where
	I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
	let mut lines = Vec::new();

	for (doc_id, source_ref) in docs.into_iter().take(MAX_PROMPT_DOCS) {
		let label: String =
			source_ref.unwrap_or("Sin referencia").chars().take(MAX_PROMPT_REF_CHARS).collect();

		lines.push(format!("  - [Doc ID: {doc_id}] → {label}"));
	}

	if lines.is_empty() {
		return "No hay documentos disponibles para citar.".to_string();
	}

	lines.insert(0, "DOCUMENTOS DISPONIBLES PARA CITAR (usa SOLO estos Doc IDs):".to_string());

	lines.join("\n")
}
