//! Budgeted rendering of ranked documents into the `<documentos>` context block.

use std::borrow::Cow;

use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::ranking::{RankedDocument, RankedResultSet, Tier};

pub const CONTEXT_OPEN: &str = "<documentos>\n";
pub const CONTEXT_CLOSE: &str = "</documentos>";
pub const NO_RESULTS_TEXT: &str = "Sin resultados relevantes encontrados.";
pub const TRUNCATION_SUFFIX: &str = "... [truncado]";

const MISSING_REFERENCE: &str = "N/A";

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
	#[error("Document '{id}' from silo '{silo}' has a non-finite score.")]
	NonFiniteScore { silo: String, id: String },
	#[error("Document from silo '{silo}' has an empty id.")]
	EmptyId { silo: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextLimits {
	pub max_documents: usize,
	/// Counted in characters, including the enclosing tags.
	pub max_chars: usize,
	pub max_doc_chars: Option<usize>,
}
impl ContextLimits {
	pub fn from_config(cfg: &jurex_config::ContextBudget) -> Self {
		Self {
			max_documents: cfg.max_documents as usize,
			max_chars: cfg.max_chars as usize,
			max_doc_chars: cfg.max_doc_chars.map(|limit| limit as usize),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContextEntry {
	pub id: String,
	pub silo: String,
	pub reference: Option<String>,
	pub origen: Option<String>,
	pub tier: Tier,
	pub score: f32,
	pub clipped: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContextDocument {
	pub text: String,
	pub entries: Vec<ContextEntry>,
	pub included: usize,
	pub dropped: usize,
	pub chars: usize,
}
impl ContextDocument {
	/// True when no document was included, whether none was found or none fit the budget.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Renders the highest-ranked documents that fit `limits`, in rank order.
///
/// The no-results text is used only when `ranked` is empty. Stops at the first document that would overflow the budget so that no lower-ranked
/// document is ever included ahead of a higher-ranked one.
pub fn assemble(
	ranked: &RankedResultSet,
	limits: &ContextLimits,
) -> Result<ContextDocument, AssemblyError> {
	for doc in ranked.documents() {
		validate(doc)?;
	}

	let mut text = String::from(CONTEXT_OPEN);
	let mut chars = CONTEXT_OPEN.chars().count() + CONTEXT_CLOSE.chars().count();
	let mut entries = Vec::new();

	for doc in ranked.documents() {
		if entries.len() >= limits.max_documents {
			break;
		}

		let (element, clipped) = render(doc, limits.max_doc_chars);
		let len = element.chars().count();

		if chars + len > limits.max_chars {
			break;
		}

		chars += len;

		text.push_str(&element);
		entries.push(ContextEntry {
			id: doc.document.id.clone(),
			silo: doc.document.silo.clone(),
			reference: doc.document.reference.clone(),
			origen: doc.document.origen.clone(),
			tier: doc.tier,
			score: doc.document.score,
			clipped,
		});
	}

	// Documents that were found but did not fit still yield the empty wrapper.
	if ranked.is_empty() {
		text = NO_RESULTS_TEXT.to_string();
		chars = NO_RESULTS_TEXT.chars().count();
	} else {
		text.push_str(CONTEXT_CLOSE);
	}

	let included = entries.len();

	Ok(ContextDocument { text, entries, included, dropped: ranked.len() - included, chars })
}

/// The exact element emitted for `doc`, including its trailing newline.
pub fn render_entry(doc: &RankedDocument, max_doc_chars: Option<usize>) -> String {
	render(doc, max_doc_chars).0
}

fn render(doc: &RankedDocument, max_doc_chars: Option<usize>) -> (String, bool) {
	let document = &doc.document;
	let (body, clipped) = match max_doc_chars {
		Some(limit) => clip(&document.text, limit),
		None => (Cow::Borrowed(document.text.as_str()), false),
	};
	let element = format!(
		"<documento id=\"{}\" ref=\"{}\" origen=\"{}\" silo=\"{}\" tier=\"{}\" score=\"{:.4}\">\n{}\n</documento>\n",
		escape_xml(&document.id),
		escape_xml(document.reference.as_deref().unwrap_or(MISSING_REFERENCE)),
		escape_xml(document.origen.as_deref().unwrap_or_default()),
		escape_xml(&document.silo),
		doc.tier.as_str(),
		document.score,
		escape_xml(&body),
	);

	(element, clipped)
}

fn validate(doc: &RankedDocument) -> Result<(), AssemblyError> {
	let document = &doc.document;

	if document.id.trim().is_empty() {
		return Err(AssemblyError::EmptyId { silo: document.silo.clone() });
	}
	if !document.score.is_finite() {
		return Err(AssemblyError::NonFiniteScore {
			silo: document.silo.clone(),
			id: document.id.clone(),
		});
	}

	Ok(())
}

// Cuts on a grapheme boundary so accented characters and emoji stay intact.
fn clip(text: &str, limit: usize) -> (Cow<'_, str>, bool) {
	match text.grapheme_indices(true).nth(limit) {
		Some((cut, _)) => (Cow::Owned(format!("{}{TRUNCATION_SUFFIX}", &text[..cut])), true),
		None => (Cow::Borrowed(text), false),
	}
}

fn escape_xml(raw: &str) -> Cow<'_, str> {
	if !raw.contains(['&', '<', '>', '"', '\'']) {
		return Cow::Borrowed(raw);
	}

	let mut out = String::with_capacity(raw.len() + 16);

	for ch in raw.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&apos;"),
			other => out.push(other),
		}
	}

	Cow::Owned(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn smallest_budget_fits_wrapper_and_no_results_text() {
		let min = jurex_config::MIN_CONTEXT_CHARS as usize;

		assert!(CONTEXT_OPEN.chars().count() + CONTEXT_CLOSE.chars().count() <= min);
		assert!(NO_RESULTS_TEXT.chars().count() <= min);
	}

	#[test]
	fn escapes_markup_characters() {
		assert_eq!(escape_xml("Art. 5 <bis> & \"ter\""), "Art. 5 &lt;bis&gt; &amp; &quot;ter&quot;");
		assert!(matches!(escape_xml("sin cambios"), Cow::Borrowed(_)));
	}

	#[test]
	fn clips_on_grapheme_boundaries() {
		let (clipped, was_clipped) = clip("Año y méxico", 3);

		assert!(was_clipped);
		assert_eq!(clipped, format!("Año{TRUNCATION_SUFFIX}"));

		let (whole, was_clipped) = clip("corto", 10);

		assert!(!was_clipped);
		assert_eq!(whole, "corto");
	}

	#[test]
	fn clip_keeps_combining_sequences_whole() {
		// "e" followed by a combining acute accent is one grapheme.
		let text = "re\u{301}gimen";
		let (clipped, _) = clip(text, 2);

		assert_eq!(clipped, format!("re\u{301}{TRUNCATION_SUFFIX}"));
	}
}
