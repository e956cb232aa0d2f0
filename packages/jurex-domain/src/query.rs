use serde::{Deserialize, Serialize};

use crate::jurisdiction::Estado;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintIntent {
	/// Exclude every document that does not match.
	Exclusive,
	/// Favor matching documents; only valid on silos without required conditions.
	Preferred,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeHint {
	pub field: String,
	pub values: Vec<String>,
	pub intent: HintIntent,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidQuery {
	#[error("query text must be non-empty.")]
	EmptyText,
	#[error("top_k must be greater than zero.")]
	ZeroTopK,
	#[error("type hint field must be non-empty.")]
	EmptyHintField,
	#[error("type hint for '{field}' must list at least one value.")]
	EmptyHintValues { field: String },
}

/// One request's retrieval parameters. Read-only once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievalQuery {
	text: String,
	jurisdiction: Option<Estado>,
	type_hint: Option<TypeHint>,
	top_k: u32,
}
impl RetrievalQuery {
	pub fn new(
		text: &str,
		jurisdiction: Option<Estado>,
		type_hint: Option<TypeHint>,
		top_k: u32,
	) -> Result<Self, InvalidQuery> {
		let text = text.trim();

		if text.is_empty() {
			return Err(InvalidQuery::EmptyText);
		}
		if top_k == 0 {
			return Err(InvalidQuery::ZeroTopK);
		}

		let type_hint = match type_hint {
			Some(mut hint) => {
				hint.field = hint.field.trim().to_string();

				if hint.field.is_empty() {
					return Err(InvalidQuery::EmptyHintField);
				}

				hint.values.retain(|value| !value.trim().is_empty());

				if hint.values.is_empty() {
					return Err(InvalidQuery::EmptyHintValues { field: hint.field });
				}

				Some(hint)
			},
			None => None,
		};

		Ok(Self { text: text.to_string(), jurisdiction, type_hint, top_k })
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn jurisdiction(&self) -> Option<Estado> {
		self.jurisdiction
	}

	pub fn type_hint(&self) -> Option<&TypeHint> {
		self.type_hint.as_ref()
	}

	pub fn top_k(&self) -> u32 {
		self.top_k
	}
}
