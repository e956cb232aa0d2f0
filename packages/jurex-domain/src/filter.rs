//! Per-silo filter composition.
//!
//! A filter has required conditions (all must match) and optional conditions (at least one must
//! match). Vector stores evaluate a mixed filter as "every required condition AND at least one
//! optional condition", so a preferred condition placed next to a required one silently becomes
//! a hard exclusion. [`FilterExpression`] can only hold both sets when it was built through
//! [`FilterExpression::hard_with_any_of`] or [`FilterBuilder::hard_semantics`].

use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::{
	query::{HintIntent, RetrievalQuery},
	silo::SiloSpec,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Condition {
	field: String,
	values: Vec<String>,
}
impl Condition {
	pub fn matches(field: impl Into<String>, value: impl Into<String>) -> Self {
		Self { field: field.into(), values: vec![value.into()] }
	}

	/// Matches when the field equals any of `values`.
	pub fn any_of<I, S>(field: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut values: Vec<String> = values.into_iter().map(Into::into).collect();

		values.sort();
		values.dedup();

		Self { field: field.into(), values }
	}

	pub fn field(&self) -> &str {
		&self.field
	}

	pub fn values(&self) -> &[String] {
		&self.values
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSemantics {
	/// Every required condition must match.
	Hard,
	/// At least one optional condition must match.
	Soft,
	/// Every required condition and at least one of the optional set must match.
	HardAnyOf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterExpression {
	kind: FilterKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum FilterKind {
	Hard { required: Vec<Condition> },
	Soft { optional: Vec<Condition> },
	HardAnyOf { required: Vec<Condition>, any_of: Vec<Condition> },
}

impl FilterExpression {
	/// Hard-constrain path: a pure conjunction.
	pub fn hard(required: Vec<Condition>) -> Self {
		Self { kind: FilterKind::Hard { required } }
	}

	/// Soft-prefer path: a pure "at least one of" disjunction.
	pub fn soft(optional: Vec<Condition>) -> Self {
		Self { kind: FilterKind::Soft { optional } }
	}

	/// Explicit opt-in to make the optional set itself hard-filtering next to `required`.
	pub fn hard_with_any_of(required: Vec<Condition>, any_of: Vec<Condition>) -> Self {
		if required.is_empty() {
			return Self::soft(any_of);
		}
		if any_of.is_empty() {
			return Self::hard(required);
		}

		Self { kind: FilterKind::HardAnyOf { required, any_of } }
	}

	pub fn semantics(&self) -> FilterSemantics {
		match self.kind {
			FilterKind::Hard { .. } => FilterSemantics::Hard,
			FilterKind::Soft { .. } => FilterSemantics::Soft,
			FilterKind::HardAnyOf { .. } => FilterSemantics::HardAnyOf,
		}
	}

	pub fn required(&self) -> &[Condition] {
		match &self.kind {
			FilterKind::Hard { required } | FilterKind::HardAnyOf { required, .. } => required,
			FilterKind::Soft { .. } => &[],
		}
	}

	pub fn optional(&self) -> &[Condition] {
		match &self.kind {
			FilterKind::Soft { optional } => optional,
			FilterKind::HardAnyOf { any_of, .. } => any_of,
			FilterKind::Hard { .. } => &[],
		}
	}

	pub fn is_empty(&self) -> bool {
		self.required().is_empty() && self.optional().is_empty()
	}

	/// Evaluates the expression against a document's payload lookup.
	pub fn matches<'a, F>(&self, lookup: F) -> bool
	where
		F: Fn(&str) -> Option<&'a str>,
	{
		let hit = |condition: &Condition| {
			lookup(condition.field())
				.map(|value| condition.values().iter().any(|expected| expected == value))
				.unwrap_or(false)
		};
		let required_ok = self.required().iter().all(hit);
		let optional_ok = self.optional().is_empty() || self.optional().iter().any(hit);

		required_ok && optional_ok
	}
}
impl Serialize for FilterExpression {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut state = serializer.serialize_struct("FilterExpression", 3)?;

		state.serialize_field("semantics", &self.semantics())?;
		state.serialize_field("must", self.required())?;
		state.serialize_field("should", self.optional())?;
		state.end()
	}
}

/// Accumulates conditions and refuses unsafe must + should mixes unless told otherwise.
#[derive(Debug)]
pub struct FilterBuilder {
	scope: String,
	required: Vec<Condition>,
	preferred: Vec<Condition>,
	hard_semantics: bool,
}
impl FilterBuilder {
	pub fn new(scope: impl Into<String>) -> Self {
		Self {
			scope: scope.into(),
			required: Vec::new(),
			preferred: Vec::new(),
			hard_semantics: false,
		}
	}

	pub fn require(mut self, condition: Condition) -> Self {
		self.required.push(condition);

		self
	}

	pub fn prefer(mut self, condition: Condition) -> Self {
		self.preferred.push(condition);

		self
	}

	/// Accepts that preferred conditions become an additional required "any of" group.
	pub fn hard_semantics(mut self) -> Self {
		self.hard_semantics = true;

		self
	}

	pub fn build(self) -> Result<Option<FilterExpression>, FilterCompositionError> {
		match (self.required.is_empty(), self.preferred.is_empty()) {
			(true, true) => Ok(None),
			(false, true) => Ok(Some(FilterExpression::hard(self.required))),
			(true, false) => Ok(Some(FilterExpression::soft(self.preferred))),
			(false, false) if self.hard_semantics =>
				Ok(Some(FilterExpression::hard_with_any_of(self.required, self.preferred))),
			(false, false) => Err(FilterCompositionError {
				silo: self.scope,
				required_fields: field_names(&self.required),
				optional_fields: field_names(&self.preferred),
			}),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(
	"silo '{silo}': preferred conditions on [{}] cannot be combined with required conditions on [{}] without hard semantics.",
	.optional_fields.join(", "),
	.required_fields.join(", ")
)]
pub struct FilterCompositionError {
	pub silo: String,
	pub required_fields: Vec<String>,
	pub optional_fields: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("silo '{silo}' does not expose filter field '{field}'.")]
pub struct UnsupportedFilterFieldError {
	pub silo: String,
	pub field: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
	#[error(transparent)]
	Composition(#[from] FilterCompositionError),
	#[error(transparent)]
	UnsupportedField(#[from] UnsupportedFilterFieldError),
}

/// Builds the filter for one silo from the query's jurisdiction and type hint.
pub fn compile_filter(
	query: &RetrievalQuery,
	silo: &SiloSpec,
) -> Result<Option<FilterExpression>, FilterError> {
	let mut builder = jurisdiction_builder(query, silo);

	if let Some(hint) = query.type_hint() {
		if !silo.exposes(&hint.field) {
			return Err(UnsupportedFilterFieldError {
				silo: silo.id.clone(),
				field: hint.field.clone(),
			}
			.into());
		}

		let condition = Condition::any_of(hint.field.clone(), hint.values.iter().cloned());

		builder = match hint.intent {
			HintIntent::Exclusive => builder.require(condition),
			HintIntent::Preferred => builder.prefer(condition),
		};
	}

	Ok(builder.build()?)
}

/// Filter for the jurisdiction alone, used when the type hint cannot apply to a silo.
pub fn compile_jurisdiction_filter(
	query: &RetrievalQuery,
	silo: &SiloSpec,
) -> Option<FilterExpression> {
	let builder = jurisdiction_builder(query, silo);

	// Only required conditions are added, so composition cannot fail.
	builder.build().ok().flatten()
}

fn jurisdiction_builder(query: &RetrievalQuery, silo: &SiloSpec) -> FilterBuilder {
	let builder = FilterBuilder::new(silo.id.clone());

	match (query.jurisdiction(), silo.jurisdiction_field.as_deref()) {
		(Some(estado), Some(field)) => builder.require(Condition::matches(field, estado.code())),
		_ => builder,
	}
}

fn field_names(conditions: &[Condition]) -> Vec<String> {
	let mut fields: Vec<String> =
		conditions.iter().map(|condition| condition.field.clone()).collect();

	fields.sort();
	fields.dedup();

	fields
}
