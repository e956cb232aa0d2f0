use std::collections::{BTreeSet, HashMap};

use jurex_domain::{
	Condition, Estado, FilterBuilder, FilterError, FilterExpression, FilterSemantics, HintIntent,
	InvalidQuery, PrimaryScope, RetrievalQuery, SiloSpec, TypeHint, compile_filter,
	compile_jurisdiction_filter,
};

fn state_silo() -> SiloSpec {
	SiloSpec {
		id: "leyes_estatales".to_string(),
		label: "Leyes estatales".to_string(),
		priority: 2,
		fields: BTreeSet::from(["entidad".to_string(), "tipo_codigo".to_string()]),
		jurisdiction_field: Some("entidad".to_string()),
		primary: PrimaryScope::Any,
		rights_primary: false,
		hybrid: true,
		requires_jurisdiction: true,
	}
}

fn federal_silo() -> SiloSpec {
	SiloSpec {
		id: "leyes_federales".to_string(),
		label: "Leyes federales".to_string(),
		priority: 1,
		fields: BTreeSet::new(),
		jurisdiction_field: None,
		primary: PrimaryScope::Never,
		rights_primary: false,
		hybrid: true,
		requires_jurisdiction: false,
	}
}

fn urban_hint(intent: HintIntent) -> TypeHint {
	TypeHint {
		field: "tipo_codigo".to_string(),
		values: vec!["URBANO".to_string(), "DESARROLLO_URBANO".to_string()],
		intent,
	}
}

fn query(jurisdiction: Option<Estado>, hint: Option<TypeHint>) -> RetrievalQuery {
	RetrievalQuery::new("uso de suelo habitacional", jurisdiction, hint, 10)
		.expect("Query must be valid.")
}

#[test]
fn builder_rejects_required_plus_preferred() {
	let err = FilterBuilder::new("leyes_estatales")
		.require(Condition::matches("entidad", "CIUDAD_DE_MEXICO"))
		.prefer(Condition::matches("tipo_codigo", "URBANO"))
		.build()
		.expect_err("Mixing must and should without hard semantics must be rejected.");

	assert_eq!(err.silo, "leyes_estatales");
	assert_eq!(err.required_fields, vec!["entidad".to_string()]);
	assert_eq!(err.optional_fields, vec!["tipo_codigo".to_string()]);
	assert_eq!(
		err.to_string(),
		"silo 'leyes_estatales': preferred conditions on [tipo_codigo] cannot be combined with \
		 required conditions on [entidad] without hard semantics."
	);
}

#[test]
fn builder_accepts_mix_with_explicit_hard_semantics() {
	let filter = FilterBuilder::new("leyes_estatales")
		.require(Condition::matches("entidad", "CIUDAD_DE_MEXICO"))
		.prefer(Condition::matches("tipo_codigo", "URBANO"))
		.hard_semantics()
		.build()
		.expect("Explicit hard semantics must be accepted.")
		.expect("Filter must be present.");

	assert_eq!(filter.semantics(), FilterSemantics::HardAnyOf);
	assert_eq!(filter.required().len(), 1);
	assert_eq!(filter.optional().len(), 1);
}

#[test]
fn pure_paths_keep_their_semantics() {
	let hard = FilterBuilder::new("s")
		.require(Condition::matches("entidad", "JALISCO"))
		.build()
		.expect("Hard filter must build.")
		.expect("Filter must be present.");
	let soft = FilterBuilder::new("s")
		.prefer(Condition::matches("tipo_codigo", "URBANO"))
		.prefer(Condition::matches("tipo_codigo", "CIVIL"))
		.build()
		.expect("Soft filter must build.")
		.expect("Filter must be present.");

	assert_eq!(hard.semantics(), FilterSemantics::Hard);
	assert!(hard.optional().is_empty());
	assert_eq!(soft.semantics(), FilterSemantics::Soft);
	assert!(soft.required().is_empty());
	assert!(FilterBuilder::new("s").build().expect("Empty builder must build.").is_none());
}

#[test]
fn hard_with_any_of_degrades_when_one_side_is_empty() {
	let only_required =
		FilterExpression::hard_with_any_of(vec![Condition::matches("entidad", "PUEBLA")], vec![]);
	let only_optional =
		FilterExpression::hard_with_any_of(vec![], vec![Condition::matches("tipo", "CPEUM")]);

	assert_eq!(only_required.semantics(), FilterSemantics::Hard);
	assert_eq!(only_optional.semantics(), FilterSemantics::Soft);
}

// A CDMX civil code article matches the jurisdiction but not an unrelated urban type hint.
// With the hint as a preference it must not be silently excluded.
#[test]
fn jurisdiction_match_is_not_excluded_by_preferred_hint() {
	let err = compile_filter(
		&query(Some(Estado::CiudadDeMexico), Some(urban_hint(HintIntent::Preferred))),
		&state_silo(),
	)
	.expect_err("Preferred hint next to a required jurisdiction must be rejected.");

	assert!(matches!(err, FilterError::Composition(_)));

	let hard = compile_filter(&query(Some(Estado::CiudadDeMexico), None), &state_silo())
		.expect("Jurisdiction-only filter must compile.")
		.expect("Filter must be present.");
	let civil_article = HashMap::from([("entidad", "CIUDAD_DE_MEXICO"), ("tipo_codigo", "CIVIL")]);

	assert!(hard.matches(|field| civil_article.get(field).copied()));
}

#[test]
fn exclusive_hint_becomes_required() {
	let filter = compile_filter(
		&query(Some(Estado::CiudadDeMexico), Some(urban_hint(HintIntent::Exclusive))),
		&state_silo(),
	)
	.expect("Exclusive hint must compile.")
	.expect("Filter must be present.");

	assert_eq!(filter.semantics(), FilterSemantics::Hard);
	assert_eq!(filter.required().len(), 2);
	assert_eq!(filter.required()[1].values(), ["DESARROLLO_URBANO", "URBANO"]);

	let civil = HashMap::from([("entidad", "CIUDAD_DE_MEXICO"), ("tipo_codigo", "CIVIL")]);
	let urban = HashMap::from([("entidad", "CIUDAD_DE_MEXICO"), ("tipo_codigo", "URBANO")]);

	assert!(!filter.matches(|field| civil.get(field).copied()));
	assert!(filter.matches(|field| urban.get(field).copied()));
}

#[test]
fn preferred_hint_without_jurisdiction_is_soft() {
	let filter = compile_filter(&query(None, Some(urban_hint(HintIntent::Preferred))), &state_silo())
		.expect("Soft hint must compile.")
		.expect("Filter must be present.");

	assert_eq!(filter.semantics(), FilterSemantics::Soft);
}

#[test]
fn unsupported_hint_field_is_reported_per_silo() {
	let err = compile_filter(
		&query(Some(Estado::Jalisco), Some(urban_hint(HintIntent::Exclusive))),
		&federal_silo(),
	)
	.expect_err("Federal silo does not expose tipo_codigo.");

	match err {
		FilterError::UnsupportedField(inner) => {
			assert_eq!(inner.silo, "leyes_federales");
			assert_eq!(inner.field, "tipo_codigo");
		},
		other => panic!("Unexpected error: {other}"),
	}
}

#[test]
fn jurisdiction_is_ignored_on_silos_without_a_jurisdiction_field() {
	let filter = compile_filter(&query(Some(Estado::Jalisco), None), &federal_silo())
		.expect("Federal silo must compile.");

	assert!(filter.is_none());
	assert!(compile_jurisdiction_filter(&query(Some(Estado::Jalisco), None), &federal_silo())
		.is_none());
}

#[test]
fn filter_serializes_with_must_and_should() {
	let filter = FilterExpression::hard(vec![Condition::matches("entidad", "OAXACA")]);
	let json = serde_json::to_value(&filter).expect("Filter must serialize.");

	assert_eq!(
		json,
		serde_json::json!({
			"semantics": "hard",
			"must": [{ "field": "entidad", "values": ["OAXACA"] }],
			"should": [],
		})
	);
}

#[test]
fn query_validation_rejects_structural_errors() {
	assert_eq!(RetrievalQuery::new("   ", None, None, 5), Err(InvalidQuery::EmptyText));
	assert_eq!(RetrievalQuery::new("amparo", None, None, 0), Err(InvalidQuery::ZeroTopK));

	let empty_values =
		TypeHint { field: "tipo_codigo".to_string(), values: vec![" ".to_string()], intent: HintIntent::Exclusive };

	assert_eq!(
		RetrievalQuery::new("amparo", None, Some(empty_values), 5),
		Err(InvalidQuery::EmptyHintValues { field: "tipo_codigo".to_string() })
	);
}
