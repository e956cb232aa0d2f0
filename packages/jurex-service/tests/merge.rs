use std::collections::BTreeSet;

use serde_json::Map;

use jurex_domain::{Estado, PrimaryScope, SiloRegistry, SiloSpec};
use jurex_service::{
	AssemblyError, ContextLimits, RankedResultSet, RetrievedDocument, Tier, TierPolicy,
	context::{self, CONTEXT_CLOSE, CONTEXT_OPEN, NO_RESULTS_TEXT, TRUNCATION_SUFFIX},
	ranking,
};

fn spec(id: &str, priority: u32, primary: PrimaryScope, rights_primary: bool) -> SiloSpec {
	SiloSpec {
		id: id.to_string(),
		label: id.to_string(),
		priority,
		fields: BTreeSet::new(),
		jurisdiction_field: None,
		primary,
		rights_primary,
		hybrid: false,
		requires_jurisdiction: false,
	}
}

fn registry() -> SiloRegistry {
	SiloRegistry::new(vec![
		spec("bloque_constitucional", 0, PrimaryScope::Never, true),
		spec("leyes_federales", 1, PrimaryScope::Never, false),
		spec("leyes_estatales", 2, PrimaryScope::Any, false),
		spec("jurisprudencia_nacional", 3, PrimaryScope::Never, false),
	])
}

fn doc(silo: &str, id: &str, score: f32, reference: &str) -> RetrievedDocument {
	RetrievedDocument {
		silo: silo.to_string(),
		id: id.to_string(),
		score,
		reference: Some(reference.to_string()),
		origen: None,
		text: format!("Contenido de {reference}."),
		payload: Map::new(),
	}
}

fn cdmx() -> TierPolicy {
	TierPolicy { jurisdiction: Some(Estado::CiudadDeMexico), human_rights: false }
}

fn sample() -> Vec<RetrievedDocument> {
	vec![
		doc("leyes_federales", "f1", 0.89, "CCF 2398"),
		doc("leyes_estatales", "s1", 0.41, "CCDMX 2448"),
		doc("jurisprudencia_nacional", "j1", 0.89, "Tesis 1a. 5/2019"),
		doc("bloque_constitucional", "c1", 0.55, "CPEUM 14"),
		doc("leyes_estatales", "s2", 0.30, "CCDMX 2449"),
	]
}

fn ids(set: &RankedResultSet) -> Vec<&str> {
	set.documents().iter().map(|ranked| ranked.document.id.as_str()).collect()
}

#[test]
fn jurisdiction_tier_precedes_score() {
	let merged = ranking::merge(sample(), &registry(), &cdmx(), 10);

	assert_eq!(ids(&merged), vec!["s1", "s2", "f1", "j1", "c1"]);
	assert_eq!(merged.documents()[0].tier, Tier::Jurisdiction);
	assert!(!merged.primary_gap);
}

#[test]
fn equal_scores_break_on_silo_priority() {
	let merged = ranking::merge(sample(), &registry(), &TierPolicy::default(), 10);

	// f1 and j1 share 0.89; leyes_federales has the better priority rank.
	assert_eq!(ids(&merged), vec!["f1", "j1", "c1", "s1", "s2"]);
}

#[test]
fn merge_is_independent_of_arrival_order() {
	let forward = ranking::merge(sample(), &registry(), &cdmx(), 4);
	let mut reversed_input = sample();

	reversed_input.reverse();

	let reversed = ranking::merge(reversed_input, &registry(), &cdmx(), 4);

	assert_eq!(forward, reversed);
	assert_eq!(forward.truncated, 1);
}

#[test]
fn duplicates_keep_the_higher_tier_occurrence() {
	let docs = vec![
		doc("leyes_federales", "f1", 0.95, "LGAH 1"),
		doc("leyes_estatales", "s1", 0.20, "LGAH 1"),
	];
	let merged = ranking::merge(docs, &registry(), &cdmx(), 10);

	assert_eq!(ids(&merged), vec!["s1"]);
	assert_eq!(merged.duplicates_removed, 1);
}

#[test]
fn duplicates_within_a_tier_keep_the_better_priority_silo() {
	let docs = vec![
		doc("jurisprudencia_nacional", "j1", 0.95, "Art. 1"),
		doc("leyes_federales", "f1", 0.40, "Art. 1"),
	];
	let merged = ranking::merge(docs, &registry(), &TierPolicy::default(), 10);

	assert_eq!(ids(&merged), vec!["f1"]);
}

#[test]
fn human_rights_policy_lifts_rights_primary_silos() {
	let policy = TierPolicy { jurisdiction: None, human_rights: true };
	let merged = ranking::merge(sample(), &registry(), &policy, 10);

	assert_eq!(merged.documents()[0].document.id, "c1");
	assert_eq!(merged.documents()[0].tier, Tier::Rights);
}

#[test]
fn empty_primary_tier_is_reported_as_gap() {
	let docs = vec![doc("leyes_federales", "f1", 0.9, "CCF 1")];
	let merged = ranking::merge(docs, &registry(), &cdmx(), 10);

	assert!(merged.primary_gap);
	assert_eq!(merged.documents()[0].tier, Tier::General);
}

#[test]
fn budget_includes_exactly_the_documents_that_fit() {
	let merged = ranking::merge(sample(), &registry(), &cdmx(), 10);
	let wrapper = CONTEXT_OPEN.chars().count() + CONTEXT_CLOSE.chars().count();
	let first_three: usize = merged.documents()[..3]
		.iter()
		.map(|ranked| context::render_entry(ranked, None).chars().count())
		.sum();
	let limits =
		ContextLimits { max_documents: 10, max_chars: wrapper + first_three, max_doc_chars: None };
	let assembled = context::assemble(&merged, &limits).expect("Assembly must succeed.");
	let included: Vec<&str> = assembled.entries.iter().map(|entry| entry.id.as_str()).collect();

	assert_eq!(included, vec!["s1", "s2", "f1"]);
	assert_eq!(assembled.included, 3);
	assert_eq!(assembled.dropped, 2);
	assert_eq!(assembled.chars, limits.max_chars);
	assert_eq!(assembled.text.chars().count(), assembled.chars);
	assert!(assembled.text.starts_with(CONTEXT_OPEN));
	assert!(assembled.text.ends_with(CONTEXT_CLOSE));
}

#[test]
fn assembly_stops_at_the_first_document_that_does_not_fit() {
	let mut docs = sample();

	docs[1].text = "x".repeat(5_000);

	let merged = ranking::merge(docs, &registry(), &cdmx(), 10);
	let limits = ContextLimits { max_documents: 10, max_chars: 2_000, max_doc_chars: None };
	let assembled = context::assemble(&merged, &limits).expect("Assembly must succeed.");

	// s1 is first and too large; nothing ranked below it may jump ahead.
	assert!(assembled.is_empty());
	assert_eq!(assembled.dropped, 5);
	assert_eq!(assembled.text, format!("{CONTEXT_OPEN}{CONTEXT_CLOSE}"));
	assert_eq!(assembled.chars, assembled.text.chars().count());
}

#[test]
fn empty_result_set_renders_the_no_results_text() {
	let merged = ranking::merge(Vec::new(), &registry(), &cdmx(), 10);
	let limits = ContextLimits { max_documents: 10, max_chars: 2_000, max_doc_chars: None };
	let assembled = context::assemble(&merged, &limits).expect("Assembly must succeed.");

	assert!(assembled.is_empty());
	assert_eq!(assembled.dropped, 0);
	assert_eq!(assembled.text, NO_RESULTS_TEXT);
}

#[test]
fn long_documents_are_clipped_with_a_marker() {
	let mut docs = vec![doc("leyes_federales", "f1", 0.9, "CCF 1")];

	docs[0].text = "á".repeat(700);

	let merged = ranking::merge(docs, &registry(), &TierPolicy::default(), 10);
	let limits = ContextLimits { max_documents: 10, max_chars: 10_000, max_doc_chars: Some(600) };
	let assembled = context::assemble(&merged, &limits).expect("Assembly must succeed.");

	assert!(assembled.entries[0].clipped);
	assert!(assembled.text.contains(&format!("{}{TRUNCATION_SUFFIX}", "á".repeat(600))));
	assert!(!assembled.text.contains(&"á".repeat(601)));
}

#[test]
fn rendered_elements_are_escaped_and_carry_metadata() {
	let mut docs = vec![doc("leyes_federales", "f1", 0.5, "Ley \"A\" & <B>")];

	docs[0].text = "Si x < y & y > z".to_string();

	let merged = ranking::merge(docs, &registry(), &TierPolicy::default(), 10);
	let element = context::render_entry(&merged.documents()[0], None);

	assert_eq!(
		element,
		"<documento id=\"f1\" ref=\"Ley &quot;A&quot; &amp; &lt;B&gt;\" origen=\"\" \
		 silo=\"leyes_federales\" tier=\"general\" score=\"0.5000\">\n\
		 Si x &lt; y &amp; y &gt; z\n</documento>\n"
	);
}

#[test]
fn malformed_documents_fail_assembly() {
	let limits = ContextLimits { max_documents: 10, max_chars: 10_000, max_doc_chars: None };
	let nan = ranking::merge(
		vec![doc("leyes_federales", "f1", f32::NAN, "CCF 1")],
		&registry(),
		&TierPolicy::default(),
		10,
	);

	assert!(matches!(context::assemble(&nan, &limits), Err(AssemblyError::NonFiniteScore { .. })));

	let blank = ranking::merge(
		vec![doc("leyes_federales", " ", 0.5, "CCF 1")],
		&registry(),
		&TierPolicy::default(),
		10,
	);

	assert!(matches!(context::assemble(&blank, &limits), Err(AssemblyError::EmptyId { .. })));
}
