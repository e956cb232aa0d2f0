//! Cross-silo merge: tiering, deduplication, and ordering.

use std::{cmp::Ordering, collections::HashSet};

use serde::Serialize;

use crate::executor::RetrievedDocument;
use jurex_domain::{Estado, Jurisdiction, SiloRegistry, SiloSpec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
	Jurisdiction,
	Rights,
	General,
}
impl Tier {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Jurisdiction => "jurisdiction",
			Self::Rights => "rights",
			Self::General => "general",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TierPolicy {
	pub jurisdiction: Option<Estado>,
	pub human_rights: bool,
}
impl TierPolicy {
	pub fn tier_for(&self, silo: &SiloSpec) -> Tier {
		if let Some(estado) = self.jurisdiction
			&& silo.is_primary_for(Jurisdiction::Estado(estado))
		{
			return Tier::Jurisdiction;
		}
		if self.human_rights && silo.rights_primary {
			return Tier::Rights;
		}

		Tier::General
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedDocument {
	pub tier: Tier,
	pub silo_priority: u32,
	pub document: RetrievedDocument,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RankedResultSet {
	documents: Vec<RankedDocument>,
	pub duplicates_removed: usize,
	pub truncated: usize,
	/// A jurisdiction-primary silo applied but contributed nothing.
	pub primary_gap: bool,
}
impl RankedResultSet {
	pub fn documents(&self) -> &[RankedDocument] {
		&self.documents
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}
}

/// Merges per-silo documents into one ordered, deduplicated set of at most `top_k` entries.
///
/// The output is a pure function of the input set; arrival order does not matter.
pub fn merge<I>(
	documents: I,
	registry: &SiloRegistry,
	policy: &TierPolicy,
	top_k: usize,
) -> RankedResultSet
where
	I: IntoIterator<Item = RetrievedDocument>,
{
	let mut candidates: Vec<RankedDocument> = documents
		.into_iter()
		.map(|document| {
			let (tier, silo_priority) = match registry.get(&document.silo) {
				Some(silo) => (policy.tier_for(silo), silo.priority),
				None => (Tier::General, u32::MAX),
			};

			RankedDocument { tier, silo_priority, document }
		})
		.collect();
	let primary_applies = policy.jurisdiction.is_some()
		&& registry.iter().any(|silo| policy.tier_for(silo) == Tier::Jurisdiction);
	let primary_gap =
		primary_applies && !candidates.iter().any(|doc| doc.tier == Tier::Jurisdiction);

	candidates.sort_by(dedup_precedence);

	let total = candidates.len();
	let mut seen = HashSet::new();
	let mut kept: Vec<RankedDocument> = candidates
		.into_iter()
		.filter(|doc| seen.insert(doc.document.dedup_key().to_string()))
		.collect();
	let duplicates_removed = total - kept.len();

	kept.sort_by(rank_order);

	let truncated = kept.len().saturating_sub(top_k);

	kept.truncate(top_k);

	RankedResultSet { documents: kept, duplicates_removed, truncated, primary_gap }
}

// Which occurrence of a duplicated reference survives.
fn dedup_precedence(a: &RankedDocument, b: &RankedDocument) -> Ordering {
	a.tier
		.cmp(&b.tier)
		.then_with(|| a.silo_priority.cmp(&b.silo_priority))
		.then_with(|| b.document.score.total_cmp(&a.document.score))
		.then_with(|| a.document.silo.cmp(&b.document.silo))
		.then_with(|| a.document.id.cmp(&b.document.id))
}

fn rank_order(a: &RankedDocument, b: &RankedDocument) -> Ordering {
	a.tier
		.cmp(&b.tier)
		.then_with(|| b.document.score.total_cmp(&a.document.score))
		.then_with(|| a.silo_priority.cmp(&b.silo_priority))
		.then_with(|| a.document.dedup_key().cmp(b.document.dedup_key()))
		.then_with(|| a.document.silo.cmp(&b.document.silo))
		.then_with(|| a.document.id.cmp(&b.document.id))
}
