use std::collections::BTreeSet;

use crate::jurisdiction::{Estado, Jurisdiction};

/// Startup-time description of one indexed collection.
#[derive(Clone, Debug, PartialEq)]
pub struct SiloSpec {
	pub id: String,
	pub label: String,
	pub priority: u32,
	pub fields: BTreeSet<String>,
	pub jurisdiction_field: Option<String>,
	pub primary: PrimaryScope,
	pub rights_primary: bool,
	pub hybrid: bool,
	pub requires_jurisdiction: bool,
}
impl SiloSpec {
	pub fn exposes(&self, field: &str) -> bool {
		self.fields.contains(field)
	}

	pub fn is_primary_for(&self, jurisdiction: Jurisdiction) -> bool {
		let Some(estado) = jurisdiction.estado() else {
			return false;
		};

		match &self.primary {
			PrimaryScope::Never => false,
			PrimaryScope::Any => true,
			PrimaryScope::Only(estados) => estados.contains(&estado),
		}
	}
}

/// Jurisdictions for which a silo is the preferred source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrimaryScope {
	Never,
	Any,
	Only(BTreeSet<Estado>),
}

#[derive(Debug, thiserror::Error)]
#[error("Silo '{silo}' lists unknown primary jurisdiction '{code}'.")]
pub struct UnknownPrimaryJurisdiction {
	pub silo: String,
	pub code: String,
}

/// Immutable silo set, ordered by priority rank then id.
#[derive(Clone, Debug)]
pub struct SiloRegistry {
	silos: Vec<SiloSpec>,
}
impl SiloRegistry {
	pub fn new(mut silos: Vec<SiloSpec>) -> Self {
		silos.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

		Self { silos }
	}

	pub fn from_config(
		silos: &[jurex_config::Silo],
	) -> Result<Self, UnknownPrimaryJurisdiction> {
		let mut specs = Vec::with_capacity(silos.len());

		for silo in silos {
			let primary = if !silo.jurisdiction_primary {
				PrimaryScope::Never
			} else if silo.primary_jurisdictions.is_empty() {
				PrimaryScope::Any
			} else {
				let mut estados = BTreeSet::new();

				for code in &silo.primary_jurisdictions {
					let estado = Estado::from_code(code.trim()).ok_or_else(|| {
						UnknownPrimaryJurisdiction { silo: silo.id.clone(), code: code.clone() }
					})?;

					estados.insert(estado);
				}

				PrimaryScope::Only(estados)
			};

			specs.push(SiloSpec {
				id: silo.id.clone(),
				label: silo.label.clone(),
				priority: silo.priority,
				fields: silo.fields.iter().cloned().collect(),
				jurisdiction_field: silo.jurisdiction_field.clone(),
				primary,
				rights_primary: silo.rights_primary,
				hybrid: silo.hybrid,
				requires_jurisdiction: silo.requires_jurisdiction,
			});
		}

		Ok(Self::new(specs))
	}

	pub fn get(&self, id: &str) -> Option<&SiloSpec> {
		self.silos.iter().find(|silo| silo.id == id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &SiloSpec> {
		self.silos.iter()
	}

	pub fn len(&self) -> usize {
		self.silos.len()
	}

	pub fn is_empty(&self) -> bool {
		self.silos.is_empty()
	}
}
