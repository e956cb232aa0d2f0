use std::{
	collections::HashMap,
	fmt::{Display, Formatter},
	sync::OnceLock,
};

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Code returned for input that matches no federal entity.
pub const UNKNOWN_CODE: &str = "UNKNOWN";

/// One of the 32 Mexican federal entities, as indexed in the `entidad` payload field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Estado {
	Aguascalientes,
	BajaCalifornia,
	BajaCaliforniaSur,
	Campeche,
	Chiapas,
	Chihuahua,
	CiudadDeMexico,
	Coahuila,
	Colima,
	Durango,
	Guanajuato,
	Guerrero,
	Hidalgo,
	Jalisco,
	Mexico,
	Michoacan,
	Morelos,
	Nayarit,
	NuevoLeon,
	Oaxaca,
	Puebla,
	Queretaro,
	QuintanaRoo,
	SanLuisPotosi,
	Sinaloa,
	Sonora,
	Tabasco,
	Tamaulipas,
	Tlaxcala,
	Veracruz,
	Yucatan,
	Zacatecas,
}
impl Estado {
	pub const ALL: [Self; 32] = [
		Self::Aguascalientes,
		Self::BajaCalifornia,
		Self::BajaCaliforniaSur,
		Self::Campeche,
		Self::Chiapas,
		Self::Chihuahua,
		Self::CiudadDeMexico,
		Self::Coahuila,
		Self::Colima,
		Self::Durango,
		Self::Guanajuato,
		Self::Guerrero,
		Self::Hidalgo,
		Self::Jalisco,
		Self::Mexico,
		Self::Michoacan,
		Self::Morelos,
		Self::Nayarit,
		Self::NuevoLeon,
		Self::Oaxaca,
		Self::Puebla,
		Self::Queretaro,
		Self::QuintanaRoo,
		Self::SanLuisPotosi,
		Self::Sinaloa,
		Self::Sonora,
		Self::Tabasco,
		Self::Tamaulipas,
		Self::Tlaxcala,
		Self::Veracruz,
		Self::Yucatan,
		Self::Zacatecas,
	];

	pub fn code(self) -> &'static str {
		match self {
			Self::Aguascalientes => "AGUASCALIENTES",
			Self::BajaCalifornia => "BAJA_CALIFORNIA",
			Self::BajaCaliforniaSur => "BAJA_CALIFORNIA_SUR",
			Self::Campeche => "CAMPECHE",
			Self::Chiapas => "CHIAPAS",
			Self::Chihuahua => "CHIHUAHUA",
			Self::CiudadDeMexico => "CIUDAD_DE_MEXICO",
			Self::Coahuila => "COAHUILA",
			Self::Colima => "COLIMA",
			Self::Durango => "DURANGO",
			Self::Guanajuato => "GUANAJUATO",
			Self::Guerrero => "GUERRERO",
			Self::Hidalgo => "HIDALGO",
			Self::Jalisco => "JALISCO",
			Self::Mexico => "MEXICO",
			Self::Michoacan => "MICHOACAN",
			Self::Morelos => "MORELOS",
			Self::Nayarit => "NAYARIT",
			Self::NuevoLeon => "NUEVO_LEON",
			Self::Oaxaca => "OAXACA",
			Self::Puebla => "PUEBLA",
			Self::Queretaro => "QUERETARO",
			Self::QuintanaRoo => "QUINTANA_ROO",
			Self::SanLuisPotosi => "SAN_LUIS_POTOSI",
			Self::Sinaloa => "SINALOA",
			Self::Sonora => "SONORA",
			Self::Tabasco => "TABASCO",
			Self::Tamaulipas => "TAMAULIPAS",
			Self::Tlaxcala => "TLAXCALA",
			Self::Veracruz => "VERACRUZ",
			Self::Yucatan => "YUCATAN",
			Self::Zacatecas => "ZACATECAS",
		}
	}

	pub fn from_code(code: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|estado| estado.code() == code)
	}
}
impl Display for Estado {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.code())
	}
}

/// Result of normalizing a jurisdiction string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Jurisdiction {
	Estado(Estado),
	Unknown,
}
impl Jurisdiction {
	pub fn code(self) -> &'static str {
		match self {
			Self::Estado(estado) => estado.code(),
			Self::Unknown => UNKNOWN_CODE,
		}
	}

	pub fn estado(self) -> Option<Estado> {
		match self {
			Self::Estado(estado) => Some(estado),
			Self::Unknown => None,
		}
	}
}
impl Display for Jurisdiction {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.code())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Alias '{alias}' points at unknown jurisdiction code '{code}'.")]
pub struct UnknownAliasTarget {
	pub alias: String,
	pub code: String,
}

/// Alias lookup keyed by folded spelling. Built once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct AliasTable {
	aliases: HashMap<String, Estado>,
}
impl AliasTable {
	pub fn builtin() -> Self {
		let mut aliases = HashMap::new();

		for estado in Estado::ALL {
			aliases.insert(estado.code().to_string(), estado);
		}
		for (alias, estado) in BUILTIN_ALIASES {
			aliases.insert(fold(alias), *estado);
		}

		Self { aliases }
	}

	/// Extends the built-in table with configured aliases. Targets must be canonical codes.
	pub fn with_extra(extra: &HashMap<String, String>) -> Result<Self, UnknownAliasTarget> {
		let mut table = Self::builtin();
		let mut entries: Vec<_> = extra.iter().collect();

		entries.sort();

		for (alias, code) in entries {
			let estado = Estado::from_code(&fold(code)).ok_or_else(|| UnknownAliasTarget {
				alias: alias.clone(),
				code: code.clone(),
			})?;

			table.aliases.insert(fold(alias), estado);
		}

		Ok(table)
	}

	pub fn normalize(&self, input: &str) -> Jurisdiction {
		let folded = fold(input);

		if folded.is_empty() {
			return Jurisdiction::Unknown;
		}
		if let Some(estado) = self.aliases.get(&folded) {
			return Jurisdiction::Estado(*estado);
		}

		// "Estado de Jalisco", "Edo. de Puebla".
		for prefix in ["ESTADO_DE_", "EDO_DE_", "ESTADO_"] {
			if let Some(rest) = folded.strip_prefix(prefix)
				&& let Some(estado) = self.aliases.get(rest)
			{
				return Jurisdiction::Estado(*estado);
			}
		}

		Jurisdiction::Unknown
	}

	pub fn len(&self) -> usize {
		self.aliases.len()
	}

	pub fn is_empty(&self) -> bool {
		self.aliases.is_empty()
	}
}
impl Default for AliasTable {
	fn default() -> Self {
		Self::builtin()
	}
}

const BUILTIN_ALIASES: &[(&str, Estado)] = &[
	("AGS", Estado::Aguascalientes),
	("BC", Estado::BajaCalifornia),
	("BCS", Estado::BajaCaliforniaSur),
	("CAMP", Estado::Campeche),
	("CHIS", Estado::Chiapas),
	("CHIH", Estado::Chihuahua),
	("CDMX", Estado::CiudadDeMexico),
	("DF", Estado::CiudadDeMexico),
	("DISTRITO_FEDERAL", Estado::CiudadDeMexico),
	("CIUDAD_DE_MEXICO", Estado::CiudadDeMexico),
	("MEXICO_CITY", Estado::CiudadDeMexico),
	("COAHUILA_DE_ZARAGOZA", Estado::Coahuila),
	("COAH", Estado::Coahuila),
	("COL", Estado::Colima),
	("DGO", Estado::Durango),
	("GTO", Estado::Guanajuato),
	("GRO", Estado::Guerrero),
	("HGO", Estado::Hidalgo),
	("JAL", Estado::Jalisco),
	("EDOMEX", Estado::Mexico),
	("EDO_MEX", Estado::Mexico),
	("ESTADO_DE_MEXICO", Estado::Mexico),
	("MEX", Estado::Mexico),
	("MICHOACAN_DE_OCAMPO", Estado::Michoacan),
	("MICH", Estado::Michoacan),
	("MOR", Estado::Morelos),
	("NAY", Estado::Nayarit),
	("NL", Estado::NuevoLeon),
	("NUEVOLEON", Estado::NuevoLeon),
	("OAX", Estado::Oaxaca),
	("PUE", Estado::Puebla),
	("QRO", Estado::Queretaro),
	("QUERETARO_DE_ARTEAGA", Estado::Queretaro),
	("QROO", Estado::QuintanaRoo),
	("Q_ROO", Estado::QuintanaRoo),
	("SLP", Estado::SanLuisPotosi),
	("SIN", Estado::Sinaloa),
	("SON", Estado::Sonora),
	("TAB", Estado::Tabasco),
	("TAMPS", Estado::Tamaulipas),
	("TLAX", Estado::Tlaxcala),
	("VER", Estado::Veracruz),
	("VERACRUZ_DE_IGNACIO_DE_LA_LLAVE", Estado::Veracruz),
	("YUC", Estado::Yucatan),
	("ZAC", Estado::Zacatecas),
];

/// Normalizes against the built-in alias table.
pub fn normalize_estado(input: &str) -> Jurisdiction {
	builtin_table().normalize(input)
}

fn builtin_table() -> &'static AliasTable {
	static TABLE: OnceLock<AliasTable> = OnceLock::new();

	TABLE.get_or_init(AliasTable::builtin)
}

/// Strips accents, uppercases, and joins words with `_`.
fn fold(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	let mut pending_separator = false;

	for ch in input.nfkd().filter(|ch| !is_combining_mark(*ch)) {
		if ch.is_alphanumeric() {
			if pending_separator && !out.is_empty() {
				out.push('_');
			}

			pending_separator = false;

			out.extend(ch.to_uppercase());
		} else if ch != '.' {
			pending_separator = true;
		}
	}

	out
}
