//! Legal synonym expansion, used to raise lexical and semantic recall.

const LEGAL_SYNONYMS: &[(&str, &[&str])] = &[
	(
		"derecho del tanto",
		&[
			"derecho de preferencia",
			"preferencia adquisición",
			"socios gozarán del tanto",
			"enajenar partes sociales",
			"copropiedad preferencia",
			"colindantes vía pública",
			"propietarios predios colindantes",
			"retracto legal",
			"usufructuario goza del tanto",
			"copropiedad indivisa",
		],
	),
	(
		"amparo indirecto",
		&["juicio de amparo", "amparo ante juez de distrito", "demanda de amparo", "acto reclamado"],
	),
	(
		"pensión alimenticia",
		&[
			"alimentos",
			"obligación alimentaria",
			"derechos alimentarios",
			"manutención",
			"asistencia familiar",
		],
	),
	("prescripción", &["caducidad", "extinción de acción", "término prescriptorio"]),
	("contrato", &["convenio", "acuerdo", "obligaciones contractuales"]),
	("arrendamiento", &["alquiler", "renta", "locación", "arrendador arrendatario"]),
	("compraventa", &["enajenación", "transmisión de dominio", "adquisición"]),
	("sucesión", &["herencia", "testamento", "herederos", "legado", "intestado"]),
	("divorcio", &["disolución matrimonial", "separación conyugal", "convenio de divorcio"]),
	("delito", &["ilícito penal", "hecho punible", "conducta típica"]),
];

/// Appends up to `max_synonyms` synonyms for the first dictionary term found in `query`.
///
/// The original query always leads the expanded text; at most one term is expanded.
pub fn expand_legal_query(query: &str, max_synonyms: usize) -> String {
	let lowered = query.to_lowercase();
	let mut expanded = vec![query];

	if let Some((_, synonyms)) = LEGAL_SYNONYMS.iter().find(|(term, _)| lowered.contains(term)) {
		expanded.extend(synonyms.iter().take(max_synonyms).copied());
	}

	expanded.join(" ")
}
