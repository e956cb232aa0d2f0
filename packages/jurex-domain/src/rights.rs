const HUMAN_RIGHTS_KEYWORDS: &[&str] = &[
	// Fundamental rights.
	"derecho humano",
	"derechos humanos",
	"ddhh",
	"garantía",
	"garantías",
	"libertad",
	"igualdad",
	"dignidad",
	"integridad",
	// Interpretive principles.
	"pro persona",
	"pro homine",
	"principio de progresividad",
	"no regresión",
	"interpretación conforme",
	"control de convencionalidad",
	"control difuso",
	// Treaties.
	"convención americana",
	"cadh",
	"pacto de san josé",
	"pidcp",
	"convención contra la tortura",
	"convención del niño",
	"cedaw",
	// Inter-American system.
	"corte interamericana",
	"coidh",
	"cidh",
	"comisión interamericana",
	// Violations.
	"tortura",
	"desaparición forzada",
	"detención arbitraria",
	"discriminación",
	"debido proceso",
	"presunción de inocencia",
	"acceso a la justicia",
];

/// Whether the query concerns human rights, which favors the constitutional block.
pub fn is_human_rights_query(query: &str) -> bool {
	let lowered = query.to_lowercase();

	HUMAN_RIGHTS_KEYWORDS.iter().any(|keyword| contains_word(&lowered, keyword))
}

// Keywords such as "cat" or "vida" must not match inside longer words.
fn contains_word(haystack: &str, needle: &str) -> bool {
	haystack.match_indices(needle).any(|(start, _)| {
		let end = start + needle.len();
		let before = haystack[..start].chars().next_back();
		let after = haystack[end..].chars().next();

		!before.map(char::is_alphanumeric).unwrap_or(false)
			&& !after.map(char::is_alphanumeric).unwrap_or(false)
	})
}
