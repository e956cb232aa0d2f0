//! Qdrant-backed [`SearchProvider`]: one named-vector query per silo collection.

use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition as QdrantCondition, Document, Filter, PointId, PrefetchQueryBuilder, Query,
	QueryPointsBuilder, ScoredPoint, Value as QdrantValue, point_id::PointIdOptions, value::Kind,
};
use serde_json::{Map, Number, Value};

use crate::{
	BoxFuture, Error, Result, SearchProvider,
	executor::{SearchHit, SiloSearch},
};
use jurex_domain::{Condition, FilterExpression, FilterSemantics};
use jurex_storage::qdrant::{BM25_MODEL, DENSE_VECTOR_NAME, QdrantStore, SPARSE_VECTOR_NAME};

impl SearchProvider for QdrantStore {
	fn search<'a>(&'a self, search: &'a SiloSearch) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move {
			if search.vector.len() != self.vector_dim as usize {
				return Err(Error::Provider {
					message: "Embedding vector dimension mismatch.".to_string(),
				});
			}

			let filter = search.filter.as_ref().map(to_qdrant_filter);
			let mut query = QueryPointsBuilder::new(search.silo.clone())
				.query(Query::new_nearest(search.vector.clone()))
				.using(DENSE_VECTOR_NAME)
				.with_payload(true)
				.limit(search.top_k as u64);

			if search.hybrid {
				let mut prefetch = PrefetchQueryBuilder::default()
					.query(Query::new_nearest(Document::new(search.text.clone(), BM25_MODEL)))
					.using(SPARSE_VECTOR_NAME)
					.limit(search.prefetch_limit as u64);

				if let Some(filter) = filter.clone() {
					prefetch = prefetch.filter(filter);
				}

				query = query.add_prefetch(prefetch);
			}
			if let Some(filter) = filter {
				query = query.filter(filter);
			}
			if let Some(threshold) = search.score_threshold {
				query = query.score_threshold(threshold);
			}

			let response = self
				.client
				.query(query)
				.await
				.map_err(|err| Error::Qdrant { message: err.to_string() })?;
			let mut hits = Vec::with_capacity(response.result.len());

			for point in response.result {
				match hit_from_point(point) {
					Some(hit) => hits.push(hit),
					None => tracing::warn!(silo = %search.silo, "Skipping point without an id."),
				}
			}

			Ok(hits)
		})
	}
}

/// Translates a domain filter into Qdrant's must/should form.
///
/// Hard-with-any-of nests the alternatives as one `should` clause under `must`, so a point
/// must match every required condition and at least one alternative.
pub fn to_qdrant_filter(expr: &FilterExpression) -> Filter {
	match expr.semantics() {
		FilterSemantics::Hard => Filter::must(conditions(expr.required())),
		FilterSemantics::Soft => Filter::should(conditions(expr.optional())),
		FilterSemantics::HardAnyOf => {
			let mut must = conditions(expr.required());

			must.push(QdrantCondition::from(Filter::should(conditions(expr.optional()))));

			Filter::must(must)
		},
	}
}

fn conditions(set: &[Condition]) -> Vec<QdrantCondition> {
	set.iter().map(to_qdrant_condition).collect()
}

fn to_qdrant_condition(condition: &Condition) -> QdrantCondition {
	match condition.values() {
		[single] => QdrantCondition::matches(condition.field(), single.clone()),
		values => QdrantCondition::matches(condition.field(), values.to_vec()),
	}
}

fn hit_from_point(point: ScoredPoint) -> Option<SearchHit> {
	let id = point.id.as_ref().and_then(point_id_to_string)?;

	Some(SearchHit { id, score: point.score, payload: payload_to_json(point.payload) })
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

fn payload_to_json(payload: HashMap<String, QdrantValue>) -> Map<String, Value> {
	payload.into_iter().map(|(key, value)| (key, value_to_json(value))).collect()
}

fn value_to_json(value: QdrantValue) -> Value {
	match value.kind {
		None | Some(Kind::NullValue(_)) => Value::Null,
		Some(Kind::BoolValue(flag)) => Value::Bool(flag),
		Some(Kind::IntegerValue(number)) => Value::Number(number.into()),
		Some(Kind::DoubleValue(number)) => Number::from_f64(number).map_or(Value::Null, Value::Number),
		Some(Kind::StringValue(text)) => Value::String(text),
		Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) => Value::Object(payload_to_json(object.fields)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use qdrant_client::qdrant::{condition::ConditionOneOf, r#match::MatchValue};

	fn field_keys(filter: &Filter) -> Vec<(String, Option<MatchValue>)> {
		filter
			.must
			.iter()
			.chain(filter.should.iter())
			.filter_map(|condition| match &condition.condition_one_of {
				Some(ConditionOneOf::Field(field)) => Some((
					field.key.clone(),
					field.r#match.as_ref().and_then(|m| m.match_value.clone()),
				)),
				_ => None,
			})
			.collect()
	}

	#[test]
	fn hard_filter_becomes_must() {
		let expr = FilterExpression::hard(vec![Condition::matches("entidad", "CIUDAD_DE_MEXICO")]);
		let filter = to_qdrant_filter(&expr);

		assert_eq!(filter.must.len(), 1);
		assert!(filter.should.is_empty());
		assert_eq!(
			field_keys(&filter),
			vec![(
				"entidad".to_string(),
				Some(MatchValue::Keyword("CIUDAD_DE_MEXICO".to_string()))
			)]
		);
	}

	#[test]
	fn any_of_values_become_keywords() {
		let expr = FilterExpression::soft(vec![Condition::any_of(
			"tipo_codigo",
			["URBANO", "DESARROLLO_URBANO"],
		)]);
		let filter = to_qdrant_filter(&expr);

		assert!(filter.must.is_empty());
		assert_eq!(filter.should.len(), 1);
		assert!(matches!(
			field_keys(&filter).as_slice(),
			[(key, Some(MatchValue::Keywords(_)))] if key == "tipo_codigo"
		));
	}

	#[test]
	fn hard_any_of_nests_alternatives_under_must() {
		let expr = FilterExpression::hard_with_any_of(
			vec![Condition::matches("entidad", "JALISCO")],
			vec![Condition::matches("tipo_codigo", "URBANO")],
		);
		let filter = to_qdrant_filter(&expr);

		assert_eq!(filter.must.len(), 2);
		assert!(filter.should.is_empty());
		assert!(matches!(filter.must[1].condition_one_of, Some(ConditionOneOf::Filter(_))));
	}

	#[test]
	fn payload_values_convert_to_json() {
		let payload = HashMap::from([
			("ref".to_string(), QdrantValue::from("Art. 1 CPEUM")),
			("anio".to_string(), QdrantValue::from(1917_i64)),
			("vigente".to_string(), QdrantValue::from(true)),
		]);
		let json = payload_to_json(payload);

		assert_eq!(json["ref"], "Art. 1 CPEUM");
		assert_eq!(json["anio"], 1917);
		assert_eq!(json["vigente"], true);
	}
}
