use std::collections::HashMap;

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId,
		PointStruct, PointsIdsList, Query, QueryPointsBuilder, RetrievedPoint, ScoredPoint,
		ScrollPointsBuilder, UpsertPointsBuilder, Value, VectorOutput, VectorParamsBuilder,
		VectorsOutput, point_id::PointIdOptions, value::Kind, vector_output,
		vectors_output::VectorsOptions,
	},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Number, Value as JsonValue};
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{
		ImageHit, ImagePayload, PassageHit, PassagePayload, StoredImage, StoredPassage,
		image_id_for, passage_id_for,
	},
};

pub struct QdrantStore {
	pub client: Qdrant,
	pub notes_collection: String,
	pub images_collection: String,
	pub text_vector_dim: u32,
	pub image_vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &zen_config::Qdrant) -> Result<Self> {
		let mut builder = Qdrant::from_url(&cfg.url);

		if let Some(api_key) = cfg.api_key.as_deref() {
			builder = builder.api_key(api_key);
		}

		let client = builder.build()?;

		Ok(Self {
			client,
			notes_collection: cfg.notes_collection.clone(),
			images_collection: cfg.images_collection.clone(),
			text_vector_dim: cfg.text_vector_dim,
			image_vector_dim: cfg.image_vector_dim,
		})
	}

	/// Creates the passage and image collections when they are missing.
	pub async fn ensure_collections(&self) -> Result<()> {
		self.ensure_collection(&self.notes_collection, self.text_vector_dim).await?;
		self.ensure_collection(&self.images_collection, self.image_vector_dim).await?;

		Ok(())
	}

	pub async fn health_check(&self) -> Result<String> {
		let reply = self.client.health_check().await?;

		Ok(reply.version)
	}

	/// Nearest passages to `vector` scoring at least `score_threshold`, best first.
	pub async fn search_passages(
		&self,
		vector: &[f32],
		limit: u32,
		score_threshold: f32,
	) -> Result<Vec<PassageHit>> {
		check_dim(vector, self.text_vector_dim)?;

		let points = self
			.query_nearest(&self.notes_collection, vector, limit, score_threshold)
			.await?;
		let mut hits = Vec::with_capacity(points.len());

		for point in points {
			let Some(passage_id) = point.id.as_ref().and_then(point_id_to_uuid) else {
				tracing::warn!("Skipping passage hit without a UUID point id.");

				continue;
			};
			let payload = decode_payload::<PassagePayload>(&passage_id, &point.payload)?;

			hits.push(PassageHit { passage_id, score: point.score, payload });
		}

		Ok(hits)
	}

	/// All stored passages of one note, vectors included, ordered by chunk index.
	pub async fn scroll_note_passages(
		&self,
		note_id: i64,
		limit: u32,
	) -> Result<Vec<StoredPassage>> {
		let scroll = ScrollPointsBuilder::new(self.notes_collection.clone())
			.filter(Filter::must([Condition::matches("note_id", note_id)]))
			.limit(limit)
			.with_payload(true)
			.with_vectors(true);
		let response = self.client.scroll(scroll).await?;
		let mut passages = Vec::with_capacity(response.result.len());

		for point in response.result {
			passages.push(stored_passage(point)?);
		}

		passages.sort_by_key(|passage| passage.payload.chunk_index);

		Ok(passages)
	}

	pub async fn upsert_passages(
		&self,
		passages: &[(PassagePayload, Vec<f32>)],
	) -> Result<Vec<Uuid>> {
		if passages.is_empty() {
			return Ok(Vec::new());
		}

		let mut points = Vec::with_capacity(passages.len());
		let mut ids = Vec::with_capacity(passages.len());

		for (payload, vector) in passages {
			check_dim(vector, self.text_vector_dim)?;

			let passage_id = passage_id_for(payload.note_id, payload.chunk_index);

			points.push(PointStruct::new(
				passage_id.to_string(),
				vector.clone(),
				Payload::from(payload_fields(payload)?),
			));
			ids.push(passage_id);
		}

		let upsert = UpsertPointsBuilder::new(self.notes_collection.clone(), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(ids)
	}

	pub async fn delete_note_passages(&self, note_id: i64) -> Result<()> {
		let filter = Filter::must([Condition::matches("note_id", note_id)]);
		let delete =
			DeletePointsBuilder::new(self.notes_collection.clone()).points(filter).wait(true);

		match self.client.delete_points(delete).await {
			Ok(_) => {},
			Err(err) =>
				if is_not_found_error(&err) {
					tracing::info!(note_id, "Qdrant points missing during delete.");
				} else {
					return Err(err.into());
				},
		}

		Ok(())
	}

	pub async fn search_images(
		&self,
		vector: &[f32],
		limit: u32,
		score_threshold: f32,
	) -> Result<Vec<ImageHit>> {
		check_dim(vector, self.image_vector_dim)?;

		let points = self
			.query_nearest(&self.images_collection, vector, limit, score_threshold)
			.await?;
		let mut hits = Vec::with_capacity(points.len());

		for point in points {
			let Some(image_id) = point.id.as_ref().and_then(point_id_to_uuid) else {
				tracing::warn!("Skipping image hit without a UUID point id.");

				continue;
			};
			let payload = decode_payload::<ImagePayload>(&image_id, &point.payload)?;

			hits.push(ImageHit { image_id, score: point.score, payload });
		}

		Ok(hits)
	}

	pub async fn upsert_image(&self, image: &StoredImage) -> Result<()> {
		check_dim(&image.vector, self.image_vector_dim)?;

		let point = PointStruct::new(
			image.image_id.to_string(),
			image.vector.clone(),
			Payload::from(payload_fields(&image.payload)?),
		);
		let upsert =
			UpsertPointsBuilder::new(self.images_collection.clone(), vec![point]).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn delete_image(&self, filename: &str) -> Result<()> {
		let ids = PointsIdsList { ids: vec![PointId::from(image_id_for(filename).to_string())] };
		let delete =
			DeletePointsBuilder::new(self.images_collection.clone()).points(ids).wait(true);

		match self.client.delete_points(delete).await {
			Ok(_) => {},
			Err(err) =>
				if is_not_found_error(&err) {
					tracing::info!(filename, "Qdrant image point missing during delete.");
				} else {
					return Err(err.into());
				},
		}

		Ok(())
	}

	async fn ensure_collection(&self, name: &str, dim: u32) -> Result<()> {
		if self.client.collection_exists(name).await? {
			return Ok(());
		}

		let create = CreateCollectionBuilder::new(name)
			.vectors_config(VectorParamsBuilder::new(u64::from(dim), Distance::Cosine));

		self.client.create_collection(create).await?;

		tracing::info!(collection = name, dim, "Created Qdrant collection.");

		Ok(())
	}

	async fn query_nearest(
		&self,
		collection: &str,
		vector: &[f32],
		limit: u32,
		score_threshold: f32,
	) -> Result<Vec<ScoredPoint>> {
		let query = QueryPointsBuilder::new(collection)
			.query(Query::new_nearest(vector.to_vec()))
			.limit(u64::from(limit))
			.score_threshold(score_threshold)
			.with_payload(true);
		let response = self.client.query(query).await?;

		Ok(response.result)
	}
}

fn check_dim(vector: &[f32], expected: u32) -> Result<()> {
	if vector.len() != expected as usize {
		return Err(Error::InvalidArgument(format!(
			"Vector has {} dimensions; collection expects {expected}.",
			vector.len()
		)));
	}

	Ok(())
}

fn stored_passage(point: RetrievedPoint) -> Result<StoredPassage> {
	let Some(passage_id) = point.id.as_ref().and_then(point_id_to_uuid) else {
		return Err(Error::MalformedPoint {
			point_id: format!("{:?}", point.id),
			message: "Point id is not a UUID.".to_string(),
		});
	};
	let payload = decode_payload::<PassagePayload>(&passage_id, &point.payload)?;
	let vector = point.vectors.as_ref().and_then(dense_vector);

	Ok(StoredPassage { passage_id, vector, payload })
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

#[allow(deprecated)]
fn dense_vector(vectors: &VectorsOutput) -> Option<Vec<f32>> {
	let Some(VectorsOptions::Vector(output)) = &vectors.vectors_options else {
		return None;
	};
	let VectorOutput { data, vector, .. } = output;
	let data = match vector {
		Some(vector_output::Vector::Dense(dense)) => dense.data.clone(),
		Some(_) => return None,
		None => data.clone(),
	};

	(!data.is_empty()).then_some(data)
}

fn payload_fields<T>(payload: &T) -> Result<HashMap<String, Value>>
where
	T: Serialize,
{
	let JsonValue::Object(fields) = serde_json::to_value(payload)? else {
		return Err(Error::InvalidArgument("Payload must serialize to an object.".to_string()));
	};

	Ok(fields.into_iter().map(|(key, value)| (key, Value::from(value))).collect())
}

fn decode_payload<T>(point_id: &Uuid, payload: &HashMap<String, Value>) -> Result<T>
where
	T: DeserializeOwned,
{
	let fields = payload
		.iter()
		.map(|(key, value)| (key.clone(), kind_to_json(value.kind.as_ref())))
		.collect::<Map<String, JsonValue>>();

	serde_json::from_value(JsonValue::Object(fields)).map_err(|err| Error::MalformedPoint {
		point_id: point_id.to_string(),
		message: format!("Payload does not decode: {err}."),
	})
}

fn kind_to_json(kind: Option<&Kind>) -> JsonValue {
	match kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(value)) => JsonValue::Bool(*value),
		Some(Kind::IntegerValue(value)) => JsonValue::from(*value),
		Some(Kind::DoubleValue(value)) =>
			Number::from_f64(*value).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(value)) => JsonValue::String(value.clone()),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.iter().map(|v| kind_to_json(v.kind.as_ref())).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object
				.fields
				.iter()
				.map(|(key, value)| (key.clone(), kind_to_json(value.kind.as_ref())))
				.collect(),
		),
	}
}

fn is_not_found_error(err: &qdrant_client::QdrantError) -> bool {
	let message = err.to_string().to_lowercase();
	let point_not_found =
		(message.contains("not found") || message.contains("404")) && message.contains("point");
	let no_point_found = message.contains("no point") && message.contains("found");

	point_not_found || no_point_found
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_payload() -> PassagePayload {
		PassagePayload {
			note_id: 42,
			chunk_index: 3,
			text: "Second passage.".to_string(),
			title: "Trip".to_string(),
			tags: vec!["travel".to_string(), "notes".to_string()],
			updated_at: "2024-05-01T10:00:00Z".to_string(),
		}
	}

	#[test]
	fn passage_payload_survives_qdrant_values() {
		let payload = sample_payload();
		let map = payload_fields(&payload).expect("encode failed");
		let decoded: PassagePayload = decode_payload(&Uuid::nil(), &map).expect("decode failed");

		assert_eq!(decoded, payload);
		assert!(matches!(map["note_id"].kind, Some(Kind::IntegerValue(42))));
	}

	#[test]
	fn image_payload_uses_camel_case_keys() {
		let payload = ImagePayload {
			filename: "cat.png".to_string(),
			width: Some(640),
			height: Some(480),
			aspect_ratio: Some(1.5),
			file_size: Some(1024),
			format: Some("png".to_string()),
		};
		let map = payload_fields(&payload).expect("encode failed");

		assert!(map.contains_key("aspectRatio"));
		assert!(map.contains_key("fileSize"));

		let decoded: ImagePayload = decode_payload(&Uuid::nil(), &map).expect("decode failed");

		assert_eq!(decoded, payload);
	}

	#[test]
	fn malformed_payload_is_reported() {
		let mut map = HashMap::new();

		map.insert("note_id".to_string(), Value::from("not a number".to_string()));

		let err = decode_payload::<PassagePayload>(&Uuid::nil(), &map).unwrap_err();

		assert!(matches!(err, Error::MalformedPoint { .. }));
	}

	#[test]
	fn dimension_check_rejects_wrong_length() {
		assert!(check_dim(&[0.1, 0.2, 0.3], 3).is_ok());
		assert!(matches!(check_dim(&[0.1, 0.2], 3), Err(Error::InvalidArgument(_))));
	}
}
