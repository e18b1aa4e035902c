use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload stored with every note passage point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassagePayload {
	pub note_id: i64,
	pub chunk_index: i32,
	pub text: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub updated_at: String,
}

#[derive(Clone, Debug)]
pub struct StoredPassage {
	pub passage_id: Uuid,
	/// `None` when the point was read without vectors or carries no dense vector.
	pub vector: Option<Vec<f32>>,
	pub payload: PassagePayload,
}

#[derive(Clone, Debug)]
pub struct PassageHit {
	pub passage_id: Uuid,
	pub score: f32,
	pub payload: PassagePayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
	pub filename: String,
	pub width: Option<u32>,
	pub height: Option<u32>,
	#[serde(rename = "aspectRatio")]
	pub aspect_ratio: Option<f32>,
	#[serde(rename = "fileSize")]
	pub file_size: Option<u64>,
	pub format: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StoredImage {
	pub image_id: Uuid,
	pub vector: Vec<f32>,
	pub payload: ImagePayload,
}

#[derive(Clone, Debug)]
pub struct ImageHit {
	pub image_id: Uuid,
	pub score: f32,
	pub payload: ImagePayload,
}

/// Point id of a note passage. Stable across re-indexing of the same note.
pub fn passage_id_for(note_id: i64, chunk_index: i32) -> Uuid {
	let name = format!("{note_id}:{chunk_index}");

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Point id of an image, derived from its filename.
pub fn image_id_for(filename: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("image:{filename}").as_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn passage_ids_are_stable_and_distinct() {
		assert_eq!(passage_id_for(7, 0), passage_id_for(7, 0));
		assert_ne!(passage_id_for(7, 0), passage_id_for(7, 1));
		assert_ne!(passage_id_for(7, 1), passage_id_for(71, 0));
	}

	#[test]
	fn passage_payload_tolerates_missing_metadata() {
		let raw = serde_json::json!({ "note_id": 3, "chunk_index": 1, "text": "t" });
		let payload: PassagePayload = serde_json::from_value(raw).expect("payload decode failed");

		assert_eq!(payload.title, "");
		assert!(payload.tags.is_empty());
	}
}
