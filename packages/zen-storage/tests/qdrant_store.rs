use zen_storage::{
	models::{ImagePayload, PassagePayload, StoredImage, image_id_for},
	qdrant::QdrantStore,
};
use zen_testkit::{Error, env_qdrant_url, with_test_collections};

fn passage(note_id: i64, chunk_index: i32, text: &str) -> PassagePayload {
	PassagePayload {
		note_id,
		chunk_index,
		text: text.to_string(),
		title: format!("Note {note_id}"),
		tags: vec!["test".to_string()],
		updated_at: "2024-01-01T00:00:00Z".to_string(),
	}
}

fn storage_error(err: zen_storage::Error) -> Error {
	Error::Message(err.to_string())
}

#[tokio::test]
#[ignore = "Requires external Qdrant. Set ZEN_QDRANT_URL to run."]
async fn passages_round_trip_through_qdrant() {
	let Some(qdrant_url) = env_qdrant_url() else {
		eprintln!("Skipping passages_round_trip_through_qdrant; set ZEN_QDRANT_URL to run.");

		return;
	};

	with_test_collections(&qdrant_url, |collections| {
		let cfg = collections.qdrant_config(3, 2);

		async move {
			let store = QdrantStore::new(&cfg).map_err(storage_error)?;

			store.ensure_collections().await.map_err(storage_error)?;
			store
				.upsert_passages(&[
					(passage(1, 0, "alpha"), vec![1.0, 0.0, 0.0]),
					(passage(1, 1, "beta"), vec![0.0, 1.0, 0.0]),
					(passage(2, 0, "gamma"), vec![0.9, 0.1, 0.0]),
				])
				.await
				.map_err(storage_error)?;

			let stored = store.scroll_note_passages(1, 100).await.map_err(storage_error)?;

			assert_eq!(stored.len(), 2);
			assert_eq!(stored[0].payload.text, "alpha");
			assert_eq!(stored[1].vector.as_deref(), Some(&[0.0, 1.0, 0.0][..]));

			let hits =
				store.search_passages(&[1.0, 0.0, 0.0], 10, 0.5).await.map_err(storage_error)?;
			let notes = hits.iter().map(|hit| hit.payload.note_id).collect::<Vec<_>>();

			assert_eq!(notes, vec![1, 2]);

			store.delete_note_passages(1).await.map_err(storage_error)?;

			let stored = store.scroll_note_passages(1, 100).await.map_err(storage_error)?;

			assert!(stored.is_empty());

			Ok(())
		}
	})
	.await
	.expect("Qdrant round trip failed.");
}

#[tokio::test]
#[ignore = "Requires external Qdrant. Set ZEN_QDRANT_URL to run."]
async fn images_upsert_search_and_delete() {
	let Some(qdrant_url) = env_qdrant_url() else {
		eprintln!("Skipping images_upsert_search_and_delete; set ZEN_QDRANT_URL to run.");

		return;
	};

	with_test_collections(&qdrant_url, |collections| {
		let cfg = collections.qdrant_config(3, 2);

		async move {
			let store = QdrantStore::new(&cfg).map_err(storage_error)?;
			let image = StoredImage {
				image_id: image_id_for("cat.png"),
				vector: vec![1.0, 0.0],
				payload: ImagePayload {
					filename: "cat.png".to_string(),
					width: Some(4),
					height: Some(2),
					aspect_ratio: Some(2.0),
					file_size: Some(64),
					format: Some("png".to_string()),
				},
			};

			store.ensure_collections().await.map_err(storage_error)?;
			store.upsert_image(&image).await.map_err(storage_error)?;

			let hits = store.search_images(&[1.0, 0.0], 5, 0.25).await.map_err(storage_error)?;

			assert_eq!(hits.len(), 1);
			assert_eq!(hits[0].payload, image.payload);

			store.delete_image("cat.png").await.map_err(storage_error)?;

			let hits = store.search_images(&[1.0, 0.0], 5, 0.25).await.map_err(storage_error)?;

			assert!(hits.is_empty());

			Ok(())
		}
	})
	.await
	.expect("Qdrant image round trip failed.");
}
