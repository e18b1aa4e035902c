mod error;

pub use error::{Error, Result};

use std::{collections::HashSet, env, future::Future, thread, time::Duration};

use qdrant_client::Qdrant;
use tokio::{runtime::Builder, time};
use uuid::Uuid;

/// A pair of uniquely named Qdrant collections, dropped again when the test ends.
pub struct TestCollections {
	qdrant_url: String,
	notes: String,
	images: String,
	cleaned: bool,
}
impl TestCollections {
	pub fn new(qdrant_url: &str) -> Self {
		let suffix = Uuid::new_v4().simple().to_string();

		Self {
			qdrant_url: qdrant_url.to_string(),
			notes: format!("zen_test_notes_{suffix}"),
			images: format!("zen_test_images_{suffix}"),
			cleaned: false,
		}
	}

	pub fn notes(&self) -> &str {
		&self.notes
	}

	pub fn images(&self) -> &str {
		&self.images
	}

	/// Storage config pointing at the test collections.
	pub fn qdrant_config(&self, text_vector_dim: u32, image_vector_dim: u32) -> zen_config::Qdrant {
		zen_config::Qdrant {
			url: self.qdrant_url.clone(),
			api_key: None,
			notes_collection: self.notes.clone(),
			images_collection: self.images.clone(),
			text_vector_dim,
			image_vector_dim,
		}
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner().await
	}

	async fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		cleanup_qdrant_collections(&self.qdrant_url, &[self.notes.clone(), self.images.clone()])
			.await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestCollections {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let qdrant_url = self.qdrant_url.clone();
		let collections = vec![self.notes.clone(), self.images.clone()];
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test collection cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) =
				runtime.block_on(cleanup_qdrant_collections(&qdrant_url, &collections))
			{
				eprintln!("Test Qdrant cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("ZEN_QDRANT_URL").ok()
}

pub async fn with_test_collections<F, Fut, T>(qdrant_url: &str, f: F) -> Result<T>
where
	F: FnOnce(&TestCollections) -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let collections = TestCollections::new(qdrant_url);
	let result = f(&collections).await;
	let mut collections = collections;

	if let Err(err) = collections.cleanup_inner().await {
		eprintln!("Test collection cleanup warning: {err}.");

		if result.is_ok() {
			return Err(err);
		}
	}

	result
}

async fn cleanup_qdrant_collections(qdrant_url: &str, collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let client = Qdrant::from_url(qdrant_url)
		.build()
		.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;
	let max_attempts = 6;
	let mut remaining = collections.iter().cloned().collect::<HashSet<_>>();
	let mut backoff = Duration::from_millis(100);

	for attempt in 1..=max_attempts {
		let existing = time::timeout(Duration::from_secs(10), client.list_collections())
			.await
			.map_err(|_| Error::Message("Qdrant list_collections timed out.".to_string()))?
			.map_err(|err| Error::Message(format!("Failed to list Qdrant collections: {err}.")))?;
		let existing = existing.collections.into_iter().map(|c| c.name).collect::<HashSet<_>>();

		remaining.retain(|collection| existing.contains(collection));

		if remaining.is_empty() {
			return Ok(());
		}

		for collection in remaining.iter().cloned().collect::<Vec<_>>() {
			let result = time::timeout(
				Duration::from_secs(10),
				client.delete_collection(collection.clone()),
			)
			.await;

			match result {
				Ok(Ok(_)) => {},
				Ok(Err(err)) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Failed to delete Qdrant collection {collection:?} after {attempt} attempts: {err}."
						)));
					},
				Err(_) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Timed out deleting Qdrant collection {collection:?} after {attempt} attempts."
						)));
					},
			}
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn collection_names_are_unique_and_distinct() {
		let mut first = TestCollections::new("http://127.0.0.1:6334");
		let mut second = TestCollections::new("http://127.0.0.1:6334");

		assert_ne!(first.notes(), first.images());
		assert_ne!(first.notes(), second.notes());

		let cfg = first.qdrant_config(8, 4);

		assert_eq!(cfg.notes_collection, first.notes());
		assert_eq!(cfg.image_vector_dim, 4);

		first.cleaned = true;
		second.cleaned = true;
	}
}
