use std::{io::ErrorKind, path::PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zen_storage::models::{ImagePayload, StoredImage, image_id_for};

use crate::{Error, Result, ZenService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexImageRequest {
	pub path: PathBuf,
	/// Pixel dimensions, when the caller knows them.
	pub width: Option<u32>,
	pub height: Option<u32>,
	/// Defaults to the lowercased file extension.
	pub format: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexImageResponse {
	pub image_id: Uuid,
	pub payload: ImagePayload,
}

impl ZenService {
	/// Embeds an image file and replaces the point stored for its filename.
	pub async fn index_image(&self, req: IndexImageRequest) -> Result<IndexImageResponse> {
		let filename = image_filename(&req.path)?;
		let metadata = match tokio::fs::metadata(&req.path).await {
			Ok(metadata) => metadata,
			Err(err) if err.kind() == ErrorKind::NotFound => {
				return Err(Error::InvalidRequest {
					message: format!("Image not found at {:?}.", req.path),
				});
			},
			Err(err) => {
				return Err(Error::Storage {
					message: format!("Failed to read image metadata at {:?}: {err}.", req.path),
				});
			},
		};
		let paths = [req.path.clone()];
		let vectors =
			self.embedding.embed_images(&self.cfg.providers.image_embedding, &paths).await?;
		let [vector]: [Vec<f32>; 1] = vectors.try_into().map_err(|_| Error::Provider {
			message: "Embedding provider did not return exactly one image vector.".to_string(),
		})?;
		let format = req.format.or_else(|| {
			req.path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
		});
		let aspect_ratio = match (req.width, req.height) {
			(Some(width), Some(height)) if height > 0 => Some(width as f32 / height as f32),
			_ => None,
		};
		let payload = ImagePayload {
			filename: filename.clone(),
			width: req.width,
			height: req.height,
			aspect_ratio,
			file_size: Some(metadata.len()),
			format,
		};
		let image = StoredImage { image_id: image_id_for(&filename), vector, payload };

		self.store.upsert_image(&image).await?;

		tracing::info!(filename = %filename, image_id = %image.image_id, "Indexed image.");

		Ok(IndexImageResponse { image_id: image.image_id, payload: image.payload })
	}

	pub async fn delete_image(&self, filename: &str) -> Result<()> {
		if filename.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "filename must not be empty.".to_string(),
			});
		}

		self.store.delete_image(filename).await?;

		tracing::info!(filename, "Deleted image.");

		Ok(())
	}
}

fn image_filename(path: &std::path::Path) -> Result<String> {
	path.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.filter(|name| !name.is_empty())
		.ok_or_else(|| Error::InvalidRequest {
			message: format!("Image path {path:?} has no file name."),
		})
}
