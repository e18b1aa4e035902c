use std::{
	io::ErrorKind,
	path::{Path, PathBuf},
	time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Embeds texts through an OpenAI-compatible `/embeddings` endpoint, one vector per input in
/// input order.
pub async fn embed(
	cfg: &zen_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let inputs = texts.iter().map(|text| Value::from(text.as_str())).collect();

	request_embeddings(cfg, inputs, texts.len()).await
}

/// Embeds image files into the image space. Each file is sent inline as a base64 data URI.
pub async fn embed_images(
	cfg: &zen_config::EmbeddingProviderConfig,
	paths: &[PathBuf],
) -> Result<Vec<Vec<f32>>> {
	if paths.is_empty() {
		return Ok(Vec::new());
	}

	let mut inputs = Vec::with_capacity(paths.len());

	for path in paths {
		inputs.push(serde_json::json!({ "image": image_data_uri(path).await? }));
	}

	request_embeddings(cfg, inputs, paths.len()).await
}

async fn request_embeddings(
	cfg: &zen_config::EmbeddingProviderConfig,
	inputs: Vec<Value>,
	expected: usize,
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": inputs,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json)?;

	if vectors.len() != expected {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding provider returned {} vectors for {expected} inputs.",
				vectors.len()
			),
		});
	}

	for vector in &vectors {
		if vector.len() != cfg.dimensions as usize {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding dimension {} does not match configured dimensions {}.",
					vector.len(),
					cfg.dimensions
				),
			});
		}
	}

	tracing::debug!(
		provider = %cfg.provider_id,
		model = %cfg.model,
		count = expected,
		"Embedded inputs."
	);

	Ok(vectors)
}

async fn image_data_uri(path: &Path) -> Result<String> {
	let bytes = tokio::fs::read(path).await.map_err(|err| match err.kind() {
		ErrorKind::NotFound => Error::MissingImage { path: path.to_path_buf() },
		_ => Error::ReadImage { path: path.to_path_buf(), source: err },
	})?;

	Ok(format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes)))
}

fn image_mime(path: &Path) -> &'static str {
	let ext = path
		.extension()
		.and_then(|ext| ext.to_str())
		.map(|ext| ext.to_ascii_lowercase())
		.unwrap_or_default();

	match ext.as_str() {
		"png" => "image/png",
		"jpg" | "jpeg" => "image/jpeg",
		"gif" => "image/gif",
		"webp" => "image/webp",
		"bmp" => "image/bmp",
		_ => "application/octet-stream",
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			}
		})?;
		let vec = embedding
			.iter()
			.map(|value| {
				value.as_f64().map(|number| number as f32).ok_or_else(|| Error::InvalidResponse {
					message: "Embedding value must be numeric.".to_string(),
				})
			})
			.collect::<Result<Vec<f32>>>()?;

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	if let Some((position, (index, _))) =
		indexed.iter().enumerate().find(|(position, (index, _))| position != index)
	{
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding index {index} at position {position} breaks the 0..{} sequence.",
				indexed.len()
			),
		});
	}

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn rejects_duplicate_or_out_of_range_indices() {
		let duplicate = serde_json::json!({
			"data": [
				{ "index": 0, "embedding": [1.0] },
				{ "index": 0, "embedding": [2.0] }
			]
		});
		let out_of_range = serde_json::json!({
			"data": [
				{ "index": 0, "embedding": [1.0] },
				{ "index": 2, "embedding": [2.0] }
			]
		});

		assert!(matches!(parse_embedding_response(duplicate), Err(Error::InvalidResponse { .. })));
		assert!(matches!(
			parse_embedding_response(out_of_range),
			Err(Error::InvalidResponse { .. })
		));
	}

	#[test]
	fn rejects_non_numeric_components() {
		let json = serde_json::json!({ "data": [{ "index": 0, "embedding": ["x"] }] });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn rejects_missing_data() {
		let json = serde_json::json!({ "error": "overloaded" });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn maps_extensions_to_mime_types() {
		assert_eq!(image_mime(Path::new("a/b/photo.JPG")), "image/jpeg");
		assert_eq!(image_mime(Path::new("scan.webp")), "image/webp");
		assert_eq!(image_mime(Path::new("blob")), "application/octet-stream");
	}

	#[tokio::test]
	async fn missing_image_file_is_reported() {
		let path = std::env::temp_dir().join("zen_providers_missing_image.png");
		let err = image_data_uri(&path).await.expect_err("Expected a missing image error.");

		assert!(matches!(err, Error::MissingImage { .. }));
	}
}
