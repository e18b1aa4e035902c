mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, Outliers, Providers, Qdrant, Search, Service,
	Similarity, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse_at(&raw, path)
}

/// Parses an in-memory TOML document with the same normalization and validation as [`load`].
pub fn parse(raw: &str) -> Result<Config> {
	parse_at(raw, Path::new("<inline>"))
}

fn parse_at(raw: &str, path: &Path) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	let qdrant = &cfg.storage.qdrant;

	if qdrant.url.trim().is_empty() {
		return Err(Error::validation("storage.qdrant.url", "must be non-empty."));
	}

	for (label, value) in [
		("storage.qdrant.notes_collection", &qdrant.notes_collection),
		("storage.qdrant.images_collection", &qdrant.images_collection),
	] {
		if value.trim().is_empty() {
			return Err(Error::validation(label, "must be non-empty."));
		}
	}

	if qdrant.notes_collection == qdrant.images_collection {
		return Err(Error::validation(
			"storage.qdrant.images_collection",
			"must differ from storage.qdrant.notes_collection.",
		));
	}
	if qdrant.text_vector_dim == 0 {
		return Err(Error::validation(
			"storage.qdrant.text_vector_dim",
			"must be greater than zero.",
		));
	}
	if qdrant.image_vector_dim == 0 {
		return Err(Error::validation(
			"storage.qdrant.image_vector_dim",
			"must be greater than zero.",
		));
	}

	for (label, provider, expected_dim) in [
		("providers.text_embedding", &cfg.providers.text_embedding, qdrant.text_vector_dim),
		("providers.image_embedding", &cfg.providers.image_embedding, qdrant.image_vector_dim),
		(
			"providers.image_query_embedding",
			&cfg.providers.image_query_embedding,
			qdrant.image_vector_dim,
		),
	] {
		if provider.api_key.trim().is_empty() {
			return Err(Error::validation(label, "api_key must be non-empty."));
		}
		if provider.api_base.trim().is_empty() {
			return Err(Error::validation(label, "api_base must be non-empty."));
		}
		if provider.timeout_ms == 0 {
			return Err(Error::validation(label, "timeout_ms must be greater than zero."));
		}
		if provider.dimensions != expected_dim {
			return Err(Error::validation(
				label,
				"dimensions must match the vector_dim of the collection it feeds.",
			));
		}
	}

	let chunking = &cfg.chunking;

	if !chunking.break_threshold.is_finite() || !(-1.0..=1.0).contains(&chunking.break_threshold) {
		return Err(Error::validation(
			"chunking.break_threshold",
			"must be a finite number in the range -1.0-1.0.",
		));
	}
	if chunking.min_sentences == 0 {
		return Err(Error::validation("chunking.min_sentences", "must be greater than zero."));
	}
	if chunking.min_sentences > chunking.max_sentences {
		return Err(Error::validation(
			"chunking.min_sentences",
			"must be less than or equal to chunking.max_sentences.",
		));
	}

	let outliers = &cfg.outliers;

	if !outliers.eps.is_finite() || outliers.eps <= 0.0 || outliers.eps > 2.0 {
		return Err(Error::validation("outliers.eps", "must be in the range (0.0, 2.0]."));
	}
	if outliers.min_samples == 0 {
		return Err(Error::validation("outliers.min_samples", "must be greater than zero."));
	}
	if outliers.min_passages == 0 {
		return Err(Error::validation("outliers.min_passages", "must be greater than zero."));
	}
	if !outliers.score_threshold.is_finite() || !(0.0..=2.0).contains(&outliers.score_threshold) {
		return Err(Error::validation(
			"outliers.score_threshold",
			"must be a finite number in the range 0.0-2.0.",
		));
	}

	let similarity = &cfg.similarity;

	for (label, value) in [
		("similarity.default_limit", similarity.default_limit),
		("similarity.overfetch_factor", similarity.overfetch_factor),
		("similarity.outlier_weight", similarity.outlier_weight),
		("similarity.max_source_passages", similarity.max_source_passages),
		("search.default_limit", cfg.search.default_limit),
	] {
		if value == 0 {
			return Err(Error::validation(label, "must be greater than zero."));
		}
	}

	for (label, value) in [
		("similarity.default_threshold", similarity.default_threshold),
		("search.note_score_threshold", cfg.search.note_score_threshold),
		("search.image_score_threshold", cfg.search.image_score_threshold),
	] {
		if !value.is_finite() {
			return Err(Error::validation(label, "must be a finite number."));
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.api_key = None;
	}
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
