use serde::{Deserialize, Serialize};

use crate::{Result, ZenService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub vector_store_version: String,
}

impl ZenService {
	pub async fn health(&self) -> Result<HealthResponse> {
		let vector_store_version = self.store.health_check().await?;

		Ok(HealthResponse { status: "ok".to_string(), vector_store_version })
	}
}
