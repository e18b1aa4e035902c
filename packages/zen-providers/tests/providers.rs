use serde_json::{Map, Value};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpListener,
	task::JoinHandle,
};

use zen_config::EmbeddingProviderConfig;
use zen_providers::{Error, embedding};

/// Serves exactly one HTTP request with `body` and hands back the raw request text.
async fn serve_once(body: Value) -> (String, JoinHandle<String>) {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind listener.");
	let addr = listener.local_addr().expect("Failed to read listener address.");
	let handle = tokio::spawn(async move {
		let (mut socket, _) = listener.accept().await.expect("Failed to accept connection.");
		let request = read_request(&mut socket).await;
		let payload = body.to_string();
		let response = format!(
			"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
			payload.len()
		);

		socket.write_all(response.as_bytes()).await.expect("Failed to write response.");
		socket.shutdown().await.ok();

		request
	});

	(format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
	let mut raw = Vec::new();
	let mut buf = [0_u8; 4_096];

	loop {
		let n = socket.read(&mut buf).await.expect("Failed to read request.");

		if n == 0 {
			break;
		}

		raw.extend_from_slice(&buf[..n]);

		let text = String::from_utf8_lossy(&raw);

		if let Some(header_end) = text.find("\r\n\r\n") {
			let content_length = text[..header_end]
				.lines()
				.find_map(|line| {
					let (name, value) = line.split_once(':')?;

					name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse().ok())?
				})
				.unwrap_or(0_usize);

			if raw.len() >= header_end + 4 + content_length {
				break;
			}
		}
	}

	String::from_utf8_lossy(&raw).into_owned()
}

fn provider(api_base: &str, dimensions: u32) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base: api_base.to_string(),
		api_key: "secret".to_string(),
		path: "/v1/embeddings".to_string(),
		model: "test-model".to_string(),
		dimensions,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

#[tokio::test]
async fn embeds_texts_in_input_order() {
	let (base, server) = serve_once(serde_json::json!({
		"data": [
			{ "index": 1, "embedding": [0.0, 1.0] },
			{ "index": 0, "embedding": [1.0, 0.0] }
		]
	}))
	.await;
	let texts = ["first".to_string(), "second".to_string()];
	let vectors =
		embedding::embed(&provider(&base, 2), &texts).await.expect("Embedding failed.");
	let request = server.await.expect("Server task failed.");

	assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
	assert!(request.starts_with("POST /v1/embeddings"));
	assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
	assert!(request.contains("\"model\":\"test-model\""));
}

#[tokio::test]
async fn vector_count_mismatch_is_an_error() {
	let (base, server) =
		serve_once(serde_json::json!({ "data": [{ "index": 0, "embedding": [1.0, 0.0] }] })).await;
	let err = embedding::embed(&provider(&base, 2), &["a".to_string(), "b".to_string()])
		.await
		.expect_err("Expected a count mismatch.");

	server.await.expect("Server task failed.");

	assert!(matches!(err, Error::InvalidResponse { .. }));
}

#[tokio::test]
async fn dimension_mismatch_is_an_error() {
	let (base, server) =
		serve_once(serde_json::json!({ "data": [{ "index": 0, "embedding": [1.0, 0.0, 0.0] }] }))
			.await;
	let err = embedding::embed(&provider(&base, 2), &["a".to_string()])
		.await
		.expect_err("Expected a dimension mismatch.");

	server.await.expect("Server task failed.");

	assert!(matches!(err, Error::InvalidResponse { .. }));
}

#[tokio::test]
async fn empty_input_makes_no_request() {
	// Nothing listens on this address; a request would fail.
	let vectors = embedding::embed(&provider("http://127.0.0.1:9", 2), &[])
		.await
		.expect("Empty input must not call the provider.");

	assert!(vectors.is_empty());
}

#[tokio::test]
async fn images_are_sent_as_data_uris() {
	let path = std::env::temp_dir().join(format!("zen_providers_{}.png", std::process::id()));

	tokio::fs::write(&path, [0x89_u8, b'P', b'N', b'G']).await.expect("Failed to write image.");

	let (base, server) =
		serve_once(serde_json::json!({ "data": [{ "index": 0, "embedding": [0.6, 0.8] }] })).await;
	let vectors = embedding::embed_images(&provider(&base, 2), std::slice::from_ref(&path))
		.await
		.expect("Image embedding failed.");
	let request = server.await.expect("Server task failed.");

	tokio::fs::remove_file(&path).await.ok();

	assert_eq!(vectors, vec![vec![0.6, 0.8]]);
	assert!(request.contains("data:image/png;base64,iVBORw=="));
}
