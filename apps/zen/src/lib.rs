use std::path::PathBuf;

use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::eyre;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use zen_service::{
	ChunkRequest, IndexImageRequest, IndexNoteRequest, NoteOutliersRequest, SearchImagesRequest,
	SearchNotesRequest, SimilarNotesRequest, ZenService,
};
use zen_storage::qdrant::QdrantStore;

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE", global = true, default_value = "zen.toml")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Split note text into semantic passages without storing them.
	Chunk {
		#[command(flatten)]
		input: TextInput,
	},
	/// Chunk, embed and store a note, replacing its previous passages.
	IndexNote {
		#[arg(long)]
		note_id: i64,
		#[command(flatten)]
		input: TextInput,
		#[arg(long, default_value = "")]
		title: String,
		#[arg(long = "tag", value_name = "TAG")]
		tags: Vec<String>,
		#[arg(long, default_value = "")]
		updated_at: String,
	},
	DeleteNote {
		#[arg(long)]
		note_id: i64,
	},
	/// Embed and store an image file.
	IndexImage {
		#[arg(long, value_name = "FILE")]
		path: PathBuf,
		#[arg(long)]
		width: Option<u32>,
		#[arg(long)]
		height: Option<u32>,
		#[arg(long)]
		format: Option<String>,
	},
	DeleteImage {
		#[arg(long)]
		filename: String,
	},
	/// Semantic search over note passages, one result per note.
	Search {
		#[arg(long, short = 'q')]
		query: String,
		#[arg(long)]
		limit: Option<u32>,
		#[arg(long)]
		threshold: Option<f32>,
	},
	SearchImages {
		#[arg(long, short = 'q')]
		query: String,
		#[arg(long)]
		limit: Option<u32>,
		#[arg(long)]
		threshold: Option<f32>,
	},
	/// Notes related to a stored note, weighted by its outlier passages.
	Similar {
		#[arg(long)]
		note_id: i64,
		#[arg(long)]
		limit: Option<u32>,
		#[arg(long)]
		threshold: Option<f32>,
	},
	/// Outlier diagnostics for the passages of a stored note.
	Outliers {
		#[arg(long)]
		note_id: i64,
	},
	Health,
}

#[derive(Debug, clap::Args)]
pub struct TextInput {
	/// Note text given inline.
	#[arg(long, conflicts_with = "file")]
	pub text: Option<String>,
	/// Path of a file holding the note text.
	#[arg(long, value_name = "FILE")]
	pub file: Option<PathBuf>,
}
impl TextInput {
	async fn read(self) -> color_eyre::Result<String> {
		match (self.text, self.file) {
			(Some(text), _) => Ok(text),
			(None, Some(path)) => Ok(tokio::fs::read_to_string(&path).await?),
			(None, None) => Err(eyre::eyre!("Provide the note text with --text or --file.")),
		}
	}
}

#[derive(Serialize)]
struct Deleted<'a, T>
where
	T: Serialize,
{
	deleted: &'a T,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = zen_config::load(&args.config)?;
	init_tracing(&config)?;
	tracing::debug!(config = %args.config.display(), "Configuration loaded.");
	let store = QdrantStore::new(&config.storage.qdrant)?;
	let service = ZenService::new(config, store);

	match args.command {
		Command::Chunk { input } => {
			let text = input.read().await?;

			print_json(&service.chunk(ChunkRequest { text }).await?)
		},
		Command::IndexNote { note_id, input, title, tags, updated_at } => {
			let text = input.read().await?;

			service.ensure_collections().await?;

			let response = service
				.index_note(IndexNoteRequest { note_id, text, title, tags, updated_at })
				.await?;

			print_json(&response)
		},
		Command::DeleteNote { note_id } => {
			service.delete_note(note_id).await?;

			print_json(&Deleted { deleted: &note_id })
		},
		Command::IndexImage { path, width, height, format } => {
			service.ensure_collections().await?;

			let response =
				service.index_image(IndexImageRequest { path, width, height, format }).await?;

			print_json(&response)
		},
		Command::DeleteImage { filename } => {
			service.delete_image(&filename).await?;

			print_json(&Deleted { deleted: &filename })
		},
		Command::Search { query, limit, threshold } => {
			let response = service
				.search_notes(SearchNotesRequest { query, limit, score_threshold: threshold })
				.await?;

			print_json(&response)
		},
		Command::SearchImages { query, limit, threshold } => {
			let response = service
				.search_images(SearchImagesRequest { query, limit, score_threshold: threshold })
				.await?;

			print_json(&response)
		},
		Command::Similar { note_id, limit, threshold } => {
			let response = service
				.find_similar_notes(SimilarNotesRequest {
					note_id,
					limit,
					score_threshold: threshold,
				})
				.await?;

			print_json(&response)
		},
		Command::Outliers { note_id } =>
			print_json(&service.note_outliers(NoteOutliersRequest { note_id }).await?),
		Command::Health => print_json(&service.health().await?),
	}
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

fn init_tracing(config: &zen_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
	Ok(())
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn parses_similar_with_overrides() {
		let args = Args::try_parse_from([
			"zen", "-c", "cfg.toml", "similar", "--note-id", "42", "--limit", "5", "--threshold",
			"0.7",
		])
		.expect("Failed to parse arguments.");

		assert_eq!(args.config, PathBuf::from("cfg.toml"));
		match args.command {
			Command::Similar { note_id, limit, threshold } => {
				assert_eq!(note_id, 42);
				assert_eq!(limit, Some(5));
				assert_eq!(threshold, Some(0.7));
			},
			other => panic!("Unexpected command: {other:?}"),
		}
	}

	#[test]
	fn index_note_collects_repeated_tags() {
		let args = Args::try_parse_from([
			"zen", "index-note", "--note-id", "3", "--text", "Hello there.", "--tag", "a", "--tag",
			"b",
		])
		.expect("Failed to parse arguments.");

		match args.command {
			Command::IndexNote { note_id, input, tags, .. } => {
				assert_eq!(note_id, 3);
				assert_eq!(input.text.as_deref(), Some("Hello there."));
				assert_eq!(tags, vec!["a".to_string(), "b".to_string()]);
			},
			other => panic!("Unexpected command: {other:?}"),
		}
	}

	#[test]
	fn text_and_file_conflict() {
		let result = Args::try_parse_from(["zen", "chunk", "--text", "x", "--file", "note.md"]);

		assert!(result.is_err());
	}
}
