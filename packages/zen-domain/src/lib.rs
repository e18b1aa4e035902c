pub mod outlier;
pub mod similarity;
pub mod vector;

pub use outlier::{OutlierConfig, OutlierRecord, PassageEmbedding, detect_outliers, outlier_ids};
pub use similarity::{
	DEFAULT_OUTLIER_WEIGHT, NoteMatch, NoteMatchAccumulator, RankedNote, SimilarityTally,
};
pub use vector::{cosine_distance, cosine_similarity};
