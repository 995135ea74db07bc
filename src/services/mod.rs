// PaperLens Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod sentence_segmenter;
pub mod document;
pub mod export;
pub mod review;

pub use config_store::*;
pub use document::{DocumentExtractor, ExtractionError, FileExtractor};
pub use providers::{GenerationError, GenerationOutput, GenerationRequest, GenerationService, OllamaClient};
pub use sentence_segmenter::{RuleSentenceSplitter, SegmenterServiceClient, SentenceBoundaryDetector};
