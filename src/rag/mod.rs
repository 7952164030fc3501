//! Retrieval-augmented chat over a store of stories and their Q&A pairs.
//!
//! - `VectorStore` / `SqliteVectorStore`: embedding storage and dot-product search
//! - `ContextAssembler`: turns retrieved stories into bounded prompt fragments
//! - `ChatPipeline`: one conversational turn end to end
//! - `ingest`: loads question/answer/context datasets

pub mod context_builder;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod splitter;
pub mod sqlite;
pub mod store;

pub use context_builder::{ContextAssembler, ContextConfig};
pub use ingest::{DatasetEntry, IngestReport};
pub use models::{NewQandA, NewStory, QandAPair, RetrievedDocument, StoreStats, StoryId};
pub use pipeline::{ChatPipeline, RetrievedContext, TurnOutcome};
pub use prompt::render_prompt;
pub use splitter::{SplitterConfig, TextSplitter};
pub use sqlite::SqliteVectorStore;
pub use store::VectorStore;
