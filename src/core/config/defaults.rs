pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:1234";
pub const DEFAULT_EMBEDDING_MODEL: &str = "avsolatorio/GIST-Embedding-v0";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;

pub const DEFAULT_Q_AND_A_TOP_K: usize = 2;
pub const DEFAULT_STORY_TOP_K: usize = 1;
pub const DEFAULT_EXAMPLE_TOP_K: usize = 1;
pub const DEFAULT_CHUNK_SIZE: usize = 250;
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;
pub const DEFAULT_MAX_FRAGMENT_CHARS: usize = 250;

pub const DEFAULT_MAX_QUERY_CHARS: usize = 4_000;
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

pub const GREETING: &str =
    "Hi, I'm a chatbot that can access your vector stores. What would you like to know?";
