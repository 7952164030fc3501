//! SQLite-backed vector store.
//!
//! Stories and Q&A pairs live in two tables joined on `qanda.story_id`;
//! embeddings are stored as little-endian f32 BLOBs and ranked by brute-force
//! dot product after the candidate rows are fetched.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::models::{NewQandA, NewStory, QandAPair, RetrievedDocument, StoreStats, StoryId};
use super::store::{validate_top_k, VectorStore};
use crate::core::config::{AppPaths, DatabaseConfig};
use crate::core::errors::RagError;
use crate::vector_math::{decode_embedding, encode_embedding, rank_descending_by_dot};

const DIMENSIONS_KEY: &str = "embedding_dimensions";

pub struct SqliteVectorStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn from_config(config: &DatabaseConfig, paths: &AppPaths) -> Result<Self, RagError> {
        Self::with_path(config.resolve_path(paths), config.max_connections).await
    }

    pub async fn with_path(db_path: PathBuf, max_connections: u32) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                RagError::Connection(format!(
                    "Failed to open vector store at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        tracing::info!(path = %store.db_path.display(), "Vector store ready");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS story (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                story TEXT NOT NULL,
                story_embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::database)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS qanda (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                story_id INTEGER NOT NULL REFERENCES story(id) ON DELETE CASCADE,
                question_embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_qanda_story ON qanda(story_id)")
            .execute(&self.pool)
            .await
            .map_err(RagError::database)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::database)?;

        Ok(())
    }

    async fn recorded_dimensions(&self) -> Result<Option<usize>, RagError> {
        let mut conn = self.pool.acquire().await.map_err(RagError::database)?;
        read_dimensions(&mut *conn).await
    }

    /// Checks a query vector against the stored dimensionality.
    ///
    /// `Ok(false)` means the store holds no vectors yet.
    async fn check_query(&self, embedding: &[f32]) -> Result<bool, RagError> {
        if embedding.is_empty() {
            return Err(RagError::validation("query embedding must not be empty"));
        }
        match self.recorded_dimensions().await? {
            None => Ok(false),
            Some(dims) if dims == embedding.len() => Ok(true),
            Some(dims) => Err(RagError::Validation(format!(
                "query embedding has {} dimensions, store expects {}",
                embedding.len(),
                dims
            ))),
        }
    }

    fn score_rows(
        rows: &[SqliteRow],
        embedding_column: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError> {
        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let bytes: Vec<u8> = row.try_get(embedding_column).map_err(RagError::database)?;
            candidates.push(decode_embedding(&bytes)?);
        }

        rank_descending_by_dot(query, &candidates)?
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| {
                let row = &rows[idx];
                Ok(RetrievedDocument {
                    content: row.try_get("story").map_err(RagError::database)?,
                    story_id: row.try_get("story_id").map_err(RagError::database)?,
                    score,
                })
            })
            .collect()
    }
}

async fn read_dimensions(conn: &mut SqliteConnection) -> Result<Option<usize>, RagError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?1")
        .bind(DIMENSIONS_KEY)
        .fetch_optional(&mut *conn)
        .await
        .map_err(RagError::database)?;

    value
        .map(|v| {
            v.parse::<usize>()
                .map_err(|e| RagError::Internal(format!("corrupt {}: {}", DIMENSIONS_KEY, e)))
        })
        .transpose()
}

/// Records the dimensionality on first write and enforces it afterwards.
async fn ensure_dimensions(conn: &mut SqliteConnection, len: usize) -> Result<(), RagError> {
    if len == 0 {
        return Err(RagError::validation("embedding must not be empty"));
    }

    match read_dimensions(conn).await? {
        Some(dims) if dims == len => Ok(()),
        Some(dims) => Err(RagError::Validation(format!(
            "embedding has {} dimensions, store expects {}",
            len, dims
        ))),
        None => {
            sqlx::query(
                "INSERT INTO store_meta (key, value, updated_at)
                 VALUES (?1, ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            )
            .bind(DIMENSIONS_KEY)
            .bind(len.to_string())
            .execute(&mut *conn)
            .await
            .map_err(RagError::database)?;
            Ok(())
        }
    }
}

async fn write_story(
    conn: &mut SqliteConnection,
    story: &str,
    embedding: &[f32],
) -> Result<StoryId, RagError> {
    ensure_dimensions(conn, embedding.len()).await?;

    let result = sqlx::query("INSERT INTO story (story, story_embedding) VALUES (?1, ?2)")
        .bind(story)
        .bind(encode_embedding(embedding))
        .execute(&mut *conn)
        .await
        .map_err(RagError::database)?;

    Ok(result.last_insert_rowid())
}

async fn write_q_and_a(
    conn: &mut SqliteConnection,
    story_id: StoryId,
    q_and_a: &NewQandA,
) -> Result<i64, RagError> {
    ensure_dimensions(conn, q_and_a.question_embedding.len()).await?;

    let result = sqlx::query(
        "INSERT INTO qanda (question, answer, story_id, question_embedding)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&q_and_a.question)
    .bind(&q_and_a.answer)
    .bind(story_id)
    .bind(encode_embedding(&q_and_a.question_embedding))
    .execute(&mut *conn)
    .await
    .map_err(RagError::database)?;

    Ok(result.last_insert_rowid())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn search_by_q_and_a(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError> {
        validate_top_k(top_k)?;
        if !self.check_query(embedding).await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT s.story AS story, s.id AS story_id, q.question_embedding AS question_embedding
             FROM qanda q
             JOIN story s ON q.story_id = s.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::database)?;

        let results = Self::score_rows(&rows, "question_embedding", embedding, top_k)?;
        tracing::debug!(candidates = rows.len(), returned = results.len(), "search_by_q_and_a");
        Ok(results)
    }

    async fn search_by_story(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RagError> {
        validate_top_k(top_k)?;
        if !self.check_query(embedding).await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT story, id AS story_id, story_embedding
             FROM story",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::database)?;

        let results = Self::score_rows(&rows, "story_embedding", embedding, top_k)?;
        tracing::debug!(candidates = rows.len(), returned = results.len(), "search_by_story");
        Ok(results)
    }

    async fn search_q_and_a_docs_by_story(
        &self,
        story_ids: &[StoryId],
        top_k: usize,
    ) -> Result<Vec<QandAPair>, RagError> {
        validate_top_k(top_k)?;

        let unique_ids: BTreeSet<StoryId> = story_ids.iter().copied().collect();
        if unique_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT question, answer FROM qanda WHERE story_id IN (");
        let mut separated = builder.separated(", ");
        for id in &unique_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id LIMIT ");
        builder.push_bind(top_k as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::database)?;

        rows.iter()
            .map(|row| {
                Ok(QandAPair {
                    question: row.try_get("question").map_err(RagError::database)?,
                    answer: row.try_get("answer").map_err(RagError::database)?,
                })
            })
            .collect()
    }

    async fn insert_story(&self, story: &str, embedding: &[f32]) -> Result<StoryId, RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::database)?;
        let id = write_story(&mut *tx, story, embedding).await?;
        tx.commit().await.map_err(RagError::database)?;
        Ok(id)
    }

    async fn insert_q_and_a(
        &self,
        story_id: StoryId,
        q_and_a: &NewQandA,
    ) -> Result<i64, RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::database)?;
        let id = write_q_and_a(&mut *tx, story_id, q_and_a).await?;
        tx.commit().await.map_err(RagError::database)?;
        Ok(id)
    }

    async fn insert_batch(&self, stories: &[NewStory]) -> Result<Vec<StoryId>, RagError> {
        if stories.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(RagError::database)?;
        let mut ids = Vec::with_capacity(stories.len());

        for story in stories {
            let story_id = write_story(&mut *tx, &story.story, &story.embedding).await?;
            for q_and_a in &story.q_and_a {
                write_q_and_a(&mut *tx, story_id, q_and_a).await?;
            }
            ids.push(story_id);
        }

        tx.commit().await.map_err(RagError::database)?;
        Ok(ids)
    }

    async fn stats(&self) -> Result<StoreStats, RagError> {
        let stories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM story")
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::database)?;
        let q_and_a: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM qanda")
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::database)?;

        Ok(StoreStats {
            stories: stories as usize,
            q_and_a: q_and_a as usize,
            embedding_dimensions: self.recorded_dimensions().await?,
        })
    }

    async fn clear(&self) -> Result<(), RagError> {
        let mut tx = self.pool.begin().await.map_err(RagError::database)?;

        sqlx::query("DELETE FROM qanda")
            .execute(&mut *tx)
            .await
            .map_err(RagError::database)?;
        sqlx::query("DELETE FROM story")
            .execute(&mut *tx)
            .await
            .map_err(RagError::database)?;
        sqlx::query("DELETE FROM store_meta WHERE key = ?1")
            .bind(DIMENSIONS_KEY)
            .execute(&mut *tx)
            .await
            .map_err(RagError::database)?;

        tx.commit().await.map_err(RagError::database)?;
        tracing::info!("Vector store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &tempfile::TempDir) -> SqliteVectorStore {
        SqliteVectorStore::with_path(dir.path().join("store.db"), 2)
            .await
            .unwrap()
    }

    fn q_and_a(question: &str, answer: &str, embedding: Vec<f32>) -> NewQandA {
        NewQandA {
            question: question.to_string(),
            answer: answer.to_string(),
            question_embedding: embedding,
        }
    }

    /// Three stories along the axes of a 3-d space, each with one question.
    async fn seeded_store(dir: &tempfile::TempDir) -> (SqliteVectorStore, Vec<StoryId>) {
        let store = test_store(dir).await;
        let ids = store
            .insert_batch(&[
                NewStory {
                    story: "Paris is the capital of France.".to_string(),
                    embedding: vec![1.0, 0.0, 0.0],
                    q_and_a: vec![
                        q_and_a("Capital of France?", "Paris", vec![0.9, 0.1, 0.0]),
                        q_and_a("Which river runs through Paris?", "Seine", vec![0.6, 0.0, 0.4]),
                    ],
                },
                NewStory {
                    story: "Gold has the symbol Au.".to_string(),
                    embedding: vec![0.0, 1.0, 0.0],
                    q_and_a: vec![q_and_a("Symbol for gold?", "Au", vec![0.0, 0.95, 0.05])],
                },
                NewStory {
                    story: "Jupiter is the largest planet.".to_string(),
                    embedding: vec![0.0, 0.0, 1.0],
                    q_and_a: vec![q_and_a("Largest planet?", "Jupiter", vec![0.1, 0.0, 0.9])],
                },
            ])
            .await
            .unwrap();
        (store, ids)
    }

    #[tokio::test]
    async fn search_by_q_and_a_ranks_by_question_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(&dir).await;

        let results = store.search_by_q_and_a(&[1.0, 0.0, 0.0], 2).await.unwrap();

        assert_eq!(results.len(), 2);
        // Both Paris questions outrank everything else; the story repeats.
        assert_eq!(results[0].story_id, ids[0]);
        assert_eq!(results[1].story_id, ids[0]);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn search_results_never_exceed_top_k_and_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = seeded_store(&dir).await;
        let query = [0.3, 0.5, 0.2];

        for top_k in 1..=6 {
            let results = store.search_by_q_and_a(&query, top_k).await.unwrap();
            assert!(results.len() <= top_k);
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
        let all = store.search_by_q_and_a(&query, 10).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn search_by_story_uses_story_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(&dir).await;

        let results = store.search_by_story(&[0.0, 0.2, 1.0], 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].story_id, ids[2]);
        assert_eq!(results[0].content, "Jupiter is the largest planet.");
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(&dir).await;

        let err = store.search_by_q_and_a(&[1.0, 0.0, 0.0], 0).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
        let err = store.search_by_story(&[1.0, 0.0, 0.0], 0).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
        let err = store.search_q_and_a_docs_by_story(&ids, 0).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_store_returns_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        assert!(store.search_by_q_and_a(&[1.0, 0.0], 4).await.unwrap().is_empty());
        assert!(store.search_by_story(&[1.0, 0.0], 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn q_and_a_filter_only_returns_requested_stories() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(&dir).await;

        let pairs = store
            .search_q_and_a_docs_by_story(&[ids[0], ids[2], ids[0]], 10)
            .await
            .unwrap();

        let answers: Vec<&str> = pairs.iter().map(|p| p.answer.as_str()).collect();
        assert_eq!(answers, vec!["Paris", "Seine", "Jupiter"]);

        let limited = store.search_q_and_a_docs_by_story(&[ids[0]], 1).await.unwrap();
        assert_eq!(
            limited,
            vec![QandAPair {
                question: "Capital of France?".to_string(),
                answer: "Paris".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn q_and_a_filter_with_no_ids_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = seeded_store(&dir).await;

        let pairs = store.search_q_and_a_docs_by_story(&[], 3).await.unwrap();
        assert!(pairs.is_empty());

        let unknown = store.search_q_and_a_docs_by_story(&[9_999], 3).await.unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ids) = seeded_store(&dir).await;

        let err = store.search_by_story(&[1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));

        let err = store.insert_story("Too short", &[1.0]).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));

        let err = store
            .insert_q_and_a(ids[0], &q_and_a("q", "a", vec![1.0, 2.0, 3.0, 4.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));

        let err = store.search_by_q_and_a(&[], 1).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[tokio::test]
    async fn q_and_a_must_reference_existing_story() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.insert_story("Lonely story", &[1.0, 0.0]).await.unwrap();

        let err = store
            .insert_q_and_a(42, &q_and_a("q", "a", vec![1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
        assert_eq!(store.stats().await.unwrap().q_and_a, 0);
    }

    #[tokio::test]
    async fn failed_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        let err = store
            .insert_batch(&[
                NewStory {
                    story: "ok".to_string(),
                    embedding: vec![1.0, 0.0],
                    q_and_a: vec![],
                },
                NewStory {
                    story: "bad".to_string(),
                    embedding: vec![1.0, 0.0, 0.0],
                    q_and_a: vec![],
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Validation(_)));
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.stories, 0);
        assert_eq!(stats.embedding_dimensions, None);
    }

    #[tokio::test]
    async fn stats_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = seeded_store(&dir).await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.stories, 3);
        assert_eq!(stats.q_and_a, 4);
        assert_eq!(stats.embedding_dimensions, Some(3));

        store.clear().await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.stories, 0);
        assert_eq!(stats.q_and_a, 0);
        assert_eq!(stats.embedding_dimensions, None);

        // A new model may use a different size after clearing.
        store.insert_story("fresh", &[1.0, 0.0, 0.0, 0.0, 0.0]).await.unwrap();
        assert_eq!(store.stats().await.unwrap().embedding_dimensions, Some(5));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("store.db");

        let err = SqliteVectorStore::with_path(path, 1)
            .await
            .err()
            .expect("opening inside a missing directory should fail");
        assert!(matches!(err, RagError::Connection(_)));
    }
}
