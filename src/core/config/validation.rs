use serde_json::{Map, Value};

use super::defaults::DEFAULT_CHUNK_SIZE;
use crate::core::errors::RagError;

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(database) = expect_optional_object(root, "database")? {
        validate_optional_string_field(database, "database.path", "path")?;
        validate_u64_field(
            database,
            "database.max_connections",
            "max_connections",
            1,
            64,
        )?;
    }

    for section_name in ["embedding", "llm"] {
        if let Some(section) = expect_optional_object(root, section_name)? {
            validate_url_field(section, &format!("{}.base_url", section_name), "base_url")?;
            validate_non_empty_string_field(section, &format!("{}.model", section_name), "model")?;
            validate_optional_string_field(
                section,
                &format!("{}.api_key", section_name),
                "api_key",
            )?;
            validate_u64_field(
                section,
                &format!("{}.timeout_secs", section_name),
                "timeout_secs",
                1,
                3_600,
            )?;
        }
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 2_048)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.q_and_a_top_k", "q_and_a_top_k", 1, 1_000)?;
        validate_u64_field(retrieval, "retrieval.story_top_k", "story_top_k", 1, 1_000)?;
        validate_u64_field(retrieval, "retrieval.example_top_k", "example_top_k", 1, 1_000)?;
        validate_u64_field(retrieval, "retrieval.chunk_size", "chunk_size", 1, 100_000)?;
        validate_u64_field(retrieval, "retrieval.chunk_overlap", "chunk_overlap", 0, 100_000)?;
        validate_u64_field(
            retrieval,
            "retrieval.max_fragment_chars",
            "max_fragment_chars",
            1,
            100_000,
        )?;

        let chunk_size = retrieval
            .get("chunk_size")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_CHUNK_SIZE as u64);
        let chunk_overlap = retrieval.get("chunk_overlap").and_then(Value::as_u64);
        if let Some(overlap) = chunk_overlap {
            if overlap >= chunk_size {
                return Err(RagError::Config(format!(
                    "Invalid config at 'retrieval.chunk_overlap': must be smaller than chunk_size ({})",
                    chunk_size
                )));
            }
        }
    }

    if let Some(chat) = expect_optional_object(root, "chat")? {
        validate_u64_field(chat, "chat.max_query_chars", "max_query_chars", 1, 1_000_000)?;
        validate_u64_field(chat, "chat.history_window", "history_window", 0, 1_000)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_url_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    validate_non_empty_string_field(section, path, key)?;
    let Some(url) = section.get(key).and_then(Value::as_str) else {
        return Ok(());
    };
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(());
    }
    Err(RagError::Config(format!(
        "Invalid config at '{}': expected an http(s) URL",
        path
    )))
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Config(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
