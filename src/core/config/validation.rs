use serde_json::{Map, Value};

use crate::core::errors::ApiError;

const EMBEDDING_PROVIDERS: [&str; 2] = ["http", "hashing"];
const METRICS: [&str; 3] = ["cosine", "euclidean", "l2"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_choice_field(
            embedding,
            "embedding.provider",
            "provider",
            &EMBEDDING_PROVIDERS,
        )?;
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    let mut cosine = true;
    if let Some(store) = expect_optional_object(root, "store")? {
        validate_u64_field(store, "store.dimension", "dimension", 1, 65_536)?;
        validate_choice_field(store, "store.metric", "metric", &METRICS)?;
        validate_optional_string_field(store, "store.index_path", "index_path")?;
        validate_optional_string_field(store, "store.metadata_path", "metadata_path")?;
        cosine = store
            .get("metric")
            .and_then(|v| v.as_str())
            .map(|metric| metric.eq_ignore_ascii_case("cosine"))
            .unwrap_or(true);
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.max_words", "max_words", 1, 100_000)?;
        validate_u64_field(chunking, "chunking.overlap", "overlap", 0, 100_000)?;
        let max_words = chunking
            .get("max_words")
            .and_then(|v| v.as_u64())
            .unwrap_or(500);
        let overlap = chunking
            .get("overlap")
            .and_then(|v| v.as_u64())
            .unwrap_or(50);
        if overlap >= max_words {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'chunking.overlap': must be less than chunking.max_words ({})",
                max_words
            )));
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.default_top_k", "default_top_k", 1, 1_000)?;
        validate_u64_field(retrieval, "retrieval.max_top_k", "max_top_k", 1, 1_000)?;
        let (min, max) = if cosine {
            (-1.0, 1.0)
        } else {
            (f64::MIN, 0.0)
        };
        validate_f64_field(
            retrieval,
            "retrieval.relevance_floor",
            "relevance_floor",
            min,
            max,
        )?;
    }

    if let Some(answer) = expect_optional_object(root, "answer")? {
        validate_u64_field(
            answer,
            "answer.summary_max_chars",
            "summary_max_chars",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            answer,
            "answer.summary_short_sentence",
            "summary_short_sentence",
            0,
            1_000_000,
        )?;
        validate_u64_field(
            answer,
            "answer.snippet_max_chars",
            "snippet_max_chars",
            1,
            100_000,
        )?;
        validate_u64_field(
            answer,
            "answer.snippet_short_sentence",
            "snippet_short_sentence",
            0,
            100_000,
        )?;
        validate_string_array_field(answer, "answer.denylist", "denylist")?;
    }

    if let Some(export) = expect_optional_object(root, "export")? {
        validate_optional_string_field(export, "export.dir", "dir")?;
    }

    if let Some(documents) = expect_optional_object(root, "documents")? {
        validate_optional_string_field(documents, "documents.dir", "dir")?;
        validate_string_array_field(documents, "documents.extensions", "extensions")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
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
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !number.is_finite() || number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be a finite number in [{}, {}]",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_choice_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    choices: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !choices
        .iter()
        .any(|choice| choice.eq_ignore_ascii_case(text.trim()))
    {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            choices.join(", ")
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejects(config: Value, needle: &str) {
        match validate_config(&config) {
            Err(ApiError::BadRequest(msg)) => assert!(msg.contains(needle), "{}", msg),
            other => panic!("expected rejection mentioning {}, got {:?}", needle, other),
        }
    }

    #[test]
    fn accepts_empty_and_complete_configs() {
        validate_config(&json!({})).unwrap();
        validate_config(&json!({
            "server": { "host": "0.0.0.0", "port": 8000, "cors_allowed_origins": ["http://localhost:5173"] },
            "embedding": { "provider": "hashing", "timeout_secs": 10 },
            "store": { "dimension": 384, "metric": "cosine" },
            "chunking": { "max_words": 200, "overlap": 20 },
            "retrieval": { "default_top_k": 5, "max_top_k": 20, "relevance_floor": 0.6 },
            "answer": { "summary_max_chars": 600, "denylist": ["tell me a joke"] },
            "documents": { "dir": "docs", "extensions": ["txt", "md"] }
        }))
        .unwrap();
    }

    #[test]
    fn rejects_overlap_not_below_max_words() {
        rejects(
            json!({ "chunking": { "max_words": 10, "overlap": 10 } }),
            "chunking.overlap",
        );
        rejects(json!({ "chunking": { "max_words": 40 } }), "chunking.overlap");
    }

    #[test]
    fn rejects_unknown_metric_and_provider() {
        rejects(json!({ "store": { "metric": "manhattan" } }), "store.metric");
        rejects(json!({ "embedding": { "provider": "openai" } }), "embedding.provider");
    }

    #[test]
    fn rejects_out_of_range_floor() {
        rejects(
            json!({ "retrieval": { "relevance_floor": 1.5 } }),
            "retrieval.relevance_floor",
        );
        rejects(
            json!({ "store": { "metric": "euclidean" }, "retrieval": { "relevance_floor": 0.5 } }),
            "retrieval.relevance_floor",
        );
        validate_config(&json!({
            "store": { "metric": "euclidean" },
            "retrieval": { "relevance_floor": -2.5 }
        }))
        .unwrap();
        validate_config(&json!({ "store": { "metric": "euclidean", "dimension": 4 } })).unwrap();
    }

    #[test]
    fn rejects_wrong_types() {
        rejects(json!({ "store": 4 }), "store");
        rejects(json!({ "store": { "dimension": "384" } }), "store.dimension");
        rejects(json!({ "answer": { "denylist": [1] } }), "answer.denylist[0]");
    }
}
