//! Embedding wire types
//!
//! Embeddings are routed by provider only; the payload passes through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One embedding vector (or base64 string when requested)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    #[serde(default)]
    pub index: u32,
    pub embedding: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Embedding response returned by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default)]
    pub data: Vec<Embedding>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmbeddingResponse {
    /// Float vectors in index order; base64 entries are skipped
    pub fn vectors(&self) -> Vec<Vec<f64>> {
        let mut data: Vec<&Embedding> = self.data.iter().collect();
        data.sort_by_key(|e| e.index);
        data.into_iter()
            .filter_map(|e| e.embedding.as_array())
            .map(|values| values.iter().filter_map(Value::as_f64).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vectors_sorted_by_index() {
        let response: EmbeddingResponse = serde_json::from_value(json!({
            "object": "list",
            "model": "text-embedding-3-small",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.5, 0.25]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ]
        }))
        .unwrap();

        assert_eq!(response.vectors(), vec![vec![1.0, 0.0], vec![0.5, 0.25]]);
        assert_eq!(response.data[0].extra["object"], "embedding");
    }
}
