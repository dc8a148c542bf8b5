use serde::{Deserialize, Serialize};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkPredictRequest {
    pub descriptions: Vec<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// `{}` when there was nothing to categorize.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// One entry per input description, `null` for blank ones.
#[derive(Debug, Serialize)]
pub struct BulkPredictResponse {
    pub categories: Vec<Option<String>>,
}
