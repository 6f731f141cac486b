use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub label: String,
    pub value: String,
}

impl CitySuggestion {
    /// Suggestion that repeats the user's input.
    pub fn echo(query: &str) -> Self {
        Self {
            label: query.to_string(),
            value: query.to_string(),
        }
    }
}

#[async_trait]
pub trait CitySearch: Send + Sync {
    async fn search(&self, prefix: &str) -> Result<Vec<CitySuggestion>>;
}
