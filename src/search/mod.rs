pub mod memory;

pub use memory::InMemorySearchService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::error::Result;
use crate::core::state::Filters;


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}


/// How the backend actually answered the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchType {
    Vector,
    Text,
    None,
}

impl Default for SearchType {
    fn default() -> Self {
        SearchType::None
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchMode {
    Auto,
    Vector,
    Text,
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Auto
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub products: Vec<Product>,
    pub count: usize,
    pub search_type: SearchType,
}


/// Product-search backend. The dialogue engine never ranks or retrieves
/// by itself; it only decides what to ask this capability for. Failures
/// here are the one external fault that propagates to the caller.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filters: &Filters,
        n: usize,
        mode: SearchMode,
    ) -> Result<SearchResponse>;
}
