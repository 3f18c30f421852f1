use async_trait::async_trait;
use tracing::debug;

use crate::core::error::Result;
use crate::core::lexicon;
use crate::core::state::{Filters, Language};
use crate::search::{Product, SearchMode, SearchResponse, SearchService, SearchType};


/// Token/filter matcher over a fixed product list, for tests and the demo
/// binary. Insertion order is preserved and nothing is scored; production
/// deployments put a real backend behind [`SearchService`] instead.
pub struct InMemorySearchService {
    products: Vec<Product>,
}

impl InMemorySearchService {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// A small bilingual demo catalog.
    pub fn with_demo_catalog() -> Self {
        let catalog = vec![
            demo("p-001", "Sofa Andora 3-Seater", "sofa", "putih", "kain", "Andora", 4_500_000),
            demo("p-002", "Sofa Bella Sudut", "sofa", "abu-abu", "kain", "Bella", 6_200_000),
            demo("p-003", "Sofa Kulit Verona", "sofa", "coklat", "kulit", "Verona", 9_800_000),
            demo("p-004", "Meja Makan Jepara", "meja", "coklat", "jati", "Jepara Craft", 3_900_000),
            demo("p-005", "Meja Kerja Oslo", "meja", "putih", "kayu", "Oslo Living", 1_450_000),
            demo("p-006", "Kursi Makan Rotan Bali", "kursi", "krem", "rotan", "Bali Rattan", 750_000),
            demo("p-007", "Kursi Kantor Ergo", "kursi", "hitam", "kain", "Ergo", 2_100_000),
            demo("p-008", "Lemari Pakaian Flora", "lemari", "putih", "kayu", "Flora", 2_800_000),
            demo("p-009", "Rak Buku Pinus", "rak", "coklat", "kayu", "Pinus Home", 650_000),
            demo("p-010", "Kasur Busa Dreamrest", "kasur", "putih", "kain", "Dreamrest", 1_900_000),
            demo("p-011", "Nakas Mini Jati", "nakas", "coklat", "jati", "Jepara Craft", 550_000),
            demo("p-012", "Meja Marmer Carrara", "meja", "putih", "marmer", "Carrara", 7_500_000),
        ];
        Self::new(catalog)
    }

    fn matches_filters(product: &Product, filters: &Filters) -> bool {
        if let Some(category) = &filters.category {
            if !field_matches(product.category.as_deref(), category) {
                return false;
            }
        }
        if let Some(color) = &filters.color {
            if !field_matches(product.color.as_deref(), color) {
                return false;
            }
        }
        if let Some(material) = &filters.material {
            if !field_matches(product.material.as_deref(), material) {
                return false;
            }
        }
        if let Some(brand) = &filters.brand {
            if !field_matches(product.brand.as_deref(), brand) {
                return false;
            }
        }
        if let Some(min) = filters.price_min {
            if product.price.map_or(true, |p| p < min) {
                return false;
            }
        }
        if let Some(max) = filters.price_max {
            if product.price.map_or(true, |p| p > max) {
                return false;
            }
        }
        true
    }

    fn matches_query(product: &Product, query: &str) -> bool {
        let haystack = format!(
            "{} {} {} {} {}",
            product.name,
            product.category.as_deref().unwrap_or(""),
            product.color.as_deref().unwrap_or(""),
            product.material.as_deref().unwrap_or(""),
            product.description.as_deref().unwrap_or(""),
        );
        let haystack = lexicon::normalize(&haystack);
        lexicon::normalize(query)
            .split_whitespace()
            .any(|token| haystack.contains(&format!(" {token} ")))
    }
}

/// Case-insensitive field match, tolerant of the attribute being written
/// in the other language ("white" matches a "putih" product).
fn field_matches(field: Option<&str>, wanted: &str) -> bool {
    let Some(field) = field else {
        return false;
    };
    let field_l = field.to_lowercase();
    let wanted_l = wanted.to_lowercase();
    if field_l == wanted_l {
        return true;
    }
    let id_form = lexicon::canonical_color(&wanted_l, Language::Id)
        .or_else(|| lexicon::canonical_material(&wanted_l, Language::Id));
    id_form.is_some_and(|canonical| field_l == canonical)
}

fn demo(
    id: &str,
    name: &str,
    category: &str,
    color: &str,
    material: &str,
    brand: &str,
    price: u64,
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        category: Some(category.to_string()),
        color: Some(color.to_string()),
        material: Some(material.to_string()),
        brand: Some(brand.to_string()),
        price: Some(price),
        description: None,
    }
}

#[async_trait]
impl SearchService for InMemorySearchService {
    async fn search(
        &self,
        query: &str,
        filters: &Filters,
        n: usize,
        _mode: SearchMode,
    ) -> Result<SearchResponse> {
        let products: Vec<Product> = self
            .products
            .iter()
            .filter(|p| Self::matches_filters(p, filters))
            .filter(|p| query.trim().is_empty() || Self::matches_query(p, query))
            .take(n)
            .cloned()
            .collect();

        debug!(
            "In-memory search for '{}' matched {} product(s)",
            query,
            products.len()
        );

        let search_type = if products.is_empty() {
            SearchType::None
        } else {
            SearchType::Text
        };
        Ok(SearchResponse {
            count: products.len(),
            products,
            search_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_tokens_match() {
        let service = InMemorySearchService::with_demo_catalog();
        let response = service
            .search("sofa", &Filters::default(), 10, SearchMode::Auto)
            .await
            .unwrap();
        assert_eq!(response.count, 3);
        assert_eq!(response.search_type, SearchType::Text);
    }

    #[tokio::test]
    async fn test_filters_narrow_results() {
        let service = InMemorySearchService::with_demo_catalog();
        let filters = Filters {
            color: Some("putih".to_string()),
            ..Filters::default()
        };
        let response = service
            .search("sofa", &filters, 10, SearchMode::Auto)
            .await
            .unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.products[0].id, "p-001");
    }

    #[tokio::test]
    async fn test_english_filter_value_matches_indonesian_product() {
        let service = InMemorySearchService::with_demo_catalog();
        let filters = Filters {
            color: Some("white".to_string()),
            ..Filters::default()
        };
        let response = service
            .search("sofa", &filters, 10, SearchMode::Auto)
            .await
            .unwrap();
        assert_eq!(response.count, 1);
    }

    #[tokio::test]
    async fn test_price_bounds() {
        let service = InMemorySearchService::with_demo_catalog();
        let filters = Filters {
            price_max: Some(1_000_000),
            ..Filters::default()
        };
        let response = service
            .search("", &filters, 10, SearchMode::Auto)
            .await
            .unwrap();
        assert!(response.products.iter().all(|p| p.price.unwrap() <= 1_000_000));
        assert_eq!(response.count, 3);
    }

    #[tokio::test]
    async fn test_no_match_reports_none_type() {
        let service = InMemorySearchService::with_demo_catalog();
        let response = service
            .search("akuarium", &Filters::default(), 10, SearchMode::Auto)
            .await
            .unwrap();
        assert_eq!(response.count, 0);
        assert_eq!(response.search_type, SearchType::None);
    }

    #[tokio::test]
    async fn test_limit_respected() {
        let service = InMemorySearchService::with_demo_catalog();
        let response = service
            .search("meja", &Filters::default(), 2, SearchMode::Auto)
            .await
            .unwrap();
        assert_eq!(response.count, 2);
    }
}
