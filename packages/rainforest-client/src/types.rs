use serde::{Deserialize, Serialize};

/// A product price as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub raw: Option<String>,
}

/// Response for `type=search` requests.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search_results: Vec<SearchResult>,
}

/// A single organic search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub asin: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    pub ratings_total: Option<i64>,
    pub price: Option<Price>,
}

/// Response for `type=reviews` requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewsResponse {
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub pagination: Option<Pagination>,
}

/// A single customer review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub rating: Option<f64>,
    pub verified_purchase: Option<bool>,
    pub helpful_votes: Option<i64>,
    pub date: Option<ReviewDate>,
}

/// Review date in raw and normalized forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDate {
    pub raw: Option<String>,
    pub utc: Option<String>,
}

/// Page-cursor metadata attached to paginated responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub current_page: Option<i32>,
    pub total_pages: Option<i32>,
}

/// Response for `type=questions` requests.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionsResponse {
    #[serde(default)]
    pub questions: Vec<Question>,
    pub pagination: Option<Pagination>,
}

/// A single Q&A entry with its answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Option<String>,
    pub text: Option<String>,
    pub votes: Option<i64>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// An answer to a customer question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Option<String>,
    pub text: Option<String>,
}

/// Response for `type=seller_products` requests.
#[derive(Debug, Clone, Deserialize)]
pub struct SellerProductsResponse {
    #[serde(default)]
    pub seller_products: Vec<SellerProduct>,
    pub pagination: Option<Pagination>,
}

/// A listing in a seller's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerProduct {
    pub asin: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub price: Option<Price>,
}

/// Response for `type=product` requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductResponse {
    pub product: Option<Product>,
}

/// Full product detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub asin: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub ratings_total: Option<i64>,
    #[serde(default)]
    pub feature_bullets: Vec<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// One image attached to a product detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    pub link: Option<String>,
}

/// A product variation (size, color, ...) referenced by its own ASIN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub asin: Option<String>,
    pub title: Option<String>,
}
