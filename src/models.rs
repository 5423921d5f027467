use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

/// One product card, in document order. Every field is the raw string read
/// from the page; nothing is parsed or normalized server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub price: String,
    pub stock: String,
    pub rating: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PageExtract {
    pub book_name: Option<String>,
    pub books: Vec<Book>,
}
