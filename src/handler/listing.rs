//! Collection listing endpoints

use crate::config::AppState;
use crate::http::{self, partial::encode_uri_component, ResponseBody};
use crate::logger;
use crate::storage::Collection;
use chrono::{DateTime, Utc};
use hyper::{Response, StatusCode};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ListingItem {
    name: String,
    size_bytes: u64,
    created_at: DateTime<Utc>,
    url: String,
}

#[derive(Debug, Serialize)]
struct Listing {
    items: Vec<ListingItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// List a collection; an unreadable directory degrades to an empty listing
pub async fn serve_listing(state: &AppState, collection: Collection) -> Response<ResponseBody> {
    let listing = match state.storage.list(collection).await {
        Ok(entries) => Listing {
            items: entries
                .into_iter()
                .map(|entry| ListingItem {
                    url: format!(
                        "{}{}",
                        collection.url_prefix(),
                        encode_uri_component(&entry.name)
                    ),
                    name: entry.name,
                    size_bytes: entry.size_bytes,
                    created_at: entry.created_at,
                })
                .collect(),
            error: None,
        },
        Err(err) => {
            logger::log_directory_unavailable(&err);
            Listing {
                items: Vec::new(),
                error: Some("Directory unavailable".to_string()),
            }
        }
    };

    http::build_json_response(StatusCode::OK, &listing)
}

/// Liveness endpoint used by the UI
pub fn serve_health() -> Response<ResponseBody> {
    http::build_json_response(
        StatusCode::OK,
        &serde_json::json!({ "status": "ok", "message": "Server is running" }),
    )
}
