// Route handlers.
// Document and listing endpoints, cache headers, and client cache-bypass detection.

use axum::{
    Json,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{CACHE_CONTROL, PRAGMA},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::cache::CacheStatus;
use crate::github::{DocumentPath, RepoRef};

use super::AppState;
use super::error::{ApiError, ApiResult};

pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// GET /:user/:repo/:reference/*path
pub async fn document(
    State(state): State<AppState>,
    Path((user, repo, reference, path)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let doc = DocumentPath::new(RepoRef::new(user, repo, reference), path);
    let (document, status) = state.service.document(doc, wants_bypass(&headers)).await?;
    Ok(cached_json(&state, status, &document))
}

/// GET /:user/:repo/:reference
pub async fn listing(
    State(state): State<AppState>,
    Path((user, repo, reference)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let repo = RepoRef::new(user, repo, reference);
    let (listing, status) = state.service.listing(repo, wants_bypass(&headers)).await?;
    Ok(cached_json(&state, status, &listing))
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn cached_json<T: Serialize>(state: &AppState, status: CacheStatus, body: &T) -> Response {
    (
        [
            (CACHE_CONTROL, state.cache_control.clone()),
            (X_CACHE.clone(), HeaderValue::from_static(status.as_str())),
        ],
        Json(body),
    )
        .into_response()
}

/// Whether the client sent `no-cache` in `Cache-Control` or `Pragma`.
pub fn wants_bypass(headers: &HeaderMap) -> bool {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .chain(headers.get_all(PRAGMA).iter())
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_wants_bypass() {
        assert!(!wants_bypass(&HeaderMap::new()));
        assert!(wants_bypass(&headers(&[(CACHE_CONTROL, "no-cache")])));
        assert!(wants_bypass(&headers(&[(CACHE_CONTROL, "max-age=0, No-Cache")])));
        assert!(wants_bypass(&headers(&[(PRAGMA, "no-cache")])));
        assert!(!wants_bypass(&headers(&[(CACHE_CONTROL, "no-store")])));
        assert!(!wants_bypass(&headers(&[(CACHE_CONTROL, "max-age=60")])));
    }
}
