use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bearer token served by [`mount_token_grant`] unless overridden.
#[allow(dead_code)]
pub const ACCESS_TOKEN: &str = "mock-access-token";

#[allow(dead_code)]
pub fn file_json(id: &str, name: &str, size: u64) -> serde_json::Value {
    json!({
        "type": "file",
        "id": id,
        "name": name,
        "modified_at": "2024-05-01T12:00:00Z",
        "size": size,
    })
}

#[allow(dead_code)]
pub fn folder_json(id: &str, name: &str) -> serde_json::Value {
    json!({ "type": "folder", "id": id, "name": name })
}

/// Answer one token exchange of `grant_type` with a fresh token pair.
#[allow(dead_code)]
pub async fn mount_token_grant(
    server: &MockServer,
    grant_type: &str,
    access_token: &str,
    refresh_token: &str,
    expires_in: u64,
) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains(format!("grant_type={grant_type}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": expires_in,
            "refresh_token": refresh_token,
            "token_type": "bearer",
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve a folder's children: a count request (`limit=0`) plus one mock per page.
///
/// Each mock must be hit exactly once.
#[allow(dead_code)]
pub async fn mount_folder(
    server: &MockServer,
    folder_id: &str,
    entries: Vec<serde_json::Value>,
    page_size: usize,
) {
    let items_path = format!("/2.0/folders/{folder_id}/items");
    let total = entries.len();

    Mock::given(method("GET"))
        .and(path(items_path.as_str()))
        .and(query_param("limit", "0"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": total,
            "entries": [],
            "offset": 0,
            "limit": 0,
        })))
        .expect(1)
        .mount(server)
        .await;

    for (page, chunk) in entries.chunks(page_size).enumerate() {
        let offset = page * page_size;
        Mock::given(method("GET"))
            .and(path(items_path.as_str()))
            .and(query_param("limit", page_size.to_string().as_str()))
            .and(query_param("offset", offset.to_string().as_str()))
            .and(query_param("sort", "date"))
            .and(query_param("fields", "name,created_at,modified_at,size"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": total,
                "entries": chunk,
                "offset": offset,
                "limit": page_size,
            })))
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Serve a file's content `expected_hits` times.
#[allow(dead_code)]
pub async fn mount_content(server: &MockServer, file_id: &str, body: &[u8], expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/2.0/files/{file_id}/content").as_str()))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected_hits)
        .mount(server)
        .await;
}
