use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency per normalized route.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Collection segments whose following segment is an identifier.
const ID_COLLECTIONS: &[&str] = &["students", "planets", "levels", "exercises"];

/// Replaces identifiers with `{id}` to keep label cardinality bounded.
/// Student and content ids are free-form strings, so the segment position
/// decides, not its shape.
fn normalize_path(path: &str) -> String {
    let mut normalized = Vec::new();
    let mut previous = "";

    for segment in path.split('/') {
        if ID_COLLECTIONS.contains(&previous) || is_uuid_like(segment) {
            normalized.push("{id}");
        } else {
            normalized.push(segment);
        }
        previous = segment;
    }

    normalized.join("/")
}

fn is_uuid_like(s: &str) -> bool {
    s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/api/v1/students/astro-kid/quiz/answer"),
            "/api/v1/students/{id}/quiz/answer"
        );
        assert_eq!(
            normalize_path("/api/v1/students/s1/planets/mars/levels"),
            "/api/v1/students/{id}/planets/{id}/levels"
        );
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_is_uuid_like() {
        assert!(is_uuid_like("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_uuid_like("not-a-uuid"));
    }
}
