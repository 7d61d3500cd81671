//! Middleware for logging requests and responses.

use axum::{extract::Request, http::header::CONTENT_TYPE, middleware::Next, response::Response};

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body_text) = extract_header_and_body_text_from_request(request).await;

    if headers.method.eq(&axum::http::Method::POST)
        && headers.headers.get(CONTENT_TYPE) == Some(&"application/json".parse().unwrap())
    {
        let display_text = redact_password(&body_text, "password");
        log_request(&headers, &display_text);
    } else {
        log_request(&headers, &body_text);
    }

    let request = Request::from_parts(headers, body_text.into());
    let response = next.run(request).await;

    let (headers, body_text) = extract_header_and_body_text_from_response(response).await;
    log_response(&headers, &body_text);

    Response::from_parts(headers, body_text.into())
}

/// Replace the string value of `field_name` in a JSON body with asterisks.
///
/// Works on the raw text rather than parsing the JSON so that malformed
/// bodies are still logged (and still redacted).
fn redact_password(body_text: &str, field_name: &str) -> String {
    let marker = format!("\"{field_name}\"");

    let Some(key_start) = body_text.find(&marker) else {
        return body_text.to_string();
    };

    let after_key = &body_text[key_start + marker.len()..];
    let Some(colon_offset) = after_key.find(':') else {
        return body_text.to_string();
    };
    let Some(quote_offset) = after_key[colon_offset..].find('"') else {
        return body_text.to_string();
    };

    let value_start = key_start + marker.len() + colon_offset + quote_offset + 1;
    let Some(value_length) = body_text[value_start..].find('"') else {
        return body_text.to_string();
    };

    format!(
        "{}********{}",
        &body_text[..value_start],
        &body_text[value_start + value_length..]
    )
}

async fn extract_header_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (headers, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_header_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (headers, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Take the longest prefix of `body` that fits in `limit` bytes.
///
/// The cut must land on a UTF-8 character boundary: bodies hold Portuguese
/// text, so byte 64 can fall in the middle of an accented character.
fn truncate_body(body: &str, limit: usize) -> &str {
    let mut end = limit.min(body.len());

    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {headers:#?}\nbody: {:}...",
            truncate_body(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            truncate_body(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}
