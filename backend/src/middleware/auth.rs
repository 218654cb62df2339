use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use super::logging::RequestId;
use crate::{error::AppError, services::AuthError, state::AppState};

/// Resolves the access token on the request and makes the caller's
/// `AccountInfo` available to handlers through request extensions.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_access_token(request.headers()) else {
        tracing::info!("Request without access token");
        return Err(AuthError::PermissionDenied.into());
    };

    let account = state.auth.verify(&token).await?;

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.as_str())
        .unwrap_or("-");
    let span = tracing::info_span!(
        "authenticated",
        request_id = %request_id,
        account_id = %account.account_id,
        session_id = %account.session_id,
    );
    request.extensions_mut().insert(account);
    Ok(next.run(request).instrument(span).await)
}

/// Accepts both `Authorization: <token>` and `Authorization: Bearer <token>`.
fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = parse_bearer_token(value).unwrap_or(value).trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let space_idx = header.find(' ')?;
    let (scheme, rest) = header.split_at(space_idx);
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| rest.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn extracts_raw_and_bearer_tokens() {
        assert_eq!(
            extract_access_token(&headers_with("abc123")).as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_access_token(&headers_with("Bearer abc123")).as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_access_token(&headers_with("bearer   abc123")).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn missing_or_empty_header_yields_none() {
        assert_eq!(extract_access_token(&HeaderMap::new()), None);
        assert_eq!(extract_access_token(&headers_with("Bearer ")), None);
    }
}
