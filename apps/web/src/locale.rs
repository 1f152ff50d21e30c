//! Per-request locale.
//!
//! Resolved from the `locale` cookie, then `Accept-Language`, then
//! `locale.default` from the config. Handlers that render text take a
//! [`RequestLocale`]; error bodies are re-rendered by [`localize_errors`].

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;
use stitch_core::{Locale, Messages};

use crate::error::ApiError;
use crate::state::AppState;

/// Cookie set by the language switcher.
pub const LOCALE_COOKIE: &str = "locale";

/// Resolves the locale from request headers.
pub fn locale_from_headers(headers: &HeaderMap, default: Locale) -> Locale {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(LOCALE_COOKIE).map(|c| c.value());
    let accept_language = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());

    Locale::resolve(cookie, accept_language, default)
}

/// The caller's locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

impl RequestLocale {
    pub fn messages(&self) -> Messages {
        Messages::new(self.0)
    }
}

impl FromRequestParts<AppState> for RequestLocale {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(RequestLocale(locale_from_headers(
            &parts.headers,
            state.config.locale.default,
        )))
    }
}

/// Re-renders [`ApiError`] bodies in the caller's language.
pub async fn localize_errors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let locale = locale_from_headers(req.headers(), state.config.locale.default);
    let response = next.run(req).await;

    if locale == Locale::default() {
        return response;
    }

    match response.extensions().get::<Arc<ApiError>>().cloned() {
        Some(err) => err.to_response(locale),
        None => response,
    }
}
