//! Stateless HTTP Basic authentication.
//!
//! Every request is authenticated on its own; no session or cookie is
//! issued. On success the [`User`](gatekeeper_common::User) is placed in the
//! request extensions for handlers to extract.
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{parse_basic_authorization, Verdict};
use crate::error::{basic_challenge, AppError};
use crate::AppState;

/// Reject the request unless it carries valid Basic credentials
pub async fn require_basic_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        state.settings.trust_proxy_headers,
    );

    if let Some(ip) = ip {
        if !state.rate_limiter.check_rate_limit(ip) {
            return AppError::AuthRateLimited.into_response();
        }
    }

    let Some(header_value) = request.headers().get(header::AUTHORIZATION) else {
        return unauthorized(&state.settings.realm);
    };

    let credentials = header_value.to_str().ok().and_then(parse_basic_authorization);
    let verdict = match credentials {
        Some(creds) => state.auth.authenticate(&creds.username, &creds.password).await,
        None => Ok(Verdict::Rejected),
    };

    match verdict {
        Ok(Verdict::Authenticated(user)) => {
            if let Some(ip) = ip {
                state.rate_limiter.record_success(ip);
            }
            request.extensions_mut().insert(user);
            next.run(request).await
        },
        Ok(Verdict::Rejected) => {
            if let Some(ip) = ip {
                state.rate_limiter.record_failed_attempt(ip);
            }
            unauthorized(&state.settings.realm)
        },
        Err(e) => e.into_response(),
    }
}

fn unauthorized(realm: &str) -> Response {
    let mut response = AppError::Unauthorized.into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, basic_challenge(realm));
    response
}

/// Address the lockout is keyed on.
///
/// With `trust_proxy_headers` this is `x-real-ip`, then the first
/// `x-forwarded-for` hop, then the peer address. Otherwise the headers are
/// client-controlled and only the peer address counts.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> Option<IpAddr> {
    let peer_ip = peer.map(|ConnectInfo(addr)| addr.ip());
    if !trust_proxy_headers {
        return peer_ip;
    }

    let from_header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    from_header("x-real-ip")
        .or_else(|| from_header("x-forwarded-for"))
        .or(peer_ip)
}
