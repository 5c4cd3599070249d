use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

/// Puts the verified access-token claims into request extensions.
///
/// Anything short of a valid access token is treated as "not logged in" and
/// answered with a redirect to the login flow that remembers the target.
pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal("App config missing".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let claims = match token.map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Access => Some(c),
        Some(Ok(_)) => {
            debug!("Refresh token presented as access token");
            None
        }
        Some(Err(e)) => {
            debug!(error = %e, "Rejected session token");
            None
        }
        None => None,
    };

    let Some(claims) = claims else {
        let resp = AppError::AuthenticationRequired {
            next: req.uri().to_string(),
        }
        .error_response();
        return Ok(req.into_response(resp));
    };

    req.extensions_mut().insert(claims);

    next.call(req).await
}
