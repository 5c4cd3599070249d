use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use derive_more::Display;
use serde_json::json;

/// Path the auth collaborator serves its login flow on.
pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Display)]
pub enum AppError {
    /// Authenticated, but the role set does not allow this view or action.
    #[display(fmt = "Forbidden: {}", _0)]
    Forbidden(String),

    /// No usable session; the caller is sent to the login flow and back to `next`.
    #[display(fmt = "Authentication required")]
    AuthenticationRequired { next: String },

    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "Database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "Internal error: {}", _0)]
    Internal(String),
}

impl AppError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    pub fn login_location(next: &str) -> String {
        format!("{}?next={}", LOGIN_PATH, urlencoding::encode(next))
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict("A record with this value already exists".into());
            }
        }
        AppError::Database(e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::AuthenticationRequired { .. } => StatusCode::SEE_OTHER,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::AuthenticationRequired { next } => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, Self::login_location(next)))
                .finish(),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal Server Error"
                }))
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal Server Error"
                }))
            }
            other => HttpResponse::build(other.status_code()).json(json!({
                "error": other.to_string()
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_access_redirects_to_login_keeping_destination() {
        let err = AppError::AuthenticationRequired {
            next: "/admin/request?page=2".into(),
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/auth/login?next=%2Fadmin%2Frequest%3Fpage%3D2"
        );
    }

    #[test]
    fn forbidden_maps_to_403() {
        let err = AppError::forbidden("superuser only");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Forbidden: superuser only");
    }
}
