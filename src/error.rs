//! Errors shared by the survey workflows and the web layer.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use askama_actix::Template;
use sea_orm::DbErr;
use std::collections::BTreeMap;

/// Per-field validation messages, keyed by form field name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for a field. The first message for a field wins.
    pub fn add<F, M>(&mut self, field: F, message: M)
    where
        F: Into<String>,
        M: Into<String>,
    {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&String> {
        self.0.get(field)
    }

    /// The message for a field, or "" when it has none. For templates.
    pub fn message(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Ok when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let message = errs
                .iter()
                .find_map(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is invalid", field));
            fields.add(field, message);
        }
        fields
    }
}

#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed input. Handlers re-render the form with these.
    Validation(FieldErrors),
    /// No logged in user; answered with a redirect to the login page.
    Unauthenticated,
    /// Logged in, but lacking the permission or ownership required.
    Forbidden(&'static str),
    /// Referenced row does not exist.
    NotFound(&'static str),
    Database(DbErr),
    Internal(String),
}

impl AppError {
    /// Shorthand for a validation error on a single field.
    pub fn field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        AppError::Validation(errors)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(errors) => {
                write!(f, "Validation failed:")?;
                for (field, message) in errors.iter() {
                    write!(f, " {}: {};", field, message)?;
                }
                Ok(())
            }
            AppError::Unauthenticated => write!(f, "Login required"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(what) => write!(f, "{} not found", what),
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<DbErr> for AppError {
    fn from(e: DbErr) -> Self {
        AppError::Database(e)
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: u16,
    reason: &'a str,
    message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let message = match self {
            AppError::Unauthenticated => {
                return HttpResponse::Found()
                    .append_header((header::LOCATION, "/login/"))
                    .finish();
            }
            AppError::Database(_) | AppError::Internal(_) => {
                log::error!("{}", self);
                "Something went wrong on our end.".to_owned()
            }
            AppError::Forbidden(msg) => {
                log::debug!("Access denied: {}", msg);
                msg.to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorTemplate {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error"),
            message,
        }
        .render()
        .unwrap_or_else(|e| {
            log::error!("Failed to render error page: {}", e);
            status.to_string()
        });

        HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(body)
    }
}
