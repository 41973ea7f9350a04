//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the HTTP handlers and
//! the session gate, along with a mapper to HTTP status codes.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Validation { code: String, message: String },
    Credentials { code: String, message: String },
    TokenInvalid { code: String, message: String },
    TokenExpired { code: String, message: String },
    TokenMalformed { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Credentials { code, .. }
            | AppError::TokenInvalid { code, .. }
            | AppError::TokenExpired { code, .. }
            | AppError::TokenMalformed { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Credentials { message, .. }
            | AppError::TokenInvalid { message, .. }
            | AppError::TokenExpired { message, .. }
            | AppError::TokenMalformed { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn credentials<S: Into<String>>(code: S, msg: S) -> Self { AppError::Credentials { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::Credentials { .. } => 401,
            AppError::TokenInvalid { .. } => 401,
            AppError::TokenExpired { .. } => 401,
            AppError::TokenMalformed { .. } => 401,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<crate::token::TokenError> for AppError {
    fn from(err: crate::token::TokenError) -> Self {
        use crate::token::TokenError;
        match err {
            TokenError::InvalidSignature => AppError::TokenInvalid { code: "token_invalid".into(), message: err.to_string() },
            TokenError::Expired => AppError::TokenExpired { code: "token_expired".into(), message: err.to_string() },
            TokenError::Malformed => AppError::TokenMalformed { code: "token_malformed".into(), message: err.to_string() },
            TokenError::Serialize(_) => AppError::Internal { code: "internal".into(), message: err.to_string() },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}
