//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Targets must be reachable `http` URIs
//! - Patterns must compile
//! - At least one of `target` / `router` must be present
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxySettings → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxySettings;
use crate::routing::context::is_glob;
use crate::routing::router::parse_target;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_settings(settings: &ProxySettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let entries = settings.context.entries();
    if entries.is_empty() {
        errors.push(ValidationError::new("context", "must not be an empty list"));
    }
    for (i, entry) in entries.iter().enumerate() {
        let pattern = entry.strip_prefix('!').unwrap_or(entry);
        if is_glob(entry) {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError::new(format!("context[{}]", i), e.to_string()));
            }
        }
    }

    if settings.target.is_none() && settings.router.is_empty() {
        errors.push(ValidationError::new("target", "either target or router must be set"));
    }
    if let Some(target) = &settings.target {
        if let Err(e) = parse_target(target) {
            errors.push(ValidationError::new("target", e));
        }
    }

    for (i, entry) in settings.router.iter().enumerate() {
        if entry.key.is_empty() {
            errors.push(ValidationError::new(format!("router[{}].key", i), "must not be empty"));
        }
        if let Err(e) = parse_target(&entry.target) {
            errors.push(ValidationError::new(format!("router[{}].target", i), e));
        }
    }

    for (i, rule) in settings.path_rewrite.iter().enumerate() {
        let field = format!("path_rewrite[{}].pattern", i);
        if rule.pattern.is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        } else if !rule.literal {
            if let Err(e) = regex::Regex::new(&rule.pattern) {
                errors.push(ValidationError::new(field, e.to_string()));
            }
        }
    }

    if settings.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address {:?}", settings.listener.bind_address),
        ));
    }

    if settings.observability.metrics_enabled
        && settings.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", settings.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
