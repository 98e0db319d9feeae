//! Compiled, immutable proxy configuration.
//!
//! A `ProxyConfig` is built once, wrapped in an `Arc`, and read by every
//! request. Per-request changes (router overrides) are applied to a
//! [`ProxyOptions`] clone, never to this value.

use std::sync::Arc;

use axum::http::request::Parts;
use url::Url;

use crate::config::schema::{ContextSetting, LogLevel, ProxySettings};
use crate::error::{BoxError, ProxyError, Result};
use crate::http::hooks::{Hooks, OnProxyReq, OnProxyRes};
use crate::http::prepare::ProxyOptions;
use crate::routing::context::{ContextMatcher, ContextPattern};
use crate::routing::rewrite::{PathRewriter, RewriteRule};
use crate::routing::router::{parse_target, TargetRouter};

#[derive(Debug)]
pub struct ProxyConfig {
    context: ContextMatcher,
    target: Option<Url>,
    path_rewrite: Option<PathRewriter>,
    router: Option<TargetRouter>,
    hooks: Hooks,
    log_level: LogLevel,
}

impl ProxyConfig {
    pub fn builder(context: impl Into<ContextPattern>) -> ProxyConfigBuilder {
        ProxyConfigBuilder::new(context.into())
    }

    /// Compile loaded settings.
    pub fn from_settings(settings: &ProxySettings) -> Result<Self> {
        let context = match &settings.context {
            ContextSetting::One(s) => ContextPattern::from(s.as_str()),
            ContextSetting::Many(list) => ContextPattern::from(list.clone()),
        };

        let mut builder = ProxyConfig::builder(context).log_level(settings.log_level);
        if let Some(target) = &settings.target {
            builder = builder.target(target.as_str());
        }
        for rule in &settings.path_rewrite {
            builder = if rule.literal {
                builder.rewrite_literal(&rule.pattern, &rule.replacement)
            } else {
                builder.rewrite_rule(&rule.pattern, &rule.replacement)
            };
        }
        for entry in &settings.router {
            builder = builder.route(&entry.key, &entry.target);
        }
        builder.build()
    }

    pub fn context(&self) -> &ContextMatcher {
        &self.context
    }

    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }

    pub fn path_rewrite(&self) -> Option<&PathRewriter> {
        self.path_rewrite.as_ref()
    }

    pub fn router(&self) -> Option<&TargetRouter> {
        self.router.as_ref()
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Fresh per-request options seeded from the shared configuration.
    pub fn options(&self) -> ProxyOptions {
        ProxyOptions {
            target: self.target.clone(),
        }
    }
}

enum RuleSource {
    Pattern(String, String),
    Literal(String, String),
}

enum RouterSource {
    Table(Vec<(String, String)>),
    Custom(TargetRouter),
}

/// Fluent builder for [`ProxyConfig`]. Compilation errors surface from [`build`](Self::build).
pub struct ProxyConfigBuilder {
    context: ContextPattern,
    target: Option<String>,
    rules: Vec<RuleSource>,
    rewrite_fn: Option<PathRewriter>,
    router: Option<RouterSource>,
    hooks: Hooks,
    log_level: LogLevel,
}

impl ProxyConfigBuilder {
    fn new(context: ContextPattern) -> Self {
        Self {
            context,
            target: None,
            rules: Vec::new(),
            rewrite_fn: None,
            router: None,
            hooks: Hooks::default(),
            log_level: LogLevel::default(),
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Append a regex rewrite rule.
    pub fn rewrite_rule(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.rules.push(RuleSource::Pattern(pattern.into(), replacement.into()));
        self
    }

    /// Append a literal-substring rewrite rule.
    pub fn rewrite_literal(mut self, needle: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.rules.push(RuleSource::Literal(needle.into(), replacement.into()));
        self
    }

    pub fn path_rewrite_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Parts) -> Option<String> + Send + Sync + 'static,
    {
        self.rewrite_fn = Some(PathRewriter::custom(f));
        self
    }

    /// Append a routing table entry.
    pub fn route(mut self, key: impl Into<String>, target: impl Into<String>) -> Self {
        let entry = (key.into(), target.into());
        match &mut self.router {
            Some(RouterSource::Table(table)) => table.push(entry),
            _ => self.router = Some(RouterSource::Table(vec![entry])),
        }
        self
    }

    pub fn router_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Parts) -> std::result::Result<Option<String>, BoxError> + Send + Sync + 'static,
    {
        self.router = Some(RouterSource::Custom(TargetRouter::custom(f)));
        self
    }

    pub fn on_proxy_req(mut self, hook: impl OnProxyReq + 'static) -> Self {
        self.hooks.on_proxy_req = Arc::new(hook);
        self
    }

    pub fn on_proxy_res(mut self, hook: impl OnProxyRes + 'static) -> Self {
        self.hooks.on_proxy_res = Arc::new(hook);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn build(self) -> Result<ProxyConfig> {
        let context = ContextMatcher::compile(self.context)?;

        let target = self
            .target
            .map(|t| {
                parse_target(&t)
                    .map_err(|e| ProxyError::configuration(format!("target {:?}: {}", t, e)))
            })
            .transpose()?;

        let path_rewrite = match (self.rewrite_fn, self.rules.is_empty()) {
            (Some(_), false) => {
                return Err(ProxyError::configuration(
                    "path rewrite rules and a rewrite function are mutually exclusive",
                ))
            }
            (Some(f), true) => Some(f),
            (None, false) => {
                let rules = self
                    .rules
                    .into_iter()
                    .map(|rule| match rule {
                        RuleSource::Pattern(p, r) => RewriteRule::pattern(&p, r),
                        RuleSource::Literal(l, r) => RewriteRule::literal(l, r),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Some(PathRewriter::Rules(rules))
            }
            (None, true) => None,
        };

        let router = match self.router {
            Some(RouterSource::Table(table)) => Some(TargetRouter::table(table)?),
            Some(RouterSource::Custom(router)) => Some(router),
            None => None,
        };

        if target.is_none() && router.is_none() {
            return Err(ProxyError::configuration("either target or router must be configured"));
        }

        Ok(ProxyConfig {
            context,
            target,
            path_rewrite,
            router,
            hooks: self.hooks,
            log_level: self.log_level,
        })
    }
}
