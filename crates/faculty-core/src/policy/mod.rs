//! Route authorization policy
//!
//! A first-match rule table over `(method, path)`. It only reads the
//! [`RequestContext`] attached by the identity filter.

use axum::http::Method;

use crate::config::PolicySettings;
use crate::error::AccessDenied;
use crate::filter::RequestContext;
use crate::types::Role;

/// Roles allowed on admin routes
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::DepartmentHead];

/// What a route demands from the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    AnyRole(Vec<Role>),
}

/// Path matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// Matches the prefix itself and anything below it, on segment boundaries
    Prefix(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => {
                let prefix = prefix.trim_end_matches('/');
                match path.strip_prefix(prefix) {
                    Some(rest) => rest.is_empty() || rest.starts_with('/'),
                    None => false,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    method: Option<Method>,
    pattern: PathPattern,
    requirement: Requirement,
}

impl Rule {
    fn applies(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.matches(path)
    }
}

/// Ordered rule table; anything unmatched needs an authenticated caller
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<Rule>,
}

impl AccessPolicy {
    pub fn new(settings: &PolicySettings) -> Self {
        let mut policy = Self { rules: Vec::new() };

        // CORS preflight never carries credentials
        policy.push(Some(Method::OPTIONS), PathPattern::Prefix("/".into()), Requirement::Public);
        policy.push(Some(Method::POST), PathPattern::Exact("/api/auth/login".into()), Requirement::Public);
        policy.push(Some(Method::POST), PathPattern::Exact("/api/auth/logout".into()), Requirement::Public);
        policy.push(Some(Method::GET), PathPattern::Exact("/api/auth/health".into()), Requirement::Public);
        policy.push(None, PathPattern::Prefix("/api/public".into()), Requirement::Public);
        policy.push(None, PathPattern::Exact("/error".into()), Requirement::Public);
        policy.push(None, PathPattern::Exact("/actuator/health".into()), Requirement::Public);
        for prefix in &settings.public_prefixes {
            policy.push(None, PathPattern::Prefix(prefix.clone()), Requirement::Public);
        }

        for prefix in &settings.admin_prefixes {
            policy.push(
                None,
                PathPattern::Prefix(prefix.clone()),
                Requirement::AnyRole(ADMIN_ROLES.to_vec()),
            );
        }
        policy
    }

    fn push(&mut self, method: Option<Method>, pattern: PathPattern, requirement: Requirement) {
        self.rules.push(Rule {
            method,
            pattern,
            requirement,
        });
    }

    /// Requirement of the first rule matching the request
    pub fn classify(&self, method: &Method, path: &str) -> Requirement {
        self.rules
            .iter()
            .find(|rule| rule.applies(method, path))
            .map(|rule| rule.requirement.clone())
            .unwrap_or(Requirement::Authenticated)
    }

    pub fn evaluate(
        &self,
        method: &Method,
        path: &str,
        context: &RequestContext,
    ) -> Result<(), AccessDenied> {
        match self.classify(method, path) {
            Requirement::Public => Ok(()),
            Requirement::Authenticated => context
                .principal()
                .map(|_| ())
                .ok_or(AccessDenied::Unauthenticated),
            Requirement::AnyRole(roles) => {
                let principal = context.principal().ok_or(AccessDenied::Unauthenticated)?;
                if roles.contains(&principal.role) {
                    Ok(())
                } else {
                    Err(AccessDenied::Forbidden)
                }
            }
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(&PolicySettings::default())
    }
}
