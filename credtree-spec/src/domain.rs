use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// A runtime-supplied constraint a domain must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub enum Requirement {
    /// The consumer will talk over this URI scheme.
    Scheme { scheme: String },
    /// The consumer needs to reach this host.
    Hostname { hostname: String },
    /// The consumer targets this path on the host.
    Path { path: String },
    /// A requirement category this crate predates.
    Other { category: String, value: String },
}

impl Requirement {
    pub fn scheme(scheme: impl Into<String>) -> Self {
        Requirement::Scheme {
            scheme: scheme.into(),
        }
    }

    pub fn hostname(hostname: impl Into<String>) -> Self {
        Requirement::Hostname {
            hostname: hostname.into(),
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Requirement::Path { path: path.into() }
    }

    pub fn category(&self) -> &str {
        match self {
            Requirement::Scheme { .. } => "scheme",
            Requirement::Hostname { .. } => "hostname",
            Requirement::Path { .. } => "path",
            Requirement::Other { category, .. } => category,
        }
    }
}

/// A matching rule attached to a domain. The set of categories is open:
/// rules of a category this crate does not understand deserialize as
/// [`Specification::Other`] and stay neutral during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub enum Specification {
    /// Accepts any of the listed URI schemes.
    Scheme { schemes: Vec<String> },
    /// Accepts hosts matching an include pattern and no exclude pattern.
    /// Patterns are literal hostnames or `*.suffix` wildcards; an empty
    /// include list accepts every host not explicitly excluded.
    Hostname {
        #[serde(default)]
        includes: Vec<String>,
        #[serde(default)]
        excludes: Vec<String>,
    },
    /// Accepts paths by prefix pattern (`prefix/*`) or exact match.
    Path {
        #[serde(default)]
        includes: Vec<String>,
        #[serde(default)]
        excludes: Vec<String>,
    },
    /// A specification category this crate predates.
    Other {
        category: String,
        data: serde_json::Value,
    },
}

impl Specification {
    pub fn category(&self) -> &str {
        match self {
            Specification::Scheme { .. } => "scheme",
            Specification::Hostname { .. } => "hostname",
            Specification::Path { .. } => "path",
            Specification::Other { category, .. } => category,
        }
    }

    /// Evaluates the rule against one requirement.
    ///
    /// `None` means the requirement belongs to a different category, or the
    /// rule's category is unknown here. Neutral either way: never a match
    /// and never a veto.
    pub fn satisfies(&self, requirement: &Requirement) -> Option<bool> {
        match (self, requirement) {
            (Specification::Scheme { schemes }, Requirement::Scheme { scheme }) => {
                Some(schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)))
            }
            (
                Specification::Hostname { includes, excludes },
                Requirement::Hostname { hostname },
            ) => {
                let host = hostname.to_ascii_lowercase();
                if excludes.iter().any(|p| host_matches(p, &host)) {
                    return Some(false);
                }
                Some(includes.is_empty() || includes.iter().any(|p| host_matches(p, &host)))
            }
            (Specification::Path { includes, excludes }, Requirement::Path { path }) => {
                if excludes.iter().any(|p| path_matches(p, path)) {
                    return Some(false);
                }
                Some(includes.is_empty() || includes.iter().any(|p| path_matches(p, path)))
            }
            _ => None,
        }
    }
}

fn host_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    match pattern.strip_prefix("*.") {
        Some(suffix) => host == suffix || host.ends_with(&format!(".{suffix}")),
        None => host == pattern,
    }
}

fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => path == prefix || path.starts_with(&format!("{prefix}/")),
        None => path == pattern,
    }
}

/// A named bucket of credentials qualified by matching rules.
///
/// The domain with no name is the implicit global domain; it carries no
/// specifications and matches any requirement set. The name, not the full
/// description, is the join identity when reconciling domain maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    specifications: Vec<Specification>,
}

impl Domain {
    /// The implicit global domain.
    pub fn global() -> Self {
        Self {
            name: None,
            description: None,
            specifications: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::EmptyComponent {
                field: "domain name",
            });
        }
        Ok(Self {
            name: Some(name),
            description: None,
            specifications: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_specification(mut self, specification: Specification) -> Self {
        self.specifications.push(specification);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn specifications(&self) -> &[Specification] {
        &self.specifications
    }

    pub fn is_global(&self) -> bool {
        self.name.is_none()
    }

    /// Decides whether this domain accepts the supplied requirement set.
    ///
    /// The global domain accepts everything, and every domain accepts an
    /// empty requirement set. Otherwise the decision is a conjunction over
    /// requirements with a disjunction over specifications per requirement:
    /// each requirement must be satisfied by at least one attached rule, so
    /// a domain can list several acceptable hostnames for one required host.
    /// Deterministic for identical inputs.
    pub fn matches(&self, requirements: &[Requirement]) -> bool {
        if self.is_global() || requirements.is_empty() {
            return true;
        }

        requirements.iter().all(|requirement| {
            self.specifications
                .iter()
                .any(|specification| specification.satisfies(requirement) == Some(true))
        })
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => f.write_str("(global)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_domain() -> Domain {
        Domain::named("git-hosts")
            .unwrap()
            .with_description("credentials for git remotes")
            .with_specification(Specification::Scheme {
                schemes: vec!["https".into(), "ssh".into()],
            })
            .with_specification(Specification::Hostname {
                includes: vec!["github.com".into(), "*.githost.example".into()],
                excludes: vec!["blocked.githost.example".into()],
            })
    }

    #[test]
    fn global_domain_matches_everything() {
        let global = Domain::global();
        assert!(global.matches(&[]));
        assert!(global.matches(&[Requirement::hostname("anywhere.example")]));
        assert!(global.matches(&[Requirement::Other {
            category: "region".into(),
            value: "eu-west-1".into(),
        }]));
    }

    #[test]
    fn empty_requirements_match_every_domain() {
        assert!(git_domain().matches(&[]));
    }

    #[test]
    fn named_domain_without_specifications_only_matches_empty_requirements() {
        let bare = Domain::named("bare").unwrap();
        assert!(bare.matches(&[]));
        assert!(!bare.matches(&[Requirement::hostname("github.com")]));
    }

    #[test]
    fn conjunction_over_requirements_disjunction_over_specifications() {
        let domain = git_domain();
        assert!(domain.matches(&[
            Requirement::scheme("https"),
            Requirement::hostname("github.com"),
        ]));
        assert!(domain.matches(&[Requirement::hostname("ci.githost.example")]));
        // One unsatisfied requirement rejects the whole set.
        assert!(!domain.matches(&[
            Requirement::scheme("https"),
            Requirement::hostname("gitlab.com"),
        ]));
        assert!(!domain.matches(&[Requirement::hostname("blocked.githost.example")]));
    }

    #[test]
    fn scheme_comparison_ignores_case() {
        let domain = git_domain();
        assert!(domain.matches(&[Requirement::scheme("HTTPS")]));
    }

    #[test]
    fn unknown_specification_category_is_neutral() {
        let domain = git_domain().with_specification(Specification::Other {
            category: "geo-fence".into(),
            data: serde_json::json!({ "regions": ["eu"] }),
        });
        // The unknown rule neither vetoes a matching set...
        assert!(domain.matches(&[Requirement::hostname("github.com")]));
        // ...nor satisfies a requirement of its own category.
        assert!(!domain.matches(&[Requirement::Other {
            category: "geo-fence".into(),
            value: "eu".into(),
        }]));
    }

    #[test]
    fn match_results_stable_across_calls() {
        let domain = git_domain();
        let requirements = [
            Requirement::scheme("ssh"),
            Requirement::hostname("github.com"),
        ];
        let first = domain.matches(&requirements);
        for _ in 0..20 {
            assert_eq!(domain.matches(&requirements), first);
        }
    }

    #[test]
    fn specification_serde_keeps_unknown_categories() {
        let json = r#"{
            "type": "other",
            "category": "geo-fence",
            "data": { "regions": ["eu"] }
        }"#;
        let spec: Specification = serde_json::from_str(json).unwrap();
        assert_eq!(spec.category(), "geo-fence");
        assert_eq!(spec.satisfies(&Requirement::hostname("github.com")), None);
    }

    #[test]
    fn domain_serde_round_trip() {
        let domain = git_domain();
        let json = serde_json::to_string(&domain).unwrap();
        let back: Domain = serde_json::from_str(&json).unwrap();
        assert_eq!(domain, back);
    }
}
