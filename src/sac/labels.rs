//! Set-based label selector matching.
//!
//! Rules are compiled into [`Selector`]s and evaluated against *augmented*
//! label maps: the object's own labels plus a synthetic
//! [`FQSN_LABEL_KEY`] entry holding its fully qualified scope name
//! (`cluster` for clusters, `cluster::namespace` for namespaces). Name based
//! inclusion therefore goes through the same matcher as label selection.
//!
//! A selector with no requirements matches nothing. Selectors in a list are
//! OR'd and the requirements of one selector are AND'd.

use crate::domain::{
    Cluster, Labels, NamespaceMetadata, SelectorOperator, SetBasedLabelSelector,
};
use crate::errors::{Result, SacError};
use crate::sac::effective_access_scope::ScopeState;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Synthetic label carrying the fully qualified scope name
pub const FQSN_LABEL_KEY: &str = "fleetscope.io/authz.metadata.fqsn";

/// Separator between cluster and namespace in a fully qualified scope name
pub const FQSN_SEPARATOR: &str = "::";

const MAX_LABEL_NAME_LENGTH: usize = 63;
const MAX_LABEL_PREFIX_LENGTH: usize = 253;

lazy_static! {
    /// NOTE: expect() acceptable - pattern is validated by tests
    static ref LABEL_NAME_REGEX: Regex = Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$")
        .expect("BUG: LABEL_NAME_REGEX pattern is invalid - validated by tests");

    /// NOTE: expect() acceptable - pattern is validated by tests
    static ref LABEL_PREFIX_REGEX: Regex =
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .expect("BUG: LABEL_PREFIX_REGEX pattern is invalid - validated by tests");

    /// NOTE: expect() acceptable - pattern is validated by tests
    static ref LABEL_VALUE_REGEX: Regex =
        Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$")
            .expect("BUG: LABEL_VALUE_REGEX pattern is invalid - validated by tests");
}

/// Fully qualified scope name of a namespace
pub fn namespace_fqsn(cluster_name: &str, namespace_name: &str) -> String {
    format!("{}{}{}", cluster_name, FQSN_SEPARATOR, namespace_name)
}

/// A single compiled selector requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    op: SelectorOperator,
    values: BTreeSet<String>,
}

impl Requirement {
    /// Build a requirement, validating key, operator arity and values
    pub fn new<I, S>(key: &str, op: SelectorOperator, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_label_key(key)?;
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        match op {
            SelectorOperator::In | SelectorOperator::NotIn => {
                if values.is_empty() {
                    return Err(SacError::selector(format!(
                        "values must be non-empty for {:?} on key '{}'",
                        op, key
                    )));
                }
                for value in &values {
                    validate_label_value(key, value)?;
                }
            }
            SelectorOperator::Exists | SelectorOperator::NotExists => {
                if !values.is_empty() {
                    return Err(SacError::selector(format!(
                        "values must be empty for {:?} on key '{}'",
                        op, key
                    )));
                }
            }
        }
        Ok(Self { key: key.to_string(), op, values })
    }

    /// Build a requirement without validation.
    ///
    /// Used for the synthetic name label whose values contain the
    /// [`FQSN_SEPARATOR`] and may exceed label value length limits.
    pub fn new_unvalidated<I, S>(key: &str, op: SelectorOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { key: key.to_string(), op, values: values.into_iter().map(Into::into).collect() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        let value = labels.get(&self.key);
        match self.op {
            SelectorOperator::In => value.is_some_and(|v| self.values.contains(v)),
            SelectorOperator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            SelectorOperator::Exists => value.is_some(),
            SelectorOperator::NotExists => value.is_none(),
        }
    }
}

/// A conjunction of requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    /// Compile a declarative selector, validating every requirement
    pub fn from_set_based(selector: &SetBasedLabelSelector) -> Result<Self> {
        let requirements = selector
            .requirements
            .iter()
            .map(|req| Requirement::new(&req.key, req.op, req.values.iter().cloned()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// An empty selector matches nothing
    pub fn matches(&self, labels: &Labels) -> bool {
        !self.requirements.is_empty() && self.requirements.iter().all(|r| r.matches(labels))
    }
}

/// Compile a list of declarative selectors
pub fn convert_selectors(selectors: &[SetBasedLabelSelector]) -> Result<Vec<Selector>> {
    selectors.iter().map(Selector::from_set_based).collect()
}

/// Included iff any selector matches
pub fn match_labels(selectors: &[Selector], labels: &Labels) -> ScopeState {
    if selectors.iter().any(|s| s.matches(labels)) {
        ScopeState::Included
    } else {
        ScopeState::Excluded
    }
}

/// Cluster labels plus the synthetic name label
pub fn augmented_cluster_labels(cluster: &Cluster) -> Labels {
    let mut labels = cluster.labels.clone();
    labels.insert(FQSN_LABEL_KEY.to_string(), cluster.name.clone());
    labels
}

/// Namespace labels plus the synthetic `cluster::namespace` label
pub fn augmented_namespace_labels(namespace: &NamespaceMetadata) -> Labels {
    let mut labels = namespace.labels.clone();
    labels.insert(
        FQSN_LABEL_KEY.to_string(),
        namespace_fqsn(&namespace.cluster_name, &namespace.name),
    );
    labels
}

fn validate_label_key(key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty()
            || prefix.len() > MAX_LABEL_PREFIX_LENGTH
            || !LABEL_PREFIX_REGEX.is_match(prefix)
        {
            return Err(SacError::selector(format!(
                "invalid label key '{}': prefix must be a DNS subdomain",
                key
            )));
        }
    }

    if name.is_empty() {
        return Err(SacError::selector(format!("invalid label key '{}': name part is empty", key)));
    }
    if name.len() > MAX_LABEL_NAME_LENGTH || !LABEL_NAME_REGEX.is_match(name) {
        return Err(SacError::selector(format!(
            "invalid label key '{}': name must be at most {} alphanumeric characters, '-', '_' or '.'",
            key, MAX_LABEL_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_label_value(key: &str, value: &str) -> Result<()> {
    if value.len() > MAX_LABEL_NAME_LENGTH || !LABEL_VALUE_REGEX.is_match(value) {
        return Err(SacError::selector(format!(
            "invalid value '{}' for label key '{}'",
            value, key
        )));
    }
    Ok(())
}
