//! Backend-agnostic search filters derived from effective access scopes.

use crate::domain::ResourceScope;
use crate::errors::{Result, SacError};
use crate::sac::effective_access_scope::{ClusterNode, ScopeState, ScopeTree};
use serde::Serialize;
use std::fmt;

/// Fields a scoped search result is filtered on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    ClusterId,
    Namespace,
    /// Any other backend field, used by callers composing their own queries
    Custom(String),
}

impl SearchField {
    pub fn as_str(&self) -> &str {
        match self {
            SearchField::ClusterId => "Cluster ID",
            SearchField::Namespace => "Namespace",
            SearchField::Custom(name) => name.as_str(),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Matches no document
    MatchNone,
    /// Exact match on `value`
    Match {
        field: SearchField,
        value: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        highlight: bool,
    },
    /// Matches any value of `field`
    Wildcard {
        field: SearchField,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        highlight: bool,
    },
    Conjunction {
        queries: Vec<Query>,
    },
    Disjunction {
        queries: Vec<Query>,
    },
}

impl Query {
    pub fn exact(field: SearchField, value: impl Into<String>) -> Self {
        Query::Match { field, value: value.into(), highlight: false }
    }

    pub fn wildcard(field: SearchField) -> Self {
        Query::Wildcard { field, highlight: false }
    }

    /// Mark a field query for highlighting in search results
    pub fn highlighted(self) -> Self {
        match self {
            Query::Match { field, value, .. } => Query::Match { field, value, highlight: true },
            Query::Wildcard { field, .. } => Query::Wildcard { field, highlight: true },
            other => other,
        }
    }

    /// Conjunction of `queries`; a single query is returned as is
    pub fn and(mut queries: Vec<Query>) -> Self {
        if queries.len() == 1 {
            return queries.remove(0);
        }
        Query::Conjunction { queries }
    }

    /// Disjunction of `queries`; empty matches nothing, a single query is
    /// returned as is
    pub fn or(mut queries: Vec<Query>) -> Self {
        match queries.len() {
            0 => Query::MatchNone,
            1 => queries.remove(0),
            _ => Query::Disjunction { queries },
        }
    }

    pub fn is_match_none(&self) -> bool {
        matches!(self, Query::MatchNone)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::MatchNone => f.write_str("<match none>"),
            Query::Match { field, value, .. } => write!(f, "{}:{}", field, value),
            Query::Wildcard { field, .. } => write!(f, "{}:*", field),
            Query::Conjunction { queries } => write_joined(f, queries, " AND "),
            Query::Disjunction { queries } => write_joined(f, queries, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, queries: &[Query], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", query)?;
    }
    f.write_str(")")
}

/// Filter restricting a search to what `tree` grants.
///
/// `None` means no filtering is needed. A missing or excluded tree yields
/// [`Query::MatchNone`]. Clusters are matched on their id; for
/// namespace-scoped resources each cluster term is conjoined with its
/// included namespace names, or with a namespace wildcard when the whole
/// cluster is included. `verbose` marks every field term for highlighting.
///
/// # Errors
///
/// Returns [`SacError::NotSupported`] for globally scoped resources.
pub fn build_sac_query_filter(
    tree: Option<&ScopeTree>,
    scope: ResourceScope,
    verbose: bool,
) -> Result<Option<Query>> {
    if scope == ResourceScope::Global {
        return Err(SacError::not_supported("query filters for globally scoped resources"));
    }
    let Some(tree) = tree else {
        return Ok(Some(Query::MatchNone));
    };
    match tree.state {
        ScopeState::Included => return Ok(None),
        ScopeState::Excluded => return Ok(Some(Query::MatchNone)),
        ScopeState::Partial => {}
    }

    let mut names: Vec<&String> = tree.clusters.keys().collect();
    names.sort();

    let terms = names
        .into_iter()
        .filter_map(|name| tree.clusters.get(name))
        .filter_map(|cluster| cluster_filter(cluster, scope, verbose))
        .collect();

    Ok(Some(Query::or(terms)))
}

fn cluster_filter(cluster: &ClusterNode, scope: ResourceScope, verbose: bool) -> Option<Query> {
    let field = |query: Query| if verbose { query.highlighted() } else { query };
    let cluster_term = field(Query::exact(SearchField::ClusterId, cluster.attributes.id.clone()));

    match (cluster.state, scope) {
        (ScopeState::Excluded, _) => None,
        (_, ResourceScope::Cluster) => Some(cluster_term),
        (ScopeState::Included, _) => {
            Some(Query::and(vec![cluster_term, field(Query::wildcard(SearchField::Namespace))]))
        }
        (ScopeState::Partial, _) => {
            let namespaces: Vec<Query> = cluster
                .included_namespaces()
                .into_iter()
                .map(|ns| field(Query::exact(SearchField::Namespace, ns)))
                .collect();
            if namespaces.is_empty() {
                return None;
            }
            Some(Query::and(vec![cluster_term, Query::or(namespaces)]))
        }
    }
}

/// Conjoin `query` with the filter for `tree`.
///
/// The user query is returned unchanged when no filtering is needed; a
/// missing user query is replaced by the filter alone.
pub fn enrich_query(
    query: Option<Query>,
    tree: Option<&ScopeTree>,
    scope: ResourceScope,
) -> Result<Option<Query>> {
    let filter = build_sac_query_filter(tree, scope, false)?;
    Ok(match (query, filter) {
        (query, None) => query,
        (None, Some(filter)) => Some(filter),
        (Some(_), Some(Query::MatchNone)) => Some(Query::MatchNone),
        (Some(query), Some(filter)) => Some(Query::and(vec![query, filter])),
    })
}
