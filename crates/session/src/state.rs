use crate::error::SessionError;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use uast_dev_mappings::{CustomEntry, Language, Selection};

pub const NO_TREE_MESSAGE: &str = "No UAST data yet. Start typing code to parse automatically.";
pub const NO_TREE_DATA_MESSAGE: &str = "No UAST data available. Parse some code first.";
pub const NO_QUERY_MESSAGE: &str = "No query results yet. Enter a query to see results.";

/// A decoded parse result, kept next to the exact text the parser returned so queries receive
/// it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UastTree {
    pub json: String,
    pub value: serde_json::Value,
}

impl Serialize for UastTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl UastTree {
    #[must_use]
    pub fn pretty(&self) -> String {
        uast_dev_protocol::pretty_json(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum TreeState {
    NoData,
    Tree(Arc<UastTree>),
    Error(SessionError),
}

impl TreeState {
    #[must_use]
    pub fn tree(&self) -> Option<&UastTree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&SessionError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Text shown in an output panel.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::NoData => NO_TREE_MESSAGE.to_string(),
            Self::Tree(tree) => tree.pretty(),
            Self::Error(err) => format!("Error parsing code: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum QueryState {
    /// The query text is blank.
    NoQuery,
    /// There is no tree to query (never parsed, blank code, or a failed parse).
    NoTreeData,
    Results(Arc<serde_json::Value>),
    Error(SessionError),
}

impl QueryState {
    #[must_use]
    pub fn results(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Results(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&SessionError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::NoQuery => NO_QUERY_MESSAGE.to_string(),
            Self::NoTreeData => NO_TREE_DATA_MESSAGE.to_string(),
            Self::Results(value) => uast_dev_protocol::pretty_json(value),
            Self::Error(err @ SessionError::ServiceReported { .. }) => format!("Query Error: {err}"),
            Self::Error(err) => format!("Error executing query: {err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Parse,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Idle,
    Scheduled,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    Issued,
    Applied,
    Superseded,
    Failed,
    /// A guard answered without contacting the service.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub phase: PipelinePhase,
    /// Latest generation issued (or invalidated by a guard).
    pub generation: u64,
    pub last_outcome: Option<PipelineOutcome>,
    pub requests_issued: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum MappingStatus {
    Loading,
    Ready,
    /// The catalog has no embedded mapping for the language.
    Missing,
    Unavailable(SessionError),
}

/// Everything a presentation layer needs, published after every state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub language: Language,
    pub code: String,
    pub query: String,
    pub selection: Option<Selection>,
    pub mapping_status: MappingStatus,
    pub custom_mappings: Vec<CustomEntry>,
    pub tree: TreeState,
    pub query_result: QueryState,
    pub parse_status: PipelineStatus,
    pub query_status: PipelineStatus,
}

impl SessionSnapshot {
    /// No timer pending, nothing in flight, no mapping load outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.parse_status.phase == PipelinePhase::Idle
            && self.query_status.phase == PipelinePhase::Idle
            && self.mapping_status != MappingStatus::Loading
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    LanguageChanged {
        language: Language,
    },
    SelectionChanged {
        mapping: Option<String>,
    },
    Pipeline {
        kind: PipelineKind,
        generation: u64,
        outcome: PipelineOutcome,
    },
}
