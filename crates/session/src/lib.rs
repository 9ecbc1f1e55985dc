//! # UAST Dev Session
//!
//! Keeps the code, the mapping selection and the query of one editing session consistent with
//! the results of the remote parser and query engine.
//!
//! ```text
//! edits ──> SessionController ──(commands)──> session task
//!                                              │
//!             ┌── parse pipeline (debounced) ──┤── ParserService
//!             │                                │
//!             └── query pipeline (debounced) ──┤── QueryService
//!                                              │
//!           watch<SessionSnapshot> <── publish ┘──> broadcast<SessionEvent>
//! ```
//!
//! Each pipeline tags requests with a generation; only the latest generation is ever applied,
//! so slow responses can never overwrite newer results. A successful parse chains exactly one
//! query when the query text is non-blank.

mod config;
mod controller;
mod decode;
mod error;
mod pipeline;
mod service;
mod state;

pub use config::{SessionConfig, DEFAULT_LANGUAGE, DEFAULT_PARSE_DEBOUNCE, DEFAULT_QUERY_DEBOUNCE};
pub use controller::SessionController;
pub use error::{Result, SessionError};
pub use service::{ParserService, QueryService, SessionServices};
pub use state::{
    MappingStatus, PipelineKind, PipelineOutcome, PipelinePhase, PipelineStatus, QueryState,
    SessionEvent, SessionSnapshot, TreeState, UastTree, NO_QUERY_MESSAGE, NO_TREE_DATA_MESSAGE,
    NO_TREE_MESSAGE,
};
