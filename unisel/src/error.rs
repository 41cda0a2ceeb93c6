use thiserror::Error;

/// The generic error type covering all failures this library can return.
///
/// The selector distinguishes a small number of failure classes. All of them
/// are fatal to the top-level operation that produced them; nothing in the
/// core retries, and compatibility failures during pattern matching are not
/// errors at all (they silently prune the search).
///
/// # Error Categories
///
/// ## Precondition violations
/// - [`Error::Precondition`] - An operation was invoked on an input that
///   violates its documented precondition (e.g. removing a node while keeping
///   its edges when the node has several predecessors)
///
/// ## Structural errors
/// - [`Error::GraphError`] - Malformed graph structure (dangling endpoint,
///   unknown node reference, no unique control-flow root)
///
/// ## Missing external entities
/// - [`Error::MissingEntity`] - A lookup by instruction, pattern, location,
///   match, or array-index-map identifier found nothing
///
/// ## Boundary errors
/// - [`Error::Serialization`] - A persisted model or solution could not be
///   read or written; reported with the offending key path
///
/// ## Solver outcome
/// - [`Error::NoSolution`] - The external solver produced no solution, so
///   raising was not attempted
#[derive(Error, Debug)]
pub enum Error {
    /// An operation was invoked on an input violating its documented
    /// precondition.
    ///
    /// This is always a bug in the caller or in the data fed to the pipeline;
    /// the current top-level operation is aborted. The message names the
    /// operation and the offending identifier.
    #[error("precondition violated in {operation}: {message}")]
    Precondition {
        /// The operation whose precondition was violated
        operation: &'static str,
        /// Description naming the offending entity
        message: String,
    },

    /// Malformed graph structure.
    ///
    /// Produced when an edge references a node that is not in the graph, when
    /// a control-flow graph has no unique root, or when a projection meets a
    /// shape it cannot handle.
    #[error("{0}")]
    GraphError(String),

    /// A lookup by identifier found no matching entity.
    ///
    /// The `kind` names the namespace that was searched (instruction,
    /// pattern, location, match, node, or one of the array-index map lists).
    #[error("no {kind} with id {id}")]
    MissingEntity {
        /// The namespace that was searched
        kind: &'static str,
        /// The identifier that was not found
        id: u64,
    },

    /// A persisted model or solution could not be parsed or emitted.
    ///
    /// The `path` is the key path into the nested key/value tree at which the
    /// failure was detected.
    #[error("serialization error at {path}: {message}")]
    Serialization {
        /// Key path to the offending entry
        path: String,
        /// Underlying parser or emitter message
        message: String,
    },

    /// The external solver reported that no solution exists (or timed out).
    ///
    /// Raising a solution is not attempted when this is returned.
    #[error("solver produced no solution")]
    NoSolution,
}

impl Error {
    /// Creates a [`Error::Precondition`] for the named operation.
    pub(crate) fn precondition(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Precondition {
            operation,
            message: message.into(),
        }
    }
}

/// Result type alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
