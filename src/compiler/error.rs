//! Fatal graph errors. Non-fatal conditions travel as diagnostics instead
//! (see [`super::context::Diagnostic`]).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A socket is driven by a link of the wrong semantic type. Shader
    /// sockets are never coerced.
    #[error("socket {socket} of node `{node}` cannot drive a {expected} input")]
    TypeMismatch {
        node: String,
        socket: usize,
        expected: &'static str,
    },

    /// A link path returned to its origin, possibly through a group boundary.
    #[error("cycle detected while evaluating node `{node}`")]
    Cycle { node: String },

    /// A link names a node that does not exist in its graph.
    #[error("link references unknown node `{node}`")]
    UnknownNode { node: String },

    /// The graph has no material-output node to assemble from.
    #[error("graph `{graph}` has no material output node")]
    MissingOutput { graph: String },
}
