use thiserror::Error;

/// Failure taxonomy for the editor core.
///
/// `Structural` means the flat element sequence no longer satisfies the model
/// invariants (an id or `group_ids` chain references nothing). It is fatal and
/// never retried. `NotFound` is a programmer error (unknown command name or
/// mutation anchor). `Environment` surfaces a missing host capability at
/// startup, e.g. a renderer without caret-from-point support.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Schema structure is corrupt: cannot resolve element ({id})")]
    Structural { id: String },

    #[error("Cannot find element ({0})")]
    ElementNotFound(String),

    #[error("Command '{0}' does not exist")]
    CommandNotFound(String),

    #[error("Command '{0}' is already registered")]
    CommandExists(String),

    #[error("Host environment is missing a required capability: {0}")]
    Environment(&'static str),
}

impl EditorError {
    pub(crate) fn structural(id: impl ToString) -> Self {
        EditorError::Structural { id: id.to_string() }
    }
}
