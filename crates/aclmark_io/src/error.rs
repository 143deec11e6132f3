use thiserror::Error;

/// Why a single ACL statement could not be turned into rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("statement must start with permit or deny, found `{0}`")]
    Action(String),

    #[error("unknown protocol `{0}`")]
    Protocol(String),

    #[error("invalid address `{0}`")]
    Address(String),

    #[error("invalid port `{0}`")]
    Port(String),

    #[error("empty port range `{0}`")]
    PortRange(String),

    #[error("unsupported qualifier `{0}`")]
    Unsupported(String),

    #[error("unexpected trailing input `{0}`")]
    Trailing(String),

    /// A wildcard mask, or the product of all expansions, describes more
    /// disjoint ranges than the parser is allowed to materialize.
    #[error("statement expands to {count} rules, limit is {limit}")]
    TooManyRanges { count: u64, limit: usize },
}

/// Errors while extracting ACLs from a device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("line {line}: access-list {name} redefined with a different kind")]
    KindConflict { line: usize, name: String },
}
