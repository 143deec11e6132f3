use aclmark_io::StatementError;
use thiserror::Error;

use crate::acl::Direction;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error("{0} any-equivalent window is already set")]
    WindowAlreadySet(Direction),

    #[error("any-equivalent window must be set before the first statement")]
    WindowAfterStatements,

    #[error("invalid any-equivalent window {addr}/{prefix_len}")]
    InvalidWindow { addr: std::net::Ipv4Addr, prefix_len: u8 },

    /// Both sides of a comparison must have been finalized.
    #[error("acl is not finalized")]
    NotFinalized,
}
