//! This crate grades ACLs: [acl::Acl] folds statements into a canonical rule set, and
//! [acl::Acl::mark_against] compares two finalized ACLs into a [report::MarkReport] that can be
//! forwarded to any [report::ErrorSink].
pub mod acl;
mod error;
pub mod report;

pub use error::AclError;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        acl::{Acl, AclState, Direction, StatementOutcome},
        report::{ErrorSink, MarkReport, MemorySink},
        AclError,
    };
}
