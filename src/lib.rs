//! aclmark decides whether an ACL filters packets exactly like a reference ACL, and reports the
//! dead, unreachable and over-scoped statements found on the way.
pub use aclmark_internal::*;
