//! This crate provides the rule model of the ACL engine: header spans, rules, overlap resolution
//! and the canonical rule set used to compare ACLs.
pub mod canon;
pub mod resolve;
pub mod rule;
pub mod span;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        canon::RuleSet,
        resolve::{create_nonoverlapping_rules, resolve},
        rule::{Action, Protocol, Pruned, Rule, SortKey},
        span::Span,
    };
}
