use std::{
    fmt::{Display, Formatter},
    net::Ipv4Addr,
};

use aclmark_core::{
    canon::RuleSet,
    rule::{Action, Protocol, Rule},
    span::Span,
};
use aclmark_io::{parse_statement, AclKind, ParseOptions};
use tracing::{debug, warn};

use crate::{error::AclError, report::MarkReport};

/// Which address of a packet an any-equivalent window applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Source,
    Destination,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Source => f.write_str("source"),
            Direction::Destination => f.write_str("destination"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AclState {
    /// Statements still change the rule set.
    Open,
    /// A match-all statement was seen or [Acl::finalize] ran.
    Finalized,
}

/// What [Acl::add_statement] did with a statement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatementOutcome {
    /// Some of its matching space was new.
    Inserted,
    /// Earlier statements already match everything it matches.
    Dead,
    /// It follows a match-all statement and can never be reached.
    PostDefault,
}

/// [Acl] folds an ordered list of statements into the canonical rule set
/// and keeps the bookkeeping needed to grade it against a solution.
///
/// ```text
/// Open --add_statement(match-all)--> Finalized
/// Open --finalize()----------------> Finalized (+ implicit deny ip any any)
/// ```
#[derive(Clone, Debug)]
pub struct Acl {
    kind: AclKind,
    options: ParseOptions,
    rules: RuleSet,
    raw_statements: Vec<String>,
    dead_statements: Vec<String>,
    post_default_statements: Vec<String>,
    state: AclState,
    implicit_default: bool,
    keep_src: Option<Span<u32>>,
    keep_dst: Option<Span<u32>>,
    prune_was_lossy: bool,
    lossy_prune_log: Vec<String>,
}

impl Acl {
    pub fn new(kind: AclKind) -> Self {
        Self::with_options(kind, ParseOptions::default())
    }

    pub fn with_options(kind: AclKind, options: ParseOptions) -> Self {
        Acl {
            kind,
            options,
            rules: RuleSet::new(),
            raw_statements: vec![],
            dead_statements: vec![],
            post_default_statements: vec![],
            state: AclState::Open,
            implicit_default: false,
            keep_src: None,
            keep_dst: None,
            prune_was_lossy: false,
            lossy_prune_log: vec![],
        }
    }

    /// Treat `addr/prefix_len` as equivalent to `any` in `direction`.
    /// Allowed once per direction, before the first statement.
    pub fn set_any_equivalent(
        &mut self,
        direction: Direction,
        addr: Ipv4Addr,
        prefix_len: u8,
    ) -> Result<(), AclError> {
        if self.state == AclState::Finalized
            || !self.raw_statements.is_empty()
            || !self.post_default_statements.is_empty()
        {
            return Err(AclError::WindowAfterStatements);
        }
        let slot = match direction {
            Direction::Source => &mut self.keep_src,
            Direction::Destination => &mut self.keep_dst,
        };
        if slot.is_some() {
            return Err(AclError::WindowAlreadySet(direction));
        }
        let window =
            Span::from_prefix(addr, prefix_len).ok_or(AclError::InvalidWindow { addr, prefix_len })?;
        *slot = Some(window);
        Ok(())
    }

    /// Fold one statement into the rule set. Statements must be added in
    /// configuration order.
    pub fn add_statement(&mut self, text: &str) -> Result<StatementOutcome, AclError> {
        if self.state == AclState::Finalized {
            debug!(statement = text, "post-default statement");
            self.post_default_statements.push(text.to_owned());
            return Ok(StatementOutcome::PostDefault);
        }

        let parsed = parse_statement(text, self.kind, &self.options)?;
        self.raw_statements.push(text.to_owned());

        let (keep_src, keep_dst) = (self.keep_src(), self.keep_dst());
        let mut lossless = true;
        let mut added = 0;
        for rule in parsed.rules {
            let pruned = rule.prune_to(keep_src, keep_dst);
            lossless &= pruned.lossless;
            if let Some(rule) = pruned.rule {
                added += self.rules.insert(rule);
            }
        }
        if !lossless {
            warn!(statement = text, "statement scoped outside the any-equivalent window");
            self.prune_was_lossy = true;
            self.lossy_prune_log.push(text.to_owned());
        }
        if parsed.is_default {
            self.state = AclState::Finalized;
        }

        debug!(statement = text, regions = added, rules = self.rules.len(), "added statement");
        if added == 0 {
            self.dead_statements.push(text.to_owned());
            Ok(StatementOutcome::Dead)
        } else {
            Ok(StatementOutcome::Inserted)
        }
    }

    /// Close the ACL: append the implicit `deny ip any any` unless a
    /// match-all statement was seen, then prune to the own windows.
    /// Calling it again changes nothing.
    pub fn finalize(&mut self) {
        let (keep_src, keep_dst) = (self.keep_src(), self.keep_dst());
        if self.state == AclState::Open {
            if let Some(rule) = Rule::any(Protocol::Ip, Action::Deny)
                .prune_to(keep_src, keep_dst)
                .rule
            {
                self.rules.insert(rule);
            }
            self.implicit_default = true;
            self.state = AclState::Finalized;
        }

        let (rules, lossy) = self.rules.pruned(keep_src, keep_dst);
        if !lossy.is_empty() {
            warn!(rules = lossy.len(), "lossy prune while finalizing");
            self.prune_was_lossy = true;
            self.lossy_prune_log
                .extend(lossy.iter().map(|r| r.to_string()));
        }
        self.rules = rules;
        debug!(rules = self.rules.len(), implicit_default = self.implicit_default, "finalized");
    }

    /// Compare this ACL with `solution`. Own rules are pruned to the
    /// solution's windows first; neither ACL is modified.
    pub fn mark_against(&self, solution: &Acl) -> Result<MarkReport, AclError> {
        if !self.is_finalized() || !solution.is_finalized() {
            return Err(AclError::NotFinalized);
        }

        let (mine, lossy) = self.rules.pruned(solution.keep_src(), solution.keep_dst());
        let equivalent = mine == solution.rules || mine.same_matching_space(&solution.rules);

        let statement_count = self.effective_statement_count();
        let solution_count = solution.effective_statement_count();
        let mut lossy_prunes = self.lossy_prune_log.clone();
        lossy_prunes.extend(lossy.iter().map(|r| r.to_string()));

        debug!(equivalent, statement_count, solution_count, "marked acl");
        Ok(MarkReport {
            equivalent,
            redundant: statement_count > solution_count,
            statement_count,
            solution_count,
            dead_statements: self.dead_statements.clone(),
            post_default_statements: self.post_default_statements.clone(),
            lossy_prunes,
        })
    }

    /// Statements up to and including the match-all one, dead ones
    /// included, plus one for the implicit default.
    pub fn effective_statement_count(&self) -> usize {
        self.raw_statements.len() + usize::from(self.implicit_default)
    }

    #[inline]
    pub fn kind(&self) -> AclKind {
        self.kind
    }

    #[inline]
    pub fn state(&self) -> AclState {
        self.state
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.state == AclState::Finalized
    }

    #[inline]
    pub fn has_implicit_default(&self) -> bool {
        self.implicit_default
    }

    /// The canonical rules in sorted order.
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.sorted()
    }

    #[inline]
    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    pub fn any_equivalent(&self, direction: Direction) -> Option<Span<u32>> {
        match direction {
            Direction::Source => self.keep_src,
            Direction::Destination => self.keep_dst,
        }
    }

    pub fn raw_statements(&self) -> &[String] {
        &self.raw_statements
    }

    pub fn dead_statements(&self) -> &[String] {
        &self.dead_statements
    }

    pub fn post_default_statements(&self) -> &[String] {
        &self.post_default_statements
    }

    pub fn prune_was_lossy(&self) -> bool {
        self.prune_was_lossy
    }

    pub fn lossy_prune_log(&self) -> &[String] {
        &self.lossy_prune_log
    }

    fn keep_src(&self) -> Span<u32> {
        self.keep_src.unwrap_or_else(Span::full)
    }

    fn keep_dst(&self) -> Span<u32> {
        self.keep_dst.unwrap_or_else(Span::full)
    }
}

#[cfg(test)]
mod tests {
    use aclmark_io::StatementError;

    use super::*;

    fn extended(statements: &[&str]) -> Acl {
        let mut acl = Acl::new(AclKind::Extended);
        for s in statements {
            acl.add_statement(s).unwrap();
        }
        acl
    }

    #[test]
    fn test_outcomes() {
        let mut acl = Acl::new(AclKind::Extended);
        assert_eq!(
            acl.add_statement("permit tcp any any eq 80"),
            Ok(StatementOutcome::Inserted)
        );
        assert_eq!(
            acl.add_statement("permit tcp any any eq www"),
            Ok(StatementOutcome::Dead)
        );
        assert_eq!(
            acl.add_statement("deny ip any any"),
            Ok(StatementOutcome::Inserted)
        );
        assert!(acl.is_finalized());
        assert_eq!(
            acl.add_statement("permit udp any any"),
            Ok(StatementOutcome::PostDefault)
        );
        assert_eq!(acl.raw_statements().len(), 3);
        assert_eq!(acl.dead_statements(), ["permit tcp any any eq www"]);
        assert_eq!(acl.post_default_statements(), ["permit udp any any"]);
        assert_eq!(acl.effective_statement_count(), 3);
    }

    #[test]
    fn test_parse_error_leaves_acl_untouched() {
        let mut acl = Acl::new(AclKind::Extended);
        assert_eq!(
            acl.add_statement("permit tcp any any eq 80 established"),
            Err(AclError::Statement(StatementError::Unsupported(
                "established".to_owned()
            )))
        );
        assert!(acl.raw_statements().is_empty());
        assert!(acl.rule_set().is_empty());
    }

    #[test]
    fn test_window_rules() {
        let mut acl = Acl::new(AclKind::Extended);
        let lan = Ipv4Addr::new(10, 0, 0, 0);
        acl.set_any_equivalent(Direction::Source, lan, 8).unwrap();
        assert_eq!(
            acl.set_any_equivalent(Direction::Source, lan, 16),
            Err(AclError::WindowAlreadySet(Direction::Source))
        );
        assert_eq!(
            acl.set_any_equivalent(Direction::Destination, lan, 33),
            Err(AclError::InvalidWindow {
                addr: lan,
                prefix_len: 33
            })
        );
        acl.add_statement("permit ip any any").unwrap();
        assert_eq!(
            acl.set_any_equivalent(Direction::Destination, lan, 8),
            Err(AclError::WindowAfterStatements)
        );
        assert_eq!(
            acl.any_equivalent(Direction::Source),
            Span::from_prefix(lan, 8)
        );
        assert_eq!(acl.any_equivalent(Direction::Destination), None);
    }

    #[test]
    fn test_window_makes_any_and_subnet_equal() {
        let lan = Ipv4Addr::new(192, 168, 1, 0);
        let build = |statement: &str| {
            let mut acl = Acl::new(AclKind::Extended);
            acl.set_any_equivalent(Direction::Source, lan, 24).unwrap();
            acl.add_statement(statement).unwrap();
            acl.finalize();
            acl
        };
        let solution = build("permit tcp any any eq 22");
        let student = build("permit tcp 192.168.1.0 0.0.0.255 any eq 22");
        assert_eq!(student.rules(), solution.rules());

        let report = student.mark_against(&solution).unwrap();
        assert!(report.equivalent);
        assert!(report.lossy_prunes.is_empty());
        assert!(!student.prune_was_lossy());
    }

    #[test]
    fn test_lossy_prune_is_logged() {
        let mut acl = Acl::new(AclKind::Extended);
        acl.set_any_equivalent(Direction::Source, Ipv4Addr::new(10, 0, 0, 0), 24)
            .unwrap();
        acl.add_statement("permit ip 10.0.0.0 0.0.1.255 any")
            .unwrap();
        acl.add_statement("permit ip host 172.16.0.1 any").unwrap();
        assert!(acl.prune_was_lossy());
        assert_eq!(acl.lossy_prune_log().len(), 2);
        // the second statement lies outside the window entirely
        assert_eq!(acl.dead_statements(), ["permit ip host 172.16.0.1 any"]);
    }

    #[test]
    fn test_mark_requires_finalized() {
        let open = extended(&["permit ip any host 10.0.0.1"]);
        let mut closed = extended(&["permit ip any host 10.0.0.1"]);
        closed.finalize();
        assert_eq!(open.mark_against(&closed), Err(AclError::NotFinalized));
        assert_eq!(closed.mark_against(&open), Err(AclError::NotFinalized));
        assert!(closed.mark_against(&closed).unwrap().equivalent);
    }

    #[test]
    fn test_not_equivalent() {
        let mut a = extended(&["permit tcp any any eq 80"]);
        let mut b = extended(&["permit tcp any any eq 443"]);
        a.finalize();
        b.finalize();
        let report = a.mark_against(&b).unwrap();
        assert!(!report.equivalent);
        assert!(!report.redundant);
    }

    #[test]
    fn test_standard_acl() {
        let mut acl = Acl::new(AclKind::Standard);
        acl.add_statement("permit 10.0.0.0 0.0.0.255").unwrap();
        acl.add_statement("deny any").unwrap();
        assert!(acl.is_finalized());
        acl.finalize();
        assert!(!acl.has_implicit_default());
        assert_eq!(acl.rules().len(), 3);
    }
}
