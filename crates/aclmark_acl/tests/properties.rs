use aclmark_acl::prelude::*;
use aclmark_core::{
    resolve::create_nonoverlapping_rules,
    rule::{Action, Protocol, Rule},
    span::Span,
};
use aclmark_io::AclKind;
use pretty_assertions::assert_eq;

fn build(statements: &[&str]) -> Acl {
    let mut acl = Acl::new(AclKind::Extended);
    for s in statements {
        acl.add_statement(s).unwrap();
    }
    acl
}

fn finalized(statements: &[&str]) -> Acl {
    let mut acl = build(statements);
    acl.finalize();
    acl
}

fn assert_overlap_free(acl: &Acl) {
    let rules = acl.rules();
    for (i, a) in rules.iter().enumerate() {
        for b in rules.iter().skip(i + 1) {
            assert!(!a.overlaps(b), "{} overlaps {}", a, b);
        }
    }
}

const MIXED: &[&str] = &[
    "permit tcp 10.0.0.0 0.0.0.255 any eq 80",
    "deny udp any 10.0.1.0 0.0.0.255 range 1000 2000",
    "permit tcp 10.0.0.0 0.0.255.255 any range 79 81",
    "permit icmp host 10.0.0.9 any",
    "deny tcp any any neq 22",
    "permit ip 10.0.0.0 0.0.0.127 10.0.1.0 0.0.0.255",
    "permit udp any any",
];

#[test]
fn overlap_free_after_every_statement() {
    let mut acl = Acl::new(AclKind::Extended);
    for s in MIXED {
        acl.add_statement(s).unwrap();
        assert_overlap_free(&acl);
    }
    acl.finalize();
    assert_overlap_free(&acl);
}

/// Counts the packets of a rule, ignoring protocol.
fn volume(r: &Rule) -> u128 {
    let len32 = |s: Span<u32>| (s.hi() - s.lo()) as u128 + 1;
    let len16 = |s: Span<u16>| (s.hi() - s.lo()) as u128 + 1;
    len32(r.src_ip) * len32(r.dst_ip) * len16(r.src_port) * len16(r.dst_port)
}

fn intersection(a: &Rule, b: &Rule) -> u128 {
    match (
        a.src_ip.intersect(&b.src_ip),
        a.dst_ip.intersect(&b.dst_ip),
        a.src_port.intersect(&b.src_port),
        a.dst_port.intersect(&b.dst_port),
    ) {
        (Some(src_ip), Some(dst_ip), Some(src_port), Some(dst_port)) => volume(&Rule {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            ..*a
        }),
        _ => 0,
    }
}

#[test]
fn nonoverlapping_rules_preserve_coverage() {
    let span = |lo: u32, hi: u32| Span::new(lo, hi).unwrap();
    let port_span = |lo: u16, hi: u16| Span::new(lo, hi).unwrap();
    let candidate = Rule::new(
        Protocol::Tcp,
        Action::Permit,
        span(0, 99),
        span(0, 99),
        port_span(0, 999),
        port_span(0, 999),
    );
    let existing = Rule::new(
        Protocol::Tcp,
        Action::Deny,
        span(20, 39),
        span(50, 149),
        port_span(100, 199),
        port_span(900, 1999),
    );

    let regions = create_nonoverlapping_rules(&candidate, &existing);
    assert!(regions.iter().all(|r| !r.overlaps(&existing)));
    for (i, a) in regions.iter().enumerate() {
        for b in regions.iter().skip(i + 1) {
            assert!(!a.overlaps(b));
        }
        assert_eq!(intersection(a, &candidate), volume(a));
    }
    // regions + overlap == candidate, so regions ∪ existing == candidate ∪ existing
    let carved: u128 = regions.iter().map(volume).sum();
    assert_eq!(
        carved + intersection(&candidate, &existing),
        volume(&candidate)
    );
}

#[test]
fn repeated_statement_is_dead_and_changes_nothing() {
    let once = finalized(&["permit tcp 10.0.0.0 0.0.0.255 any eq 443"]);
    let twice = finalized(&[
        "permit tcp 10.0.0.0 0.0.0.255 any eq 443",
        "permit tcp 10.0.0.0 0.0.0.255 any eq 443",
    ]);
    assert_eq!(once.rules(), twice.rules());
    assert_eq!(
        twice.dead_statements(),
        ["permit tcp 10.0.0.0 0.0.0.255 any eq 443"]
    );
}

#[test]
fn non_conflicting_statements_commute() {
    let statements = [
        "permit tcp any host 10.0.0.1 eq 80",
        "permit tcp any host 10.0.0.1 eq 81",
        "permit udp 10.1.0.0 0.0.255.255 any eq 53",
        "permit icmp any 10.2.0.0 0.0.0.255",
        "permit tcp any host 10.0.0.1 eq 82",
    ];
    let reference = build(&statements).rules();
    let permutations = [[4, 3, 2, 1, 0], [2, 0, 4, 1, 3], [1, 4, 0, 3, 2]];
    for order in permutations {
        let shuffled: Vec<_> = order.iter().map(|&i| statements[i]).collect();
        assert_eq!(build(&shuffled).rules(), reference);
    }
}

#[test]
fn split_ports_merge_back() {
    let split = build(&[
        "permit tcp 10.0.0.0 0.0.0.255 any eq 80",
        "permit tcp 10.0.0.0 0.0.0.255 any eq 81",
    ]);
    let whole = build(&["permit tcp 10.0.0.0 0.0.0.255 any range 80 81"]);
    assert_eq!(split.rules().len(), 1);
    assert_eq!(split.rules(), whole.rules());
    assert_eq!(split.rules()[0].dst_port, Span::new(80, 81).unwrap());
}

#[test]
fn finalize_appends_one_implicit_deny() {
    let mut acl = build(&[]);
    acl.finalize();
    assert!(acl.has_implicit_default());
    assert_eq!(acl.rules(), vec![Rule::any(Protocol::Ip, Action::Deny)]);
    assert_eq!(acl.effective_statement_count(), 1);

    let before = acl.rules();
    acl.finalize();
    assert_eq!(acl.rules(), before);
    assert_eq!(acl.effective_statement_count(), 1);

    let mut explicit = build(&["permit ip any any"]);
    explicit.finalize();
    assert!(!explicit.has_implicit_default());
    assert_eq!(explicit.rules(), vec![Rule::any(Protocol::Ip, Action::Permit)]);
}

#[test]
fn duplicate_statement_is_redundant_but_equivalent() {
    let a = finalized(&["permit tcp any any eq 80", "deny ip any any"]);
    let b = finalized(&[
        "permit tcp any any eq 80",
        "permit tcp any any eq 80",
        "deny ip any any",
    ]);

    let report = b.mark_against(&a).unwrap();
    assert!(report.equivalent);
    assert!(report.redundant);
    assert_eq!(report.statement_count, 3);
    assert_eq!(report.solution_count, 2);
    assert_eq!(report.dead_statements, vec!["permit tcp any any eq 80"]);
    assert!(report.post_default_statements.is_empty());

    let mut sink = MemorySink::new();
    report.emit("101", &mut sink);
    let messages: Vec<_> = sink.get("101").iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "3 statements used where 2 are enough",
            "permit tcp any any eq 80"
        ]
    );
}

#[test]
fn statements_after_deny_all_are_post_default() {
    let mut c = build(&["deny ip any any"]);
    assert_eq!(
        c.add_statement("permit tcp any any eq 22"),
        Ok(StatementOutcome::PostDefault)
    );
    c.finalize();
    assert_eq!(c.post_default_statements(), ["permit tcp any any eq 22"]);
    assert_eq!(c.rules(), vec![Rule::any(Protocol::Ip, Action::Deny)]);
    assert_eq!(c.effective_statement_count(), 1);

    let solution = finalized(&[]);
    let report = c.mark_against(&solution).unwrap();
    assert!(report.equivalent);
    assert!(!report.redundant);
    assert_eq!(report.post_default_statements, vec!["permit tcp any any eq 22"]);
}

#[test]
fn equal_space_carved_differently_is_equivalent() {
    // the same L-shaped permit region, built in two orders
    let a = finalized(&[
        "permit ip 10.0.0.0 0.0.0.255 10.0.0.0 0.0.0.255",
        "permit ip 10.0.0.0 0.0.0.255 10.0.1.0 0.0.0.255",
        "permit ip 10.0.1.0 0.0.0.255 10.0.0.0 0.0.0.255",
    ]);
    let b = finalized(&[
        "permit ip 10.0.0.0 0.0.0.255 10.0.0.0 0.0.0.255",
        "permit ip 10.0.1.0 0.0.0.255 10.0.0.0 0.0.0.255",
        "permit ip 10.0.0.0 0.0.0.255 10.0.1.0 0.0.0.255",
    ]);
    assert!(a.mark_against(&b).unwrap().equivalent);
    assert!(b.mark_against(&a).unwrap().equivalent);

    let c = finalized(&[
        "permit ip 10.0.0.0 0.0.0.255 10.0.0.0 0.0.0.255",
        "permit ip 10.0.1.0 0.0.0.255 10.0.0.0 0.0.0.255",
    ]);
    assert!(!a.mark_against(&c).unwrap().equivalent);
}

#[test]
fn acls_can_move_between_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Acl>();
    assert_send_sync::<MarkReport>();
    assert_send_sync::<MemorySink>();

    let solution = finalized(&["permit tcp any any eq 80"]);
    let handle = std::thread::spawn(move || {
        let student = finalized(&["permit tcp any any eq www"]);
        student.mark_against(&solution).map(|r| r.equivalent)
    });
    assert_eq!(handle.join().unwrap(), Ok(true));
}

#[test]
fn protocol_alone_decides_equivalence() {
    let mark = |student: &[&str], solution: &[&str]| {
        finalized(student)
            .mark_against(&finalized(solution))
            .unwrap()
            .equivalent
    };
    assert!(!mark(&["permit ip any any"], &["permit tcp any any"]));
    assert!(!mark(&["permit tcp any any"], &["permit ip any any"]));
    assert!(!mark(&["permit udp any any"], &["permit tcp any any"]));
    assert!(!mark(
        &["permit ip any host 10.0.0.1", "deny ip any any"],
        &["permit tcp any host 10.0.0.1", "deny ip any any"]
    ));
    assert!(mark(
        &["permit tcp any host 10.0.0.1", "deny ip any any"],
        &["permit tcp any host 10.0.0.1"]
    ));
}
