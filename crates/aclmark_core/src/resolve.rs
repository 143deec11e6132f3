//! Overlap resolution: the part of a candidate rule's matching space that an
//! existing rule does not already match, as a list of disjoint rules.
//!
//! ```text
//!   dst ^
//!       |   +---+-----+---+
//!       |   |   |  D  |   |
//!       |   |   +-----+   |
//!       |   | A |  E  | B |      E = overlap with the existing rule,
//!       |   |   +-----+   |          split again over (sport, dport)
//!       |   |   |  C  |   |
//!       |   +---+-----+---+
//!       +--------------------> src
//! ```
use funty::Unsigned;
use tracing::trace;

use crate::{rule::Rule, span::Span};

type Rect<U> = (Span<U>, Span<U>);

/// Regions of a rectangle outside another one, plus their intersection.
struct Split<U: Unsigned> {
    outer: [Option<Rect<U>>; 4],
    overlap: Rect<U>,
}

fn split_plane<U: Unsigned>(x: Span<U>, y: Span<U>, ex: Span<U>, ey: Span<U>) -> Option<Split<U>> {
    let ox = x.intersect(&ex)?;
    let oy = y.intersect(&ey)?;
    let left = x.below(ox.lo()).map(|s| (s, y));
    let right = x.above(ox.hi()).map(|s| (s, y));
    let bottom = y.below(oy.lo()).map(|s| (ox, s));
    let top = y.above(oy.hi()).map(|s| (ox, s));
    Some(Split {
        outer: [left, right, bottom, top],
        overlap: (ox, oy),
    })
}

/// Split `candidate` into rules covering its matching space minus the
/// overlap with `existing`. Returns `candidate` alone when they do not
/// overlap and an empty list when `existing` covers it.
///
/// At most eight rules come out: four outside the address overlap keeping
/// the candidate's ports, four inside it outside the port overlap.
pub fn create_nonoverlapping_rules(candidate: &Rule, existing: &Rule) -> Vec<Rule> {
    if !candidate.overlaps(existing) {
        return vec![*candidate];
    }
    let Some(ips) = split_plane(
        candidate.src_ip,
        candidate.dst_ip,
        existing.src_ip,
        existing.dst_ip,
    ) else {
        return vec![*candidate];
    };

    let mut regions = Vec::with_capacity(8);
    regions.extend(ips.outer.into_iter().flatten().map(|(src_ip, dst_ip)| Rule {
        src_ip,
        dst_ip,
        ..*candidate
    }));

    let (src_ip, dst_ip) = ips.overlap;
    if let Some(ports) = split_plane(
        candidate.src_port,
        candidate.dst_port,
        existing.src_port,
        existing.dst_port,
    ) {
        regions.extend(
            ports
                .outer
                .into_iter()
                .flatten()
                .map(|(src_port, dst_port)| Rule {
                    src_ip,
                    dst_ip,
                    src_port,
                    dst_port,
                    ..*candidate
                }),
        );
    }
    trace!(%candidate, %existing, regions = regions.len(), "split overlapping rule");
    regions
}

/// Resolve `candidate` against every rule of `existing` in turn. Regions
/// produced against one rule only need checking against the rules after it.
pub fn resolve<'a>(candidate: Rule, existing: impl IntoIterator<Item = &'a Rule>) -> Vec<Rule> {
    let mut pending = vec![candidate];
    for rule in existing {
        if pending.is_empty() {
            break;
        }
        pending = pending
            .iter()
            .flat_map(|r| create_nonoverlapping_rules(r, rule))
            .collect();
    }
    pending
}
