use fxhash::FxBuildHasher;
use indexmap::IndexSet;
use tracing::trace;

use crate::{
    resolve::resolve,
    rule::{Action, Protocol, Rule},
    span::Span,
};

/// RuleSet keeps the canonical form of an ACL: rules never overlap and no
/// two of them could be merged into one. Iteration order is irrelevant,
/// comparisons go through [RuleSet::sorted].
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: IndexSet<Rule, FxBuildHasher>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Add the part of `rule` not matched yet. Returns how many disjoint
    /// regions of it survived, zero meaning the rule matches nothing new.
    pub fn insert(&mut self, rule: Rule) -> usize {
        let regions = resolve(rule, self.rules.iter());
        let n = regions.len();
        for region in regions {
            self.fold(region);
        }
        debug_assert!(self.is_overlap_free());
        n
    }

    /// Merge `candidate` with existing rules for as long as one accepts it,
    /// then keep the result. `candidate` must not overlap the set.
    pub fn fold(&mut self, mut candidate: Rule) {
        while let Some((idx, merged)) = self
            .rules
            .iter()
            .enumerate()
            .find_map(|(i, r)| candidate.try_merge(r).map(|m| (i, m)))
        {
            trace!(%candidate, absorbed = %self.rules[idx], "merge");
            self.rules.swap_remove_index(idx);
            candidate = merged;
        }
        self.rules.insert(candidate);
    }

    /// Rules in canonical order.
    pub fn sorted(&self) -> Vec<Rule> {
        let mut rules: Vec<_> = self.rules.iter().copied().collect();
        rules.sort();
        rules
    }

    /// Clip every rule to the windows and rebuild the canonical form.
    /// Returns the new set and the rules (before clipping) that lost
    /// deliberately scoped address space.
    pub fn pruned(&self, keep_src: Span<u32>, keep_dst: Span<u32>) -> (RuleSet, Vec<Rule>) {
        let mut set = RuleSet::new();
        let mut lossy = vec![];
        for rule in self.sorted() {
            let pruned = rule.prune_to(keep_src, keep_dst);
            if !pruned.lossless {
                lossy.push(rule);
            }
            if let Some(r) = pruned.rule {
                set.fold(r);
            }
        }
        (set, lossy)
    }

    /// Every packet matched by an `action` rule of `self` is matched by an
    /// `action` rule of `other`.
    ///
    /// An `ip` rule is checked once per protocol it matches. Its tcp, udp
    /// and icmp parts may be covered by rules of that protocol or by `ip`
    /// rules, everything else only by `ip` rules.
    pub fn covered_by(&self, other: &RuleSet, action: Action) -> bool {
        let theirs: Vec<_> = other.iter().filter(|r| r.action == action).collect();
        self.iter()
            .filter(|r| r.action == action)
            .flat_map(per_protocol)
            .all(|part| {
                let covering = theirs
                    .iter()
                    .copied()
                    .filter(|r| r.protocol == part.protocol || r.protocol == Protocol::Ip);
                resolve(part, covering).is_empty()
            })
    }

    /// Both sets assign the same action to the same matching space, even if
    /// merging carved that space into different rules.
    pub fn same_matching_space(&self, other: &RuleSet) -> bool {
        [Action::Permit, Action::Deny].into_iter().all(|action| {
            self.covered_by(other, action) && other.covered_by(self, action)
        })
    }

    pub fn is_overlap_free(&self) -> bool {
        self.rules.iter().enumerate().all(|(i, a)| {
            self.rules
                .iter()
                .skip(i + 1)
                .all(|b| !a.overlaps(b))
        })
    }
}

// `Ip` last stands for the protocols without a variant of their own.
const IP_PARTS: [Protocol; 4] = [Protocol::Tcp, Protocol::Udp, Protocol::Icmp, Protocol::Ip];

fn per_protocol(rule: &Rule) -> Vec<Rule> {
    match rule.protocol {
        Protocol::Ip => IP_PARTS
            .iter()
            .map(|&protocol| Rule { protocol, ..*rule })
            .collect(),
        _ => vec![*rule],
    }
}

/// Equality of the canonical sorted sequences.
impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.sorted() == other.sorted()
    }
}

impl Eq for RuleSet {}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        let mut set = RuleSet::new();
        iter.into_iter().for_each(|r| {
            set.insert(r);
        });
        set
    }
}
