use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    net::Ipv4Addr,
};

use crate::span::Span;

/// Protocols an ACL statement can select. `Ip` matches every protocol, so
/// an `Ip` rule overlaps rules of any other protocol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Ip,
}

impl Protocol {
    /// Rank used by the canonical sort order: tcp < udp < icmp < ip.
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            Protocol::Tcp => 0,
            Protocol::Udp => 1,
            Protocol::Icmp => 2,
            Protocol::Ip => 3,
        }
    }

    /// Only tcp and udp rules match on ports.
    #[inline]
    pub fn has_ports(self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }

    #[inline]
    pub fn is_compatible(self, rhs: Protocol) -> bool {
        self == rhs || self == Protocol::Ip || rhs == Protocol::Ip
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Ip => "ip",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Permit,
    Deny,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Permit => f.write_str("permit"),
            Action::Deny => f.write_str("deny"),
        }
    }
}

/// Key of the canonical sort order, see [Rule::sort_key].
pub type SortKey = (u8, u32, u32, u32, u32, u16, u16, u16, u16);

/// Rule is one canonical matching predicate: a protocol, four inclusive
/// spans and the action applied to matching packets.
///
/// [Rule::new] gives `ip` and `icmp` rules full port spans. Only overlap
/// resolution narrows their ports, when carving around a tcp/udp rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    pub protocol: Protocol,
    pub action: Action,
    pub src_ip: Span<u32>,
    pub dst_ip: Span<u32>,
    pub src_port: Span<u16>,
    pub dst_port: Span<u16>,
}

/// Result of [Rule::prune_to].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pruned {
    /// `None` when clipping left nothing to match.
    pub rule: Option<Rule>,
    /// False when clipping discarded deliberately scoped address space.
    pub lossless: bool,
}

impl Rule {
    pub fn new(
        protocol: Protocol,
        action: Action,
        src_ip: Span<u32>,
        dst_ip: Span<u32>,
        src_port: Span<u16>,
        dst_port: Span<u16>,
    ) -> Self {
        let (src_port, dst_port) = if protocol.has_ports() {
            (src_port, dst_port)
        } else {
            (Span::full(), Span::full())
        };
        Rule {
            protocol,
            action,
            src_ip,
            dst_ip,
            src_port,
            dst_port,
        }
    }

    /// `<action> <protocol> any any`
    pub fn any(protocol: Protocol, action: Action) -> Self {
        Rule::new(
            protocol,
            action,
            Span::full(),
            Span::full(),
            Span::full(),
            Span::full(),
        )
    }

    /// `permit|deny ip any any`
    #[inline]
    pub fn is_match_all(&self) -> bool {
        self.protocol == Protocol::Ip
            && self.src_ip.is_full()
            && self.dst_ip.is_full()
            && self.src_port.is_full()
            && self.dst_port.is_full()
    }

    pub fn overlaps(&self, rhs: &Rule) -> bool {
        self.protocol.is_compatible(rhs.protocol)
            && self.src_ip.intersects(&rhs.src_ip)
            && self.dst_ip.intersects(&rhs.dst_ip)
            && self.src_port.intersects(&rhs.src_port)
            && self.dst_port.intersects(&rhs.dst_port)
    }

    #[inline]
    pub fn sort_key(&self) -> SortKey {
        (
            self.protocol.rank(),
            self.src_ip.lo(),
            self.src_ip.hi(),
            self.dst_ip.lo(),
            self.dst_ip.hi(),
            self.src_port.lo(),
            self.src_port.hi(),
            self.dst_port.lo(),
            self.dst_port.hi(),
        )
    }

    /// Combine `self` and `rhs` into one rule when that loses nothing, or
    /// when `self` is an `ip` rule covering `rhs` (then `rhs` is absorbed
    /// and `self` is returned as is). An `ip` rule whose ports were narrowed
    /// by overlap resolution must cover the ports of `rhs` too.
    ///
    /// Same-protocol rules merge when exactly one dimension is contiguous
    /// and the others are identical, with the pairing fixed to
    /// (addresses identical, one port dimension contiguous) or
    /// (ports identical, one address dimension contiguous).
    pub fn try_merge(&self, rhs: &Rule) -> Option<Rule> {
        if self.action != rhs.action {
            return None;
        }
        if self.protocol != rhs.protocol {
            let absorbs = self.protocol == Protocol::Ip
                && self.src_ip.contains(&rhs.src_ip)
                && self.dst_ip.contains(&rhs.dst_ip)
                && self.src_port.contains(&rhs.src_port)
                && self.dst_port.contains(&rhs.dst_port);
            return absorbs.then_some(*self);
        }

        let same_ips = self.src_ip == rhs.src_ip && self.dst_ip == rhs.dst_ip;
        let same_ports = self.src_port == rhs.src_port && self.dst_port == rhs.dst_port;
        if same_ips {
            if self.src_port == rhs.src_port && self.dst_port.is_adjacent(&rhs.dst_port) {
                return Some(Rule {
                    dst_port: self.dst_port.hull(&rhs.dst_port),
                    ..*self
                });
            }
            if self.dst_port == rhs.dst_port && self.src_port.is_adjacent(&rhs.src_port) {
                return Some(Rule {
                    src_port: self.src_port.hull(&rhs.src_port),
                    ..*self
                });
            }
        }
        if same_ports {
            if self.src_ip == rhs.src_ip && self.dst_ip.is_adjacent(&rhs.dst_ip) {
                return Some(Rule {
                    dst_ip: self.dst_ip.hull(&rhs.dst_ip),
                    ..*self
                });
            }
            if self.dst_ip == rhs.dst_ip && self.src_ip.is_adjacent(&rhs.src_ip) {
                return Some(Rule {
                    src_ip: self.src_ip.hull(&rhs.src_ip),
                    ..*self
                });
            }
        }
        None
    }

    /// Clip the address spans to the any-equivalent windows.
    pub fn prune_to(&self, keep_src: Span<u32>, keep_dst: Span<u32>) -> Pruned {
        let (src_ip, src_lossless) = clip(self.src_ip, keep_src);
        let (dst_ip, dst_lossless) = clip(self.dst_ip, keep_dst);
        let rule = match (src_ip, dst_ip) {
            (Some(src_ip), Some(dst_ip)) => Some(Rule {
                src_ip,
                dst_ip,
                ..*self
            }),
            _ => None,
        };
        Pruned {
            rule,
            lossless: src_lossless && dst_lossless,
        }
    }
}

fn clip(span: Span<u32>, window: Span<u32>) -> (Option<Span<u32>>, bool) {
    if window.contains(&span) {
        (Some(span), true)
    } else if span.is_full() {
        (Some(window), true)
    } else {
        (span.intersect(&window), false)
    }
}

impl PartialOrd for Rule {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rule {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.action.cmp(&other.action))
    }
}

struct Address(Span<u32>);

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let span = self.0;
        if span.is_full() {
            f.write_str("any")
        } else if span.is_point() {
            write!(f, "host {}", Ipv4Addr::from(span.lo()))
        } else {
            write!(
                f,
                "{}-{}",
                Ipv4Addr::from(span.lo()),
                Ipv4Addr::from(span.hi())
            )
        }
    }
}

struct Ports(Span<u16>);

impl Display for Ports {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let span = self.0;
        if span.is_full() {
            Ok(())
        } else if span.is_point() {
            write!(f, " eq {}", span.lo())
        } else {
            write!(f, " range {} {}", span.lo(), span.hi())
        }
    }
}

/// Prints a rule dump in statement-like notation, address ranges as
/// `lo-hi`. Port qualifiers appear on tcp and udp rules only; the ports an
/// `ip` or `icmp` rule got narrowed to by overlap resolution are not shown.
impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (src_port, dst_port) = if self.protocol.has_ports() {
            (self.src_port, self.dst_port)
        } else {
            (Span::full(), Span::full())
        };
        write!(
            f,
            "{} {} {}{} {}{}",
            self.action,
            self.protocol,
            Address(self.src_ip),
            Ports(src_port),
            Address(self.dst_ip),
            Ports(dst_port)
        )
    }
}
