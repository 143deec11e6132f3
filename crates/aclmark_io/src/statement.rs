use aclmark_core::{
    rule::{Action, Protocol, Rule},
    span::Span,
};
use nom::{
    branch::alt,
    character::complete::multispace0,
    combinator::{all_consuming, map, map_opt, opt, value},
    error::Error,
    sequence::{pair, preceded},
    IResult,
};
use tracing::debug;

use crate::{
    basic::parser::{first_token, ipv4_token, keyword, parse_number, token},
    error::StatementError,
    ports, wildcard,
};

type NomResult<'a, T> = IResult<&'a str, T, Error<&'a str>>;

/// Standard ACLs match on the source address only, extended ACLs on
/// protocol, both addresses and tcp/udp ports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AclKind {
    Standard,
    Extended,
}

#[derive(Copy, Clone, Debug)]
pub struct ParseOptions {
    /// Ceiling on the rules a single statement may expand to, counting
    /// both wildcard decomposition and the address/port product.
    pub max_ranges: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { max_ranges: 4096 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedStatement {
    pub action: Action,
    pub protocol: Protocol,
    pub rules: Vec<Rule>,
    /// `permit|deny ip any any`: nothing after it can match.
    pub is_default: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Address {
    Any,
    Host(u32),
    Wildcard(u32, u32),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PortOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Range,
}

// Recognized but not expressible as address/port spans.
const UNSUPPORTED: &[&str] = &[
    "established",
    "fragments",
    "precedence",
    "tos",
    "dscp",
    "option",
    "time-range",
    "object-group",
    "reflect",
    "evaluate",
    "dynamic",
];

fn parse_action(input: &str) -> NomResult<Action> {
    alt((
        value(Action::Permit, keyword("permit")),
        value(Action::Deny, keyword("deny")),
    ))(input)
}

fn parse_protocol(input: &str) -> NomResult<Protocol> {
    alt((
        value(Protocol::Ip, keyword("ip")),
        value(Protocol::Tcp, keyword("tcp")),
        value(Protocol::Udp, keyword("udp")),
        value(Protocol::Icmp, keyword("icmp")),
        map_opt(parse_number, |n| match n {
            0 => Some(Protocol::Ip),
            1 => Some(Protocol::Icmp),
            6 => Some(Protocol::Tcp),
            17 => Some(Protocol::Udp),
            _ => None,
        }),
    ))(input)
}

/// `any`, `host A.B.C.D` or `A.B.C.D W.X.Y.Z`; standard ACLs also take a
/// bare `A.B.C.D` as a host.
fn parse_address(mask_required: bool) -> impl FnMut(&str) -> NomResult<Address> {
    move |input| {
        alt((
            value(Address::Any, keyword("any")),
            map(preceded(keyword("host"), ipv4_token), Address::Host),
            map_opt(pair(ipv4_token, opt(ipv4_token)), |(addr, mask)| match mask {
                Some(mask) => Some(Address::Wildcard(addr, mask)),
                None if !mask_required => Some(Address::Host(addr)),
                None => None,
            }),
        ))(input)
    }
}

fn parse_port_op(input: &str) -> NomResult<PortOp> {
    alt((
        value(PortOp::Eq, keyword("eq")),
        value(PortOp::Neq, keyword("neq")),
        value(PortOp::Lt, keyword("lt")),
        value(PortOp::Gt, keyword("gt")),
        value(PortOp::Range, keyword("range")),
    ))(input)
}

fn parse_port(protocol: Protocol) -> impl FnMut(&str) -> NomResult<u16> {
    move |input| map_opt(token, |t: &str| ports::lookup(t, protocol))(input)
}

/// Optional port qualifier after an address, expanded to disjoint spans.
/// `None` when no qualifier is present.
fn parse_ports(
    input: &str,
    protocol: Protocol,
) -> Result<(&str, Option<Vec<Span<u16>>>), StatementError> {
    let Ok((rest, op)) = parse_port_op(input) else {
        return Ok((input, None));
    };
    let port_err = |at: &str| StatementError::Port(first_token(at));
    let (rest, first) = parse_port(protocol)(rest).map_err(|_| port_err(rest))?;
    let spans = match op {
        PortOp::Eq => vec![Span::point(first)],
        PortOp::Neq => [Span::full().below(first), Span::full().above(first)]
            .into_iter()
            .flatten()
            .collect(),
        PortOp::Lt => vec![Span::full()
            .below(first)
            .ok_or_else(|| StatementError::PortRange(format!("lt {}", first)))?],
        PortOp::Gt => vec![Span::full()
            .above(first)
            .ok_or_else(|| StatementError::PortRange(format!("gt {}", first)))?],
        PortOp::Range => {
            let (rest, last) = parse_port(protocol)(rest).map_err(|_| port_err(rest))?;
            let span = Span::new(first, last)
                .ok_or_else(|| StatementError::PortRange(format!("range {} {}", first, last)))?;
            return Ok((rest, Some(vec![span])));
        }
    };
    Ok((rest, Some(spans)))
}

fn parse_trailer(input: &str) -> Result<(), StatementError> {
    let trailer: NomResult<_> = all_consuming(preceded(
        opt(alt((keyword("log-input"), keyword("log")))),
        multispace0,
    ))(input);
    if trailer.is_ok() {
        return Ok(());
    }
    let tok = first_token(input);
    if UNSUPPORTED.iter().any(|u| tok.eq_ignore_ascii_case(u)) {
        Err(StatementError::Unsupported(tok))
    } else {
        Err(StatementError::Trailing(input.trim().to_owned()))
    }
}

fn expand(address: Address, limit: usize) -> Result<Vec<Span<u32>>, StatementError> {
    match address {
        Address::Any => Ok(vec![Span::full()]),
        Address::Host(addr) => Ok(vec![Span::point(addr)]),
        Address::Wildcard(addr, mask) => wildcard::decompose(addr, mask, limit),
    }
}

/// Parse one ACL statement into the rules it matches.
///
/// Extended statements read `permit|deny <protocol> <src> [ports] <dst>
/// [ports] [log]`, standard ones `permit|deny <src> [log]`. Both may start
/// with a sequence number. Every combination of source range, destination
/// range and port span becomes one [Rule].
pub fn parse_statement(
    text: &str,
    kind: AclKind,
    options: &ParseOptions,
) -> Result<ParsedStatement, StatementError> {
    let input = text.trim();
    let (rest, _) = opt(parse_number::<Error<&str>>)(input).unwrap_or((input, None));
    let (rest, action) =
        parse_action(rest).map_err(|_| StatementError::Action(first_token(rest)))?;

    let (rest, protocol) = match kind {
        AclKind::Standard => (rest, Protocol::Ip),
        AclKind::Extended => {
            let tok = first_token(rest);
            match parse_protocol(rest) {
                Ok(ok) => ok,
                Err(_) if parse_number::<Error<&str>>(rest).is_ok() => {
                    return Err(StatementError::Unsupported(tok))
                }
                Err(_) => return Err(StatementError::Protocol(tok)),
            }
        }
    };

    let mask_required = kind == AclKind::Extended;
    let (rest, src) = parse_address(mask_required)(rest)
        .map_err(|_| StatementError::Address(first_token(rest)))?;
    let (rest, src_ports) = if protocol.has_ports() {
        parse_ports(rest, protocol)?
    } else {
        (rest, None)
    };

    let (rest, dst, dst_ports) = match kind {
        AclKind::Standard => (rest, Address::Any, None),
        AclKind::Extended => {
            let (rest, dst) = parse_address(mask_required)(rest)
                .map_err(|_| StatementError::Address(first_token(rest)))?;
            let (rest, dst_ports) = if protocol.has_ports() {
                parse_ports(rest, protocol)?
            } else {
                (rest, None)
            };
            (rest, dst, dst_ports)
        }
    };
    parse_trailer(rest)?;

    let limit = options.max_ranges;
    let src_ips = expand(src, limit)?;
    let dst_ips = expand(dst, limit)?;
    let src_ports = src_ports.unwrap_or_else(|| vec![Span::full()]);
    let dst_ports = dst_ports.unwrap_or_else(|| vec![Span::full()]);

    let count = [src_ips.len(), dst_ips.len(), src_ports.len(), dst_ports.len()]
        .iter()
        .map(|n| *n as u64)
        .product::<u64>();
    if count > limit as u64 {
        return Err(StatementError::TooManyRanges { count, limit });
    }

    let mut rules = Vec::with_capacity(count as usize);
    for src_ip in src_ips.iter() {
        for dst_ip in dst_ips.iter() {
            for src_port in src_ports.iter() {
                for dst_port in dst_ports.iter() {
                    rules.push(Rule::new(
                        protocol, action, *src_ip, *dst_ip, *src_port, *dst_port,
                    ));
                }
            }
        }
    }
    let is_default = rules.len() == 1 && rules[0].is_match_all();
    debug!(statement = input, rules = rules.len(), is_default, "parsed statement");
    Ok(ParsedStatement {
        action,
        protocol,
        rules,
        is_default,
    })
}
