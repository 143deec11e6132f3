use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use nom::{
    branch::alt,
    character::complete::multispace0,
    combinator::{all_consuming, map, opt, rest, value},
    error::Error,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use tracing::debug;

use crate::{
    basic::parser::{keyword, parse_number, token},
    error::LoadError,
    statement::AclKind,
    AclLoader,
};

type NomResult<'a, T> = IResult<&'a str, T, Error<&'a str>>;

/// The statements of one ACL as written in the configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclSource {
    pub name: String,
    pub kind: AclKind,
    pub statements: Vec<String>,
}

/// [IosAclLoader] reads Cisco IOS running-config text. It understands both
/// numbered lists
///
/// ```text
/// access-list 101 permit tcp any host 10.0.0.1 eq www
/// ```
///
/// and named blocks whose statements are indented below the header
///
/// ```text
/// ip access-list extended WEB
///  10 permit tcp any host 10.0.0.1 eq www
///  20 deny ip any any
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct IosAclLoader {}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Numbered(u32, &'a str),
    Header(AclKind, &'a str),
    Other,
}

fn parse_kind(input: &str) -> NomResult<AclKind> {
    alt((
        value(AclKind::Standard, keyword("standard")),
        value(AclKind::Extended, keyword("extended")),
    ))(input)
}

fn parse_line(input: &str) -> Line<'_> {
    let numbered = map(
        preceded(keyword("access-list"), pair(parse_number, rest)),
        |(number, body): (u32, &str)| Line::Numbered(number, body.trim()),
    );
    let header = map(
        all_consuming(terminated(
            preceded(pair(keyword("ip"), keyword("access-list")), pair(parse_kind, token)),
            multispace0,
        )),
        |(kind, name)| Line::Header(kind, name),
    );
    let parsed: NomResult<Line> = alt((numbered, header))(input);
    parsed.map(|(_, line)| line).unwrap_or(Line::Other)
}

fn is_remark(statement: &str) -> bool {
    let remark: NomResult<_> = tuple((opt(parse_number), keyword("remark")))(statement);
    remark.is_ok()
}

fn numbered_kind(number: u32) -> Option<AclKind> {
    match number {
        1..=99 | 1300..=1999 => Some(AclKind::Standard),
        100..=199 | 2000..=2699 => Some(AclKind::Extended),
        _ => None,
    }
}

fn acl_entry<'m>(
    acls: &'m mut IndexMap<String, AclSource, FxBuildHasher>,
    name: &str,
    kind: AclKind,
    line: usize,
) -> Result<&'m mut AclSource, LoadError> {
    let acl = acls.entry(name.to_owned()).or_insert_with(|| AclSource {
        name: name.to_owned(),
        kind,
        statements: vec![],
    });
    if acl.kind != kind {
        return Err(LoadError::KindConflict {
            line,
            name: name.to_owned(),
        });
    }
    Ok(acl)
}

impl AclLoader for IosAclLoader {
    fn load(&self, content: &str) -> Result<Vec<AclSource>, LoadError> {
        let mut acls: IndexMap<String, AclSource, FxBuildHasher> = IndexMap::default();
        // name of the named ACL whose block is open
        let mut block: Option<String> = None;

        for (idx, text) in content.lines().enumerate() {
            let line = idx + 1;
            if text.starts_with(|c: char| c.is_whitespace()) {
                let statement = text.trim();
                if let Some(acl) = block.as_ref().and_then(|name| acls.get_mut(name)) {
                    if !statement.is_empty() && !is_remark(statement) {
                        acl.statements.push(statement.to_owned());
                    }
                }
                continue;
            }
            block = None;

            match parse_line(text) {
                Line::Numbered(number, body) => {
                    // mac, protocol-type and other non-IP numbered lists
                    let Some(kind) = numbered_kind(number) else {
                        debug!(line, number, "skipping non-ip access-list");
                        continue;
                    };
                    let acl = acl_entry(&mut acls, &number.to_string(), kind, line)?;
                    if !body.is_empty() && !is_remark(body) {
                        acl.statements.push(body.to_owned());
                    }
                }
                Line::Header(kind, name) => {
                    acl_entry(&mut acls, name, kind, line)?;
                    block = Some(name.to_owned());
                }
                Line::Other => {}
            }
        }

        debug!(acls = acls.len(), "loaded acl definitions");
        Ok(acls.into_values().collect())
    }
}
