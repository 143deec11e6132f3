//! This crate turns ACL text into rules: single statements (`permit tcp any any eq 80`) via
//! [parse_statement], and whole device configurations into per-ACL statement lists via an
//! [AclLoader].
mod config;
mod error;
mod statement;
pub mod wildcard;

pub use config::{AclSource, IosAclLoader};
pub use error::{LoadError, StatementError};
pub use statement::{parse_statement, AclKind, ParseOptions, ParsedStatement};

/// Well-known port names, generated by the build script.
pub mod ports {
    include!(concat!(env!("OUT_DIR"), "/codegen.rs"));

    use aclmark_core::rule::Protocol;

    /// Resolve a port given by number or by its well-known name for `protocol`.
    pub fn lookup(token: &str, protocol: Protocol) -> Option<u16> {
        if let Ok(num) = token.parse::<u16>() {
            return Some(num);
        }
        let table = match protocol {
            Protocol::Tcp => &TCP_PORTS,
            Protocol::Udp => &UDP_PORTS,
            _ => return None,
        };
        table.get(token.to_ascii_lowercase().as_str()).copied()
    }
}

/// AclLoader extracts the ACLs defined in a device configuration, keeping definition order and
/// statement order. Everything that is not part of an ACL definition is skipped.
///
/// ***The trait and the format are manufacture-specific.***
pub trait AclLoader {
    // Required method
    fn load(&self, content: &str) -> Result<Vec<AclSource>, LoadError>;

    // Provided method
    fn load_one(&self, content: &str, name: &str) -> Result<Option<AclSource>, LoadError> {
        Ok(self.load(content)?.into_iter().find(|acl| acl.name == name))
    }
}

/// Basics for io
pub mod basic {
    /// Basic helper functions for parsing
    pub mod parser {
        use nom::bytes::complete::take_till1;
        use nom::character::complete::{char, digit1, multispace0};
        use nom::combinator::{all_consuming, map_opt, verify};
        use nom::error::{ErrorKind, ParseError};
        use nom::sequence::{preceded, tuple};
        use nom::Err::Error;
        use nom::IResult;

        /// One whitespace-delimited token, leading whitespace skipped.
        pub fn token<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
            preceded(multispace0, take_till1(|c: char| c.is_whitespace()))(input)
        }

        /// A token equal to `kw`, ignoring ASCII case.
        pub fn keyword<'a, E: ParseError<&'a str>>(
            kw: &'static str,
        ) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str, E> {
            verify(token, move |t: &str| t.eq_ignore_ascii_case(kw))
        }

        /// r"[0-9]+" as a whole token
        pub fn parse_number<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            map_opt(token, |t: &str| {
                if t.bytes().all(|b| b.is_ascii_digit()) {
                    t.parse::<u32>().ok()
                } else {
                    None
                }
            })(input)
        }

        /// r"[<=255].[<=255].[<=255].[<=255]"
        pub fn parse_ipv4_dotted<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            fn parse_u8<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
                let (rest, num) = digit1(input)?;
                if let Ok(num) = num.parse::<u8>() {
                    Ok((rest, num))
                } else {
                    Err(Error(E::from_error_kind(input, ErrorKind::Digit)))
                }
            }

            let (rest, (o1, _, o2, _, o3, _, o4)) = tuple((
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
            ))(input)?;
            Ok((
                rest,
                (o1 as u32) << 24 | (o2 as u32) << 16 | (o3 as u32) << 8 | o4 as u32,
            ))
        }

        /// A dotted IPv4 address as a whole token.
        pub fn ipv4_token<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            let (rest, t) = token(input)?;
            match all_consuming(parse_ipv4_dotted::<E>)(t) {
                Ok((_, addr)) => Ok((rest, addr)),
                Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::Verify))),
            }
        }

        /// The first token of `input`, for error messages.
        pub fn first_token(input: &str) -> String {
            input
                .split_whitespace()
                .next()
                .unwrap_or("<end of statement>")
                .to_owned()
        }
    }
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        parse_statement, AclKind, AclLoader, AclSource, IosAclLoader, LoadError, ParseOptions,
        ParsedStatement, StatementError,
    };
}
