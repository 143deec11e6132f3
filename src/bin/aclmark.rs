//! Grade the ACLs of a device configuration against a solution configuration.

use std::{fs, net::Ipv4Addr, path::PathBuf, process::ExitCode};

use aclmark::prelude::*;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compare every ACL of the solution configuration with the same-named ACL of the student
/// configuration.
#[derive(Parser, Debug)]
#[command(name = "aclmark")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Student running-config
    student: PathBuf,

    /// Solution running-config
    solution: PathBuf,

    /// Only grade this ACL (name or number)
    #[arg(long)]
    acl: Option<String>,

    /// Source prefix treated as equivalent to `any`, e.g. 192.168.1.0/24
    #[arg(long, value_parser = parse_prefix)]
    src_any: Option<(Ipv4Addr, u8)>,

    /// Destination prefix treated as equivalent to `any`
    #[arg(long, value_parser = parse_prefix)]
    dst_any: Option<(Ipv4Addr, u8)>,

    /// Most rules a single statement may expand to
    #[arg(long, default_value = "4096")]
    max_ranges: usize,

    /// Log engine progress at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn parse_prefix(s: &str) -> Result<(Ipv4Addr, u8), String> {
    let (addr, len) = s
        .split_once('/')
        .ok_or_else(|| format!("`{}` is not of the form A.B.C.D/N", s))?;
    let addr = addr.parse::<Ipv4Addr>().map_err(|e| e.to_string())?;
    let len = len.parse::<u8>().map_err(|e| e.to_string())?;
    if len > 32 {
        return Err(format!("prefix length {} is out of range", len));
    }
    Ok((addr, len))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Build and finalize an ACL from its configured statements.
fn build(source: &AclSource, args: &Args) -> Result<Acl, AclError> {
    let options = ParseOptions {
        max_ranges: args.max_ranges,
    };
    let mut acl = Acl::with_options(source.kind, options);
    if let Some((addr, len)) = args.src_any {
        acl.set_any_equivalent(Direction::Source, addr, len)?;
    }
    if let Some((addr, len)) = args.dst_any {
        acl.set_any_equivalent(Direction::Destination, addr, len)?;
    }
    for statement in source.statements.iter() {
        acl.add_statement(statement)?;
    }
    acl.finalize();
    Ok(acl)
}

fn run(args: &Args) -> Result<bool> {
    let read = |path: &PathBuf| {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    };
    let loader = IosAclLoader::default();
    let student = loader
        .load(&read(&args.student)?)
        .with_context(|| format!("loading {}", args.student.display()))?;
    let solution = loader
        .load(&read(&args.solution)?)
        .with_context(|| format!("loading {}", args.solution.display()))?;

    let wanted: Vec<_> = solution
        .iter()
        .filter(|acl| args.acl.as_ref().map_or(true, |name| &acl.name == name))
        .collect();
    if wanted.is_empty() {
        bail!("no acl to grade in {}", args.solution.display());
    }

    let mut sink = MemorySink::new();
    let mut passed = 0;
    for reference in wanted.iter() {
        let name = reference.name.as_str();
        let reference_acl = build(reference, args)
            .with_context(|| format!("solution acl {}", name))?;

        let Some(source) = student.iter().find(|acl| acl.name == name) else {
            sink.record(name, "missing", "acl is not configured".to_owned());
            continue;
        };
        if source.kind != reference.kind {
            warn!(acl = name, "acl kind differs from the solution");
        }
        let student_acl = match build(source, args) {
            Ok(acl) => acl,
            Err(err) => {
                sink.record(name, "malformed", err.to_string());
                continue;
            }
        };

        let report = student_acl.mark_against(&reference_acl)?;
        report.emit(name, &mut sink);
        if report.equivalent {
            passed += 1;
        }
    }

    for (category, entry) in sink.iter() {
        println!("{}: [{}] {}", category, entry.subtype, entry.message);
    }
    info!(passed, total = wanted.len(), "graded");
    Ok(passed == wanted.len())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("aclmark: {:#}", err);
            ExitCode::from(2)
        }
    }
}
