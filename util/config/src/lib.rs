//! Campaign configuration: parsing the two entry points described by the master CLI surface.
//!
//! No flag grammar is involved — the contract fixes both shapes exactly (see the harness's
//! external interface notes): sibling mode is a fixed positional argument vector, and interactive
//! master mode is a five-question prompt loop, in the style of `ckb-bin`'s `helper::prompt`.

use fault_injector_error::Error;
use std::io::{Write, stdin, stdout};

/// The five configuration options the campaign runner recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    /// Selected `id` from the golden run's catalog.
    pub struct_id: u32,
    /// Number of trials to run, positive.
    pub inject_n: u32,
    /// Upper bound of the scheduled injection delay in milliseconds, positive.
    pub max_time_ms: u64,
    /// Whether trials run as sibling processes instead of sequentially in-process.
    pub parallelize: bool,
    /// Optional case-insensitive substring that singles out a particular error signature.
    pub error_pattern: String,
}

/// The positional argument vector a sibling trial process is launched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingArgs {
    pub golden_pid: i32,
    pub golden_duration_ms: u64,
    pub rand_seed: u64,
    pub struct_id: u32,
    pub trial_index: u32,
    pub max_time_ms: u64,
    pub error_pattern: String,
}

/// Minimum `std::env::args()` length (program name included) that selects sibling mode.
pub const SIBLING_MIN_ARGC: usize = 7;

/// True when `args` (as returned by `std::env::args().collect()`, program name included) selects
/// sibling mode rather than interactive master mode.
pub fn is_sibling_mode(args: &[String]) -> bool {
    args.len() >= SIBLING_MIN_ARGC
}

/// Parse the sibling-mode argument vector.
///
/// `args` must include the program name at index 0, matching `std::env::args()`.
pub fn parse_sibling_args(args: &[String]) -> Result<SiblingArgs, Error> {
    if args.len() < SIBLING_MIN_ARGC {
        return Err(Error::InvalidArgs(format!(
            "sibling mode requires at least {} arguments, got {}",
            SIBLING_MIN_ARGC,
            args.len()
        )));
    }

    let field = |idx: usize, name: &str| -> Result<&str, Error> {
        args.get(idx)
            .map(String::as_str)
            .ok_or_else(|| Error::InvalidArgs(format!("missing argument: {name}")))
    };
    let parse_num = |s: &str, name: &str| -> Result<u64, Error> {
        s.parse::<u64>()
            .map_err(|_| Error::InvalidArgs(format!("{name} must be a non-negative integer, got {s:?}")))
    };

    let golden_pid: i32 = field(1, "goldenPid")?
        .parse()
        .map_err(|_| Error::InvalidArgs("goldenPid must be an integer".to_owned()))?;
    let golden_duration_ms = parse_num(field(2, "goldenDurationMs")?, "goldenDurationMs")?;
    let rand_seed = parse_num(field(3, "randSeed")?, "randSeed")?;
    let struct_id: u32 = parse_num(field(4, "structId")?, "structId")?
        .try_into()
        .map_err(|_| Error::InvalidArgs("structId out of range".to_owned()))?;
    let trial_index: u32 = parse_num(field(5, "trialIndex")?, "trialIndex")?
        .try_into()
        .map_err(|_| Error::InvalidArgs("trialIndex out of range".to_owned()))?;
    let max_time_ms = parse_num(field(6, "maxTimeMs")?, "maxTimeMs")?;
    if max_time_ms == 0 {
        return Err(Error::InvalidConfig("maxTimeMs must be positive".to_owned()));
    }
    let error_pattern = args.get(7).cloned().unwrap_or_default();

    Ok(SiblingArgs {
        golden_pid,
        golden_duration_ms,
        rand_seed,
        struct_id,
        trial_index,
        max_time_ms,
        error_pattern,
    })
}

/// Build the argument vector (program name excluded) used to launch a sibling trial process.
pub fn sibling_argv(
    golden_pid: i32,
    golden_duration_ms: u64,
    rand_seed: u64,
    struct_id: u32,
    trial_index: u32,
    max_time_ms: u64,
    error_pattern: &str,
) -> Vec<String> {
    let mut argv = vec![
        golden_pid.to_string(),
        golden_duration_ms.to_string(),
        rand_seed.to_string(),
        struct_id.to_string(),
        trial_index.to_string(),
        max_time_ms.to_string(),
    ];
    if !error_pattern.is_empty() {
        argv.push(error_pattern.to_owned());
    }
    argv
}

/// Read one line from stdin after printing `msg`, matching `ckb-bin`'s `helper::prompt`.
pub fn prompt(msg: &str) -> String {
    let stdout = stdout();
    let mut stdout = stdout.lock();
    let stdin = stdin();

    write!(stdout, "{msg}").expect("write to stdout");
    stdout.flush().expect("flush stdout");

    let mut input = String::new();
    let _ = stdin.read_line(&mut input);
    input.trim().to_owned()
}

/// Drive the five-question interactive prompt loop, validating against `catalog_len` (the
/// number of data structures discovered in the golden run).
///
/// `ask` is injected so tests can supply canned answers instead of real stdin; the binary crate
/// wires this to [`prompt`].
pub fn prompt_campaign_config(
    mut ask: impl FnMut(&str) -> String,
    catalog_len: usize,
) -> Result<CampaignConfig, Error> {
    if catalog_len == 0 {
        return Err(Error::InvalidConfig(
            "golden run's catalog is empty, nothing to inject into".to_owned(),
        ));
    }

    let struct_id: u32 = loop {
        let answer = ask(&format!(
            "Select a data structure id to inject [0-{}]: ",
            catalog_len - 1
        ));
        match answer.parse::<u32>() {
            Ok(id) if (id as usize) < catalog_len => break id,
            _ => continue,
        }
    };

    let inject_n: u32 = loop {
        let answer = ask("Number of trials to run: ");
        match answer.parse::<u32>() {
            Ok(n) if n > 0 => break n,
            _ => continue,
        }
    };

    let max_time_ms: u64 = loop {
        let answer = ask("Maximum injection delay in milliseconds: ");
        match answer.parse::<u64>() {
            Ok(ms) if ms > 0 => break ms,
            _ => continue,
        }
    };

    let parallelize = loop {
        let answer = ask("Run trials in parallel? [y/N]: ").to_lowercase();
        match answer.as_str() {
            "y" | "yes" => break true,
            "" | "n" | "no" => break false,
            _ => continue,
        }
    };

    let error_pattern = ask("Error pattern to look for (optional, enter to skip): ");

    Ok(CampaignConfig {
        struct_id,
        inject_n,
        max_time_ms,
        parallelize,
        error_pattern,
    })
}
