//! The fault-injector executable's entry point.
//!
//! Mirrors `ckb-bin`'s split: a thin root `main.rs` calls [`run_app`], which does the real work
//! and returns an [`ExitCode`] rather than calling `std::process::exit` itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fault_injector_campaign::{run_golden, CampaignRunner};
use fault_injector_config::{is_sibling_mode, parse_sibling_args, prompt, prompt_campaign_config};
use fault_injector_controller::PathLayout;
use fault_injector_error::{Error, ExitCode};
use fault_injector_logger::{error, info, LoggerConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Overrides the simulator binary path. The original harness hardcoded an absolute path to a
/// developer's build tree; this harness instead resolves it once at startup, defaulting to a
/// binary alongside the current executable.
const SIMULATOR_PATH_ENV: &str = "FAULT_INJECTOR_SIMULATOR_PATH";
const DEFAULT_SIMULATOR_NAME: &str = "FreeRTOS_Simulator";

const MASTER_LOG_PATH: &str = "logs/master.log";

/// The executable's main entry. Returns `Ok` on a successful campaign (sequential or parallel) or
/// a single sibling trial; otherwise the returned [`ExitCode`] becomes the process exit status.
pub fn run_app() -> Result<(), ExitCode> {
    let args: Vec<String> = std::env::args().collect();
    let sim_path = resolve_sim_path();

    if is_sibling_mode(&args) {
        run_sibling(&args, &sim_path)
    } else {
        run_master(&sim_path)
    }
}

fn resolve_sim_path() -> PathBuf {
    if let Ok(path) = std::env::var(SIMULATOR_PATH_ENV) {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_owned))
        .map(|dir| dir.join(DEFAULT_SIMULATOR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SIMULATOR_NAME))
}

fn run_master(sim_path: &Path) -> Result<(), ExitCode> {
    let _guard = fault_injector_logger::init(Some("FAULT_INJECTOR_LOG"), LoggerConfig::default())?;

    info!("running golden baseline against {sim_path:?}");
    let layout = PathLayout::default();
    let golden = run_golden(sim_path, layout.clone()).map_err(|err| {
        error!("golden run failed: {err}");
        ExitCode::from(err)
    })?;
    info!(
        "golden run: pid {} finished in {:?} with {} catalog entries",
        golden.pid,
        golden.duration,
        golden.catalog.len()
    );

    let config = prompt_campaign_config(prompt, golden.catalog.len()).map_err(|err| {
        error!("invalid campaign configuration: {err}");
        ExitCode::from(err)
    })?;

    let master_log_path = PathBuf::from(MASTER_LOG_PATH);
    let runner = CampaignRunner::new(sim_path.to_owned(), layout, master_log_path.clone());

    if config.parallelize {
        runner.run_parallel(&golden, &config)
    } else {
        runner.run_sequential(&golden, &config).map(|_| ())
    }
    .map_err(|err| {
        error!("campaign failed: {err}");
        ExitCode::from(err)
    })?;

    info!("campaign complete, log at {master_log_path:?}");
    Ok(())
}

fn run_sibling(args: &[String], sim_path: &Path) -> Result<(), ExitCode> {
    let sibling = parse_sibling_args(args).map_err(|err| {
        eprintln!("invalid sibling invocation: {err}");
        ExitCode::from(err)
    })?;

    // Siblings stay silent on stderr/stdout diagnostics; the master reads only their log
    // fragment, not arbitrary process output.
    let _guard = fault_injector_logger::init(
        None,
        LoggerConfig {
            silent: true,
            ..LoggerConfig::default()
        },
    )?;

    let layout = PathLayout::default();
    let golden_duration = Duration::from_millis(sibling.golden_duration_ms);
    let golden_output =
        read_golden_output(&layout, sibling.golden_pid).map_err(ExitCode::from)?;
    let mut rng = StdRng::seed_from_u64(sibling.rand_seed);

    let report = fault_injector_campaign::execute_trial(
        sim_path,
        layout,
        sibling.struct_id,
        sibling.max_time_ms,
        golden_duration,
        &golden_output,
        &sibling.error_pattern,
        sibling.trial_index,
        &mut rng,
    )
    .map_err(ExitCode::from)?;

    let fragment_path = fault_injector_campaign::sibling_log_path(std::process::id() as i32);
    fault_injector_campaign::append_to_log(
        &fragment_path,
        &fault_injector_campaign::format_trial_report(&report),
    )
    .map_err(ExitCode::from)?;

    Ok(())
}

/// Siblings never run the golden themselves; they read its transcript back off disk using its
/// pid, which the master passed down via the sibling argument vector.
fn read_golden_output(layout: &PathLayout, golden_pid: i32) -> Result<Vec<String>, Error> {
    let path = layout.output_path(golden_pid);
    let contents = std::fs::read_to_string(&path).map_err(|source| Error::ReadOutput {
        path: path.clone(),
        source,
    })?;
    Ok(contents.lines().map(str::to_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_sim_path_honors_the_env_override() {
        std::env::set_var(SIMULATOR_PATH_ENV, "/opt/sim/custom-binary");
        assert_eq!(resolve_sim_path(), PathBuf::from("/opt/sim/custom-binary"));
        std::env::remove_var(SIMULATOR_PATH_ENV);
    }

    #[test]
    fn read_golden_output_surfaces_a_read_output_error_for_a_missing_file() {
        let layout = PathLayout {
            output_dir: PathBuf::from("/nonexistent/output/dir"),
            ..PathLayout::default()
        };
        let err = read_golden_output(&layout, 999);
        assert!(matches!(err, Err(Error::ReadOutput { .. })));
    }
}
