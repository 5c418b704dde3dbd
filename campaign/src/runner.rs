//! Campaign runner: drives `injectN` trials either sequentially in this process or by
//! fanning out to sibling processes of this same executable.

use crate::golden::GoldenRun;
use crate::log::{append_to_log, format_trial_report, join_fragment, sibling_log_path, TrialReport};
use crate::outcome::Outcome;
use fault_injector_classifier::classify;
use fault_injector_config::{sibling_argv, CampaignConfig};
use fault_injector_controller::{ChildController, PathLayout, DEADLOCK_TIME_FACTOR};
use fault_injector_error::Error;
use fault_injector_injection::{InjectionOutcome, InjectionUnit};
use fault_injector_logger::{info, warn};
use fault_injector_memory::LinuxChildMemory;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Drives `injectN` trials against `sim_path`, logging each to `master_log_path`.
pub struct CampaignRunner {
    sim_path: PathBuf,
    layout: PathLayout,
    master_log_path: PathBuf,
}

impl CampaignRunner {
    pub fn new(sim_path: PathBuf, layout: PathLayout, master_log_path: PathBuf) -> Self {
        CampaignRunner {
            sim_path,
            layout,
            master_log_path,
        }
    }

    /// Sequential mode: one controller per trial, all run in this process.
    pub fn run_sequential(
        &self,
        golden: &GoldenRun,
        config: &CampaignConfig,
    ) -> Result<Vec<TrialReport>, Error> {
        golden.catalog.get_by_id(config.struct_id).ok_or_else(|| {
            Error::InvalidConfig(format!("struct_id {} not in golden catalog", config.struct_id))
        })?;

        let mut rng = rand::thread_rng();
        let mut reports = Vec::with_capacity(config.inject_n as usize);

        // Fast feedback above against the golden's catalog; each trial separately re-resolves
        // `struct_id` against its own freshly spawned child's catalog, since a trial's child is
        // never the golden's child.
        for trial_index in 0..config.inject_n {
            let report = execute_trial(
                &self.sim_path,
                self.layout.clone(),
                config.struct_id,
                config.max_time_ms,
                golden.duration,
                &golden.output,
                &config.error_pattern,
                trial_index,
                &mut rng,
            )?;
            append_to_log(&self.master_log_path, &format_trial_report(&report))?;
            info!("trial {trial_index}: {}", report.outcome.label());
            reports.push(report);
        }

        Ok(reports)
    }

    /// Parallel mode: spawn `injectN` sibling processes of this same executable, each running
    /// exactly one trial. Fragments are joined into the master log in spawn order.
    pub fn run_parallel(&self, golden: &GoldenRun, config: &CampaignConfig) -> Result<(), Error> {
        golden.catalog.get_by_id(config.struct_id).ok_or_else(|| {
            Error::InvalidConfig(format!("struct_id {} not in golden catalog", config.struct_id))
        })?;

        let exe = std::env::current_exe().map_err(Error::Io)?;
        let golden_duration_ms = golden.duration.as_millis() as u64;

        let tracked_pids = Arc::new(Mutex::new(Vec::<u32>::new()));
        let _guard = install_ctrlc_reaper(Arc::clone(&tracked_pids));

        let mut children = Vec::with_capacity(config.inject_n as usize);
        for trial_index in 0..config.inject_n {
            let seed: u64 = rand::random();
            let argv = sibling_argv(
                golden.pid,
                golden_duration_ms,
                seed,
                config.struct_id,
                trial_index,
                config.max_time_ms,
                &config.error_pattern,
            );
            let child = Command::new(&exe)
                .args(&argv)
                .spawn()
                .map_err(|source| Error::Spawn {
                    path: exe.clone(),
                    source,
                })?;
            tracked_pids.lock().expect("pid list mutex").push(child.id());
            children.push(child);
        }

        for mut child in children {
            let pid = child.id() as i32;
            let status = child.wait().map_err(Error::Io)?;
            info!("sibling pid {pid} exited with status {status}");

            let fragment = sibling_log_path(pid);
            if fragment.exists() {
                join_fragment(&self.master_log_path, &fragment)?;
            } else {
                warn!("sibling pid {pid} left no log fragment at {fragment:?}");
            }
        }

        Ok(())
    }
}

/// One sibling trial's worth of work, sharing the pipeline a sequential trial uses so both
/// modes run the same injection-then-classify sequence and stay in lockstep.
pub fn execute_trial(
    sim_path: &Path,
    layout: PathLayout,
    struct_id: u32,
    max_time_ms: u64,
    golden_duration: Duration,
    golden_output: &[String],
    error_pattern: &str,
    trial_index: u32,
    rng: &mut impl Rng,
) -> Result<TrialReport, Error> {
    let mut controller = ChildController::spawn(sim_path, layout)?;
    let begin_time = controller.begin_time();
    let descriptor = match controller.get_by_id(struct_id).cloned() {
        Some(descriptor) => descriptor,
        None => {
            let _ = controller.terminate();
            return Err(Error::InvalidConfig(format!(
                "struct_id {struct_id} not present in this child's catalog"
            )));
        }
    };
    let unit = InjectionUnit::new(descriptor.clone(), max_time_ms, rng);
    let mem = LinuxChildMemory;

    let injection_outcome = unit.inject(&mut controller, &mem, rng, begin_time);

    let injection_record = match injection_outcome {
        Ok(InjectionOutcome::Injected(record)) => Some(record),
        Ok(InjectionOutcome::ChildAlreadyExited)
        | Ok(InjectionOutcome::EmptyExplodedRegion)
        | Ok(InjectionOutcome::DeeperWalkNotSupported { .. }) => None,
        Err(source) => {
            warn!("trial {trial_index}: memory access failed during injection: {source}");
            let _ = controller.terminate();
            let outcome = Outcome::Crash {
                exit_code: controller.native_exit_code().unwrap_or(-1),
            };
            return Ok(TrialReport {
                trial_index,
                descriptor,
                injection: None,
                outcome,
                error_pattern: error_pattern.to_owned(),
            });
        }
    };

    let deadline = golden_duration * DEADLOCK_TIME_FACTOR;
    let exited_in_time = controller.wait_for(deadline);

    let outcome = if !exited_in_time {
        controller.terminate()?;
        Outcome::Hang
    } else {
        match controller.native_exit_code() {
            Some(0) | None => {
                let trial_output = controller.save_output(None)?;
                Outcome::from(classify(golden_output, &trial_output, error_pattern))
            }
            Some(exit_code) => Outcome::Crash { exit_code },
        }
    };

    Ok(TrialReport {
        trial_index,
        descriptor,
        injection: injection_record,
        outcome,
        error_pattern: error_pattern.to_owned(),
    })
}

/// RAII guard for the Ctrl-C handler registered by [`CampaignRunner::run_parallel`]. Holding it
/// keeps the handler installed; on interrupt, every still-tracked sibling pid is sent SIGKILL.
pub struct CtrlcReaperGuard;

fn install_ctrlc_reaper(tracked_pids: Arc<Mutex<Vec<u32>>>) -> CtrlcReaperGuard {
    let result = ctrlc::set_handler(move || {
        let pids = tracked_pids.lock().expect("pid list mutex");
        for &pid in pids.iter() {
            // SAFETY: `pid` was obtained from `Child::id()` of a process this master spawned.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGKILL);
            }
        }
        std::process::exit(130); // 128 + SIGINT, matching common shell convention
    });
    if let Err(err) = result {
        warn!("could not install Ctrl-C handler: {err}");
    }
    CtrlcReaperGuard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_sequential_rejects_an_unknown_struct_id() {
        let golden = GoldenRun {
            pid: 1,
            duration: Duration::from_millis(10),
            output: vec!["A".to_owned()],
            catalog: fault_injector_catalog::Catalog::default(),
        };
        let config = CampaignConfig {
            struct_id: 0,
            inject_n: 1,
            max_time_ms: 10,
            parallelize: false,
            error_pattern: String::new(),
        };
        let runner = CampaignRunner::new(
            PathBuf::from("/bin/true"),
            PathLayout::default(),
            PathBuf::from("/tmp/fault-injector-test.log"),
        );
        let err = runner.run_sequential(&golden, &config);
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }
}
