//! Trial log formatting and fragment merging.
//!
//! Mirrors `logger.cpp`'s `log_injection_trial`/`log_join`: one multi-line block of plain text
//! per trial, appended to a master log file; in parallel mode each sibling writes its own
//! fragment and the master concatenates fragments in spawn order, deleting each as it is joined.

use crate::outcome::Outcome;
use fault_injector_catalog::DataStructureDescriptor;
use fault_injector_error::Error;
use fault_injector_injection::InjectionRecord;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Everything needed to render one trial's log block.
#[derive(Debug, Clone)]
pub struct TrialReport {
    pub trial_index: u32,
    pub descriptor: DataStructureDescriptor,
    /// `None` when the injection unit skipped the byte flip (child already exited, empty
    /// exploded region, or a deeper walk was required).
    pub injection: Option<InjectionRecord>,
    pub outcome: Outcome,
    pub error_pattern: String,
}

/// Render one trial as the multi-line block the master log accumulates: target descriptor,
/// fixed/exploded size, target byte/bit, before/after value, delay, outcome, and any
/// error-pattern match.
pub fn format_trial_report(report: &TrialReport) -> String {
    let mut out = String::new();
    let d = &report.descriptor;
    out.push_str(&format!(
        "Trial {}: target id={} name={:?} type={:?} address={:#x}\n",
        report.trial_index, d.id, d.name, d.ty, d.address
    ));
    out.push_str(&format!("Fixed size: {}\n", d.fixed_size()));

    match &report.injection {
        Some(record) => {
            out.push_str(&format!("Exploded size: {}\n", record.exploded_size));
            out.push_str(&format!(
                "Target byte: {} (bit {})\n",
                record.target_byte_index, record.target_bit_index
            ));
            out.push_str(&format!(
                "Byte before: {} Byte after: {}\n",
                record.byte_before, record.byte_after
            ));
            out.push_str(&format!(
                "Injected at {:#x} after {} ms (max {} ms)\n",
                record.injected_address, record.scheduled_delay_ms, record.max_delay_ms
            ));
        }
        None => out.push_str("No byte was injected for this trial.\n"),
    }

    out.push_str(&format!("Outcome: {}\n", report.outcome.label()));
    match &report.outcome {
        Outcome::Sdc { matched_line } => {
            if !report.error_pattern.is_empty() {
                match matched_line {
                    Some(line) => out.push_str(&format!(
                        "Searched for pattern {:?}, found matching line: {line}\n",
                        report.error_pattern
                    )),
                    None => out.push_str(&format!(
                        "Searched for pattern {:?}, no matching line found\n",
                        report.error_pattern
                    )),
                }
            }
        }
        Outcome::Delay {
            magnitude,
            delayed_line,
        } => {
            out.push_str(&format!(
                "Output delayed by {magnitude} operation(s), first delayed line: {delayed_line}\n"
            ));
        }
        Outcome::Crash { exit_code } => {
            out.push_str(&format!("Native exit code: {exit_code}\n"));
        }
        Outcome::Hang | Outcome::Masked => {}
    }
    out.push('\n');
    out
}

/// Append one trial's rendered block to `path`, creating the file (and its parent directory) if
/// necessary.
pub fn append_to_log(path: &Path, text: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::Io)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::Io)?;
    file.write_all(text.as_bytes()).map_err(Error::Io)?;
    Ok(())
}

/// Path a sibling process writes its own trial's log fragment to.
pub fn sibling_log_path(own_pid: i32) -> PathBuf {
    PathBuf::from("logs").join(format!("log_{own_pid}.log"))
}

/// Append `fragment_path`'s contents to `master_path` and delete the fragment, mirroring
/// `log_join`.
pub fn join_fragment(master_path: &Path, fragment_path: &Path) -> Result<(), Error> {
    let contents = std::fs::read_to_string(fragment_path).map_err(Error::Io)?;
    append_to_log(master_path, &contents)?;
    std::fs::remove_file(fragment_path).map_err(Error::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fault_injector_catalog::DataStructureType;

    fn sample_report(outcome: Outcome) -> TrialReport {
        TrialReport {
            trial_index: 0,
            descriptor: DataStructureDescriptor::new(0, "Queue1", DataStructureType::Queue, 0x1000),
            injection: Some(InjectionRecord {
                max_delay_ms: 100,
                scheduled_delay_ms: 42,
                target_bit_index: 3,
                target_byte_index: 5,
                exploded_size: 96,
                injected_address: 0x1005,
                byte_before: 0b0000_0000,
                byte_after: 0b0000_1000,
            }),
            outcome,
            error_pattern: String::new(),
        }
    }

    #[test]
    fn formats_masked_outcome_with_injection_details() {
        let text = format_trial_report(&sample_report(Outcome::Masked));
        assert!(text.contains("Outcome: Masked"));
        assert!(text.contains("Target byte: 5 (bit 3)"));
        assert!(text.contains("Exploded size: 96"));
    }

    #[test]
    fn formats_sdc_with_matched_pattern() {
        let mut report = sample_report(Outcome::Sdc {
            matched_line: Some("ERROR: assert failed".to_owned()),
        });
        report.error_pattern = "assert".to_owned();
        let text = format_trial_report(&report);
        assert!(text.contains("found matching line: ERROR: assert failed"));
    }

    #[test]
    fn join_fragment_appends_and_removes_the_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let master = dir.path().join("master.log");
        let fragment = dir.path().join("fragment.log");
        std::fs::write(&fragment, "fragment contents\n").unwrap();
        append_to_log(&master, "preexisting\n").unwrap();

        join_fragment(&master, &fragment).unwrap();

        let joined = std::fs::read_to_string(&master).unwrap();
        assert_eq!(joined, "preexisting\nfragment contents\n");
        assert!(!fragment.exists());
    }
}
