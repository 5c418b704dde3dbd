//! Outcome classifier: compares a trial transcript against the golden transcript line-for-line
//! and emits one of the three verdicts the classifier itself is responsible for.
//! `Hang` and `Crash` are not classifier outputs — they are emitted by the controller from
//! timeout/exit-code and never reach this pipeline (see `fault-injector-campaign`'s `Outcome`,
//! which wraps this type's [`Verdict`] alongside those two).

/// A classifier verdict plus whatever diagnostic line triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The injection had no observable effect; `trial == golden` line-for-line.
    Masked,
    /// The trial's output diverges from golden. `matched_line` is `Some` only when an
    /// `error_pattern` was supplied and a divergent line matched it case-insensitively.
    Sdc { matched_line: Option<String> },
    /// The trial's output is golden reordered, with at least one line shifted. `magnitude` is the
    /// largest index shift observed during the walk; `delayed_line` is the content of the first
    /// line at which a shift was detected.
    Delay { magnitude: usize, delayed_line: String },
}

/// Compare `golden` against `trial`, optionally singling out a substring `error_pattern` (case
/// insensitive; empty string means "no pattern supplied").
///
/// A length mismatch is `Sdc` immediately. Otherwise each trial line is matched against the
/// golden line at the same index; on a mismatch the trial line is searched for elsewhere in
/// golden — found-but-shifted lines accumulate as a `Delay` (tracking the largest shift seen),
/// while a trial line absent from golden entirely is `Sdc`, with `matched_line` set when
/// `error_pattern` is non-empty and found in that line.
pub fn classify(golden: &[String], trial: &[String], error_pattern: &str) -> Verdict {
    if trial.len() != golden.len() {
        return Verdict::Sdc { matched_line: None };
    }

    let mut max_magnitude = 0usize;
    let mut first_delayed_line: Option<String> = None;

    for (i, trial_line) in trial.iter().enumerate() {
        if *trial_line == golden[i] {
            continue;
        }

        match golden.iter().position(|g| g == trial_line) {
            Some(j) if j != i => {
                let magnitude = i.abs_diff(j);
                if first_delayed_line.is_none() {
                    first_delayed_line = Some(trial_line.clone());
                }
                max_magnitude = max_magnitude.max(magnitude);
            }
            _ => {
                let matched_line = if !error_pattern.is_empty()
                    && trial_line.to_lowercase().contains(&error_pattern.to_lowercase())
                {
                    Some(trial_line.clone())
                } else {
                    None
                };
                return Verdict::Sdc { matched_line };
            }
        }
    }

    match first_delayed_line {
        Some(delayed_line) => Verdict::Delay {
            magnitude: max_magnitude,
            delayed_line,
        },
        None => Verdict::Masked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_transcripts_are_masked() {
        let golden = lines(&["A", "B", "C"]);
        let trial = golden.clone();
        assert_eq!(classify(&golden, &trial, ""), Verdict::Masked);
    }

    #[test]
    fn sdc_with_pattern_match() {
        let golden = lines(&["OK", "OK"]);
        let trial = lines(&["OK", "ERROR: assert failed"]);
        assert_eq!(
            classify(&golden, &trial, "assert"),
            Verdict::Sdc {
                matched_line: Some("ERROR: assert failed".to_owned())
            }
        );
    }

    #[test]
    fn sdc_without_pattern_has_no_matched_line() {
        let golden = lines(&["OK", "OK"]);
        let trial = lines(&["OK", "ERROR: assert failed"]);
        assert_eq!(
            classify(&golden, &trial, ""),
            Verdict::Sdc { matched_line: None }
        );
    }

    #[test]
    fn delay_when_output_is_a_reordered_permutation() {
        let golden = lines(&["L1", "L2", "L3", "L4"]);
        let trial = lines(&["L1", "L3", "L2", "L4"]);
        assert_eq!(
            classify(&golden, &trial, ""),
            Verdict::Delay {
                magnitude: 1,
                delayed_line: "L3".to_owned(),
            }
        );
    }

    #[test]
    fn length_difference_is_sdc_without_walking() {
        let golden = lines(&["A"; 10]);
        let trial = lines(&["A"; 9]);
        assert_eq!(classify(&golden, &trial, ""), Verdict::Sdc { matched_line: None });
    }

    #[test]
    fn pattern_search_is_case_insensitive() {
        let golden = lines(&["OK"]);
        let trial = lines(&["Fatal ASSERT Failure"]);
        assert_eq!(
            classify(&golden, &trial, "assert"),
            Verdict::Sdc {
                matched_line: Some("Fatal ASSERT Failure".to_owned())
            }
        );
    }

    #[test]
    fn classify_of_identical_input_against_itself_is_always_masked() {
        let a = lines(&["x", "y", "z"]);
        assert_eq!(classify(&a, &a, "anything"), Verdict::Masked);
    }

    #[test]
    fn concatenating_equal_prefixes_does_not_change_the_verdict() {
        let golden = lines(&["A", "B"]);
        let trial = lines(&["A", "C"]);
        let base = classify(&golden, &trial, "");

        let mut golden_prefixed = lines(&["P0", "P1"]);
        golden_prefixed.extend(golden.clone());
        let mut trial_prefixed = lines(&["P0", "P1"]);
        trial_prefixed.extend(trial.clone());

        // Concatenating an equal prefix shifts indices but must not change the verdict kind
        // or the delayed/matched line content.
        match (base, classify(&golden_prefixed, &trial_prefixed, "")) {
            (Verdict::Sdc { matched_line: a }, Verdict::Sdc { matched_line: b }) => {
                assert_eq!(a, b)
            }
            other => panic!("expected both sides to be Sdc, got {other:?}"),
        }
    }
}
