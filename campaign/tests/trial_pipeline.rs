//! Black-box exercise of the catalog → classify → log pipeline, end to end through public APIs
//! only, in the style of the teacher's `util/logger-service/tests/` black-box suite.
//!
//! No real simulator child is spawned here (that needs a live process and `process_vm_readv`
//! privileges); this drives the parts of the pipeline that are pure functions of files and
//! in-memory transcripts: catalog parsing, classification, and log rendering plus fragment
//! merging.

use fault_injector_campaign::{append_to_log, format_trial_report, join_fragment, Outcome, TrialReport};
use fault_injector_catalog::parse_catalog;
use fault_injector_classifier::classify;
use fault_injector_injection::InjectionRecord;

#[test]
fn catalog_then_classify_then_log_round_trips_through_real_files() {
    let dir = tempfile::tempdir().expect("create scratch dir");

    let catalog_path = dir.path().join("structuresLog_1234.txt");
    std::fs::write(
        &catalog_path,
        "ID Name Type Address\n\
         0 BlockQ_Queue1-2 1 0x7f0000000020\n\
         1 EventGroup_Sync 5 0x7f0000000100\n",
    )
    .expect("write catalog file");

    let catalog = parse_catalog(&catalog_path).expect("catalog should parse");
    assert_eq!(catalog.len(), 2);
    let target = catalog.get_by_id(0).expect("id 0 present").clone();
    assert_eq!(target.name, "BlockQ_Queue1-2");

    let golden_output: Vec<String> = vec!["boot".into(), "tick 1".into(), "tick 2".into(), "done".into()];
    let trial_output: Vec<String> = vec!["boot".into(), "tick 2".into(), "tick 1".into(), "done".into()];
    let verdict = classify(&golden_output, &trial_output, "");

    let report = TrialReport {
        trial_index: 0,
        descriptor: target,
        injection: Some(InjectionRecord {
            max_delay_ms: 500,
            scheduled_delay_ms: 120,
            target_bit_index: 5,
            target_byte_index: 12,
            exploded_size: 96,
            injected_address: 0x7f000000002c,
            byte_before: 0b0001_0000,
            byte_after: 0b0011_0000,
        }),
        outcome: Outcome::from(verdict),
        error_pattern: String::new(),
    };
    assert!(matches!(report.outcome, Outcome::Delay { .. }));

    let master_log = dir.path().join("logs").join("master.log");
    let fragment_log = dir.path().join("logs").join("log_9999.log");
    append_to_log(&fragment_log, &format_trial_report(&report)).expect("write fragment");
    join_fragment(&master_log, &fragment_log).expect("join fragment into master");

    let joined = std::fs::read_to_string(&master_log).expect("read master log");
    assert!(joined.contains("BlockQ_Queue1-2"));
    assert!(joined.contains("Outcome: Delay"));
    assert!(joined.contains("Output delayed by 1 operation(s)"));
    assert!(!fragment_log.exists(), "fragment should be deleted once joined");
}

#[test]
fn unknown_struct_id_surfaces_as_none_from_the_catalog() {
    let dir = tempfile::tempdir().expect("create scratch dir");
    let catalog_path = dir.path().join("structuresLog_1.txt");
    std::fs::write(&catalog_path, "ID Name Type Address\n0 Task_Idle 0 0x10\n").unwrap();

    let catalog = parse_catalog(&catalog_path).expect("catalog should parse");
    assert!(catalog.get_by_id(7).is_none());
}
