//! Golden run capture: one un-injected execution of the simulator, used as the comparison
//! baseline for every trial in the campaign.

use fault_injector_catalog::Catalog;
use fault_injector_controller::{ChildController, PathLayout};
use fault_injector_error::Error;
use fault_injector_logger::info;
use std::path::Path;
use std::time::Duration;

/// The golden run's observable state: everything a trial needs to classify against it, plus
/// everything a parallel sibling needs without re-running the golden itself.
#[derive(Debug, Clone)]
pub struct GoldenRun {
    pub pid: i32,
    pub duration: Duration,
    pub output: Vec<String>,
    pub catalog: Catalog,
}

/// Spawn the simulator once with no injection, run it to completion, and capture its duration,
/// output, and catalog.
pub fn run_golden(sim_path: &Path, layout: PathLayout) -> Result<GoldenRun, Error> {
    let mut controller = ChildController::spawn(sim_path, layout)?;
    let pid = controller.pid();
    info!("golden run: pid {pid} started");

    controller.wait()?;
    let duration = controller
        .duration()
        .expect("duration is set once the child has exited");
    let output = controller.save_output(None)?;
    let catalog = controller.data_structures().clone();

    info!(
        "golden run: pid {pid} finished in {:?}, {} output lines, {} catalog entries",
        duration,
        output.len(),
        catalog.len()
    );

    Ok(GoldenRun {
        pid,
        duration,
        output,
        catalog,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_of_a_nonexistent_binary_is_a_spawn_error() {
        let layout = PathLayout::default();
        let err = run_golden(Path::new("/nonexistent/simulator-binary"), layout);
        assert!(matches!(err, Err(Error::Spawn { .. })));
    }
}
