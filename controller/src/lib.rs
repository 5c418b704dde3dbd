//! Child-process controller: owns one simulator child end to end — spawn, catalog
//! handshake, bounded wait, termination, and output harvesting.
//!
//! Mirrors `SimulatorRun` in the original source (`start`/`wait`/`wait_for`/`terminate`/
//! `show_output`), generalized into the explicit state machine documented on
//! [`ChildController`].

mod semaphore;

pub use semaphore::NamedSemaphore;

use fault_injector_catalog::{parse_catalog, Catalog, DataStructureDescriptor};
use fault_injector_error::Error;
use fault_injector_logger::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

/// Default prefix for the catalog discovery file under `tmp/`, matching the upstream
/// `MEM_LOG_FILE_PREFIX` convention.
pub const DEFAULT_TMP_PREFIX: &str = "structuresLog_";
/// Default prefix for the child's output transcript under `output/`, matching the upstream
/// `OUTPUT_FILE_PREFIX` convention.
pub const DEFAULT_OUTPUT_PREFIX: &str = "output_";

/// Multiple of the golden run's duration a child is allowed to run before it is presumed hung.
pub const DEADLOCK_TIME_FACTOR: u32 = 2;

/// Filesystem layout the controller and the simulator child agree on.
#[derive(Debug, Clone)]
pub struct PathLayout {
    pub tmp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub tmp_prefix: String,
    pub output_prefix: String,
}

impl Default for PathLayout {
    fn default() -> Self {
        PathLayout {
            tmp_dir: PathBuf::from("tmp"),
            output_dir: PathBuf::from("output"),
            tmp_prefix: DEFAULT_TMP_PREFIX.to_owned(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_owned(),
        }
    }
}

impl PathLayout {
    fn catalog_path(&self, pid: i32) -> PathBuf {
        self.tmp_dir
            .join(format!("{}{pid}.txt", self.tmp_prefix))
    }

    /// Path to `pid`'s output transcript. Public so a sibling process can read the golden run's
    /// transcript without needing a live `ChildController` for it.
    pub fn output_path(&self, pid: i32) -> PathBuf {
        self.output_dir
            .join(format!("{}{pid}.txt", self.output_prefix))
    }
}

/// One child simulator process, spawned, handshaken, and tracked through exit.
///
/// State machine:
/// `Created → Spawned → CatalogReady → Attached → Running → {Exited | Killed}`. Each state is
/// reached by exactly one method: [`ChildController::spawn`] drives `Created` through `Running`
/// in one call (the handshake has no externally useful intermediate state); [`Self::wait`],
/// [`Self::wait_for`], and [`Self::terminate`] drive the remaining transitions.
pub struct ChildController {
    child: Child,
    pid: i32,
    catalog: Catalog,
    layout: PathLayout,
    begin_time: Instant,
    end_time: Option<Instant>,
    exit_code: Option<i32>,
    _sem1: NamedSemaphore,
    _sem2: NamedSemaphore,
}

impl ChildController {
    /// Spawn `sim_path` and drive the full handshake: wait for the catalog-ready semaphore, parse
    /// the discovery file, then post the go-ahead semaphore. Returns once the child's scheduler
    /// has been released; `begin_time` is set at that instant, mirroring `getBeginTime` in the
    /// original source.
    pub fn spawn(sim_path: &Path, layout: PathLayout) -> Result<Self, Error> {
        let child = Command::new(sim_path)
            .spawn()
            .map_err(|source| Error::Spawn {
                path: sim_path.to_owned(),
                source,
            })?;
        let pid = child.id() as i32;
        debug!("spawned simulator {:?} as pid {pid}", sim_path);

        let sem1 = NamedSemaphore::create(&format!("binary_sem_log_struct_{pid}_1"))?;
        let sem2 = NamedSemaphore::create(&format!("binary_sem_log_struct_{pid}_2"))?;

        sem1.wait()?;
        debug!("pid {pid} signaled catalog ready");

        let catalog = parse_catalog(&layout.catalog_path(pid))?;

        sem2.post()?;
        let begin_time = Instant::now();
        debug!("pid {pid} released, catalog has {} entries", catalog.len());

        Ok(ChildController {
            child,
            pid,
            catalog,
            layout,
            begin_time,
            end_time: None,
            exit_code: None,
            _sem1: sem1,
            _sem2: sem2,
        })
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// True if the child has not yet exited. Reaps the exit status as a side effect, mirroring
    /// `bp::child::running()`.
    pub fn running(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.record_exit(status);
                false
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }

    pub fn native_exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Block until the child exits, with no deadline.
    pub fn wait(&mut self) -> Result<i32, Error> {
        let status = self.child.wait().map_err(Error::Io)?;
        self.record_exit(status);
        Ok(self.exit_code.unwrap_or_default())
    }

    /// Block until the child exits or `rel_time` elapses, polling at a fixed granularity since
    /// the standard library has no native timed wait on a child process. Returns `true` if the
    /// child exited within the deadline, `false` if the deadline expired first.
    pub fn wait_for(&mut self, rel_time: Duration) -> bool {
        const POLL_INTERVAL: Duration = Duration::from_millis(20);
        let deadline = Instant::now() + rel_time;

        loop {
            if !self.running() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    /// Force-kill the child (SIGKILL on Unix, via `std::process::Child::kill`).
    pub fn terminate(&mut self) -> Result<(), Error> {
        warn!("terminating pid {} (suspected deadlock)", self.pid);
        if let Err(source) = self.child.kill() {
            if source.kind() != std::io::ErrorKind::InvalidInput {
                return Err(Error::Io(source));
            }
        }
        let _ = self.child.wait();
        self.running();
        Ok(())
    }

    /// Load the child's line-oriented output transcript. `pid_override` lets a sibling process
    /// read the golden run's transcript after the golden process itself has exited.
    pub fn save_output(&self, pid_override: Option<i32>) -> Result<Vec<String>, Error> {
        let pid = pid_override.unwrap_or(self.pid);
        let path = self.layout.output_path(pid);
        let contents = std::fs::read_to_string(&path).map_err(|source| Error::ReadOutput {
            path: path.clone(),
            source,
        })?;
        Ok(contents.lines().map(str::to_owned).collect())
    }

    pub fn data_structures(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get_by_id(&self, id: u32) -> Option<&DataStructureDescriptor> {
        self.catalog.get_by_id(id)
    }

    pub fn begin_time(&self) -> Instant {
        self.begin_time
    }

    /// Wall time from scheduler start (`sem2` post) to exit. `None` until the child has exited.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end.duration_since(self.begin_time))
    }

    fn record_exit(&mut self, status: std::process::ExitStatus) {
        if self.end_time.is_none() {
            self.end_time = Some(Instant::now());
            self.exit_code = Some(native_exit_code(status));
        }
    }
}

impl Drop for ChildController {
    fn drop(&mut self) {
        let path = self.layout.catalog_path(self.pid);
        if let Err(err) = std::fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove catalog file {path:?}: {err}");
            }
        }
        // `_sem1`/`_sem2` unlink themselves on drop (field order ensures they drop after this).
    }
}

#[cfg(unix)]
fn native_exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.code().unwrap_or_else(|| status.signal().unwrap_or(-1))
}

#[cfg(not(unix))]
fn native_exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout_builds_well_known_paths() {
        let layout = PathLayout::default();
        assert_eq!(layout.catalog_path(42), PathBuf::from("tmp/structuresLog_42.txt"));
        assert_eq!(layout.output_path(42), PathBuf::from("output/output_42.txt"));
    }

    #[test]
    fn wait_for_times_out_on_a_long_running_child() {
        let child = Command::new("sleep").arg("5").spawn().expect("spawn sleep");
        let pid = child.id() as i32;

        // Build a ChildController without going through the handshake, for this unit test only.
        let sem1 = NamedSemaphore::create(&format!("ctrl_test_sem1_{pid}")).unwrap();
        let sem2 = NamedSemaphore::create(&format!("ctrl_test_sem2_{pid}")).unwrap();
        let mut controller = ChildController {
            child,
            pid,
            catalog: Catalog::default(),
            layout: PathLayout::default(),
            begin_time: Instant::now(),
            end_time: None,
            exit_code: None,
            _sem1: sem1,
            _sem2: sem2,
        };

        let exited = controller.wait_for(Duration::from_millis(100));
        assert!(!exited);
        controller.terminate().expect("terminate should succeed");
    }
}
