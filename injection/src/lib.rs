//! Injection unit: owns a scheduled single-bit-flip trial against one child's memory.
//!
//! Mirrors the original `Injection` class: `max_time_ms`/`random_time_ms`/`target_bit_number` are
//! drawn once at construction (matching `Injection::Injection`'s `rand() % max_time_ms` and
//! `rand() % 8`), and `inject()` draws the target byte only once the exploded size of the live
//! structure is known.

use fault_injector_catalog::DataStructureDescriptor;
use fault_injector_controller::ChildController;
use fault_injector_error::Error;
use fault_injector_logger::debug;
use fault_injector_memory::{read_byte, write_byte, ChildMemory};
use rand::Rng;
use std::time::{Duration, Instant};

/// The result of one `inject()` call, including every case in which no byte was actually flipped:
/// the child already exited, the exploded region was empty, or the chosen byte required a deeper
/// pointer walk this implementation doesn't perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// A bit was flipped; see `record` for the before/after state.
    Injected(InjectionRecord),
    /// The child was no longer running when the scheduled delay elapsed.
    ChildAlreadyExited,
    /// `explodedSize == 0` (e.g. an empty list); the trial reports `Masked` with no injection.
    EmptyExplodedRegion,
    /// The randomly chosen byte lies behind a pointer chase this registry doesn't walk past one
    /// hop (see `DataStructureType::next_expansion`); the trial reports `Masked`.
    DeeperWalkNotSupported { exploded_size: usize },
}

/// Snapshot of one completed (or attempted) bit flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionRecord {
    pub max_delay_ms: u64,
    pub scheduled_delay_ms: u64,
    pub target_bit_index: u8,
    pub target_byte_index: usize,
    pub exploded_size: usize,
    pub injected_address: usize,
    pub byte_before: u8,
    pub byte_after: u8,
}

impl InjectionRecord {
    /// Once `inject` returns successfully, `byte_after` is `byte_before` with exactly one bit
    /// flipped.
    pub fn is_single_bit_flip(&self) -> bool {
        self.byte_after == (self.byte_before ^ (1 << self.target_bit_index))
    }
}

/// A scheduled single-bit-flip trial, bound to one catalog entry.
pub struct InjectionUnit {
    descriptor: DataStructureDescriptor,
    max_delay_ms: u64,
    scheduled_delay_ms: u64,
    target_bit_index: u8,
}

impl InjectionUnit {
    /// Construct a unit targeting `descriptor`, drawing `scheduled_delay_ms` uniformly on
    /// `[0, max_delay_ms)` and `target_bit_index` uniformly on `[0, 8)`.
    pub fn new(descriptor: DataStructureDescriptor, max_delay_ms: u64, rng: &mut impl Rng) -> Self {
        let scheduled_delay_ms = if max_delay_ms == 0 {
            0
        } else {
            rng.gen_range(0..max_delay_ms)
        };
        let target_bit_index = rng.gen_range(0..8u8);

        InjectionUnit {
            descriptor,
            max_delay_ms,
            scheduled_delay_ms,
            target_bit_index,
        }
    }

    pub fn scheduled_delay_ms(&self) -> u64 {
        self.scheduled_delay_ms
    }

    pub fn target_bit_index(&self) -> u8 {
        self.target_bit_index
    }

    pub fn descriptor(&self) -> &DataStructureDescriptor {
        &self.descriptor
    }

    /// Run the scheduled bit-flip trial against a live child, borrowing its controller for the
    /// duration of the call.
    pub fn inject(
        &self,
        controller: &mut ChildController,
        mem: &dyn ChildMemory,
        rng: &mut impl Rng,
        begin_time: Instant,
    ) -> Result<InjectionOutcome, Error> {
        self.sleep_until_scheduled(begin_time);

        if !controller.running() {
            return Ok(InjectionOutcome::ChildAlreadyExited);
        }

        let pid = controller.pid();
        let fixed_size = self.descriptor.fixed_size();
        let base = self.descriptor.address;

        let mut snapshot = vec![0u8; fixed_size];
        mem.read(pid, base, &mut snapshot)?;

        let exploded_size = self.descriptor.ty.exploded_size(&snapshot);
        if exploded_size == 0 {
            return Ok(InjectionOutcome::EmptyExplodedRegion);
        }

        let target_byte_index = rng.gen_range(0..exploded_size);

        let (injected_address, byte_before) = if target_byte_index < fixed_size {
            (base + target_byte_index, snapshot[target_byte_index])
        } else {
            let offset = target_byte_index - fixed_size;
            let step = self.descriptor.ty.next_expansion(&snapshot, offset);
            if step.requires_deeper_walk {
                debug!(
                    "pid {pid}: byte {target_byte_index} of {} requires a deeper walk, skipping injection",
                    self.descriptor.name
                );
                return Ok(InjectionOutcome::DeeperWalkNotSupported { exploded_size });
            }
            (step.address, read_byte(mem, pid, step.address)?)
        };

        let byte_after = byte_before ^ (1 << self.target_bit_index);
        write_byte(mem, pid, injected_address, byte_after)?;

        Ok(InjectionOutcome::Injected(InjectionRecord {
            max_delay_ms: self.max_delay_ms,
            scheduled_delay_ms: self.scheduled_delay_ms,
            target_bit_index: self.target_bit_index,
            target_byte_index,
            exploded_size,
            injected_address,
            byte_before,
            byte_after,
        }))
    }

    fn sleep_until_scheduled(&self, begin_time: Instant) {
        let target = begin_time + Duration::from_millis(self.scheduled_delay_ms);
        let now = Instant::now();
        if let Some(remaining) = target.checked_duration_since(now) {
            std::thread::sleep(remaining);
        }
    }
}
