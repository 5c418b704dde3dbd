//! The closed set of injectable kernel-object types and the type registry.
//!
//! The upstream source dispatches on these via a C `switch` on an integer tag
//! (`FreeRTOSInterface.c`'s `get_fixed_sizeof_struct`/`get_exploded_sizeof_struct`). Here the tag
//! becomes a proper enum and the switch becomes `match` arms on `self` — a dispatch, not a
//! vtable, since the set is closed and known at compile time.

/// Numeric tag persisted in the catalog file. Order and values are part of the on-disk wire
/// contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataStructureType {
    Task = 0,
    Queue = 1,
    Timer = 2,
    Semaphore = 3,
    CountingSemaphore = 4,
    EventGroup = 5,
    MessageBuffer = 6,
    StreamBuffer = 7,
    QueueSet = 8,
    StaticStack = 9,
    List = 10,
}

impl DataStructureType {
    /// Round-trips the numeric tag persisted in the catalog file. `None` for any tag outside the
    /// closed set.
    pub fn from_tag(tag: u32) -> Option<Self> {
        use DataStructureType::*;
        Some(match tag {
            0 => Task,
            1 => Queue,
            2 => Timer,
            3 => Semaphore,
            4 => CountingSemaphore,
            5 => EventGroup,
            6 => MessageBuffer,
            7 => StreamBuffer,
            8 => QueueSet,
            9 => StaticStack,
            10 => List,
            _ => return None,
        })
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Fixed header size in bytes, a compile-time constant per type mirroring the byte layout of
    /// the corresponding FreeRTOS struct (`TCB_t`, `Queue_t`, ...).
    pub const fn fixed_size(self) -> usize {
        use DataStructureType::*;
        match self {
            Task => 88,
            Queue => 80,
            Timer => 72,
            Semaphore => 64,
            CountingSemaphore => 80,
            EventGroup => 40,
            MessageBuffer => 72,
            StreamBuffer => 72,
            QueueSet => 80,
            StaticStack => 256,
            List => 40,
        }
    }

    /// Total logical size including anything reachable through pointers embedded in `snapshot`,
    /// the fixed header read from the child.
    ///
    /// Types without dynamic content report their fixed size unchanged. Queue-like types (Queue,
    /// CountingSemaphore, MessageBuffer, StreamBuffer, QueueSet) add `item_count * item_size` read
    /// out of the header, mirroring `uxMessagesWaiting`/`uxItemSize` in FreeRTOS's `Queue_t`. List
    /// adds `item_count * LIST_ITEM_PAYLOAD_SIZE`, mirroring `uxNumberOfItems` in `List_t`.
    ///
    /// `snapshot` shorter than the fixed header (a truncated read) is treated as having no
    /// dynamic content; the caller is expected to have read at least `fixed_size()` bytes.
    pub fn exploded_size(self, snapshot: &[u8]) -> usize {
        use DataStructureType::*;
        let fixed = self.fixed_size();
        match self {
            Task | Timer | EventGroup | Semaphore | StaticStack => fixed,
            Queue | CountingSemaphore | MessageBuffer | StreamBuffer | QueueSet => {
                let item_count = read_u32(snapshot, ITEM_COUNT_OFFSET) as usize;
                let item_size = read_u32(snapshot, ITEM_SIZE_OFFSET) as usize;
                fixed + item_count.saturating_mul(item_size)
            }
            List => {
                let item_count = read_u32(snapshot, LIST_COUNT_OFFSET) as usize;
                fixed + item_count.saturating_mul(LIST_ITEM_PAYLOAD_SIZE)
            }
        }
    }

    /// Translate a byte index that lies beyond the fixed header (`byte_in_exploded = target -
    /// fixed_size`) into a concrete expansion step.
    ///
    /// # Panics
    ///
    /// Panics if called on a variant with no dynamic content (`exploded_size == fixed_size`);
    /// callers never reach this path for those types since there is no exploded region to index
    /// into.
    pub fn next_expansion(self, snapshot: &[u8], byte_in_exploded: usize) -> ExpansionStep {
        use DataStructureType::*;
        match self {
            Queue | CountingSemaphore | MessageBuffer | StreamBuffer | QueueSet => {
                let storage = read_u64(snapshot, STORAGE_PTR_OFFSET) as usize;
                ExpansionStep {
                    address: storage.wrapping_add(byte_in_exploded),
                    read_size: 0,
                    requires_deeper_walk: false,
                }
            }
            List => {
                // The Nth node's payload is only reachable by chasing `uxNumberOfItems` many
                // `pxNext` pointers one at a time; a single hop from the list head cannot resolve
                // it. Declared but not implemented (TODO deeper linking, see DESIGN.md).
                let next = read_u64(snapshot, LIST_NEXT_PTR_OFFSET) as usize;
                ExpansionStep {
                    address: next,
                    read_size: 8,
                    requires_deeper_walk: true,
                }
            }
            Task | Timer | EventGroup | Semaphore | StaticStack => {
                unreachable!("{self:?} has no exploded region beyond its fixed header")
            }
        }
    }
}

/// Result of [`DataStructureType::next_expansion`]: where to inject, and whether a further hop
/// through child memory is required before the target byte is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionStep {
    /// Absolute address in the child's address space.
    pub address: usize,
    /// `0` means `address` is directly injectable. A non-zero value names how many bytes to read
    /// from `address` before a further hop can be resolved.
    pub read_size: usize,
    /// When true, the expansion needs more hops than this implementation performs; the caller
    /// should skip injection for this byte (see `DataStructureType::next_expansion`'s doc comment).
    pub requires_deeper_walk: bool,
}

const STORAGE_PTR_OFFSET: usize = 0;
const ITEM_COUNT_OFFSET: usize = 8;
const ITEM_SIZE_OFFSET: usize = 12;
const LIST_COUNT_OFFSET: usize = 0;
const LIST_NEXT_PTR_OFFSET: usize = 8;
const LIST_ITEM_PAYLOAD_SIZE: usize = 8;

/// Maximum `fixed_size()` across the closed type set, computed rather than hard-coded so it stays
/// correct if a variant's fixed size changes. Sizes the per-trial scratch snapshot buffer.
pub const MAX_FIXED_SIZE: usize = max_fixed_size();

const fn max_fixed_size() -> usize {
    use DataStructureType::*;
    const ALL: [DataStructureType; 11] = [
        Task,
        Queue,
        Timer,
        Semaphore,
        CountingSemaphore,
        EventGroup,
        MessageBuffer,
        StreamBuffer,
        QueueSet,
        StaticStack,
        List,
    ];
    let mut max = 0;
    let mut i = 0;
    while i < ALL.len() {
        let size = ALL[i].fixed_size();
        if size > max {
            max = size;
        }
        i += 1;
    }
    max
}

fn read_u32(snapshot: &[u8], offset: usize) -> u32 {
    match snapshot.get(offset..offset + 4) {
        Some(bytes) => u32::from_ne_bytes(bytes.try_into().expect("slice is 4 bytes")),
        None => 0,
    }
}

fn read_u64(snapshot: &[u8], offset: usize) -> u64 {
    match snapshot.get(offset..offset + 8) {
        Some(bytes) => u64::from_ne_bytes(bytes.try_into().expect("slice is 8 bytes")),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_the_closed_set() {
        for tag in 0..=10u32 {
            let ty = DataStructureType::from_tag(tag).expect("tag is in the closed set");
            assert_eq!(ty.tag(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(DataStructureType::from_tag(11), None);
        assert_eq!(DataStructureType::from_tag(u32::MAX), None);
    }

    #[test]
    fn static_types_have_no_dynamic_content() {
        for ty in [
            DataStructureType::Task,
            DataStructureType::Timer,
            DataStructureType::EventGroup,
            DataStructureType::Semaphore,
            DataStructureType::StaticStack,
        ] {
            let snapshot = vec![0xFFu8; ty.fixed_size()];
            assert_eq!(ty.exploded_size(&snapshot), ty.fixed_size());
        }
    }

    #[test]
    fn queue_exploded_size_adds_item_count_times_item_size() {
        let ty = DataStructureType::Queue;
        let mut snapshot = vec![0u8; ty.fixed_size()];
        snapshot[8..12].copy_from_slice(&4u32.to_ne_bytes());
        snapshot[12..16].copy_from_slice(&16u32.to_ne_bytes());
        assert_eq!(ty.exploded_size(&snapshot), ty.fixed_size() + 4 * 16);
    }

    #[test]
    fn queue_next_expansion_is_a_single_hop_from_the_stored_pointer() {
        let ty = DataStructureType::Queue;
        let mut snapshot = vec![0u8; ty.fixed_size()];
        snapshot[0..8].copy_from_slice(&0x7f0000u64.to_ne_bytes());
        let step = ty.next_expansion(&snapshot, 3);
        assert_eq!(step.address, 0x7f0003);
        assert_eq!(step.read_size, 0);
        assert!(!step.requires_deeper_walk);
    }

    #[test]
    fn list_expansion_requires_a_deeper_walk() {
        let ty = DataStructureType::List;
        let mut snapshot = vec![0u8; ty.fixed_size()];
        snapshot[8..16].copy_from_slice(&0x8000u64.to_ne_bytes());
        let step = ty.next_expansion(&snapshot, 0);
        assert!(step.requires_deeper_walk);
        assert_eq!(step.read_size, 8);
    }

    #[test]
    fn max_fixed_size_matches_the_largest_variant() {
        assert_eq!(MAX_FIXED_SIZE, DataStructureType::StaticStack.fixed_size());
    }
}
