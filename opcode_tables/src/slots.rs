// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opcode slot occupancy and first-fit allocation of specialized instructions.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::error::SlotExhaustionError;
use crate::schema::{DISPATCH_SLOTS, InstructionSet};

/// Occupancy bitmap over the opcode space. Bits are only ever set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsedSlots {
    bits: Vec<u64>,
    len: usize,
}

impl UsedSlots {
    /// An all-free bitmap of `len` slots.
    #[must_use]
    pub fn new_empty(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// A bitmap with every named opcode of `set` marked used.
    #[must_use]
    pub fn seeded(set: &InstructionSet) -> Self {
        let mut used = Self::new_empty(set.boundaries().opcode_space());
        for &code in set.opmap().values() {
            used.mark(usize::from(code));
        }
        used
    }

    /// Number of tracked slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slots are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `idx` is occupied. Out-of-range indices read as free.
    #[must_use]
    pub fn is_used(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        (self.bits[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Marks `idx` occupied. Out-of-range indices are ignored.
    pub fn mark(&mut self, idx: usize) {
        if idx >= self.len {
            return;
        }
        self.bits[idx / 64] |= 1_u64 << (idx % 64);
    }

    /// Free codes in the dispatch range `[0, 256)`, ascending.
    pub fn unused_dispatch_codes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(|&code| !self.is_used(usize::from(code)))
    }
}

/// Codes handed to specialized instructions, in allocation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allocation {
    entries: Vec<(String, u8)>,
    by_name: BTreeMap<String, u8>,
}

impl Allocation {
    /// `(name, code)` pairs in the order they were assigned.
    #[must_use]
    pub fn entries(&self) -> &[(String, u8)] {
        &self.entries
    }

    /// Code assigned to `name`, if it was allocated.
    #[must_use]
    pub fn code_of(&self, name: &str) -> Option<u8> {
        self.by_name.get(name).copied()
    }

    /// Number of allocated instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Assigns each of `names`, in order, the lowest free code at or after the
/// previous assignment.
///
/// Scanning starts at code 1 and stops before 256. Codes in `reserved` are
/// skipped without being marked, so they stay free for the extra-cases list.
pub fn allocate_specialized(
    names: &[String],
    used: &mut UsedSlots,
    reserved: RangeInclusive<u16>,
) -> Result<Allocation, SlotExhaustionError> {
    let mut allocation = Allocation::default();
    let mut next: u16 = 1;

    for name in names {
        while usize::from(next) < DISPATCH_SLOTS
            && (used.is_used(usize::from(next)) || reserved.contains(&next))
        {
            next += 1;
        }
        let Ok(code) = u8::try_from(next) else {
            return Err(SlotExhaustionError {
                name: name.clone(),
                requested: names.len(),
                allocated: allocation.len(),
            });
        };
        used.mark(usize::from(code));
        log::debug!("allocated specialized opcode {name} = {code}");
        allocation.entries.push((name.clone(), code));
        allocation.by_name.insert(name.clone(), code);
    }

    Ok(allocation)
}
