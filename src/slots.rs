//! Generational slot arena backing pool entries

use std::fmt;

/// Stable handle to one pooled entry.
///
/// A key stays valid until its entry is evicted. Vacated slots are reused by
/// later registrations with a bumped generation, so a stale key never
/// resolves to the newer occupant. Keys are only meaningful to the pool that
/// issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryKey {
    index: u32,
    generation: u32,
}

impl EntryKey {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the issuing pool.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this key was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    // Vacant slots form a stack of free indices threaded through the slots.
    Vacant { generation: u32, next_free: usize },
}

/// Arena of values addressed by [`EntryKey`].
pub(crate) struct Slots<T> {
    slots: Vec<Slot<T>>,
    /// Head of the free list. Equals `slots.len()` when no slot is vacant.
    next_free: usize,
    len: usize,
}

impl<T> Slots<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_free: 0,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn insert(&mut self, value: T) -> EntryKey {
        let index = self.next_free;
        self.len += 1;

        match self.slots.get_mut(index) {
            Some(slot) => {
                let (generation, next_free) = match *slot {
                    Slot::Vacant {
                        generation,
                        next_free,
                    } => (generation, next_free),
                    Slot::Occupied { .. } => unreachable!("free list points at occupied slot {index}"),
                };
                *slot = Slot::Occupied { generation, value };
                self.next_free = next_free;
                EntryKey::new(to_u32(index), generation)
            }
            None => {
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    value,
                });
                self.next_free = self.slots.len();
                EntryKey::new(to_u32(index), 0)
            }
        }
    }

    pub(crate) fn get(&self, key: EntryKey) -> Option<&T> {
        match self.slots.get(key.index as usize)? {
            Slot::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        match self.slots.get_mut(key.index as usize)? {
            Slot::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub(crate) fn contains(&self, key: EntryKey) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn remove(&mut self, key: EntryKey) -> Option<T> {
        let index = key.index as usize;
        let slot = self.slots.get_mut(index)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == key.generation => {}
            _ => return None,
        }

        let vacant = Slot::Vacant {
            generation: key.generation.wrapping_add(1),
            next_free: self.next_free,
        };
        let Slot::Occupied { value, .. } = std::mem::replace(slot, vacant) else {
            unreachable!("slot {index} was checked to be occupied");
        };

        self.next_free = index;
        self.len -= 1;
        Some(value)
    }

    /// Removes every value, keeping slot generations so outstanding keys stay stale.
    pub(crate) fn take_all(&mut self) -> Vec<(EntryKey, T)> {
        let keys: Vec<EntryKey> = self.keys().collect();
        keys.into_iter()
            .filter_map(|key| self.remove(key).map(|value| (key, value)))
            .collect()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = EntryKey> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (EntryKey, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, value } => {
                    Some((EntryKey::new(to_u32(index), *generation), value))
                }
                Slot::Vacant { .. } => None,
            })
    }
}

fn to_u32(index: usize) -> u32 {
    u32::try_from(index).expect("pool cannot hold more than u32::MAX entries")
}
