//! Slot storage for layout nodes.
//!
//! A [`GenIndex`] remembers the generation of its slot. Removing a value bumps the generation,
//! so a handle kept past removal no longer resolves, even after the slot is reused.

/// A handle into an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenIndex {
    pub index: u32,
    pub generation: u32,
}

enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    vacant: Vec<u32>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena {
            entries: Vec::new(),
            vacant: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> GenIndex {
        match self.vacant.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                let generation = match entry {
                    Entry::Vacant { generation } => *generation,
                    Entry::Occupied { generation, .. } => *generation,
                };
                *entry = Entry::Occupied { generation, value };
                GenIndex { index, generation }
            }
            None => {
                let index = self.entries.len() as u32;
                self.entries.push(Entry::Occupied { generation: 0, value });
                GenIndex { index, generation: 0 }
            }
        }
    }

    pub fn get(&self, id: GenIndex) -> Option<&T> {
        match self.entries.get(id.index as usize)? {
            Entry::Occupied { generation, value } if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: GenIndex) -> Option<&mut T> {
        match self.entries.get_mut(id.index as usize)? {
            Entry::Occupied { generation, value } if *generation == id.generation => Some(value),
            _ => None,
        }
    }

    /// Takes the value out, invalidating every copy of `id`.
    pub fn remove(&mut self, id: GenIndex) -> Option<T> {
        let generation = match self.entries.get(id.index as usize)? {
            Entry::Occupied { generation, .. } if *generation == id.generation => *generation,
            _ => return None,
        };
        let vacant = Entry::Vacant {
            generation: generation.wrapping_add(1),
        };
        self.vacant.push(id.index);
        match std::mem::replace(&mut self.entries[id.index as usize], vacant) {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len() - self.vacant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of all live values, in slot order.
    pub fn handles(&self) -> Vec<GenIndex> {
        self.entries
            .iter()
            .zip(0..)
            .filter_map(|(entry, index)| match entry {
                Entry::Occupied { generation, .. } => Some(GenIndex {
                    index,
                    generation: *generation,
                }),
                Entry::Vacant { .. } => None,
            })
            .collect()
    }
}
