use std::collections::BTreeMap;
use std::fmt;

/// Opaque GPU resource id handed out by a graphics context.
///
/// `0` is reserved as the "no resource" sentinel, mirroring the driver
/// convention that a failed allocation or compilation yields a null name.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceId(u32);

impl ResourceId {
    pub const NULL: ResourceId = ResourceId(0);

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Id allocator + storage for one class of resources.
///
/// Ids are handed out in increasing order and are not reused until the
/// counter wraps. After wrapping, ids still held by live slots are skipped, so
/// an insert never overwrites a live resource.
#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    next: u32,
    slots: BTreeMap<u32, T>,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            next: 1,
            slots: BTreeMap::new(),
        }
    }
}

impl<T> ResourceTable<T> {
    pub(crate) fn insert(&mut self, value: T) -> ResourceId {
        let mut id = self.next;
        while self.slots.contains_key(&id) {
            id = id.wrapping_add(1).max(1);
        }
        self.next = id.wrapping_add(1).max(1);
        self.slots.insert(id, value);
        ResourceId(id)
    }

    pub(crate) fn get(&self, id: ResourceId) -> Option<&T> {
        self.slots.get(&id.0)
    }

    pub(crate) fn get_mut(&mut self, id: ResourceId) -> Option<&mut T> {
        self.slots.get_mut(&id.0)
    }

    pub(crate) fn remove(&mut self, id: ResourceId) -> Option<T> {
        self.slots.remove(&id.0)
    }

    pub(crate) fn contains(&self, id: ResourceId) -> bool {
        self.slots.contains_key(&id.0)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
