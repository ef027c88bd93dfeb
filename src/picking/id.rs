use rustc_hash::FxHashMap;

use crate::scene::primitive::PrimitiveKey;

/// Identifier of a pickable instance inside its primitive.
pub type InstanceId = u32;

/// Object identifier rendered as a color during picking.
///
/// Encoded little-endian into RGBA8; the all-zero color is reserved for
/// "nothing", so ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickId(u32);

impl PickId {
    #[inline]
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn to_rgba(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Decodes a rendered texel. Returns `None` for the cleared color.
    #[inline]
    #[must_use]
    pub fn from_rgba(rgba: [u8; 4]) -> Option<Self> {
        let key = u32::from_le_bytes(rgba);
        (key != 0).then_some(Self(key))
    }
}

/// What a pick resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PickedObject {
    pub primitive: PrimitiveKey,
    /// Instance inside the primitive, when the primitive distinguishes them.
    pub instance: Option<InstanceId>,
}

/// Maps pick ids back to the objects that own them.
#[derive(Debug)]
pub struct PickRegistry {
    objects: FxHashMap<PickId, PickedObject>,
    next: u32,
}

impl Default for PickRegistry {
    fn default() -> Self {
        Self {
            objects: FxHashMap::default(),
            next: 1,
        }
    }
}

impl PickRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, object: PickedObject) -> PickId {
        // Skip ids still alive after a wrap.
        while self.next == 0 || self.objects.contains_key(&PickId(self.next)) {
            self.next = self.next.wrapping_add(1);
        }
        let id = PickId(self.next);
        self.next = self.next.wrapping_add(1);
        self.objects.insert(id, object);
        id
    }

    pub fn release(&mut self, id: PickId) -> Option<PickedObject> {
        self.objects.remove(&id)
    }

    /// Releases every id owned by `primitive`.
    pub fn release_primitive(&mut self, primitive: PrimitiveKey) {
        self.objects.retain(|_, o| o.primitive != primitive);
    }

    #[must_use]
    pub fn get(&self, id: PickId) -> Option<&PickedObject> {
        self.objects.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
