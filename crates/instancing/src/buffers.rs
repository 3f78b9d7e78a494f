use crate::attribute::{Attribute, AttributeDesc, AttributeId};
use crate::InstanceError;
use cubetext_common::VectorMap;
use std::hash::Hash;

/// Location of one instance's values inside an attribute mirror, in floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub length: usize,
}

impl Region {
    fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// How an attribute must reach the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// The mirror was reallocated: re-specify the whole buffer.
    Respecify,
    /// Same size as before: overwrite the contents in place.
    Update,
}

/// Receiver of attribute uploads. Implemented by GPU backends and by tests.
pub trait AttributeSink {
    type Error;

    fn upload(
        &mut self,
        id: AttributeId,
        attribute: &Attribute,
        kind: UploadKind,
    ) -> Result<(), Self::Error>;
}

/// Per-instance attribute storage keyed by `K`.
///
/// Every non-fixed attribute holds one element per live instance, packed densely
/// in insertion order. Views handed to callers are borrowed from the current
/// mirror, so growth can never leave one pointing at a stale array.
#[derive(Debug, Clone)]
pub struct InstanceBuffers<K> {
    attributes: Vec<Attribute>,
    slots: VectorMap<K, Vec<Option<Region>>>,
}

impl<K: Eq + Hash + Clone> InstanceBuffers<K> {
    pub fn new(descs: impl IntoIterator<Item = AttributeDesc>) -> Self {
        Self {
            attributes: descs.into_iter().map(Attribute::new).collect(),
            slots: VectorMap::new(),
        }
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Live keys in storage (draw) order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.slots.keys()
    }

    pub fn attribute_id(&self, name: &str) -> Option<AttributeId> {
        self.attributes
            .iter()
            .position(|a| a.name() == name)
            .map(AttributeId)
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(id.0)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (AttributeId, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (AttributeId(i), a))
    }

    /// Element capacity of one attribute's mirror.
    pub fn capacity(&self, id: AttributeId) -> Option<usize> {
        self.attribute(id).map(Attribute::capacity)
    }

    /// Allocate a slot for `key` and write its initial values.
    ///
    /// Attributes missing from `values` are zero-filled. Returns the slot's
    /// storage position, which is also its instance index in the draw call.
    pub fn allocate(
        &mut self,
        key: K,
        values: &[(AttributeId, &[f32])],
    ) -> Result<usize, InstanceError> {
        if self.slots.contains_key(&key) {
            return Err(InstanceError::DuplicateKey);
        }
        for (id, data) in values {
            self.check_values(*id, data)?;
        }

        let position = self.slots.len();
        let mut regions = Vec::with_capacity(self.attributes.len());
        for (i, attr) in self.attributes.iter_mut().enumerate() {
            if attr.is_fixed() {
                regions.push(None);
                continue;
            }
            let stride = attr.stride();
            let region = Region {
                offset: position * stride,
                length: stride,
            };
            attr.ensure_len(region.offset + region.length);
            let target = &mut attr.data_mut()[region.range()];
            match values.iter().find(|(id, _)| id.0 == i) {
                Some((_, data)) => target.copy_from_slice(data),
                None => target.fill(0.0),
            }
            attr.dirty = true;
            regions.push(Some(region));
        }
        self.slots.insert(key, regions);
        Ok(position)
    }

    /// Where `key` lives inside attribute `id`.
    pub fn region(&self, key: &K, id: AttributeId) -> Option<Region> {
        self.slots.get(key)?.get(id.0).copied().flatten()
    }

    /// Read-only view of one instance's values.
    pub fn view(&self, key: &K, id: AttributeId) -> Option<&[f32]> {
        let region = self.region(key, id)?;
        Some(&self.attributes[id.0].data()[region.range()])
    }

    /// Hand the live view to `visitor`; a `true` return marks the attribute dirty.
    ///
    /// Returns false (and does nothing) when `key` is not live.
    pub fn read<F>(&mut self, key: &K, id: AttributeId, visitor: F) -> bool
    where
        F: FnOnce(&mut [f32]) -> bool,
    {
        let Some(region) = self.region(key, id) else {
            tracing::trace!(attribute = id.0, "read on a missing instance ignored");
            return false;
        };
        let attr = &mut self.attributes[id.0];
        if visitor(&mut attr.data_mut()[region.range()]) {
            attr.dirty = true;
        }
        true
    }

    /// Visit every per-instance attribute of `key`.
    pub fn for_each_attribute<F>(&mut self, key: &K, mut visitor: F) -> bool
    where
        F: FnMut(AttributeId, &'static str, &mut [f32]) -> bool,
    {
        let Some(regions) = self.slots.get(key) else {
            return false;
        };
        for (i, region) in regions.iter().enumerate() {
            let Some(region) = region else { continue };
            let attr = &mut self.attributes[i];
            let name = attr.name();
            if visitor(AttributeId(i), name, &mut attr.data_mut()[region.range()]) {
                attr.dirty = true;
            }
        }
        true
    }

    /// Overwrite some of `key`'s attributes.
    ///
    /// A missing key is a silent no-op reported as `Ok(false)`.
    pub fn write(
        &mut self,
        key: &K,
        values: &[(AttributeId, &[f32])],
    ) -> Result<bool, InstanceError> {
        for (id, data) in values {
            self.check_values(*id, data)?;
        }
        let Some(regions) = self.slots.get(key) else {
            tracing::trace!("write on a missing instance ignored");
            return Ok(false);
        };
        for (id, data) in values {
            if let Some(region) = regions[id.0] {
                let attr = &mut self.attributes[id.0];
                attr.data_mut()[region.range()].copy_from_slice(data);
                attr.dirty = true;
            }
        }
        Ok(true)
    }

    /// Remove `key`, moving the last instance into its slot.
    ///
    /// O(attributes). Returns false when `key` was not live.
    pub fn release(&mut self, key: &K) -> bool {
        let Some(removed) = self.slots.remove(key) else {
            tracing::trace!("release of a missing instance ignored");
            return false;
        };
        for (i, attr) in self.attributes.iter_mut().enumerate() {
            if attr.is_fixed() {
                continue;
            }
            attr.dirty = true;
            let Some((moved_key, from)) = &removed.moved else {
                continue;
            };
            let stride = attr.stride();
            let freed = removed.index * stride;
            let src = from * stride;
            attr.data_mut().copy_within(src..src + stride, freed);
            if let Some(Some(region)) = self
                .slots
                .get_mut(moved_key)
                .and_then(|regions| regions.get_mut(i))
            {
                region.offset = freed;
            }
        }
        true
    }

    /// Drop every slot. Capacity is kept; everything is re-uploaded on the next flush.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.mark_all_dirty();
    }

    pub fn mark_all_dirty(&mut self) {
        for attr in &mut self.attributes {
            attr.dirty = true;
        }
    }

    /// Treat every mirror as already uploaded, e.g. after creating GPU buffers from it.
    pub fn mark_clean(&mut self) {
        for attr in &mut self.attributes {
            attr.dirty = false;
            attr.resized = false;
        }
    }

    /// Upload dirty attributes (or all of them when `force`).
    ///
    /// A resized mirror is re-specified in full; otherwise the whole mirror is
    /// written in place. Returns the number of uploads issued.
    pub fn flush<S: AttributeSink>(
        &mut self,
        sink: &mut S,
        force: bool,
    ) -> Result<usize, S::Error> {
        let mut uploads = 0;
        for (i, attr) in self.attributes.iter_mut().enumerate() {
            if !(attr.dirty || force) {
                continue;
            }
            let kind = if attr.resized {
                UploadKind::Respecify
            } else {
                UploadKind::Update
            };
            sink.upload(AttributeId(i), attr, kind)?;
            attr.dirty = false;
            attr.resized = false;
            uploads += 1;
        }
        Ok(uploads)
    }

    fn check_values(&self, id: AttributeId, data: &[f32]) -> Result<(), InstanceError> {
        let attr = self
            .attributes
            .get(id.0)
            .ok_or_else(|| InstanceError::UnknownAttribute(format!("#{}", id.0)))?;
        if attr.is_fixed() {
            return Err(InstanceError::FixedAttribute(attr.name()));
        }
        if data.len() != attr.stride() {
            return Err(InstanceError::LengthMismatch {
                attribute: attr.name(),
                expected: attr.stride(),
                actual: data.len(),
            });
        }
        Ok(())
    }
}
