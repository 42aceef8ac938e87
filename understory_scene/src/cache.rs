// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-cache records.
//!
//! The scene never rasterizes anything. It keeps, per cached item, the key of
//! the snapshot the renderer stored plus the regions that went stale since.
//! The renderer reads [`ItemCache::exposed`] / [`ItemCache::all_exposed`] to
//! decide how much of the snapshot to redraw, then stores the new key and
//! calls [`ItemCache::mark_painted`].

use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;

/// Identifier of a render device (for example a view) chosen by the renderer.
pub type DeviceId = u32;

/// Per-device snapshot record used by
/// [`CacheMode::DeviceCoordinateCache`](crate::CacheMode::DeviceCoordinateCache).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceCache {
    /// Renderer-owned snapshot key.
    pub key: Option<u64>,
    /// Device-space rect the snapshot covers.
    pub bounds: Rect,
}

/// Paint-cache record of one item.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemCache {
    key: Option<u64>,
    exposed: SmallVec<[Rect; 4]>,
    all_exposed: bool,
    devices: HashMap<DeviceId, DeviceCache>,
}

impl Default for ItemCache {
    fn default() -> Self {
        Self {
            key: None,
            exposed: SmallVec::new(),
            all_exposed: true,
            devices: HashMap::new(),
        }
    }
}

impl ItemCache {
    /// Renderer-owned key of the item-coordinate snapshot, if one is stored.
    pub fn key(&self) -> Option<u64> {
        self.key
    }

    /// Store the key of a freshly rendered snapshot.
    pub fn set_key(&mut self, key: u64) {
        self.key = Some(key);
    }

    /// Item-space regions that changed since the last paint.
    pub fn exposed(&self) -> &[Rect] {
        &self.exposed
    }

    /// Whether the whole snapshot is stale.
    pub fn all_exposed(&self) -> bool {
        self.all_exposed
    }

    /// Forget stale regions after the renderer refreshed the snapshot.
    pub fn mark_painted(&mut self) {
        self.exposed.clear();
        self.all_exposed = false;
    }

    /// Snapshot record for a device.
    pub fn device(&self, device: DeviceId) -> Option<&DeviceCache> {
        self.devices.get(&device)
    }

    /// Snapshot record for a device, created on first use.
    pub fn device_mut(&mut self, device: DeviceId) -> &mut DeviceCache {
        self.devices.entry(device).or_default()
    }

    /// Drop every snapshot and mark everything stale.
    pub(crate) fn purge(&mut self) {
        self.key = None;
        self.devices.clear();
        self.all_exposed = true;
        self.exposed.clear();
    }

    /// Accumulate a stale region; `None` marks everything stale.
    pub(crate) fn expose(&mut self, rect: Option<Rect>) {
        if self.all_exposed {
            return;
        }
        match rect {
            None => {
                self.all_exposed = true;
                self.exposed.clear();
            }
            Some(r) => self.exposed.push(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_updates_accumulate_until_full() {
        let mut cache = ItemCache::default();
        assert!(cache.all_exposed(), "fresh caches start stale");
        cache.set_key(7);
        cache.mark_painted();

        cache.expose(Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
        cache.expose(Some(Rect::new(5.0, 5.0, 8.0, 8.0)));
        assert_eq!(cache.exposed().len(), 2);
        assert!(!cache.all_exposed());

        cache.expose(None);
        assert!(cache.all_exposed());
        assert!(cache.exposed().is_empty());

        // Once everything is stale, partial regions are not recorded.
        cache.expose(Some(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert!(cache.exposed().is_empty());
        assert_eq!(cache.key(), Some(7), "exposure keeps the snapshot");
    }

    #[test]
    fn purge_drops_snapshots() {
        let mut cache = ItemCache::default();
        cache.set_key(3);
        cache.device_mut(1).key = Some(9);
        cache.mark_painted();
        cache.purge();
        assert_eq!(cache.key(), None);
        assert!(cache.device(1).is_none());
        assert!(cache.all_exposed());
    }
}
