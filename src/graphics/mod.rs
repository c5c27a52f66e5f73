//! Terminal graphics
//!
//! The image store holds decoded RGBA images keyed by content hash and the
//! placements that position them on the grid. Storage is deduplicated:
//! transmitting identical bytes twice yields one image. A memory budget
//! bounds retained pixel data; images still referenced by a placement are
//! never evicted.

pub mod kitty;
pub mod sixel;

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Default image memory budget (320 MB), matching common terminal quotas.
pub const DEFAULT_IMAGE_MEMORY: usize = 320 * 1024 * 1024;

/// Decoded image pixels and metadata.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel.
    pub data: Vec<u8>,
    /// SHA-256 of the pixel data, used for deduplication.
    pub sha256: [u8; 32],
    pub created_at: Instant,
    pub accessed_at: Instant,
}

/// A displayed instance of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePlacement {
    pub id: u32,
    pub image_id: u32,
    /// Top-left position in cell coordinates.
    pub row: usize,
    pub col: usize,
    /// Size in cells.
    pub rows: usize,
    pub cols: usize,
    /// Source crop region in pixels.
    pub src_x: u32,
    pub src_y: u32,
    pub src_w: u32,
    pub src_h: u32,
    /// Layering: negative renders behind text.
    pub z_index: i32,
    /// Sub-cell pixel offset.
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Accumulated state of a chunked Kitty transfer (`m=1` commands).
#[derive(Debug, Default)]
struct ChunkAccumulator {
    buf: Vec<u8>,
    image_id: u32,
    more_expected: bool,
    // Transmission metadata from the first chunk; later chunks usually
    // repeat only `m=`.
    format: u32,
    width: u32,
    height: u32,
    compression: u8,
}

/// A completed chunked transfer: payload plus first-chunk metadata.
#[derive(Debug)]
pub struct CompletedChunk {
    pub data: Vec<u8>,
    pub image_id: u32,
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub compression: u8,
}

#[derive(Default)]
struct StoreInner {
    images: HashMap<u32, ImageData>,
    placements: HashMap<u32, ImagePlacement>,
    hash_to_id: HashMap<[u8; 32], u32>,
    next_image_id: u32,
    next_placement_id: u32,
    max_memory: usize,
    used_memory: usize,
    chunk: ChunkAccumulator,
}

/// Storage and lifecycle for terminal images and placements.
///
/// Internally synchronized; methods are safe to call while the terminal's
/// state lock is held.
pub struct ImageStore {
    inner: Mutex<StoreInner>,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                max_memory: DEFAULT_IMAGE_MEMORY,
                ..StoreInner::default()
            }),
        }
    }

    /// Store image data, returning its ID.
    ///
    /// Identical bytes return the existing ID and refresh its access time
    /// without growing memory usage.
    pub fn store(&self, width: u32, height: u32, data: Vec<u8>) -> u32 {
        let mut inner = self.inner.lock();
        let hash: [u8; 32] = Sha256::digest(&data).into();

        if let Some(&existing) = inner.hash_to_id.get(&hash) {
            if let Some(img) = inner.images.get_mut(&existing) {
                img.accessed_at = Instant::now();
                return existing;
            }
        }

        inner.next_image_id += 1;
        let id = inner.next_image_id;
        let now = Instant::now();
        let len = data.len();
        inner.images.insert(
            id,
            ImageData {
                id,
                width,
                height,
                data,
                sha256: hash,
                created_at: now,
                accessed_at: now,
            },
        );
        inner.hash_to_id.insert(hash, id);
        inner.used_memory += len;

        if inner.used_memory > inner.max_memory {
            Self::prune_locked(&mut inner);
        }
        id
    }

    /// Store image data at a caller-chosen ID (Kitty `i=`), replacing any
    /// previous image at that ID.
    pub fn store_with_id(&self, id: u32, width: u32, height: u32, data: Vec<u8>) {
        let mut inner = self.inner.lock();
        let hash: [u8; 32] = Sha256::digest(&data).into();

        if let Some(old) = inner.images.remove(&id) {
            inner.used_memory -= old.data.len();
            inner.hash_to_id.remove(&old.sha256);
        }

        let now = Instant::now();
        let len = data.len();
        inner.images.insert(
            id,
            ImageData {
                id,
                width,
                height,
                data,
                sha256: hash,
                created_at: now,
                accessed_at: now,
            },
        );
        inner.hash_to_id.insert(hash, id);
        inner.used_memory += len;
        if id >= inner.next_image_id {
            inner.next_image_id = id + 1;
        }

        if inner.used_memory > inner.max_memory {
            Self::prune_locked(&mut inner);
        }
    }

    /// Full image data for an ID, refreshing its access time.
    pub fn image(&self, id: u32) -> Option<ImageData> {
        let mut inner = self.inner.lock();
        let img = inner.images.get_mut(&id)?;
        img.accessed_at = Instant::now();
        Some(img.clone())
    }

    /// Pixel dimensions for an ID, refreshing its access time.
    pub fn image_size(&self, id: u32) -> Option<(u32, u32)> {
        let mut inner = self.inner.lock();
        let img = inner.images.get_mut(&id)?;
        img.accessed_at = Instant::now();
        Some((img.width, img.height))
    }

    /// Record a placement, assigning and returning its ID.
    pub fn place(&self, mut placement: ImagePlacement) -> u32 {
        let mut inner = self.inner.lock();
        inner.next_placement_id += 1;
        placement.id = inner.next_placement_id;
        let id = placement.id;
        inner.placements.insert(id, placement);
        id
    }

    pub fn placement(&self, id: u32) -> Option<ImagePlacement> {
        self.inner.lock().placements.get(&id).copied()
    }

    /// All current placements, in unspecified order.
    pub fn placements(&self) -> Vec<ImagePlacement> {
        self.inner.lock().placements.values().copied().collect()
    }

    pub fn remove_placement(&self, id: u32) {
        self.inner.lock().placements.remove(&id);
    }

    /// Drop every placement referencing `image_id`; image data is kept.
    pub fn remove_placements_for_image(&self, image_id: u32) {
        self.inner
            .lock()
            .placements
            .retain(|_, p| p.image_id != image_id);
    }

    /// Drop an image and every placement referencing it.
    pub fn delete_image(&self, id: u32) {
        let mut inner = self.inner.lock();
        if let Some(img) = inner.images.remove(&id) {
            inner.used_memory -= img.data.len();
            inner.hash_to_id.remove(&img.sha256);
        }
        inner.placements.retain(|_, p| p.image_id != id);
    }

    /// Drop all images, placements, and any partial chunked transfer.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.images.clear();
        inner.placements.clear();
        inner.hash_to_id.clear();
        inner.used_memory = 0;
        inner.chunk = ChunkAccumulator::default();
    }

    /// Drop every placement, keeping image data (alternate-screen swap).
    pub fn clear_placements(&self) {
        self.inner.lock().placements.clear();
    }

    /// Drop placements that cover the cell at (row, col).
    pub fn delete_placements_at(&self, row: usize, col: usize) {
        self.inner.lock().placements.retain(|_, p| {
            !(row >= p.row && row < p.row + p.rows && col >= p.col && col < p.col + p.cols)
        });
    }

    /// Drop placements intersecting the given row.
    pub fn delete_placements_in_row(&self, row: usize) {
        self.inner
            .lock()
            .placements
            .retain(|_, p| !(row >= p.row && row < p.row + p.rows));
    }

    /// Drop placements intersecting the given column.
    pub fn delete_placements_in_column(&self, col: usize) {
        self.inner
            .lock()
            .placements
            .retain(|_, p| !(col >= p.col && col < p.col + p.cols));
    }

    /// Drop placements with the given z-index.
    pub fn delete_placements_by_z(&self, z: i32) {
        self.inner.lock().placements.retain(|_, p| p.z_index != z);
    }

    pub fn image_count(&self) -> usize {
        self.inner.lock().images.len()
    }

    pub fn placement_count(&self) -> usize {
        self.inner.lock().placements.len()
    }

    pub fn used_memory(&self) -> usize {
        self.inner.lock().used_memory
    }

    pub fn set_max_memory(&self, bytes: usize) {
        self.inner.lock().max_memory = bytes;
    }

    pub fn max_memory(&self) -> usize {
        self.inner.lock().max_memory
    }

    /// Append a chunk of a `m=1` transfer. Transmission metadata is latched
    /// from the first chunk of the run.
    pub fn push_chunk(
        &self,
        image_id: u32,
        payload: &[u8],
        format: u32,
        width: u32,
        height: u32,
        compression: u8,
    ) {
        let mut inner = self.inner.lock();
        if !inner.chunk.more_expected {
            inner.chunk.image_id = image_id;
            inner.chunk.format = format;
            inner.chunk.width = width;
            inner.chunk.height = height;
            inner.chunk.compression = compression;
        }
        inner.chunk.buf.extend_from_slice(payload);
        inner.chunk.more_expected = true;
    }

    /// Complete a chunked transfer with the final payload, returning the
    /// reassembled data and first-chunk metadata. `None` when no transfer
    /// was in progress.
    pub fn flush_chunk(&self, payload: &[u8]) -> Option<CompletedChunk> {
        let mut inner = self.inner.lock();
        if !inner.chunk.more_expected {
            return None;
        }
        let mut chunk = std::mem::take(&mut inner.chunk);
        chunk.buf.extend_from_slice(payload);
        Some(CompletedChunk {
            data: chunk.buf,
            image_id: chunk.image_id,
            format: chunk.format,
            width: chunk.width,
            height: chunk.height,
            compression: chunk.compression,
        })
    }

    /// True while a chunked transfer is waiting for more data.
    pub fn chunk_in_progress(&self) -> bool {
        self.inner.lock().chunk.more_expected
    }

    /// Evict least-recently-accessed images until under budget. Images
    /// referenced by a placement are never evicted.
    fn prune_locked(inner: &mut StoreInner) {
        let referenced: std::collections::HashSet<u32> =
            inner.placements.values().map(|p| p.image_id).collect();

        let mut candidates: Vec<(u32, Instant, usize)> = inner
            .images
            .values()
            .filter(|img| !referenced.contains(&img.id))
            .map(|img| (img.id, img.accessed_at, img.data.len()))
            .collect();
        candidates.sort_by_key(|&(_, accessed, _)| accessed);

        for (id, _, size) in candidates {
            if inner.used_memory <= inner.max_memory {
                break;
            }
            if let Some(img) = inner.images.remove(&id) {
                inner.hash_to_id.remove(&img.sha256);
                inner.used_memory -= size;
            }
        }
    }
}
