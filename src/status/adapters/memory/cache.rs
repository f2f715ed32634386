//! Paged in-process bitmap.

use crate::server::domain::InternalId;
use crate::status::ports::{StatusCache, StatusCacheError, StatusCacheResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const WORDS_PER_PAGE: usize = 64;
const WORD_SHIFT: u32 = 6;
const PAGE_SHIFT: u32 = 12;
const WORD_BIT_MASK: u64 = (1 << WORD_SHIFT) - 1;
const PAGE_BIT_MASK: u64 = (1 << PAGE_SHIFT) - 1;

type Page = Box<[u64; WORDS_PER_PAGE]>;

/// Thread-safe bitmap that allocates fixed-size pages on demand.
///
/// Only pages holding at least one set bit are ever allocated, so sparse
/// identifiers cost one page each and [`StatusCache::online_count`] is
/// proportional to the allocated range.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatusCache {
    pages: Arc<RwLock<BTreeMap<u64, Page>>>,
}

#[derive(Debug, Clone, Copy)]
struct BitPosition {
    page: u64,
    word: usize,
    mask: u64,
}

impl BitPosition {
    fn of(internal_id: InternalId) -> StatusCacheResult<Self> {
        let offset = internal_id.value();
        let word = usize::try_from((offset & PAGE_BIT_MASK) >> WORD_SHIFT)
            .map_err(|_| StatusCacheError::OffsetOutOfRange(internal_id))?;
        Ok(Self {
            page: offset >> PAGE_SHIFT,
            word,
            mask: 1 << (offset & WORD_BIT_MASK),
        })
    }
}

impl InMemoryStatusCache {
    /// Creates an empty bitmap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many pages are currently allocated.
    ///
    /// # Errors
    ///
    /// Returns [`StatusCacheError::Backend`] when the lock is poisoned.
    pub fn allocated_pages(&self) -> StatusCacheResult<usize> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> StatusCacheResult<RwLockReadGuard<'_, BTreeMap<u64, Page>>> {
        self.pages
            .read()
            .map_err(|err| StatusCacheError::backend(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> StatusCacheResult<RwLockWriteGuard<'_, BTreeMap<u64, Page>>> {
        self.pages
            .write()
            .map_err(|err| StatusCacheError::backend(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl StatusCache for InMemoryStatusCache {
    async fn set_online(
        &self,
        internal_id: InternalId,
        online: bool,
    ) -> StatusCacheResult<Option<bool>> {
        let position = BitPosition::of(internal_id)?;
        let mut pages = self.write()?;

        if !online && !pages.contains_key(&position.page) {
            return Ok(Some(false));
        }
        let page = pages
            .entry(position.page)
            .or_insert_with(|| Box::new([0; WORDS_PER_PAGE]));
        let word = page
            .get_mut(position.word)
            .ok_or(StatusCacheError::OffsetOutOfRange(internal_id))?;

        let previous = *word & position.mask != 0;
        if online {
            *word |= position.mask;
        } else {
            *word &= !position.mask;
        }
        Ok(Some(previous))
    }

    async fn is_online(&self, internal_id: InternalId) -> StatusCacheResult<bool> {
        let position = BitPosition::of(internal_id)?;
        let pages = self.read()?;
        Ok(pages
            .get(&position.page)
            .and_then(|page| page.get(position.word))
            .is_some_and(|word| word & position.mask != 0))
    }

    async fn online_count(&self) -> StatusCacheResult<u64> {
        let pages = self.read()?;
        Ok(pages
            .values()
            .flat_map(|page| page.iter())
            .map(|word| u64::from(word.count_ones()))
            .sum())
    }

    async fn clear(&self) -> StatusCacheResult<()> {
        self.write()?.clear();
        Ok(())
    }
}
