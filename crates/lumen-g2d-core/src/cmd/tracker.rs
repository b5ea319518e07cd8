//! In-flight chain: submitted, not-yet-complete command buffers.
//!
//! A most-recent-first chain of slot indices. Hardware completes in
//! strict submission order, so observing completion of any buffer
//! proves completion of every older one, and a single wait can release
//! the whole tail of the chain.

use lumen_g2d_hal::Accelerator;

use super::pool::CmdArena;

pub(crate) struct InFlight {
    /// Most recently submitted in-flight slot.
    head: Option<u8>,
}

impl InFlight {
    pub const fn new() -> Self {
        Self { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len<const WORDS: usize, const SLOTS: usize>(
        &self,
        arena: &CmdArena<WORDS, SLOTS>,
    ) -> u32 {
        let mut n = 0;
        let mut cur = self.head;
        while let Some(i) = cur {
            n += 1;
            cur = arena.slot(i).older;
        }
        n
    }

    /// Push a freshly submitted slot onto the chain head.
    pub fn push<const WORDS: usize, const SLOTS: usize>(
        &mut self,
        arena: &mut CmdArena<WORDS, SLOTS>,
        idx: u8,
    ) {
        debug_assert!({
            let mut cur = self.head;
            let mut absent = true;
            while let Some(i) = cur {
                absent &= i != idx;
                cur = arena.slot(i).older;
            }
            absent
        });
        arena.link_older(idx, self.head);
        self.head = Some(idx);
    }

    pub fn newest_seq<const WORDS: usize, const SLOTS: usize>(
        &self,
        arena: &CmdArena<WORDS, SLOTS>,
    ) -> Option<u64> {
        self.head.map(|i| arena.slot(i).seq)
    }

    /// Free every in-flight buffer with id <= `completed`, in one pass.
    /// Returns the number of buffers freed.
    pub fn free_completed<const WORDS: usize, const SLOTS: usize>(
        &mut self,
        arena: &mut CmdArena<WORDS, SLOTS>,
        completed: u64,
    ) -> u32 {
        // Find the newest complete slot; everything older is complete too.
        let mut prev: Option<u8> = None;
        let mut cur = self.head;
        while let Some(i) = cur {
            if arena.slot(i).seq <= completed {
                break;
            }
            prev = Some(i);
            cur = arena.slot(i).older;
        }
        let Some(first) = cur else { return 0 };
        // Detach the completed suffix.
        match prev {
            Some(p) => arena.link_older(p, None),
            None => self.head = None,
        }
        // Collect newest-to-oldest, then release oldest first (the
        // arena requires release in completion order).
        let mut run: heapless::Vec<u8, SLOTS> = heapless::Vec::new();
        let mut cur = Some(first);
        while let Some(i) = cur {
            cur = arena.slot(i).older;
            let _ = run.push(i);
        }
        let mut freed = 0;
        for &i in run.iter().rev() {
            arena.release(i);
            freed += 1;
        }
        freed
    }

    /// Block until `seq` completes, then free the completed chain.
    pub fn wait<A, const WORDS: usize, const SLOTS: usize>(
        &mut self,
        dev: &mut A,
        arena: &mut CmdArena<WORDS, SLOTS>,
        seq: u64,
    ) -> u32
    where
        A: Accelerator,
    {
        dev.wait_seq(seq);
        self.free_completed(arena, dev.completed_seq())
    }

    /// Block until the most recent submission completes, draining the
    /// whole chain.
    pub fn wait_newest<A, const WORDS: usize, const SLOTS: usize>(
        &mut self,
        dev: &mut A,
        arena: &mut CmdArena<WORDS, SLOTS>,
    ) -> u32
    where
        A: Accelerator,
    {
        match self.newest_seq(arena) {
            Some(seq) => self.wait(dev, arena, seq),
            None => 0,
        }
    }

    /// Block until the single oldest in-flight buffer completes and
    /// free exactly that one (the allocator's reclaim step).
    pub fn wait_free_oldest<A, const WORDS: usize, const SLOTS: usize>(
        &mut self,
        dev: &mut A,
        arena: &mut CmdArena<WORDS, SLOTS>,
    ) -> bool
    where
        A: Accelerator,
    {
        let Some(head) = self.head else { return false };
        let mut prev: Option<u8> = None;
        let mut cur = head;
        while let Some(next) = arena.slot(cur).older {
            prev = Some(cur);
            cur = next;
        }
        dev.wait_seq(arena.slot(cur).seq);
        match prev {
            Some(p) => arena.link_older(p, None),
            None => self.head = None,
        }
        arena.release(cur);
        true
    }

    /// Wait on the chain head repeatedly until the chain is empty.
    pub fn drain<A, const WORDS: usize, const SLOTS: usize>(
        &mut self,
        dev: &mut A,
        arena: &mut CmdArena<WORDS, SLOTS>,
    ) where
        A: Accelerator,
    {
        while !self.is_empty() {
            self.wait_newest(dev, arena);
        }
    }
}
