#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TTFlag {
    Exact,
    LowerBound, // Beta cutoff (fail-high)
    UpperBound, // Alpha cutoff (fail-low)
}

#[derive(Clone, Copy, Debug)]
pub struct TTEntry<M> {
    pub key: u64,
    pub best_move: Option<M>,
    pub score: i32,
    pub depth: u8,
    pub flag: TTFlag,
}

impl<M> TTEntry<M> {
    /// Whether this entry settles a search of `depth` plies in the window
    /// `[alpha, beta]` on its own.
    pub fn cutoff(&self, depth: u8, alpha: i32, beta: i32) -> Option<i32> {
        if self.depth < depth {
            return None;
        }
        match self.flag {
            TTFlag::Exact => Some(self.score),
            TTFlag::LowerBound if self.score >= beta => Some(self.score),
            TTFlag::UpperBound if self.score <= alpha => Some(self.score),
            _ => None,
        }
    }
}

/// Fixed-size table indexed by the low bits of the exact position key. The
/// full key is kept in every entry, so a hit is never a collision.
pub struct TranspositionTable<M> {
    entries: Vec<Option<TTEntry<M>>>,
    mask: usize,
}

impl<M: Copy> TranspositionTable<M> {
    pub fn new(size_mb: usize) -> Self {
        let entry_size = std::mem::size_of::<Option<TTEntry<M>>>().max(1);
        let num_entries = (size_mb * 1024 * 1024) / entry_size;

        // Power of 2 size for efficient masking
        let mut size = 1;
        while size <= num_entries {
            size *= 2;
        }
        size /= 2;

        if size < 1024 {
            size = 1024;
        }

        Self {
            entries: vec![None; size],
            mask: size - 1,
        }
    }

    const fn index(&self, key: u64) -> usize {
        (key as usize) & self.mask
    }

    pub fn probe(&self, key: u64) -> Option<TTEntry<M>> {
        self.entries
            .get(self.index(key))
            .copied()
            .flatten()
            .filter(|e| e.key == key)
    }

    pub fn get_move(&self, key: u64) -> Option<M> {
        self.probe(key).and_then(|e| e.best_move)
    }

    /// Keeps the deeper of two results competing for a slot.
    pub fn store(&mut self, key: u64, best_move: Option<M>, score: i32, depth: u8, flag: TTFlag) {
        let idx = self.index(key);
        let Some(slot) = self.entries.get_mut(idx) else {
            return;
        };
        if slot.as_ref().map_or(true, |e| depth >= e.depth) {
            *slot = Some(TTEntry {
                key,
                best_move,
                score,
                depth,
                flag,
            });
        }
    }

    pub fn clear(&mut self) {
        self.entries.fill(None);
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }
}
