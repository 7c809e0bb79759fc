use std::cmp::Ordering;

// Classic flying phase worst case: 3 pieces x 21 targets x 9 removal choices.
pub const MAX_MOVES: usize = 640;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoredMove<M> {
    pub mv: M,
    pub score: i32,
}

pub struct MoveList<M> {
    entries: [ScoredMove<M>; MAX_MOVES],
    count: usize,
}

impl<M: Copy + Default> Default for MoveList<M> {
    fn default() -> Self {
        Self {
            entries: [ScoredMove::default(); MAX_MOVES],
            count: 0,
        }
    }
}

impl<M: Copy + Default + PartialEq> MoveList<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mv: M) {
        if let Some(slot) = self.entries.get_mut(self.count) {
            *slot = ScoredMove { mv, score: 0 };
            self.count += 1;
        } else {
            // In debug builds, we want to know if we are overflowing limits.
            debug_assert!(false, "MoveList overflow! Max moves: {MAX_MOVES}");
        }
    }

    pub const fn len(&self) -> usize {
        self.count
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn slice(&self) -> &[ScoredMove<M>] {
        self.entries.get(..self.count).unwrap_or(&[])
    }

    fn slice_mut(&mut self) -> &mut [ScoredMove<M>] {
        self.entries.get_mut(..self.count).unwrap_or(&mut [])
    }

    pub fn iter(&self) -> impl Iterator<Item = M> + '_ {
        self.slice().iter().map(|e| e.mv)
    }

    /// Assigns every move its ordering score.
    pub fn score_with<F>(&mut self, mut score: F)
    where
        F: FnMut(M) -> i32,
    {
        for entry in self.slice_mut() {
            entry.score = score(entry.mv);
        }
    }

    /// Stable sort on the ordering scores.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(i32, i32) -> Ordering,
    {
        self.slice_mut().sort_by(|a, b| compare(a.score, b.score));
    }

    /// Moves `mv` to index 0, keeping the relative order of the rest.
    pub fn move_to_front(&mut self, mv: M) {
        if let Some(pos) = self.slice().iter().position(|e| e.mv == mv) {
            self.slice_mut()[..=pos].rotate_right(1);
        }
    }

    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&M) -> bool,
    {
        let mut kept = 0;
        for i in 0..self.count {
            let entry = self.entries[i];
            if f(&entry.mv) {
                self.entries[kept] = entry;
                kept += 1;
            }
        }
        self.count = kept;
    }

    pub fn to_vec(&self) -> Vec<M> {
        self.iter().collect()
    }
}

impl<M: Copy> IntoIterator for MoveList<M> {
    type Item = M;
    type IntoIter = std::iter::Map<
        std::iter::Take<std::array::IntoIter<ScoredMove<M>, MAX_MOVES>>,
        fn(ScoredMove<M>) -> M,
    >;

    fn into_iter(self) -> Self::IntoIter {
        let project: fn(ScoredMove<M>) -> M = |e| e.mv;
        self.entries.into_iter().take(self.count).map(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable_and_front_moves_keep_order() {
        let mut list: MoveList<u8> = MoveList::new();
        for m in [5, 1, 7, 3] {
            list.push(m);
        }
        list.score_with(|m| if m == 7 || m == 1 { 10 } else { 0 });
        list.sort_by(|a, b| b.cmp(&a));
        assert_eq!(list.to_vec(), vec![1, 7, 5, 3]);

        list.move_to_front(3);
        assert_eq!(list.to_vec(), vec![3, 1, 7, 5]);
    }

    #[test]
    fn test_retain_preserves_order() {
        let mut list: MoveList<u8> = MoveList::new();
        for m in 0..10 {
            list.push(m);
        }
        list.retain(|m| m % 3 == 0);
        assert_eq!(list.to_vec(), vec![0, 3, 6, 9]);
        assert_eq!(list.into_iter().collect::<Vec<_>>(), vec![0, 3, 6, 9]);
    }
}
