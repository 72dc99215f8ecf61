/*
 * Created on Sun Mar 19 2023
 *
 * This file is a part of Sable
 * Sable is a free and open-source Redis-wire-compatible in-memory data
 * store written by Sayan Nandan ("the Author") with the vision to provide
 * a simple, correct and fast caching primitive without compromising on
 * compatibility with the existing client ecosystem
 *
 * Copyright (c) 2023, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! A sorted set: unique members, each with an IEEE-754 double score, in a
//! total order of `(score, member-bytes)`. `NaN` never enters a sorted set;
//! the command boundary rejects it, which is what lets the ordering below
//! use `total_cmp` without caveats.
//!
//! The representation is a score map plus a rank index kept sorted on every
//! insert. Insertion is O(n); ranges are contiguous slices. A skiplist would
//! beat this beyond a few hundred thousand members per key

use {
    super::Data,
    std::{cmp::Ordering, collections::HashMap},
};

/// One side of a score interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    fn admits_from_below(&self, score: f64) -> bool {
        match *self {
            ScoreBound::Inclusive(min) => score >= min,
            ScoreBound::Exclusive(min) => score > min,
        }
    }
    fn admits_from_above(&self, score: f64) -> bool {
        match *self {
            ScoreBound::Inclusive(max) => score <= max,
            ScoreBound::Exclusive(max) => score < max,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    scores: HashMap<Data, f64>,
    /// Members ordered by `(score, member)`
    index: Vec<Data>,
}

fn order(score_a: f64, member_a: &Data, score_b: f64, member_b: &[u8]) -> Ordering {
    score_a
        .total_cmp(&score_b)
        .then_with(|| member_a.as_ref().cmp(member_b))
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self) -> usize {
        self.index.len()
    }
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }
    /// Insert or update a member. Returns `true` if the member was new.
    /// The stale index slot must go before the score map is updated: the
    /// binary search compares through the map, so the two must agree at
    /// every probe
    pub fn insert(&mut self, member: Data, score: f64) -> bool {
        let was_new = match self.scores.get(&member).copied() {
            Some(old) => {
                if let Ok(at) = self.locate_raw(old, &member) {
                    self.index.remove(at);
                }
                false
            }
            None => true,
        };
        self.scores.insert(member.clone(), score);
        let at = match self.locate_raw(score, &member) {
            Ok(at) | Err(at) => at,
        };
        self.index.insert(at, member);
        was_new
    }
    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.get(member).copied() {
            Some(score) => {
                if let Ok(at) = self.locate_raw(score, member) {
                    self.index.remove(at);
                }
                self.scores.remove(member);
                true
            }
            None => false,
        }
    }
    /// Members with ranks in `[start, stop]` (inclusive, pre-normalized)
    pub fn range_by_rank(&self, start: usize, stop: usize) -> Vec<(Data, f64)> {
        self.index[start..=stop.min(self.index.len() - 1)]
            .iter()
            .map(|m| (m.clone(), self.scores[m]))
            .collect()
    }
    /// Members with scores inside the interval, in order
    pub fn range_by_score(&self, min: ScoreBound, max: ScoreBound) -> Vec<(Data, f64)> {
        self.index
            .iter()
            .map(|m| (m, self.scores[m]))
            .skip_while(|(_, s)| !min.admits_from_below(*s))
            .take_while(|(_, s)| max.admits_from_above(*s))
            .map(|(m, s)| (m.clone(), s))
            .collect()
    }
    /// All `(member, score)` pairs in order (snapshot encoding)
    pub fn iter_ordered(&self) -> impl Iterator<Item = (&Data, f64)> {
        self.index.iter().map(|m| (m, self.scores[m]))
    }
    fn locate_raw(&self, score: f64, member: &[u8]) -> Result<usize, usize> {
        self.index
            .binary_search_by(|probe| order(self.scores[probe], probe, score, member))
    }
}

#[cfg(test)]
mod tests {
    use super::{ScoreBound, SortedSet};
    use crate::corestore::Data;

    fn zs(pairs: &[(&str, f64)]) -> SortedSet {
        let mut set = SortedSet::new();
        for (m, s) in pairs {
            set.insert(Data::copy_from_slice(m.as_bytes()), *s);
        }
        set
    }
    fn members(v: Vec<(Data, f64)>) -> Vec<Vec<u8>> {
        v.into_iter().map(|(m, _)| m.as_ref().to_vec()).collect()
    }

    #[test]
    fn ordering_is_score_then_lex() {
        let set = zs(&[("c", 3.0), ("a", 1.0), ("b", 2.0), ("aa", 1.0)]);
        assert_eq!(
            members(set.range_by_rank(0, 3)),
            vec![b"a".to_vec(), b"aa".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn update_repositions_member() {
        let mut set = zs(&[("a", 1.0), ("b", 2.0)]);
        assert!(!set.insert(Data::copy_from_slice(b"a"), 5.0));
        assert_eq!(
            members(set.range_by_rank(0, 1)),
            vec![b"b".to_vec(), b"a".to_vec()]
        );
        assert_eq!(set.score(b"a"), Some(5.0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut set = zs(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        assert!(set.remove(b"b"));
        assert!(!set.remove(b"b"));
        assert_eq!(
            members(set.range_by_rank(0, 1)),
            vec![b"a".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn score_ranges_with_bounds() {
        let set = zs(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let all = set.range_by_score(
            ScoreBound::Inclusive(f64::NEG_INFINITY),
            ScoreBound::Inclusive(f64::INFINITY),
        );
        assert_eq!(all.len(), 3);
        let mid = set.range_by_score(ScoreBound::Exclusive(1.0), ScoreBound::Inclusive(3.0));
        assert_eq!(members(mid), vec![b"b".to_vec(), b"c".to_vec()]);
        let none = set.range_by_score(ScoreBound::Exclusive(3.0), ScoreBound::Inclusive(10.0));
        assert!(none.is_empty());
    }

    #[test]
    fn infinite_scores_sort_at_the_edges() {
        let set = zs(&[("mid", 0.0), ("hi", f64::INFINITY), ("lo", f64::NEG_INFINITY)]);
        assert_eq!(
            members(set.range_by_rank(0, 2)),
            vec![b"lo".to_vec(), b"mid".to_vec(), b"hi".to_vec()]
        );
    }
}
