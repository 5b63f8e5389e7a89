use std::collections::VecDeque;

use log::warn;

use crate::schedule::StrideSchedule;
use crate::types::prefix_record::{Meta, RouteEnt};
use crate::types::AddressFamily;

use super::store::{Slot, Store, SubtableId};

//------------ Table walks ---------------------------------------------------

// Both walks visit every stored route exactly once. A subtable is iterated
// in two passes: interior heap slots, where a route is emitted only when its
// prefix length equals the length implied by the slot position (anything
// shorter is an allotted copy of a route that lives higher up), and fringe
// slots, where a child's default route stands in for the route that was
// pushed down when the child was created.
//
// The depth-first walk is iterative: recursing per heap slot would nest
// stride-length times trie-depth deep. Frames are pushed only when entering
// a child subtable; inside one subtable the traversal is the same
// (index, descending) heap walk the allot engine uses.

struct WalkFrame {
    tid: SubtableId,
    idx: usize,
    descending: bool,
}

impl<AF: AddressFamily, M: Meta> Store<AF, M> {
    pub(crate) fn walk_depth_first<F: FnMut(&RouteEnt<AF, M>)>(
        &self,
        schedule: &StrideSchedule,
        root: SubtableId,
        mut f: F,
    ) {
        // the table default route has no parent fringe slot to emit it from
        if let Some(d) = self.subtable(root).default_route() {
            f(self.route(d));
        }

        let mut stack = vec![WalkFrame {
            tid: root,
            idx: 1,
            descending: true,
        }];
        while let Some(frame) = stack.pop() {
            let tid = frame.tid;
            let mut idx = frame.idx;
            let mut descending = frame.descending;
            let level = self.subtable(tid).level;
            let si = schedule.info(level);
            let threshold = self.subtable(tid).threshold();
            loop {
                if descending {
                    match self.subtable(tid).slot(idx) {
                        Slot::Child(c) => {
                            debug_assert!(idx >= threshold);
                            if let Some(d) = self.subtable(c).default_route()
                            {
                                if self.route(d).len() == si.tl {
                                    f(self.route(d));
                                }
                            }
                            // continuation within this subtable, then the
                            // child; precompute the advance step
                            if idx & 1 == 1 {
                                if idx >> 1 > 1 {
                                    stack.push(WalkFrame {
                                        tid,
                                        idx: idx >> 1,
                                        descending: false,
                                    });
                                }
                            } else {
                                stack.push(WalkFrame {
                                    tid,
                                    idx: idx + 1,
                                    descending: true,
                                });
                            }
                            stack.push(WalkFrame {
                                tid: c,
                                idx: 1,
                                descending: true,
                            });
                            break;
                        }
                        Slot::Route(Some(r)) if idx > 1 => {
                            let implied = schedule.implied_len(level, idx);
                            if self.route(r).len() == implied {
                                f(self.route(r));
                            }
                        }
                        Slot::Route(_) => {}
                    }
                }
                // the allot engine's heap advance, without the writes
                if idx < threshold {
                    if descending {
                        idx <<= 1;
                    } else if idx & 1 == 1 {
                        idx >>= 1;
                    } else {
                        idx += 1;
                        descending = true;
                    }
                } else if idx & 1 == 1 {
                    idx >>= 1;
                    descending = false;
                } else {
                    idx += 1;
                }
                if idx == 1 {
                    break;
                }
            }
        }
    }

    pub(crate) fn walk_breadth_first<F: FnMut(&RouteEnt<AF, M>)>(
        &self,
        schedule: &StrideSchedule,
        root: SubtableId,
        mut f: F,
    ) {
        if let Some(d) = self.subtable(root).default_route() {
            f(self.route(d));
        }

        let mut queue = VecDeque::from([root]);
        while let Some(tid) = queue.pop_front() {
            let t = self.subtable(tid);
            let si = schedule.info(t.level);
            let threshold = t.threshold();

            // interior heap slots; child pointers cannot occur here
            for idx in 2..threshold {
                if let Slot::Route(Some(r)) = t.slot(idx) {
                    if self.route(r).len() == schedule.implied_len(t.level, idx)
                    {
                        f(self.route(r));
                    }
                }
            }
            for idx in threshold..threshold << 1 {
                match t.slot(idx) {
                    Slot::Child(c) => {
                        if let Some(d) = self.subtable(c).default_route() {
                            if self.route(d).len() == si.tl {
                                f(self.route(d));
                            }
                        }
                        queue.push_back(c);
                    }
                    Slot::Route(Some(r)) => {
                        if self.route(r).len() == si.tl {
                            f(self.route(r));
                        }
                    }
                    Slot::Route(None) => {}
                }
            }
        }
    }

    //--------- Structural verification --------------------------------------

    /// Recomputes every subtable's counters from its slot contents and
    /// compares them against the stored values. For the path-compressed
    /// trie this also verifies that each owned route extends the node's
    /// cached address. Returns the recomputed number of owned routes in
    /// the whole table (the default route not included), or `None` on the
    /// first inconsistency.
    pub(crate) fn recount(
        &self,
        schedule: &StrideSchedule,
        root: SubtableId,
        check_cached: bool,
    ) -> Option<usize> {
        let mut total = 0;
        let mut queue = VecDeque::from([root]);
        while let Some(tid) = queue.pop_front() {
            let t = self.subtable(tid);
            let si = schedule.info(t.level);
            let threshold = t.threshold();
            let mut n_routes = 0;
            let mut n_subtables = 0;

            for idx in 2..threshold {
                match t.slot(idx) {
                    Slot::Route(Some(r)) => {
                        let implied = schedule.implied_len(t.level, idx);
                        if self.route(r).len() == implied {
                            n_routes += 1;
                            if check_cached
                                && !self.extends_cached(tid, r, si.start_bit())
                            {
                                return None;
                            }
                        }
                    }
                    Slot::Route(None) => {}
                    Slot::Child(_) => {
                        warn!(
                            "{:?}: child pointer on interior slot {}",
                            tid, idx
                        );
                        return None;
                    }
                }
            }
            for idx in threshold..threshold << 1 {
                match t.slot(idx) {
                    Slot::Child(c) => {
                        n_subtables += 1;
                        if t.level == schedule.last_level() {
                            warn!(
                                "{:?}: child pointer on the deepest level",
                                tid
                            );
                            return None;
                        }
                        if let Some(d) = self.subtable(c).default_route() {
                            if self.route(d).len() == si.tl {
                                n_routes += 1;
                            }
                        }
                        queue.push_back(c);
                    }
                    Slot::Route(Some(r)) => {
                        if self.route(r).len() == si.tl {
                            n_routes += 1;
                            if check_cached
                                && !self.extends_cached(tid, r, si.start_bit())
                            {
                                return None;
                            }
                        }
                    }
                    Slot::Route(None) => {}
                }
            }

            if n_routes != t.n_routes || n_subtables != t.n_subtables {
                warn!(
                    "{:?} level {}: stored counters ({}, {}) but \
                    recomputed ({}, {})",
                    tid,
                    t.level,
                    t.n_routes,
                    t.n_subtables,
                    n_routes,
                    n_subtables
                );
                return None;
            }
            total += n_routes as usize;
        }
        Some(total)
    }

    fn extends_cached(
        &self,
        tid: SubtableId,
        rid: super::store::RouteId,
        cached_len: u8,
    ) -> bool {
        let t = self.subtable(tid);
        let net = self.route(rid).pfx().bits();
        if net.truncate_to_len(cached_len) != t.cached {
            warn!(
                "{:?} level {}: route {} outside the cached address {}",
                tid,
                t.level,
                self.route(rid),
                AF::fmt_net(t.cached)
            );
            return false;
        }
        true
    }
}
