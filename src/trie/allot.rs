use log::trace;

use crate::types::prefix_record::Meta;
use crate::types::{AddressFamily, PrefixId};

use super::store::{RouteId, Slot, Store, SubtableId};

//------------ Allot engine --------------------------------------------------

// The defining operation of the table: starting at a base index, push a
// route pointer into every descendant slot still referencing the previously
// covering route. A subtree whose top slot holds something else is shadowed
// by a more specific route and is skipped whole.
//
// The traversal is an iterative left-then-right heap walk (Knuth's
// two-recursion formulation, unrolled), driven by an (index, descending)
// pair and no auxiliary storage. Interior slots on the walked spine are written
// on the way back up; fringe slots are written in place, and a fringe slot
// occupied by a child subtable takes the replacement on the child's default
// slot instead.

impl<AF: AddressFamily, M: Meta> Store<AF, M> {
    pub(crate) fn allot(
        &mut self,
        tid: SubtableId,
        k: usize,
        old: Option<RouteId>,
        new: Option<RouteId>,
    ) {
        let threshold = self.subtable(tid).threshold();
        debug_assert!(k >= 1 && k < threshold);
        trace!("allot {:?}: {} {:?} -> {:?}", tid, k, old, new);

        let mut j = k;
        let mut descending = true;
        loop {
            if descending {
                if j < threshold {
                    // interior slot: descend while it still holds `old`
                    if j == k || self.subtable(tid).route_at(j) == old {
                        j <<= 1;
                        continue;
                    }
                } else {
                    match self.subtable(tid).slot(j) {
                        Slot::Child(c) => {
                            let child = self.subtable_mut(c);
                            if child.default_route() == old {
                                child.set_default(new);
                            }
                        }
                        Slot::Route(r) if r == old => {
                            self.subtable_mut(tid)
                                .set_slot(j, Slot::Route(new));
                        }
                        Slot::Route(_) => {}
                    }
                }
            }
            // advance: right sibling first, else up with the spine write
            if j & 1 == 0 {
                j += 1;
                descending = true;
            } else {
                j >>= 1;
                self.subtable_mut(tid).set_slot(j, Slot::Route(new));
                if j == k {
                    break;
                }
                descending = false;
            }
        }
    }

    /// Writes a route change at a base index: allot below the fringe,
    /// direct slot (or child default) store on the fringe.
    pub(crate) fn place(
        &mut self,
        tid: SubtableId,
        k: usize,
        old: Option<RouteId>,
        new: Option<RouteId>,
    ) {
        let threshold = self.subtable(tid).threshold();
        if k < threshold {
            self.allot(tid, k, old, new);
        } else {
            match self.subtable(tid).slot(k) {
                Slot::Child(c) => self.subtable_mut(c).set_default(new),
                Slot::Route(_) => {
                    self.subtable_mut(tid).set_slot(k, Slot::Route(new))
                }
            }
        }
    }

    /// Installs an already-allocated route at its base index in the owning
    /// subtable. Returns the occupying route instead if one with the same
    /// prefix is present; the caller gives the new entry back.
    pub(crate) fn install(
        &mut self,
        tid: SubtableId,
        k: usize,
        rid: RouteId,
    ) -> Option<RouteId> {
        let occupying = self.effective_route(tid, k);
        if let Some(e) = occupying {
            if self.route(e).pfx() == self.route(rid).pfx() {
                return Some(e);
            }
        }
        self.subtable_mut(tid).n_routes += 1;
        self.place(tid, k, occupying, Some(rid));
        None
    }

    /// The exact-match heap climb: starting from a candidate route at
    /// `index`, keep halving the index within the subtable until the
    /// prefix matches or an empty slot ends the search.
    pub(crate) fn exact_in_heap(
        &self,
        tid: SubtableId,
        mut index: usize,
        mut ent: Option<RouteId>,
        pfx: PrefixId<AF>,
    ) -> Option<RouteId> {
        loop {
            let r = ent?;
            if self.route(r).pfx() == pfx {
                return Some(r);
            }
            index >>= 1;
            if index == 0 {
                return None;
            }
            ent = self.subtable(tid).route_at(index);
        }
    }
}
