use log::debug;

use crate::types::prefix_record::{Meta, RouteEnt};
use crate::types::stats::StrideStats;
use crate::types::AddressFamily;

//------------ Ids -----------------------------------------------------------

// Routes and subtables live in per-table arenas and refer to each other by
// id. Id equality is what the allot engine compares, it plays the role the
// raw pointer value plays in pointer-based renditions of the algorithm.

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) struct RouteId(u32);

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) struct SubtableId(u32);

//------------ Slot ----------------------------------------------------------

/// One slot of a subtable.
///
/// Pointer-based ART renditions discriminate route from child pointer in
/// the low bit of the pointer value; a sum type carries the same
/// information without the tagging. Non-fringe slots only ever hold the
/// `Route` variant, fringe slots hold either, and a `Route(None)` slot is
/// empty.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Slot {
    Route(Option<RouteId>),
    Child(SubtableId),
}

impl Slot {
    pub(crate) const EMPTY: Self = Slot::Route(None);
}

//------------ Subtable ------------------------------------------------------

/// One trie node: a level-tagged heap of `2 * 2^s` slots.
///
/// Slot 0 is unused (the heap is 1-based), slot 1 holds the subtable default
/// route, interior heap nodes run up to `2^s` and the fringe from there to
/// the end. The level and the two counters are ordinary header fields, not
/// magic slots of the array.
#[derive(Debug)]
pub(crate) struct Subtable<AF: AddressFamily> {
    pub(crate) level: u8,
    /// Routes whose base index lies in this subtable. A route whose fringe
    /// slot is occupied by a child lives in the child's default slot but
    /// still counts here.
    pub(crate) n_routes: u32,
    /// Fringe slots occupied by child subtables.
    pub(crate) n_subtables: u32,
    /// The address bits shared by everything below this node, valid up to
    /// the previous level's cumulative stride length. Only the
    /// path-compressed trie maintains this; the simple trie leaves it zero.
    pub(crate) cached: AF,
    slots: Box<[Slot]>,
}

impl<AF: AddressFamily> Subtable<AF> {
    fn new(level: u8, sl: u8, base: Option<RouteId>, cached: AF) -> Self {
        let mut slots = vec![Slot::EMPTY; 2usize << sl].into_boxed_slice();
        slots[1] = Slot::Route(base);
        Self {
            level,
            n_routes: 0,
            n_subtables: 0,
            cached,
            slots,
        }
    }

    /// The first fringe index, `2^s`.
    pub(crate) fn threshold(&self) -> usize {
        self.slots.len() >> 1
    }

    pub(crate) fn slot(&self, index: usize) -> Slot {
        self.slots[index]
    }

    pub(crate) fn set_slot(&mut self, index: usize, slot: Slot) {
        self.slots[index] = slot;
    }

    /// The route stored at a slot that cannot hold a child: slot 1 and the
    /// interior heap nodes.
    pub(crate) fn route_at(&self, index: usize) -> Option<RouteId> {
        match self.slots[index] {
            Slot::Route(r) => r,
            Slot::Child(_) => {
                debug_assert!(false, "child pointer on a non-fringe slot");
                None
            }
        }
    }

    pub(crate) fn default_route(&self) -> Option<RouteId> {
        self.route_at(1)
    }

    pub(crate) fn set_default(&mut self, route: Option<RouteId>) {
        self.slots[1] = Slot::Route(route);
    }

    /// The combined reference count the simple trie collapses on.
    pub(crate) fn count(&self) -> u32 {
        self.n_routes + self.n_subtables
    }

    /// The fringe slot holding this subtable's only child.
    pub(crate) fn find_child(&self) -> Option<(usize, SubtableId)> {
        for i in self.threshold()..self.slots.len() {
            if let Slot::Child(id) = self.slots[i] {
                return Some((i, id));
            }
        }
        None
    }
}

//------------ Store ---------------------------------------------------------

/// Arena storage for one table: all its subtables and all its route
/// entries, plus the per-level turnover stats.
pub(crate) struct Store<AF: AddressFamily, M: Meta> {
    subtables: Vec<Option<Subtable<AF>>>,
    free_subtables: Vec<u32>,
    routes: Vec<Option<RouteEnt<AF, M>>>,
    free_routes: Vec<u32>,
    pub(crate) stats: StrideStats,
}

impl<AF: AddressFamily, M: Meta> Store<AF, M> {
    pub(crate) fn new(num_levels: u8) -> Self {
        Self {
            subtables: vec![],
            free_subtables: vec![],
            routes: vec![],
            free_routes: vec![],
            stats: StrideStats::new(num_levels),
        }
    }

    pub(crate) fn alloc_subtable(
        &mut self,
        level: u8,
        sl: u8,
        base: Option<RouteId>,
        cached: AF,
    ) -> SubtableId {
        let subtable = Subtable::new(level, sl, base, cached);
        self.stats.inc_created(level);
        let id = match self.free_subtables.pop() {
            Some(slot) => {
                self.subtables[slot as usize] = Some(subtable);
                SubtableId(slot)
            }
            None => {
                self.subtables.push(Some(subtable));
                SubtableId(self.subtables.len() as u32 - 1)
            }
        };
        debug!("allocated subtable {:?} at level {}", id, level);
        id
    }

    /// Frees a subtable and hands back its default route, which the caller
    /// restores into the parent slot.
    pub(crate) fn free_subtable(&mut self, id: SubtableId) -> Option<RouteId> {
        let subtable = self.subtables[id.0 as usize]
            .take()
            .expect("freeing a dangling subtable id");
        self.free_subtables.push(id.0);
        self.stats.inc_freed(subtable.level);
        debug!(
            "freed subtable {:?} at level {}",
            id, subtable.level
        );
        subtable.default_route()
    }

    pub(crate) fn subtable(&self, id: SubtableId) -> &Subtable<AF> {
        self.subtables[id.0 as usize]
            .as_ref()
            .expect("dangling subtable id")
    }

    pub(crate) fn subtable_mut(
        &mut self,
        id: SubtableId,
    ) -> &mut Subtable<AF> {
        self.subtables[id.0 as usize]
            .as_mut()
            .expect("dangling subtable id")
    }

    pub(crate) fn alloc_route(&mut self, ent: RouteEnt<AF, M>) -> RouteId {
        match self.free_routes.pop() {
            Some(slot) => {
                self.routes[slot as usize] = Some(ent);
                RouteId(slot)
            }
            None => {
                self.routes.push(Some(ent));
                RouteId(self.routes.len() as u32 - 1)
            }
        }
    }

    pub(crate) fn free_route(&mut self, id: RouteId) -> RouteEnt<AF, M> {
        let ent = self.routes[id.0 as usize]
            .take()
            .expect("freeing a dangling route id");
        self.free_routes.push(id.0);
        ent
    }

    pub(crate) fn route(&self, id: RouteId) -> &RouteEnt<AF, M> {
        self.routes[id.0 as usize]
            .as_ref()
            .expect("dangling route id")
    }

    /// The route a slot resolves to: for a fringe slot occupied by a child
    /// this is the child's default route, the route that was pushed down
    /// when the child was created.
    pub(crate) fn effective_route(
        &self,
        tid: SubtableId,
        index: usize,
    ) -> Option<RouteId> {
        match self.subtable(tid).slot(index) {
            Slot::Route(r) => r,
            Slot::Child(c) => self.subtable(c).default_route(),
        }
    }
}
