use log::trace;

use inetnum::addr::Prefix;

use crate::schedule::StrideSchedule;
use crate::types::errors::{StrideError, TableError};
use crate::types::prefix_record::{Meta, RouteEnt};
use crate::types::stats::StrideStats;
use crate::types::{AddressFamily, PrefixId};

use super::store::{Slot, Store, SubtableId};
use super::Insert;

//------------ ArtTable ------------------------------------------------------

/// An allotment routing table over a simple multibit trie.
///
/// Trie levels are always contiguous: a route at level `l` is reached
/// through subtables at every level above it, so a lookup needs no address
/// verification on the way down. The price is one subtable per level on
/// every populated path; [`PcArtTable`][super::PcArtTable] trades the
/// verification back in for skipping single-child levels.
pub struct ArtTable<AF: AddressFamily, M: Meta> {
    schedule: StrideSchedule,
    store: Store<AF, M>,
    root: SubtableId,
    n_routes: usize,
}

impl<AF: AddressFamily, M: Meta> ArtTable<AF, M> {
    /// Creates a table with the given stride schedule, which must sum to
    /// the bit width of the address family.
    pub fn new(strides: &[u8]) -> Result<Self, StrideError> {
        let schedule = StrideSchedule::new(strides, AF::BITS)?;
        let mut store = Store::new(schedule.num_levels());
        let root =
            store.alloc_subtable(0, schedule.info(0).sl, None, AF::zero());
        Ok(Self {
            schedule,
            store,
            root,
            n_routes: 0,
        })
    }

    /// Inserts a route. If a route with the same prefix is already in the
    /// table it stays untouched and the new payload is handed back in
    /// [`Insert::Duplicate`].
    pub fn insert(
        &mut self,
        prefix: &Prefix,
        meta: M,
    ) -> Result<Insert<M>, TableError> {
        self.check_family(prefix)?;
        let pfx = PrefixId::from(*prefix);

        // the default route lives in the root's default slot
        if pfx.len() == 0 {
            if self.store.subtable(self.root).default_route().is_some() {
                return Ok(Insert::Duplicate(meta));
            }
            let rid = self.store.alloc_route(RouteEnt::new(pfx, 0, meta));
            self.store.subtable_mut(self.root).set_default(Some(rid));
            self.n_routes += 1;
            return Ok(Insert::Added);
        }

        let (level, index) = self.schedule.base_index(pfx.bits(), pfx.len());
        trace!("insert {} at level {} index {}", prefix, level, index);

        // walk down to the owning level, extending the trie where the path
        // does not reach yet
        let mut tid = self.root;
        for l in 0..level {
            let fi = self.schedule.fringe_index(pfx.bits(), l);
            tid = match self.store.subtable(tid).slot(fi) {
                Slot::Child(c) => c,
                Slot::Route(base) => {
                    let sl = self.schedule.info(l + 1).sl;
                    let child =
                        self.store.alloc_subtable(l + 1, sl, base, AF::zero());
                    let parent = self.store.subtable_mut(tid);
                    parent.set_slot(fi, Slot::Child(child));
                    parent.n_subtables += 1;
                    child
                }
            };
        }

        let rid = self.store.alloc_route(RouteEnt::new(pfx, level, meta));
        if self.store.install(tid, index, rid).is_some() {
            let rejected = self.store.free_route(rid);
            return Ok(Insert::Duplicate(rejected.into_meta()));
        }
        self.n_routes += 1;
        Ok(Insert::Added)
    }

    /// Removes the route with exactly this prefix and hands its payload
    /// back. `None` means no such route was in the table.
    pub fn remove(&mut self, prefix: &Prefix) -> Option<M> {
        if self.check_family(prefix).is_err() {
            return None;
        }
        let pfx = PrefixId::from(*prefix);

        if pfx.len() == 0 {
            let rid = self.store.subtable(self.root).default_route()?;
            self.store.subtable_mut(self.root).set_default(None);
            self.n_routes -= 1;
            return Some(self.store.free_route(rid).into_meta());
        }

        let (level, index) = self.schedule.base_index(pfx.bits(), pfx.len());
        let mut tid = self.root;
        let mut path = Vec::with_capacity(level as usize);
        for l in 0..level {
            let fi = self.schedule.fringe_index(pfx.bits(), l);
            match self.store.subtable(tid).slot(fi) {
                Slot::Child(c) => {
                    path.push((tid, fi));
                    tid = c;
                }
                Slot::Route(_) => return None,
            }
        }
        self.remove_at(tid, index, pfx, &path)
    }

    fn remove_at(
        &mut self,
        tid: SubtableId,
        k: usize,
        pfx: PrefixId<AF>,
        path: &[(SubtableId, usize)],
    ) -> Option<M> {
        let target = self.store.effective_route(tid, k)?;
        if self.store.route(target).pfx() != pfx {
            return None;
        }
        debug_assert_eq!(
            self.store.route(target).level(),
            self.store.subtable(tid).level
        );
        trace!("remove {:?} at {:?} index {}", pfx, tid, k);

        self.n_routes -= 1;
        self.store.subtable_mut(tid).n_routes -= 1;
        // the replacement that covers the vacated subheap; the subtable
        // default at slot 1 is never allotted into the heap, so the parent
        // of a level-topmost index replaces with nothing
        let replacement = if k >> 1 > 1 {
            self.store.subtable(tid).route_at(k >> 1)
        } else {
            None
        };

        // collapse now-empty subtables bottom-up; restoring a freed
        // subtable's default into the parent slot undoes the push-down
        // that created it
        let mut t = tid;
        let mut freed_any = false;
        for &(parent, fi) in path.iter().rev() {
            if self.store.subtable(t).count() > 0 {
                break;
            }
            let default = self.store.free_subtable(t);
            let p = self.store.subtable_mut(parent);
            p.set_slot(fi, Slot::Route(default));
            p.n_subtables -= 1;
            freed_any = true;
            t = parent;
        }

        // when subtables were freed, the restored defaults already replaced
        // the route on the surviving path
        if !freed_any {
            self.store.place(tid, k, Some(target), replacement);
        }
        Some(self.store.free_route(target).into_meta())
    }

    /// Longest-prefix match: one indexed read per level, no backtracking.
    /// Falls back to the default route, if any.
    pub fn match_longest(
        &self,
        addr: AF::InnerIpAddr,
    ) -> Option<&RouteEnt<AF, M>> {
        let net = AF::from_ipaddr(addr);
        let mut tid = self.root;
        let mut candidate = None;
        for l in 0..self.schedule.num_levels() {
            let fi = self.schedule.fringe_index(net, l);
            match self.store.subtable(tid).slot(fi) {
                Slot::Route(None) => break,
                Slot::Route(Some(r)) => return Some(self.store.route(r)),
                Slot::Child(c) => {
                    debug_assert!(l < self.schedule.last_level());
                    if let Some(d) = self.store.subtable(c).default_route() {
                        candidate = Some(d);
                    }
                    tid = c;
                }
            }
        }
        candidate
            .or_else(|| self.store.subtable(self.root).default_route())
            .map(|r| self.store.route(r))
    }

    /// Exact match on (address, prefix length).
    ///
    /// Note that a miss returns the table default route when one is
    /// present, not `None`. Callers that need absence semantics compare
    /// the returned prefix against the query.
    pub fn match_exact(&self, prefix: &Prefix) -> Option<&RouteEnt<AF, M>> {
        if self.check_family(prefix).is_err() {
            return None;
        }
        let pfx = PrefixId::from(*prefix);
        if pfx.len() == 0 {
            return self.root_default();
        }

        let ml = self.schedule.level_of(pfx.len());
        let mut tid = self.root;
        for l in 0..=ml {
            let index = self.schedule.fringe_index(pfx.bits(), l);
            match self.store.subtable(tid).slot(index) {
                Slot::Route(None) => return self.root_default(),
                Slot::Route(Some(r)) => {
                    return self
                        .store
                        .exact_in_heap(tid, index, Some(r), pfx)
                        .map(|r| self.store.route(r))
                        .or_else(|| self.root_default());
                }
                Slot::Child(c) => {
                    let child_default =
                        self.store.subtable(c).default_route();
                    if l == ml {
                        return self
                            .store
                            .exact_in_heap(tid, index, child_default, pfx)
                            .map(|r| self.store.route(r))
                            .or_else(|| self.root_default());
                    }
                    // a matching route this deep can also sit on the
                    // next subtable's default slot
                    if let Some(d) = child_default {
                        if self.store.route(d).len() == pfx.len() {
                            return self
                                .store
                                .exact_in_heap(tid, index, Some(d), pfx)
                                .map(|r| self.store.route(r))
                                .or_else(|| self.root_default());
                        }
                    }
                    tid = c;
                }
            }
        }
        self.root_default()
    }

    /// Removes every route; the empty table stays usable.
    pub fn flush(&mut self) {
        let mut prefixes = Vec::with_capacity(self.n_routes);
        self.walk_depth_first(|ent| prefixes.push(ent.prefix()));
        for prefix in prefixes {
            self.remove(&prefix);
        }
        debug_assert_eq!(self.n_routes, 0);
    }

    /// Visits every stored route exactly once, depth first.
    pub fn walk_depth_first<F: FnMut(&RouteEnt<AF, M>)>(&self, f: F) {
        self.store.walk_depth_first(&self.schedule, self.root, f);
    }

    /// Visits every stored route exactly once, breadth first.
    pub fn walk_breadth_first<F: FnMut(&RouteEnt<AF, M>)>(&self, f: F) {
        self.store.walk_breadth_first(&self.schedule, self.root, f);
    }

    /// The number of routes in the table.
    pub fn route_count(&self) -> usize {
        self.n_routes
    }

    pub fn is_empty(&self) -> bool {
        self.n_routes == 0
    }

    /// The number of subtables currently backing the table.
    pub fn subtable_count(&self) -> u32 {
        self.store.stats.live_subtables()
    }

    pub fn stats(&self) -> &StrideStats {
        &self.store.stats
    }

    /// Recomputes all structural counters from the slot arrays and checks
    /// them against the stored values, and the table-wide route count
    /// against both.
    pub fn consistency_check(&self) -> bool {
        let default = self
            .store
            .subtable(self.root)
            .default_route()
            .map_or(0, |_| 1);
        match self.store.recount(&self.schedule, self.root, false) {
            Some(owned) => owned + default == self.n_routes,
            None => false,
        }
    }

    fn root_default(&self) -> Option<&RouteEnt<AF, M>> {
        self.store
            .subtable(self.root)
            .default_route()
            .map(|r| self.store.route(r))
    }

    fn check_family(&self, prefix: &Prefix) -> Result<(), TableError> {
        if prefix.addr().is_ipv4() == (AF::BITS == 32) {
            Ok(())
        } else {
            Err(TableError::FamilyMismatch)
        }
    }
}
