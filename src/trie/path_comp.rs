use log::trace;

use inetnum::addr::Prefix;

use crate::schedule::StrideSchedule;
use crate::types::errors::{StrideError, TableError};
use crate::types::prefix_record::{Meta, RouteEnt};
use crate::types::stats::StrideStats;
use crate::types::{AddressFamily, PrefixId};

use super::store::{RouteId, Slot, Store, SubtableId};
use super::Insert;

//------------ PcArtTable ----------------------------------------------------

/// An allotment routing table over a path-compressed trie.
///
/// Levels that would contain nothing but a single child are skipped: a
/// child subtable can sit any number of levels below its parent, and each
/// subtable caches the address bits shared by everything below it. The
/// cache is what descents compare against to detect that a new route
/// diverges from the compressed path, which splits the node, and what
/// lookups verify before trusting a slot, since a skipped level means the
/// strides in between were never checked.
pub struct PcArtTable<AF: AddressFamily, M: Meta> {
    schedule: StrideSchedule,
    store: Store<AF, M>,
    root: SubtableId,
    n_routes: usize,
}

impl<AF: AddressFamily, M: Meta> PcArtTable<AF, M> {
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

        if pfx.len() == 0 {
            if self.store.subtable(self.root).default_route().is_some() {
                return Ok(Insert::Duplicate(meta));
            }
            let rid = self.store.alloc_route(RouteEnt::new(pfx, 0, meta));
            self.store.subtable_mut(self.root).set_default(Some(rid));
            self.n_routes += 1;
            return Ok(Insert::Added);
        }

        let level = self.schedule.level_of(pfx.len());
        let (_, index) = self.schedule.base_index(pfx.bits(), pfx.len());
        trace!("insert {} at level {} index {}", prefix, level, index);

        let mut tid = self.root;
        let mut l = 0;
        loop {
            let fi = self.schedule.fringe_index(pfx.bits(), l);
            let slot = self.store.subtable(tid).slot(fi);
            match slot {
                Slot::Child(c) if level > 0 => {
                    let cl = self.store.subtable(c).level;
                    let cached = self.store.subtable(c).cached;
                    debug_assert!(cl > l);
                    // compare over the overlap of the child's compressed
                    // path and the incoming prefix
                    let overlap =
                        self.schedule.info(cl.min(level) - 1).tl;
                    if pfx.bits().truncate_to_len(overlap)
                        == cached.truncate_to_len(overlap)
                    {
                        if level > cl {
                            tid = c;
                            l = cl;
                            continue;
                        }
                        if level == cl {
                            return Ok(self.install(c, index, pfx, meta));
                        }
                        // the route's level lies on the compressed path:
                        // interpose a node for it above the child
                        return Ok(self.insert_new_subtable(
                            tid, fi, level, index, pfx, meta,
                        ));
                    }
                    // diverged: split at the level of the first
                    // differing bit
                    let nl = self.schedule.first_diff_level(
                        pfx.bits().truncate_to_len(overlap),
                        cached.truncate_to_len(overlap),
                    );
                    debug_assert!(nl < cl);
                    return Ok(self.insert_new_subtable(
                        tid, fi, nl, index, pfx, meta,
                    ));
                }
                _ => {
                    if level == l {
                        return Ok(self.install(tid, index, pfx, meta));
                    }
                    debug_assert!(level > l);
                    return Ok(self.insert_new_subtable(
                        tid, fi, level, index, pfx, meta,
                    ));
                }
            }
        }
    }

    fn install(
        &mut self,
        tid: SubtableId,
        index: usize,
        pfx: PrefixId<AF>,
        meta: M,
    ) -> Insert<M> {
        let level = self.store.subtable(tid).level;
        let rid =
            self.store.alloc_route(RouteEnt::new(pfx, level, meta));
        if self.store.install(tid, index, rid).is_some() {
            let rejected = self.store.free_route(rid);
            return Insert::Duplicate(rejected.into_meta());
        }
        self.n_routes += 1;
        Insert::Added
    }

    /// Puts one or two new subtables under the parent's fringe slot and
    /// installs the route in the one at its own level.
    ///
    /// When the slot holds a route the new node simply extends the trie,
    /// with that route pushed down as the node's default. When it holds a
    /// child, the new node is interposed *above* it: the node takes over
    /// the child's inherited default, the child is rehung below it by its
    /// own cached address, and when the route's level lies deeper than the
    /// interposition point a second node is created for the route itself.
    fn insert_new_subtable(
        &mut self,
        parent: SubtableId,
        fi: usize,
        nl: u8,
        index: usize,
        pfx: PrefixId<AF>,
        meta: M,
    ) -> Insert<M> {
        let level = self.schedule.level_of(pfx.len());
        let net = pfx.bits();
        let target = match self.store.subtable(parent).slot(fi) {
            Slot::Child(old) => {
                let top = self.store.alloc_subtable(
                    nl,
                    self.schedule.info(nl).sl,
                    None,
                    net.truncate_to_len(self.schedule.info(nl).start_bit()),
                );
                let target = if level == nl {
                    top
                } else {
                    debug_assert!(nl < level);
                    let target = self.store.alloc_subtable(
                        level,
                        self.schedule.info(level).sl,
                        None,
                        net.truncate_to_len(
                            self.schedule.info(level).start_bit(),
                        ),
                    );
                    let i = self.schedule.fringe_index(net, nl);
                    let t = self.store.subtable_mut(top);
                    t.set_slot(i, Slot::Child(target));
                    t.n_subtables += 1;
                    target
                };
                // rehang the old child below the new node; the inherited
                // default moves up to the new top of the compressed path
                let old_cached = self.store.subtable(old).cached;
                let i = self.schedule.fringe_index(old_cached, nl);
                let inherited = self.store.subtable(old).default_route();
                self.store.subtable_mut(old).set_default(None);
                let t = self.store.subtable_mut(top);
                t.set_default(inherited);
                t.set_slot(i, Slot::Child(old));
                t.n_subtables += 1;
                self.store
                    .subtable_mut(parent)
                    .set_slot(fi, Slot::Child(top));
                target
            }
            Slot::Route(base) => {
                debug_assert_eq!(nl, level);
                let target = self.store.alloc_subtable(
                    level,
                    self.schedule.info(level).sl,
                    base,
                    net.truncate_to_len(
                        self.schedule.info(level).start_bit(),
                    ),
                );
                let p = self.store.subtable_mut(parent);
                p.set_slot(fi, Slot::Child(target));
                p.n_subtables += 1;
                target
            }
        };
        self.install(target, index, pfx, meta)
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

        let ml = self.schedule.level_of(pfx.len());
        let mut tid = self.root;
        let mut path = Vec::with_capacity(self.schedule.num_levels() as usize);
        // the default of a child hanging off the owning level's fringe
        // slot, when that is where the target lives
        let mut def_target = None;
        loop {
            let l = self.store.subtable(tid).level;
            if l > ml {
                // path compression skipped the target's level
                return None;
            }
            let fi = self.schedule.fringe_index(pfx.bits(), l);
            path.push((tid, fi));
            match self.store.subtable(tid).slot(fi) {
                Slot::Child(c) => {
                    if l == ml {
                        let d = self.store.subtable(c).default_route()?;
                        if self.store.route(d).len() == pfx.len() {
                            def_target = Some(d);
                        }
                        break;
                    }
                    tid = c;
                }
                Slot::Route(_) => {
                    if l < ml {
                        return None;
                    }
                    break;
                }
            }
        }
        self.remove_at(pfx, def_target, &path)
    }

    fn remove_at(
        &mut self,
        pfx: PrefixId<AF>,
        def_target: Option<RouteId>,
        path: &[(SubtableId, usize)],
    ) -> Option<M> {
        let (tid, _) = *path.last()?;
        let (_, k) = self.schedule.base_index(pfx.bits(), pfx.len());
        let target = def_target.or_else(|| {
            match self.store.subtable(tid).slot(k) {
                Slot::Route(r) => r,
                Slot::Child(_) => None,
            }
        })?;
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
        let replacement = if k >> 1 > 1 {
            self.store.subtable(tid).route_at(k >> 1)
        } else {
            None
        };

        // Collapse upwards. A node keeping any routes, or more than one
        // child, stays. A node left with exactly one child is compressed
        // away by rehanging that child on the parent slot; a node left
        // with nothing gives its pushed-down default back to the parent
        // slot. Freeing the owning node consumes the target: its default
        // was either the target itself or the restore already put the
        // covering route in place.
        let mut t = tid;
        let mut freed_any = false;
        for &(parent, pfi) in path.iter().rev().skip(1) {
            let (n_routes, n_subtables) = {
                let node = self.store.subtable(t);
                (node.n_routes, node.n_subtables)
            };
            if n_routes > 0 || n_subtables > 1 {
                break;
            }
            if n_subtables == 1 {
                let (_, lone) = self
                    .store
                    .subtable(t)
                    .find_child()
                    .expect("subtable counter says one child");
                let inherited = self.store.subtable(t).default_route();
                self.store.subtable_mut(lone).set_default(inherited);
                self.store
                    .subtable_mut(parent)
                    .set_slot(pfi, Slot::Child(lone));
            } else {
                let default = self.store.subtable(t).default_route();
                let p = self.store.subtable_mut(parent);
                p.set_slot(pfi, Slot::Route(default));
                p.n_subtables -= 1;
            }
            self.store.free_subtable(t);
            freed_any = true;
            t = parent;
        }

        if !freed_any {
            self.store.place(tid, k, Some(target), replacement);
        }
        Some(self.store.free_route(target).into_meta())
    }

    /// Longest-prefix match: one indexed read per (surviving) level. The
    /// route found on a slot is verified against the query, since skipped
    /// levels mean the path down was never fully compared; on a miss the
    /// remembered subtable defaults are tried deepest first.
    pub fn match_longest(
        &self,
        addr: AF::InnerIpAddr,
    ) -> Option<&RouteEnt<AF, M>> {
        let net = AF::from_ipaddr(addr);
        let mut tid = self.root;
        let mut defaults =
            Vec::with_capacity(self.schedule.num_levels() as usize);
        loop {
            let l = self.store.subtable(tid).level;
            let fi = self.schedule.fringe_index(net, l);
            match self.store.subtable(tid).slot(fi) {
                Slot::Route(None) => break,
                Slot::Route(Some(r)) => {
                    if self.store.route(r).pfx().covers(net) {
                        return Some(self.store.route(r));
                    }
                    break;
                }
                Slot::Child(c) => {
                    debug_assert!(l < self.schedule.last_level());
                    if let Some(d) = self.store.subtable(c).default_route() {
                        defaults.push(d);
                    }
                    tid = c;
                }
            }
        }
        for d in defaults.iter().rev() {
            if self.store.route(*d).pfx().covers(net) {
                return Some(self.store.route(*d));
            }
        }
        self.root_default()
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
        loop {
            let l = self.store.subtable(tid).level;
            if l > ml {
                // the target's level was compressed away; the only place
                // an exact match can still sit is this node's inherited
                // default
                if let Some(d) = self.store.subtable(tid).default_route() {
                    if self.store.route(d).pfx() == pfx {
                        return Some(self.store.route(d));
                    }
                }
                return self.root_default();
            }
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
                    if l == ml {
                        let child_default =
                            self.store.subtable(c).default_route();
                        return self
                            .store
                            .exact_in_heap(tid, index, child_default, pfx)
                            .map(|r| self.store.route(r))
                            .or_else(|| self.root_default());
                    }
                    tid = c;
                }
            }
        }
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

    /// Recomputes all structural counters and the cached addresses from
    /// the slot arrays and checks them against the stored values, and the
    /// table-wide route count against both.
    pub fn consistency_check(&self) -> bool {
        let default = self
            .store
            .subtable(self.root)
            .default_route()
            .map_or(0, |_| 1);
        match self.store.recount(&self.schedule, self.root, true) {
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
