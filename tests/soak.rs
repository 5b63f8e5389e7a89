mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use art_store::{ArtTable, IPv4, NoMeta, PcArtTable, Prefix};

    // a transparently correct longest-prefix match to hold the tables
    // against
    fn reference_lpm(routes: &BTreeSet<Prefix>, addr: Ipv4Addr) -> Option<Prefix> {
        let addr = u32::from(addr);
        routes
            .iter()
            .filter(|pfx| {
                let len = pfx.len();
                if len == 0 {
                    return true;
                }
                let net = match pfx.addr() {
                    std::net::IpAddr::V4(net) => u32::from(net),
                    std::net::IpAddr::V6(_) => unreachable!(),
                };
                (addr ^ net) >> (32 - len as u32) == 0
            })
            .max_by_key(|pfx| pfx.len())
            .copied()
    }

    fn random_prefix(rng: &mut StdRng) -> Prefix {
        // /24s with a sprinkling of shorter prefixes to keep the allot
        // interplay honest
        let len: u8 = match rng.random_range(0..10u8) {
            0 => 8,
            1 => 12,
            2 => 16,
            _ => 24,
        };
        let net = u32::from_be_bytes([
            rng.random::<u8>() % 32,
            rng.random::<u8>(),
            rng.random::<u8>(),
            0,
        ]) & (u32::MAX << (32 - len as u32));
        Prefix::new(Ipv4Addr::from(net).into(), len).unwrap()
    }

    fn random_addr(rng: &mut StdRng) -> Ipv4Addr {
        Ipv4Addr::new(
            rng.random::<u8>() % 32,
            rng.random::<u8>(),
            rng.random::<u8>(),
            rng.random::<u8>(),
        )
    }

    #[test]
    fn test_soak_simple() {
        super::common::init();
        soak(ArtTable::<IPv4, NoMeta>::new(&[4; 8]).unwrap(), 0xa51c);
    }

    #[test]
    fn test_soak_path_comp() {
        super::common::init();
        soak(PcArtTable::<IPv4, NoMeta>::new(&[4; 8]).unwrap(), 0xbeef);
    }

    // The tables share their whole contract, so the soak is written once
    // against a small vtable-free facade.
    enum Table {
        Simple(ArtTable<IPv4, NoMeta>),
        Pc(PcArtTable<IPv4, NoMeta>),
    }

    impl From<ArtTable<IPv4, NoMeta>> for Table {
        fn from(t: ArtTable<IPv4, NoMeta>) -> Self {
            Table::Simple(t)
        }
    }

    impl From<PcArtTable<IPv4, NoMeta>> for Table {
        fn from(t: PcArtTable<IPv4, NoMeta>) -> Self {
            Table::Pc(t)
        }
    }

    impl Table {
        fn insert(&mut self, pfx: &Prefix) -> bool {
            match self {
                Table::Simple(t) => {
                    t.insert(pfx, NoMeta::Empty).unwrap().is_added()
                }
                Table::Pc(t) => {
                    t.insert(pfx, NoMeta::Empty).unwrap().is_added()
                }
            }
        }

        fn remove(&mut self, pfx: &Prefix) -> bool {
            match self {
                Table::Simple(t) => t.remove(pfx).is_some(),
                Table::Pc(t) => t.remove(pfx).is_some(),
            }
        }

        fn match_longest(&self, addr: Ipv4Addr) -> Option<Prefix> {
            match self {
                Table::Simple(t) => t.match_longest(addr).map(|e| e.prefix()),
                Table::Pc(t) => t.match_longest(addr).map(|e| e.prefix()),
            }
        }

        fn match_exact(&self, pfx: &Prefix) -> Option<Prefix> {
            match self {
                Table::Simple(t) => t.match_exact(pfx).map(|e| e.prefix()),
                Table::Pc(t) => t.match_exact(pfx).map(|e| e.prefix()),
            }
        }

        fn route_count(&self) -> usize {
            match self {
                Table::Simple(t) => t.route_count(),
                Table::Pc(t) => t.route_count(),
            }
        }

        fn subtable_count(&self) -> u32 {
            match self {
                Table::Simple(t) => t.subtable_count(),
                Table::Pc(t) => t.subtable_count(),
            }
        }

        fn consistency_check(&self) -> bool {
            match self {
                Table::Simple(t) => t.consistency_check(),
                Table::Pc(t) => t.consistency_check(),
            }
        }
    }

    fn soak(table: impl Into<Table>, seed: u64) {
        let mut table = table.into();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut routes = BTreeSet::new();
        let mut insertion_order = vec![];

        for _ in 0..1000 {
            let pfx = random_prefix(&mut rng);
            let added = table.insert(&pfx);
            assert_eq!(added, routes.insert(pfx), "{}", pfx);
            if added {
                insertion_order.push(pfx);
            }
        }
        assert_eq!(table.route_count(), routes.len());
        assert!(table.consistency_check());

        // every stored route is findable by exact match
        for pfx in &routes {
            assert_eq!(table.match_exact(pfx), Some(*pfx), "{}", pfx);
        }

        // longest-prefix match agrees with the reference on random
        // addresses, and on the routes' own first addresses
        for _ in 0..1000 {
            let addr = random_addr(&mut rng);
            assert_eq!(
                table.match_longest(addr),
                reference_lpm(&routes, addr),
                "{}",
                addr
            );
        }
        for pfx in routes.iter().take(200) {
            let addr = match pfx.addr() {
                std::net::IpAddr::V4(net) => net,
                std::net::IpAddr::V6(_) => unreachable!(),
            };
            assert_eq!(
                table.match_longest(addr),
                reference_lpm(&routes, addr),
                "{}",
                addr
            );
        }

        // tear everything down in reverse insertion order; the structure
        // stays consistent after every step
        for pfx in insertion_order.iter().rev() {
            assert!(table.remove(pfx), "{}", pfx);
            routes.remove(pfx);
            assert!(table.consistency_check(), "after removing {}", pfx);
        }
        assert_eq!(table.route_count(), 0);
        // only the root subtable is left
        assert_eq!(table.subtable_count(), 1);
    }

    #[test]
    fn test_insert_remove_restores_structure() {
        super::common::init();
        let mut table = PcArtTable::<IPv4, NoMeta>::new(&[4; 8]).unwrap();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut routes = BTreeSet::new();
        for _ in 0..64 {
            let pfx = random_prefix(&mut rng);
            let _ = table.insert(&pfx, NoMeta::Empty).unwrap();
            routes.insert(pfx);
        }

        let subtables = table.subtable_count();
        let mut before = vec![];
        table.walk_breadth_first(|ent| before.push(ent.prefix()));

        // a prefix disjoint from everything above (first octet >= 32)
        let extra = Prefix::from_str("100.99.98.0/24").unwrap();
        let _ = table.insert(&extra, NoMeta::Empty).unwrap();
        assert!(table.remove(&extra).is_some());

        let mut after = vec![];
        table.walk_breadth_first(|ent| after.push(ent.prefix()));
        assert_eq!(before, after);
        assert_eq!(table.subtable_count(), subtables);
        assert!(table.consistency_check());
    }
}
