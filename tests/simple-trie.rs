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
    use std::str::FromStr;

    use art_store::{ArtTable, IPv4, IPv6, Insert, NoMeta, PrefixAs, Prefix, TableError};

    fn pfx(s: &str) -> Prefix {
        Prefix::from_str(s).unwrap()
    }

    fn v4_table() -> ArtTable<IPv4, PrefixAs> {
        ArtTable::new(&[4; 8]).unwrap()
    }

    #[test]
    fn test_default_route() {
        super::common::init();
        let mut table = v4_table();
        assert!(table
            .insert(&pfx("0.0.0.0/0"), PrefixAs(1))
            .unwrap()
            .is_added());

        let found = table.match_longest("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/0"));
        assert_eq!(table.route_count(), 1);
        assert!(table.consistency_check());
    }

    #[test]
    fn test_longest_match_chain() {
        super::common::init();
        let mut table = v4_table();
        for p in ["10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24"] {
            assert!(table.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }

        let found = table.match_longest("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.2.0/24"));
        // a /24 lives on the sixth 4-bit level
        assert_eq!(found.level(), 5);
        let found = table.match_longest("10.1.3.3".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.0.0/16"));
        let found = table.match_longest("10.2.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.0.0.0/8"));
        // no default route in the table
        assert!(table.match_longest("11.0.0.0".parse().unwrap()).is_none());
        assert!(table.consistency_check());
    }

    #[test]
    fn test_duplicate_insert() {
        super::common::init();
        let mut table = v4_table();
        assert!(table
            .insert(&pfx("192.168.0.0/16"), PrefixAs(1))
            .unwrap()
            .is_added());
        match table.insert(&pfx("192.168.0.0/16"), PrefixAs(2)).unwrap() {
            Insert::Duplicate(rejected) => assert_eq!(rejected, PrefixAs(2)),
            Insert::Added => panic!("duplicate insert went through"),
        }
        assert_eq!(table.route_count(), 1);
        // the first payload stays installed
        let found = table.match_exact(&pfx("192.168.0.0/16")).unwrap();
        assert_eq!(*found.meta(), PrefixAs(1));
    }

    #[test]
    fn test_delete_restores_covering_route() {
        super::common::init();
        let mut table = v4_table();
        assert!(table
            .insert(&pfx("10.0.0.0/8"), PrefixAs(8))
            .unwrap()
            .is_added());
        let before_count = table.subtable_count();
        assert!(table
            .insert(&pfx("10.1.0.0/16"), PrefixAs(16))
            .unwrap()
            .is_added());

        assert_eq!(table.remove(&pfx("10.1.0.0/16")), Some(PrefixAs(16)));
        let found = table.match_longest("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.0.0.0/8"));
        // the subtables the /16 needed are gone again
        assert_eq!(table.subtable_count(), before_count);
        assert_eq!(table.route_count(), 1);
        assert!(table.consistency_check());
    }

    #[test]
    fn test_remove_missing() {
        super::common::init();
        let mut table = v4_table();
        assert!(table
            .insert(&pfx("10.0.0.0/8"), PrefixAs(8))
            .unwrap()
            .is_added());
        assert_eq!(table.remove(&pfx("10.0.0.0/9")), None);
        assert_eq!(table.remove(&pfx("11.0.0.0/8")), None);
        assert_eq!(table.remove(&pfx("0.0.0.0/0")), None);
        assert_eq!(table.route_count(), 1);
        assert!(table.consistency_check());
    }

    #[test]
    fn test_exact_match() {
        super::common::init();
        let mut table = v4_table();
        for p in ["0.0.0.0/0", "10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24"] {
            assert!(table.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }
        for p in ["0.0.0.0/0", "10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24"] {
            let found = table.match_exact(&pfx(p)).unwrap();
            assert_eq!(found.prefix(), pfx(p));
        }
        // a miss yields the default route, not None; callers compare the
        // prefix to detect absence
        let found = table.match_exact(&pfx("10.2.0.0/16")).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/0"));
        let found = table.match_exact(&pfx("10.1.0.0/17")).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/0"));
    }

    #[test]
    fn test_exact_match_without_default() {
        super::common::init();
        let mut table = v4_table();
        assert!(table
            .insert(&pfx("10.0.0.0/8"), PrefixAs(8))
            .unwrap()
            .is_added());
        assert!(table.match_exact(&pfx("10.1.0.0/16")).is_none());
    }

    #[test]
    fn test_shadowing_within_one_subtable() {
        super::common::init();
        let mut table = v4_table();
        // all four live in the root subtable's heap; the /4 shadows part
        // of every shorter prefix's allotment
        assert!(table
            .insert(&pfx("0.0.0.0/4"), PrefixAs(4))
            .unwrap()
            .is_added());
        assert!(table
            .insert(&pfx("0.0.0.0/1"), PrefixAs(1))
            .unwrap()
            .is_added());
        assert!(table
            .insert(&pfx("0.0.0.0/2"), PrefixAs(2))
            .unwrap()
            .is_added());
        assert!(table
            .insert(&pfx("64.0.0.0/2"), PrefixAs(64))
            .unwrap()
            .is_added());
        assert!(table.consistency_check());

        let found = table.match_longest("0.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/4"));
        let found = table.match_longest("16.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/2"));
        let found = table.match_longest("64.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("64.0.0.0/2"));
        let found = table.match_longest("96.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("64.0.0.0/2"));
        assert!(table.match_longest("128.0.0.1".parse().unwrap()).is_none());

        // removing the /2 hands its allotment back to the /1
        assert_eq!(table.remove(&pfx("0.0.0.0/2")), Some(PrefixAs(2)));
        let found = table.match_longest("16.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/1"));
        let found = table.match_longest("0.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/4"));
        assert!(table.consistency_check());
    }

    #[test]
    fn test_insert_extremes() {
        super::common::init();
        let mut table = v4_table();
        assert!(table
            .insert(&pfx("0.0.0.0/1"), PrefixAs(1))
            .unwrap()
            .is_added());
        assert!(table
            .insert(&pfx("255.255.255.255/32"), PrefixAs(2))
            .unwrap()
            .is_added());

        let found = table.match_longest("127.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("0.0.0.0/1"));
        let found = table
            .match_longest("255.255.255.255".parse().unwrap())
            .unwrap();
        assert_eq!(found.prefix(), pfx("255.255.255.255/32"));
        assert!(table.match_longest("128.0.0.1".parse().unwrap()).is_none());
        assert!(table.consistency_check());
    }

    #[test]
    fn test_deepest_level_fringe_only() {
        super::common::init();
        let mut table = v4_table();
        // both live on the deepest level, one on a fringe slot (/32), one
        // on an interior slot (/29)
        assert!(table
            .insert(&pfx("10.1.2.3/32"), PrefixAs(32))
            .unwrap()
            .is_added());
        assert!(table
            .insert(&pfx("10.1.2.0/29"), PrefixAs(29))
            .unwrap()
            .is_added());

        let found = table.match_longest("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.2.3/32"));
        let found = table.match_longest("10.1.2.4".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.2.0/29"));
        assert!(table.match_longest("10.1.2.8".parse().unwrap()).is_none());

        assert_eq!(table.remove(&pfx("10.1.2.3/32")), Some(PrefixAs(32)));
        let found = table.match_longest("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.2.0/29"));
        assert!(table.consistency_check());
    }

    #[test]
    fn test_insert_order_is_irrelevant() {
        super::common::init();
        let prefixes = [
            "0.0.0.0/0",
            "10.0.0.0/8",
            "10.1.0.0/16",
            "10.1.2.0/24",
            "10.1.2.3/32",
            "192.168.0.0/16",
            "192.168.128.0/17",
        ];
        let mut forward = v4_table();
        for p in prefixes {
            assert!(forward.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }
        let mut backward = v4_table();
        for p in prefixes.iter().rev() {
            assert!(backward.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }

        let mut fwd = vec![];
        forward.walk_breadth_first(|ent| fwd.push(ent.prefix()));
        let mut bwd = vec![];
        backward.walk_breadth_first(|ent| bwd.push(ent.prefix()));
        assert_eq!(fwd, bwd);
        assert_eq!(forward.subtable_count(), backward.subtable_count());
    }

    #[test]
    fn test_insert_delete_roundtrip() {
        super::common::init();
        let mut table = v4_table();
        for p in ["10.0.0.0/8", "10.1.0.0/16"] {
            assert!(table.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }
        let subtables = table.subtable_count();
        let mut routes_before = vec![];
        table.walk_breadth_first(|ent| routes_before.push(ent.prefix()));

        assert!(table
            .insert(&pfx("10.1.2.0/24"), PrefixAs(24))
            .unwrap()
            .is_added());
        assert_eq!(table.remove(&pfx("10.1.2.0/24")), Some(PrefixAs(24)));

        let mut routes_after = vec![];
        table.walk_breadth_first(|ent| routes_after.push(ent.prefix()));
        assert_eq!(routes_before, routes_after);
        assert_eq!(table.subtable_count(), subtables);
        assert!(table.consistency_check());
    }

    #[test]
    fn test_walks_visit_every_route_once() {
        super::common::init();
        let mut table = v4_table();
        let prefixes = [
            "0.0.0.0/0",
            "10.0.0.0/8",
            "10.1.0.0/16",
            "10.1.2.0/24",
            "172.16.0.0/12",
            "192.168.0.0/16",
        ];
        for p in prefixes {
            assert!(table.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }

        let mut bfs = vec![];
        table.walk_breadth_first(|ent| bfs.push(ent.prefix()));
        let mut dfs = vec![];
        table.walk_depth_first(|ent| dfs.push(ent.prefix()));

        let mut expected: Vec<Prefix> =
            prefixes.iter().map(|p| pfx(p)).collect();
        expected.sort();
        bfs.sort();
        dfs.sort();
        assert_eq!(bfs, expected);
        assert_eq!(dfs, expected);
    }

    #[test]
    fn test_flush() {
        super::common::init();
        let mut table = v4_table();
        for p in ["0.0.0.0/0", "10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24"] {
            assert!(table.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }
        table.flush();
        assert!(table.is_empty());
        assert_eq!(table.subtable_count(), 1);
        assert!(table.match_longest("10.1.2.3".parse().unwrap()).is_none());
        assert!(table.consistency_check());

        // the empty table stays usable
        assert!(table
            .insert(&pfx("10.0.0.0/8"), PrefixAs(1))
            .unwrap()
            .is_added());
        assert_eq!(table.route_count(), 1);
    }

    #[test]
    fn test_family_mismatch() {
        super::common::init();
        let mut table = v4_table();
        assert_eq!(
            table.insert(&pfx("2001:db8::/32"), PrefixAs(1)),
            Err(TableError::FamilyMismatch)
        );
        assert_eq!(table.remove(&pfx("2001:db8::/32")), None);
        assert!(table.match_exact(&pfx("2001:db8::/32")).is_none());
    }

    #[test]
    fn test_ipv6_table() {
        super::common::init();
        let mut table: ArtTable<IPv6, NoMeta> =
            ArtTable::new(&[8; 16]).unwrap();
        assert!(table
            .insert(&pfx("::/0"), NoMeta::Empty)
            .unwrap()
            .is_added());
        assert!(table
            .insert(&pfx("2001:db8::/32"), NoMeta::Empty)
            .unwrap()
            .is_added());
        assert!(table
            .insert(&pfx("2001:db8:1::/48"), NoMeta::Empty)
            .unwrap()
            .is_added());

        let found = table
            .match_longest("2001:db8:1::42".parse().unwrap())
            .unwrap();
        assert_eq!(found.prefix(), pfx("2001:db8:1::/48"));
        let found = table
            .match_longest("2001:db8:2::42".parse().unwrap())
            .unwrap();
        assert_eq!(found.prefix(), pfx("2001:db8::/32"));
        let found = table.match_longest("2002::1".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("::/0"));

        assert!(table.remove(&pfx("2001:db8::/32")).is_some());
        let found = table
            .match_longest("2001:db8:2::42".parse().unwrap())
            .unwrap();
        assert_eq!(found.prefix(), pfx("::/0"));
        assert!(table.consistency_check());
    }

    #[test]
    fn test_wider_strides() {
        super::common::init();
        // the 16-8-8 schedule of the original's example usage
        let mut table: ArtTable<IPv4, PrefixAs> =
            ArtTable::new(&[16, 8, 8]).unwrap();
        for p in ["10.0.0.0/8", "10.1.0.0/16", "10.1.2.0/24", "10.1.2.3/32"] {
            assert!(table.insert(&pfx(p), PrefixAs(1)).unwrap().is_added());
        }
        let found = table.match_longest("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.2.3/32"));
        let found = table.match_longest("10.1.2.4".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.2.0/24"));
        let found = table.match_longest("10.7.8.9".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.0.0.0/8"));
        assert!(table.consistency_check());

        assert_eq!(table.remove(&pfx("10.1.2.0/24")), Some(PrefixAs(1)));
        let found = table.match_longest("10.1.2.4".parse().unwrap()).unwrap();
        assert_eq!(found.prefix(), pfx("10.1.0.0/16"));
        assert!(table.consistency_check());
    }
}
