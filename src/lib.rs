//! An in-memory Allotment Routing Table (ART) for IP prefixes.
//!
//! The table is a multibit trie whose nodes ("subtables") are heap-ordered
//! slot arrays: every prefix maps to one heap index, and inserting a route
//! *allots* its pointer to every descendant slot it covers that is not
//! shadowed by a more specific route. A longest-prefix match is then a
//! single indexed read per trie level with no backtracking.
//!
//! Two table variants share the same contract: [`ArtTable`] keeps every
//! trie level materialized, [`PcArtTable`] path-compresses levels that
//! would hold nothing but a single child and caches the skipped address
//! bits on the surviving node.
//!
//! Both are parameterized over the address family ([`IPv4`] or [`IPv6`])
//! and an opaque payload type carried per route ([`Meta`]).
//!
//! ```
//! use art_store::{ArtTable, IPv4, PrefixAs};
//! use inetnum::addr::Prefix;
//! use std::str::FromStr;
//!
//! let mut table = ArtTable::<IPv4, PrefixAs>::new(&[4; 8]).unwrap();
//! let _ = table
//!     .insert(&Prefix::from_str("10.0.0.0/8").unwrap(), PrefixAs(64512))
//!     .unwrap();
//!
//! let best = table.match_longest("10.1.2.3".parse().unwrap()).unwrap();
//! assert_eq!(best.prefix(), Prefix::from_str("10.0.0.0/8").unwrap());
//! ```
//!
//! The engine is single-threaded: lookups take `&self`, all mutation takes
//! `&mut self`, and there is no internal synchronization. Wrap a table in a
//! reader-writer lock, or shard per table, for concurrent use.

pub mod schedule;
pub mod types;

mod trie;

pub use trie::{ArtTable, Insert, PcArtTable};

pub use types::af::{AddressFamily, IPv4, IPv6};
pub use types::errors::{StrideError, TableError};
pub use types::prefix_record::{Meta, NoMeta, PrefixAs, RouteEnt, RouteRecord};
pub use types::stats::StrideStats;

pub use inetnum::addr::Prefix;
