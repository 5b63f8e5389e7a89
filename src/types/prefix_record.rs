use std::fmt;

use serde_derive::Serialize;

use crate::types::{AddressFamily, PrefixId};
use inetnum::addr::Prefix;

//------------ Meta ----------------------------------------------------------

/// Trait for types that can be stored as the payload of a route entry.
///
/// The table itself never looks at the payload, it only moves it around, so
/// all that is required is that it can be printed and cloned.
pub trait Meta: fmt::Debug + fmt::Display + Clone {}

//------------ RouteEnt ------------------------------------------------------

/// A route entry as stored in the table.
///
/// Immutable after insertion: the prefix and the trie level it was inserted
/// into are fixed, only the payload is handed back out on removal. The
/// level is a function of nothing but the prefix length and the stride
/// schedule; it is cached on the entry so deletions and structural checks
/// need not re-derive it.
#[derive(Clone, Debug)]
pub struct RouteEnt<AF: AddressFamily, M: Meta> {
    pfx: PrefixId<AF>,
    pub(crate) level: u8,
    pub meta: M,
}

impl<AF: AddressFamily, M: Meta> RouteEnt<AF, M> {
    pub(crate) fn new(pfx: PrefixId<AF>, level: u8, meta: M) -> Self {
        Self { pfx, level, meta }
    }

    /// The prefix of this route.
    pub fn prefix(&self) -> Prefix {
        self.pfx.into()
    }

    /// The prefix length of this route.
    pub fn len(&self) -> u8 {
        self.pfx.len()
    }

    /// The trie level this route was inserted into.
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn meta(&self) -> &M {
        &self.meta
    }

    pub(crate) fn pfx(&self) -> PrefixId<AF> {
        self.pfx
    }

    pub(crate) fn into_meta(self) -> M {
        self.meta
    }
}

impl<AF: AddressFamily, M: Meta> fmt::Display for RouteEnt<AF, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.prefix(), self.meta)
    }
}

//------------ RouteRecord ---------------------------------------------------

/// A serializable rendering of a route entry, used by table dumps.
#[derive(Clone, Debug, Serialize)]
pub struct RouteRecord {
    pub prefix: String,
    pub meta: String,
}

impl<AF: AddressFamily, M: Meta> From<&RouteEnt<AF, M>> for RouteRecord {
    fn from(ent: &RouteEnt<AF, M>) -> Self {
        Self {
            prefix: ent.prefix().to_string(),
            meta: ent.meta.to_string(),
        }
    }
}

//------------ PrefixAs Metadata impl ----------------------------------------

/// Example payload: the AS that originated a prefix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PrefixAs(pub u32);

impl Meta for PrefixAs {}

impl fmt::Display for PrefixAs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}

//------------ NoMeta --------------------------------------------------------

/// Table-wide empty payload type.
///
/// A special type that indicates that there is no payload attached to the
/// routes in the table. Note that this is different from a table with an
/// optional payload.
#[derive(Clone, Copy, Hash)]
pub enum NoMeta {
    Empty,
}

impl Meta for NoMeta {}

impl fmt::Debug for NoMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("")
    }
}

impl fmt::Display for NoMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("")
    }
}
