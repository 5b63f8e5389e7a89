use crate::types::AddressFamily;

//------------ PrefixId ------------------------------------------------------

// The internal prefix type: cut to size for an address family, unlike the
// inetnum Prefix, so a table for one family does not waste memory on the
// other. The public API speaks inetnum, these never leave the crate.
//
// The bits are kept canonical (truncated to `len`), so two PrefixIds cover
// the same route exactly when they compare equal.
#[derive(Hash, Eq, PartialEq, Debug, Copy, Clone)]
pub struct PrefixId<AF: AddressFamily> {
    len: u8,
    bits: AF,
}

impl<AF: AddressFamily> PrefixId<AF> {
    pub(crate) fn new(net: AF, len: u8) -> Self {
        PrefixId {
            len,
            bits: net.truncate_to_len(len),
        }
    }

    pub(crate) fn bits(&self) -> AF {
        self.bits
    }

    pub(crate) fn len(&self) -> u8 {
        self.len
    }

    /// Whether `addr` falls inside this prefix. This is the arbitrary-bit-
    /// length prefix comparison the lookups use to reject aliased slots.
    pub(crate) fn covers(&self, addr: AF) -> bool {
        addr.truncate_to_len(self.len) == self.bits
    }
}

// The two conversions below cannot reasonably panic: PrefixId and inetnum's
// Prefix represent the same data in slightly different ways, and the tables
// verify the address family before converting.
#[allow(clippy::unwrap_used)]
impl<AF: AddressFamily> From<inetnum::addr::Prefix> for PrefixId<AF> {
    fn from(value: inetnum::addr::Prefix) -> Self {
        let bits = match value.addr() {
            std::net::IpAddr::V4(addr) => {
                *AF::try_ref_from_bytes(&addr.octets()).unwrap()
            }
            std::net::IpAddr::V6(addr) => {
                *AF::try_ref_from_bytes(&addr.octets()).unwrap()
            }
        };
        Self::new(bits, value.len())
    }
}

#[allow(clippy::unwrap_used)]
impl<AF: AddressFamily> From<PrefixId<AF>> for inetnum::addr::Prefix {
    fn from(value: PrefixId<AF>) -> Self {
        Self::new(value.bits().into_ipaddr(), value.len()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::af::IPv4;
    use inetnum::addr::Prefix;
    use std::str::FromStr;

    #[test]
    fn test_roundtrip() {
        let pfx = Prefix::from_str("192.168.0.0/16").unwrap();
        let id = PrefixId::<IPv4>::from(pfx);
        assert_eq!(id.len(), 16);
        assert_eq!(Prefix::from(id), pfx);
    }

    #[test]
    fn test_covers() {
        let id = PrefixId::<IPv4>::new(IPv4::from([10, 1, 0, 0]), 16);
        assert!(id.covers(IPv4::from([10, 1, 2, 3])));
        assert!(!id.covers(IPv4::from([10, 2, 0, 0])));
        let default = PrefixId::<IPv4>::new(IPv4::zero(), 0);
        assert!(default.covers(IPv4::from([255, 255, 255, 255])));
    }
}
