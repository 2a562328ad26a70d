//! Address/prefix keys of the form `a.b.c.d/len` or `x:y::z/len`

use std::fmt;
use std::net::IpAddr;

/// An address with its prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub addr: IpAddr,
    pub len: u8,
}

impl Prefix {
    pub fn parse(text: &str) -> Option<Self> {
        let (addr, len) = text.split_once('/')?;
        let addr: IpAddr = addr.parse().ok()?;
        let len: u8 = len.parse().ok()?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        (len <= max).then_some(Prefix { addr, len })
    }

    fn bits(&self) -> (u128, u8) {
        match self.addr {
            IpAddr::V4(a) => (u32::from(a) as u128, 32),
            IpAddr::V6(a) => (u128::from(a), 128),
        }
    }

    /// Same family and equal networks at the shorter of the two lengths
    pub fn overlaps(&self, other: &Prefix) -> bool {
        let (a, width) = self.bits();
        let (b, other_width) = other.bits();
        if width != other_width {
            return false;
        }
        let len = self.len.min(other.len);
        network(a, len, width) == network(b, len, width)
    }
}

fn network(bits: u128, len: u8, width: u8) -> u128 {
    if len == 0 {
        return 0;
    }
    let host_bits = (width - len) as u32;
    (bits >> host_bits) << host_bits
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}
