use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    #[error("missing '/<prefix>'")]
    MissingPrefix,
    #[error("invalid address '{0}'")]
    Address(String),
    #[error("invalid prefix length '{0}'")]
    Prefix(String),
    #[error("host bits set in '{0}'")]
    HostBits(String),
}

/// A network range as base address plus prefix length. Parsing is strict:
/// the base address must be the network address of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrBlock {
    network: IpAddr,
    prefix: u8,
}

impl CidrBlock {
    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn width(&self) -> u8 {
        width_of(&self.network)
    }

    /// Inclusive numeric span covered by the block.
    pub fn span(&self) -> (u128, u128) {
        let start = match self.network {
            IpAddr::V4(a) => u128::from(u32::from(a)),
            IpAddr::V6(a) => u128::from(a),
        };
        (start, start | host_mask(self.width() - self.prefix))
    }

    /// Blocks of different address families never overlap.
    pub fn overlaps(&self, other: &CidrBlock) -> bool {
        if self.network.is_ipv4() != other.network.is_ipv4() {
            return false;
        }
        let (a_start, a_end) = self.span();
        let (b_start, b_end) = other.span();
        a_start <= b_end && b_start <= a_end
    }
}

fn host_mask(host_bits: u8) -> u128 {
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

impl FromStr for CidrBlock {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, prefix) = s.split_once('/').ok_or(CidrError::MissingPrefix)?;
        let network: IpAddr = addr
            .parse::<Ipv4Addr>()
            .map(IpAddr::V4)
            .or_else(|_| addr.parse::<Ipv6Addr>().map(IpAddr::V6))
            .map_err(|_| CidrError::Address(addr.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| prefix.bytes().all(|b| b.is_ascii_digit()) && *p <= width_of(&network))
            .ok_or_else(|| CidrError::Prefix(prefix.to_string()))?;
        let block = CidrBlock { network, prefix };
        if block.span().0 & host_mask(block.width() - prefix) != 0 {
            return Err(CidrError::HostBits(s.to_string()));
        }
        Ok(block)
    }
}

fn width_of(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(s: &str) -> CidrBlock {
        s.parse().unwrap()
    }

    #[test]
    fn parses_v4_and_v6() {
        assert_eq!(block("10.0.0.0/16").to_string(), "10.0.0.0/16");
        assert_eq!(block(" 2001:db8::/32 ").prefix(), 32);
        assert_eq!(block("0.0.0.0/0").span(), (0, u128::from(u32::MAX)));
        assert_eq!(block("::/0").span(), (0, u128::MAX));
    }

    #[test]
    fn rejects_malformed_blocks() {
        assert_eq!("10.0.0.0".parse::<CidrBlock>(), Err(CidrError::MissingPrefix));
        assert!(matches!("10.0.0/16".parse::<CidrBlock>(), Err(CidrError::Address(_))));
        assert!(matches!("10.0.0.0/33".parse::<CidrBlock>(), Err(CidrError::Prefix(_))));
        assert!(matches!("10.0.0.0/+8".parse::<CidrBlock>(), Err(CidrError::Prefix(_))));
        assert!(matches!("10.0.0.1/16".parse::<CidrBlock>(), Err(CidrError::HostBits(_))));
        assert!(matches!("${var.cidr}".parse::<CidrBlock>(), Err(CidrError::MissingPrefix)));
    }

    #[test]
    fn overlap_covers_nested_identical_and_disjoint() {
        assert!(block("10.0.0.0/16").overlaps(&block("10.0.0.0/16")));
        assert!(block("10.0.0.0/8").overlaps(&block("10.1.2.0/24")));
        assert!(block("10.1.2.0/24").overlaps(&block("10.0.0.0/8")));
        assert!(!block("10.0.0.0/16").overlaps(&block("10.1.0.0/16")));
        assert!(!block("0.0.0.0/0").overlaps(&block("::/0")));
    }
}
