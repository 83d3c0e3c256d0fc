//! Victim module - who a punishment applies to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

/// A network address a punishment is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkAddress(IpAddr);

impl NetworkAddress {
    /// Wrap an IP address
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    /// Parse an address the way legacy plugins write them
    ///
    /// Accepts bare addresses as well as the `/1.2.3.4` and `1.2.3.4:25565`
    /// forms some plugins persist straight from the socket.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_domain::NetworkAddress;
    ///
    /// let a = NetworkAddress::parse("127.0.0.1").unwrap();
    /// assert_eq!(NetworkAddress::parse("/127.0.0.1:25565"), Some(a));
    /// assert!(NetworkAddress::parse("::1").is_some());
    /// assert!(NetworkAddress::parse("Steve").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim().trim_start_matches('/');
        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            return Some(Self(ip));
        }
        // host:port, only meaningful for IPv4
        let (host, port) = trimmed.rsplit_once(':')?;
        if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) && !host.contains(':') {
            return host.parse::<IpAddr>().ok().map(Self);
        }
        None
    }

    /// The wrapped IP address
    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who a punishment applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Victim {
    /// A player with a stable identity
    Player(Uuid),

    /// A network address
    Address(NetworkAddress),

    /// A player together with the address they were punished on
    Composite(Uuid, NetworkAddress),

    /// A display name that could not be resolved to an identity
    UnresolvedName(String),
}

impl Victim {
    /// Storage label for the victim variant
    pub fn type_label(&self) -> &'static str {
        match self {
            Victim::Player(_) => "player",
            Victim::Address(_) => "address",
            Victim::Composite(..) => "composite",
            Victim::UnresolvedName(_) => "unresolved",
        }
    }

    /// The player identity, if there is one
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Victim::Player(uuid) | Victim::Composite(uuid, _) => Some(*uuid),
            _ => None,
        }
    }

    /// The network address, if there is one
    pub fn address(&self) -> Option<NetworkAddress> {
        match self {
            Victim::Address(address) | Victim::Composite(_, address) => Some(*address),
            _ => None,
        }
    }

    /// Whether this victim is the unresolved-name placeholder
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Victim::UnresolvedName(_))
    }
}

impl fmt::Display for Victim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Victim::Player(uuid) => write!(f, "{}", uuid),
            Victim::Address(address) => write!(f, "{}", address),
            Victim::Composite(uuid, address) => write!(f, "{}@{}", uuid, address),
            Victim::UnresolvedName(name) => write!(f, "?{}", name),
        }
    }
}
