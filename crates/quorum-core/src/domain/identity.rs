//! Contributor identity: an authenticated user or an anonymous network address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// Who is asking for (or answering) a task.
///
/// The two variants are mutually exclusive, so a TaskRun can never carry both a
/// user id and an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identity {
    User(UserId),
    Anonymous(IpAddr),
}

impl Identity {
    /// Resolve the identity of a request.
    ///
    /// An authenticated user wins over the remote address. Anonymous requests
    /// without an address are attributed to the loopback address.
    pub fn from_request(user_id: Option<UserId>, remote_addr: Option<IpAddr>) -> Self {
        match user_id {
            Some(id) => Identity::User(id),
            None => Identity::Anonymous(remote_addr.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous(_))
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::User(id) => Some(*id),
            Identity::Anonymous(_) => None,
        }
    }

    pub fn user_ip(&self) -> Option<IpAddr> {
        match self {
            Identity::User(_) => None,
            Identity::Anonymous(ip) => Some(*ip),
        }
    }
}

impl From<UserId> for Identity {
    fn from(id: UserId) -> Self {
        Identity::User(id)
    }
}

impl From<IpAddr> for Identity {
    fn from(ip: IpAddr) -> Self {
        Identity::Anonymous(ip)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(id) => fmt::Display::fmt(id, f),
            Identity::Anonymous(ip) => write!(f, "ip:{ip}"),
        }
    }
}
