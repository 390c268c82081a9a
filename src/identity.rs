use std::net::SocketAddr;

/// Principal a request acts as. Authentication itself lives upstream; this
/// service only consumes the identity the auth layer already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Authenticated user id forwarded by the auth layer.
    User(String),
    /// Unauthenticated caller, known only by network address.
    Peer(SocketAddr),
}

impl Principal {
    pub fn resolve(user_id: Option<&str>, peer: SocketAddr) -> Self {
        match user_id {
            Some(id) if !id.trim().is_empty() => Self::User(id.trim().to_string()),
            _ => Self::Peer(peer),
        }
    }

    /// Stable identifier the admission gate counts against.
    pub fn rate_key(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Peer(addr) => format!("ip:{}", addr.ip()),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Peer(_) => None,
        }
    }
}
