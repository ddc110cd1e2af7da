use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::BridgeSession;
use crate::SessionError;

/// Tracks every live bridge session and elects a primary listener (§4.2).
/// Election rule: the first bridge added becomes primary; if the primary
/// disconnects, the next entry in iteration order (a `BTreeMap`, so by
/// socket address) takes over.
#[derive(Default)]
pub struct BridgeTable {
    bridges: BTreeMap<SocketAddr, BridgeSession>,
    primary: Option<SocketAddr>,
}

impl BridgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: BridgeSession) {
        let addr = session.remote_addr;
        let is_first = self.bridges.is_empty();
        self.bridges.insert(addr, session);
        if is_first {
            self.primary = Some(addr);
        }
    }

    /// Remove a bridge, re-electing a primary if it was the one removed.
    pub fn remove(&mut self, addr: SocketAddr) -> Option<BridgeSession> {
        let removed = self.bridges.remove(&addr);
        if self.primary == Some(addr) {
            self.primary = self.bridges.keys().next().copied();
        }
        removed
    }

    pub fn get(&self, addr: SocketAddr) -> Option<&BridgeSession> {
        self.bridges.get(&addr)
    }

    pub fn get_mut(&mut self, addr: SocketAddr) -> Option<&mut BridgeSession> {
        self.bridges.get_mut(&addr)
    }

    pub fn is_primary(&self, addr: SocketAddr) -> bool {
        self.primary == Some(addr)
    }

    pub fn primary(&self) -> Option<&BridgeSession> {
        self.primary.and_then(|addr| self.bridges.get(&addr))
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BridgeSession> {
        self.bridges.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BridgeSession> {
        self.bridges.values_mut()
    }

    /// Bridges currently ready to accept control commands, preferred order
    /// for fan-out (§4.3).
    pub fn ready_bridges(&self) -> impl Iterator<Item = &BridgeSession> {
        self.bridges.values().filter(|b| b.ready_to_control)
    }

    pub fn first_ready(&self) -> Result<&BridgeSession, SessionError> {
        self.ready_bridges().next().ok_or(SessionError::NoReadyBridge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn first_inserted_bridge_becomes_primary() {
        let mut table = BridgeTable::new();
        table.insert(BridgeSession::new(addr(1)));
        table.insert(BridgeSession::new(addr(2)));
        assert!(table.is_primary(addr(1)));
        assert!(!table.is_primary(addr(2)));
    }

    #[test]
    fn removing_primary_elects_the_next_entry() {
        let mut table = BridgeTable::new();
        table.insert(BridgeSession::new(addr(1)));
        table.insert(BridgeSession::new(addr(2)));
        table.remove(addr(1));
        assert!(table.is_primary(addr(2)));
    }

    #[test]
    fn first_ready_returns_error_when_none_ready() {
        let mut table = BridgeTable::new();
        table.insert(BridgeSession::new(addr(1)));
        assert!(table.first_ready().is_err());
    }

    #[test]
    fn first_ready_finds_a_ready_bridge() {
        let mut table = BridgeTable::new();
        table.insert(BridgeSession::new(addr(1)));
        table.get_mut(addr(1)).unwrap().ready_to_control = true;
        assert!(table.first_ready().is_ok());
    }
}
