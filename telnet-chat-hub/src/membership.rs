use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use tokio::{sync::Mutex, task::JoinHandle};

use crate::frame::ClientId;

/// Write half of a member's transport.
///
/// Broadcast write tasks lock it for the duration of one frame so concurrent
/// frames to the same member never interleave.
pub type SharedWriter<W> = Arc<Mutex<W>>;

/// Hands out identities: starts at 0 and never goes backwards.
#[derive(Debug, Default)]
pub struct ClientCounter {
    next: ClientId,
}

impl ClientCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ClientId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A registered connection: its writer plus the one reader task bound to it.
///
/// Dropping a member aborts the reader, which releases the read half; the
/// transport closes once in-flight write tasks let go of the writer.
pub struct Member<W> {
    writer: SharedWriter<W>,
    reader: JoinHandle<()>,
    peer: Option<SocketAddr>,
}

impl<W> Member<W> {
    pub fn new(writer: W, reader: JoinHandle<()>, peer: Option<SocketAddr>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            reader,
            peer,
        }
    }

    pub fn writer(&self) -> SharedWriter<W> {
        Arc::clone(&self.writer)
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl<W> Drop for Member<W> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

pub struct MembershipTable<W> {
    members: HashMap<ClientId, Member<W>>,
}

impl<W> Default for MembershipTable<W> {
    fn default() -> Self {
        Self {
            members: HashMap::new(),
        }
    }
}

impl<W> MembershipTable<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ClientId, member: Member<W>) {
        let previous = self.members.insert(id, member);
        debug_assert!(previous.is_none(), "client id {id} registered twice");
    }

    /// Removing an id that is not a member is a no-op.
    pub fn remove(&mut self, id: ClientId) -> Option<Member<W>> {
        self.members.remove(&id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: ClientId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sorted ids of the current members.
    #[cfg(test)]
    pub(crate) fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.members.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of every current member's writer, taken at call time.
    pub fn recipients(&self) -> Vec<(ClientId, SharedWriter<W>)> {
        self.members
            .iter()
            .map(|(id, member)| (*id, member.writer()))
            .collect()
    }
}
