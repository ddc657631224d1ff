//! Sequence fencing for overlapping async operations.
//!
//! Every operation takes a [`Ticket`] before it goes to the network and
//! checks it again when the answer comes back. If a newer operation of the
//! same kind started in between, or something declared the kind
//! superseded (a logout, say), the old answer is dropped on the floor
//! instead of clobbering newer state.

use std::sync::atomic::{AtomicU64, Ordering};

/// The operation kinds that are fenced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Login,
    Register,
    Verify,
    Logout,
}

impl OpKind {
    pub const ALL: [OpKind; 4] = [OpKind::Login, OpKind::Register, OpKind::Verify, OpKind::Logout];

    fn index(self) -> usize {
        match self {
            Self::Login => 0,
            Self::Register => 1,
            Self::Verify => 2,
            Self::Logout => 3,
        }
    }
}

/// Proof that an operation was the latest of its kind when it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    kind: OpKind,
    seq: u64,
}

impl Ticket {
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// One monotonically increasing counter per [`OpKind`].
#[derive(Debug, Default)]
pub struct SequenceFence {
    counters: [AtomicU64; 4],
}

impl SequenceFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next ticket for `kind`, invalidating all earlier ones.
    pub fn begin(&self, kind: OpKind) -> Ticket {
        let seq = self.counters[kind.index()].fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { kind, seq }
    }

    /// `true` if nothing newer of the same kind was issued and the kind
    /// wasn't superseded since `ticket` was taken.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.counters[ticket.kind.index()].load(Ordering::SeqCst) == ticket.seq
    }

    /// Invalidates every outstanding ticket of `kind`.
    pub fn supersede(&self, kind: OpKind) {
        self.counters[kind.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub fn supersede_all(&self) {
        for kind in OpKind::ALL {
            self.supersede(kind);
        }
    }
}
