//! Function-pointer link state machine.
//!
//! Classic embedded FSM pattern: one descriptor per state, each with a
//! transition function that maps an input to the next state (or `None`
//! to stay).
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  LinkTable                                                    │
//! │  ┌──────────────┬──────────────────────────────────────────┐  │
//! │  │ LinkStateId  │ on_input(state, input) -> Option<next>   │  │
//! │  ├──────────────┼──────────────────────────────────────────┤  │
//! │  │ Disconnected │ Connect(h)          → Securing{h}        │  │
//! │  │ Securing     │ SecurityOk(h)       → Connected{h}       │  │
//! │  │              │ SecurityFailed(h)   → Disconnected       │  │
//! │  │              │ Disconnect(h)       → Disconnected       │  │
//! │  │ Connected    │ SecurityFailed(h)   → Disconnected       │  │
//! │  │              │ Disconnect(h)       → Disconnected       │  │
//! │  └──────────────┴──────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Connect` in any state replaces the live link (the stack never
//! reports two links at once, so this only happens after a lost
//! disconnect).  Inputs carrying a handle that does not match the live
//! link are ignored.

pub mod advertising;
pub mod context;

use log::info;

use crate::app::ports::ConnHandle;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Tag of the link state, usable as a table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LinkStateId {
    Disconnected = 0,
    Securing = 1,
    Connected = 2,
}

impl LinkStateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 3;
}

/// The link state with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Link up, pairing / encryption in progress.
    Securing { handle: ConnHandle },
    /// Link up and secured.
    Connected { handle: ConnHandle },
}

impl LinkState {
    pub fn id(&self) -> LinkStateId {
        match self {
            Self::Disconnected => LinkStateId::Disconnected,
            Self::Securing { .. } => LinkStateId::Securing,
            Self::Connected { .. } => LinkStateId::Connected,
        }
    }

    /// Handle of the live link, if any.
    pub fn handle(&self) -> Option<ConnHandle> {
        match self {
            Self::Disconnected => None,
            Self::Securing { handle } | Self::Connected { handle } => Some(*handle),
        }
    }

    /// Whether `handle` refers to the live link.
    pub fn is_live(&self, handle: ConnHandle) -> bool {
        self.handle() == Some(handle)
    }
}

/// Inputs to the link state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkInput {
    Connect(ConnHandle),
    SecuritySucceeded(ConnHandle),
    SecurityFailed(ConnHandle),
    Disconnect(ConnHandle),
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Per-state transition handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type LinkTransitionFn = fn(&LinkState, LinkInput) -> Option<LinkState>;

/// Static descriptor for a single link state.
pub struct LinkStateDescriptor {
    pub id: LinkStateId,
    pub name: &'static str,
    pub on_input: LinkTransitionFn,
}

/// Build the table, indexed by `LinkStateId as usize`.
pub fn build_link_table() -> [LinkStateDescriptor; LinkStateId::COUNT] {
    [
        LinkStateDescriptor {
            id: LinkStateId::Disconnected,
            name: "Disconnected",
            on_input: disconnected_on_input,
        },
        LinkStateDescriptor {
            id: LinkStateId::Securing,
            name: "Securing",
            on_input: securing_on_input,
        },
        LinkStateDescriptor {
            id: LinkStateId::Connected,
            name: "Connected",
            on_input: connected_on_input,
        },
    ]
}

fn disconnected_on_input(_state: &LinkState, input: LinkInput) -> Option<LinkState> {
    match input {
        LinkInput::Connect(handle) => Some(LinkState::Securing { handle }),
        _ => None,
    }
}

fn securing_on_input(state: &LinkState, input: LinkInput) -> Option<LinkState> {
    match input {
        LinkInput::Connect(handle) => Some(LinkState::Securing { handle }),
        LinkInput::SecuritySucceeded(h) if state.is_live(h) => {
            Some(LinkState::Connected { handle: h })
        }
        LinkInput::SecurityFailed(h) | LinkInput::Disconnect(h) if state.is_live(h) => {
            Some(LinkState::Disconnected)
        }
        _ => None,
    }
}

fn connected_on_input(state: &LinkState, input: LinkInput) -> Option<LinkState> {
    match input {
        LinkInput::Connect(handle) => Some(LinkState::Securing { handle }),
        LinkInput::SecurityFailed(h) | LinkInput::Disconnect(h) if state.is_live(h) => {
            Some(LinkState::Disconnected)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A completed transition, reported to the caller for logging and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTransition {
    pub from: LinkState,
    pub to: LinkState,
}

/// The link state machine engine.
pub struct LinkFsm {
    table: [LinkStateDescriptor; LinkStateId::COUNT],
    state: LinkState,
}

impl LinkFsm {
    pub fn new() -> Self {
        Self {
            table: build_link_table(),
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Feed one input through the table.
    pub fn apply(&mut self, input: LinkInput) -> Option<LinkTransition> {
        let row = &self.table[self.state.id() as usize];
        debug_assert_eq!(row.id, self.state.id());
        let next = (row.on_input)(&self.state, input)?;
        if next == self.state {
            return None;
        }

        info!(
            "Link transition: {} -> {}",
            row.name,
            self.table[next.id() as usize].name
        );
        let from = self.state;
        self.state = next;
        Some(LinkTransition { from, to: next })
    }
}

impl Default for LinkFsm {
    fn default() -> Self {
        Self::new()
    }
}
