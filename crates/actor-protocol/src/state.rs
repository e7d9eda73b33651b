/// # Connection State Machine
///
/// Single source of truth for the link status. The link actor is the only
/// writer; everything else observes it through `SystemEvent::StateChanged`
/// or the atomic mirror kept by the front-door handle.
///
/// ## State Transition Diagram
///
/// ```text
///                 connect / autoConnect
///   ┌──────────────┐ ─────────────────► ┌────────────┐
///   │ Disconnected │                    │ Connecting │
///   └──────────────┘ ◄───────────────── └─────┬──────┘
///      ▲    │  ▲      explicit disconnect     │   │
///      │    │  │                        opened│   │open/negotiation failed
///      │    │  │ unplug, read error,          ▼   ▼
///      │    │  │ disconnect       ┌───────────┐ ┌───────┐
///      │    │  └──────────────────┤ Connected │ │ Error │
///      │    │                     └───────────┘ └───┬───┘
///      │    └──── access denied ─────────────────►  │
///      └─────────── disconnect / no devices ────────┘
/// ```
///
/// There is no terminal state. Error is left by the next connect attempt
/// (reconnect timer, attach event, access grant) or by a disconnect.
///
/// ## State Invariants
///
/// - **Disconnected**: No session, framer empty, at most one reconnect timer armed
/// - **Connecting**: Exactly one open in flight, no session yet
/// - **Connected**: Session open, read loop running
/// - **Error**: No session; last attempt failed or access was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ConnectionState {
    /// No active connection, ready to connect
    Disconnected,

    /// Opening the device and negotiating parameters
    Connecting,

    /// Session open and read loop running
    Connected,

    /// Last connection attempt failed or access was denied
    Error,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl ConnectionState {
    /// Is a session (or an attempt at one) currently occupying the link?
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// User-facing status text
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Error => "Error",
        }
    }

    /// Validate if transition to new_state is allowed from current state.
    ///
    /// Same-state transitions are accepted; callers treat them as no-ops.
    pub fn can_transition_to(&self, new_state: ConnectionState) -> bool {
        use ConnectionState::*;

        match (self, new_state) {
            (a, b) if *a == b => true,

            // From Disconnected
            (Disconnected, Connecting) => true, // connect / autoConnect
            (Disconnected, Error) => true,      // access denied, discovery failed

            // From Connecting
            (Connecting, Connected) => true,    // open + negotiate succeeded
            (Connecting, Error) => true,        // open or negotiation failed
            (Connecting, Disconnected) => true, // cancelled by disconnect

            // From Connected
            (Connected, Disconnected) => true, // disconnect, unplug, read error

            // From Error
            (Error, Connecting) => true,   // retry
            (Error, Disconnected) => true, // disconnect, nothing attached

            _ => false,
        }
    }

    /// Convert state to u8 value for atomic storage
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Error => 3,
        }
    }

    /// Convert u8 value back to state.
    /// Returns None if value is invalid
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ConnectionState::Disconnected),
            1 => Some(ConnectionState::Connecting),
            2 => Some(ConnectionState::Connected),
            3 => Some(ConnectionState::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
