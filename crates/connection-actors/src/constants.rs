//! Centralized configuration constants for the link actor
//!
//! All timeout, delay, and buffer values are defined here with their
//! rationale. Runtime overrides go through [`crate::LinkConfig`]; these are
//! the defaults it falls back to.
//!
//! **Before changing any constant:**
//! 1. Read its full documentation comment
//! 2. Understand hardware/protocol basis for the value
//! 3. Test on real hardware (USB-serial bridges unplugged and replugged)

/// Link lifecycle timing
pub mod link {
    /// Fixed delay before a reconnection attempt (milliseconds)
    ///
    /// **Value**: 3000ms
    ///
    /// **Rationale**: After an unplug the device needs to re-enumerate and
    /// the OS needs to recreate the device node:
    /// - USB re-enumeration: 200-500ms
    /// - Driver handshake and node creation: 1-2s
    ///
    /// 3s covers both with margin. The interval is fixed (no exponential
    /// backoff): a field device left unplugged for hours is polled at a
    /// constant, low rate and reconnects within 3s of being plugged back.
    ///
    /// **Trade-offs**:
    /// - Shorter: more open failures against half-enumerated devices
    /// - Longer: alerts sent right after replug are picked up later
    ///
    /// **Used in**: reconnect.rs, link_actor.rs
    pub const RECONNECT_DELAY_MS: u64 = 3000;

    /// Upper bound for a single outbound write (milliseconds)
    ///
    /// **Value**: 1000ms
    ///
    /// **Rationale**: A line is at most a few hundred bytes; at 9600 baud
    /// 100 bytes take ~104ms. 1s only trips when the device stops draining
    /// (flow control stuck, device hung). Writes run on the session's
    /// writer thread, so a slow write never delays line delivery.
    ///
    /// **Used in**: session.rs
    pub const WRITE_TIMEOUT_MS: u64 = 1000;

    /// Blocking read window of the read loop (milliseconds)
    ///
    /// **Value**: 100ms
    ///
    /// **Rationale**: The read loop checks its cancel flag between reads, so
    /// this bounds how long `disconnect` waits for the loop to exit. 100ms
    /// keeps teardown well under [`CLEANUP_TIMEOUT_MS`] while adding no
    /// measurable CPU load when the line is idle.
    ///
    /// **Used in**: transport providers (read timeout of the opened port)
    pub const READ_TIMEOUT_MS: u64 = 100;

    /// Timeout for read loop and writer shutdown on disconnect (milliseconds)
    ///
    /// **Value**: 500ms
    ///
    /// **Rationale**: The read loop exits within one read window
    /// ([`READ_TIMEOUT_MS`]). The writer may be inside a write that runs to
    /// [`WRITE_TIMEOUT_MS`]; it is left to finish in the background and its
    /// result is discarded, since the session is already gone.
    ///
    /// **Used in**: session.rs
    pub const CLEANUP_TIMEOUT_MS: u64 = 500;

    /// Supervision timeout for open + parameter negotiation (seconds)
    ///
    /// **Value**: 10s
    ///
    /// **Rationale**: Opening a port normally takes < 100ms. A driver that
    /// hangs in open() must not leave the link stuck in Connecting forever;
    /// on timeout the attempt is treated as a failed open.
    ///
    /// **Used in**: link_actor.rs
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Read loop buffering
pub mod io {
    /// Size of the read loop's scratch buffer (bytes)
    ///
    /// **Value**: 1024 bytes
    ///
    /// **Rationale**: Alert devices send short text lines. 1KB holds many
    /// lines per read and matches common USB bulk transfer sizes.
    pub const READ_CHUNK_BYTES: usize = 1024;

    /// Pause before retrying a chunk when the actor queue is full (milliseconds)
    ///
    /// **Value**: 5ms
    ///
    /// **Rationale**: The read loop never drops data. When the actor falls
    /// behind the loop waits briefly and retries instead; the OS driver
    /// buffers incoming bytes meanwhile.
    pub const BACKPRESSURE_RETRY_MS: u64 = 5;

    /// Outbound lines queued for the writer thread
    ///
    /// **Value**: 32 lines
    ///
    /// **Rationale**: Sends are rare (operator commands). A full queue
    /// means the device stopped accepting data; further sends fail fast
    /// instead of piling up.
    pub const TRANSMIT_QUEUE_DEPTH: usize = 32;
}

/// Terminator appended to every outbound line
pub const LINE_TERMINATOR: &str = "\r\n";
