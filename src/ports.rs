//! Boundaries to the hardware: sensors in, key events and serial traffic
//! out. The firmware integration implements these; host tests and the
//! replay tool substitute mocks. Every call is synchronous and bounded:
//! "nothing available" is a value, never a wait.

/// Analog sensor access, addressed by the configured pin.
pub trait SensorPort {
    /// Current raw reading of `pin`.
    fn read(&mut self, pin: u8) -> i32;
}

/// Keyboard HID transport. Calls may repeat the current state; transports
/// are expected to treat re-assertions as idempotent.
pub trait KeyPort {
    fn press(&mut self, key: u8);
    fn release(&mut self, key: u8);
}

/// Bidirectional control link: command bytes in, diagnostic lines out.
pub trait CommunicationPort {
    /// Next pending input byte, or `None` when there is nothing this tick.
    fn read_byte(&mut self) -> Option<u8>;

    /// Emit one diagnostic or confirmation line (terminator not included).
    fn write_line(&mut self, line: &str);
}
