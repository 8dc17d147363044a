//! Entities Layer: Serial Line Settings
//!
//! Provides the OS-call-free model behind a serial port stream: the semantic
//! line parameters, the line-discipline snapshot they are encoded into, the
//! one-character pushback cell and the error taxonomy shared by every layer.
//!
//! ## Overview
//!
//! - **[`settings`](settings/index.html)**: baud rate, character size, parity,
//!   stop bits, flow control, open mode and the [`PortSettings`] defaults.
//! - **[`snapshot`](snapshot/index.html)**: [`TermiosSnapshot`], a plain value
//!   copy of the termios structure. Every setter is a pure
//!   `(snapshot, parameter) -> snapshot` function so the bit encoding can be
//!   tested without a device.
//! - **[`putback`](putback/index.html)**: the single-slot pushback state machine.
//! - **[`error`](error/index.html)**: [`SerialError`] and the crate `Result` alias.
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(unix)] {
//! use entities_serial_settings::{Parity, TermiosSnapshot};
//!
//! let snapshot = TermiosSnapshot::zeroed().with_parity(Parity::Odd);
//! assert_eq!(snapshot.parity(), Parity::Odd);
//! # }
//! ```
//!
//! ## See Also
//!
//! - [`adapters_serial_unix`](../adapters_serial_unix/index.html): applies
//!   snapshots to a real device and implements the stream adapter

pub mod error;
pub mod putback;
pub mod settings;
#[cfg(unix)]
pub mod snapshot;

pub use error::{Result, SerialError};
pub use putback::Putback;
pub use settings::{
    control_char_value, BaudRate, CharacterSize, FlowControl, OpenMode, Parity, PortSettings,
    StopBits, CTRL_Q, CTRL_S, VMIN_DEFAULT, VTIME_DEFAULT,
};
#[cfg(unix)]
pub use snapshot::{TermiosSnapshot, DISABLED_CONTROL_CHAR};
