//! Adapters Layer: Unix Serial Devices
//!
//! Provides the serial port handle and its unbuffered stream adapter on top of
//! Unix device files.
//!
//! ## Overview
//!
//! - **[`sys`](sys/index.html)**: thin wrappers over the termios, `fcntl` and
//!   `ioctl` calls, and [`NonBlockingGuard`], the scoped blocking-mode switch.
//! - **[`device`](device/index.html)**: [`SerialDevice`], the port handle. Owns
//!   the descriptor and the settings saved at open time, and maps the semantic
//!   line parameters onto the device with one read-modify-write per call.
//! - **[`stream_buf`](stream_buf/index.html)**: [`SerialStreamBuf`], the
//!   unbuffered stream adapter (bulk and single-character transfer,
//!   one-character pushback, non-blocking availability probe) plus its
//!   `std::io::Read`, `Write` and `BufRead` implementations.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # #[cfg(unix)] {
//! use std::io::{Read, Write};
//! use adapters_serial_unix::SerialStreamBuf;
//! use entities_serial_settings::{BaudRate, PortSettings};
//!
//! let settings = PortSettings::default().with_baud_rate(BaudRate::Baud9600);
//! let mut port = SerialStreamBuf::open_with("/dev/ttyUSB0", &settings)?;
//! port.write_all(b"AT\r")?;
//! let mut reply = [0u8; 16];
//! let n = port.read(&mut reply)?;
//! # let _ = n;
//! # }
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## See Also
//!
//! - [`entities_serial_settings`](../entities_serial_settings/index.html):
//!   parameter types and the pure snapshot encoding

#[cfg(unix)]
pub mod device;
#[cfg(unix)]
pub mod stream_buf;
#[cfg(unix)]
pub mod sys;

#[cfg(unix)]
pub use device::SerialDevice;
#[cfg(unix)]
pub use stream_buf::SerialStreamBuf;
#[cfg(unix)]
pub use sys::NonBlockingGuard;
