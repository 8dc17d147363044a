//! Stream Buffer Module (Unix-specific)
//!
//! Unbuffered stream adapter over [`SerialDevice`]. Nothing is cached except a
//! single pushback byte, which is how "peek the next character" works on a
//! device that cannot rewind.
//!
//! Transfer operations absorb OS failures into their return value: bulk
//! transfers report 0 bytes and single-character operations report
//! end-of-stream (`None`). Only the precondition checks and the availability
//! probe's `-1` sentinel surface a failure explicitly.

use std::io;
use std::path::Path;

use entities_serial_settings::{
    BaudRate, CharacterSize, FlowControl, OpenMode, Parity, PortSettings, Putback, Result,
    SerialError, StopBits,
};

use crate::device::SerialDevice;
use crate::sys::{self, NonBlockingGuard};

/// Unbuffered serial stream
#[derive(Debug, Default)]
pub struct SerialStreamBuf {
    device: SerialDevice,
    putback: Putback,
}

impl SerialStreamBuf {
    /// Create a closed stream
    pub fn new() -> Self {
        Self {
            device: SerialDevice::new(),
            putback: Putback::Empty,
        }
    }

    /// Open `path` read-write and apply `settings`
    ///
    /// # Errors
    ///
    /// Any error from [`SerialDevice::open`] or from applying the settings.
    /// The port is closed again (on drop) if applying the settings fails.
    pub fn open_with<P: AsRef<Path>>(path: P, settings: &PortSettings) -> Result<Self> {
        let mut stream = Self::new();
        stream.open(path, OpenMode::READ | OpenMode::WRITE)?;
        stream.device.apply_port_settings(settings)?;
        Ok(stream)
    }

    /// Open a serial device, see [`SerialDevice::open`]
    pub fn open<P: AsRef<Path>>(&mut self, path: P, mode: OpenMode) -> Result<()> {
        self.device.open(path, mode)?;
        self.putback.clear();
        Ok(())
    }

    /// Close the device, see [`SerialDevice::close`]
    ///
    /// The pushback byte is discarded whenever the device ends up closed,
    /// including when releasing the descriptor fails.
    pub fn close(&mut self) -> Result<()> {
        let result = self.device.close();
        if !self.device.is_open() {
            self.putback.clear();
        }
        result
    }

    pub fn is_open(&self) -> bool {
        self.device.is_open()
    }

    /// The underlying port handle
    pub fn device(&self) -> &SerialDevice {
        &self.device
    }

    pub fn file_descriptor(&self) -> Result<std::os::unix::io::RawFd> {
        self.device.file_descriptor()
    }

    pub fn set_parameters_to_default(&mut self) -> Result<()> {
        self.device.set_parameters_to_default()
    }

    pub fn set_baud_rate(&mut self, baud_rate: BaudRate) -> Result<()> {
        self.device.set_baud_rate(baud_rate)
    }

    pub fn baud_rate(&self) -> Result<BaudRate> {
        self.device.baud_rate()
    }

    pub fn set_character_size(&mut self, character_size: CharacterSize) -> Result<()> {
        self.device.set_character_size(character_size)
    }

    pub fn character_size(&self) -> Result<CharacterSize> {
        self.device.character_size()
    }

    pub fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<()> {
        self.device.set_flow_control(flow_control)
    }

    pub fn flow_control(&self) -> Result<FlowControl> {
        self.device.flow_control()
    }

    pub fn set_parity(&mut self, parity: Parity) -> Result<()> {
        self.device.set_parity(parity)
    }

    pub fn parity(&self) -> Result<Parity> {
        self.device.parity()
    }

    pub fn set_number_of_stop_bits(&mut self, stop_bits: StopBits) -> Result<()> {
        self.device.set_number_of_stop_bits(stop_bits)
    }

    pub fn number_of_stop_bits(&self) -> Result<StopBits> {
        self.device.number_of_stop_bits()
    }

    pub fn set_vmin(&mut self, vmin: i16) -> Result<()> {
        self.device.set_vmin(vmin)
    }

    pub fn vmin(&self) -> Result<u8> {
        self.device.vmin()
    }

    pub fn set_vtime(&mut self, vtime: i16) -> Result<()> {
        self.device.set_vtime(vtime)
    }

    pub fn vtime(&self) -> Result<u8> {
        self.device.vtime()
    }

    pub fn flush_input_buffer(&self) -> Result<()> {
        self.device.flush_input_buffer()
    }

    pub fn flush_output_buffer(&self) -> Result<()> {
        self.device.flush_output_buffer()
    }

    pub fn flush_io_buffers(&self) -> Result<()> {
        self.device.flush_io_buffers()
    }

    pub fn is_blocking(&self) -> Result<bool> {
        self.device.is_blocking()
    }

    pub fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        self.device.set_blocking(blocking)
    }

    /// True if a pushback byte is pending or the device has queued input
    pub fn is_data_available(&self) -> Result<bool> {
        if self.putback.is_pending() {
            self.device.file_descriptor()?;
            return Ok(true);
        }
        self.device.is_data_available()
    }

    /// Pushback byte waiting to be consumed, if any
    pub fn pending_putback(&self) -> Option<u8> {
        self.putback.peek()
    }

    /// Bulk write
    ///
    /// One `write(2)` of the whole buffer. Partial writes are returned as-is;
    /// a failed write reports 0.
    pub fn xsputn(&mut self, buf: &[u8]) -> Result<usize> {
        let fd = self.device.file_descriptor()?;
        if buf.is_empty() {
            return Ok(0);
        }
        Ok(sys::write_bytes(fd, buf).unwrap_or(0))
    }

    /// Bulk read
    ///
    /// A pending pushback byte goes to `buf[0]` and the rest of the buffer is
    /// filled by one `read(2)`. The pushback byte is counted even if that
    /// trailing read fails. Without a pushback byte, one `read(2)` fills the
    /// buffer directly; failure reports 0.
    pub fn xsgetn(&mut self, buf: &mut [u8]) -> Result<usize> {
        let fd = self.device.file_descriptor()?;
        if buf.is_empty() {
            return Ok(0);
        }

        match self.putback.take() {
            Some(byte) => {
                buf[0] = byte;
                if buf.len() == 1 {
                    return Ok(1);
                }
                Ok(1 + sys::read_bytes(fd, &mut buf[1..]).unwrap_or(0))
            }
            None => Ok(sys::read_bytes(fd, buf).unwrap_or(0)),
        }
    }

    /// Single-character write
    ///
    /// `None` (end-of-stream) is a no-op returning `None`. Otherwise writes
    /// one byte and echoes it back, or returns `None` if nothing was written.
    pub fn overflow(&mut self, c: Option<u8>) -> Result<Option<u8>> {
        let fd = self.device.file_descriptor()?;
        let Some(byte) = c else {
            return Ok(None);
        };
        match sys::write_bytes(fd, std::slice::from_ref(&byte)) {
            Ok(1) => Ok(Some(byte)),
            _ => Ok(None),
        }
    }

    /// Peek the next character
    ///
    /// Returns the pending pushback byte if there is one. Otherwise reads one
    /// byte and parks it in the pushback cell, so a successful call always
    /// leaves a byte pending. `None` if the read fails or returns nothing.
    pub fn underflow(&mut self) -> Result<Option<u8>> {
        let fd = self.device.file_descriptor()?;
        if let Some(byte) = self.putback.peek() {
            return Ok(Some(byte));
        }

        let mut byte = 0u8;
        match sys::read_bytes(fd, std::slice::from_mut(&mut byte)) {
            Ok(1) => {
                self.putback.store(byte);
                Ok(Some(byte))
            }
            _ => Ok(None),
        }
    }

    /// Read and consume the next character
    pub fn uflow(&mut self) -> Result<Option<u8>> {
        let next = self.underflow()?;
        self.putback.clear();
        Ok(next)
    }

    /// Push one character back
    ///
    /// Fails (`None`) for end-of-stream or when a byte is already pending;
    /// the pending byte is left untouched. On success the character is echoed.
    pub fn pbackfail(&mut self, c: Option<u8>) -> Result<Option<u8>> {
        self.device.file_descriptor()?;
        match c {
            Some(byte) => Ok(self.putback.push(byte)),
            None => Ok(None),
        }
    }

    /// Bytes readable without blocking
    ///
    /// 1 if a pushback byte is pending (no device access). Otherwise tries a
    /// single non-blocking read: 1 if a byte arrived (it becomes the pending
    /// pushback byte), 0 if none did. -1 if switching to non-blocking mode or
    /// restoring the original mode failed.
    pub fn showmanyc(&mut self) -> Result<isize> {
        let fd = self.device.file_descriptor()?;
        if self.putback.is_pending() {
            return Ok(1);
        }

        let guard = match NonBlockingGuard::enter(fd) {
            Ok(guard) => guard,
            Err(e) => {
                log::debug!("availability probe could not enter non-blocking mode: {}", e);
                return Ok(-1);
            }
        };

        let mut byte = 0u8;
        let available = match sys::read_bytes(fd, std::slice::from_mut(&mut byte)) {
            Ok(1) => {
                self.putback.store(byte);
                1
            }
            _ => 0,
        };

        if let Err(e) = guard.restore() {
            log::debug!("availability probe could not restore blocking mode: {}", e);
            return Ok(-1);
        }
        Ok(available)
    }
}

impl io::Read for SerialStreamBuf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.xsgetn(buf)?)
    }
}

impl io::Write for SerialStreamBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.xsputn(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SerialError::NotOpen.into())
        }
    }
}

impl io::BufRead for SerialStreamBuf {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.underflow()?;
        Ok(self.putback.as_slice())
    }

    fn consume(&mut self, amt: usize) {
        if amt > 0 {
            self.putback.clear();
        }
    }
}
