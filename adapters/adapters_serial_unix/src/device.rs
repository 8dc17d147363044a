//! Serial Device Module (Unix-specific)
//!
//! Port handle lifecycle and the device configuration model. The handle owns
//! the descriptor and the line settings captured at open time; every
//! configuration setter is one query → pure snapshot update → apply cycle
//! against the device, and every getter decodes a freshly queried snapshot.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::path::Path;

use entities_serial_settings::{
    control_char_value, BaudRate, CharacterSize, FlowControl, OpenMode, Parity, PortSettings,
    Result, SerialError, StopBits, TermiosSnapshot,
};
use nix::errno::Errno;

use crate::sys::{self, Queue};

fn io_failure(errno: Errno) -> SerialError {
    SerialError::Io(errno.to_string())
}

fn open_failure(errno: Errno) -> SerialError {
    SerialError::OpenFailed(errno.to_string())
}

/// Descriptor plus the settings to restore on close
#[derive(Debug)]
struct OpenPort {
    file: File,
    saved_settings: TermiosSnapshot,
}

/// Serial port handle
///
/// Created closed. `open` moves it to open, `close` (or drop) restores the
/// original line settings, releases the descriptor and returns it to closed.
/// A closed handle can be opened again.
#[derive(Debug, Default)]
pub struct SerialDevice {
    port: Option<OpenPort>,
}

impl SerialDevice {
    /// Create a closed handle
    pub fn new() -> Self {
        Self { port: None }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Raw descriptor of the open device
    ///
    /// # Errors
    ///
    /// Returns `SerialError::NotOpen` if the handle is closed.
    pub fn file_descriptor(&self) -> Result<RawFd> {
        self.port
            .as_ref()
            .map(|port| port.file.as_raw_fd())
            .ok_or(SerialError::NotOpen)
    }

    /// Open a serial device
    ///
    /// The device is opened without becoming the controlling terminal and in
    /// non-blocking mode. The current settings are saved for `close`, a
    /// receiver-enabled VMIN = VTIME = 0 configuration is applied, stale
    /// input and output are discarded, then the baseline configuration is
    /// applied and the descriptor is switched to blocking mode.
    ///
    /// # Arguments
    ///
    /// * `path` - Device file (e.g. `/dev/ttyS0`)
    /// * `mode` - `READ | WRITE`, `READ` or `WRITE`; any other combination
    ///   returns `Ok(())` without opening anything
    ///
    /// # Errors
    ///
    /// - `SerialError::AlreadyOpen` if the handle is open
    /// - `SerialError::OpenFailed` if the open, the settings query or the
    ///   first apply fails
    /// - `SerialError::Io` if a later initialisation step fails
    pub fn open<P: AsRef<Path>>(&mut self, path: P, mode: OpenMode) -> Result<()> {
        if self.is_open() {
            return Err(SerialError::AlreadyOpen);
        }

        let path = path.as_ref();
        let mut options = OpenOptions::new();
        if mode == OpenMode::READ | OpenMode::WRITE {
            options.read(true).write(true);
        } else if mode == OpenMode::READ {
            options.read(true);
        } else if mode == OpenMode::WRITE {
            options.write(true);
        } else {
            log::debug!("open of {} ignored, unsupported mode {:?}", path.display(), mode);
            return Ok(());
        }
        options.custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK);

        let file = options
            .open(path)
            .map_err(|e| SerialError::OpenFailed(e.to_string()))?;
        let fd = file.as_raw_fd();

        let saved_settings = sys::query_settings(fd).map_err(open_failure)?;
        sys::apply_settings(fd, &TermiosSnapshot::receiver_enabled()).map_err(open_failure)?;

        self.port = Some(OpenPort {
            file,
            saved_settings,
        });

        if let Err(e) = self.flush_io_buffers().and_then(|()| self.initialize()) {
            self.release_after_failed_open();
            return Err(e);
        }

        log::debug!("opened serial device {} ({:?})", path.display(), mode);
        Ok(())
    }

    /// Put the saved settings back and drop the descriptor after a failed
    /// initialisation, leaving the handle closed
    fn release_after_failed_open(&mut self) {
        if let Some(port) = self.port.take() {
            if let Err(e) = sys::apply_settings(port.file.as_raw_fd(), &port.saved_settings) {
                log::debug!("restoring settings after failed open failed: {}", e);
            }
        }
    }

    /// Restore the saved settings and release the descriptor
    ///
    /// # Errors
    ///
    /// - `SerialError::NotOpen` if the handle is already closed
    /// - `SerialError::Io` if restoring the settings or closing fails; a
    ///   failed restore leaves the handle open
    pub fn close(&mut self) -> Result<()> {
        let port = self.port.as_ref().ok_or(SerialError::NotOpen)?;
        sys::apply_settings(port.file.as_raw_fd(), &port.saved_settings).map_err(io_failure)?;

        let Some(port) = self.port.take() else {
            return Err(SerialError::NotOpen);
        };
        let fd = port.file.into_raw_fd();
        nix::unistd::close(fd).map_err(io_failure)?;

        log::debug!("closed serial device (fd {})", fd);
        Ok(())
    }

    /// Discard received but unread data
    pub fn flush_input_buffer(&self) -> Result<()> {
        self.flush(Queue::Input)
    }

    /// Discard written but untransmitted data
    pub fn flush_output_buffer(&self) -> Result<()> {
        self.flush(Queue::Output)
    }

    /// Discard both queues
    pub fn flush_io_buffers(&self) -> Result<()> {
        self.flush(Queue::Both)
    }

    fn flush(&self, queue: Queue) -> Result<()> {
        let fd = self.file_descriptor()?;
        sys::flush_queue(fd, queue).map_err(io_failure)
    }

    /// True if the device has received bytes not yet read
    pub fn is_data_available(&self) -> Result<bool> {
        let fd = self.file_descriptor()?;
        Ok(sys::bytes_queued(fd).map(|n| n > 0).unwrap_or(false))
    }

    /// True unless the descriptor is in non-blocking mode
    pub fn is_blocking(&self) -> Result<bool> {
        let fd = self.file_descriptor()?;
        sys::is_blocking(fd).map_err(io_failure)
    }

    pub fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        let fd = self.file_descriptor()?;
        sys::set_blocking(fd, blocking).map_err(io_failure)
    }

    /// Apply the baseline configuration, discard stale data and switch to
    /// blocking mode
    fn initialize(&mut self) -> Result<()> {
        self.set_parameters_to_default()?;
        self.flush_io_buffers()?;
        self.set_blocking(true)
    }

    /// Reset every line parameter to its default
    ///
    /// Rewrites the whole line discipline to the baseline, then applies
    /// [`PortSettings::default`] one parameter at a time.
    pub fn set_parameters_to_default(&mut self) -> Result<()> {
        let fd = self.file_descriptor()?;
        let baseline = sys::query_settings(fd).map_err(io_failure)?.with_baseline()?;
        sys::apply_settings(fd, &baseline).map_err(io_failure)?;
        self.apply_port_settings(&PortSettings::default())
    }

    /// Apply a full set of line parameters
    ///
    /// Order: baud rate, character size, flow control, parity, stop bits,
    /// VMIN, VTIME. Stops at the first failure.
    pub fn apply_port_settings(&mut self, settings: &PortSettings) -> Result<()> {
        self.set_baud_rate(settings.baud_rate)?;
        self.set_character_size(settings.character_size)?;
        self.set_flow_control(settings.flow_control)?;
        self.set_parity(settings.parity)?;
        self.set_number_of_stop_bits(settings.stop_bits)?;
        self.set_vmin(i16::from(settings.vmin))?;
        self.set_vtime(i16::from(settings.vtime))
    }

    /// Query the device's current settings
    pub fn current_settings(&self) -> Result<TermiosSnapshot> {
        let fd = self.file_descriptor()?;
        sys::query_settings(fd).map_err(io_failure)
    }

    fn modify_settings<F>(&mut self, update: F) -> Result<()>
    where
        F: FnOnce(TermiosSnapshot) -> Result<TermiosSnapshot>,
    {
        let fd = self.file_descriptor()?;
        let current = sys::query_settings(fd).map_err(io_failure)?;
        let updated = update(current)?;
        sys::apply_settings(fd, &updated).map_err(io_failure)
    }

    pub fn set_baud_rate(&mut self, baud_rate: BaudRate) -> Result<()> {
        self.modify_settings(|settings| settings.with_baud_rate(baud_rate))
    }

    /// # Errors
    ///
    /// Returns `SerialError::InvalidConfiguration` if the input and output
    /// speeds differ or the speed is not a known rate.
    pub fn baud_rate(&self) -> Result<BaudRate> {
        self.current_settings()?.baud_rate()
    }

    pub fn set_character_size(&mut self, character_size: CharacterSize) -> Result<()> {
        self.modify_settings(|settings| Ok(settings.with_character_size(character_size)))
    }

    pub fn character_size(&self) -> Result<CharacterSize> {
        Ok(self.current_settings()?.character_size())
    }

    /// Set flow control
    ///
    /// Queued input and output are discarded before the new setting is
    /// applied.
    pub fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<()> {
        self.flush_io_buffers()?;
        self.modify_settings(|settings| Ok(settings.with_flow_control(flow_control)))
    }

    /// # Errors
    ///
    /// Returns `SerialError::InvalidConfiguration` if the flags match none of
    /// hardware, software or no flow control.
    pub fn flow_control(&self) -> Result<FlowControl> {
        self.current_settings()?.flow_control()
    }

    pub fn set_parity(&mut self, parity: Parity) -> Result<()> {
        self.modify_settings(|settings| Ok(settings.with_parity(parity)))
    }

    pub fn parity(&self) -> Result<Parity> {
        Ok(self.current_settings()?.parity())
    }

    pub fn set_number_of_stop_bits(&mut self, stop_bits: StopBits) -> Result<()> {
        self.modify_settings(|settings| Ok(settings.with_stop_bits(stop_bits)))
    }

    pub fn number_of_stop_bits(&self) -> Result<StopBits> {
        Ok(self.current_settings()?.stop_bits())
    }

    /// Set the minimum character count for non-canonical reads
    ///
    /// # Errors
    ///
    /// - `SerialError::NotOpen` if the handle is closed
    /// - `SerialError::InvalidArgument` if `vmin` is outside 0..=255; the
    ///   device is not touched
    pub fn set_vmin(&mut self, vmin: i16) -> Result<()> {
        self.file_descriptor()?;
        let vmin = control_char_value("VMIN", vmin)?;
        self.modify_settings(|settings| Ok(settings.with_vmin(vmin)))
    }

    pub fn vmin(&self) -> Result<u8> {
        Ok(self.current_settings()?.vmin())
    }

    /// Set the non-canonical read timeout in deciseconds
    ///
    /// # Errors
    ///
    /// - `SerialError::NotOpen` if the handle is closed
    /// - `SerialError::InvalidArgument` if `vtime` is outside 0..=255; the
    ///   device is not touched
    pub fn set_vtime(&mut self, vtime: i16) -> Result<()> {
        self.file_descriptor()?;
        let vtime = control_char_value("VTIME", vtime)?;
        self.modify_settings(|settings| Ok(settings.with_vtime(vtime)))
    }

    pub fn vtime(&self) -> Result<u8> {
        Ok(self.current_settings()?.vtime())
    }
}

impl Drop for SerialDevice {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                log::warn!("closing serial device on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_is_closed() {
        let device = SerialDevice::new();
        assert!(!device.is_open());
        assert_eq!(device.file_descriptor(), Err(SerialError::NotOpen));
    }

    #[test]
    fn test_closed_device_rejects_configuration() {
        let mut device = SerialDevice::new();
        assert_eq!(device.set_baud_rate(BaudRate::Baud9600), Err(SerialError::NotOpen));
        assert_eq!(device.baud_rate(), Err(SerialError::NotOpen));
        assert_eq!(device.set_character_size(CharacterSize::Seven), Err(SerialError::NotOpen));
        assert_eq!(device.character_size(), Err(SerialError::NotOpen));
        assert_eq!(device.set_flow_control(FlowControl::Hardware), Err(SerialError::NotOpen));
        assert_eq!(device.flow_control(), Err(SerialError::NotOpen));
        assert_eq!(device.set_parity(Parity::Odd), Err(SerialError::NotOpen));
        assert_eq!(device.parity(), Err(SerialError::NotOpen));
        assert_eq!(device.set_number_of_stop_bits(StopBits::Two), Err(SerialError::NotOpen));
        assert_eq!(device.number_of_stop_bits(), Err(SerialError::NotOpen));
        assert_eq!(device.set_vmin(1), Err(SerialError::NotOpen));
        assert_eq!(device.vmin(), Err(SerialError::NotOpen));
        assert_eq!(device.set_vtime(1), Err(SerialError::NotOpen));
        assert_eq!(device.vtime(), Err(SerialError::NotOpen));
    }

    #[test]
    fn test_closed_device_rejects_out_of_range_vmin_as_not_open() {
        let mut device = SerialDevice::new();
        assert_eq!(device.set_vmin(1000), Err(SerialError::NotOpen));
    }

    #[test]
    fn test_closed_device_rejects_lifecycle_calls() {
        let mut device = SerialDevice::new();
        assert_eq!(device.close(), Err(SerialError::NotOpen));
        assert_eq!(device.flush_input_buffer(), Err(SerialError::NotOpen));
        assert_eq!(device.flush_output_buffer(), Err(SerialError::NotOpen));
        assert_eq!(device.flush_io_buffers(), Err(SerialError::NotOpen));
        assert_eq!(device.is_data_available(), Err(SerialError::NotOpen));
        assert_eq!(device.is_blocking(), Err(SerialError::NotOpen));
        assert_eq!(device.set_parameters_to_default(), Err(SerialError::NotOpen));
    }

    #[test]
    fn test_open_with_empty_mode_is_a_no_op() {
        let mut device = SerialDevice::new();
        assert_eq!(device.open("/nonexistent/serial", OpenMode::empty()), Ok(()));
        assert!(!device.is_open());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let mut device = SerialDevice::new();
        let result = device.open("/nonexistent/serial", OpenMode::default());
        assert!(matches!(result, Err(SerialError::OpenFailed(_))));
        assert!(!device.is_open());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_failed_initialisation_leaves_handle_closed() {
        use nix::fcntl::OFlag;
        use nix::pty::{grantpt, posix_openpt, ptsname_r, unlockpt};

        let Ok(master) = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY) else {
            return;
        };
        grantpt(&master).unwrap();
        unlockpt(&master).unwrap();
        let slave_path = ptsname_r(&master).unwrap();
        let before = sys::query_settings(master.as_raw_fd()).unwrap();

        let mut device = SerialDevice::new();
        device.open(&slave_path, OpenMode::default()).unwrap();
        device.set_baud_rate(BaudRate::Baud1200).unwrap();

        device.release_after_failed_open();

        assert!(!device.is_open());
        assert_eq!(device.file_descriptor(), Err(SerialError::NotOpen));
        assert_eq!(sys::query_settings(master.as_raw_fd()).unwrap(), before);
        device.open(&slave_path, OpenMode::default()).unwrap();
        assert!(device.is_open());
    }

    #[test]
    fn test_open_regular_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut device = SerialDevice::new();
        let result = device.open(file.path(), OpenMode::default());
        assert!(matches!(result, Err(SerialError::OpenFailed(_))));
        assert!(!device.is_open());
    }
}
