//! Snapshot Module
//!
//! Value copy of the OS line-discipline structure (`termios`) together with
//! the pure functions that encode semantic line parameters into its bit
//! fields and decode them back.
//!
//! A configuration change is a read-modify-write transaction: the adapter
//! queries a snapshot from the device, one `with_*` function rewrites only
//! the bits belonging to its parameter, and the result is applied in one call.
//! Nothing in this module touches a file descriptor.

use std::fmt;

use crate::error::{Result, SerialError};
use crate::settings::{BaudRate, CharacterSize, FlowControl, Parity, StopBits, CTRL_Q, CTRL_S};

/// Value that disables a special control character (`_POSIX_VDISABLE`)
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const DISABLED_CONTROL_CHAR: libc::cc_t = 0;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const DISABLED_CONTROL_CHAR: libc::cc_t = 0xff;

fn speed_of(rate: BaudRate) -> libc::speed_t {
    match rate {
        BaudRate::Baud50 => libc::B50,
        BaudRate::Baud75 => libc::B75,
        BaudRate::Baud110 => libc::B110,
        BaudRate::Baud134 => libc::B134,
        BaudRate::Baud150 => libc::B150,
        BaudRate::Baud200 => libc::B200,
        BaudRate::Baud300 => libc::B300,
        BaudRate::Baud600 => libc::B600,
        BaudRate::Baud1200 => libc::B1200,
        BaudRate::Baud1800 => libc::B1800,
        BaudRate::Baud2400 => libc::B2400,
        BaudRate::Baud4800 => libc::B4800,
        BaudRate::Baud9600 => libc::B9600,
        BaudRate::Baud19200 => libc::B19200,
        BaudRate::Baud38400 => libc::B38400,
        BaudRate::Baud57600 => libc::B57600,
        BaudRate::Baud115200 => libc::B115200,
        BaudRate::Baud230400 => libc::B230400,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud460800 => libc::B460800,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud500000 => libc::B500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud576000 => libc::B576000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud921600 => libc::B921600,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud1000000 => libc::B1000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud1152000 => libc::B1152000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud1500000 => libc::B1500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud2000000 => libc::B2000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud2500000 => libc::B2500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud3000000 => libc::B3000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud3500000 => libc::B3500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud4000000 => libc::B4000000,
    }
}

fn rate_of(speed: libc::speed_t) -> Option<BaudRate> {
    BaudRate::ALL
        .iter()
        .copied()
        .find(|rate| speed_of(*rate) == speed)
}

fn size_flag(size: CharacterSize) -> libc::tcflag_t {
    match size {
        CharacterSize::Five => libc::CS5,
        CharacterSize::Six => libc::CS6,
        CharacterSize::Seven => libc::CS7,
        CharacterSize::Eight => libc::CS8,
    }
}

/// Snapshot of a device's line-discipline settings
#[derive(Clone, Copy)]
pub struct TermiosSnapshot {
    raw: libc::termios,
}

impl TermiosSnapshot {
    /// All-zero settings
    pub fn zeroed() -> Self {
        // SAFETY: termios is a plain C struct of integers and byte arrays,
        // all-zero is a valid value for every field.
        let raw = unsafe { std::mem::zeroed::<libc::termios>() };
        Self { raw }
    }

    pub fn from_raw(raw: libc::termios) -> Self {
        Self { raw }
    }

    pub fn as_raw(&self) -> &libc::termios {
        &self.raw
    }

    pub fn into_raw(self) -> libc::termios {
        self.raw
    }

    pub fn input_flags(&self) -> libc::tcflag_t {
        self.raw.c_iflag
    }

    pub fn output_flags(&self) -> libc::tcflag_t {
        self.raw.c_oflag
    }

    pub fn control_flags(&self) -> libc::tcflag_t {
        self.raw.c_cflag
    }

    pub fn local_flags(&self) -> libc::tcflag_t {
        self.raw.c_lflag
    }

    pub fn control_chars(&self) -> &[libc::cc_t] {
        &self.raw.c_cc
    }

    /// Settings applied immediately after the device is opened
    ///
    /// Receiver enabled, modem control lines ignored, everything else
    /// cleared, and VMIN = VTIME = 0 so reads return whatever is queued.
    pub fn receiver_enabled() -> Self {
        let mut snapshot = Self::zeroed();
        snapshot.raw.c_cflag = libc::CREAD | libc::CLOCAL;
        snapshot.raw.c_cc[libc::VMIN] = 0;
        snapshot.raw.c_cc[libc::VTIME] = 0;
        snapshot
    }

    /// Baseline configuration
    ///
    /// Input processing reduced to ignoring breaks, output and local
    /// processing cleared, 8-bit characters with receiver enabled and modem
    /// lines ignored, VMIN = VTIME = 0, and the default line speed.
    ///
    /// # Errors
    ///
    /// Returns `SerialError::InvalidArgument` if the platform rejects the
    /// default line speed.
    pub fn with_baseline(mut self) -> Result<Self> {
        self.raw.c_iflag = libc::IGNBRK;
        self.raw.c_oflag = 0;
        self.raw.c_cflag = libc::CS8 | libc::CLOCAL | libc::CREAD;
        self.raw.c_lflag = 0;
        // c_line is a Linux extension
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            self.raw.c_line = 0;
        }
        self.raw.c_cc[libc::VMIN] = 0;
        self.raw.c_cc[libc::VTIME] = 0;
        self.with_baud_rate(BaudRate::default())
    }

    /// Set input and output line speed
    ///
    /// # Errors
    ///
    /// Returns `SerialError::InvalidArgument` if the platform rejects the speed.
    pub fn with_baud_rate(mut self, rate: BaudRate) -> Result<Self> {
        let speed = speed_of(rate);
        // SAFETY: both calls only write into the termios value we own.
        let (input, output) = unsafe {
            (
                libc::cfsetispeed(&mut self.raw, speed),
                libc::cfsetospeed(&mut self.raw, speed),
            )
        };
        if input < 0 || output < 0 {
            return Err(SerialError::InvalidArgument(format!(
                "baud rate {} rejected",
                rate.bits_per_second()
            )));
        }
        Ok(self)
    }

    /// Decode the line speed
    ///
    /// # Errors
    ///
    /// Returns `SerialError::InvalidConfiguration` if input and output speeds
    /// differ or the speed is not a known rate.
    pub fn baud_rate(&self) -> Result<BaudRate> {
        let (input, output) = self.speeds();
        if input != output {
            return Err(SerialError::InvalidConfiguration(format!(
                "input speed {:#o} differs from output speed {:#o}",
                input, output
            )));
        }
        rate_of(input).ok_or_else(|| {
            SerialError::InvalidConfiguration(format!("unrecognised line speed {:#o}", input))
        })
    }

    /// Set data bits per character
    ///
    /// ISTRIP is cleared for 8-bit characters and set otherwise, so the bits
    /// above a narrow character arrive as zero instead of line noise.
    pub fn with_character_size(mut self, size: CharacterSize) -> Self {
        if size == CharacterSize::Eight {
            self.raw.c_iflag &= !libc::ISTRIP;
        } else {
            self.raw.c_iflag |= libc::ISTRIP;
        }
        self.raw.c_cflag &= !libc::CSIZE;
        self.raw.c_cflag |= size_flag(size);
        self
    }

    pub fn character_size(&self) -> CharacterSize {
        let bits = self.raw.c_cflag & libc::CSIZE;
        CharacterSize::ALL
            .iter()
            .copied()
            .find(|size| size_flag(*size) == bits)
            .unwrap_or(CharacterSize::Eight)
    }

    /// Set flow control
    ///
    /// Hardware: RTS/CTS on, XON/XOFF off and the start/stop characters
    /// disabled. Software: XON/XOFF on with ^Q/^S, RTS/CTS off. None: both off.
    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        match flow_control {
            FlowControl::Hardware => {
                self.raw.c_iflag &= !(libc::IXON | libc::IXOFF);
                self.raw.c_cflag |= libc::CRTSCTS;
                self.raw.c_cc[libc::VSTART] = DISABLED_CONTROL_CHAR;
                self.raw.c_cc[libc::VSTOP] = DISABLED_CONTROL_CHAR;
            }
            FlowControl::Software => {
                self.raw.c_iflag |= libc::IXON | libc::IXOFF;
                self.raw.c_cflag &= !libc::CRTSCTS;
                self.raw.c_cc[libc::VSTART] = CTRL_Q;
                self.raw.c_cc[libc::VSTOP] = CTRL_S;
            }
            FlowControl::None => {
                self.raw.c_iflag &= !(libc::IXON | libc::IXOFF);
                self.raw.c_cflag &= !libc::CRTSCTS;
            }
        }
        self
    }

    /// Decode flow control
    ///
    /// Checked in order: software (IXON and IXOFF with ^Q/^S start/stop),
    /// then, with neither IXON nor IXOFF set, hardware if CRTSCTS is set and
    /// none otherwise.
    ///
    /// # Errors
    ///
    /// Returns `SerialError::InvalidConfiguration` for any other combination,
    /// e.g. only one of IXON/IXOFF set.
    pub fn flow_control(&self) -> Result<FlowControl> {
        let iflag = self.raw.c_iflag;
        let ixon = iflag & libc::IXON != 0;
        let ixoff = iflag & libc::IXOFF != 0;

        if ixon
            && ixoff
            && self.raw.c_cc[libc::VSTART] == CTRL_Q
            && self.raw.c_cc[libc::VSTOP] == CTRL_S
        {
            return Ok(FlowControl::Software);
        }
        if !ixon && !ixoff {
            if self.raw.c_cflag & libc::CRTSCTS != 0 {
                return Ok(FlowControl::Hardware);
            }
            return Ok(FlowControl::None);
        }
        Err(SerialError::InvalidConfiguration(format!(
            "unsupported flow control (c_iflag {:#x}, VSTART {:#x}, VSTOP {:#x})",
            iflag,
            self.raw.c_cc[libc::VSTART],
            self.raw.c_cc[libc::VSTOP]
        )))
    }

    /// Set parity
    ///
    /// Even/odd enable parity generation and input checking together; none
    /// disables both and ignores parity errors instead.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        match parity {
            Parity::Even => {
                self.raw.c_cflag |= libc::PARENB;
                self.raw.c_cflag &= !libc::PARODD;
                self.raw.c_iflag |= libc::INPCK;
                self.raw.c_iflag &= !libc::IGNPAR;
            }
            Parity::Odd => {
                self.raw.c_cflag |= libc::PARENB | libc::PARODD;
                self.raw.c_iflag |= libc::INPCK;
                self.raw.c_iflag &= !libc::IGNPAR;
            }
            Parity::None => {
                self.raw.c_cflag &= !(libc::PARENB | libc::PARODD);
                self.raw.c_iflag &= !libc::INPCK;
                self.raw.c_iflag |= libc::IGNPAR;
            }
        }
        self
    }

    pub fn parity(&self) -> Parity {
        if self.raw.c_cflag & libc::PARENB == 0 {
            Parity::None
        } else if self.raw.c_cflag & libc::PARODD != 0 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        match stop_bits {
            StopBits::One => self.raw.c_cflag &= !libc::CSTOPB,
            StopBits::Two => self.raw.c_cflag |= libc::CSTOPB,
        }
        self
    }

    pub fn stop_bits(&self) -> StopBits {
        if self.raw.c_cflag & libc::CSTOPB != 0 {
            StopBits::Two
        } else {
            StopBits::One
        }
    }

    /// Set the minimum character count for non-canonical reads
    pub fn with_vmin(mut self, vmin: u8) -> Self {
        self.raw.c_cc[libc::VMIN] = vmin;
        self
    }

    pub fn vmin(&self) -> u8 {
        self.raw.c_cc[libc::VMIN]
    }

    /// Set the non-canonical read timeout, in deciseconds
    pub fn with_vtime(mut self, vtime: u8) -> Self {
        self.raw.c_cc[libc::VTIME] = vtime;
        self
    }

    pub fn vtime(&self) -> u8 {
        self.raw.c_cc[libc::VTIME]
    }

    fn speeds(&self) -> (libc::speed_t, libc::speed_t) {
        // SAFETY: both calls only read the termios value.
        unsafe { (libc::cfgetispeed(&self.raw), libc::cfgetospeed(&self.raw)) }
    }
}

impl Default for TermiosSnapshot {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl PartialEq for TermiosSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.raw.c_iflag == other.raw.c_iflag
            && self.raw.c_oflag == other.raw.c_oflag
            && self.raw.c_cflag == other.raw.c_cflag
            && self.raw.c_lflag == other.raw.c_lflag
            && self.raw.c_cc == other.raw.c_cc
            && self.speeds() == other.speeds()
    }
}

impl Eq for TermiosSnapshot {}

impl fmt::Debug for TermiosSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ispeed, ospeed) = self.speeds();
        f.debug_struct("TermiosSnapshot")
            .field("c_iflag", &format_args!("{:#x}", self.raw.c_iflag))
            .field("c_oflag", &format_args!("{:#x}", self.raw.c_oflag))
            .field("c_cflag", &format_args!("{:#x}", self.raw.c_cflag))
            .field("c_lflag", &format_args!("{:#x}", self.raw.c_lflag))
            .field("c_cc", &self.raw.c_cc)
            .field("ispeed", &ispeed)
            .field("ospeed", &ospeed)
            .finish()
    }
}
