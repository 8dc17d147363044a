//! Settings Module
//!
//! Semantic serial line parameters and the default port configuration.
//! These types carry no platform encoding; [`TermiosSnapshot`] maps them onto
//! line-discipline bits.
//!
//! [`TermiosSnapshot`]: crate::snapshot::TermiosSnapshot

use crate::error::{Result, SerialError};

/// XON control character (^Q), restarts output under software flow control
pub const CTRL_Q: u8 = 0x11;

/// XOFF control character (^S), suspends output under software flow control
pub const CTRL_S: u8 = 0x13;

/// Default minimum character count for non-canonical reads
pub const VMIN_DEFAULT: u8 = 0;

/// Default non-canonical read timeout in deciseconds
pub const VTIME_DEFAULT: u8 = 0;

/// Line speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    Baud50,
    Baud75,
    Baud110,
    Baud134,
    Baud150,
    Baud200,
    Baud300,
    Baud600,
    Baud1200,
    Baud1800,
    Baud2400,
    Baud4800,
    Baud9600,
    Baud19200,
    Baud38400,
    Baud57600,
    Baud115200,
    Baud230400,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud460800,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud576000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud921600,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud1000000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud1152000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud1500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud2000000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud2500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud3000000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud3500000,
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Baud4000000,
}

impl BaudRate {
    /// Every rate supported on this platform, slowest first
    pub const ALL: &'static [BaudRate] = &[
        BaudRate::Baud50,
        BaudRate::Baud75,
        BaudRate::Baud110,
        BaudRate::Baud134,
        BaudRate::Baud150,
        BaudRate::Baud200,
        BaudRate::Baud300,
        BaudRate::Baud600,
        BaudRate::Baud1200,
        BaudRate::Baud1800,
        BaudRate::Baud2400,
        BaudRate::Baud4800,
        BaudRate::Baud9600,
        BaudRate::Baud19200,
        BaudRate::Baud38400,
        BaudRate::Baud57600,
        BaudRate::Baud115200,
        BaudRate::Baud230400,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud460800,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud576000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud921600,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud1000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud1152000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud1500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud2000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud2500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud3000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud3500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::Baud4000000,
    ];

    /// Line speed in bits per second
    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::Baud50 => 50,
            BaudRate::Baud75 => 75,
            BaudRate::Baud110 => 110,
            BaudRate::Baud134 => 134,
            BaudRate::Baud150 => 150,
            BaudRate::Baud200 => 200,
            BaudRate::Baud300 => 300,
            BaudRate::Baud600 => 600,
            BaudRate::Baud1200 => 1200,
            BaudRate::Baud1800 => 1800,
            BaudRate::Baud2400 => 2400,
            BaudRate::Baud4800 => 4800,
            BaudRate::Baud9600 => 9600,
            BaudRate::Baud19200 => 19200,
            BaudRate::Baud38400 => 38400,
            BaudRate::Baud57600 => 57600,
            BaudRate::Baud115200 => 115_200,
            BaudRate::Baud230400 => 230_400,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud460800 => 460_800,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud500000 => 500_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud576000 => 576_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud921600 => 921_600,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1000000 => 1_000_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1152000 => 1_152_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud1500000 => 1_500_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud2000000 => 2_000_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud2500000 => 2_500_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud3000000 => 3_000_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud3500000 => 3_500_000,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            BaudRate::Baud4000000 => 4_000_000,
        }
    }

    /// Look up a rate by its bits-per-second value
    ///
    /// # Errors
    ///
    /// Returns `SerialError::InvalidArgument` if the platform has no such rate.
    pub fn from_bits_per_second(bps: u32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|rate| rate.bits_per_second() == bps)
            .ok_or_else(|| SerialError::InvalidArgument(format!("unsupported baud rate {}", bps)))
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate::Baud115200
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharacterSize {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl CharacterSize {
    pub const ALL: [CharacterSize; 4] = [
        CharacterSize::Five,
        CharacterSize::Six,
        CharacterSize::Seven,
        CharacterSize::Eight,
    ];

    pub fn bits(self) -> u8 {
        match self {
            CharacterSize::Five => 5,
            CharacterSize::Six => 6,
            CharacterSize::Seven => 7,
            CharacterSize::Eight => 8,
        }
    }
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    Even,
    Odd,
    #[default]
    None,
}

impl Parity {
    pub const ALL: [Parity; 3] = [Parity::Even, Parity::Odd, Parity::None];
}

/// Stop bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl StopBits {
    pub const ALL: [StopBits; 2] = [StopBits::One, StopBits::Two];
}

/// Flow control
///
/// Hardware flow control uses the RTS/CTS lines, software flow control uses
/// the XON/XOFF characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowControl {
    Hardware,
    Software,
    #[default]
    None,
}

impl FlowControl {
    pub const ALL: [FlowControl; 3] = [
        FlowControl::Hardware,
        FlowControl::Software,
        FlowControl::None,
    ];
}

bitflags::bitflags! {
    /// Direction(s) a port is opened for
    ///
    /// Only `READ | WRITE`, `READ` and `WRITE` open a device. Any other
    /// combination makes open a no-op.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
    }
}

impl Default for OpenMode {
    fn default() -> Self {
        OpenMode::READ | OpenMode::WRITE
    }
}

/// Full set of line parameters applied to a port
///
/// `Default` gives the baseline configuration: 115200 baud, 8 data bits,
/// no flow control, no parity, one stop bit and VMIN = VTIME = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortSettings {
    pub baud_rate: BaudRate,
    pub character_size: CharacterSize,
    pub flow_control: FlowControl,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Minimum characters for a non-canonical read
    pub vmin: u8,
    /// Non-canonical read timeout in deciseconds
    pub vtime: u8,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baud_rate: BaudRate::default(),
            character_size: CharacterSize::default(),
            flow_control: FlowControl::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            vmin: VMIN_DEFAULT,
            vtime: VTIME_DEFAULT,
        }
    }
}

impl PortSettings {
    pub fn with_baud_rate(mut self, baud_rate: BaudRate) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_character_size(mut self, character_size: CharacterSize) -> Self {
        self.character_size = character_size;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_vmin(mut self, vmin: u8) -> Self {
        self.vmin = vmin;
        self
    }

    pub fn with_vtime(mut self, vtime: u8) -> Self {
        self.vtime = vtime;
        self
    }
}

/// Validate a VMIN/VTIME value
///
/// Control-character slots hold one byte, so only 0..=255 is accepted.
///
/// # Arguments
///
/// * `name` - Parameter name used in the error message
/// * `value` - Requested value
///
/// # Errors
///
/// Returns `SerialError::InvalidArgument` if `value` is outside 0..=255.
pub fn control_char_value(name: &str, value: i16) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| SerialError::InvalidArgument(format!("{} {} outside 0..=255", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_rate_bps_lookup() {
        for rate in BaudRate::ALL {
            assert_eq!(BaudRate::from_bits_per_second(rate.bits_per_second()), Ok(*rate));
        }
        assert_eq!(
            BaudRate::from_bits_per_second(9600),
            Ok(BaudRate::Baud9600)
        );
    }

    #[test]
    fn test_baud_rate_unknown_bps() {
        let result = BaudRate::from_bits_per_second(12345);
        assert!(matches!(result, Err(SerialError::InvalidArgument(_))));
    }

    #[test]
    fn test_character_size_bits() {
        let bits: Vec<u8> = CharacterSize::ALL.iter().map(|c| c.bits()).collect();
        assert_eq!(bits, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_default_port_settings() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud_rate, BaudRate::Baud115200);
        assert_eq!(settings.character_size, CharacterSize::Eight);
        assert_eq!(settings.flow_control, FlowControl::None);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.vmin, 0);
        assert_eq!(settings.vtime, 0);
    }

    #[test]
    fn test_port_settings_builder() {
        let settings = PortSettings::default()
            .with_baud_rate(BaudRate::Baud9600)
            .with_character_size(CharacterSize::Seven)
            .with_parity(Parity::Even)
            .with_stop_bits(StopBits::Two)
            .with_flow_control(FlowControl::Software)
            .with_vmin(1)
            .with_vtime(5);
        assert_eq!(settings.baud_rate, BaudRate::Baud9600);
        assert_eq!(settings.character_size, CharacterSize::Seven);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert_eq!(settings.flow_control, FlowControl::Software);
        assert_eq!(settings.vmin, 1);
        assert_eq!(settings.vtime, 5);
    }

    #[test]
    fn test_open_mode_default_is_read_write() {
        assert_eq!(OpenMode::default(), OpenMode::READ | OpenMode::WRITE);
        assert!(OpenMode::empty().is_empty());
    }

    #[test]
    fn test_control_char_value_range() {
        assert_eq!(control_char_value("VMIN", 0), Ok(0));
        assert_eq!(control_char_value("VMIN", 255), Ok(255));
        assert!(matches!(
            control_char_value("VMIN", 256),
            Err(SerialError::InvalidArgument(_))
        ));
        assert!(matches!(
            control_char_value("VTIME", -1),
            Err(SerialError::InvalidArgument(_))
        ));
    }
}
