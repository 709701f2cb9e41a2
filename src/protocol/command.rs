//! Command encoding for the robot's control channel
//!
//! Commands are short ASCII lines derived from the current drive state.
//! The robot splits its inbound stream on `\n` and parses each line as
//! either `<mode*10+sub_mode>` or, in manual mode,
//! `<mode*10+sub_mode>;<power>;<button>`.

/// Operating mode of the robot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Motors stopped, waiting for orders
    #[default]
    Stopped = 0,
    /// Direct driving via direction buttons and the power setting
    Manual = 1,
    /// Autonomous line following
    LineFollow = 2,
    /// Autonomous color tracking
    ColorFollow = 3,
    /// Pre-programmed figure execution
    Figure = 4,
}

impl Mode {
    /// Wire code for this mode (the tens digit of the command)
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Parse a wire code back into a mode
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Mode::Stopped),
            1 => Some(Mode::Manual),
            2 => Some(Mode::LineFollow),
            3 => Some(Mode::ColorFollow),
            4 => Some(Mode::Figure),
            _ => None,
        }
    }

    /// Whether direction buttons and the power slider apply
    pub fn is_manual(&self) -> bool {
        matches!(self, Mode::Manual)
    }
}

/// Direction buttons available in manual mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    /// Sub-mode value transmitted for this direction
    pub fn sub_mode(&self) -> u8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => 2,
            Direction::Left => 3,
            Direction::Right => 4,
        }
    }
}

/// Maximum power value (percent)
pub const MAX_POWER: u8 = 100;

/// The state a command line is derived from
///
/// Mutated only by the session's foreground methods; every send rebuilds
/// the line from scratch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveState {
    pub mode: Mode,
    pub sub_mode: u8,
    pub power: u8,
    pub button_pressed: bool,
}

impl DriveState {
    /// Switch mode. Sub-mode always resets with the mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.sub_mode = 0;
    }

    /// Update the power setting, clamped to 0..=100
    pub fn set_power(&mut self, power: u8) {
        self.power = power.min(MAX_POWER);
    }

    /// Build the command line for the current state, without the
    /// terminating newline (the writer appends it).
    pub fn command(&self) -> String {
        let segment = self.mode.code() as u16 * 10 + self.sub_mode as u16;
        if self.mode.is_manual() {
            format!("{};{};{}", segment, self.power, u8::from(self.button_pressed))
        } else {
            format!("{}", segment)
        }
    }
}
