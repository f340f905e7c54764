use crossterm::event::KeyCode as CrosstermKey;
use device_query::Keycode as DeviceKey;

/// A physical key on the conventional 4×4 CHIP-8 layout:
///
/// ```text
///   1 2 3 4        1 2 3 C
///   Q W E R   ->   4 5 6 D
///   A S D F        7 8 9 E
///   Z X C V        A 0 B F
/// ```
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Key {
    One,
    Two,
    Three,
    Four,
    Q,
    W,
    E,
    R,
    A,
    S,
    D,
    F,
    Z,
    X,
    C,
    V,
}

impl Key {
    /// The keypad index (0x0-0xF) this key maps to.
    pub fn to_code(self) -> u8 {
        match self {
            Key::One => 0x1,
            Key::Two => 0x2,
            Key::Three => 0x3,
            Key::Four => 0xC,
            Key::Q => 0x4,
            Key::W => 0x5,
            Key::E => 0x6,
            Key::R => 0xD,
            Key::A => 0x7,
            Key::S => 0x8,
            Key::D => 0x9,
            Key::F => 0xE,
            Key::Z => 0xA,
            Key::X => 0x0,
            Key::C => 0xB,
            Key::V => 0xF,
        }
    }

    fn from_char(c: char) -> Result<Self, &'static str> {
        match c.to_ascii_uppercase() {
            '1' => Ok(Key::One),
            '2' => Ok(Key::Two),
            '3' => Ok(Key::Three),
            '4' => Ok(Key::Four),
            'Q' => Ok(Key::Q),
            'W' => Ok(Key::W),
            'E' => Ok(Key::E),
            'R' => Ok(Key::R),
            'A' => Ok(Key::A),
            'S' => Ok(Key::S),
            'D' => Ok(Key::D),
            'F' => Ok(Key::F),
            'Z' => Ok(Key::Z),
            'X' => Ok(Key::X),
            'C' => Ok(Key::C),
            'V' => Ok(Key::V),
            _ => Err("not a keypad key"),
        }
    }
}

impl TryFrom<CrosstermKey> for Key {
    type Error = &'static str;
    fn try_from(key: CrosstermKey) -> Result<Self, Self::Error> {
        match key {
            CrosstermKey::Char(c) => Key::from_char(c),
            _ => Err("not a keypad key"),
        }
    }
}

impl TryFrom<DeviceKey> for Key {
    type Error = &'static str;
    fn try_from(key: DeviceKey) -> Result<Self, Self::Error> {
        match key {
            DeviceKey::Key1 => Ok(Key::One),
            DeviceKey::Key2 => Ok(Key::Two),
            DeviceKey::Key3 => Ok(Key::Three),
            DeviceKey::Key4 => Ok(Key::Four),
            DeviceKey::Q => Ok(Key::Q),
            DeviceKey::W => Ok(Key::W),
            DeviceKey::E => Ok(Key::E),
            DeviceKey::R => Ok(Key::R),
            DeviceKey::A => Ok(Key::A),
            DeviceKey::S => Ok(Key::S),
            DeviceKey::D => Ok(Key::D),
            DeviceKey::F => Ok(Key::F),
            DeviceKey::Z => Ok(Key::Z),
            DeviceKey::X => Ok(Key::X),
            DeviceKey::C => Ok(Key::C),
            DeviceKey::V => Ok(Key::V),
            _ => Err("not a keypad key"),
        }
    }
}

/// The 16-key input latch, one bit per keypad index.
///
/// The driver writes level state through `set_key`; the interpreter only
/// ever reads. No debouncing, no edge detection.
#[derive(Debug, Default, Clone, Copy)]
pub struct Keypad {
    down: u16,
}

impl Keypad {
    pub fn set_key(&mut self, code: u8, pressed: bool) {
        if pressed {
            self.down |= 1 << (code & 0xF);
        } else {
            self.down &= !(1 << (code & 0xF));
        }
    }

    pub fn is_down(&self, code: u8) -> bool {
        self.down >> (code & 0xF) & 1 == 1
    }

    /// The lowest pressed keypad index, if any.
    pub fn first_down(&self) -> Option<u8> {
        if self.down == 0 {
            None
        } else {
            Some(self.down.trailing_zeros() as u8)
        }
    }
}
