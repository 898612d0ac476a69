use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Wire command carried by the LED characteristic. Exactly these two byte
/// values are accepted; everything else is rejected with value-not-allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    Deactivate = 0x00,
    Activate = 0x01,
}

impl Command {
    pub fn is_active(self) -> bool {
        matches!(self, Command::Activate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_the_two_legal_bytes() {
        assert_eq!(Command::try_from(0x00).unwrap(), Command::Deactivate);
        assert_eq!(Command::try_from(0x01).unwrap(), Command::Activate);
        assert!(!Command::Deactivate.is_active());
        assert!(Command::Activate.is_active());
    }

    #[test]
    fn rejects_everything_else() {
        for byte in [0x02u8, 0x10, 0x7f, 0xff] {
            assert!(Command::try_from(byte).is_err());
        }
    }

    #[test]
    fn round_trips_to_wire_bytes() {
        assert_eq!(u8::from(Command::Deactivate), 0x00);
        assert_eq!(u8::from(Command::Activate), 0x01);
    }
}
