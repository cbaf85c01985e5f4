use serde::{Deserialize, Serialize};

/// Number of output slots a trigger configuration can address.
pub const MAX_TRIGGER_PINS: usize = 6;

/// Ordered set of PWM channels assigned to the camera trigger.
///
/// Decoded once from the digit-encoded `trig_pins` configuration integer and
/// immutable afterward. Duplicate channels are allowed; each slot is driven
/// independently on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerPins {
    slots: [Option<u8>; MAX_TRIGGER_PINS],
}

impl TriggerPins {
    /// Decode a pin assignment from its compact numeric encoding.
    ///
    /// Each base-10 digit, read least-significant first, assigns channel
    /// `digit - 1` to the next output slot. A zero digit terminates
    /// decoding, so a zero in the middle of the number silently truncates
    /// all later slots. That is a long-standing quirk of the encoding, not
    /// something callers should try to compensate for. `decode(0)` yields
    /// an all-unassigned set; there is no error path.
    pub fn decode(config: u32) -> Self {
        let mut slots = [None; MAX_TRIGGER_PINS];
        let mut remaining = config;
        for slot in slots.iter_mut() {
            let digit = remaining % 10;
            if digit == 0 {
                break;
            }
            *slot = Some((digit - 1) as u8);
            remaining /= 10;
        }
        Self { slots }
    }

    /// Assigned channels in slot order.
    pub fn assigned(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    pub fn slots(&self) -> &[Option<u8>; MAX_TRIGGER_PINS] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_two_pins() {
        // 12 reads least-significant first as digits 2, 1: channel 1 in
        // slot 0, channel 0 in slot 1.
        let pins = TriggerPins::decode(12);
        assert_eq!(pins.slots()[..2], [Some(1), Some(0)]);
        assert!(pins.slots()[2..].iter().all(|slot| slot.is_none()));
    }

    #[test]
    fn test_decode_default_assignment() {
        // The stock airframe assignment: channels 5 and 4.
        let pins = TriggerPins::decode(56);
        assert_eq!(pins.assigned().collect::<Vec<_>>(), vec![5, 4]);
    }

    #[test]
    fn test_decode_zero_is_all_unassigned() {
        assert!(TriggerPins::decode(0).is_empty());
    }

    #[test]
    fn test_mid_zero_truncates_later_slots() {
        // Digits LSB-first: 3, 0, 2. The zero stops decoding, losing the 2.
        let pins = TriggerPins::decode(203);
        assert_eq!(pins.assigned().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let pins = TriggerPins::decode(33);
        assert_eq!(pins.assigned().collect::<Vec<_>>(), vec![2, 2]);
    }

    #[test]
    fn test_decode_never_exceeds_digits_before_first_zero() {
        for config in [0u32, 1, 9, 10, 56, 101, 123456, 999999, 4_294_967_295] {
            let pins = TriggerPins::decode(config);
            let mut digits = Vec::new();
            let mut remaining = config;
            while remaining % 10 != 0 {
                digits.push(remaining % 10);
                remaining /= 10;
                if digits.len() == MAX_TRIGGER_PINS {
                    break;
                }
            }
            assert_eq!(pins.assigned().count(), digits.len(), "config {config}");
            for (channel, digit) in pins.assigned().zip(digits.iter()) {
                assert!((1..=9).contains(digit));
                assert_eq!(channel as u32, digit - 1);
            }
        }
    }

    #[test]
    fn test_capacity_limit() {
        // More digits than slots: decoding stops at capacity.
        let pins = TriggerPins::decode(87654321);
        assert_eq!(pins.assigned().count(), MAX_TRIGGER_PINS);
        assert_eq!(pins.assigned().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }
}
