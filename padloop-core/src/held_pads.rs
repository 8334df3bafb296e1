//! Fixed-capacity set of held pads.
//!
//! Membership is a bitmask; a dense array keeps press order. Bit `i` is set
//! exactly when pad `i` appears once in `order[..count]`.

use padloop_types::{PadId, PAD_COUNT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldPads {
    mask: u16,
    order: [u8; PAD_COUNT],
    count: u8,
}

impl HeldPads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pad. Returns `false` if it was already held.
    pub fn insert(&mut self, pad: PadId) -> bool {
        let bit = 1u16 << pad.get();
        if self.mask & bit != 0 {
            return false;
        }
        self.mask |= bit;
        self.order[self.count as usize] = pad.get();
        self.count += 1;
        true
    }

    /// Remove a pad. Returns `false` if it was not held.
    pub fn remove(&mut self, pad: PadId) -> bool {
        let bit = 1u16 << pad.get();
        if self.mask & bit == 0 {
            return false;
        }
        self.mask &= !bit;
        let len = self.count as usize;
        if let Some(pos) = self.order[..len].iter().position(|&p| p == pad.get()) {
            self.order.copy_within(pos + 1..len, pos);
        }
        self.count -= 1;
        self.order[self.count as usize] = 0;
        true
    }

    pub fn contains(&self, pad: PadId) -> bool {
        self.mask & (1u16 << pad.get()) != 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mask(&self) -> u16 {
        self.mask
    }

    /// Held pads in the order they were pressed.
    pub fn press_order(&self) -> impl Iterator<Item = PadId> + '_ {
        self.order[..self.len()].iter().filter_map(|&p| PadId::new(p))
    }

    /// Copy the held pads into `out` sorted ascending by `pitch`, returning how
    /// many were written. Ties fall back to pad id order.
    pub fn sorted_by_pitch<F>(&self, out: &mut [PadId; PAD_COUNT], pitch: F) -> usize
    where
        F: Fn(PadId) -> u8,
    {
        let mut n = 0;
        for pad in PadId::all() {
            if self.contains(pad) {
                out[n] = pad;
                n += 1;
            }
        }
        out[..n].sort_unstable_by_key(|&p| (pitch(p), p));
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(id: u8) -> PadId {
        PadId::new(id).unwrap()
    }

    fn assert_consistent(set: &HeldPads) {
        assert_eq!(set.len() as u32, set.mask().count_ones());
        for p in set.press_order() {
            assert!(set.contains(p));
        }
        assert_eq!(set.press_order().count(), set.len());
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set = HeldPads::new();
        assert!(set.insert(pad(3)));
        assert!(!set.insert(pad(3)));
        assert_eq!(set.len(), 1);
        assert_consistent(&set);
    }

    #[test]
    fn remove_keeps_press_order() {
        let mut set = HeldPads::new();
        for id in [5, 1, 9, 2] {
            set.insert(pad(id));
        }
        assert!(set.remove(pad(1)));
        assert!(!set.remove(pad(1)));
        let order: Vec<u8> = set.press_order().map(PadId::get).collect();
        assert_eq!(order, vec![5, 9, 2]);
        assert_consistent(&set);
    }

    #[test]
    fn count_matches_mask_over_arbitrary_sequences() {
        let mut set = HeldPads::new();
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..2_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let p = pad(((seed >> 16) % 12) as u8);
            if seed & 1 == 0 {
                set.insert(p);
            } else {
                set.remove(p);
            }
            assert_consistent(&set);
        }
    }

    #[test]
    fn all_twelve_fit() {
        let mut set = HeldPads::new();
        for p in PadId::all() {
            set.insert(p);
        }
        assert_eq!(set.len(), 12);
        assert_eq!(set.mask(), 0x0fff);
    }

    #[test]
    fn sorted_by_pitch_orders_by_note_not_id() {
        let mut set = HeldPads::new();
        set.insert(pad(0));
        set.insert(pad(1));
        set.insert(pad(2));
        let pitches = [67u8, 60, 64];
        let mut out = [pad(0); PAD_COUNT];
        let n = set.sorted_by_pitch(&mut out, |p| pitches[p.index()]);
        let sorted: Vec<u8> = out[..n].iter().map(|p| p.get()).collect();
        assert_eq!(sorted, vec![1, 2, 0]);
    }
}
