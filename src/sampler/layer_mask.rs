//! Set of blend layers referenced by a tile

/// Bitmask of texture-layer indices (layer `k` is bit `k`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const EMPTY: LayerMask = LayerMask(0);
    /// Highest representable layer count
    pub const CAPACITY: u32 = u32::BITS;

    /// Add a layer, returns false if the layer cannot be represented
    pub fn insert(&mut self, layer: u32) -> bool {
        if layer >= Self::CAPACITY {
            return false;
        }
        self.0 |= 1 << layer;
        true
    }

    pub fn contains(&self, layer: u32) -> bool {
        layer < Self::CAPACITY && self.0 & (1 << layer) != 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Referenced layers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..Self::CAPACITY).filter(move |l| self.contains(*l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_count() {
        let mut mask = LayerMask::EMPTY;
        assert!(mask.insert(2));
        assert!(mask.insert(2));
        assert_eq!(mask.count(), 1);
        assert!(mask.insert(0));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![0, 2]);
        assert!(!mask.insert(32));
        assert_eq!(mask, LayerMask(0b101));
    }
}
