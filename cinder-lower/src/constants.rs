use cinder_hir::ConstValue;
use cinder_lir::Operand;

/// Constants already loaded into a variable in the current block. Lives for
/// the duration of one block; a fresh cache is created at block entry.
pub struct ConstantCache {
    entries: Vec<(ConstValue, Operand)>,
}

impl ConstantCache {
    pub fn new() -> ConstantCache {
        ConstantCache {
            entries: Vec::new(),
        }
    }

    pub fn lookup(&self, value: ConstValue) -> Option<Operand> {
        self.entries
            .iter()
            .find(|(cached, _)| *cached == value)
            .map(|(_, operand)| operand.clone())
    }

    pub fn insert(&mut self, value: ConstValue, operand: Operand) {
        debug_assert!(operand.is_variable());
        debug_assert!(self.lookup(value).is_none());
        self.entries.push((value, operand));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_hir::{Kind, ObjectHandle};

    #[test]
    fn test_lookup_by_bits() {
        let mut cache = ConstantCache::new();
        cache.insert(ConstValue::Long(1), Operand::variable(0, Kind::Long));
        cache.insert(ConstValue::double(0.0), Operand::variable(1, Kind::Double));
        cache.insert(ConstValue::Object(ObjectHandle(3)), Operand::variable(2, Kind::Object));

        assert_eq!(
            cache.lookup(ConstValue::Long(1)),
            Some(Operand::variable(0, Kind::Long))
        );
        assert_eq!(cache.lookup(ConstValue::Int(1)), None);
        assert_eq!(cache.lookup(ConstValue::double(-0.0)), None);
        assert_eq!(cache.lookup(ConstValue::Object(ObjectHandle(4))), None);
        assert_eq!(
            cache.lookup(ConstValue::Object(ObjectHandle(3))),
            Some(Operand::variable(2, Kind::Object))
        );
        assert_eq!(cache.len(), 3);
    }
}
