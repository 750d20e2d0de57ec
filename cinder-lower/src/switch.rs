use cinder_hir::BlockId;

/// Keys `low_key..=high_key` all dispatch to `sux`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SwitchRange {
    pub low_key: i32,
    pub high_key: i32,
    pub sux: BlockId,
}

impl SwitchRange {
    fn new(key: i32, sux: BlockId) -> SwitchRange {
        SwitchRange {
            low_key: key,
            high_key: key,
            sux,
        }
    }

    pub fn contains(&self, key: i32) -> bool {
        self.low_key <= key && key <= self.high_key
    }

    pub fn is_singleton(&self) -> bool {
        self.low_key == self.high_key
    }

    pub fn is_pair(&self) -> bool {
        self.high_key as i64 - self.low_key as i64 == 1
    }
}

/// Merges runs of adjacent keys with the same successor. `cases` must be
/// sorted by strictly increasing key. Ranges dispatching to `default` are
/// dropped.
pub fn compact_ranges<I>(cases: I, default: BlockId) -> Vec<SwitchRange>
where
    I: IntoIterator<Item = (i32, BlockId)>,
{
    let mut result = Vec::new();
    let mut current: Option<SwitchRange> = None;

    for (key, sux) in cases {
        if let Some(ref mut range) = current {
            if range.sux == sux && range.high_key.checked_add(1) == Some(key) {
                range.high_key = key;
                continue;
            }

            debug_assert!(key > range.high_key, "switch keys not sorted");
            if range.sux != default {
                result.push(*range);
            }
        }

        current = Some(SwitchRange::new(key, sux));
    }

    if let Some(range) = current {
        if range.sux != default {
            result.push(range);
        }
    }

    result
}

pub fn lookup_ranges(keys: &[i32], suxs: &[BlockId], default: BlockId) -> Vec<SwitchRange> {
    assert_eq!(keys.len(), suxs.len());
    compact_ranges(keys.iter().copied().zip(suxs.iter().copied()), default)
}

pub fn table_ranges(low_key: i32, suxs: &[BlockId], default: BlockId) -> Vec<SwitchRange> {
    let cases = suxs
        .iter()
        .enumerate()
        .map(|(idx, sux)| (low_key.wrapping_add(idx as i32), *sux));
    compact_ranges(cases, default)
}

/// Successor the emitted range tests select for `key`.
pub fn dispatch(ranges: &[SwitchRange], default: BlockId, key: i32) -> BlockId {
    ranges
        .iter()
        .find(|range| range.contains(key))
        .map_or(default, |range| range.sux)
}
