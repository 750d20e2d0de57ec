use std::collections::hash_map::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use cinder_hir::{DeoptAction, RuntimeCall};
use cinder_lir::StubId;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum StubKey {
    Runtime(RuntimeCall),
    /// Slow path called by a code template.
    Template(&'static str),
    Deoptimize(DeoptAction),
}

/// Compiler stubs shared by all methods compiled against one runtime. Ids
/// are handed out on first request and stay stable afterwards.
#[derive(Clone)]
pub struct StubRegistry {
    map: Arc<Mutex<HashMap<StubKey, StubId>>>,
}

impl StubRegistry {
    pub fn new() -> StubRegistry {
        StubRegistry {
            map: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn stub_for(&self, key: StubKey) -> StubId {
        let mut map = self.map.lock();
        let next = StubId(map.len() as u32);
        *map.entry(key).or_insert(next)
    }

    pub fn find(&self, key: StubKey) -> Option<StubId> {
        self.map.lock().get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}
