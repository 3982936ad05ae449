use crate::hash;
use ahash::AHashMap;
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

/// A native function callable from Func nodes. It receives the node's argument and
/// returns the value published on the node's result output.
pub type UserFn = Arc<dyn Fn(u32) -> i32 + Send + Sync>;

/// Native functions keyed by the CRC-32 of their name.
///
/// Filled once at startup, then handed by reference to the compiler (to check names)
/// and to the runtime (to bind calls). There is no removal.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: AHashMap<u32, UserFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` under `name_hash`. A later registration of the same hash wins.
    pub fn register<F>(&mut self, name_hash: u32, f: F)
    where
        F: Fn(u32) -> i32 + Send + Sync + 'static,
    {
        self.functions.insert(name_hash, Arc::new(f));
    }

    /// Registers `f` under the hash of `name` and returns that hash.
    pub fn register_named<F>(&mut self, name: &str, f: F) -> u32
    where
        F: Fn(u32) -> i32 + Send + Sync + 'static,
    {
        let name_hash = hash::crc32(name);
        self.register(name_hash, f);
        name_hash
    }

    pub fn resolve(&self, name_hash: u32) -> Option<UserFn> {
        self.functions.get(&name_hash).cloned()
    }

    pub fn contains(&self, name_hash: u32) -> bool {
        self.functions.contains_key(&name_hash)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hashes = self.functions.keys().sorted().map(|h| hash::to_hex32(*h));
        f.debug_struct("FunctionRegistry")
            .field("functions", &hashes.collect::<Vec<_>>())
            .finish()
    }
}
