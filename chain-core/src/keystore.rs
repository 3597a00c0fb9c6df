//! Address-to-public-key resolution, owned by the blockchain rather than
//! threaded through every call site as an ad-hoc closure (per the
//! redesign note on key ownership). Transaction validation is the sole
//! consumer; wallet creation and validator registration are the sole
//! writers.

use shared::{Address, PublicKey};
use std::collections::HashMap;

/// A pure `Address -> Option<PublicKey>` lookup. An in-memory
/// implementation is all the pedagogical scope here needs; a persistent
/// node would back this with a file or database instead.
pub trait Keystore: Send + Sync {
    fn public_key_of(&self, address: &Address) -> Option<PublicKey>;

    /// Registers (or overwrites) the public key resolved for `address`.
    fn register(&mut self, address: Address, public_key: PublicKey);
}

#[derive(Default)]
pub struct InMemoryKeystore {
    keys: HashMap<Address, PublicKey>,
}

impl InMemoryKeystore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Keystore for InMemoryKeystore {
    fn public_key_of(&self, address: &Address) -> Option<PublicKey> {
        self.keys.get(address).cloned()
    }

    fn register(&mut self, address: Address, public_key: PublicKey) {
        self.keys.insert(address, public_key);
    }
}
