use serde::{Deserialize, Serialize};

pub use ethereum_types::{H160, H256, U256, U512};

/// A 20-byte account address.
pub type Address = H160;

/// Hard forks the interpreter distinguishes. Pricing and refund rules are
/// keyed off this; anything newer than London is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Fork {
    Istanbul,
    Berlin,
    #[default]
    London,
}

impl Fork {
    /// EIP-2929 access lists are active.
    pub fn is_berlin(&self) -> bool {
        *self >= Fork::Berlin
    }

    /// EIP-3529 refund schedule and BASEFEE are active.
    pub fn is_london(&self) -> bool {
        *self >= Fork::London
    }
}

/// A log record emitted by one of the LOG opcodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: bytes::Bytes,
}
