//! `LOG0` .. `LOG4`.

use lfvm_common::{Log, H256};

use crate::call_frame::CallFrame;
use crate::errors::{OpcodeResult, VmError};
use crate::gas_cost;

impl CallFrame<'_, '_> {
    /// `topic_count` is 0..=4. The static charge already covers the base
    /// and per-topic prices; only the data bytes are dynamic.
    pub fn op_log(&mut self, topic_count: usize) -> Result<OpcodeResult, VmError> {
        let offset = Self::word_to_u64(self.stack.pop())?;
        let size = Self::word_to_u64(self.stack.pop())?;

        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            let topic = self.stack.pop();
            topics.push(H256(topic.to_big_endian()));
        }

        self.use_gas(gas_cost::log_data_cost(size))?;
        self.memory.grow(&mut self.contract.gas, offset, size)?;

        let log = Log {
            address: self.contract.address,
            topics,
            data: bytes::Bytes::copy_from_slice(self.memory.slice(offset, size)),
        };
        self.evm.state.add_log(log);
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
