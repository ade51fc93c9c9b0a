//! Deployed contract handles and ABI encoding.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, U256};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Address plus interface of a contract on chain.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployedContract {
    address: Address,
    abi: JsonAbi,
}

impl DeployedContract {
    pub fn new(address: Address, abi: JsonAbi) -> Self {
        Self { address, abi }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Resolve `name`, picking the overload that takes `arg_count` inputs.
    pub fn function(&self, name: &str, arg_count: usize) -> BlockchainResult<&Function> {
        let overloads = self
            .abi
            .function(name)
            .ok_or_else(|| BlockchainError::Abi(format!("function {name} not in ABI")))?;
        overloads
            .iter()
            .find(|f| f.inputs.len() == arg_count)
            .ok_or_else(|| {
                BlockchainError::Abi(format!("no overload of {name} takes {arg_count} arguments"))
            })
    }

    /// Selector plus ABI-encoded arguments.
    pub fn encode_call(&self, name: &str, args: &[DynSolValue]) -> BlockchainResult<Bytes> {
        let function = self.function(name, args.len())?;
        function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| BlockchainError::Abi(format!("cannot encode {}: {e}", function.signature())))
    }

    /// Decode the return data of `name`.
    pub fn decode_output(
        &self,
        name: &str,
        arg_count: usize,
        data: &[u8],
    ) -> BlockchainResult<Vec<DynSolValue>> {
        let function = self.function(name, arg_count)?;
        function
            .abi_decode_output(data)
            .map_err(|e| BlockchainError::Abi(format!("cannot decode {} output: {e}", function.name)))
    }
}

/// Constructor arguments for a creation transaction.
///
/// Contracts without a constructor accept only an empty argument list.
pub fn encode_constructor_args(abi: &JsonAbi, args: &[DynSolValue]) -> BlockchainResult<Bytes> {
    match abi.constructor() {
        Some(constructor) => constructor
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| BlockchainError::Abi(format!("cannot encode constructor arguments: {e}"))),
        None if args.is_empty() => Ok(Bytes::new()),
        None => Err(BlockchainError::Abi(format!(
            "contract has no constructor but {} arguments were given",
            args.len()
        ))),
    }
}

/// First return value as an unsigned integer.
pub fn first_uint(values: &[DynSolValue]) -> BlockchainResult<U256> {
    values
        .first()
        .and_then(|v| v.as_uint())
        .map(|(value, _bits)| value)
        .ok_or_else(|| BlockchainError::Abi(format!("expected an unsigned integer, got {values:?}")))
}
