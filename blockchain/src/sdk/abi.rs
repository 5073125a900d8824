//! Calldata cho ERC20 và Wormhole Token Bridge, và đọc sequence từ receipt.

use ethers::abi::{encode, Token};
use ethers::types::{Address, TransactionReceipt, H256, U256};

/// Event của Wormhole core contract cho mỗi message được publish
pub const LOG_MESSAGE_PUBLISHED: &str = "LogMessagePublished(address,uint64,uint32,bytes,uint8)";

/// Tạo function selector từ signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = ethers::utils::keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Tạo topic từ event signature
pub fn event_topic(signature: &str) -> H256 {
    H256::from(ethers::utils::keccak256(signature.as_bytes()))
}

fn call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = function_selector(signature).to_vec();
    data.extend(encode(args));
    data
}

pub fn balance_of(owner: Address) -> Vec<u8> {
    call("balanceOf(address)", &[Token::Address(owner)])
}

pub fn allowance(owner: Address, spender: Address) -> Vec<u8> {
    call("allowance(address,address)", &[Token::Address(owner), Token::Address(spender)])
}

pub fn approve(spender: Address, amount: U256) -> Vec<u8> {
    call("approve(address,uint256)", &[Token::Address(spender), Token::Uint(amount)])
}

/// `messageFee()` on the core contract
pub fn message_fee() -> Vec<u8> {
    call("messageFee()", &[])
}

/// `transferTokens` on the token bridge
pub fn transfer_tokens(
    token: Address,
    amount: U256,
    recipient_chain: u16,
    recipient: [u8; 32],
    arbiter_fee: U256,
    nonce: u32,
) -> Vec<u8> {
    call(
        "transferTokens(address,uint256,uint16,bytes32,uint256,uint32)",
        &[
            Token::Address(token),
            Token::Uint(amount),
            Token::Uint(U256::from(recipient_chain)),
            Token::FixedBytes(recipient.to_vec()),
            Token::Uint(arbiter_fee),
            Token::Uint(U256::from(nonce)),
        ],
    )
}

/// Left-pad an EVM address to the 32-byte form Wormhole uses
pub fn address_to_bytes32(address: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(address.as_bytes());
    out
}

/// First 32-byte word of a call result as a uint
pub fn decode_uint(data: &[u8]) -> Option<U256> {
    if data.len() < 32 {
        return None;
    }
    Some(U256::from_big_endian(&data[..32]))
}

/// Sequence of the first `LogMessagePublished` emitted by `core_bridge`
pub fn sequence_from_receipt(receipt: &TransactionReceipt, core_bridge: Address) -> Option<u64> {
    let topic = event_topic(LOG_MESSAGE_PUBLISHED);
    receipt
        .logs
        .iter()
        .filter(|log| log.address == core_bridge)
        .find(|log| log.topics.first() == Some(&topic))
        .and_then(|log| decode_uint(&log.data))
        .filter(|seq| *seq <= U256::from(u64::MAX))
        .map(|seq| seq.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Bytes, Log};

    #[test]
    fn test_erc20_selectors() {
        assert_eq!(function_selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(function_selector("approve(address,uint256)"), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(function_selector("allowance(address,address)"), [0xdd, 0x62, 0xed, 0x3e]);
    }

    #[test]
    fn test_calldata_layout() {
        let owner = Address::from_low_u64_be(7);
        assert_eq!(balance_of(owner).len(), 4 + 32);
        assert_eq!(allowance(owner, owner).len(), 4 + 64);
        assert_eq!(message_fee().len(), 4);

        let data = transfer_tokens(owner, U256::from(1_000_000u64), 5, [1u8; 32], U256::zero(), 42);
        assert_eq!(data.len(), 4 + 6 * 32);
        // recipient chain là word thứ ba
        assert_eq!(decode_uint(&data[4 + 64..]), Some(U256::from(5)));
        assert_eq!(&data[4 + 96..4 + 128], &[1u8; 32]);
    }

    #[test]
    fn test_address_to_bytes32() {
        let address = Address::from_low_u64_be(0xdead);
        let padded = address_to_bytes32(address);
        assert_eq!(&padded[..12], &[0u8; 12]);
        assert_eq!(&padded[12..], address.as_bytes());
    }

    #[test]
    fn test_sequence_from_receipt() {
        let core = Address::from_low_u64_be(1);
        let other = Address::from_low_u64_be(2);
        let topic = event_topic(LOG_MESSAGE_PUBLISHED);
        let payload = encode(&[
            Token::Uint(U256::from(98_765u64)),
            Token::Uint(U256::from(1u64)),
        ]);

        let receipt = TransactionReceipt {
            logs: vec![
                Log {
                    address: other,
                    topics: vec![topic],
                    data: Bytes::from(encode(&[Token::Uint(U256::from(1u64))])),
                    ..Default::default()
                },
                Log {
                    address: core,
                    topics: vec![topic],
                    data: Bytes::from(payload),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(sequence_from_receipt(&receipt, core), Some(98_765));
        assert_eq!(sequence_from_receipt(&TransactionReceipt::default(), core), None);
    }
}
