//! Minimal Solidity ABI encoding
//!
//! Covers what the oracle and router calls need: 4-byte selectors, static
//! words for addresses and uints, signed `int256` decoding and dynamic
//! `address[]` / `uint256[]` arrays.

use crate::ports::EthereumError;

/// 32-byte ABI word
pub type Word = [u8; 32];

pub const WORD_SIZE: usize = 32;

/// `latestRoundData()`
pub const LATEST_ROUND_DATA: [u8; 4] = [0xfe, 0xaf, 0x96, 0x8c];

/// `decimals()`
pub const DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// `getAmountsOut(uint256,address[])`
pub const GET_AMOUNTS_OUT: [u8; 4] = [0xd0, 0x6c, 0xa6, 0x1f];

/// Strip an optional `0x` prefix
pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

/// Decode 0x-prefixed hex data
pub fn decode_hex(data: &str) -> Result<Vec<u8>, EthereumError> {
    hex::decode(strip_0x(data)).map_err(|e| EthereumError::InvalidResponse(format!("bad hex data: {}", e)))
}

/// Parse a JSON-RPC hex quantity such as `0x1a`
pub fn parse_quantity(quantity: &str) -> Result<u128, EthereumError> {
    let digits = strip_0x(quantity);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| EthereumError::InvalidResponse(format!("bad quantity '{}': {}", quantity, e)))
}

/// Format a value as a JSON-RPC hex quantity
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Validate and decode a 20-byte address
pub fn parse_address(address: &str) -> Result<[u8; 20], EthereumError> {
    let digits = strip_0x(address);
    if digits.len() != 40 {
        return Err(EthereumError::InvalidAddress(address.to_string()));
    }
    let bytes = hex::decode(digits).map_err(|_| EthereumError::InvalidAddress(address.to_string()))?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}

pub fn encode_address(address: &str) -> Result<Word, EthereumError> {
    let bytes = parse_address(address)?;
    let mut word = [0u8; WORD_SIZE];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

pub fn encode_uint(value: u128) -> Word {
    let mut word = [0u8; WORD_SIZE];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Word at `index` of `data`
pub fn word_at(data: &[u8], index: usize) -> Result<&[u8], EthereumError> {
    let start = index * WORD_SIZE;
    data.get(start..start + WORD_SIZE)
        .ok_or_else(|| EthereumError::Abi(format!("return data too short for word {}", index)))
}

/// Decode an unsigned word that must fit in 128 bits
pub fn decode_uint(word: &[u8]) -> Result<u128, EthereumError> {
    if word.len() != WORD_SIZE {
        return Err(EthereumError::Abi(format!("expected 32-byte word, got {}", word.len())));
    }
    if word[..16].iter().any(|b| *b != 0) {
        return Err(EthereumError::Abi("uint value exceeds 128 bits".into()));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decode a two's complement `int256` word that must fit in 128 bits
pub fn decode_int(word: &[u8]) -> Result<i128, EthereumError> {
    if word.len() != WORD_SIZE {
        return Err(EthereumError::Abi(format!("expected 32-byte word, got {}", word.len())));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    let value = i128::from_be_bytes(low);

    let sign_fill = if value < 0 { 0xff } else { 0x00 };
    if word[..16].iter().any(|b| *b != sign_fill) {
        return Err(EthereumError::Abi("int value exceeds 128 bits".into()));
    }
    Ok(value)
}

fn decode_usize(word: &[u8]) -> Result<usize, EthereumError> {
    usize::try_from(decode_uint(word)?).map_err(|_| EthereumError::Abi("offset out of range".into()))
}

/// Encode `getAmountsOut(amount_in, path)` calldata
pub fn encode_get_amounts_out(amount_in: u128, path: &[String]) -> Result<Vec<u8>, EthereumError> {
    let mut data = Vec::with_capacity(4 + WORD_SIZE * (4 + path.len()));
    data.extend_from_slice(&GET_AMOUNTS_OUT);
    data.extend_from_slice(&encode_uint(amount_in));
    // Offset of the dynamic array, counted from the start of the arguments
    data.extend_from_slice(&encode_uint((2 * WORD_SIZE) as u128));
    data.extend_from_slice(&encode_uint(path.len() as u128));
    for address in path {
        data.extend_from_slice(&encode_address(address)?);
    }
    Ok(data)
}

/// Decode a return value consisting of a single dynamic `uint256[]`
pub fn decode_uint_array(data: &[u8]) -> Result<Vec<u128>, EthereumError> {
    let offset = decode_usize(word_at(data, 0)?)?;
    if offset % WORD_SIZE != 0 {
        return Err(EthereumError::Abi(format!("misaligned array offset {}", offset)));
    }
    let start = offset / WORD_SIZE;
    let len = decode_usize(word_at(data, start)?)?;
    (0..len).map(|i| decode_uint(word_at(data, start + 1 + i)?)).collect()
}

/// Hex encode calldata with a 0x prefix
pub fn to_hex_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}
