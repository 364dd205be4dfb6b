//! Fixed-offset decoders for the account layouts the sniper subscribes to.

use borsh::BorshDeserialize;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::constant::{
    accounts::MPL_TOKEN_METADATA, liquidity_v4, market_v3, mint, seeds::METADATA_SEED, token_account,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{layout}: expected {expected} bytes, got {actual}")]
    UnexpectedSize {
        layout: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("metadata account could not be decoded: {0}")]
    Metadata(String),
}

/// Raydium AMM v4 pool state, the fields the lifecycle needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidityStateV4 {
    pub status: u64,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub pool_open_time: u64,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub open_orders: Pubkey,
    pub market_id: Pubkey,
    pub market_program_id: Pubkey,
    pub target_orders: Pubkey,
}

/// A pool observed on the pool-creation stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolCandidate {
    pub id: Pubkey,
    pub state: LiquidityStateV4,
}

impl PoolCandidate {
    pub fn base_mint(&self) -> Pubkey {
        self.state.base_mint
    }
}

/// Order-book addresses of the market listing a base mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketRecord {
    pub id: Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountState {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintState {
    pub mint_authority_present: bool,
    pub supply: u64,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub is_mutable: bool,
}

#[derive(BorshDeserialize)]
struct RawCreator {
    _address: [u8; 32],
    _verified: bool,
    _share: u8,
}

#[derive(BorshDeserialize)]
struct RawMetadata {
    _key: u8,
    _update_authority: [u8; 32],
    _mint: [u8; 32],
    name: String,
    symbol: String,
    uri: String,
    _seller_fee_basis_points: u16,
    _creators: Option<Vec<RawCreator>>,
    _primary_sale_happened: bool,
    is_mutable: bool,
}

fn expect_len(layout: &'static str, data: &[u8], expected: usize) -> Result<(), DecodeError> {
    if data.len() < expected {
        return Err(DecodeError::UnexpectedSize { layout, expected, actual: data.len() });
    }
    Ok(())
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(bytes)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

pub fn decode_liquidity_state(data: &[u8]) -> Result<LiquidityStateV4, DecodeError> {
    expect_len("LiquidityStateV4", data, liquidity_v4::SIZE)?;

    Ok(LiquidityStateV4 {
        status: read_u64(data, liquidity_v4::STATUS),
        base_decimals: read_u64(data, liquidity_v4::BASE_DECIMAL) as u8,
        quote_decimals: read_u64(data, liquidity_v4::QUOTE_DECIMAL) as u8,
        pool_open_time: read_u64(data, liquidity_v4::POOL_OPEN_TIME),
        base_vault: read_pubkey(data, liquidity_v4::BASE_VAULT),
        quote_vault: read_pubkey(data, liquidity_v4::QUOTE_VAULT),
        base_mint: read_pubkey(data, liquidity_v4::BASE_MINT),
        quote_mint: read_pubkey(data, liquidity_v4::QUOTE_MINT),
        lp_mint: read_pubkey(data, liquidity_v4::LP_MINT),
        open_orders: read_pubkey(data, liquidity_v4::OPEN_ORDERS),
        market_id: read_pubkey(data, liquidity_v4::MARKET_ID),
        market_program_id: read_pubkey(data, liquidity_v4::MARKET_PROGRAM_ID),
        target_orders: read_pubkey(data, liquidity_v4::TARGET_ORDERS),
    })
}

pub fn decode_pool(id: Pubkey, data: &[u8]) -> Result<PoolCandidate, DecodeError> {
    Ok(PoolCandidate { id, state: decode_liquidity_state(data)? })
}

pub fn decode_market(id: Pubkey, data: &[u8]) -> Result<MarketRecord, DecodeError> {
    expect_len("MarketStateV3", data, market_v3::SIZE)?;

    Ok(MarketRecord {
        id,
        vault_signer_nonce: read_u64(data, market_v3::VAULT_SIGNER_NONCE),
        base_mint: read_pubkey(data, market_v3::BASE_MINT),
        quote_mint: read_pubkey(data, market_v3::QUOTE_MINT),
        base_vault: read_pubkey(data, market_v3::BASE_VAULT),
        quote_vault: read_pubkey(data, market_v3::QUOTE_VAULT),
        event_queue: read_pubkey(data, market_v3::EVENT_QUEUE),
        bids: read_pubkey(data, market_v3::BIDS),
        asks: read_pubkey(data, market_v3::ASKS),
    })
}

pub fn decode_token_account(data: &[u8]) -> Result<TokenAccountState, DecodeError> {
    expect_len("TokenAccount", data, token_account::SIZE)?;

    Ok(TokenAccountState {
        mint: read_pubkey(data, token_account::MINT),
        owner: read_pubkey(data, token_account::OWNER),
        amount: read_u64(data, token_account::AMOUNT),
    })
}

pub fn decode_mint(data: &[u8]) -> Result<MintState, DecodeError> {
    expect_len("Mint", data, mint::SIZE)?;

    Ok(MintState {
        mint_authority_present: read_u32(data, mint::MINT_AUTHORITY_OPTION) != 0,
        supply: read_u64(data, mint::SUPPLY),
        decimals: data[mint::DECIMALS],
    })
}

pub fn decode_metadata(data: &[u8]) -> Result<TokenMetadata, DecodeError> {
    let raw = RawMetadata::deserialize(&mut &data[..])
        .map_err(|e| DecodeError::Metadata(e.to_string()))?;

    let clean = |s: String| s.trim_end_matches('\0').trim().to_string();
    Ok(TokenMetadata {
        name: clean(raw.name),
        symbol: clean(raw.symbol),
        uri: clean(raw.uri),
        is_mutable: raw.is_mutable,
    })
}

/// Metaplex metadata PDA of `mint`
pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_SEED, MPL_TOKEN_METADATA.as_ref(), mint.as_ref()],
        &MPL_TOKEN_METADATA,
    )
    .0
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::constant::accounts::{OPENBOOK, WSOL_MINT};

    #[test]
    fn test_decode_pool_reads_layout_offsets() {
        let base = Pubkey::new_unique();
        let market = Pubkey::new_unique();
        let id = Pubkey::new_unique();
        let data = pool_bytes(&base, &WSOL_MINT, &market, 1_700_000_000);

        let pool = decode_pool(id, &data).unwrap();
        assert_eq!(pool.id, id);
        assert_eq!(pool.base_mint(), base);
        assert_eq!(pool.state.quote_mint, WSOL_MINT);
        assert_eq!(pool.state.market_id, market);
        assert_eq!(pool.state.market_program_id, OPENBOOK);
        assert_eq!(pool.state.status, liquidity_v4::STATUS_ACTIVE);
        assert_eq!(pool.state.pool_open_time, 1_700_000_000);
        assert_eq!(pool.state.base_decimals, 6);
    }

    #[test]
    fn test_decode_market_reads_layout_offsets() {
        let base = Pubkey::new_unique();
        let id = Pubkey::new_unique();
        let market = decode_market(id, &market_bytes(&base, &WSOL_MINT)).unwrap();
        assert_eq!(market.id, id);
        assert_eq!(market.base_mint, base);
        assert_eq!(market.quote_mint, WSOL_MINT);
        assert_eq!(market.vault_signer_nonce, 1);
    }

    #[test]
    fn test_short_buffers_are_rejected() {
        let err = decode_market(Pubkey::new_unique(), &[0u8; 100]).unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedSize { layout: "MarketStateV3", expected: 388, actual: 100 });
        assert!(decode_liquidity_state(&[0u8; 751]).is_err());
        assert!(decode_token_account(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_decode_token_account() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let account = decode_token_account(&token_account_bytes(&mint, &owner, 120)).unwrap();
        assert_eq!(account, TokenAccountState { mint, owner, amount: 120 });
    }

    #[test]
    fn test_decode_mint_authority_option() {
        let renounced = decode_mint(&mint_bytes(None, 1_000, 6)).unwrap();
        assert!(!renounced.mint_authority_present);
        assert_eq!(renounced.supply, 1_000);
        assert_eq!(renounced.decimals, 6);

        let authority = Pubkey::new_unique();
        let mintable = decode_mint(&mint_bytes(Some(&authority), 0, 9)).unwrap();
        assert!(mintable.mint_authority_present);
    }

    #[test]
    fn test_decode_metadata_strips_padding() {
        let metadata = decode_metadata(&metadata_bytes("Test Coin", "https://example.com/meta.json", false)).unwrap();
        assert_eq!(metadata.name, "Test Coin");
        assert_eq!(metadata.symbol, "TST");
        assert_eq!(metadata.uri, "https://example.com/meta.json");
        assert!(!metadata.is_mutable);
    }

    #[test]
    fn test_metadata_address_is_deterministic() {
        let mint = Pubkey::new_unique();
        assert_eq!(metadata_address(&mint), metadata_address(&mint));
        assert_ne!(metadata_address(&mint), metadata_address(&Pubkey::new_unique()));
    }
}
