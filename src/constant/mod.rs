pub mod seeds {
    pub const METADATA_SEED: &[u8] = b"metadata";
}

pub mod accounts {
    use solana_sdk::pubkey::Pubkey;

    pub const RAYDIUM_AMM_V4: Pubkey = Pubkey::from_str_const("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

    pub const RAYDIUM_AMM_AUTHORITY: Pubkey = Pubkey::from_str_const("5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1");

    pub const OPENBOOK: Pubkey = Pubkey::from_str_const("srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX");

    pub const MPL_TOKEN_METADATA: Pubkey = Pubkey::from_str_const("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

    pub const TOKEN_PROGRAM: Pubkey = Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

    pub const WSOL_MINT: Pubkey = Pubkey::from_str_const("So11111111111111111111111111111111111111112");

    pub const USDC_MINT: Pubkey = Pubkey::from_str_const("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
}

/// Raydium `LIQUIDITY_STATE_LAYOUT_V4`
pub mod liquidity_v4 {
    pub const SIZE: usize = 752;
    /// `status` value of an initialized, tradable pool
    pub const STATUS_ACTIVE: u64 = 6;

    pub const STATUS: usize = 0;
    pub const BASE_DECIMAL: usize = 32;
    pub const QUOTE_DECIMAL: usize = 40;
    pub const POOL_OPEN_TIME: usize = 224;
    pub const BASE_VAULT: usize = 336;
    pub const QUOTE_VAULT: usize = 368;
    pub const BASE_MINT: usize = 400;
    pub const QUOTE_MINT: usize = 432;
    pub const LP_MINT: usize = 464;
    pub const OPEN_ORDERS: usize = 496;
    pub const MARKET_ID: usize = 528;
    pub const MARKET_PROGRAM_ID: usize = 560;
    pub const TARGET_ORDERS: usize = 592;
}

/// OpenBook `MARKET_STATE_LAYOUT_V3`
pub mod market_v3 {
    pub const SIZE: usize = 388;

    pub const OWN_ADDRESS: usize = 13;
    pub const VAULT_SIGNER_NONCE: usize = 45;
    pub const BASE_MINT: usize = 53;
    pub const QUOTE_MINT: usize = 85;
    pub const BASE_VAULT: usize = 117;
    pub const QUOTE_VAULT: usize = 165;
    pub const EVENT_QUEUE: usize = 253;
    pub const BIDS: usize = 285;
    pub const ASKS: usize = 317;
}

pub mod token_account {
    pub const SIZE: usize = 165;

    pub const MINT: usize = 0;
    pub const OWNER: usize = 32;
    pub const AMOUNT: usize = 64;
}

pub mod mint {
    pub const SIZE: usize = 82;

    pub const MINT_AUTHORITY_OPTION: usize = 0;
    pub const SUPPLY: usize = 36;
    pub const DECIMALS: usize = 44;
}

pub mod swap {
    /// `swap_base_in` instruction tag of the AMM v4 program
    pub const SWAP_BASE_IN: u8 = 9;

    pub const FEE_NUMERATOR: u128 = 25;
    pub const FEE_DENOMINATOR: u128 = 10_000;
}
