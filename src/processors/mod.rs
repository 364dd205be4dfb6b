pub mod account_decoder;
pub mod dispatcher;

pub use account_decoder::{
    DecodeError, LiquidityStateV4, MarketRecord, MintState, PoolCandidate, TokenAccountState,
    TokenMetadata, decode_liquidity_state, decode_market, decode_metadata, decode_mint,
    decode_pool, decode_token_account, metadata_address,
};
pub use dispatcher::{AccountKind, AccountUpdate, EventDispatcher};
