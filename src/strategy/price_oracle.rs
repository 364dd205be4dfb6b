use async_trait::async_trait;
use std::sync::Arc;

use crate::constant::swap::{FEE_DENOMINATOR, FEE_NUMERATOR};
use crate::strategy::correlator::MatchedPool;
use crate::utils::ChainReader;

/// Current quote value of a base-token amount
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Quote received (raw units) for selling `amount` base tokens now
    async fn quote_value(&self, candidate: &MatchedPool, amount: u64) -> anyhow::Result<u64>;
}

/// Constant-product output after the AMM fee
pub fn constant_product_out(amount_in: u64, reserve_in: u64, reserve_out: u64) -> u64 {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
        return 0;
    }

    let amount_in = amount_in as u128 * (FEE_DENOMINATOR - FEE_NUMERATOR) / FEE_DENOMINATOR;
    let out = amount_in * reserve_out as u128 / (reserve_in as u128 + amount_in);
    out as u64
}

/// Prices from the pool's vault balances
pub struct PoolPriceOracle {
    reader: Arc<dyn ChainReader>,
}

impl PoolPriceOracle {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl PriceOracle for PoolPriceOracle {
    async fn quote_value(&self, candidate: &MatchedPool, amount: u64) -> anyhow::Result<u64> {
        let state = &candidate.pool.state;
        let (base_reserve, quote_reserve) = tokio::try_join!(
            self.reader.get_token_account_balance(&state.base_vault),
            self.reader.get_token_account_balance(&state.quote_vault),
        )?;

        if base_reserve == 0 || quote_reserve == 0 {
            return Err(anyhow::anyhow!("pool {} has an empty vault", candidate.pool.id));
        }

        Ok(constant_product_out(amount, base_reserve, quote_reserve))
    }
}
