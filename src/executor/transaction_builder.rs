use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{v0::Message, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::instruction::{close_account, sync_native};

use crate::config::QuoteToken;
use crate::constant::accounts::{RAYDIUM_AMM_AUTHORITY, RAYDIUM_AMM_V4, TOKEN_PROGRAM};
use crate::constant::swap::SWAP_BASE_IN;
use crate::executor::{errors::ExecutionError, traits::PriorityFee};
use crate::strategy::MatchedPool;

/// Compute budget instructions, which must lead the transaction
pub fn compute_budget_instructions(fee: PriorityFee) -> Vec<Instruction> {
    vec![
        ComputeBudgetInstruction::set_compute_unit_limit(fee.compute_unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(fee.compute_unit_price_micro_lamports),
    ]
}

/// Compile a v0 message and sign it with `payer`
pub fn build_signed_transaction(
    instructions: &[Instruction],
    payer: &Keypair,
    recent_blockhash: Hash,
) -> Result<VersionedTransaction, ExecutionError> {
    let message = Message::try_compile(
        &payer.pubkey(),
        instructions,
        &[],
        recent_blockhash,
    ).map_err(|e| ExecutionError::Serialization(format!("Failed to compile message: {}", e)))?;

    VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])
        .map_err(|e| ExecutionError::Serialization(format!("Failed to sign transaction: {}", e)))
}

/// Builds Raydium AMM v4 buy and sell instruction sets for the wallet
#[derive(Debug, Clone)]
pub struct SwapInstructionBuilder {
    wallet: Pubkey,
    quote: QuoteToken,
}

impl SwapInstructionBuilder {
    pub fn new(wallet: Pubkey, quote: QuoteToken) -> Self {
        Self { wallet, quote }
    }

    pub fn wallet(&self) -> Pubkey {
        self.wallet
    }

    /// Wallet's associated token account for `mint`
    pub fn token_account(&self, mint: &Pubkey) -> Pubkey {
        get_associated_token_address(&self.wallet, mint)
    }

    pub fn quote_token_account(&self) -> Pubkey {
        self.token_account(&self.quote.mint)
    }

    /// OpenBook vault signer of the pool's market
    pub fn vault_signer(matched: &MatchedPool) -> Result<Pubkey, ExecutionError> {
        Pubkey::create_program_address(
            &[matched.market.id.as_ref(), &matched.market.vault_signer_nonce.to_le_bytes()[..]],
            &matched.pool.state.market_program_id,
        )
        .map_err(|e| ExecutionError::InvalidParams(format!("Invalid vault signer nonce for market {}: {}", matched.market.id, e)))
    }

    /// `swap_base_in` with the account order the AMM program expects
    pub fn swap_base_in(
        &self,
        matched: &MatchedPool,
        source: Pubkey,
        destination: Pubkey,
        amount_in: u64,
        minimum_out: u64,
    ) -> Result<Instruction, ExecutionError> {
        if amount_in == 0 {
            return Err(ExecutionError::InvalidParams("Swap amount cannot be zero".to_string()));
        }

        let pool = &matched.pool.state;
        let market = &matched.market;
        let vault_signer = Self::vault_signer(matched)?;

        let mut data = Vec::with_capacity(17);
        data.push(SWAP_BASE_IN);
        data.extend_from_slice(&amount_in.to_le_bytes());
        data.extend_from_slice(&minimum_out.to_le_bytes());

        let accounts = vec![
            AccountMeta::new_readonly(TOKEN_PROGRAM, false),
            AccountMeta::new(matched.pool.id, false),
            AccountMeta::new_readonly(RAYDIUM_AMM_AUTHORITY, false),
            AccountMeta::new(pool.open_orders, false),
            AccountMeta::new(pool.target_orders, false),
            AccountMeta::new(pool.base_vault, false),
            AccountMeta::new(pool.quote_vault, false),
            AccountMeta::new_readonly(pool.market_program_id, false),
            AccountMeta::new(market.id, false),
            AccountMeta::new(market.bids, false),
            AccountMeta::new(market.asks, false),
            AccountMeta::new(market.event_queue, false),
            AccountMeta::new(market.base_vault, false),
            AccountMeta::new(market.quote_vault, false),
            AccountMeta::new_readonly(vault_signer, false),
            AccountMeta::new(source, false),
            AccountMeta::new(destination, false),
            AccountMeta::new_readonly(self.wallet, true),
        ];

        Ok(Instruction {
            program_id: RAYDIUM_AMM_V4,
            accounts,
            data,
        })
    }

    fn create_ata(&self, mint: &Pubkey) -> Instruction {
        create_associated_token_account_idempotent(&self.wallet, &self.wallet, mint, &TOKEN_PROGRAM)
    }

    fn close_quote_account(&self) -> Result<Instruction, ExecutionError> {
        close_account(
            &TOKEN_PROGRAM,
            &self.quote_token_account(),
            &self.wallet,
            &self.wallet,
            &[&self.wallet],
        ).map_err(|e| ExecutionError::Instruction(format!("Failed to create close account instruction: {}", e)))
    }

    /// Spend `amount_in` quote on the pool's base token. Wraps and unwraps SOL
    /// around the swap when the quote is WSOL.
    pub fn build_buy(&self, matched: &MatchedPool, amount_in: u64, minimum_out: u64) -> Result<Vec<Instruction>, ExecutionError> {
        let quote_account = self.quote_token_account();
        let base_account = self.token_account(&matched.base_mint());
        let mut instructions = Vec::new();

        if self.quote.is_native() {
            instructions.push(self.create_ata(&self.quote.mint));
            instructions.push(system_instruction::transfer(&self.wallet, &quote_account, amount_in));
            instructions.push(
                sync_native(&TOKEN_PROGRAM, &quote_account)
                    .map_err(|e| ExecutionError::Instruction(format!("Failed to create sync native instruction: {}", e)))?,
            );
        }

        instructions.push(self.create_ata(&matched.base_mint()));
        instructions.push(self.swap_base_in(matched, quote_account, base_account, amount_in, minimum_out)?);

        if self.quote.is_native() {
            instructions.push(self.close_quote_account()?);
        }

        Ok(instructions)
    }

    /// Sell `amount` base tokens back into the quote token
    pub fn build_sell(&self, matched: &MatchedPool, amount: u64, minimum_out: u64) -> Result<Vec<Instruction>, ExecutionError> {
        let quote_account = self.quote_token_account();
        let base_account = self.token_account(&matched.base_mint());
        let mut instructions = Vec::new();

        if self.quote.is_native() {
            instructions.push(self.create_ata(&self.quote.mint));
        }

        instructions.push(self.swap_base_in(matched, base_account, quote_account, amount, minimum_out)?);

        if self.quote.is_native() {
            instructions.push(self.close_quote_account()?);
        }

        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::matched_pool;

    fn builder(symbol: &str) -> SwapInstructionBuilder {
        SwapInstructionBuilder::new(Pubkey::new_unique(), QuoteToken::resolve(symbol).unwrap())
    }

    #[test]
    fn test_swap_instruction_layout() {
        let builder = builder("WSOL");
        let matched = matched_pool();
        let source = Pubkey::new_unique();
        let destination = Pubkey::new_unique();

        let ix = builder.swap_base_in(&matched, source, destination, 1_000, 900).unwrap();
        assert_eq!(ix.program_id, RAYDIUM_AMM_V4);
        assert_eq!(ix.accounts.len(), 18);
        assert_eq!(ix.data.len(), 17);
        assert_eq!(ix.data[0], SWAP_BASE_IN);
        assert_eq!(&ix.data[1..9], &1_000u64.to_le_bytes());
        assert_eq!(&ix.data[9..17], &900u64.to_le_bytes());
        assert_eq!(ix.accounts[1].pubkey, matched.pool.id);
        assert_eq!(ix.accounts[15].pubkey, source);
        assert_eq!(ix.accounts[16].pubkey, destination);
        assert!(ix.accounts[17].is_signer);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let builder = builder("WSOL");
        let matched = matched_pool();
        assert!(matches!(
            builder.swap_base_in(&matched, Pubkey::new_unique(), Pubkey::new_unique(), 0, 0),
            Err(ExecutionError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_native_buy_wraps_and_unwraps() {
        let builder = builder("WSOL");
        let matched = matched_pool();

        let ixs = builder.build_buy(&matched, 10_000_000, 0).unwrap();
        // create wsol ata, transfer, sync, create base ata, swap, close
        assert_eq!(ixs.len(), 6);
        assert_eq!(ixs[4].program_id, RAYDIUM_AMM_V4);
        assert_eq!(ixs[4].accounts[15].pubkey, builder.quote_token_account());
        assert_eq!(ixs[4].accounts[16].pubkey, builder.token_account(&matched.base_mint()));
    }

    #[test]
    fn test_usdc_sell_has_no_wrapping() {
        let builder = builder("USDC");
        let matched = matched_pool();

        let ixs = builder.build_sell(&matched, 500, 10).unwrap();
        assert_eq!(ixs.len(), 1);
        assert_eq!(ixs[0].accounts[15].pubkey, builder.token_account(&matched.base_mint()));
    }

    #[test]
    fn test_compute_budget_and_signing() {
        let payer = Keypair::new();
        let mut ixs = compute_budget_instructions(PriorityFee {
            compute_unit_limit: 200_000,
            compute_unit_price_micro_lamports: 10_000,
            tip_lamports: 0,
        });
        ixs.push(system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1));
        assert_eq!(ixs.len(), 3);

        let tx = build_signed_transaction(&ixs, &payer, Hash::new_unique()).unwrap();
        assert_eq!(tx.signatures.len(), 1);
    }
}
