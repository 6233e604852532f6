// 2.0 token.rs: fungible asset ledger. balances, allowances, supply, minter role.
// every token in the system lives here, share tokens included. amounts are whole-token
// decimals and must fit the asset's precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::math::{self, Rounding};
use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("unknown asset {asset}")]
    UnknownAsset { asset: Address },

    #[error("asset {asset} already registered")]
    AlreadyRegistered { asset: Address },

    #[error("insufficient balance: {available} < {requested}")]
    InsufficientBalance { available: Decimal, requested: Decimal },

    #[error("insufficient allowance: {available} < {requested}")]
    InsufficientAllowance { available: Decimal, requested: Decimal },

    #[error("{caller} is not authorized to mint or burn {asset}")]
    Unauthorized { caller: Address, asset: Address },

    #[error("invalid amount {amount} for {decimals} decimals")]
    InvalidAmount { amount: Decimal, decimals: u32 },
}

// 2.1: asset metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    // None means fixed supply, nobody can mint or burn
    pub minter: Option<Address>,
}

impl Asset {
    pub fn new(address: Address, symbol: &str, name: &str, decimals: u32) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            minter: None,
        }
    }

    pub fn with_minter(mut self, minter: Address) -> Self {
        self.minter = Some(minter);
        self
    }

    pub fn floor(&self, amount: Decimal) -> Decimal {
        math::round_to(amount, self.decimals, Rounding::Down)
    }

    pub fn ceil(&self, amount: Decimal) -> Decimal {
        math::round_to(amount, self.decimals, Rounding::Up)
    }

    pub fn unit(&self) -> Decimal {
        math::unit(self.decimals)
    }
}

// 2.2: the ledger itself
#[derive(Debug, Clone)]
pub struct TokenLedger {
    assets: HashMap<Address, Asset>,
    // (asset, holder) -> balance
    balances: HashMap<(Address, Address), Decimal>,
    // (asset, owner, spender) -> remaining allowance
    allowances: HashMap<(Address, Address, Address), Decimal>,
    supplies: HashMap<Address, Decimal>,
}

impl TokenLedger {
    // the chain's native currency. exists from genesis, minted by SYSTEM.
    pub const NATIVE: Address = Address(1);

    pub fn new() -> Self {
        let mut ledger = Self {
            assets: HashMap::new(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            supplies: HashMap::new(),
        };
        let native = Asset::new(Self::NATIVE, "ETH", "Ether", 18).with_minter(Address::SYSTEM);
        ledger.assets.insert(Self::NATIVE, native);
        ledger.supplies.insert(Self::NATIVE, Decimal::ZERO);
        ledger
    }

    pub fn native(&self) -> &Asset {
        &self.assets[&Self::NATIVE]
    }

    pub fn register_asset(&mut self, asset: Asset) -> Result<(), TokenError> {
        if self.assets.contains_key(&asset.address) {
            return Err(TokenError::AlreadyRegistered { asset: asset.address });
        }
        self.supplies.insert(asset.address, Decimal::ZERO);
        self.assets.insert(asset.address, asset);
        Ok(())
    }

    pub fn asset(&self, asset: Address) -> Result<&Asset, TokenError> {
        self.assets.get(&asset).ok_or(TokenError::UnknownAsset { asset })
    }

    pub fn contains(&self, asset: Address) -> bool {
        self.assets.contains_key(&asset)
    }

    pub fn decimals(&self, asset: Address) -> Result<u32, TokenError> {
        Ok(self.asset(asset)?.decimals)
    }

    pub fn balance_of(&self, asset: Address, holder: Address) -> Decimal {
        self.balances
            .get(&(asset, holder))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_supply(&self, asset: Address) -> Decimal {
        self.supplies.get(&asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Decimal {
        self.allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.check_amount(asset, amount)?;
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }
        self.balances.insert((asset, from), available - amount);
        *self.balances.entry((asset, to)).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    // overwrites any previous allowance
    pub fn approve(
        &mut self,
        asset: Address,
        owner: Address,
        spender: Address,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.check_amount(asset, amount)?;
        self.allowances.insert((asset, owner, spender), amount);
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.check_amount(asset, amount)?;
        let allowed = self.allowance(asset, from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                available: allowed,
                requested: amount,
            });
        }
        self.transfer(asset, from, to, amount)?;
        self.allowances.insert((asset, from, spender), allowed - amount);
        Ok(())
    }

    pub fn mint(
        &mut self,
        caller: Address,
        asset: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.check_minter(caller, asset)?;
        self.check_amount(asset, amount)?;
        *self.balances.entry((asset, to)).or_insert(Decimal::ZERO) += amount;
        *self.supplies.entry(asset).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    pub fn burn(
        &mut self,
        caller: Address,
        asset: Address,
        from: Address,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.check_minter(caller, asset)?;
        self.check_amount(asset, amount)?;
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.balances.insert((asset, from), available - amount);
        *self.supplies.entry(asset).or_insert(Decimal::ZERO) -= amount;
        Ok(())
    }

    // hands the minter role over. only the current minter may do this.
    pub fn set_minter(
        &mut self,
        caller: Address,
        asset: Address,
        new_minter: Address,
    ) -> Result<(), TokenError> {
        self.check_minter(caller, asset)?;
        if let Some(entry) = self.assets.get_mut(&asset) {
            entry.minter = Some(new_minter);
        }
        Ok(())
    }

    fn check_minter(&self, caller: Address, asset: Address) -> Result<(), TokenError> {
        let entry = self.asset(asset)?;
        if entry.minter != Some(caller) {
            return Err(TokenError::Unauthorized { caller, asset });
        }
        Ok(())
    }

    fn check_amount(&self, asset: Address, amount: Decimal) -> Result<(), TokenError> {
        let decimals = self.asset(asset)?.decimals;
        if amount.is_sign_negative() || !math::fits_decimals(amount, decimals) {
            return Err(TokenError::InvalidAmount { amount, decimals });
        }
        Ok(())
    }
}

impl Default for TokenLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const USDC: Address = Address(10);
    const ALICE: Address = Address(100);
    const BOB: Address = Address(101);

    fn ledger() -> TokenLedger {
        let mut ledger = TokenLedger::new();
        ledger
            .register_asset(Asset::new(USDC, "USDC", "USD Coin", 6).with_minter(Address::SYSTEM))
            .unwrap();
        ledger.mint(Address::SYSTEM, USDC, ALICE, dec!(1000)).unwrap();
        ledger
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = ledger();
        ledger.transfer(USDC, ALICE, BOB, dec!(250.5)).unwrap();
        assert_eq!(ledger.balance_of(USDC, ALICE), dec!(749.5));
        assert_eq!(ledger.balance_of(USDC, BOB), dec!(250.5));
        assert_eq!(ledger.total_supply(USDC), dec!(1000));
    }

    #[test]
    fn test_transfer_insufficient() {
        let mut ledger = ledger();
        let result = ledger.transfer(USDC, BOB, ALICE, dec!(1));
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_precision_enforced() {
        let mut ledger = ledger();
        let result = ledger.transfer(USDC, ALICE, BOB, dec!(0.0000001));
        assert!(matches!(result, Err(TokenError::InvalidAmount { decimals: 6, .. })));
        let result = ledger.transfer(USDC, ALICE, BOB, dec!(-1));
        assert!(matches!(result, Err(TokenError::InvalidAmount { .. })));
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut ledger = ledger();
        ledger.approve(USDC, ALICE, BOB, dec!(100)).unwrap();
        ledger.transfer_from(USDC, BOB, ALICE, BOB, dec!(60)).unwrap();
        assert_eq!(ledger.allowance(USDC, ALICE, BOB), dec!(40));

        let result = ledger.transfer_from(USDC, BOB, ALICE, BOB, dec!(41));
        assert!(matches!(result, Err(TokenError::InsufficientAllowance { .. })));
        assert_eq!(ledger.balance_of(USDC, BOB), dec!(60));
    }

    #[test]
    fn test_only_minter_mints() {
        let mut ledger = ledger();
        let result = ledger.mint(ALICE, USDC, ALICE, dec!(1));
        assert!(matches!(result, Err(TokenError::Unauthorized { .. })));

        ledger.set_minter(Address::SYSTEM, USDC, ALICE).unwrap();
        ledger.mint(ALICE, USDC, BOB, dec!(5)).unwrap();
        ledger.burn(ALICE, USDC, BOB, dec!(2)).unwrap();
        assert_eq!(ledger.balance_of(USDC, BOB), dec!(3));
        assert_eq!(ledger.total_supply(USDC), dec!(1003));

        let result = ledger.mint(Address::SYSTEM, USDC, BOB, dec!(1));
        assert!(matches!(result, Err(TokenError::Unauthorized { .. })));
    }

    #[test]
    fn test_native_exists_at_genesis() {
        let ledger = TokenLedger::new();
        assert_eq!(ledger.native().decimals, 18);
        assert_eq!(ledger.native().minter, Some(Address::SYSTEM));
    }

    #[test]
    fn test_asset_rounding_helpers() {
        let asset = Asset::new(USDC, "USDC", "USD Coin", 6);
        assert_eq!(asset.floor(dec!(1.2345678)), dec!(1.234567));
        assert_eq!(asset.ceil(dec!(1.2345671)), dec!(1.234568));
        assert_eq!(asset.unit(), dec!(0.000001));
    }
}
