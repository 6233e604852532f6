//! Share accounting flows through the engine.
//!
//! A long WETH pool with 6-decimal shares priced at 100 WETH each at genesis.
//! No rebalancing happens here, so the pool holds its assets idle.

use leverage_vault::{
    Address, DeployRequest, EngineError, ErrorKind, EventPayload, Fixture, FixtureOptions, Leverage, Operation,
    PoolSetup, Price, RebalanceAction, RebalanceHints, SimExchange, StrategyKind,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct Scenario {
    fixture: Fixture,
    pool: Address,
    deployer: Address,
}

fn scenario() -> Scenario {
    let mut fixture = Fixture::weth_usdc().unwrap();
    let deployer = fixture.new_user();
    let setup = PoolSetup::long("ETHX", Leverage::from_bps(20_000))
        .with_share_decimals(6)
        .with_initial_rate(Price::new(dec!(100)).unwrap())
        .with_initial_deposit(dec!(10000));
    let pool = fixture.deploy(deployer, &setup).unwrap();
    Scenario {
        fixture,
        pool,
        deployer,
    }
}

fn last_rejection(fixture: &Fixture) -> Option<Operation> {
    fixture
        .engine
        .events()
        .iter()
        .rev()
        .find_map(|e| match &e.payload {
            EventPayload::OperationRejected(r) => Some(r.operation),
            _ => None,
        })
}

#[test]
fn genesis_deposit_mints_at_initial_rate() {
    let s = scenario();
    let engine = &s.fixture.engine;

    assert_eq!(engine.share_balance(s.pool, s.deployer).unwrap(), dec!(100));
    assert_eq!(engine.total_shares(s.pool).unwrap(), dec!(100));
    assert_eq!(engine.balance_of(s.fixture.weth, s.deployer), Decimal::ZERO);
    assert_eq!(engine.share_price(s.pool).unwrap(), dec!(100));

    let state = engine.pool_state(s.pool).unwrap();
    assert_eq!(state.net_value, dec!(10000));
    assert_eq!(state.leverage, Some(Leverage::ONE));
    assert_eq!(state.parameters.strategy, StrategyKind::Long);
    assert_eq!(engine.ltv(s.pool).unwrap(), Decimal::ZERO);
}

#[test]
fn deposit_charges_only_whole_shares() {
    let mut s = scenario();
    let bob = s.fixture.new_user();
    let offered = dec!(100.000000000000999999);
    s.fixture.fund(s.fixture.weth, bob, s.pool, offered).unwrap();

    let outcome = s.fixture.engine.deposit(bob, s.pool, offered).unwrap();

    assert_eq!(outcome.shares, dec!(1));
    assert_eq!(outcome.cost, dec!(100));
    assert_eq!(s.fixture.engine.share_balance(s.pool, bob).unwrap(), dec!(1));
    assert_eq!(
        s.fixture.engine.balance_of(s.fixture.weth, bob),
        dec!(0.000000000000999999)
    );
}

#[test]
fn partial_redemptions_pay_share_value() {
    let mut s = scenario();
    let bob = s.fixture.new_user();
    let offered = dec!(100.000000000000999999);
    s.fixture.fund(s.fixture.weth, bob, s.pool, offered).unwrap();
    s.fixture.engine.deposit(bob, s.pool, offered).unwrap();

    let first = s.fixture.engine.redeem(bob, s.pool, dec!(0.5)).unwrap();
    assert_eq!(first.amount, dec!(50));
    assert_eq!(first.released, Decimal::ZERO);

    let second = s.fixture.engine.redeem(bob, s.pool, dec!(0.5)).unwrap();
    assert_eq!(second.amount, dec!(50));

    let engine = &s.fixture.engine;
    assert_eq!(engine.share_balance(s.pool, bob).unwrap(), Decimal::ZERO);
    assert_eq!(engine.balance_of(s.fixture.weth, bob), offered);
    assert_eq!(engine.total_shares(s.pool).unwrap(), dec!(100));
    assert_eq!(engine.pool_state(s.pool).unwrap().net_value, dec!(10000));
}

#[test]
fn withdraw_burns_shares_rounded_up() {
    let mut s = scenario();
    // 0.0000001 WETH is 0.000000001 shares, rounded up to one share unit
    let outcome = s.fixture.engine.withdraw(s.deployer, s.pool, dec!(0.0000001)).unwrap();
    assert_eq!(outcome.shares_burned, dec!(0.000001));
    assert_eq!(outcome.amount, dec!(0.0000001));

    let engine = &s.fixture.engine;
    assert_eq!(engine.share_balance(s.pool, s.deployer).unwrap(), dec!(99.999999));
    assert_eq!(engine.balance_of(s.fixture.weth, s.deployer), dec!(0.0000001));
    // the remaining shares are worth slightly more than before
    assert!(engine.share_price(s.pool).unwrap() > dec!(100));
}

#[test]
fn previews_match_execution() {
    let mut s = scenario();
    let preview = s.fixture.engine.preview_deposit(s.pool, dec!(250)).unwrap();
    assert_eq!(preview.shares, dec!(2.5));
    assert_eq!(preview.cost, dec!(250));
    assert_eq!(s.fixture.engine.preview_redeem(s.pool, dec!(1)).unwrap(), dec!(100));
    assert_eq!(s.fixture.engine.preview_withdraw(s.pool, dec!(100)).unwrap(), dec!(1));

    let bob = s.fixture.new_user();
    s.fixture.fund(s.fixture.weth, bob, s.pool, dec!(250)).unwrap();
    let outcome = s.fixture.engine.deposit(bob, s.pool, dec!(250)).unwrap();
    assert_eq!(outcome, preview);
}

#[test]
fn dust_deposit_is_rejected() {
    let mut s = scenario();
    let bob = s.fixture.new_user();
    s.fixture.fund(s.fixture.weth, bob, s.pool, dec!(0.00000001)).unwrap();

    let err = s.fixture.engine.deposit(bob, s.pool, dec!(0.00000001)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(s.fixture.engine.balance_of(s.fixture.weth, bob), dec!(0.00000001));
}

#[test]
fn deposit_without_allowance_leaves_state_untouched() {
    let mut s = scenario();
    let bob = s.fixture.new_user();
    s.fixture.engine.mint(s.fixture.weth, bob, dec!(100)).unwrap();

    let err = s.fixture.engine.deposit(bob, s.pool, dec!(100)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(s.fixture.engine.balance_of(s.fixture.weth, bob), dec!(100));
    assert_eq!(s.fixture.engine.total_shares(s.pool).unwrap(), dec!(100));
    assert_eq!(last_rejection(&s.fixture), Some(Operation::Deposit));
}

#[test]
fn redeem_more_than_held_fails() {
    let mut s = scenario();
    let bob = s.fixture.new_user();
    let err = s.fixture.engine.redeem(bob, s.pool, dec!(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    let err = s.fixture.engine.redeem(s.deployer, s.pool, Decimal::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn native_transfers_are_rejected() {
    let mut s = scenario();
    let bob = s.fixture.new_user();
    let err = s.fixture.engine.send_native(bob, s.pool, dec!(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(last_rejection(&s.fixture), Some(Operation::NativeTransfer));

    let missing = Address(0xdead);
    let err = s.fixture.engine.send_native(bob, missing, dec!(1)).unwrap_err();
    assert!(matches!(err, EngineError::PoolNotFound(_)));
}

#[test]
fn stale_price_blocks_share_operations() {
    let mut s = scenario();
    let bob = s.fixture.new_user();
    s.fixture.fund(s.fixture.weth, bob, s.pool, dec!(100)).unwrap();

    // default max age is one hour
    s.fixture.engine.advance_time(3_601_000);
    let err = s.fixture.engine.deposit(bob, s.pool, dec!(100)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StaleOracle);
    assert_eq!(s.fixture.engine.latest_pair_price(s.pool).unwrap_err().kind(), ErrorKind::StaleOracle);
    assert_eq!(
        s.fixture.engine.redeem(s.deployer, s.pool, dec!(1)).unwrap_err().kind(),
        ErrorKind::StaleOracle
    );

    s.fixture.set_weth_price(dec!(2000)).unwrap();
    let outcome = s.fixture.engine.deposit(bob, s.pool, dec!(100)).unwrap();
    assert_eq!(outcome.shares, dec!(1));
}

#[test]
fn max_withdrawal_of_unlevered_pool_is_everything() {
    let s = scenario();
    assert_eq!(
        s.fixture.engine.calculate_max_withdrawal(s.pool).unwrap(),
        dec!(10000)
    );
    let snapshot = s.fixture.engine.snapshot(s.pool).unwrap();
    assert_eq!(snapshot.max_withdrawal, dec!(10000));
    assert_eq!(snapshot.total_shares, dec!(100));
    assert_eq!(snapshot.share_price, dec!(100));
}

#[test]
fn fully_redeemed_pool_is_a_rebalance_noop() {
    let mut s = scenario();
    let payout = s.fixture.engine.redeem(s.deployer, s.pool, dec!(100)).unwrap();
    assert_eq!(payout.amount, dec!(10000));

    let keeper = s.fixture.new_user();
    let report = s
        .fixture
        .engine
        .rebalance(keeper, s.pool, RebalanceHints::unbounded())
        .unwrap();
    assert_eq!(report.action, RebalanceAction::None);
    assert!(report.after.is_empty());
}

#[test]
fn deploy_emits_events_and_hands_over_share_minting() {
    let s = scenario();
    let engine = &s.fixture.engine;
    let deployed = engine
        .events()
        .iter()
        .find_map(|e| match &e.payload {
            EventPayload::PoolDeployed(d) => Some(d.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(deployed.pool, s.pool);
    assert_eq!(deployed.initial_shares, dec!(100));
    assert_eq!(deployed.deployer, s.deployer);

    let pool = engine.pool(s.pool).unwrap();
    let share = engine.chain().tokens.asset(pool.share_token()).unwrap();
    assert_eq!(share.minter, Some(s.pool));
    assert_eq!(pool.price_feed(), s.fixture.weth_feed);
    assert_eq!(engine.factory().deployed(), &[s.pool]);
}

fn request_for(fixture: &mut Fixture, symbol: &str, kind: StrategyKind, target: Leverage) -> DeployRequest {
    let share = fixture
        .engine
        .create_share_token(symbol, symbol, 18)
        .unwrap();
    let setup = match kind {
        StrategyKind::Long => PoolSetup::long(symbol, target),
        StrategyKind::Short => PoolSetup::short(symbol, target),
    };
    fixture.request(&setup, share)
}

#[test]
fn deploy_without_price_feed_key_fails() {
    let mut fixture = Fixture::weth_usdc().unwrap();
    let deployer = fixture.new_user();
    let factory = fixture.engine.factory().address();
    fixture.fund(fixture.weth, deployer, factory, dec!(10)).unwrap();

    let request = request_for(&mut fixture, "NOFEED", StrategyKind::Long, Leverage::from_bps(20_000));
    let err = fixture.engine.deploy_pool(deployer, request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(fixture.engine.balance_of(fixture.weth, deployer), dec!(10));
    assert_eq!(last_rejection(&fixture), Some(Operation::DeployPool));
}

#[test]
fn deploy_rejects_bad_parameters() {
    let mut fixture = Fixture::weth_usdc().unwrap();
    let deployer = fixture.new_user();

    let mut request = request_for(&mut fixture, "BAD", StrategyKind::Long, Leverage::from_bps(20_000));
    request.asset1 = request.asset0;
    let err = fixture.engine.deploy_pool(deployer, request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let request = request_for(&mut fixture, "BAD2", StrategyKind::Long, Leverage::from_bps(60_000));
    let err = fixture.engine.deploy_pool(deployer, request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut request = request_for(&mut fixture, "BAD3", StrategyKind::Long, Leverage::from_bps(20_000));
    request.initial_deposit = Decimal::ZERO;
    let err = fixture.engine.deploy_pool(deployer, request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut request = request_for(&mut fixture, "BAD4", StrategyKind::Long, Leverage::from_bps(20_000));
    request.strategy = Address(0xbeef);
    let err = fixture.engine.deploy_pool(deployer, request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn deploy_rejects_unreachable_target() {
    let options = FixtureOptions {
        max_ltv: dec!(0.5),
        ..FixtureOptions::default()
    };
    let mut fixture = Fixture::with_options(options).unwrap();
    let deployer = fixture.new_user();
    // 1 / (1 - 0.5) = 2x is the ceiling
    let setup = PoolSetup::long("ETH3X", Leverage::from_bps(30_000));
    let err = fixture.deploy(deployer, &setup).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let setup = PoolSetup::long("ETH15", Leverage::from_bps(15_000));
    assert!(fixture.deploy(deployer, &setup).is_ok());
}

#[test]
fn share_token_cannot_back_two_pools() {
    let mut s = scenario();
    let share = s.fixture.engine.pool(s.pool).unwrap().share_token();
    let setup = PoolSetup::long("ETHX", Leverage::from_bps(20_000));
    let factory = s.fixture.engine.factory().address();
    s.fixture.fund(s.fixture.weth, s.deployer, factory, dec!(10)).unwrap();

    let request = s.fixture.request(&setup, share);
    let err = s.fixture.engine.deploy_pool(s.deployer, request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn deploy_checks_venues_against_registry() {
    let mut fixture = Fixture::weth_usdc().unwrap();
    let deployer = fixture.new_user();
    let admin = fixture.engine.admin();
    let factory = fixture.engine.factory().address();
    fixture.fund(fixture.weth, deployer, factory, dec!(20)).unwrap();
    fixture
        .engine
        .set_registry_address(admin, "PriceFeed:VENUE", fixture.weth_feed)
        .unwrap();

    // a router the registry has never heard of
    let address = fixture.engine.allocate_address();
    let sushi = fixture
        .engine
        .install_exchange(Box::new(SimExchange::new(address, "Sushi")));
    let mut request = request_for(&mut fixture, "VENUE", StrategyKind::Long, Leverage::from_bps(20_000));
    request.exchange = sushi;
    let err = fixture.engine.deploy_pool(deployer, request.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // the registry names a different router under the same protocol
    fixture
        .engine
        .set_registry_address(admin, "Sushi:Router", Address(0xdead))
        .unwrap();
    let err = fixture.engine.deploy_pool(deployer, request.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fixture.engine.balance_of(fixture.weth, deployer), dec!(20));

    fixture
        .engine
        .set_registry_address(admin, "Sushi:Router", sushi)
        .unwrap();
    assert!(fixture.engine.deploy_pool(deployer, request).is_ok());
}

#[test]
fn deploy_checks_legs_against_registry() {
    let mut fixture = Fixture::weth_usdc().unwrap();
    let deployer = fixture.new_user();
    let admin = fixture.engine.admin();
    let factory = fixture.engine.factory().address();
    fixture.fund(fixture.weth, deployer, factory, dec!(10)).unwrap();
    fixture
        .engine
        .set_registry_address(admin, "PriceFeed:LEGS", fixture.weth_feed)
        .unwrap();
    fixture
        .engine
        .set_registry_address(admin, "USDC", Address(0xdead))
        .unwrap();

    let request = request_for(&mut fixture, "LEGS", StrategyKind::Long, Leverage::from_bps(20_000));
    let err = fixture.engine.deploy_pool(deployer, request).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Factory(leverage_vault::FactoryError::RegistryMismatch { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
}
