//! Solve, plan and settle a leverage increase followed by a partial deleverage.

use vault_multiply::domain::Payload;
use vault_multiply::engine::SwapRoute;
use vault_multiply::{
    assert_ratio_within, to_base_units, Address, Decimal, FeeModel, FeeSide, LeverageDirection,
    LeverageRequest, LeverageSolver, MockExecutionSink, PositionSnapshot, PriceQuote,
    SettlementAgent, SwapPlanner, Token,
};

const PRICE: &str = "2000";

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn addr(n: u8) -> Address {
    Address::parse(&format!("0x{}", hex::encode([n; 20]))).unwrap()
}

fn fees() -> FeeModel {
    FeeModel::new(d("0.0002"), d("0")).unwrap()
}

fn route() -> SwapRoute {
    SwapRoute {
        target: addr(0x77),
        payload: Payload::from_hex("0x5ae401dc").unwrap(),
    }
}

fn request(position: PositionSnapshot, target_ratio: &str) -> LeverageRequest {
    LeverageRequest::new(
        position,
        PriceQuote::flat(d(PRICE)),
        fees(),
        d(target_ratio),
        d("0.001"),
    )
}

#[test]
fn test_multiply_then_partial_deleverage() {
    let weth = Token::new("WETH", 18);
    let usdc = Token::new("USDC", 6);
    let planner = SwapPlanner::new(weth.clone(), usdc.clone(), LeverageSolver::default());
    let tolerance = d("0.005");

    let vault = addr(0x01);
    let agent_address = addr(0xaa);
    let mut agent = SettlementAgent::new(agent_address.clone(), addr(0xfe), &fees())
        .with_authorized([vault.clone()]);

    // Vault holds 10 WETH and no debt.
    let position = PositionSnapshot::new(d("10"), Decimal::zero());
    agent
        .ledger_mut()
        .credit(&vault, &weth.id, to_base_units(&d("10"), 18).unwrap())
        .unwrap();

    // Increase to 200%.
    let req = request(position, "2");
    let (result, ix) = planner
        .solve_and_plan(&req, LeverageDirection::Increase, route())
        .unwrap();
    let predicted = position.apply(&result, &req.fees);
    assert_ratio_within(&predicted, d(PRICE), d("2"), tolerance).unwrap();

    // Flash-borrowed USDC lands with the vault, which approves the agent.
    let borrowed = ix.amount_in.base_units().unwrap();
    agent.ledger_mut().credit(&vault, &usdc.id, borrowed).unwrap();
    agent
        .ledger_mut()
        .approve(&vault, &agent_address, &usdc.id, borrowed);

    // Market fills at the mid price, better than the worst case.
    let outcome = agent
        .execute(
            vault.clone(),
            ix,
            FeeSide::Net,
            &MockExecutionSink::at_rate(d("0.0005")),
        )
        .unwrap();
    assert!(outcome.amount_received.amount >= result.worst_case_amount_out().round_down(18));
    assert!(agent.ledger().holdings(&agent_address).is_empty());

    let levered = PositionSnapshot::new(
        position.collateral + outcome.net_to_caller.amount,
        position.debt + result.debt_delta * req.fees.flash_loan_repayment(),
    );
    let ratio = assert_ratio_within(&levered, d(PRICE), d("2"), tolerance).unwrap();
    assert!(ratio >= d("2"));

    // Deleverage to 300%.
    let req = request(levered, "3");
    let (result, ix) = planner
        .solve_and_plan(&req, LeverageDirection::Decrease, route())
        .unwrap();
    let predicted = levered.apply(&result, &req.fees);
    assert_ratio_within(&predicted, d(PRICE), d("3"), tolerance).unwrap();

    let sold = ix.amount_in.base_units().unwrap();
    agent
        .ledger_mut()
        .approve(&vault, &agent_address, &weth.id, sold);
    let outcome = agent
        .execute(
            vault.clone(),
            ix,
            FeeSide::Gross,
            &MockExecutionSink::at_rate(d(PRICE)),
        )
        .unwrap();
    assert!(agent.ledger().holdings(&agent_address).is_empty());

    let delevered = PositionSnapshot::new(
        levered.collateral - result.collateral_delta,
        levered.debt - outcome.net_to_caller.amount,
    );
    let ratio = assert_ratio_within(&delevered, d(PRICE), d("3"), tolerance).unwrap();
    assert!(ratio >= d("3"));

    assert_eq!(agent.history().len(), 2);
    let beneficiary_weth = agent.ledger().balance_of(&addr(0xfe), &weth.id);
    let beneficiary_usdc = agent.ledger().balance_of(&addr(0xfe), &usdc.id);
    assert!(!beneficiary_weth.is_zero());
    assert!(!beneficiary_usdc.is_zero());
}
