use proptest::prelude::*;
use vault_multiply::domain::{
    ExtraDeposit, FeeCompounding, LeverageDirection, LeverageRequest, Withdrawal,
};
use vault_multiply::engine::{
    assert_ratio_within, current_ratio, solve_decrease, solve_increase, InvariantError,
    LeverageSolver, SolverError,
};
use vault_multiply::{Decimal, FeeModel, PositionSnapshot, PriceQuote};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn tolerance() -> Decimal {
    d("0.005")
}

fn request(
    collateral: &str,
    debt: &str,
    price: &str,
    target_ratio: &str,
    slippage: &str,
) -> LeverageRequest {
    LeverageRequest::new(
        PositionSnapshot::new(d(collateral), d(debt)),
        PriceQuote::flat(d(price)),
        FeeModel::new(d("0.0002"), d("0")).unwrap(),
        d(target_ratio),
        d(slippage),
    )
}

#[test]
fn test_increase_from_empty_debt_reaches_target() {
    let req = request("100", "0", "2380", "3", "0.0001");
    let result = solve_increase(&req).unwrap();

    assert!(result.collateral_delta.is_positive());
    assert!(result.debt_delta.is_positive());

    let ratio = (d("100") + result.collateral_delta) * d("2380") / result.debt_delta;
    assert!((ratio - d("3")).abs() / d("3") <= tolerance());

    let after = req.position.apply(&result, &req.fees);
    assert_ratio_within(&after, d("2380"), d("3"), tolerance()).unwrap();
}

#[test]
fn test_increase_charges_flash_loan_fee_on_debt() {
    let mut req = request("100", "50000", "2000", "2", "0");
    req.fees = FeeModel::new(d("0.0002"), d("0.0009")).unwrap();
    let result = solve_increase(&req).unwrap();

    let after = req.position.apply(&result, &req.fees);
    assert_eq!(after.debt, d("50000") + result.debt_delta * d("1.0009"));
    assert_ratio_within(&after, d("2000"), d("2"), tolerance()).unwrap();
}

#[test]
fn test_decrease_towards_higher_ratio() {
    // R0 = 100 * 2000 / 100000 = 2
    let req = request("100", "100000", "2000", "3", "0.005");
    let before = current_ratio(&req.position, d("2000")).unwrap();
    assert_eq!(before, d("2"));

    let result = solve_decrease(&req).unwrap();
    assert!(result.debt_delta.is_positive());
    assert!(result.collateral_delta.is_positive());
    assert!(!result.closes_position);

    let after = req.position.apply(&result, &req.fees);
    assert_ratio_within(&after, d("2000"), d("3"), tolerance()).unwrap();
}

#[test]
fn test_decrease_to_zero_closes_position() {
    let req = request("100", "100000", "2000", "0", "0");
    let result = solve_decrease(&req).unwrap();
    assert!(result.closes_position);
    assert!(result.debt_delta >= d("100000"));

    let after = req.position.apply(&result, &req.fees);
    assert!(after.debt.is_zero());
    assert!(!after.has_debt());
    assert!(matches!(
        current_ratio(&after, d("2000")),
        Err(InvariantError::DivisionByZeroDebt { .. })
    ));
}

#[test]
fn test_increase_at_or_below_breakeven_is_infeasible() {
    // Oracle above market: breakeven = 3000 * 0.9998 / 2000 = 1.4997
    let mut req = request("10", "0", "2000", "1.4997", "0");
    req.quote = PriceQuote::new(d("3000"), d("2000"));
    assert_eq!(
        LeverageSolver::increase_breakeven_ratio(&req).unwrap(),
        d("1.4997")
    );

    match solve_increase(&req) {
        Err(SolverError::InfeasibleTargetRatio {
            denominator,
            breakeven_ratio,
            ..
        }) => {
            assert!(denominator.is_zero());
            assert_eq!(breakeven_ratio, d("1.4997"));
        }
        other => panic!("Expected InfeasibleTargetRatio, got {:?}", other),
    }

    req.target_ratio = d("1.2");
    assert!(matches!(
        solve_increase(&req),
        Err(SolverError::InfeasibleTargetRatio { .. })
    ));

    req.target_ratio = d("2");
    assert!(solve_increase(&req).is_ok());
}

#[test]
fn test_decrease_at_singular_ratio_is_infeasible() {
    let mut req = request("100", "100000", "2000", "1", "0");
    req.fees = FeeModel::free();
    assert!(matches!(
        solve_decrease(&req),
        Err(SolverError::InfeasibleTargetRatio { .. })
    ));
}

#[test]
fn test_custom_zero_epsilon_at_singular_ratio_is_infeasible() {
    let mut req = request("100", "100000", "2000", "1", "0");
    req.fees = FeeModel::free();
    let solver = LeverageSolver::new(Decimal::zero(), FeeCompounding::Additive);
    assert!(matches!(
        solver.decrease(&req),
        Err(SolverError::InfeasibleTargetRatio { .. })
    ));
}

#[test]
fn test_underwater_close_is_rejected_not_forgiven() {
    let mut req = request("10", "100000", "2000", "0", "0");
    req.fees = FeeModel::free();
    match solve_decrease(&req) {
        Err(SolverError::InsufficientCollateralToClose {
            repayable,
            shortfall,
            ..
        }) => {
            assert_eq!(repayable, d("20000"));
            assert_eq!(shortfall, d("80000"));
        }
        other => panic!("Expected InsufficientCollateralToClose, got {:?}", other),
    }
}

#[test]
fn test_wrong_direction_reports_negative_delta() {
    // Already at 2; reaching 3 needs a decrease, not an increase.
    let req = request("100", "100000", "2000", "3", "0");
    assert!(matches!(
        solve_increase(&req),
        Err(SolverError::NegativeDelta {
            direction: LeverageDirection::Increase,
            ..
        })
    ));

    let req = request("100", "50000", "2000", "2", "0");
    assert!(matches!(
        solve_decrease(&req),
        Err(SolverError::NegativeDelta {
            direction: LeverageDirection::Decrease,
            ..
        })
    ));
}

#[test]
fn test_invalid_inputs_rejected_before_solving() {
    let mut req = request("100", "0", "2380", "3", "0.0001");
    req.quote = PriceQuote::flat(d("0"));
    assert!(matches!(
        solve_increase(&req),
        Err(SolverError::InvalidInput {
            field: "oracle_price",
            ..
        })
    ));

    let req = request("100", "0", "2380", "3", "1");
    assert!(matches!(
        solve_increase(&req),
        Err(SolverError::InvalidInput {
            field: "slippage",
            ..
        })
    ));

    let req = request("100", "0", "2380", "3", "0.0001").with_withdrawal(Withdrawal::Debt(d("1")));
    assert!(matches!(
        solve_increase(&req),
        Err(SolverError::InvalidInput {
            field: "withdrawal",
            ..
        })
    ));

    let req =
        request("100", "100000", "2000", "3", "0").with_deposit(ExtraDeposit::Collateral(d("1")));
    assert!(matches!(
        solve_decrease(&req),
        Err(SolverError::InvalidInput {
            field: "extra_deposit",
            ..
        })
    ));
}

#[test]
fn test_deposits_and_withdrawals_still_land_on_target() {
    let price = d("2000");

    let req = request("100", "50000", "2000", "2", "0.001")
        .with_deposit(ExtraDeposit::Collateral(d("5")));
    let result = solve_increase(&req).unwrap();
    let after = req.position.apply(&result, &req.fees);
    assert_ratio_within(&after, price, d("2"), tolerance()).unwrap();

    let req =
        request("100", "50000", "2000", "2", "0.001").with_deposit(ExtraDeposit::Debt(d("10000")));
    let result = solve_increase(&req).unwrap();
    let after = req.position.apply(&result, &req.fees);
    assert_ratio_within(&after, price, d("2"), tolerance()).unwrap();

    let req = request("100", "100000", "2000", "3", "0.001")
        .with_withdrawal(Withdrawal::Collateral(d("4")));
    let result = solve_decrease(&req).unwrap();
    let after = req.position.apply(&result, &req.fees);
    assert_ratio_within(&after, price, d("3"), tolerance()).unwrap();

    let req = request("100", "100000", "2000", "3", "0.001")
        .with_withdrawal(Withdrawal::Debt(d("5000")));
    let result = solve_decrease(&req).unwrap();
    let after = req.position.apply(&result, &req.fees);
    assert_ratio_within(&after, price, d("3"), tolerance()).unwrap();
}

#[test]
fn test_compounded_fee_term_costs_more() {
    let mut req = request("100", "100000", "2000", "3", "0.001");
    req.fees = FeeModel::new(d("0.0002"), d("0.0009")).unwrap();

    let additive = LeverageSolver::default().decrease(&req).unwrap();
    let compounded = LeverageSolver::new(d("0.000000000001"), FeeCompounding::Compounded)
        .decrease(&req)
        .unwrap();

    assert!(compounded.collateral_delta > additive.collateral_delta);
}

fn scaled(value: i64, scale: u32) -> Decimal {
    Decimal::try_from_scaled(value as i128, scale).unwrap()
}

proptest! {
    #[test]
    fn prop_increase_lands_on_target(
        collateral in 1i64..1_000_000,
        price in 100i64..10_000_000,
        target in 150i64..1_000,
        slippage in 0i64..100,
    ) {
        // collateral in 0.01 units, price in 0.01, target in 0.01, slippage in bps
        let price = scaled(price, 2);
        let req = LeverageRequest::new(
            PositionSnapshot::new(scaled(collateral, 2), Decimal::zero()),
            PriceQuote::flat(price),
            FeeModel::new(d("0.0002"), d("0.0005")).unwrap(),
            scaled(target, 2),
            scaled(slippage, 4),
        );
        let result = solve_increase(&req).unwrap();
        prop_assert!(result.debt_delta.is_positive());
        let after = req.position.apply(&result, &req.fees);
        prop_assert!(assert_ratio_within(&after, price, req.target_ratio, tolerance()).is_ok());
    }

    #[test]
    fn prop_decrease_lands_on_target(
        start in 120i64..300,
        step in 10i64..500,
        slippage in 0i64..100,
    ) {
        // start ratio and step in 0.01
        let price = d("2000");
        let collateral = d("50");
        let debt = collateral * price / scaled(start, 2);
        let req = LeverageRequest::new(
            PositionSnapshot::new(collateral, debt),
            PriceQuote::flat(price),
            FeeModel::new(d("0.0002"), d("0.0005")).unwrap(),
            scaled(start + step, 2),
            scaled(slippage, 4),
        );
        let result = solve_decrease(&req).unwrap();
        prop_assert!(result.collateral_delta.is_positive());
        let after = req.position.apply(&result, &req.fees);
        prop_assert!(assert_ratio_within(&after, price, req.target_ratio, tolerance()).is_ok());
    }
}
