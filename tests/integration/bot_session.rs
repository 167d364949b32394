//! Trading session driven end to end: scripted feeds, the timer-driven
//! controller, and the backtester over the same inputs.

use std::time::Duration;

use xenith::backtest::Backtester;
use xenith::engine::{Session, SessionController};
use xenith::feeds::price::PriceSeries;
use xenith::feeds::ScriptedScores;
use xenith::strategy::Decision;
use xenith::types::{Direction, StrategyConfig, StrategyMode};

fn follow_100ms() -> StrategyConfig {
    StrategyConfig { mode: StrategyMode::Follow, tick_interval_ms: 100 }
}

fn scenario_session() -> Session {
    Session::new(
        follow_100ms(),
        1000.0,
        PriceSeries::new(vec![100.0, 101.96, 101.0]).unwrap(),
        Box::new(ScriptedScores::new(vec![60, 60, 40])),
    )
}

#[test]
fn open_hold_then_reversal_close() {
    let mut s = scenario_session();

    let first = s.step(1);
    assert!(matches!(
        first.decision,
        Decision::Open { direction: Direction::Long, price, score: 60 } if price == 100.0
    ));

    let second = s.step(2);
    assert!(matches!(second.decision, Decision::Hold { .. }));
    assert_eq!(second.equity, 1000.0);

    let third = s.step(3);
    let Decision::Close { direction, pnl, gain, .. } = third.decision else {
        panic!("expected close, got {:?}", third.decision);
    };
    assert_eq!(direction, Direction::Long);
    assert!((pnl - 0.01).abs() < 1e-12);
    assert!((gain - 10.0).abs() < 1e-9);
    assert!((s.equity() - 1010.0).abs() < 1e-9);
    assert!(s.position().is_none());

    assert_eq!(
        s.log().lines(),
        vec![
            "Close LONG at 101.00 | PnL 10.00".to_string(),
            "Open LONG at 100.00 (score 60)".to_string(),
        ]
    );
}

#[test]
fn backtest_agrees_with_manual_session() {
    let report = Backtester::new(follow_100ms(), 1000.0)
        .run(&[60, 60, 40], &[100.0, 101.96, 101.0])
        .unwrap();
    assert_eq!(report.total_trades, 1);
    assert_eq!(report.wins, 1);
    assert!((report.final_equity - 1010.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn controller_runs_scenario_on_timer_and_stop_freezes_state() {
    let ctl = SessionController::new(scenario_session());
    assert!(ctl.start().await);

    // Ticks land at 100, 200 and 300ms.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(ctl.stop().await);

    let before = ctl.snapshot().await;
    assert_eq!(before.steps, 3);
    assert!((before.equity - 1010.0).abs() < 1e-9);

    assert!(!ctl.stop().await);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let after = ctl.snapshot().await;
    assert_eq!(after.steps, before.steps);
    assert_eq!(after.equity, before.equity);
    assert_eq!(after.log, before.log);
    assert_eq!(after.position, before.position);
}

#[test]
fn stop_without_start_is_a_no_op() {
    let ctl = SessionController::new(scenario_session());
    tokio_test::block_on(async {
        assert!(!ctl.stop().await);
        assert!(!ctl.is_running().await);
        assert_eq!(ctl.snapshot().await.steps, 0);
    });
}

#[tokio::test(start_paused = true)]
async fn exhausted_feeds_keep_last_score_and_price() {
    let ctl = SessionController::new(scenario_session());
    for _ in 0..3 {
        ctl.step_now().await;
    }
    // Feed is exhausted: score stays 40 (short bias), price stays 101.
    let out = ctl.step_now().await;
    assert_eq!(out.score, 40);
    assert_eq!(out.price, 101.0);
    assert!(matches!(out.decision, Decision::Open { direction: Direction::Short, .. }));

    let out = ctl.step_now().await;
    assert!(matches!(out.decision, Decision::Hold { pnl } if pnl == 0.0));
    assert_eq!(ctl.snapshot().await.price_cursor, 2);
}
