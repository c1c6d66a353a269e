//! Betting rounds driven by the caller: one manual spin, or an automated run
//! with bet progression and stop limits. Rounds never overlap; the caller
//! awaits each round (and any animation delay) before asking for the next.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    engine::{settle, spin_with, EngineConfig, Outcome, Settlement},
    error::{EngineError, EngineResult},
    risk::RiskTier,
    rng::DrawSource,
    table::{resolve_table, SegmentCount, SegmentTable},
};

pub fn validate_bet(bet: f64, balance: f64) -> EngineResult<()> {
    if bet.is_finite() && bet > 0.0 && bet <= balance {
        Ok(())
    } else {
        Err(EngineError::InvalidBet { bet, balance })
    }
}

/// Debit `bet`, spin once and credit the payout.
pub fn manual_spin<S: DrawSource + ?Sized>(
    table: &SegmentTable,
    bet: f64,
    balance: &mut f64,
    source: &mut S,
    config: &EngineConfig,
) -> EngineResult<(Outcome, Settlement)> {
    validate_bet(bet, *balance)?;
    *balance -= bet;
    let outcome = spin_with(table, source, config);
    let settlement = settle(bet, outcome.multiplier);
    *balance += settlement.payout;
    Ok((outcome, settlement))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoBetConfig {
    pub number_of_bets: u32,
    pub base_bet: f64,
    /// Fractional bet increase after a win, `0.5` = +50%.
    pub win_increase: f64,
    pub loss_increase: f64,
    /// Stop once total profit reaches this. `0` disables.
    pub stop_profit: f64,
    /// Stop once total loss reaches this. `0` disables.
    pub stop_loss: f64,
    pub risk: RiskTier,
    pub segment_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SessionState {
    pub current_bet: f64,
    pub total_profit: f64,
    pub remaining_bets: u32,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    ProfitTarget,
    LossLimit,
    InsufficientBalance,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Round {
    pub number: u32,
    pub outcome: Outcome,
    pub settlement: Settlement,
    pub balance_after: f64,
}

#[derive(Debug, Clone)]
pub struct AutoBetSession {
    config: AutoBetConfig,
    table: SegmentTable,
    state: SessionState,
    played: u32,
    stopped: Option<StopReason>,
}

impl AutoBetSession {
    pub fn new(config: AutoBetConfig, balance: f64) -> EngineResult<Self> {
        let count = SegmentCount::new(config.segment_count)?;
        validate_bet(config.base_bet, balance)?;
        let table = resolve_table(config.risk, count);
        let state = SessionState {
            current_bet: config.base_bet,
            total_profit: 0.0,
            remaining_bets: config.number_of_bets,
            balance,
        };
        Ok(Self {
            config,
            table,
            state,
            played: 0,
            stopped: None,
        })
    }

    pub fn config(&self) -> &AutoBetConfig {
        &self.config
    }

    pub fn table(&self) -> &SegmentTable {
        &self.table
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Play the next round, or `None` once the session has stopped.
    pub fn play_round<S: DrawSource + ?Sized>(
        &mut self,
        source: &mut S,
        engine: &EngineConfig,
    ) -> Option<Round> {
        if self.stopped.is_some() {
            return None;
        }
        if self.state.remaining_bets == 0 {
            self.stop(StopReason::Completed);
            return None;
        }
        let bet = self.state.current_bet;
        let mut balance = self.state.balance;
        let (outcome, settlement) =
            match manual_spin(&self.table, bet, &mut balance, source, engine) {
                Ok(r) => r,
                Err(_) => {
                    self.stop(StopReason::InsufficientBalance);
                    return None;
                }
            };

        self.played += 1;
        self.state.balance = balance;
        self.state.total_profit += settlement.profit;
        self.state.remaining_bets -= 1;
        self.state.current_bet = self.next_bet(bet, outcome.multiplier);

        info!(
            round = self.played,
            bet,
            multiplier = outcome.multiplier,
            payout = settlement.payout,
            balance = self.state.balance,
            "auto bet round"
        );

        let (stop_profit, stop_loss) = (self.config.stop_profit, self.config.stop_loss);
        if stop_profit > 0.0 && self.state.total_profit >= stop_profit {
            self.stop(StopReason::ProfitTarget);
        } else if stop_loss > 0.0 && self.state.total_profit <= -stop_loss {
            self.stop(StopReason::LossLimit);
        } else if self.state.remaining_bets == 0 {
            self.stop(StopReason::Completed);
        }

        Some(Round {
            number: self.played,
            outcome,
            settlement,
            balance_after: self.state.balance,
        })
    }

    /// Play rounds back to back until the session stops.
    pub fn run<S: DrawSource + ?Sized>(
        &mut self,
        source: &mut S,
        engine: &EngineConfig,
    ) -> Vec<Round> {
        let mut rounds = Vec::new();
        while let Some(round) = self.play_round(source, engine) {
            rounds.push(round);
        }
        rounds
    }

    fn next_bet(&self, bet: f64, multiplier: f64) -> f64 {
        let increase = if multiplier > 1.0 {
            self.config.win_increase
        } else {
            self.config.loss_increase
        };
        let mut next = bet + bet * increase;
        if next > self.state.balance {
            next = self.state.balance;
        }
        if next <= 0.0 {
            next = self.config.base_bet;
        }
        next
    }

    fn stop(&mut self, reason: StopReason) {
        info!(
            ?reason,
            rounds = self.played,
            profit = self.state.total_profit,
            "auto bet stopped"
        );
        self.stopped = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f64>, usize);

    impl DrawSource for Fixed {
        fn next_draw(&mut self) -> f64 {
            let d = self.0[self.1 % self.0.len()];
            self.1 += 1;
            d
        }
    }

    fn config() -> AutoBetConfig {
        AutoBetConfig {
            number_of_bets: 5,
            base_bet: 10.0,
            win_increase: 0.0,
            loss_increase: 0.0,
            stop_profit: 0.0,
            stop_loss: 0.0,
            risk: RiskTier::High,
            segment_count: 10,
        }
    }

    // High/10: draws <= 0.8 land on 0x, draws above land on 9.90x.
    const LOSE: f64 = 0.05;
    const WIN: f64 = 0.95;

    #[test]
    fn test_validate_bet() {
        assert!(validate_bet(10.0, 10.0).is_ok());
        assert!(validate_bet(0.0, 10.0).is_err());
        assert!(validate_bet(-1.0, 10.0).is_err());
        assert!(validate_bet(11.0, 10.0).is_err());
        assert!(validate_bet(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn test_manual_spin_updates_balance() {
        let table = resolve_table(RiskTier::High, SegmentCount::new(10).unwrap());
        let mut balance = 100.0;
        let (out, s) = manual_spin(
            &table,
            10.0,
            &mut balance,
            &mut Fixed(vec![WIN], 0),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(out.multiplier, 9.90);
        assert!((s.payout - 99.0).abs() < 1e-9);
        assert!((balance - 189.0).abs() < 1e-9);

        let err = manual_spin(
            &table,
            500.0,
            &mut balance,
            &mut Fixed(vec![WIN], 0),
            &EngineConfig::default(),
        );
        assert!(matches!(err, Err(EngineError::InvalidBet { .. })));
        assert!((balance - 189.0).abs() < 1e-9);
    }

    #[test]
    fn test_runs_all_bets() {
        let mut session = AutoBetSession::new(config(), 1000.0).unwrap();
        let rounds = session.run(&mut Fixed(vec![LOSE], 0), &EngineConfig::default());
        assert_eq!(rounds.len(), 5);
        assert_eq!(session.stop_reason(), Some(StopReason::Completed));
        let state = session.state();
        assert_eq!(state.remaining_bets, 0);
        assert_eq!(state.total_profit, -50.0);
        assert_eq!(state.balance, 950.0);
        assert!(session.play_round(&mut Fixed(vec![LOSE], 0), &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_loss_progression_and_clamp() {
        let mut c = config();
        c.loss_increase = 1.0;
        c.number_of_bets = 10;
        let mut session = AutoBetSession::new(c, 60.0).unwrap();
        let rounds = session.run(&mut Fixed(vec![LOSE], 0), &EngineConfig::default());
        // the doubled 40 is clamped to the 30 left
        let bets: Vec<f64> = rounds.iter().map(|r| r.settlement.bet).collect();
        assert_eq!(bets, vec![10.0, 20.0, 30.0]);
        assert_eq!(session.state().balance, 0.0);
        // clamped to zero, so the bet resets to base
        assert_eq!(session.state().current_bet, 10.0);
        assert_eq!(session.stop_reason(), Some(StopReason::InsufficientBalance));
    }

    #[test]
    fn test_win_increase() {
        let mut c = config();
        c.win_increase = 0.5;
        let mut session = AutoBetSession::new(c, 1000.0).unwrap();
        let engine = EngineConfig::default();
        let mut draws = Fixed(vec![WIN, LOSE], 0);
        session.play_round(&mut draws, &engine).unwrap();
        assert_eq!(session.state().current_bet, 15.0);
        session.play_round(&mut draws, &engine).unwrap();
        assert_eq!(session.state().current_bet, 15.0);
    }

    #[test]
    fn test_stop_profit() {
        let mut c = config();
        c.stop_profit = 50.0;
        let mut session = AutoBetSession::new(c, 100.0).unwrap();
        let rounds = session.run(&mut Fixed(vec![WIN], 0), &EngineConfig::default());
        assert_eq!(rounds.len(), 1);
        assert_eq!(session.stop_reason(), Some(StopReason::ProfitTarget));
    }

    #[test]
    fn test_stop_loss() {
        let mut c = config();
        c.stop_loss = 25.0;
        let mut session = AutoBetSession::new(c, 100.0).unwrap();
        let rounds = session.run(&mut Fixed(vec![LOSE], 0), &EngineConfig::default());
        assert_eq!(rounds.len(), 3);
        assert_eq!(session.stop_reason(), Some(StopReason::LossLimit));
        assert_eq!(session.state().total_profit, -30.0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut c = config();
        c.segment_count = 0;
        assert_eq!(
            AutoBetSession::new(c, 100.0).unwrap_err(),
            EngineError::InvalidSegmentCount(0)
        );
        assert!(matches!(
            AutoBetSession::new(config(), 5.0),
            Err(EngineError::InvalidBet { .. })
        ));
    }
}
