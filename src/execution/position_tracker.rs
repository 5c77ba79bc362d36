use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::Error;
use crate::models::{Direction, ExitReason, Position, PositionState, Signal, Statistics};
use crate::Result;

/// Owns every simulated position for the lifetime of the process
///
/// Open positions live in a map keyed by instrument; closed positions are
/// moved into an append-only history and never touched again.
#[derive(Debug, Default)]
pub struct PositionTracker {
    open: HashMap<String, Position>,
    closed: Vec<Position>,
    next_seq: u64,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a position from a signal (live trading - uses current time)
    pub fn open(&mut self, signal: Signal) -> Result<Position> {
        self.open_at(signal, Utc::now())
    }

    /// Open a position with an explicit timestamp
    ///
    /// Rejects the signal if the instrument already has an open position.
    /// Ids are `{instrument}_{unix secs}_{seq}` with a per-tracker sequence,
    /// so a close and reopen within the same second still get distinct ids.
    pub fn open_at(&mut self, signal: Signal, timestamp: DateTime<Utc>) -> Result<Position> {
        if self.has_open_position(&signal.instrument) {
            return Err(Error::PositionRejected {
                instrument: signal.instrument,
            });
        }

        self.next_seq += 1;
        let position = Position {
            id: format!(
                "{}_{}_{}",
                signal.instrument,
                timestamp.timestamp(),
                self.next_seq
            ),
            instrument: signal.instrument,
            direction: signal.direction,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            risk_reward: signal.risk_reward,
            opened_at: timestamp,
            state: PositionState::Open,
            exit_price: None,
            exit_reason: None,
            pnl_percent: None,
            closed_at: None,
        };

        self.open
            .insert(position.instrument.clone(), position.clone());
        Ok(position)
    }

    /// Check if we have an open position for the instrument
    pub fn has_open_position(&self, instrument: &str) -> bool {
        self.open.contains_key(instrument)
    }

    pub fn get_open_position(&self, instrument: &str) -> Option<&Position> {
        self.open.get(instrument)
    }

    /// Open positions, oldest first
    pub fn open_positions(&self) -> Vec<&Position> {
        let mut positions: Vec<&Position> = self.open.values().collect();
        positions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then(a.id.cmp(&b.id)));
        positions
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Instruments that currently hold an open position
    pub fn open_instruments(&self) -> Vec<String> {
        self.open_positions()
            .into_iter()
            .map(|p| p.instrument.clone())
            .collect()
    }

    /// Closed positions in the order they were closed
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed
    }

    /// Check all open positions for exits (live trading - uses current time)
    ///
    /// Returns the positions closed by this call.
    pub fn check_exits<F>(&mut self, price_lookup: F) -> Vec<Position>
    where
        F: FnMut(&str) -> Option<f64>,
    {
        self.check_exits_at(price_lookup, Utc::now())
    }

    /// Check all open positions for exits with an explicit timestamp
    ///
    /// Positions whose price lookup fails are left untouched.
    pub fn check_exits_at<F>(&mut self, mut price_lookup: F, now: DateTime<Utc>) -> Vec<Position>
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let to_check: Vec<(String, f64)> = self
            .open_positions()
            .into_iter()
            .filter_map(|p| price_lookup(&p.instrument).map(|price| (p.instrument.clone(), price)))
            .collect();

        let mut closed = Vec::new();
        for (instrument, price) in to_check {
            let reason = match self.open.get(&instrument).and_then(|p| exit_reason(p, price)) {
                Some(reason) => reason,
                None => continue,
            };

            if let Some(mut position) = self.open.remove(&instrument) {
                position.state = PositionState::Closed;
                position.exit_price = Some(price);
                position.exit_reason = Some(reason);
                position.pnl_percent = Some(position.pnl_percent_at(price));
                position.closed_at = Some(now);

                self.closed.push(position.clone());
                closed.push(position);
            }
        }

        closed
    }

    /// Win rate (share of target exits), count and summed PnL of closed positions
    pub fn statistics(&self) -> Statistics {
        let total_closed = self.closed.len();
        if total_closed == 0 {
            return Statistics::default();
        }

        let wins = self
            .closed
            .iter()
            .filter(|p| p.exit_reason == Some(ExitReason::Target))
            .count();

        Statistics {
            win_rate: wins as f64 / total_closed as f64 * 100.0,
            total_closed,
            total_pnl_percent: self.closed.iter().filter_map(|p| p.pnl_percent).sum(),
        }
    }
}

/// Exit test for a single position; the stop is always checked first
pub fn exit_reason(position: &Position, price: f64) -> Option<ExitReason> {
    match position.direction {
        Direction::Long => {
            if price <= position.stop_loss {
                Some(ExitReason::Stop)
            } else if price >= position.take_profit {
                Some(ExitReason::Target)
            } else {
                None
            }
        }
        Direction::Short => {
            if price >= position.stop_loss {
                Some(ExitReason::Stop)
            } else if price <= position.take_profit {
                Some(ExitReason::Target)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelType;

    fn signal(instrument: &str, direction: Direction, entry: f64, stop: f64, target: f64) -> Signal {
        Signal {
            instrument: instrument.to_string(),
            direction,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            risk_reward: 2.0,
            channel_angle: 1.0,
            slope: 0.1,
            avg_volume: 1000.0,
            channel_type: ChannelType::Up,
        }
    }

    fn long(instrument: &str) -> Signal {
        signal(instrument, Direction::Long, 100.0, 95.0, 110.0)
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_open_position() {
        let mut tracker = PositionTracker::new();
        let ts = Utc::now();
        let position = tracker.open_at(long("BTCUSDT"), ts).unwrap();

        assert_eq!(position.id, format!("BTCUSDT_{}_1", ts.timestamp()));
        assert_eq!(position.state, PositionState::Open);
        assert_eq!(position.stop_loss, 95.0);
        assert_eq!(position.take_profit, 110.0);
        assert!(tracker.has_open_position("BTCUSDT"));
        assert_eq!(tracker.open_count(), 1);
    }

    #[test]
    fn test_prevent_duplicate_positions() {
        let mut tracker = PositionTracker::new();
        tracker.open(long("BTCUSDT")).unwrap();

        let result = tracker.open(long("BTCUSDT"));
        assert!(matches!(result, Err(Error::PositionRejected { .. })));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("already have open position"));
        assert_eq!(tracker.open_count(), 1);
    }

    #[test]
    fn test_long_stop_loss() {
        let mut tracker = PositionTracker::new();
        tracker.open(long("BTCUSDT")).unwrap();

        let closed = tracker.check_exits(|_| Some(94.0));

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].state, PositionState::Closed);
        assert_eq!(closed[0].exit_reason, Some(ExitReason::Stop));
        assert_eq!(closed[0].exit_price, Some(94.0));
        assert_eq!(closed[0].pnl_percent, Some(-6.0));
        assert!(closed[0].closed_at.is_some());
        assert!(!tracker.has_open_position("BTCUSDT"));
        assert_eq!(tracker.closed_positions().len(), 1);
    }

    #[test]
    fn test_long_take_profit() {
        let mut tracker = PositionTracker::new();
        tracker.open(long("BTCUSDT")).unwrap();

        let closed = tracker.check_exits(|_| Some(111.0));

        assert_eq!(closed[0].exit_reason, Some(ExitReason::Target));
        assert_eq!(closed[0].pnl_percent, Some(11.0));
    }

    #[test]
    fn test_long_stays_open_inside_levels() {
        let mut tracker = PositionTracker::new();
        tracker.open(long("BTCUSDT")).unwrap();

        assert!(tracker.check_exits(|_| Some(102.0)).is_empty());
        assert!(tracker.has_open_position("BTCUSDT"));
        assert!(tracker.closed_positions().is_empty());
    }

    #[test]
    fn test_short_exits() {
        let mut tracker = PositionTracker::new();
        tracker
            .open(signal("ETHUSDT", Direction::Short, 100.0, 105.0, 90.0))
            .unwrap();
        tracker
            .open(signal("SOLUSDT", Direction::Short, 100.0, 105.0, 90.0))
            .unwrap();

        let closed = tracker.check_exits(|i| Some(if i == "ETHUSDT" { 106.0 } else { 89.0 }));
        assert_eq!(closed.len(), 2);

        let eth = closed.iter().find(|p| p.instrument == "ETHUSDT").unwrap();
        assert_eq!(eth.exit_reason, Some(ExitReason::Stop));
        assert_eq!(eth.pnl_percent, Some(-6.0));

        let sol = closed.iter().find(|p| p.instrument == "SOLUSDT").unwrap();
        assert_eq!(sol.exit_reason, Some(ExitReason::Target));
        assert_eq!(sol.pnl_percent, Some(11.0));
    }

    #[test]
    fn test_stop_checked_before_target() {
        // Inverted levels make both conditions true at once
        let mut tracker = PositionTracker::new();
        tracker
            .open(signal("BTCUSDT", Direction::Long, 100.0, 110.0, 90.0))
            .unwrap();
        tracker
            .open(signal("ETHUSDT", Direction::Short, 100.0, 90.0, 110.0))
            .unwrap();

        let closed = tracker.check_exits(|_| Some(100.0));
        assert_eq!(closed.len(), 2);
        assert!(closed
            .iter()
            .all(|p| p.exit_reason == Some(ExitReason::Stop)));
    }

    #[test]
    fn test_missing_price_skips_position() {
        let mut tracker = PositionTracker::new();
        tracker.open(long("BTCUSDT")).unwrap();
        tracker.open(long("ETHUSDT")).unwrap();

        let quotes = prices(&[("ETHUSDT", 94.0)]);
        let closed = tracker.check_exits(|i| quotes.get(i).copied());

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].instrument, "ETHUSDT");
        assert!(tracker.has_open_position("BTCUSDT"));
    }

    #[test]
    fn test_reopen_after_close() {
        let mut tracker = PositionTracker::new();
        tracker.open(long("BTCUSDT")).unwrap();
        tracker.check_exits(|_| Some(120.0));

        assert!(tracker.open(long("BTCUSDT")).is_ok());
        assert_eq!(tracker.open_count(), 1);
        assert_eq!(tracker.closed_positions().len(), 1);
    }

    #[test]
    fn test_reopen_in_same_second_gets_new_id() {
        let mut tracker = PositionTracker::new();
        let ts = Utc::now();
        let first = tracker.open_at(long("BTCUSDT"), ts).unwrap();
        let closed = tracker.check_exits_at(|_| Some(120.0), ts);
        let second = tracker.open_at(long("BTCUSDT"), ts).unwrap();

        assert_eq!(closed[0].id, first.id);
        assert_ne!(closed[0].id, second.id);
        assert_eq!(tracker.get_open_position("BTCUSDT").unwrap().id, second.id);
    }

    #[test]
    fn test_closed_position_is_frozen() {
        let mut tracker = PositionTracker::new();
        tracker.open(long("BTCUSDT")).unwrap();
        tracker.check_exits(|_| Some(111.0));

        // Later prices no longer affect history
        tracker.check_exits(|_| Some(50.0));
        let history = tracker.closed_positions();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].pnl_percent, Some(11.0));
        assert_eq!(history[0].exit_reason, Some(ExitReason::Target));
    }

    #[test]
    fn test_statistics() {
        let mut tracker = PositionTracker::new();
        assert_eq!(tracker.statistics(), Statistics::default());

        tracker
            .open(signal("BTCUSDT", Direction::Long, 100.0, 90.0, 105.0))
            .unwrap();
        tracker
            .open(signal("ETHUSDT", Direction::Long, 100.0, 97.0, 110.0))
            .unwrap();

        let quotes = prices(&[("BTCUSDT", 105.0), ("ETHUSDT", 97.0)]);
        tracker.check_exits(|i| quotes.get(i).copied());

        let stats = tracker.statistics();
        assert_eq!(stats.win_rate, 50.0);
        assert_eq!(stats.total_closed, 2);
        assert_eq!(stats.total_pnl_percent, 2.0);
    }

    #[test]
    fn test_open_instruments() {
        let mut tracker = PositionTracker::new();
        let ts = Utc::now();
        tracker.open_at(long("BTCUSDT"), ts).unwrap();
        tracker
            .open_at(long("ETHUSDT"), ts + chrono::Duration::seconds(1))
            .unwrap();

        assert_eq!(tracker.open_instruments(), vec!["BTCUSDT", "ETHUSDT"]);
    }
}
