use crate::models::{ExitReason, Position, Signal};

/// HTML message announcing a new entry
pub fn format_entry_message(signal: &Signal, regression_length: usize) -> String {
    format!(
        "🎯 <b>NEW SIGNAL - {}</b>\n\n\
         📊 Pair: {}\n\
         💰 Price: {:.4}\n\
         🛡️ SL: {:.4}\n\
         🎯 TP: {:.4}\n\
         📊 R/R: {:.2}\n\
         📈 Angle: {:.2}°\n\
         🔢 Channel: {} candles",
        signal.direction,
        signal.instrument,
        signal.entry_price,
        signal.stop_loss,
        signal.take_profit,
        signal.risk_reward,
        signal.channel_angle,
        regression_length
    )
}

/// HTML message announcing a closed position
pub fn format_exit_message(position: &Position) -> String {
    let emoji = match position.exit_reason {
        Some(ExitReason::Target) => "🟢",
        _ => "🔴",
    };
    let reason = position
        .exit_reason
        .map(|r| r.to_string())
        .unwrap_or_else(|| "?".to_string());

    format!(
        "{} <b>POSITION CLOSED - {}</b>\n\n\
         📊 Pair: {}\n\
         🎯 Direction: {}\n\
         💰 Entry: {:.4}\n\
         💸 Exit: {:.4}\n\
         🛡️ SL: {:.4}\n\
         🎯 TP: {:.4}\n\n\
         📈 PnL: {:+.2}%",
        emoji,
        reason,
        position.instrument,
        position.direction,
        position.entry_price,
        position.exit_price.unwrap_or(f64::NAN),
        position.stop_loss,
        position.take_profit,
        position.pnl_percent.unwrap_or(0.0)
    )
}
