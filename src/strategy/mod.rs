// Trading strategy module
pub mod channel_reversion;

pub use channel_reversion::{
    risk_reward, stop_and_target, ChannelReversionConfig, ChannelReversionStrategy,
    VOLUME_LOOKBACK,
};
