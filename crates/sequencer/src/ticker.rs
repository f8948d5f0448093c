use std::{ops::ControlFlow, time::Duration};

use crate::scheduler::Scheduler;

/// Revenue already lost when the dashboard opens, three minutes in.
pub const REVENUE_START: u64 = 36_000;
/// $12k per minute.
pub const REVENUE_PER_SECOND: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueTicker {
    pub amount: u64,
    pub rate_per_second: u64,
}

impl Default for RevenueTicker {
    fn default() -> Self {
        Self {
            amount: REVENUE_START,
            rate_per_second: REVENUE_PER_SECOND,
        }
    }
}

impl RevenueTicker {
    pub fn advance(&mut self) -> u64 {
        self.amount = self.amount.saturating_add(self.rate_per_second);
        self.amount
    }
}

/// Advances a [`RevenueTicker`] every second while alive.
pub struct TickerDriver {
    scheduler: Scheduler<RevenueTicker>,
}

impl TickerDriver {
    pub fn start(ticker: RevenueTicker) -> Self {
        let scheduler = Scheduler::new(ticker);
        scheduler.schedule_every(Duration::from_secs(1), |ticker| {
            ticker.advance();
            ControlFlow::Continue(())
        });
        Self { scheduler }
    }

    pub fn amount(&self) -> u64 {
        self.scheduler.with(|ticker| ticker.amount)
    }

    pub fn stop(&self) {
        self.scheduler.invalidate();
    }
}

/// `$36.2k` from 1000 up, plain dollars below.
pub fn format_revenue(amount: u64) -> String {
    if amount >= 1000 {
        format!("${:.1}k", amount as f64 / 1000.0)
    } else {
        format!("${amount}")
    }
}

/// `m:ss`, as shown next to the timeline.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
