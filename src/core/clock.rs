use std::thread;
use std::time::Duration;

/// 帧节奏控制：每呈现一帧后调用一次
pub trait Pacer {
    fn pace(&mut self);
}

/// 固定间隔节奏（不参考时间戳，每帧固定休眠）
#[derive(Debug, Clone, Copy)]
pub struct FixedRatePacer {
    interval: Duration,
}

impl FixedRatePacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Pacer for FixedRatePacer {
    fn pace(&mut self) {
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
    }
}
