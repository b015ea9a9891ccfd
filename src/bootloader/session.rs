//! Session state and the two tick-driven timeouts

use crate::config::Timing;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub active: bool,
    pub boot_timeout_ticks: u16,
    pub com_timeout_ticks: u16,
}

/// Which timeouts ran out on a tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Expired {
    pub boot: bool,
    pub com: bool,
}

impl Session {
    pub const fn new() -> Self {
        Self {
            active: false,
            boot_timeout_ticks: 0,
            com_timeout_ticks: 0,
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.boot_timeout_ticks = 0;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.boot_timeout_ticks = 0;
    }

    /// A byte belonging to a packet arrived
    #[inline]
    pub fn byte_received(&mut self) {
        self.com_timeout_ticks = 0;
    }

    pub fn tick(&mut self, timing: &Timing) -> Expired {
        let mut expired = Expired::default();

        if self.active {
            self.boot_timeout_ticks = 0;
        } else {
            self.boot_timeout_ticks = self.boot_timeout_ticks.saturating_add(1);
            expired.boot = self.boot_timeout_ticks >= timing.boot_timeout_ticks;
        }

        self.com_timeout_ticks = self.com_timeout_ticks.saturating_add(1);
        if self.com_timeout_ticks >= timing.com_timeout_ticks {
            self.com_timeout_ticks = 0;
            expired.com = true;
        }

        expired
    }
}
