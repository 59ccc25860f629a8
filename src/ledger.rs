//! # Quota Ledger
//!
//! Per-day generation counters, one global and one per client.
//!
//! Both counters share a single UTC calendar-date key and reset together the
//! first time the ledger is touched after midnight UTC. The reset is lazy:
//! every quota-sensitive operation re-checks the stored date itself, so
//! correctness never depends on a background timer firing.
//!
//! Reservation and commit are split on purpose. `try_reserve` only answers
//! whether an attempt may proceed; `commit` charges the quota and must only
//! run after the guarded upstream call has succeeded. A generation that dies
//! mid-flight therefore costs the caller nothing.
use std::collections::HashMap;

use chrono::{NaiveDate, Utc};

pub const GLOBAL_LIMIT: u32 = 11;
pub const USER_LIMIT: u32 = 2;

pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Allowed,
    DeniedGlobal,
    DeniedUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub user: u32,
    pub global: u32,
}

struct ClientUsage {
    count: u32,
    date: NaiveDate,
}

pub struct Ledger {
    global_count: u32,
    reset_date: NaiveDate,
    per_client: HashMap<String, ClientUsage>,
}

impl Ledger {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            global_count: 0,
            reset_date: today,
            per_client: HashMap::new(),
        }
    }

    fn reset_if_new_day(&mut self, today: NaiveDate) {
        if self.reset_date != today {
            self.global_count = 0;
            self.per_client.clear();
            self.reset_date = today;
        }
    }

    // An entry carrying a stale date counts as absent.
    fn client_count(&self, client_id: &str, today: NaiveDate) -> u32 {
        match self.per_client.get(client_id) {
            Some(usage) if usage.date == today => usage.count,
            _ => 0,
        }
    }

    pub fn remaining(&mut self, client_id: &str, today: NaiveDate) -> Remaining {
        self.reset_if_new_day(today);

        Remaining {
            user: USER_LIMIT.saturating_sub(self.client_count(client_id, today)),
            global: GLOBAL_LIMIT.saturating_sub(self.global_count),
        }
    }

    /// Checks quota without charging it. The global ceiling is checked before
    /// the per-client one.
    pub fn try_reserve(&mut self, client_id: &str, today: NaiveDate) -> Reservation {
        self.reset_if_new_day(today);

        if self.global_count >= GLOBAL_LIMIT {
            return Reservation::DeniedGlobal;
        }

        if self.client_count(client_id, today) >= USER_LIMIT {
            return Reservation::DeniedUser;
        }

        Reservation::Allowed
    }

    /// Charges one generation to both counters. Only call this once the
    /// guarded upstream call has verifiably succeeded.
    pub fn commit(&mut self, client_id: &str, today: NaiveDate) {
        self.reset_if_new_day(today);

        self.global_count += 1;

        let usage = self
            .per_client
            .entry(client_id.to_string())
            .or_insert(ClientUsage {
                count: 0,
                date: today,
            });

        if usage.date != today {
            usage.count = 0;
            usage.date = today;
        }

        usage.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, n).unwrap()
    }

    #[test]
    fn commit_counts_per_day() {
        let mut ledger = Ledger::new(day(1));

        ledger.commit("a", day(1));
        ledger.commit("b", day(1));

        let remaining = ledger.remaining("a", day(1));
        assert_eq!(remaining.global, GLOBAL_LIMIT - 2);
        assert_eq!(remaining.user, USER_LIMIT - 1);
    }

    #[test]
    fn user_limit_denies_before_global() {
        let mut ledger = Ledger::new(day(1));

        assert_eq!(ledger.try_reserve("a", day(1)), Reservation::Allowed);
        ledger.commit("a", day(1));
        assert_eq!(ledger.try_reserve("a", day(1)), Reservation::Allowed);
        ledger.commit("a", day(1));

        // Third attempt for the same client is denied even though the global
        // counter sits at 2 of 11.
        assert_eq!(ledger.try_reserve("a", day(1)), Reservation::DeniedUser);
        assert_eq!(ledger.try_reserve("b", day(1)), Reservation::Allowed);
    }

    #[test]
    fn global_limit_denies_fresh_clients() {
        let mut ledger = Ledger::new(day(1));

        for i in 0..GLOBAL_LIMIT {
            let client = format!("client-{i}");
            assert_eq!(ledger.try_reserve(&client, day(1)), Reservation::Allowed);
            ledger.commit(&client, day(1));
        }

        assert_eq!(
            ledger.try_reserve("client-fresh", day(1)),
            Reservation::DeniedGlobal
        );
    }

    #[test]
    fn reservation_without_commit_costs_nothing() {
        let mut ledger = Ledger::new(day(1));

        assert_eq!(ledger.try_reserve("a", day(1)), Reservation::Allowed);
        assert_eq!(ledger.try_reserve("a", day(1)), Reservation::Allowed);

        let remaining = ledger.remaining("a", day(1));
        assert_eq!(remaining.user, USER_LIMIT);
        assert_eq!(remaining.global, GLOBAL_LIMIT);
    }

    #[test]
    fn new_day_resets_everything() {
        let mut ledger = Ledger::new(day(1));

        ledger.commit("a", day(1));
        ledger.commit("a", day(1));
        assert_eq!(ledger.try_reserve("a", day(1)), Reservation::DeniedUser);

        // First touch after the date advances sees a zeroed ledger.
        let remaining = ledger.remaining("a", day(2));
        assert_eq!(remaining.user, USER_LIMIT);
        assert_eq!(remaining.global, GLOBAL_LIMIT);
        assert_eq!(ledger.try_reserve("a", day(2)), Reservation::Allowed);
    }

    #[test]
    fn commits_across_days_do_not_accumulate() {
        let mut ledger = Ledger::new(day(1));

        ledger.commit("a", day(1));
        ledger.commit("a", day(2));

        let remaining = ledger.remaining("a", day(2));
        assert_eq!(remaining.user, USER_LIMIT - 1);
        assert_eq!(remaining.global, GLOBAL_LIMIT - 1);
    }
}
