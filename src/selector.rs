// ABOUTME: Deterministic choice of one lamp among discovered candidates
// ABOUTME: Prefers an exact name match, then an exact model match, then the first record
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::LampConfig;
use crate::device::{call_with_timeout, DeviceRecord};

/// Ordered preference used to pick a single device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Exact display name to look for first
    pub preferred_name: Option<String>,
    /// Exact model identifier to look for when no name matches
    pub preferred_model: Option<String>,
}

/// Which rule of the policy picked the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    /// Display name matched the preferred name
    Name,
    /// Model matched the preferred model
    Model,
    /// Nothing matched; first discovered record
    First,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Model => write!(f, "model"),
            Self::First => write!(f, "first"),
        }
    }
}

impl SelectionPolicy {
    /// Build the policy from configured preferences
    pub fn from_config(config: &LampConfig) -> Self {
        Self {
            preferred_name: config.preferred_name.clone(),
            preferred_model: config.preferred_model.clone(),
        }
    }

    /// Index of the preferred record and the rule that chose it
    ///
    /// Each rule scans every candidate before the next rule is tried; the
    /// first match in iteration order wins. Records that were never refreshed
    /// have no name or model and can only be chosen by the fallback.
    pub fn choose(&self, records: &[DeviceRecord]) -> Option<(usize, MatchReason)> {
        if records.is_empty() {
            return None;
        }

        if let Some(name) = self.preferred_name.as_deref() {
            if let Some(index) = records.iter().position(|r| r.alias() == Some(name)) {
                return Some((index, MatchReason::Name));
            }
        }

        if let Some(model) = self.preferred_model.as_deref() {
            if let Some(index) = records.iter().position(|r| r.model() == Some(model)) {
                return Some((index, MatchReason::Model));
            }
        }

        Some((0, MatchReason::First))
    }
}

/// Refreshes candidates and applies a [`SelectionPolicy`]
pub struct DeviceSelector {
    policy: SelectionPolicy,
    command_timeout: Duration,
}

impl DeviceSelector {
    /// Create a selector; `command_timeout` bounds each candidate refresh
    pub const fn new(policy: SelectionPolicy, command_timeout: Duration) -> Self {
        Self {
            policy,
            command_timeout,
        }
    }

    /// Pick exactly one record, or `None` when `records` is empty
    ///
    /// Every candidate is refreshed first. A candidate whose refresh fails is
    /// kept unrefreshed: it cannot match by name or model but still counts
    /// for the first-record fallback. Iteration order is the discovery
    /// transport's response order, so the fallback is only as stable as that.
    pub async fn select(&self, mut records: Vec<DeviceRecord>) -> Option<DeviceRecord> {
        if records.is_empty() {
            return None;
        }

        debug!(candidates = records.len(), "Refreshing lamp candidates");

        for record in &mut records {
            let refreshed = call_with_timeout(
                self.command_timeout,
                &record.address,
                "refresh",
                record.handle.refresh(),
            )
            .await;

            match refreshed {
                Ok(state) => record.state = Some(state),
                Err(e) => {
                    debug!(
                        address = %record.address,
                        error = %e,
                        "Skipping candidate that failed to refresh"
                    );
                }
            }
        }

        let (index, reason) = self.policy.choose(&records)?;
        let chosen = records.swap_remove(index);

        info!(
            address = %chosen.address,
            alias = chosen.alias().unwrap_or("unknown"),
            model = chosen.model().unwrap_or("unknown"),
            reason = %reason,
            "Selected lamp"
        );

        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;
    use crate::device::{DeviceState, LampDevice};
    use crate::testing::FakeDevice;

    fn policy(name: &str, model: &str) -> SelectionPolicy {
        SelectionPolicy {
            preferred_name: Some(name.to_owned()),
            preferred_model: Some(model.to_owned()),
        }
    }

    fn record(address: &str, alias: &str, model: &str) -> DeviceRecord {
        let mut record = DeviceRecord::new(address, FakeDevice::dimmable(address, alias, model));
        record.state = Some(DeviceState::new(alias, model));
        record
    }

    fn selector() -> DeviceSelector {
        DeviceSelector::new(policy("MCP Lamp", "KL110"), Duration::from_secs(6))
    }

    #[test]
    fn name_match_wins_regardless_of_position() {
        let records = vec![
            record("a", "Desk Lamp", "KL110"),
            record("b", "Porch", "HS100"),
            record("c", "MCP Lamp", "HS100"),
        ];
        assert_eq!(
            policy("MCP Lamp", "KL110").choose(&records),
            Some((2, MatchReason::Name))
        );
    }

    #[test]
    fn model_match_used_when_no_name_matches() {
        let records = vec![
            record("a", "Desk Lamp", "HS100"),
            record("b", "Porch", "KL110"),
            record("c", "Hall", "KL110"),
        ];
        assert_eq!(
            policy("MCP Lamp", "KL110").choose(&records),
            Some((1, MatchReason::Model))
        );
    }

    #[test]
    fn falls_back_to_first_record() {
        let records = vec![record("a", "Desk Lamp", "HS100"), record("b", "Porch", "KL130")];
        assert_eq!(
            policy("MCP Lamp", "KL110").choose(&records),
            Some((0, MatchReason::First))
        );
    }

    #[test]
    fn no_preferences_pick_first() {
        let records = vec![record("a", "MCP Lamp", "KL110")];
        assert_eq!(
            SelectionPolicy::default().choose(&records),
            Some((0, MatchReason::First))
        );
    }

    #[test]
    fn empty_set_chooses_nothing() {
        assert_eq!(policy("MCP Lamp", "KL110").choose(&[]), None);
    }

    #[tokio::test]
    async fn select_empty_returns_none() {
        assert!(selector().select(Vec::new()).await.is_none());
    }

    #[tokio::test]
    async fn select_refreshes_and_picks_by_name() {
        let desk = FakeDevice::dimmable("10.0.0.1", "Desk Lamp", "KL110");
        let mcp = FakeDevice::dimmable("10.0.0.2", "MCP Lamp", "KL130");
        let records = vec![
            DeviceRecord::new("10.0.0.1", Arc::clone(&desk) as Arc<dyn LampDevice>),
            DeviceRecord::new("10.0.0.2", Arc::clone(&mcp) as Arc<dyn LampDevice>),
        ];

        let chosen = selector().select(records).await.expect("a lamp");
        assert_eq!(chosen.address, "10.0.0.2");
        assert_eq!(chosen.alias(), Some("MCP Lamp"));
        assert_eq!(desk.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_candidate_stays_eligible_for_fallback() {
        let broken = FakeDevice::dimmable("10.0.0.1", "MCP Lamp", "KL110");
        broken.set_fail_refresh(true);
        let other = FakeDevice::dimmable("10.0.0.2", "Porch", "HS100");
        let records = vec![
            DeviceRecord::new("10.0.0.1", broken),
            DeviceRecord::new("10.0.0.2", other),
        ];

        let chosen = selector().select(records).await.expect("a lamp");
        assert_eq!(chosen.address, "10.0.0.1");
        assert!(chosen.state.is_none());
    }

    #[tokio::test]
    async fn failed_refresh_candidate_cannot_match_by_name() {
        let broken = FakeDevice::dimmable("10.0.0.1", "Porch", "HS100");
        broken.set_fail_refresh(true);
        let records = vec![
            DeviceRecord::new("10.0.0.1", broken),
            DeviceRecord::new("10.0.0.2", FakeDevice::dimmable("10.0.0.2", "Hall", "KL110")),
        ];

        let chosen = selector().select(records).await.expect("a lamp");
        assert_eq!(chosen.address, "10.0.0.2");
    }
}
