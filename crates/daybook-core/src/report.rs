use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::anyhow;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::datastore::TimeSheet;
use crate::entries::{Client, EntryDuration, TimeEntry};
use crate::month::MonthId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    pub client_id: Uuid,
    pub client_name: String,
    pub client_color: String,
    pub daily_rate: f64,
    pub full_days: u32,
    pub half_days: u32,
    pub total_days: f64,
    pub total_earnings: f64,
}

/// Days worked and money earned per client over one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: MonthId,
    pub total_days: f64,
    pub total_earnings: f64,
    /// Highest earnings first.
    pub clients: Vec<ClientSummary>,
}

impl MonthlySummary {
    #[tracing::instrument(skip(sheet))]
    pub fn build(month: MonthId, sheet: &dyn TimeSheet) -> anyhow::Result<Self> {
        let (start, end) = month
            .first_day()
            .zip(month.last_day())
            .ok_or_else(|| anyhow!("month {month} is outside the supported date range"))?;
        let clients = sheet.clients()?;
        let entries = sheet.entries_between(start, end)?;
        Ok(Self::summarize(month, &clients, &entries))
    }

    /// Entries outside `month` or naming an unknown client are ignored.
    pub fn summarize(month: MonthId, clients: &[Client], entries: &[TimeEntry]) -> Self {
        let by_id: HashMap<Uuid, &Client> = clients.iter().map(|c| (c.id, c)).collect();
        let mut rows: HashMap<Uuid, ClientSummary> = HashMap::new();

        for entry in entries.iter().filter(|entry| month.contains(entry.date)) {
            let Some(client) = by_id.get(&entry.client_id) else {
                debug!(entry = %entry.id, client = %entry.client_id, "entry for unknown client skipped");
                continue;
            };
            let row = rows.entry(client.id).or_insert_with(|| ClientSummary {
                client_id: client.id,
                client_name: client.name.clone(),
                client_color: client.color.clone(),
                daily_rate: client.daily_rate,
                full_days: 0,
                half_days: 0,
                total_days: 0.0,
                total_earnings: 0.0,
            });
            match entry.duration {
                EntryDuration::FullDay => row.full_days += 1,
                EntryDuration::HalfDay => row.half_days += 1,
            }
            row.total_days += entry.duration.days();
            row.total_earnings += client.daily_rate * entry.duration.days();
        }

        let mut clients: Vec<ClientSummary> = rows.into_values().collect();
        clients.sort_by(|a, b| {
            b.total_earnings
                .partial_cmp(&a.total_earnings)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.client_name.cmp(&b.client_name))
        });

        let total_days = clients.iter().map(|c| c.total_days).sum();
        let total_earnings = clients.iter().map(|c| c.total_earnings).sum();
        Self {
            month,
            total_days,
            total_earnings,
            clients,
        }
    }
}
