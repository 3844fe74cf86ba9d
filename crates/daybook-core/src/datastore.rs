use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::entries::{Client, TimeEntry};

/// Read access to clients and logged days.
///
/// Reports and commands take this as a parameter; nothing holds a global handle.
pub trait TimeSheet {
    fn clients(&self) -> anyhow::Result<Vec<Client>>;

    /// Entries dated within `start..=end`.
    fn entries_between(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<TimeEntry>>;
}

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub clients_path: PathBuf,
    pub entries_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let clients_path = data_dir.join("clients.data");
        let entries_path = data_dir.join("entries.data");

        for path in [&clients_path, &entries_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            clients = %clients_path.display(),
            entries = %entries_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            clients_path,
            entries_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_clients(&self) -> anyhow::Result<Vec<Client>> {
        load_jsonl(&self.clients_path).context("failed to load clients.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_entries(&self) -> anyhow::Result<Vec<TimeEntry>> {
        load_jsonl(&self.entries_path).context("failed to load entries.data")
    }

    pub fn find_client(&self, name: &str) -> anyhow::Result<Option<Client>> {
        let wanted = name.trim();
        Ok(self
            .load_clients()?
            .into_iter()
            .find(|client| client.name.eq_ignore_ascii_case(wanted)))
    }

    #[tracing::instrument(skip(self, client), fields(name = %client.name, id = %client.id))]
    pub fn add_client(&self, client: Client) -> anyhow::Result<()> {
        let mut clients = self.load_clients()?;
        if clients
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(client.name.trim()))
        {
            return Err(anyhow!("client already exists: {}", client.name));
        }
        clients.push(client);
        clients.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        save_jsonl_atomic(&self.clients_path, &clients).context("failed to save clients.data")
    }

    #[tracing::instrument(skip(self, entry), fields(id = %entry.id, date = %entry.date))]
    pub fn add_entry(&self, entry: TimeEntry) -> anyhow::Result<()> {
        let clients = self.load_clients()?;
        if !clients.iter().any(|client| client.id == entry.client_id) {
            return Err(anyhow!("unknown client id: {}", entry.client_id));
        }

        let mut entries = self.load_entries()?;
        entries.push(entry);
        entries.sort_by_key(|e| e.date);
        save_jsonl_atomic(&self.entries_path, &entries).context("failed to save entries.data")
    }
}

impl TimeSheet for DataStore {
    fn clients(&self) -> anyhow::Result<Vec<Client>> {
        self.load_clients()
    }

    fn entries_between(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<TimeEntry>> {
        let entries: Vec<TimeEntry> = self
            .load_entries()?
            .into_iter()
            .filter(|entry| entry.date >= start && entry.date <= end)
            .collect();
        debug!(%start, %end, count = entries.len(), "selected entries in range");
        Ok(entries)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::tempdir;
    use uuid::Uuid;

    use super::{DataStore, TimeSheet};
    use crate::entries::{Client, EntryDuration, TimeEntry};

    #[test]
    fn rejects_duplicate_clients_and_unknown_ids() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open");

        store.add_client(Client::new("Acme", 500.0)).expect("add");
        assert!(store.add_client(Client::new("ACME", 400.0)).is_err());
        assert!(store.find_client("acme").expect("find").is_some());

        let date = NaiveDate::from_ymd_opt(2024, 3, 15).expect("date");
        let orphan = TimeEntry::new(Uuid::new_v4(), date, EntryDuration::FullDay);
        assert!(store.add_entry(orphan).is_err());
    }

    #[test]
    fn range_query_is_inclusive() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open");
        let client = Client::new("Acme", 500.0);
        let client_id = client.id;
        store.add_client(client).expect("add client");

        for day in [1, 15, 31] {
            let date = NaiveDate::from_ymd_opt(2024, 3, day).expect("date");
            store
                .add_entry(TimeEntry::new(client_id, date, EntryDuration::FullDay))
                .expect("add entry");
        }

        let start = NaiveDate::from_ymd_opt(2024, 3, 1).expect("start");
        let end = NaiveDate::from_ymd_opt(2024, 3, 15).expect("end");
        assert_eq!(store.entries_between(start, end).expect("query").len(), 2);
    }

    #[test]
    fn reports_the_broken_line() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open");
        fs::write(&store.clients_path, "{not json}\n").expect("write");

        let err = store.load_clients().expect_err("should fail");
        assert!(format!("{err:#}").contains("line 1"));
    }
}
