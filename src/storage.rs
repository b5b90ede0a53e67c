use crate::errors::StoreError;
use crate::models::{AppData, User, UserId, UserRecord};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::{fs, sync::Mutex};
use tracing::{debug, info};

/// Durable per-user document storage.
///
/// Saves are compare-and-swap on [`UserRecord::revision`], so the ledger
/// manager never assumes it is the only writer.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Writes `user` if the stored revision still equals `expected_revision`.
    ///
    /// Returns `Ok(Some(new_revision))` on success and `Ok(None)` when the
    /// record was changed (or removed) by someone else in the meantime.
    async fn save_user(&self, user: &User, expected_revision: u64) -> Result<Option<u64>, StoreError>;

    /// Inserts a new user and binds `token` to it. Returns `false` if the email is taken.
    async fn insert_user(&self, user: &User, token: &str) -> Result<bool, StoreError>;

    async fn resolve_token(&self, token: &str) -> Result<Option<UserId>, StoreError>;

    /// Rebinds the user behind `old` to `new`. Returns `false` if `old` is unknown.
    async fn rotate_token(&self, old: &str, new: &str) -> Result<bool, StoreError>;
}

/// Whole-document JSON store: every write rewrites the file.
///
/// Writes run on a spawned task that owns the document lock for the whole
/// persist-then-swap, so a caller that stops waiting (timeout, dropped
/// request) cannot leave disk and memory disagreeing.
pub struct JsonFileStore {
    path: Option<Arc<PathBuf>>,
    data: Arc<Mutex<AppData>>,
    write_delay: Duration,
}

/// Result of planning a write: the caller's answer plus the next document, if it changed.
type Planned<T> = (T, Option<AppData>);

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let data = load_data(&path).await?;
        info!(path = %path.display(), users = data.users.len(), "opened calorie store");
        Ok(Self {
            path: Some(Arc::new(path)),
            data: Arc::new(Mutex::new(data)),
            write_delay: Duration::ZERO,
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Arc::new(Mutex::new(AppData::default())),
            write_delay: Duration::ZERO,
        }
    }

    /// Pauses every write between planning and persisting. Simulates a slow disk.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    async fn write<T, F>(&self, plan: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&AppData) -> Result<Planned<T>, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        let data = Arc::clone(&self.data);
        let delay = self.write_delay;

        let task = tokio::spawn(async move {
            let mut data = data.lock().await;
            let (output, next) = plan(&*data)?;
            let Some(next) = next else {
                return Ok(output);
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some(path) = &path {
                persist_data(path, &next).await?;
            }
            *data = next;
            Ok::<T, StoreError>(output)
        });

        task.await
            .map_err(|err| StoreError::Inconsistent(format!("store write task failed: {err}")))?
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.users.values().find(|record| record.user.email == email).cloned())
    }

    async fn save_user(&self, user: &User, expected_revision: u64) -> Result<Option<u64>, StoreError> {
        let user = user.clone();
        self.write(move |data| {
            let Some(stored) = data.users.get(&user.id) else {
                return Ok((None, None));
            };
            if stored.revision != expected_revision {
                debug!(user_id = %user.id, expected_revision, stored = stored.revision, "revision mismatch");
                return Ok((None, None));
            }

            let revision = expected_revision + 1;
            let mut next = data.clone();
            next.users.insert(user.id, UserRecord { user, revision });
            Ok((Some(revision), Some(next)))
        })
        .await
    }

    async fn insert_user(&self, user: &User, token: &str) -> Result<bool, StoreError> {
        let user = user.clone();
        let token = token.to_string();
        self.write(move |data| {
            if data.users.values().any(|record| record.user.email == user.email) {
                return Ok((false, None));
            }
            if data.users.contains_key(&user.id) || data.tokens.contains_key(&token) {
                return Err(StoreError::Inconsistent(format!(
                    "identifier collision while inserting user {}",
                    user.id
                )));
            }

            let mut next = data.clone();
            next.tokens.insert(token, user.id);
            next.users.insert(user.id, UserRecord { user, revision: 0 });
            Ok((true, Some(next)))
        })
        .await
    }

    async fn resolve_token(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.tokens.get(token).copied())
    }

    async fn rotate_token(&self, old: &str, new: &str) -> Result<bool, StoreError> {
        let old = old.to_string();
        let new = new.to_string();
        self.write(move |data| {
            let Some(&user_id) = data.tokens.get(&old) else {
                return Ok((false, None));
            };
            if data.tokens.contains_key(&new) {
                return Err(StoreError::Inconsistent("token collision while rotating".into()));
            }

            let mut next = data.clone();
            next.tokens.remove(&old);
            next.tokens.insert(new, user_id);
            Ok((true, Some(next)))
        })
        .await
    }
}

/// Runs a store call, failing with [`StoreError::Timeout`] once `limit` elapses.
pub async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

pub async fn load_data(path: &Path) -> Result<AppData, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(AppData::default()),
        Err(err) => Err(err.into()),
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ledger;
    use chrono::{NaiveDate, Utc};

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            name: "Test".into(),
            email: email.into(),
            calorie_goal: 2000,
            daily_calories: Ledger::new(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()),
            created_at: Utc::now(),
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("calorie_store_{tag}_{}_{nanos}.json", std::process::id()))
    }

    #[tokio::test]
    async fn save_is_compare_and_swap() {
        let store = JsonFileStore::in_memory();
        let mut alice = user("alice@example.com");
        assert!(store.insert_user(&alice, "t1").await.unwrap());

        alice.calorie_goal = 1800;
        assert_eq!(store.save_user(&alice, 0).await.unwrap(), Some(1));
        alice.calorie_goal = 1700;
        assert_eq!(store.save_user(&alice, 0).await.unwrap(), None);

        let stored = store.load_user(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.user.calorie_goal, 1800);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = JsonFileStore::in_memory();
        assert!(store.insert_user(&user("bob@example.com"), "a").await.unwrap());
        assert!(!store.insert_user(&user("bob@example.com"), "b").await.unwrap());
        assert_eq!(store.resolve_token("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_round_trips_through_disk() {
        let path = temp_path("reopen");
        let carol = user("carol@example.com");
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            assert!(store.insert_user(&carol, "carol-token").await.unwrap());
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.resolve_token("carol-token").await.unwrap(), Some(carol.id));
        let record = reopened.load_user(carol.id).await.unwrap().unwrap();
        assert_eq!(record.user, carol);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn persisted_ledger_uses_calendar_strings() {
        let path = temp_path("format");
        let store = JsonFileStore::open(&path).await.unwrap();
        let dave = user("dave@example.com");
        store.insert_user(&dave, "dave-token").await.unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let ledger = &raw["users"][dave.id.to_string()]["daily_calories"];
        assert_eq!(ledger["current"]["date"], "2026-02-01");
        assert_eq!(ledger["current"]["consumed"], 0.0);
        assert!(ledger["history"].as_array().unwrap().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn bounded_call_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(())
        };
        assert!(matches!(
            bounded(Duration::from_millis(10), slow).await,
            Err(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn rotate_token_rebinds_user() {
        let store = JsonFileStore::in_memory();
        let erin = user("erin@example.com");
        store.insert_user(&erin, "old").await.unwrap();

        assert!(store.rotate_token("old", "new").await.unwrap());
        assert_eq!(store.resolve_token("old").await.unwrap(), None);
        assert_eq!(store.resolve_token("new").await.unwrap(), Some(erin.id));
        assert!(!store.rotate_token("old", "newer").await.unwrap());
    }

    #[tokio::test]
    async fn find_by_email_matches_stored_address() {
        let store = JsonFileStore::in_memory();
        let fay = user("fay@example.com");
        store.insert_user(&fay, "fay").await.unwrap();

        let found = store.find_user_by_email("fay@example.com").await.unwrap().unwrap();
        assert_eq!(found.user.id, fay.id);
        assert!(store.find_user_by_email("gus@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn abandoned_write_still_lands_on_disk_and_in_memory() {
        let path = temp_path("abandoned");
        let store = JsonFileStore::open(&path)
            .await
            .unwrap()
            .with_write_delay(Duration::from_millis(150));
        let mut hal = user("hal@example.com");
        store.insert_user(&hal, "hal").await.unwrap();

        hal.calorie_goal = 1600;
        assert!(matches!(
            bounded(Duration::from_millis(20), store.save_user(&hal, 0)).await,
            Err(StoreError::Timeout(_))
        ));

        // The write finishes without its caller; a later read waits for it.
        let in_memory = store.load_user(hal.id).await.unwrap().unwrap();
        assert_eq!(in_memory.revision, 1);
        assert_eq!(in_memory.user.calorie_goal, 1600);

        let on_disk = load_data(&path).await.unwrap();
        assert_eq!(on_disk.users[&hal.id], in_memory);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Serialization(_))
        ));
        let _ = std::fs::remove_file(&path);
    }
}
