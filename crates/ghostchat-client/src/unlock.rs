//! Session-scoped admin unlock gate.
//!
//! The gate is a convenience lock in front of the admin view: the password
//! check happens locally and the flag lives in session storage, so it holds
//! no authority. The backend role check is what actually protects admin
//! operations.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ghostchat_shared::constants::{ADMIN_UNLOCK_KEY, ADMIN_UNLOCK_SECRET};
use ghostchat_store::KeyValueStore;

use crate::error::{ClientError, Result};

const UNLOCKED_VALUE: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockState {
    Locked,
    Unlocked,
}

impl UnlockState {
    fn from_value(value: Option<&str>) -> Self {
        if value == Some(UNLOCKED_VALUE) {
            Self::Unlocked
        } else {
            Self::Locked
        }
    }
}

#[derive(Clone)]
pub struct AdminUnlock {
    session: Arc<dyn KeyValueStore>,
}

impl AdminUnlock {
    pub fn new(session: Arc<dyn KeyValueStore>) -> Self {
        Self { session }
    }

    /// Reads storage every time so external changes are seen.
    pub fn state(&self) -> UnlockState {
        match self.session.get(ADMIN_UNLOCK_KEY) {
            Ok(value) => UnlockState::from_value(value.as_deref()),
            Err(e) => {
                warn!(error = %e, "Failed to read unlock flag");
                UnlockState::Locked
            }
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == UnlockState::Unlocked
    }

    pub fn unlock(&self, password: &str) -> Result<()> {
        if password != ADMIN_UNLOCK_SECRET {
            debug!("Admin unlock rejected");
            return Err(ClientError::WrongPassword);
        }
        self.session.set(ADMIN_UNLOCK_KEY, UNLOCKED_VALUE)?;
        info!("Admin panel unlocked for this session");
        Ok(())
    }

    pub fn lock(&self) -> Result<()> {
        self.session.remove(ADMIN_UNLOCK_KEY)?;
        info!("Admin panel locked");
        Ok(())
    }

    /// Follow the flag through storage change events.
    pub fn watch(&self) -> UnlockWatch {
        let (tx, rx) = watch::channel(self.state());
        let mut events = self.session.subscribe();
        let gate = self.clone();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == ADMIN_UNLOCK_KEY => {
                        tx.send_replace(UnlockState::from_value(event.new_value.as_deref()));
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        tx.send_replace(gate.state());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        UnlockWatch { rx, task }
    }
}

pub struct UnlockWatch {
    rx: watch::Receiver<UnlockState>,
    task: JoinHandle<()>,
}

impl UnlockWatch {
    pub fn current(&self) -> UnlockState {
        *self.rx.borrow()
    }

    pub async fn changed(&mut self) -> Option<UnlockState> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}

impl Drop for UnlockWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostchat_store::SessionStore;

    fn gate() -> (AdminUnlock, Arc<SessionStore>) {
        let session = Arc::new(SessionStore::new());
        (AdminUnlock::new(session.clone()), session)
    }

    #[test]
    fn starts_locked_and_rejects_wrong_password() {
        let (gate, session) = gate();
        assert_eq!(gate.state(), UnlockState::Locked);
        assert_eq!(gate.unlock("dexgod"), Err(ClientError::WrongPassword));
        assert!(!gate.is_unlocked());
        assert!(session.is_empty());
    }

    #[test]
    fn correct_password_unlocks_until_locked() {
        let (gate, session) = gate();
        gate.unlock("DexGod").unwrap();
        assert!(gate.is_unlocked());
        assert_eq!(session.get(ADMIN_UNLOCK_KEY).unwrap().as_deref(), Some("true"));

        gate.lock().unwrap();
        assert!(!gate.is_unlocked());
    }

    #[test]
    fn new_session_starts_locked() {
        let (gate, _) = gate();
        gate.unlock("DexGod").unwrap();
        let (fresh, _) = self::gate();
        assert!(!fresh.is_unlocked());
    }

    #[tokio::test]
    async fn external_clear_relocks_the_watch() {
        let (gate, session) = gate();
        gate.unlock("DexGod").unwrap();
        let mut watch = gate.watch();
        assert_eq!(watch.current(), UnlockState::Unlocked);

        session.clear().unwrap();
        assert_eq!(watch.changed().await, Some(UnlockState::Locked));
    }
}
