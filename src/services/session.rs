/*
 * Responsibility
 * - session id (cookie) → 保存済み Receipt の対応 (メモリのみ、永続化しない)
 * - 認証に使った ticket → session の逆引き (single sign-out で破棄するため)
 * - 一定時間アクセスのない session は破棄 (参照時 + create 時の sweep)
 */
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::services::cas::Receipt;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

// upper bound between two full sweeps
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Session {
    receipt: Option<Arc<Receipt>>,
    ticket: Option<String>,
    last_seen: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            receipt: None,
            ticket: None,
            last_seen: now,
        }
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    by_ticket: DashMap<String, Uuid>,
    idle_timeout: Duration,
    last_sweep: Mutex<Instant>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            by_ticket: DashMap::new(),
            idle_timeout,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn create(&self) -> Uuid {
        let now = Instant::now();
        self.sweep_if_due(now);

        let id = Uuid::new_v4();
        self.sessions.insert(id, Session::new(now));
        id
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.touch_at(id, Instant::now()).is_some()
    }

    pub fn receipt(&self, id: &Uuid) -> Option<Arc<Receipt>> {
        self.touch_at(id, Instant::now()).flatten()
    }

    /// Remember `receipt` for the session, indexed by the ticket that produced it.
    pub fn store_receipt(&self, id: Uuid, ticket: &str, receipt: Arc<Receipt>) {
        let now = Instant::now();
        let previous = {
            let mut session = self.sessions.entry(id).or_insert_with(|| Session::new(now));
            session.receipt = Some(receipt);
            session.last_seen = now;
            session.ticket.replace(ticket.to_string())
        };
        if let Some(old) = previous {
            self.by_ticket.remove(&old);
        }
        self.by_ticket.insert(ticket.to_string(), id);
    }

    pub fn clear_receipt(&self, id: &Uuid) {
        let ticket = self.sessions.get_mut(id).and_then(|mut s| {
            s.receipt = None;
            s.ticket.take()
        });
        if let Some(ticket) = ticket {
            self.by_ticket.remove(&ticket);
        }
    }

    /// Drop the session established with `ticket`. Returns whether one existed.
    pub fn invalidate_by_ticket(&self, ticket: &str) -> bool {
        let Some((_, id)) = self.by_ticket.remove(ticket) else {
            return false;
        };
        self.sessions.remove(&id).is_some()
    }

    /// Remove every session idle for longer than the timeout.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_idle(&self, session: &Session, now: Instant) -> bool {
        now.saturating_duration_since(session.last_seen) >= self.idle_timeout
    }

    /// `None` if the session is unknown or expired (an expired one is removed),
    /// otherwise its receipt, after refreshing the idle clock.
    fn touch_at(&self, id: &Uuid, now: Instant) -> Option<Option<Arc<Receipt>>> {
        {
            let mut session = self.sessions.get_mut(id)?;
            if !self.is_idle(&session, now) {
                session.last_seen = now;
                return Some(session.receipt.clone());
            }
        }
        // guard released above; removing while holding it would deadlock the shard
        if let Some((_, expired)) = self.sessions.remove_if(id, |_, s| self.is_idle(s, now)) {
            self.forget_ticket(expired.ticket, id);
        }
        None
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut expired = Vec::new();
        self.sessions.retain(|id, session| {
            if self.is_idle(session, now) {
                expired.push((*id, session.ticket.take()));
                false
            } else {
                true
            }
        });
        for (id, ticket) in &expired {
            self.forget_ticket(ticket.clone(), id);
        }
        expired.len()
    }

    fn sweep_if_due(&self, now: Instant) {
        let due = match self.last_sweep.try_lock() {
            Ok(mut last)
                if now.saturating_duration_since(*last) >= self.idle_timeout.min(SWEEP_INTERVAL) =>
            {
                *last = now;
                true
            }
            _ => false,
        };
        if due {
            let purged = self.purge_expired_at(now);
            if purged > 0 {
                tracing::debug!(purged, remaining = self.len(), "expired idle sessions");
            }
        }
    }

    fn forget_ticket(&self, ticket: Option<String>, id: &Uuid) {
        if let Some(ticket) = ticket {
            self.by_ticket.remove_if(&ticket, |_, owner| owner == id);
        }
    }
}
