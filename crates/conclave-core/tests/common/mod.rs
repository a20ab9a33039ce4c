#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use uuid::Uuid;

use conclave_core::groups::{NewChannel, NewGroup};
use conclave_core::notify::{InvitationNotice, InvitationNotifier, TokenAction, TokenIssuer};
use conclave_core::{ChatService, ChatStore, GroupFilter, StoreError};
use conclave_db::Database;
use conclave_types::models::{
    AccessTier, Channel, ChatGroup, Membership, MembershipState, User,
};

pub const PUBLIC_URL: &str = "https://chat.example.com";

pub fn service() -> ChatService<Database> {
    ChatService::new(Database::open_in_memory().unwrap(), PUBLIC_URL)
}

/// Registers `<name>@example.com` and returns its id.
pub fn register(db: &Database, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(&id.to_string(), name, &format!("{name}@example.com"), "hash")
        .unwrap();
    id
}

pub fn db_user(svc: &ChatService<Database>, name: &str) -> Uuid {
    register(svc.store(), name)
}

pub fn new_group(name: &str, title: &str, is_private: bool) -> NewGroup {
    NewGroup {
        name: name.into(),
        title: title.into(),
        summary: None,
        is_private,
    }
}

pub fn new_channel(name: &str) -> NewChannel {
    NewChannel {
        name: name.into(),
        title: format!("#{name}"),
        summary: Some(format!("all about {name}")),
    }
}

// -- Collaborator doubles --

/// Hands out `token-<n>` and remembers what it was asked to sign.
#[derive(Default)]
pub struct RecordingIssuer {
    pub issued: Mutex<Vec<(Uuid, TokenAction, HashMap<String, String>)>>,
}

impl TokenIssuer for RecordingIssuer {
    fn issue(&self, actor: Uuid, action: TokenAction, claims: HashMap<String, String>) -> anyhow::Result<String> {
        let mut issued = self.issued.lock().unwrap();
        issued.push((actor, action, claims));
        Ok(format!("token-{}", issued.len()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<InvitationNotice>>,
}

impl InvitationNotifier for RecordingNotifier {
    fn send_invitation(&self, notice: &InvitationNotice) -> impl Future<Output = anyhow::Result<()>> + Send {
        self.sent.lock().unwrap().push(notice.clone());
        async { Ok(()) }
    }
}

pub struct FailingNotifier;

impl InvitationNotifier for FailingNotifier {
    fn send_invitation(&self, _notice: &InvitationNotice) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Err(anyhow!("mail relay unreachable")) }
    }
}

// -- Fault-injecting store --

/// Delegates to a real database but fails selected lookups, or hides rows
/// from the existence checks so inserts meet the unique indexes directly.
pub struct FlakyStore {
    pub db: Database,
    pub broken_channel_lists: Mutex<HashSet<Uuid>>,
    pub broken_channels: Mutex<HashSet<Uuid>>,
    pub blind_clash_checks: AtomicBool,
    pub hidden_membership_lookups: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            db: Database::open_in_memory().unwrap(),
            broken_channel_lists: Mutex::new(HashSet::new()),
            broken_channels: Mutex::new(HashSet::new()),
            blind_clash_checks: AtomicBool::new(false),
            hidden_membership_lookups: AtomicUsize::new(0),
        }
    }

    pub fn break_channel_list(&self, group_id: Uuid) {
        self.broken_channel_lists.lock().unwrap().insert(group_id);
    }

    pub fn break_channel(&self, channel_id: Uuid) {
        self.broken_channels.lock().unwrap().insert(channel_id);
    }

    /// Group and channel clash lookups report nothing from now on, as if a
    /// concurrent writer committed right after the check.
    pub fn blind_clash_checks(&self) {
        self.blind_clash_checks.store(true, Ordering::SeqCst);
    }

    /// The next `n` membership lookups miss.
    pub fn hide_memberships(&self, n: usize) {
        self.hidden_membership_lookups.store(n, Ordering::SeqCst);
    }
}

pub fn flaky_service() -> ChatService<FlakyStore> {
    ChatService::new(FlakyStore::new(), PUBLIC_URL)
}

pub fn flaky_user(svc: &ChatService<FlakyStore>, name: &str) -> Uuid {
    register(&svc.store().db, name)
}

impl ChatStore for FlakyStore {
    fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.db.find_user(id)
    }
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.db.find_user_by_email(email)
    }
    fn create_group(&self, group: &ChatGroup) -> Result<(), StoreError> {
        ChatStore::create_group(&self.db, group)
    }
    fn find_group(&self, id: Uuid) -> Result<Option<ChatGroup>, StoreError> {
        self.db.find_group(id)
    }
    fn find_group_clash(&self, owner_id: Uuid, resource: &str, title: &str) -> Result<Option<ChatGroup>, StoreError> {
        if self.blind_clash_checks.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.db.find_group_clash(owner_id, resource, title)
    }
    fn list_groups(&self, filter: &GroupFilter) -> Result<Vec<ChatGroup>, StoreError> {
        self.db.list_groups(filter)
    }
    fn search_public_groups(&self, query: &str) -> Result<Vec<ChatGroup>, StoreError> {
        self.db.search_public_groups(query)
    }
    fn remove_group(&self, id: Uuid) -> Result<Option<usize>, StoreError> {
        self.db.remove_group(id)
    }
    fn create_channel(&self, channel: &Channel) -> Result<(), StoreError> {
        ChatStore::create_channel(&self.db, channel)
    }
    fn find_channel(&self, id: Uuid) -> Result<Option<Channel>, StoreError> {
        if self.broken_channels.lock().unwrap().contains(&id) {
            return Err(StoreError::Backend(anyhow!("injected channel failure")));
        }
        self.db.find_channel(id)
    }
    fn find_channel_by_resource(&self, group_id: Uuid, resource: &str) -> Result<Option<Channel>, StoreError> {
        if self.blind_clash_checks.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.db.find_channel_by_resource(group_id, resource)
    }
    fn list_channels(&self, group_id: Uuid) -> Result<Vec<Channel>, StoreError> {
        if self.broken_channel_lists.lock().unwrap().contains(&group_id) {
            return Err(StoreError::Backend(anyhow!("injected listing failure")));
        }
        self.db.list_channels(group_id)
    }
    fn create_membership(&self, membership: &Membership) -> Result<(), StoreError> {
        self.db.create_membership(membership)
    }
    fn find_membership(&self, channel_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, StoreError> {
        let hidden = self
            .hidden_membership_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if hidden.is_ok() {
            return Ok(None);
        }
        self.db.find_membership(channel_id, user_id)
    }
    fn set_membership_state(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
        state: MembershipState,
    ) -> Result<bool, StoreError> {
        self.db.set_membership_state(channel_id, user_id, state)
    }
    fn set_membership_tier(&self, channel_id: Uuid, user_id: Uuid, tier: AccessTier) -> Result<bool, StoreError> {
        self.db.set_membership_tier(channel_id, user_id, tier)
    }
    fn remove_membership(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.db.remove_membership(channel_id, user_id)
    }
    fn list_memberships(&self, user_id: Uuid, state: Option<MembershipState>) -> Result<Vec<Membership>, StoreError> {
        self.db.list_memberships(user_id, state)
    }
}
