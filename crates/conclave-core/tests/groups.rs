mod common;

use uuid::Uuid;

use common::*;
use conclave_core::{ChatError, ChatStore, GroupFilter};

#[test]
fn create_group_prefixes_resource_and_keeps_privacy() {
    let svc = service();
    let owner = db_user(&svc, "owner");

    let group = svc.create_group(owner, new_group("teamA", "Team A", true)).unwrap();
    assert_eq!(group.resource, "chat:teamA");
    assert_eq!(group.title, "Team A");
    assert_eq!(group.owner_id, owner);
    assert!(group.is_private);

    let listed = svc.get_chat_groups(&GroupFilter::default()).unwrap();
    assert_eq!(listed, vec![group]);
}

#[test]
fn create_group_requires_known_owner() {
    let svc = service();
    let err = svc
        .create_group(Uuid::new_v4(), new_group("teamA", "Team A", false))
        .unwrap_err();
    assert!(matches!(err, ChatError::UserUndefined));
}

#[test]
fn title_collision_alone_blocks_creation() {
    let svc = service();
    let owner = db_user(&svc, "owner");
    svc.create_group(owner, new_group("teamA", "Team A", false)).unwrap();

    let err = svc
        .create_group(owner, new_group("teamB", "Team A", false))
        .unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupExists));

    let err = svc
        .create_group(owner, new_group("teamA", "Another title", false))
        .unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupExists));
}

#[test]
fn different_owners_may_share_names() {
    let svc = service();
    let a = db_user(&svc, "a");
    let b = db_user(&svc, "b");
    svc.create_group(a, new_group("teamA", "Team A", false)).unwrap();
    svc.create_group(b, new_group("teamA", "Team A", false)).unwrap();

    assert_eq!(svc.get_chat_groups(&GroupFilter::default()).unwrap().len(), 2);
}

#[test]
fn channels_are_unique_within_their_group() {
    let svc = service();
    let owner = db_user(&svc, "owner");
    let g1 = svc.create_group(owner, new_group("one", "One", false)).unwrap();
    let g2 = svc.create_group(owner, new_group("two", "Two", false)).unwrap();

    let general = svc.create_channel(g1.id, new_channel("general")).unwrap();
    assert_eq!(general.group_id, g1.id);
    assert_eq!(general.resource, "general");

    let err = svc.create_channel(g1.id, new_channel("general")).unwrap_err();
    assert!(matches!(err, ChatError::ChannelExists));

    svc.create_channel(g2.id, new_channel("general")).unwrap();
}

#[test]
fn channel_needs_a_top_level_parent() {
    let svc = service();
    let owner = db_user(&svc, "owner");
    let group = svc.create_group(owner, new_group("one", "One", false)).unwrap();
    let channel = svc.create_channel(group.id, new_channel("general")).unwrap();

    let err = svc.create_channel(Uuid::new_v4(), new_channel("x")).unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupNotFound));

    // A channel id is not a group id: no channel-of-channel nesting.
    let err = svc.create_channel(channel.id, new_channel("nested")).unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupNotFound));
}

#[test]
fn list_filters_by_owner_and_privacy() {
    let svc = service();
    let a = db_user(&svc, "a");
    let b = db_user(&svc, "b");
    svc.create_group(a, new_group("a1", "A1", false)).unwrap();
    svc.create_group(a, new_group("a2", "A2", true)).unwrap();
    svc.create_group(b, new_group("b1", "B1", false)).unwrap();

    let a_groups = svc
        .get_chat_groups(&GroupFilter {
            owner_id: Some(a),
            is_private: None,
        })
        .unwrap();
    assert_eq!(a_groups.len(), 2);

    let public = svc
        .get_chat_groups(&GroupFilter {
            owner_id: None,
            is_private: Some(false),
        })
        .unwrap();
    assert_eq!(public.len(), 2);

    let none = svc
        .get_chat_groups(&GroupFilter {
            owner_id: Some(b),
            is_private: Some(true),
        })
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn only_owner_can_delete_and_channels_go_with_the_group() {
    let svc = service();
    let owner = db_user(&svc, "owner");
    let other = db_user(&svc, "other");
    let group = svc.create_group(owner, new_group("teamA", "Team A", false)).unwrap();
    let channel = svc.create_channel(group.id, new_channel("general")).unwrap();
    svc.join_public_channel(other, channel.id).unwrap();

    let err = svc.delete_group(other, group.id).unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupNotFound));

    svc.delete_group(owner, group.id).unwrap();
    assert!(svc.get_chat_groups(&GroupFilter::default()).unwrap().is_empty());
    assert!(svc.get_my_channels(other).unwrap().is_empty());

    let err = svc.delete_group(owner, group.id).unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupNotFound));
}

#[test]
fn search_matches_public_titles_with_channels_only() {
    let svc = service();
    let owner = db_user(&svc, "owner");
    let lovers = svc.create_group(owner, new_group("rl", "Rust Lovers", false)).unwrap();
    let empty = svc.create_group(owner, new_group("rf", "Rust Fans", false)).unwrap();
    let secret = svc.create_group(owner, new_group("rs", "Rust Secret", true)).unwrap();
    svc.create_channel(lovers.id, new_channel("general")).unwrap();
    svc.create_channel(secret.id, new_channel("general")).unwrap();

    let found = svc.search_public_channels_by_group_title("rUsT").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].group.id, lovers.id);
    assert_eq!(found[0].channels.len(), 1);
    assert!(found.iter().all(|g| g.group.id != empty.id));
}

#[test]
fn search_skips_groups_whose_channels_fail_to_load() {
    let svc = flaky_service();
    let owner = flaky_user(&svc, "owner");
    let good = svc.create_group(owner, new_group("a", "Book club", false)).unwrap();
    let bad = svc.create_group(owner, new_group("b", "Book swap", false)).unwrap();
    svc.create_channel(good.id, new_channel("general")).unwrap();
    svc.create_channel(bad.id, new_channel("general")).unwrap();
    svc.store().break_channel_list(bad.id);

    let found = svc.search_public_channels_by_group_title("book").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].group.id, good.id);
}

#[test]
fn duplicates_that_slip_past_the_checks_are_caught_by_the_store() {
    let svc = flaky_service();
    let owner = flaky_user(&svc, "owner");
    let group = svc.create_group(owner, new_group("teamA", "Team A", false)).unwrap();
    svc.create_channel(group.id, new_channel("general")).unwrap();
    svc.store().blind_clash_checks();

    let err = svc.create_group(owner, new_group("teamA", "Another title", false)).unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupExists));
    let err = svc.create_group(owner, new_group("teamB", "Team A", false)).unwrap_err();
    assert!(matches!(err, ChatError::ChatGroupExists));
    let err = svc.create_channel(group.id, new_channel("general")).unwrap_err();
    assert!(matches!(err, ChatError::ChannelExists));

    assert_eq!(svc.get_chat_groups(&GroupFilter::default()).unwrap().len(), 1);
    assert_eq!(svc.store().list_channels(group.id).unwrap().len(), 1);
}
