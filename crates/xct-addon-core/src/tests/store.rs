use crate::{
    Action, ActionKind, BindingStore, CoreError, DEFAULT_SOUND_FILE, IN_MEMORY, KNOWN_EVENTS,
    MessageStore, NewBinding, NewTask, TaskStore, VolumePolicy, init_database,
};

async fn empty_store() -> BindingStore {
    #[allow(clippy::unwrap_used)]
    let db = init_database(IN_MEMORY, 1).await.unwrap();
    BindingStore::new(&db)
}

fn sound(event: &str) -> NewBinding {
    NewBinding {
        event: event.to_string(),
        action: Action::Sound {
            file: "beep.mp3".to_string(),
            volume: VolumePolicy::Maximum,
            play_count: 1,
        },
    }
}

/// WHAT: Bindings are appended in insertion order with sequential positions
/// WHY: The settings list shows rows in position order
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_three_added_bindings_when_listing_then_positions_are_sequential() {
    // Given: Three bindings added in order
    let store = empty_store().await;
    for event in ["TAKEOFF", "LANDING", "BT_OK"] {
        store.add(sound(event)).await.unwrap();
    }

    // When: Listing
    let list = store.list().await.unwrap();

    // Then: Order and positions follow insertion
    let events: Vec<_> = list.iter().map(|b| b.event.as_str()).collect();
    let positions: Vec<_> = list.iter().map(|b| b.position).collect();
    assert_eq!(events, ["TAKEOFF", "LANDING", "BT_OK"]);
    assert_eq!(positions, [0, 1, 2]);
}

/// WHAT: Every action kind survives storage unchanged
/// WHY: The row layout packs actions into shared columns
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_each_action_kind_when_stored_then_read_back_identically() {
    // Given: One binding per action kind
    let store = empty_store().await;
    let actions = [
        Action::Sound {
            file: "alarm.wav".to_string(),
            volume: VolumePolicy::Percentage(40),
            play_count: 3,
        },
        Action::LaunchApp {
            package: "org.example.vario".to_string(),
        },
        Action::SendTelegramPosition {
            chat_id: "-100123".to_string(),
            chat_name: Some("Club".to_string()),
        },
        Action::SendTelegramMessage {
            chat_id: "42".to_string(),
            chat_name: None,
            message: "Landed | all good".to_string(),
        },
        Action::Ptt,
    ];

    // When: Storing each under its own event and reading back
    for (event, action) in KNOWN_EVENTS.iter().zip(actions.iter()) {
        store
            .add(NewBinding {
                event: event.to_string(),
                action: action.clone(),
            })
            .await
            .unwrap();
    }
    let stored: Vec<_> = store.list().await.unwrap().into_iter().map(|b| b.action).collect();

    // Then: Actions are unchanged
    assert_eq!(stored, actions);
}

/// WHAT: A second binding for the same event is rejected
/// WHY: Each event maps to at most one reaction
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_bound_event_when_adding_again_then_duplicate_event_error() {
    // Given: TAKEOFF already bound
    let store = empty_store().await;
    store.add(sound("TAKEOFF")).await.unwrap();

    // When: Binding TAKEOFF again
    let result = store.add(sound("TAKEOFF")).await;

    // Then: DuplicateEvent, and the list still has one row
    assert!(matches!(result, Err(CoreError::DuplicateEvent { .. })));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

/// WHAT: Updating a binding onto another row's event is rejected
/// WHY: Uniqueness holds for edits as well as inserts
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_two_bindings_when_updating_onto_used_event_then_duplicate_event_error() {
    // Given: TAKEOFF and LANDING bound
    let store = empty_store().await;
    store.add(sound("TAKEOFF")).await.unwrap();
    let mut landing = store.add(sound("LANDING")).await.unwrap();

    // When: Renaming LANDING to TAKEOFF
    landing.event = "TAKEOFF".to_string();
    let result = store.update(&landing).await;

    // Then: Rejected
    assert!(matches!(result, Err(CoreError::DuplicateEvent { .. })));
}

/// WHAT: Update keeps the row's position
/// WHY: Editing a row must not move it in the list
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_binding_when_updating_action_then_position_unchanged() {
    // Given: Two bindings
    let store = empty_store().await;
    store.add(sound("TAKEOFF")).await.unwrap();
    let mut landing = store.add(sound("LANDING")).await.unwrap();

    // When: Changing the second one's action
    landing.action = Action::Ptt;
    store.update(&landing).await.unwrap();

    // Then: Same position, new action
    let stored = store.get(landing.id).await.unwrap();
    assert_eq!(stored.position, 1);
    assert_eq!(stored.action, Action::Ptt);
}

/// WHAT: Invalid parameters are rejected before storage
/// WHY: A zero play count or empty chat can never execute
#[tokio::test]
async fn given_invalid_action_when_adding_then_invalid_binding_error() {
    let store = empty_store().await;

    let zero_plays = store
        .add(NewBinding {
            event: "TAKEOFF".to_string(),
            action: Action::Sound {
                file: "beep.mp3".to_string(),
                volume: VolumePolicy::System,
                play_count: 0,
            },
        })
        .await;
    let empty_chat = store
        .add(NewBinding {
            event: "LANDING".to_string(),
            action: Action::SendTelegramPosition {
                chat_id: " ".to_string(),
                chat_name: None,
            },
        })
        .await;

    assert!(matches!(zero_plays, Err(CoreError::InvalidBinding { .. })));
    assert!(matches!(empty_chat, Err(CoreError::InvalidBinding { .. })));
}

/// WHAT: Events outside the catalog cannot be bound or edited in
/// WHY: Such a binding would never fire
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_unknown_event_when_adding_or_updating_then_invalid_binding_error() {
    // Given: One valid binding
    let store = empty_store().await;
    let mut landing = store.add(sound("LANDING")).await.unwrap();

    // When: Adding a lowercase event and renaming the row to a made-up one
    let added = store.add(sound("takeoff")).await;
    landing.event = "NOT_AN_EVENT".to_string();
    let updated = store.update(&landing).await;

    // Then: Both rejected, stored row untouched
    assert!(matches!(added, Err(CoreError::InvalidBinding { .. })));
    assert!(matches!(updated, Err(CoreError::InvalidBinding { .. })));
    let events: Vec<_> = store.list().await.unwrap().into_iter().map(|b| b.event).collect();
    assert_eq!(events, ["LANDING"]);
}

/// WHAT: Out-of-range play counts in the table are clamped on read
/// WHY: A hand-edited or migrated row must not wrap to zero plays
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_out_of_range_play_count_in_table_when_listing_then_clamped() {
    // Given: Rows whose play_count overflows u32 or is negative
    let db = init_database(IN_MEMORY, 1).await.unwrap();
    let store = BindingStore::new(&db);
    let takeoff = store.add(sound("TAKEOFF")).await.unwrap();
    let landing = store.add(sound("LANDING")).await.unwrap();
    for (id, count) in [(takeoff.id, 4_294_967_296_i64), (landing.id, -3)] {
        sqlx::query("UPDATE event_configs SET play_count = ?1 WHERE id = ?2")
            .bind(count)
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
    }

    // When: Reading them back
    let counts: Vec<_> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|b| match b.action {
            Action::Sound { play_count, .. } => play_count,
            other => panic!("unexpected action {other:?}"),
        })
        .collect();

    // Then: Saturated high, at least one low
    assert_eq!(counts, [u32::MAX, 1]);
}

/// WHAT: Reordering preserves membership and yields positions 0..K
/// WHY: Positions must stay a dense unique sequence after a drag
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_five_bindings_when_reordering_then_membership_kept_and_positions_dense() {
    // Given: Five bindings
    let store = empty_store().await;
    let events = &KNOWN_EVENTS[..5];
    for event in events {
        store.add(sound(event)).await.unwrap();
    }

    // When: Moving the first to index 3, then the last to the front
    store.reorder(0, 3).await.unwrap();
    let list = store.reorder(4, 0).await.unwrap();

    // Then: Same set of events, positions 0..5
    let mut listed: Vec<_> = list.iter().map(|b| b.event.as_str()).collect();
    let positions: Vec<_> = list.iter().map(|b| b.position).collect();
    assert_eq!(positions, [0, 1, 2, 3, 4]);
    assert_eq!(list[4].event, KNOWN_EVENTS[0]);
    assert_eq!(list[0].event, KNOWN_EVENTS[4]);
    listed.sort_unstable();
    let mut expected = events.to_vec();
    expected.sort_unstable();
    assert_eq!(listed, expected);
}

/// WHAT: Reorder with an index outside the list is rejected
/// WHY: Stale UI indices must not corrupt ordering
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_two_bindings_when_reordering_out_of_range_then_invalid_binding_error() {
    let store = empty_store().await;
    store.add(sound("TAKEOFF")).await.unwrap();
    store.add(sound("LANDING")).await.unwrap();

    let result = store.reorder(0, 2).await;

    assert!(matches!(result, Err(CoreError::InvalidBinding { .. })));
}

/// WHAT: Deleting a row renumbers the rest
/// WHY: Positions stay dense after removal
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_three_bindings_when_deleting_middle_then_remaining_renumbered() {
    // Given: Three bindings
    let store = empty_store().await;
    store.add(sound("TAKEOFF")).await.unwrap();
    let middle = store.add(sound("LANDING")).await.unwrap();
    store.add(sound("BT_OK")).await.unwrap();

    // When: Deleting the middle one
    store.delete(middle.id).await.unwrap();

    // Then: Two rows at positions 0 and 1
    let list = store.list().await.unwrap();
    let positions: Vec<_> = list.iter().map(|b| b.position).collect();
    assert_eq!(positions, [0, 1]);
    assert_eq!(list[1].event, "BT_OK");
}

/// WHAT: Deleting or fetching a missing id reports BindingNotFound
/// WHY: The API maps this to 404
#[tokio::test]
async fn given_missing_id_when_deleting_or_getting_then_binding_not_found() {
    let store = empty_store().await;

    assert!(matches!(store.delete(99).await, Err(CoreError::BindingNotFound { .. })));
    assert!(matches!(store.get(99).await, Err(CoreError::BindingNotFound { .. })));
}

/// WHAT: Available events exclude the bound ones
/// WHY: The event picker offers only unused events
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_bound_events_when_listing_available_then_bound_ones_excluded() {
    let store = empty_store().await;
    store.add(sound("TAKEOFF")).await.unwrap();
    store.add(sound("BT_KO")).await.unwrap();

    let available = store.available_events().await.unwrap();

    assert_eq!(available.len(), KNOWN_EVENTS.len() - 2);
    assert!(!available.contains(&"TAKEOFF"));
    assert!(!available.contains(&"BT_KO"));
    assert!(available.contains(&"LANDING"));
}

/// WHAT: An empty store is seeded once with the default beep
/// WHY: First run gives the pilot a working example binding
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_empty_store_when_ensuring_default_twice_then_seeded_once() {
    // Given: An empty store
    let store = empty_store().await;

    // When: Seeding twice
    let first = store.ensure_default().await.unwrap();
    let second = store.ensure_default().await.unwrap();

    // Then: One default sound binding
    let seeded = first.unwrap();
    assert!(second.is_none());
    assert_eq!(seeded.event, KNOWN_EVENTS[0]);
    assert_eq!(
        seeded.action,
        Action::Sound {
            file: DEFAULT_SOUND_FILE.to_string(),
            volume: VolumePolicy::System,
            play_count: 1,
        }
    );
    assert_eq!(store.list().await.unwrap().len(), 1);
}

/// WHAT: Message templates list by title and delete by id
/// WHY: The message picker is alphabetical
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_templates_when_listing_then_sorted_by_title_and_deletable() {
    // Given: Two templates inserted out of order
    let db = init_database(IN_MEMORY, 1).await.unwrap();
    let messages = MessageStore::new(&db);
    let zulu = messages.add("Zulu", "Landed safely").await.unwrap();
    messages.add("Alpha", "Need retrieve").await.unwrap();

    // When: Listing, then deleting one
    let titles: Vec<_> = messages
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.title)
        .collect();
    let deleted = messages.delete(zulu.id).await.unwrap();
    let deleted_again = messages.delete(zulu.id).await.unwrap();

    // Then: Alphabetical, and the second delete finds nothing
    assert_eq!(titles, ["Alpha", "Zulu"]);
    assert!(deleted);
    assert!(!deleted_again);
    assert_eq!(messages.list().await.unwrap().len(), 1);
}

#[allow(clippy::unwrap_used)]
async fn task_store() -> TaskStore {
    let db = init_database(IN_MEMORY, 1).await.unwrap();
    TaskStore::new(&db)
}

fn launch_task(name: &str, package: &str, launch_in_background: bool) -> NewTask {
    NewTask {
        name: name.to_string(),
        action: Action::LaunchApp {
            package: package.to_string(),
        },
        launch_in_background,
    }
}

/// WHAT: Saved tasks come back by name with their action and launch mode
/// WHY: The task picker lists them alphabetically
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_saved_tasks_when_listing_then_sorted_by_name_with_actions() {
    // Given: A launch task and a Telegram message task
    let tasks = task_store().await;
    tasks
        .add(launch_task("Tracker", "org.example.tracker", false))
        .await
        .unwrap();
    let message = tasks
        .add(NewTask {
            name: " Club update ".to_string(),
            action: Action::SendTelegramMessage {
                chat_id: "-100".to_string(),
                chat_name: Some("Club".to_string()),
                message: "Landed | all good".to_string(),
            },
            launch_in_background: true,
        })
        .await
        .unwrap();

    // When: Listing
    let list = tasks.list().await.unwrap();

    // Then: Ordered by trimmed name, fields intact
    let names: Vec<_> = list.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Club update", "Tracker"]);
    assert_eq!(list[0], message);
    assert!(!list[1].launch_in_background);
    assert_eq!(tasks.get(message.id).await.unwrap(), message);
}

/// WHAT: Tasks with a blank name or invalid action are refused
/// WHY: A saved task must be runnable once bound
#[tokio::test]
async fn given_invalid_task_when_adding_then_invalid_binding_error() {
    let tasks = task_store().await;

    let blank = tasks.add(launch_task("  ", "org.example.tracker", true)).await;
    let no_chat = tasks
        .add(NewTask {
            name: "Position".to_string(),
            action: Action::SendTelegramPosition {
                chat_id: String::new(),
                chat_name: None,
            },
            launch_in_background: true,
        })
        .await;

    assert!(matches!(blank, Err(CoreError::InvalidBinding { .. })));
    assert!(matches!(no_chat, Err(CoreError::InvalidBinding { .. })));
}

/// WHAT: Tasks can be removed one at a time or by kind
/// WHY: Clearing all launch shortcuts must leave Telegram tasks alone
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_mixed_tasks_when_deleting_by_kind_then_only_that_kind_removed() {
    // Given: Two launch tasks and one PTT task
    let tasks = task_store().await;
    let first = tasks.add(launch_task("A", "org.example.a", true)).await.unwrap();
    tasks.add(launch_task("B", "org.example.b", true)).await.unwrap();
    tasks
        .add(NewTask {
            name: "Talk".to_string(),
            action: Action::Ptt,
            launch_in_background: true,
        })
        .await
        .unwrap();

    // When: Deleting one by id, then every launch task
    let deleted = tasks.delete(first.id).await.unwrap();
    let deleted_again = tasks.delete(first.id).await.unwrap();
    let removed = tasks.delete_kind(ActionKind::LaunchApp).await.unwrap();

    // Then: Only the PTT task survives
    assert!(deleted);
    assert!(!deleted_again);
    assert_eq!(removed, 1);
    let names: Vec<_> = tasks.list().await.unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["Talk"]);
    assert!(matches!(tasks.get(first.id).await, Err(CoreError::TaskNotFound { .. })));
}

