use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    BoardStore, DropTarget, Item, MoveCoordinator, OrderModel, Priority, ReassignRequest,
    SqliteBoardStore, Stage, StoreError, WorkAreaId,
};
use uuid::Uuid;

fn seed(store: &SqliteBoardStore<'_>, area: WorkAreaId, layout: &[(Stage, &str)]) -> Vec<Item> {
    layout
        .iter()
        .map(|(stage, title)| store.insert_item(area, *stage, title, None).unwrap())
        .collect()
}

fn titles(items: &[Item], stage: Stage) -> Vec<String> {
    OrderModel::new(items)
        .items_in_stage(stage)
        .into_iter()
        .map(|item| item.title.clone())
        .collect()
}

fn ranks(items: &[Item], stage: Stage) -> Vec<i64> {
    OrderModel::new(items)
        .items_in_stage(stage)
        .into_iter()
        .map(|item| item.rank)
        .collect()
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteBoardStore::try_new(&conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, 1);
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
}

#[test]
fn insert_appends_per_stage_and_fetch_groups_by_stage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    seed(
        &store,
        area,
        &[
            (Stage::Done, "shipped"),
            (Stage::Backlog, "a"),
            (Stage::Backlog, "b"),
            (Stage::Next, "n"),
            (Stage::Backlog, "c"),
        ],
    );

    let items = store.fetch_items(area).unwrap();

    let stages = items.iter().map(|item| item.stage).collect::<Vec<_>>();
    assert_eq!(
        stages,
        vec![
            Stage::Backlog,
            Stage::Backlog,
            Stage::Backlog,
            Stage::Next,
            Stage::Done
        ]
    );
    assert_eq!(titles(&items, Stage::Backlog), vec!["a", "b", "c"]);
    assert_eq!(ranks(&items, Stage::Backlog), vec![0, 1, 2]);
    assert_eq!(ranks(&items, Stage::Done), vec![0]);
}

#[test]
fn fetch_is_scoped_to_work_area_and_keeps_priority() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let other_area = Uuid::new_v4();
    store
        .insert_item(area, Stage::Review, "mine", Some(Priority::Urgent))
        .unwrap();
    store
        .insert_item(other_area, Stage::Review, "theirs", None)
        .unwrap();

    let items = store.fetch_items(area).unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "mine");
    assert_eq!(items[0].priority, Some(Priority::Urgent));
    assert!(store.fetch_items(Uuid::new_v4()).unwrap().is_empty());
}

#[test]
fn reassign_within_stage_rewrites_dense_ranks() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(
        &store,
        area,
        &[(Stage::Backlog, "a"), (Stage::Backlog, "b"), (Stage::Backlog, "c")],
    );

    store
        .reassign(&ReassignRequest {
            ticket: 1,
            item_id: seeded[2].id,
            new_stage: Stage::Backlog,
            new_rank: 0,
            previous_stage: Stage::Backlog,
        })
        .unwrap();

    let items = store.fetch_items(area).unwrap();
    assert_eq!(titles(&items, Stage::Backlog), vec!["c", "a", "b"]);
    assert_eq!(ranks(&items, Stage::Backlog), vec![0, 1, 2]);
}

#[test]
fn reassign_across_stages_densifies_the_vacated_stage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(
        &store,
        area,
        &[
            (Stage::Backlog, "a"),
            (Stage::Backlog, "b"),
            (Stage::Backlog, "c"),
            (Stage::Review, "r"),
        ],
    );

    store
        .reassign(&ReassignRequest {
            ticket: 7,
            item_id: seeded[1].id,
            new_stage: Stage::Review,
            new_rank: 1,
            previous_stage: Stage::Backlog,
        })
        .unwrap();

    let items = store.fetch_items(area).unwrap();
    assert_eq!(titles(&items, Stage::Backlog), vec!["a", "c"]);
    assert_eq!(ranks(&items, Stage::Backlog), vec![0, 1]);
    assert_eq!(titles(&items, Stage::Review), vec!["r", "b"]);
}

#[test]
fn oversized_rank_clamps_to_end_of_stage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(&store, area, &[(Stage::Next, "x"), (Stage::Done, "d")]);

    store
        .reassign(&ReassignRequest {
            ticket: 1,
            item_id: seeded[0].id,
            new_stage: Stage::Done,
            new_rank: 40,
            previous_stage: Stage::Next,
        })
        .unwrap();

    let items = store.fetch_items(area).unwrap();
    assert_eq!(titles(&items, Stage::Done), vec!["d", "x"]);
    assert_eq!(ranks(&items, Stage::Done), vec![0, 1]);
}

#[test]
fn replaying_the_same_request_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(
        &store,
        area,
        &[(Stage::Backlog, "a"), (Stage::Backlog, "b"), (Stage::Next, "n")],
    );
    let request = ReassignRequest {
        ticket: 3,
        item_id: seeded[0].id,
        new_stage: Stage::Next,
        new_rank: 0,
        previous_stage: Stage::Backlog,
    };

    store.reassign(&request).unwrap();
    let once = store.fetch_items(area).unwrap();
    store.reassign(&request).unwrap();
    let twice = store.fetch_items(area).unwrap();

    assert_eq!(
        OrderModel::new(&once).display_order(),
        OrderModel::new(&twice).display_order()
    );
    assert_eq!(titles(&twice, Stage::Next), vec!["a", "n"]);
}

#[test]
fn reassign_rejects_negative_rank_and_unknown_item() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(&store, area, &[(Stage::Backlog, "a")]);

    let negative = store.reassign(&ReassignRequest {
        ticket: 1,
        item_id: seeded[0].id,
        new_stage: Stage::Next,
        new_rank: -1,
        previous_stage: Stage::Backlog,
    });
    assert!(matches!(negative, Err(StoreError::Rejected(_))));

    let ghost = Uuid::new_v4();
    let missing = store.reassign(&ReassignRequest {
        ticket: 2,
        item_id: ghost,
        new_stage: Stage::Next,
        new_rank: 0,
        previous_stage: Stage::Backlog,
    });
    assert!(matches!(missing, Err(StoreError::ItemNotFound(id)) if id == ghost));

    let items = store.fetch_items(area).unwrap();
    assert_eq!(titles(&items, Stage::Backlog), vec!["a"]);
}

#[test]
fn fetch_reports_duplicate_ranks_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(&store, area, &[(Stage::Review, "a"), (Stage::Review, "b")]);
    conn.execute(
        "UPDATE board_items SET sort_rank = 0 WHERE item_uuid = ?1;",
        [seeded[1].id.to_string()],
    )
    .unwrap();

    let err = store.fetch_items(area).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
    assert!(err.to_string().contains("invalid board data"));
}

#[test]
fn server_order_matches_optimistic_order_after_each_move() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(
        &store,
        area,
        &[
            (Stage::Backlog, "a"),
            (Stage::Backlog, "b"),
            (Stage::Backlog, "c"),
            (Stage::Next, "n1"),
            (Stage::Next, "n2"),
            (Stage::InProgress, "p"),
        ],
    );
    let mut coordinator = MoveCoordinator::new(area, store.fetch_items(area).unwrap()).unwrap();

    let moves = [
        (seeded[0].id, DropTarget::Item(seeded[2].id)),
        (seeded[4].id, DropTarget::Item(seeded[1].id)),
        (seeded[5].id, DropTarget::Stage(Stage::Done)),
        (seeded[2].id, DropTarget::Stage(Stage::Next)),
        (seeded[1].id, DropTarget::Item(seeded[0].id)),
        (seeded[3].id, DropTarget::Stage(Stage::Next)),
    ];
    for (item_id, target) in moves {
        let Some(request) = coordinator.move_item(item_id, target).unwrap() else {
            continue;
        };
        store.reassign(&request).unwrap();
        coordinator.complete(request.ticket, Ok(()));

        let stored = store.fetch_items(area).unwrap();
        assert_eq!(
            OrderModel::new(&stored).display_order(),
            coordinator.order_model().display_order(),
            "diverged after moving {item_id}"
        );
    }
}

#[test]
fn insert_after_saturated_rank_densifies_the_stage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(&store, area, &[(Stage::Backlog, "a")]);
    conn.execute(
        "UPDATE board_items SET sort_rank = ?2 WHERE item_uuid = ?1;",
        rusqlite::params![seeded[0].id.to_string(), i64::MAX],
    )
    .unwrap();

    let appended = store.insert_item(area, Stage::Backlog, "b", None).unwrap();
    assert_eq!(appended.rank, 1);

    let items = store.fetch_items(area).unwrap();
    assert_eq!(titles(&items, Stage::Backlog), vec!["a", "b"]);
    assert_eq!(ranks(&items, Stage::Backlog), vec![0, 1]);
}

#[test]
fn move_into_saturated_stage_appends_locally_and_in_storage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let area = Uuid::new_v4();
    let seeded = seed(&store, area, &[(Stage::Backlog, "a"), (Stage::Done, "b")]);
    conn.execute(
        "UPDATE board_items SET sort_rank = ?2 WHERE item_uuid = ?1;",
        rusqlite::params![seeded[0].id.to_string(), i64::MAX],
    )
    .unwrap();
    let mut coordinator = MoveCoordinator::new(area, store.fetch_items(area).unwrap()).unwrap();

    let request = coordinator
        .move_item(seeded[1].id, DropTarget::Stage(Stage::Backlog))
        .unwrap()
        .unwrap();
    assert_eq!(request.new_rank, 1);
    assert_eq!(
        titles(coordinator.items(), Stage::Backlog),
        vec!["a", "b"]
    );

    store.reassign(&request).unwrap();
    let stored = store.fetch_items(area).unwrap();
    assert_eq!(titles(&stored, Stage::Backlog), vec!["a", "b"]);
    assert_eq!(ranks(&stored, Stage::Backlog), vec![0, 1]);
}
