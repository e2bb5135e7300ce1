//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskboard_core` linkage.
//! - Run one scripted drag against an in-memory board and print the result.

use std::process::ExitCode;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    BoardConfig, BoardEvent, BoardSession, BoardStore, Completion, DropTarget, Item, ItemCache,
    OrderModel, Point, PointerEvent, SqliteBoardStore, Stage,
};
use uuid::Uuid;

fn main() -> ExitCode {
    println!("taskboard_core ping={}", taskboard_core::ping());
    println!("taskboard_core version={}", taskboard_core::core_version());

    match scripted_drag() {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("scripted drag failed: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Seeds `a, b` in backlog, drags `a` onto `b`, persists and re-reads.
fn scripted_drag() -> Result<String, String> {
    let conn = open_db_in_memory().map_err(|err| err.to_string())?;
    let store = SqliteBoardStore::try_new(&conn).map_err(|err| err.to_string())?;
    let area = Uuid::new_v4();
    let a = store
        .insert_item(area, Stage::Backlog, "a", None)
        .map_err(|err| err.to_string())?;
    let b = store
        .insert_item(area, Stage::Backlog, "b", None)
        .map_err(|err| err.to_string())?;

    let mut cache = ItemCache::new();
    let mut session = BoardSession::open(area, &store, &mut cache, BoardConfig::default())
        .map_err(|err| err.to_string())?;

    let script = [
        PointerEvent::Down {
            item_id: a.id,
            origin: a.placement(),
            at: Point::new(0.0, 0.0),
        },
        PointerEvent::Move {
            at: Point::new(0.0, 48.0),
            hover: Some(DropTarget::Item(b.id)),
        },
        PointerEvent::Up,
    ];
    let mut applied = None;
    for event in script {
        if let BoardEvent::MoveApplied(request) = session.handle_pointer(event, &mut cache) {
            applied = Some(request);
        }
    }
    let request = applied.ok_or("drop did not produce a move")?;

    match session.persist(&request, &store, &mut cache) {
        Completion::Confirmed { .. } => {}
        other => return Err(format!("persist did not confirm: {other:?}")),
    }

    let stored = store.fetch_items(area).map_err(|err| err.to_string())?;
    Ok(format!(
        "backlog local=[{}] stored=[{}]",
        backlog_titles(session.items()),
        backlog_titles(&stored)
    ))
}

fn backlog_titles(items: &[Item]) -> String {
    OrderModel::new(items)
        .items_in_stage(Stage::Backlog)
        .into_iter()
        .map(|item| item.title.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
