//! SQLite-backed board store.
//!
//! # Responsibility
//! - Persist board items and apply reassign requests transactionally.
//! - Keep SQL details and server-side re-ranking inside this boundary.
//!
//! # Invariants
//! - Stage listing is deterministic: `sort_rank ASC, item_uuid ASC`.
//! - After `reassign`, every touched stage is ranked densely from zero.
//! - Loaded boards have unique ranks per stage; violations surface as
//!   `InvalidData`.

use crate::db::migrations::latest_version;
use crate::model::item::{parse_priority, Item, ItemId, Priority, WorkAreaId};
use crate::model::order::OrderModel;
use crate::model::stage::{parse_stage, Stage};
use crate::store::{BoardStore, ReassignRequest, StoreError, StoreResult};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const REQUIRED_COLUMNS: &[&str] = &[
    "item_uuid",
    "work_area_uuid",
    "stage",
    "sort_rank",
    "title",
    "priority",
    "created_at",
    "updated_at",
];

/// Board store over a migrated SQLite connection.
pub struct SqliteBoardStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardStore<'conn> {
    /// Creates store from migrated connection.
    ///
    /// # Errors
    /// - Schema version, table, or column mismatch.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_board_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Appends a new item at the end of `stage`.
    ///
    /// Item creation belongs to the CRUD layer; this entry point exists for
    /// seeding boards and tests.
    pub fn insert_item(
        &self,
        work_area: WorkAreaId,
        stage: Stage,
        title: &str,
        priority: Option<Priority>,
    ) -> StoreResult<Item> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let rank = next_rank(&tx, work_area, stage)?;
        let mut item = Item::new(stage, rank, title);
        item.priority = priority;
        tx.execute(
            "INSERT INTO board_items (
                item_uuid,
                work_area_uuid,
                stage,
                sort_rank,
                title,
                priority
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                item.id.to_string(),
                work_area.to_string(),
                stage.as_str(),
                rank,
                item.title.as_str(),
                priority.map(Priority::as_str),
            ],
        )?;
        tx.commit()?;
        Ok(item)
    }
}

impl BoardStore for SqliteBoardStore<'_> {
    fn fetch_items(&self, work_area: WorkAreaId) -> StoreResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                item_uuid,
                stage,
                sort_rank,
                title,
                priority
             FROM board_items
             WHERE work_area_uuid = ?1
             ORDER BY sort_rank ASC, item_uuid ASC;",
        )?;
        let mut rows = stmt.query([work_area.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        // Stable sort keeps the rank order from SQL within each stage.
        items.sort_by_key(|item| item.stage);

        OrderModel::new(&items)
            .validate()
            .map_err(|violation| StoreError::InvalidData(violation.to_string()))?;

        debug!(
            "event=board_fetch module=store status=ok work_area={} count={}",
            work_area,
            items.len()
        );
        Ok(items)
    }

    fn reassign(&self, request: &ReassignRequest) -> StoreResult<()> {
        if request.new_rank < 0 {
            return Err(StoreError::Rejected(format!(
                "rank must not be negative, got {}",
                request.new_rank
            )));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (work_area, current_stage) = load_item_location(&tx, request.item_id)?
            .ok_or(StoreError::ItemNotFound(request.item_id))?;

        let mut stage_ids = list_stage_ids(&tx, work_area, request.new_stage)?;
        stage_ids.retain(|id| *id != request.item_id);
        let index = request.new_rank.clamp(0, stage_ids.len() as i64) as usize;
        stage_ids.insert(index, request.item_id);

        tx.execute(
            "UPDATE board_items
             SET stage = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![request.item_id.to_string(), request.new_stage.as_str()],
        )?;
        write_dense_ranks(&tx, &stage_ids)?;

        let mut vacated = vec![current_stage, request.previous_stage];
        vacated.dedup();
        for stage in vacated
            .into_iter()
            .filter(|stage| *stage != request.new_stage)
        {
            let remaining = list_stage_ids(&tx, work_area, stage)?;
            write_dense_ranks(&tx, &remaining)?;
        }

        tx.commit()?;
        info!(
            "event=board_reassign module=store status=ok item={} from_stage={} to_stage={} rank={}",
            request.item_id,
            current_stage.as_str(),
            request.new_stage.as_str(),
            index
        );
        Ok(())
    }
}

fn load_item_location(
    conn: &Connection,
    item_id: ItemId,
) -> StoreResult<Option<(WorkAreaId, Stage)>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT work_area_uuid, stage
             FROM board_items
             WHERE item_uuid = ?1;",
            [item_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(area_text, stage_text)| {
        let area = parse_uuid(&area_text, "board_items.work_area_uuid")?;
        let stage = parse_stage_column(&stage_text)?;
        Ok((area, stage))
    })
    .transpose()
}

fn list_stage_ids(
    conn: &Connection,
    work_area: WorkAreaId,
    stage: Stage,
) -> StoreResult<Vec<ItemId>> {
    let mut stmt = conn.prepare(
        "SELECT item_uuid
         FROM board_items
         WHERE work_area_uuid = ?1
           AND stage = ?2
         ORDER BY sort_rank ASC, item_uuid ASC;",
    )?;
    let mut rows = stmt.query(params![work_area.to_string(), stage.as_str()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "board_items.item_uuid")?);
    }
    Ok(ids)
}

fn write_dense_ranks(conn: &Connection, ordered_ids: &[ItemId]) -> StoreResult<()> {
    for (index, id) in ordered_ids.iter().enumerate() {
        conn.execute(
            "UPDATE board_items
             SET sort_rank = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1
               AND sort_rank <> ?2;",
            params![id.to_string(), index as i64],
        )?;
    }
    Ok(())
}

/// Rank after the current maximum of `stage`.
///
/// A stage whose maximum is already `i64::MAX` is re-ranked densely first.
fn next_rank(conn: &Connection, work_area: WorkAreaId, stage: Stage) -> StoreResult<i64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(sort_rank)
         FROM board_items
         WHERE work_area_uuid = ?1
           AND stage = ?2;",
        params![work_area.to_string(), stage.as_str()],
        |row| row.get(0),
    )?;
    match max {
        None => Ok(0),
        Some(max) => match max.checked_add(1) {
            Some(next) => Ok(next),
            None => {
                let ids = list_stage_ids(conn, work_area, stage)?;
                write_dense_ranks(conn, &ids)?;
                Ok(ids.len() as i64)
            }
        },
    }
}

fn parse_item_row(row: &Row<'_>) -> StoreResult<Item> {
    let id_text: String = row.get("item_uuid")?;
    let id = parse_uuid(&id_text, "board_items.item_uuid")?;

    let stage_text: String = row.get("stage")?;
    let stage = parse_stage_column(&stage_text)?;

    let priority = row
        .get::<_, Option<String>>("priority")?
        .map(|value| {
            parse_priority(&value).ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "invalid priority `{value}` in board_items.priority"
                ))
            })
        })
        .transpose()?;

    let mut item = Item::with_id(
        id,
        stage,
        row.get("sort_rank")?,
        row.get::<_, String>("title")?,
    );
    item.priority = priority;
    Ok(item)
}

fn parse_stage_column(value: &str) -> StoreResult<Stage> {
    parse_stage(value).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid stage `{value}` in board_items.stage"))
    })
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_board_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_present: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'board_items'
        );",
        [],
        |row| row.get(0),
    )?;
    if table_present != 1 {
        return Err(StoreError::MissingRequiredTable("board_items"));
    }

    let columns = table_columns(conn, "board_items")?;
    for &column in REQUIRED_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(StoreError::MissingRequiredColumn {
                table: "board_items",
                column,
            });
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
