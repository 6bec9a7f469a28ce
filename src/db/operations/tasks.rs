use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::models::{StudyMode, Task, TaskType};

const TASK_COLUMNS: &str = r#"t."id",t."studyPlanId",t."title",t."description",t."type",t."mode",t."priority",
    t."estimatedMinutes",t."dayNumber",t."rationale",t."completionStatus",t."scheduledDate",t."completedAt",t."order""#;

pub async fn delete_incomplete_for_plan(conn: &mut SqliteConnection, plan_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "tasks" WHERE "studyPlanId" = ? AND "completionStatus" = 0"#)
        .bind(plan_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_tasks(conn: &mut SqliteConnection, tasks: &[Task]) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    for task in tasks {
        sqlx::query(
            r#"INSERT INTO "tasks" ("id","studyPlanId","title","description","type","mode","priority","estimatedMinutes",
                                    "dayNumber","rationale","completionStatus","scheduledDate","completedAt","order","createdAt")
               VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)"#,
        )
        .bind(&task.id)
        .bind(&task.study_plan_id)
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.task_type.as_str())
        .bind(task.mode.as_str())
        .bind(task.priority)
        .bind(task.estimated_minutes)
        .bind(task.day_number)
        .bind(task.rationale.as_deref())
        .bind(task.completion_status)
        .bind(task.scheduled_date)
        .bind(task.completed_at)
        .bind(task.order)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn list_for_plan(conn: &mut SqliteConnection, plan_id: &str) -> Result<Vec<Task>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {TASK_COLUMNS} FROM "tasks" t WHERE t."studyPlanId" = ?
           ORDER BY t."scheduledDate", t."order", t."dayNumber", t.rowid"#
    );
    let rows = sqlx::query(&sql).bind(plan_id).fetch_all(&mut *conn).await?;
    rows.iter().map(map_task_row).collect()
}

/// Incomplete tasks scheduled on `day` across every plan the user owns.
pub async fn list_due_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    day: NaiveDate,
) -> Result<Vec<Task>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {TASK_COLUMNS} FROM "tasks" t
           JOIN "study_plans" p ON p."id" = t."studyPlanId"
           WHERE p."userId" = ? AND t."scheduledDate" = ? AND t."completionStatus" = 0
           ORDER BY t."order", t.rowid"#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(day)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(map_task_row).collect()
}

pub async fn get_task(conn: &mut SqliteConnection, task_id: &str) -> Result<Option<Task>, sqlx::Error> {
    let sql = format!(r#"SELECT {TASK_COLUMNS} FROM "tasks" t WHERE t."id" = ?"#);
    let row = sqlx::query(&sql).bind(task_id).fetch_optional(&mut *conn).await?;
    row.as_ref().map(map_task_row).transpose()
}

/// Marks a task completed; already-completed tasks keep their original timestamp.
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"UPDATE "tasks" SET "completionStatus" = 1, "completedAt" = ? WHERE "id" = ? AND "completionStatus" = 0"#,
    )
    .bind(now)
    .bind(task_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

fn map_task_row(row: &SqliteRow) -> Result<Task, sqlx::Error> {
    let task_type: String = row.try_get("type").unwrap_or_default();
    let mode: String = row.try_get("mode").unwrap_or_default();

    Ok(Task {
        id: row.try_get("id")?,
        study_plan_id: row.try_get("studyPlanId")?,
        title: row.try_get("title").unwrap_or_default(),
        description: row.try_get("description").ok().flatten(),
        task_type: TaskType::from_str(&task_type),
        mode: StudyMode::from_str(&mode).unwrap_or(StudyMode::Learn),
        priority: row.try_get("priority").unwrap_or(0),
        estimated_minutes: row.try_get("estimatedMinutes").unwrap_or(20),
        day_number: row.try_get("dayNumber").ok().flatten(),
        rationale: row.try_get("rationale").ok().flatten(),
        completion_status: row.try_get("completionStatus").unwrap_or(false),
        scheduled_date: row.try_get("scheduledDate").ok().flatten(),
        completed_at: row.try_get("completedAt").ok().flatten(),
        order: row.try_get("order").unwrap_or(0),
    })
}
