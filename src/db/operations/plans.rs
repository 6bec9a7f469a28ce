use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::operations::new_id;
use crate::models::{MaterialCategory, PlanStatus, StudyPlan};

#[derive(Debug, Clone)]
pub struct NewPlan {
    pub user_id: String,
    pub name: String,
    pub category: Option<MaterialCategory>,
    pub exam_date: Option<NaiveDate>,
    pub status: PlanStatus,
}

pub async fn get_plan(conn: &mut SqliteConnection, plan_id: &str) -> Result<Option<StudyPlan>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "id","userId","name","category","examDate","status","createdAt","updatedAt"
           FROM "study_plans" WHERE "id" = ?"#,
    )
    .bind(plan_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_plan_row).transpose()
}

pub async fn insert_plan(conn: &mut SqliteConnection, input: NewPlan) -> Result<StudyPlan, sqlx::Error> {
    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        r#"INSERT INTO "study_plans" ("id","userId","name","category","examDate","status","createdAt","updatedAt")
           VALUES (?,?,?,?,?,?,?,?)"#,
    )
    .bind(&id)
    .bind(&input.user_id)
    .bind(&input.name)
    .bind(input.category.map(|c| c.as_str()))
    .bind(input.exam_date)
    .bind(input.status.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(StudyPlan {
        id,
        user_id: input.user_id,
        name: input.name,
        category: input.category,
        exam_date: input.exam_date,
        status: input.status,
        created_at: now,
        updated_at: now,
    })
}

pub async fn set_plan_status(
    conn: &mut SqliteConnection,
    plan_id: &str,
    status: PlanStatus,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(r#"UPDATE "study_plans" SET "status" = ?, "updatedAt" = ? WHERE "id" = ?"#)
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(plan_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Plans holding flashcards but no pre-assessment yet.
pub async fn plans_missing_assessment(conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT p."id" FROM "study_plans" p
           WHERE EXISTS (SELECT 1 FROM "flashcards" f WHERE f."studyPlanId" = p."id")
             AND NOT EXISTS (SELECT 1 FROM "pre_assessments" a WHERE a."studyPlanId" = p."id")
           ORDER BY p."createdAt""#,
    )
    .fetch_all(&mut *conn)
    .await
}

/// Plans left in `generating` since before `cutoff`.
pub async fn stuck_generating_plans(
    conn: &mut SqliteConnection,
    cutoff: DateTime<Utc>,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT "id","updatedAt" FROM "study_plans" WHERE "status" = ?"#)
        .bind(PlanStatus::Generating.as_str())
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let updated_at: DateTime<Utc> = row.try_get("updatedAt").ok()?;
            if updated_at < cutoff {
                row.try_get("id").ok()
            } else {
                None
            }
        })
        .collect())
}

fn map_plan_row(row: &SqliteRow) -> Result<StudyPlan, sqlx::Error> {
    let category: Option<String> = row.try_get("category").ok().flatten();
    let status: String = row.try_get("status").unwrap_or_default();
    let now = Utc::now();

    Ok(StudyPlan {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        name: row.try_get("name").unwrap_or_default(),
        category: category.as_deref().and_then(MaterialCategory::from_str),
        exam_date: row.try_get("examDate").ok().flatten(),
        status: PlanStatus::from_str(&status),
        created_at: row.try_get("createdAt").unwrap_or(now),
        updated_at: row.try_get("updatedAt").unwrap_or(now),
    })
}
