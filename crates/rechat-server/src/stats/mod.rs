//! Statistics Module
//!
//! Aggregate queries behind the admin dashboard's world map.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::AppState;
use crate::error::Error;

/// One bar of the users-by-country breakdown
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CountryStat {
    pub country: String,
    pub user_count: i64,
}

/// User count grouped by country, descending. Accounts without a
/// `user_details` row land in `Unknown`.
pub async fn users_by_country(pool: &SqlitePool) -> Result<Vec<CountryStat>, sqlx::Error> {
    sqlx::query_as::<_, CountryStat>(
        r#"
        SELECT
            COALESCE(ud.country, 'Unknown') AS country,
            COUNT(u.id) AS user_count
        FROM users u
        LEFT JOIN user_details ud ON u.id = ud.user_id
        GROUP BY ud.country
        ORDER BY user_count DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// GET /api/stats/users-by-country
pub async fn users_by_country_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<CountryStat>>, Error> {
    let stats = users_by_country(&state.pool).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn seed_user(pool: &SqlitePool, username: &str, country: Option<&str>) -> i64 {
        let id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, join_date) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind("hash")
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

        if let Some(country) = country {
            sqlx::query("INSERT INTO user_details (user_id, country) VALUES (?, ?)")
                .bind(id)
                .bind(country)
                .execute(pool)
                .await
                .unwrap();
        }
        id
    }

    #[tokio::test]
    async fn test_users_by_country_groups_and_sorts() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        seed_user(&pool, "a", Some("Germany")).await;
        seed_user(&pool, "b", Some("Germany")).await;
        seed_user(&pool, "c", Some("Japan")).await;
        seed_user(&pool, "d", None).await;

        let stats = users_by_country(&pool).await.unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].country, "Germany");
        assert_eq!(stats[0].user_count, 2);
        assert!(stats.iter().any(|s| s.country == "Unknown" && s.user_count == 1));
    }

    #[tokio::test]
    async fn test_users_by_country_empty_db() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let stats = users_by_country(&pool).await.unwrap();
        assert!(stats.is_empty());
    }
}
