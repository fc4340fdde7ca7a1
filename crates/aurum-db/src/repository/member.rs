//! # Member Repository
//!
//! Loyalty members and the two ways their standing changes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Loyalty Accumulation                                 │
//! │                                                                         │
//! │  (a) Incremental, inside every completed sale/purchase:                 │
//! │                                                                         │
//! │      sale     ──► total_purchase += grand, points += grand / 100k       │
//! │      purchase ──► total_sell     += grand, points += grand / 200k       │
//! │                   transaction_count += 1, tier = f(total_purchase)      │
//! │                                                                         │
//! │  (b) Full recalculation sweep (repair tool, `recalculate-members`):     │
//! │                                                                         │
//! │      for each member:                                                   │
//! │        totals, count ← SUM/COUNT over completed transactions            │
//! │        points, tier  ← derived from totals (manual awards are dropped)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::unique_as;
use crate::error::{DbError, DbResult};
use aurum_core::codes;
use aurum_core::validation::{validate_amount, validate_required};
use aurum_core::{LoyaltyStanding, Member, MemberTier, Money, NewMember};

const MEMBER_SELECT: &str = "SELECT id, member_code, name, phone, email, address, id_number, tier, \
     points, total_purchase, total_sell, transaction_count, join_date, is_active, created_at, \
     updated_at \
     FROM members WHERE deleted_at IS NULL";

// =============================================================================
// Shared lookups and accrual
// =============================================================================

pub(crate) async fn fetch_member<'e, E>(executor: E, id: &str) -> DbResult<Option<Member>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{MEMBER_SELECT} AND id = ?1");
    let member = sqlx::query_as::<_, Member>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(member)
}

/// Read-modify-write of a member's standing on an open transaction.
///
/// Callers must already have written in this transaction so that SQLite
/// holds the write lock for the read.
pub(crate) async fn apply_in<F>(
    conn: &mut SqliteConnection,
    member_id: &str,
    change: F,
) -> DbResult<LoyaltyStanding>
where
    F: FnOnce(LoyaltyStanding) -> LoyaltyStanding,
{
    let member = fetch_member(&mut *conn, member_id)
        .await?
        .ok_or_else(|| DbError::not_found("Member", member_id))?;

    let standing = change(LoyaltyStanding::from_member(&member));
    write_standing(conn, member_id, &standing).await?;

    debug!(
        member_id = %member_id,
        tier = %standing.tier,
        points = standing.points,
        "Member standing updated"
    );
    Ok(standing)
}

async fn write_standing(
    conn: &mut SqliteConnection,
    member_id: &str,
    standing: &LoyaltyStanding,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE members
        SET tier = ?1, points = ?2, total_purchase = ?3, total_sell = ?4,
            transaction_count = ?5, updated_at = ?6
        WHERE id = ?7 AND deleted_at IS NULL
        "#,
    )
    .bind(standing.tier)
    .bind(standing.points)
    .bind(standing.total_purchase)
    .bind(standing.total_sell)
    .bind(standing.transaction_count)
    .bind(Utc::now())
    .bind(member_id)
    .execute(conn)
    .await?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for loyalty members.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    /// Creates a new MemberRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MemberRepository { pool }
    }

    /// Registers a member with a generated member code, regular tier and
    /// zeroed totals.
    pub async fn create(&self, new_member: &NewMember) -> DbResult<Member> {
        new_member.validate()?;

        let now = Utc::now();
        let member = Member {
            id: Uuid::new_v4().to_string(),
            member_code: codes::member_code(now),
            name: new_member.name.trim().to_string(),
            phone: new_member.phone.clone(),
            email: new_member.email.clone(),
            address: new_member.address.clone(),
            id_number: new_member.id_number.clone(),
            tier: MemberTier::Regular,
            points: 0,
            total_purchase: Money::zero(),
            total_sell: Money::zero(),
            transaction_count: 0,
            join_date: now,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %member.id, code = %member.member_code, "Inserting member");

        sqlx::query(
            r#"
            INSERT INTO members (
                id, member_code, name, phone, email, address, id_number, tier, points,
                total_purchase, total_sell, transaction_count, join_date, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&member.id)
        .bind(&member.member_code)
        .bind(&member.name)
        .bind(&member.phone)
        .bind(&member.email)
        .bind(&member.address)
        .bind(&member.id_number)
        .bind(member.tier)
        .bind(member.points)
        .bind(member.total_purchase)
        .bind(member.total_sell)
        .bind(member.transaction_count)
        .bind(member.join_date)
        .bind(member.is_active)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unique_as("member_code", &member.member_code))?;

        info!(member_code = %member.member_code, "Member registered");
        Ok(member)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Member>> {
        fetch_member(&self.pool, id).await
    }

    pub async fn get_by_code(&self, member_code: &str) -> DbResult<Option<Member>> {
        let sql = format!("{MEMBER_SELECT} AND member_code = ?1");
        let member = sqlx::query_as::<_, Member>(&sql)
            .bind(member_code.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    /// Manually awards purchase points for `amount` (1 point per 100,000)
    /// without touching totals or tier.
    ///
    /// ## Errors
    /// * `NotFound` - no such member
    pub async fn award_points(&self, member_id: &str, amount: Money) -> DbResult<Member> {
        validate_required("member_id", member_id)?;
        validate_amount("amount", amount)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Claim the row first so the read below happens under the write lock
        let claimed = sqlx::query("UPDATE members SET updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL")
            .bind(now)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(DbError::not_found("Member", member_id));
        }

        let standing = apply_in(&mut tx, member_id, |s| s.award_purchase_points(amount)).await?;
        let member = fetch_member(&mut *tx, member_id)
            .await?
            .ok_or_else(|| DbError::not_found("Member", member_id))?;

        tx.commit().await?;

        info!(member_id = %member_id, %amount, points = standing.points, "Points awarded");
        Ok(member)
    }

    /// Rebuilds every member's totals, count, points and tier from their
    /// completed transactions. Returns the number of members swept.
    ///
    /// Never called by the sale/purchase path.
    pub async fn recalculate_all(&self) -> DbResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE members
            SET total_purchase = COALESCE((
                    SELECT SUM(t.grand_total) FROM transactions t
                    WHERE t.member_id = members.id
                      AND t.transaction_type = 'sale'
                      AND t.status = 'completed'
                      AND t.deleted_at IS NULL
                ), 0),
                total_sell = COALESCE((
                    SELECT SUM(t.grand_total) FROM transactions t
                    WHERE t.member_id = members.id
                      AND t.transaction_type = 'purchase'
                      AND t.status = 'completed'
                      AND t.deleted_at IS NULL
                ), 0),
                transaction_count = (
                    SELECT COUNT(*) FROM transactions t
                    WHERE t.member_id = members.id
                      AND t.status = 'completed'
                      AND t.deleted_at IS NULL
                ),
                updated_at = ?1
            WHERE deleted_at IS NULL
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let members = sqlx::query_as::<_, Member>(MEMBER_SELECT)
            .fetch_all(&mut *tx)
            .await?;

        for member in &members {
            let standing = LoyaltyStanding::recalculate(
                member.total_purchase,
                member.total_sell,
                member.transaction_count,
            );
            write_standing(&mut tx, &member.id, &standing).await?;
        }

        tx.commit().await?;

        let swept = members.len() as u64;
        info!(members = swept, "Member standings recalculated");
        Ok(swept)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
