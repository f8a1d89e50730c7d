//! Debates: coin-staked ranking duels decided by community vote

use battle_core::debate::{decide_winner, validate_reward, winner_payout, DebateSide, DebateStatus, DEBATE_PAGE_SIZE};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

use super::economy::{credit, debit, log_transaction, TransactionKind};
use super::new_id;
use super::rankings::require_author;
use super::social::{create_notification, NotificationKind};
use super::users::{bump_counter, summary_columns, UserCounter, UserSummary};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateRanking {
    pub id: String,
    pub title: String,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub reward: i64,
    pub status: DebateStatus,
    pub creator_votes: i64,
    pub challenger_votes: i64,
    pub winner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub creator: UserSummary,
    pub challenger: Option<UserSummary>,
    pub creator_ranking: DebateRanking,
    pub challenger_ranking: Option<DebateRanking>,
}

impl DebateRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        let challenger_ranking = match row.get::<_, Option<String>>("cr_id")? {
            Some(id) => Some(DebateRanking {
                id,
                title: row.get("cr_title")?,
                like_count: row.get("cr_like_count")?,
            }),
            None => None,
        };
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            reward: row.get("reward")?,
            status: status.parse().map_err(|e: battle_core::CoreError| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })?,
            creator_votes: row.get("creator_votes")?,
            challenger_votes: row.get("challenger_votes")?,
            winner_id: row.get("winner_id")?,
            created_at: row.get("created_at")?,
            started_at: row.get("started_at")?,
            ended_at: row.get("ended_at")?,
            creator: UserSummary::from_prefixed(row, "creator_")?,
            challenger: UserSummary::from_prefixed_opt(row, "challenger_")?,
            creator_ranking: DebateRanking {
                id: row.get("kr_id")?,
                title: row.get("kr_title")?,
                like_count: row.get("kr_like_count")?,
            },
            challenger_ranking,
        })
    }

    fn is_participant(&self, user_id: &str) -> bool {
        self.creator.id == user_id || self.challenger.as_ref().map(|c| c.id.as_str()) == Some(user_id)
    }

    fn side_user(&self, side: DebateSide) -> Option<&str> {
        match side {
            DebateSide::Creator => Some(self.creator.id.as_str()),
            DebateSide::Challenger => self.challenger.as_ref().map(|c| c.id.as_str()),
        }
    }
}

fn select() -> String {
    format!(
        "SELECT d.id, d.title, d.description, d.reward, d.status, d.creator_votes, d.challenger_votes,
                d.winner_id, d.created_at, d.started_at, d.ended_at,
                {creator}, {challenger},
                kr.id AS kr_id, kr.title AS kr_title, kr.like_count AS kr_like_count,
                cr.id AS cr_id, cr.title AS cr_title, cr.like_count AS cr_like_count
         FROM debates d
         JOIN users cu ON cu.id = d.creator_id
         LEFT JOIN users hu ON hu.id = d.challenger_id
         JOIN rankings kr ON kr.id = d.creator_ranking_id
         LEFT JOIN rankings cr ON cr.id = d.challenger_ranking_id",
        creator = summary_columns("cu", "creator_"),
        challenger = summary_columns("hu", "challenger_")
    )
}

pub fn get_debate(conn: &Connection, id: &str) -> Result<Option<DebateRow>, ApiError> {
    let sql = format!("{} WHERE d.id = ?", select());
    Ok(conn.query_row(&sql, [id], |row| DebateRow::from_row(row)).optional()?)
}

pub fn require_debate(conn: &Connection, id: &str) -> Result<DebateRow, ApiError> {
    get_debate(conn, id)?.ok_or_else(|| ApiError::not_found("Debate"))
}

/// Latest debates, optionally filtered by status
pub fn list_debates(conn: &Connection, status: Option<DebateStatus>) -> Result<Vec<DebateRow>, ApiError> {
    let rows = match status {
        Some(status) => {
            let sql = format!("{} WHERE d.status = ? ORDER BY d.created_at DESC LIMIT ?", select());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![status.as_str(), DEBATE_PAGE_SIZE], |row| DebateRow::from_row(row))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let sql = format!("{} ORDER BY d.created_at DESC LIMIT ?", select());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([DEBATE_PAGE_SIZE], |row| DebateRow::from_row(row))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Open a debate on one of the creator's rankings, escrowing the reward
pub fn create_debate(
    conn: &mut Connection,
    creator_id: &str,
    title: &str,
    description: Option<&str>,
    ranking_id: &str,
    reward: i64,
) -> Result<DebateRow, ApiError> {
    let reward = validate_reward(reward)?;
    let tx = conn.transaction()?;
    require_author(&tx, ranking_id, creator_id)?;

    debit(&tx, creator_id, reward)?;
    let id = new_id();
    tx.execute(
        "INSERT INTO debates (id, title, description, creator_id, creator_ranking_id, reward, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, title, description, creator_id, ranking_id, reward, DebateStatus::Open.as_str(), Utc::now()],
    )?;
    log_transaction(
        &tx,
        creator_id,
        TransactionKind::DebateCreate,
        -reward,
        &format!("Debate stake: {}", title),
    )?;
    tx.commit()?;

    require_debate(conn, &id)
}

/// Accept an open debate with one of the challenger's own rankings
pub fn challenge_debate(
    conn: &mut Connection,
    id: &str,
    challenger_id: &str,
    ranking_id: &str,
) -> Result<DebateRow, ApiError> {
    let tx = conn.transaction()?;
    let debate = require_debate(&tx, id)?;
    let status = debate.status.challenge()?;
    if debate.creator.id == challenger_id {
        return Err(ApiError::bad_request("You cannot challenge your own debate"));
    }
    require_author(&tx, ranking_id, challenger_id)?;

    tx.execute(
        "UPDATE debates SET challenger_id = ?2, challenger_ranking_id = ?3, status = ?4, started_at = ?5
         WHERE id = ?1",
        params![id, challenger_id, ranking_id, status.as_str(), Utc::now()],
    )?;
    create_notification(
        &tx,
        &debate.creator.id,
        NotificationKind::DebateChallenge,
        "Your debate was challenged",
        &format!("\"{}\" is now open for voting", debate.title),
        Some(&format!("/debates/{}", id)),
    )?;
    tx.commit()?;

    require_debate(conn, id)
}

/// Cast the caller's single vote in an active debate
pub fn vote(conn: &mut Connection, id: &str, user_id: &str, side: DebateSide) -> Result<DebateRow, ApiError> {
    let tx = conn.transaction()?;
    let debate = require_debate(&tx, id)?;
    debate.status.ensure_voting()?;

    let already: bool = tx
        .query_row(
            "SELECT 1 FROM debate_votes WHERE debate_id = ? AND user_id = ?",
            params![id, user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if already {
        return Err(ApiError::bad_request("You have already voted in this debate"));
    }

    tx.execute(
        "INSERT INTO debate_votes (debate_id, user_id, vote_for, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, side.as_str(), Utc::now()],
    )?;
    let column = match side {
        DebateSide::Creator => "creator_votes",
        DebateSide::Challenger => "challenger_votes",
    };
    tx.execute(
        &format!("UPDATE debates SET {col} = {col} + 1 WHERE id = ?", col = column),
        [id],
    )?;
    tx.commit()?;

    require_debate(conn, id)
}

/// End an active debate and settle it
///
/// The side with strictly more votes wins twice the stake and the win and
/// loss counters move. A tie ends the debate with no winner and no payout.
pub fn end_debate(conn: &mut Connection, id: &str, caller_id: &str) -> Result<DebateRow, ApiError> {
    let tx = conn.transaction()?;
    let debate = require_debate(&tx, id)?;
    if !debate.is_participant(caller_id) {
        return Err(ApiError::Forbidden("Only participants can end a debate".into()));
    }
    let status = debate.status.end()?;

    let winner = decide_winner(debate.creator_votes, debate.challenger_votes);
    let winner_id = winner.and_then(|side| debate.side_user(side)).map(str::to_string);
    let loser_id = winner
        .map(|side| match side {
            DebateSide::Creator => DebateSide::Challenger,
            DebateSide::Challenger => DebateSide::Creator,
        })
        .and_then(|side| debate.side_user(side))
        .map(str::to_string);

    tx.execute(
        "UPDATE debates SET status = ?2, winner_id = ?3, ended_at = ?4 WHERE id = ?1",
        params![id, status.as_str(), winner_id, Utc::now()],
    )?;

    if let Some(ref winner_id) = winner_id {
        let payout = winner_payout(debate.reward);
        credit(&tx, winner_id, payout)?;
        log_transaction(
            &tx,
            winner_id,
            TransactionKind::DebateWin,
            payout,
            &format!("Won debate: {}", debate.title),
        )?;
        bump_counter(&tx, winner_id, UserCounter::BattleWins, 1)?;
    }
    if let Some(ref loser_id) = loser_id {
        bump_counter(&tx, loser_id, UserCounter::BattleLosses, 1)?;
    }
    tx.commit()?;

    info!(debate = %id, winner = ?winner_id, "Debate ended");
    require_debate(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::economy::{ensure_wallet, list_transactions};
    use crate::db::rankings::create_ranking;
    use crate::db::rankings::tests::input;
    use crate::db::social::list_notifications;
    use crate::db::users::require_user;
    use crate::db::users::tests::{conn, user};

    struct Arena {
        conn: Connection,
        creator: String,
        challenger: String,
        debate: String,
    }

    fn arena() -> Arena {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        credit(&conn, &ada.id, 150).unwrap();
        let a = create_ranking(&mut conn, &ada.id, &input("Ada's list", 2)).unwrap();
        let b = create_ranking(&mut conn, &bob.id, &input("Bob's list", 2)).unwrap();

        let debate = create_debate(&mut conn, &ada.id, "Whose list?", None, &a.ranking.id, 100).unwrap();
        assert_eq!(debate.status, DebateStatus::Open);
        challenge_debate(&mut conn, &debate.id, &bob.id, &b.ranking.id).unwrap();

        Arena {
            conn,
            creator: ada.id,
            challenger: bob.id,
            debate: debate.id,
        }
    }

    #[test]
    fn test_create_escrows_reward() {
        let arena = arena();
        assert_eq!(ensure_wallet(&arena.conn, &arena.creator).unwrap().balance, 50);
        let log = list_transactions(&arena.conn, &arena.creator, 50).unwrap();
        assert_eq!(log[0].kind, "DEBATE_CREATE");
        assert_eq!(log[0].amount, -100);
        assert_eq!(
            list_notifications(&arena.conn, &arena.creator).unwrap().notifications[0].kind,
            "DEBATE_CHALLENGE"
        );
    }

    #[test]
    fn test_create_requires_balance_and_ownership() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        let a = create_ranking(&mut conn, &ada.id, &input("Ada's list", 2)).unwrap();

        assert!(matches!(
            create_debate(&mut conn, &ada.id, "Broke", None, &a.ranking.id, 100),
            Err(ApiError::BadRequest(_))
        ));
        credit(&conn, &bob.id, 500).unwrap();
        assert!(matches!(
            create_debate(&mut conn, &bob.id, "Not mine", None, &a.ranking.id, 100),
            Err(ApiError::Forbidden(_))
        ));
        assert!(list_debates(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn test_winner_takes_double() {
        let mut arena = arena();
        let carol = user(&arena.conn, "carol");
        let dave = user(&arena.conn, "dave");
        let id = arena.debate.clone();

        vote(&mut arena.conn, &id, &carol.id, DebateSide::Challenger).unwrap();
        vote(&mut arena.conn, &id, &dave.id, DebateSide::Challenger).unwrap();
        assert!(vote(&mut arena.conn, &id, &dave.id, DebateSide::Creator).is_err());

        let ended = end_debate(&mut arena.conn, &id, &arena.creator).unwrap();
        assert_eq!(ended.status, DebateStatus::Ended);
        assert_eq!(ended.winner_id.as_deref(), Some(arena.challenger.as_str()));
        assert_eq!(ensure_wallet(&arena.conn, &arena.challenger).unwrap().balance, 200);
        assert_eq!(require_user(&arena.conn, &arena.challenger).unwrap().battle_wins, 1);
        assert_eq!(require_user(&arena.conn, &arena.creator).unwrap().battle_losses, 1);

        assert!(end_debate(&mut arena.conn, &id, &arena.creator).is_err());
    }

    #[test]
    fn test_tie_pays_nobody() {
        let mut arena = arena();
        let id = arena.debate.clone();
        let ended = end_debate(&mut arena.conn, &id, &arena.challenger).unwrap();
        assert!(ended.winner_id.is_none());
        assert_eq!(ensure_wallet(&arena.conn, &arena.challenger).unwrap().balance, 0);
        assert_eq!(require_user(&arena.conn, &arena.creator).unwrap().battle_losses, 0);
    }

    #[test]
    fn test_only_participants_end() {
        let mut arena = arena();
        let carol = user(&arena.conn, "carol");
        let id = arena.debate.clone();
        assert!(matches!(
            end_debate(&mut arena.conn, &id, &carol.id),
            Err(ApiError::Forbidden(_))
        ));
        assert_eq!(list_debates(&arena.conn, Some(DebateStatus::Active)).unwrap().len(), 1);
    }
}
