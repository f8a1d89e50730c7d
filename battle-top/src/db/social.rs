//! Subscriptions, notifications, ranking collaborators and donations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::new_id;
use super::rankings::{require_author, require_ranking, set_collaborative};
use super::users::{require_user, summary_columns, UserSummary};
use crate::error::ApiError;

/// Notification kinds written by other operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewSubscriber,
    CollaborationInvite,
    DebateChallenge,
    Donation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewSubscriber => "NEW_SUBSCRIBER",
            NotificationKind::CollaborationInvite => "COLLABORATION_INVITE",
            NotificationKind::DebateChallenge => "DEBATE_CHALLENGE",
            NotificationKind::Donation => "DONATION",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Subscriptions

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionToggle {
    pub subscribed: bool,
    pub subscriber_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub subscriber_count: i64,
    pub is_subscribed: bool,
}

/// A user on the other end of a subscription
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
    #[serde(flatten)]
    pub user: UserSummary,
    pub subscribed_at: DateTime<Utc>,
}

pub fn subscriber_count(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE target_id = ?",
        [user_id],
        |row| row.get(0),
    )?)
}

pub fn subscription_count(conn: &Connection, user_id: &str) -> Result<i64, ApiError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = ?",
        [user_id],
        |row| row.get(0),
    )?)
}

pub fn is_subscribed(conn: &Connection, subscriber_id: &str, target_id: &str) -> Result<bool, ApiError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM subscriptions WHERE subscriber_id = ? AND target_id = ?",
            params![subscriber_id, target_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

/// Subscribe to `target_id`, or unsubscribe if already subscribed
pub fn toggle_subscription(
    conn: &mut Connection,
    subscriber_id: &str,
    target_id: &str,
) -> Result<SubscriptionToggle, ApiError> {
    if subscriber_id == target_id {
        return Err(ApiError::bad_request("You cannot subscribe to yourself"));
    }

    let tx = conn.transaction()?;
    require_user(&tx, target_id)?;

    let removed = tx.execute(
        "DELETE FROM subscriptions WHERE subscriber_id = ? AND target_id = ?",
        params![subscriber_id, target_id],
    )?;
    let subscribed = if removed > 0 {
        false
    } else {
        tx.execute(
            "INSERT INTO subscriptions (subscriber_id, target_id, created_at) VALUES (?1, ?2, ?3)",
            params![subscriber_id, target_id, Utc::now()],
        )?;
        let subscriber = require_user(&tx, subscriber_id)?;
        create_notification(
            &tx,
            target_id,
            NotificationKind::NewSubscriber,
            "New subscriber",
            &format!("{} subscribed to you", subscriber.name),
            Some(&format!("/users/{}", subscriber_id)),
        )?;
        true
    };
    let count = subscriber_count(&tx, target_id)?;
    tx.commit()?;

    Ok(SubscriptionToggle {
        subscribed,
        subscriber_count: count,
    })
}

pub fn subscription_status(
    conn: &Connection,
    target_id: &str,
    viewer: Option<&str>,
) -> Result<SubscriptionStatus, ApiError> {
    let is_subscribed = match viewer {
        Some(viewer) => is_subscribed(conn, viewer, target_id)?,
        None => false,
    };
    Ok(SubscriptionStatus {
        subscriber_count: subscriber_count(conn, target_id)?,
        is_subscribed,
    })
}

fn list_subscription_side(conn: &Connection, sql: &str, user_id: &str) -> Result<Vec<SubscriptionEntry>, ApiError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(SubscriptionEntry {
                user: UserSummary::from_prefixed(row, "u_")?,
                subscribed_at: row.get("created_at")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Users subscribed to `user_id`, newest first
pub fn list_subscribers(conn: &Connection, user_id: &str) -> Result<Vec<SubscriptionEntry>, ApiError> {
    let sql = format!(
        "SELECT {}, s.created_at FROM subscriptions s JOIN users u ON u.id = s.subscriber_id
         WHERE s.target_id = ? ORDER BY s.created_at DESC",
        summary_columns("u", "u_")
    );
    list_subscription_side(conn, &sql, user_id)
}

/// Users `user_id` is subscribed to, newest first
pub fn list_subscriptions(conn: &Connection, user_id: &str) -> Result<Vec<SubscriptionEntry>, ApiError> {
    let sql = format!(
        "SELECT {}, s.created_at FROM subscriptions s JOIN users u ON u.id = s.target_id
         WHERE s.subscriber_id = ? ORDER BY s.created_at DESC",
        summary_columns("u", "u_")
    );
    list_subscription_side(conn, &sql, user_id)
}

// Notifications

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRow {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<NotificationRow>,
    pub unread_count: i64,
}

/// Notifications returned per listing
pub const NOTIFICATION_PAGE_SIZE: i64 = 50;

pub fn create_notification(
    conn: &Connection,
    user_id: &str,
    kind: NotificationKind,
    title: &str,
    content: &str,
    link: Option<&str>,
) -> Result<(), ApiError> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, title, content, link, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![new_id(), user_id, kind.as_str(), title, content, link, Utc::now()],
    )?;
    Ok(())
}

pub fn list_notifications(conn: &Connection, user_id: &str) -> Result<NotificationList, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, title, content, link, is_read, created_at FROM notifications
         WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )?;
    let notifications = stmt
        .query_map(params![user_id, NOTIFICATION_PAGE_SIZE], |row| {
            Ok(NotificationRow {
                id: row.get(0)?,
                kind: row.get(1)?,
                title: row.get(2)?,
                content: row.get(3)?,
                link: row.get(4)?,
                is_read: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let unread_count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(NotificationList {
        notifications,
        unread_count,
    })
}

/// Mark one of the caller's notifications read
pub fn mark_notification_read(conn: &Connection, id: &str, user_id: &str) -> Result<(), ApiError> {
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?",
        params![id, user_id],
    )?;
    if changed == 0 {
        return Err(ApiError::not_found("Notification"));
    }
    Ok(())
}

// Collaborators

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRow {
    pub ranking_id: String,
    pub role: String,
    pub invited_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub user: UserSummary,
}

impl CollaboratorRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            ranking_id: row.get("ranking_id")?,
            role: row.get("role")?,
            invited_at: row.get("invited_at")?,
            accepted_at: row.get("accepted_at")?,
            user: UserSummary::from_prefixed(row, "u_")?,
        })
    }
}

/// Collaborator role when the inviter names none
pub const DEFAULT_COLLABORATOR_ROLE: &str = "editor";

fn collaborator_select() -> String {
    format!(
        "SELECT rc.ranking_id, rc.role, rc.invited_at, rc.accepted_at, {}
         FROM ranking_collaborators rc JOIN users u ON u.id = rc.user_id",
        summary_columns("u", "u_")
    )
}

fn get_collaborator(conn: &Connection, ranking_id: &str, user_id: &str) -> Result<Option<CollaboratorRow>, ApiError> {
    let sql = format!("{} WHERE rc.ranking_id = ? AND rc.user_id = ?", collaborator_select());
    Ok(conn
        .query_row(&sql, params![ranking_id, user_id], |row| CollaboratorRow::from_row(row))
        .optional()?)
}

pub fn list_collaborators(conn: &Connection, ranking_id: &str) -> Result<Vec<CollaboratorRow>, ApiError> {
    require_ranking(conn, ranking_id)?;
    let sql = format!("{} WHERE rc.ranking_id = ? ORDER BY rc.invited_at ASC", collaborator_select());
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([ranking_id], |row| CollaboratorRow::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Author invites `invitee_id`; the ranking becomes collaborative
pub fn invite_collaborator(
    conn: &mut Connection,
    ranking_id: &str,
    author_id: &str,
    invitee_id: &str,
    role: Option<&str>,
) -> Result<CollaboratorRow, ApiError> {
    let tx = conn.transaction()?;
    let ranking = require_author(&tx, ranking_id, author_id)?;
    if invitee_id == author_id {
        return Err(ApiError::bad_request("You cannot invite yourself"));
    }
    require_user(&tx, invitee_id)?;
    if get_collaborator(&tx, ranking_id, invitee_id)?.is_some() {
        return Err(ApiError::Conflict("User is already a collaborator".into()));
    }

    tx.execute(
        "INSERT INTO ranking_collaborators (ranking_id, user_id, role, invited_at) VALUES (?1, ?2, ?3, ?4)",
        params![ranking_id, invitee_id, role.unwrap_or(DEFAULT_COLLABORATOR_ROLE), Utc::now()],
    )?;
    set_collaborative(&tx, ranking_id)?;
    create_notification(
        &tx,
        invitee_id,
        NotificationKind::CollaborationInvite,
        "Collaboration invite",
        &format!("You were invited to edit \"{}\"", ranking.title),
        Some(&format!("/rankings/{}", ranking_id)),
    )?;
    let row = get_collaborator(&tx, ranking_id, invitee_id)?
        .ok_or_else(|| ApiError::Internal("Collaborator missing after insert".into()))?;
    tx.commit()?;

    Ok(row)
}

/// Invitee accepts a pending invite
pub fn accept_invite(conn: &Connection, ranking_id: &str, user_id: &str) -> Result<CollaboratorRow, ApiError> {
    let invite = get_collaborator(conn, ranking_id, user_id)?.ok_or_else(|| ApiError::not_found("Invite"))?;
    if invite.accepted_at.is_some() {
        return Ok(invite);
    }
    conn.execute(
        "UPDATE ranking_collaborators SET accepted_at = ?3 WHERE ranking_id = ?1 AND user_id = ?2",
        params![ranking_id, user_id, Utc::now()],
    )?;
    get_collaborator(conn, ranking_id, user_id)?.ok_or_else(|| ApiError::not_found("Invite"))
}

/// Author removes a collaborator or pending invite
pub fn remove_collaborator(conn: &Connection, ranking_id: &str, author_id: &str, user_id: &str) -> Result<(), ApiError> {
    require_author(conn, ranking_id, author_id)?;
    let removed = conn.execute(
        "DELETE FROM ranking_collaborators WHERE ranking_id = ? AND user_id = ?",
        params![ranking_id, user_id],
    )?;
    if removed == 0 {
        return Err(ApiError::not_found("Collaborator"));
    }
    Ok(())
}

// Donations

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationDirection {
    #[default]
    Received,
    Sent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRow {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub ranking_id: Option<String>,
    pub amount: f64,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    /// The user on the other side of the donation
    pub counterpart: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationList {
    pub donations: Vec<DonationRow>,
    pub total_received: f64,
}

/// Status of a donation awaiting payment settlement
pub const DONATION_PENDING: &str = "pending";
pub const DONATION_COMPLETED: &str = "completed";

/// Record a pending donation from `from_id` to `to_id`
pub fn create_donation(
    conn: &Connection,
    from_id: &str,
    to_id: &str,
    amount: f64,
    message: Option<&str>,
    ranking_id: Option<&str>,
) -> Result<DonationRow, ApiError> {
    if from_id == to_id {
        return Err(ApiError::bad_request("You cannot donate to yourself"));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::bad_request("Donation amount must be greater than zero"));
    }
    require_user(conn, to_id)?;
    if let Some(ranking_id) = ranking_id {
        require_ranking(conn, ranking_id)?;
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO donations (id, from_user_id, to_user_id, ranking_id, amount, message, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, from_id, to_id, ranking_id, amount, message, DONATION_PENDING, Utc::now()],
    )?;

    let sql = format!(
        "SELECT d.*, {} FROM donations d JOIN users u ON u.id = d.to_user_id WHERE d.id = ?",
        summary_columns("u", "u_")
    );
    Ok(conn.query_row(&sql, [&id], |row| donation_from_row(row))?)
}

fn donation_from_row(row: &Row) -> Result<DonationRow, rusqlite::Error> {
    Ok(DonationRow {
        id: row.get("id")?,
        from_user_id: row.get("from_user_id")?,
        to_user_id: row.get("to_user_id")?,
        ranking_id: row.get("ranking_id")?,
        amount: row.get("amount")?,
        message: row.get("message")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        counterpart: UserSummary::from_prefixed(row, "u_")?,
    })
}

/// Donations sent or received by `user_id`, with the completed total received
pub fn list_donations(conn: &Connection, user_id: &str, direction: DonationDirection) -> Result<DonationList, ApiError> {
    let (own, other) = match direction {
        DonationDirection::Received => ("to_user_id", "from_user_id"),
        DonationDirection::Sent => ("from_user_id", "to_user_id"),
    };
    let sql = format!(
        "SELECT d.*, {cols} FROM donations d JOIN users u ON u.id = d.{other}
         WHERE d.{own} = ? ORDER BY d.created_at DESC",
        cols = summary_columns("u", "u_"),
        other = other,
        own = own
    );
    let mut stmt = conn.prepare(&sql)?;
    let donations = stmt
        .query_map([user_id], |row| donation_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;

    let total_received: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM donations WHERE to_user_id = ? AND status = ?",
        params![user_id, DONATION_COMPLETED],
        |row| row.get(0),
    )?;

    Ok(DonationList {
        donations,
        total_received,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::rankings::create_ranking;
    use crate::db::rankings::tests::input;
    use crate::db::users::tests::{conn, user};

    #[test]
    fn test_subscription_toggle() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");

        let on = toggle_subscription(&mut conn, &bob.id, &ada.id).unwrap();
        assert!(on.subscribed);
        assert_eq!(on.subscriber_count, 1);
        assert!(subscription_status(&conn, &ada.id, Some(&bob.id)).unwrap().is_subscribed);
        assert_eq!(list_subscribers(&conn, &ada.id).unwrap()[0].user.id, bob.id);
        assert_eq!(list_subscriptions(&conn, &bob.id).unwrap()[0].user.id, ada.id);
        assert_eq!(list_notifications(&conn, &ada.id).unwrap().unread_count, 1);

        let off = toggle_subscription(&mut conn, &bob.id, &ada.id).unwrap();
        assert!(!off.subscribed);
        assert_eq!(off.subscriber_count, 0);

        assert!(matches!(
            toggle_subscription(&mut conn, &ada.id, &ada.id),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_notifications_read() {
        let conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        create_notification(&conn, &ada.id, NotificationKind::Donation, "Hi", "There", None).unwrap();

        let list = list_notifications(&conn, &ada.id).unwrap();
        let id = list.notifications[0].id.clone();
        assert!(matches!(
            mark_notification_read(&conn, &id, &bob.id),
            Err(ApiError::NotFound(_))
        ));
        mark_notification_read(&conn, &id, &ada.id).unwrap();
        assert_eq!(list_notifications(&conn, &ada.id).unwrap().unread_count, 0);
    }

    #[test]
    fn test_collaboration_flow() {
        let mut conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");
        let ranking = create_ranking(&mut conn, &ada.id, &input("Best editors", 2)).unwrap();
        let id = ranking.ranking.id;

        let invite = invite_collaborator(&mut conn, &id, &ada.id, &bob.id, None).unwrap();
        assert_eq!(invite.role, DEFAULT_COLLABORATOR_ROLE);
        assert!(invite.accepted_at.is_none());
        assert!(require_ranking(&conn, &id).unwrap().is_collaborative);
        assert_eq!(list_notifications(&conn, &bob.id).unwrap().notifications[0].kind, "COLLABORATION_INVITE");

        assert!(matches!(
            invite_collaborator(&mut conn, &id, &ada.id, &bob.id, None),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            invite_collaborator(&mut conn, &id, &bob.id, &ada.id, None),
            Err(ApiError::Forbidden(_))
        ));

        assert!(accept_invite(&conn, &id, &bob.id).unwrap().accepted_at.is_some());
        assert_eq!(list_collaborators(&conn, &id).unwrap().len(), 1);

        remove_collaborator(&conn, &id, &ada.id, &bob.id).unwrap();
        assert!(list_collaborators(&conn, &id).unwrap().is_empty());
    }

    #[test]
    fn test_donations() {
        let conn = conn();
        let ada = user(&conn, "ada");
        let bob = user(&conn, "bob");

        let donation = create_donation(&conn, &bob.id, &ada.id, 5.5, Some("thanks"), None).unwrap();
        assert_eq!(donation.status, DONATION_PENDING);
        assert!(create_donation(&conn, &ada.id, &ada.id, 1.0, None, None).is_err());
        assert!(create_donation(&conn, &bob.id, &ada.id, 0.0, None, None).is_err());

        let received = list_donations(&conn, &ada.id, DonationDirection::Received).unwrap();
        assert_eq!(received.donations.len(), 1);
        assert_eq!(received.donations[0].counterpart.id, bob.id);
        // Pending donations do not count toward the total
        assert_eq!(received.total_received, 0.0);

        conn.execute("UPDATE donations SET status = 'completed'", []).unwrap();
        let received = list_donations(&conn, &ada.id, DonationDirection::Received).unwrap();
        assert_eq!(received.total_received, 5.5);

        let sent = list_donations(&conn, &bob.id, DonationDirection::Sent).unwrap();
        assert_eq!(sent.donations[0].counterpart.id, ada.id);
    }
}
