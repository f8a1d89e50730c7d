//! Wallet, shop, VIP, debates, daily tasks and achievements end to end

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::app;

#[tokio::test]
async fn test_recharge_levels_up() {
    let app = app();
    let (_, token) = app.signup("ada").await;

    let body = app.recharge(&token, 68.0).await;
    let data = &body["data"];
    assert_eq!(data["battleCoins"], 680);
    assert_eq!(data["expGained"], 6800);
    assert_eq!(data["newLevel"], 5);
    assert_eq!(data["levelUp"], true);
    assert_eq!(data["levelName"], "Lance Sergeant");
    assert_eq!(data["chatFrame"], "silver");
    assert_eq!(data["wallet"]["balance"], 680);

    let (_, body) = app.get("/api/wallet", Some(&token)).await;
    assert_eq!(body["data"]["level"], 5);
    assert_eq!(body["data"]["exp"], 6800);
    assert_eq!(body["data"]["totalRecharged"], 68.0);

    let (_, body) = app.get("/api/level", Some(&token)).await;
    assert_eq!(body["data"]["nextLevelExp"], 7500);
    assert_eq!(body["data"]["progressPercent"], 72);
    assert_eq!(body["data"]["unlocks"]["chatFrames"], json!(["bronze", "silver"]));

    let (_, body) = app.get("/api/wallet/transactions", Some(&token)).await;
    assert_eq!(body["data"][0]["type"], "RECHARGE");
    assert_eq!(body["data"][0]["amount"], 680);
}

#[tokio::test]
async fn test_recharge_rejects_non_positive() {
    let app = app();
    let (_, token) = app.signup("ada").await;

    let (status, _) = app.post("/api/wallet", Some(&token), json!({ "amount": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/api/wallet", Some(&token), json!({ "amount": -5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shop_purchase_and_insufficient_balance() {
    let app = app();
    let (_, token) = app.signup("ada").await;

    let (status, body) = app
        .post("/api/shop", Some(&token), json!({ "itemId": "highlight_comment", "quantity": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient battle coins");

    app.recharge(&token, 20.0).await;
    let (status, body) = app
        .post("/api/shop", Some(&token), json!({ "itemId": "highlight_comment", "quantity": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["cost"], 180);
    assert_eq!(body["data"]["balance"], 20);

    let (status, _) = app
        .post("/api/shop", Some(&token), json!({ "itemId": "golden_throne" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/shop", Some(&token)).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 4);
    assert_eq!(body["data"]["userItems"][0]["quantity"], 2);

    // Anonymous callers see the catalog only
    let (_, body) = app.get("/api/shop", None).await;
    assert_eq!(body["data"]["userItems"], json!([]));
}

#[tokio::test]
async fn test_vip_purchase() {
    let app = app();
    let (_, token) = app.signup("ada").await;

    let (_, body) = app.get("/api/vip", Some(&token)).await;
    assert_eq!(body["data"]["isActive"], false);
    assert_eq!(body["data"]["plans"].as_array().unwrap().len(), 4);

    let (status, _) = app.post("/api/vip", Some(&token), json!({ "planType": "MONTHLY" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.recharge(&token, 10.0).await;
    let (status, body) = app
        .post("/api/vip", Some(&token), json!({ "planType": "MONTHLY", "autoRenew": true }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["plan"], "MONTHLY");

    let (_, body) = app.get("/api/vip", Some(&token)).await;
    assert_eq!(body["data"]["isActive"], true);
    assert_eq!(body["data"]["remainingDays"], 30);

    let (status, _) = app.post("/api/vip", Some(&token), json!({ "planType": "FOREVER" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_debate_payout() {
    let app = app();
    let (creator, creator_token) = app.signup("creator").await;
    let (challenger, challenger_token) = app.signup("challenger").await;
    let (_, voter_token) = app.signup("voter").await;

    let creator_ranking = app.draft(&creator_token, "Creator's picks").await;
    let challenger_ranking = app.draft(&challenger_token, "Challenger's picks").await;

    // Stake must be covered
    let (status, _) = app
        .post(
            "/api/debates",
            Some(&creator_token),
            json!({ "title": "Whose list wins?", "rankingId": creator_ranking }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.recharge(&creator_token, 10.0).await;
    let (status, body) = app
        .post(
            "/api/debates",
            Some(&creator_token),
            json!({ "title": "Whose list wins?", "rankingId": creator_ranking }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["reward"], 100);
    assert_eq!(body["data"]["status"], "open");
    let debate = format!("/api/debates/{}", body["data"]["id"].as_str().unwrap());

    let (status, _) = app
        .post(&debate, Some(&creator_token), json!({ "action": "challenge", "rankingId": creator_ranking }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            &debate,
            Some(&challenger_token),
            json!({ "action": "challenge", "rankingId": challenger_ranking }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "active");

    let (status, _) = app
        .post(&debate, Some(&voter_token), json!({ "action": "vote", "voteFor": "creator" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post(&debate, Some(&voter_token), json!({ "action": "vote", "voteFor": "challenger" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&debate, Some(&voter_token), json!({ "action": "end" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&debate, Some(&challenger_token), json!({ "action": "end" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ended");
    assert_eq!(body["data"]["winnerId"], creator.as_str());

    let (_, body) = app.get("/api/wallet", Some(&creator_token)).await;
    assert_eq!(body["data"]["wallet"]["balance"], 200);

    let (_, body) = app.get(&format!("/api/users/{}", challenger), None).await;
    assert_eq!(body["data"]["battleLosses"], 1);

    let (_, body) = app.get("/api/leaderboard?type=battle", None).await;
    assert_eq!(body["data"]["users"][0]["id"], creator.as_str());
}

#[tokio::test]
async fn test_daily_checkin_claim() {
    let app = app();
    let (_, token) = app.signup("ada").await;

    let (_, body) = app.get("/api/tasks/daily", Some(&token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    let (status, body) = app
        .post("/api/tasks/daily", Some(&token), json!({ "taskId": "DAILY_CHECKIN", "action": "claim" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["reward"], 1);
    assert_eq!(body["data"]["dailyStreak"], 1);

    let (status, _) = app
        .post("/api/tasks/daily", Some(&token), json!({ "taskId": "DAILY_CHECKIN", "action": "claim" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Incomplete tasks cannot be claimed
    let (status, _) = app
        .post("/api/tasks/daily", Some(&token), json!({ "taskId": "LIKE_RANKING", "action": "claim" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/tasks/daily", Some(&token), json!({ "taskId": "LIKE_RANKING", "action": "progress" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["progress"], 1);
    assert_eq!(body["data"]["completed"], false);

    let (status, _) = app
        .post("/api/tasks/daily", Some(&token), json!({ "taskId": "NAP", "action": "progress" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_achievement_unlock() {
    let app = app();
    let (_, token) = app.signup("ada").await;

    let (status, _) = app
        .post("/api/achievements", Some(&token), json!({ "achievementId": "FIRST_RANKING" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = app.draft(&token, "First of many").await;
    app.post(&format!("/api/rankings/{}/publish", id), Some(&token), json!({}))
        .await;

    let (_, body) = app.get("/api/achievements", Some(&token)).await;
    let first = &body["data"][0];
    assert_eq!(first["type"], "FIRST_RANKING");
    assert_eq!(first["canUnlock"], true);

    let (status, body) = app
        .post("/api/achievements", Some(&token), json!({ "achievementId": "FIRST_RANKING" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["reward"], 5);
    assert_eq!(body["data"]["balance"], 5);

    let (status, _) = app
        .post("/api/achievements", Some(&token), json!({ "achievementId": "FIRST_RANKING" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
