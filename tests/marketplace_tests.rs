use auction_marketplace::alerts::commands::{
    handle_create_alert, handle_delete_alert, handle_list_alerts, CreateAlertCommand,
};
use auction_marketplace::auction::commands::{
    handle_cancel_auction, handle_delete_listing, handle_post_listing, CategoryChoice,
    PostListingCommand,
};
use auction_marketplace::auction::events::{AuctionEvent, ResolutionRecord};
use auction_marketplace::auction::lifecycle::{Lifecycle, Resolution};
use auction_marketplace::auction::model::{AuctionStatus, VehicleDetails};
use auction_marketplace::bidding::commands::{handle_place_bid, PlaceBidCommand};
use auction_marketplace::bidding::validator::BidRejection;
use auction_marketplace::error::AuctionError;
use auction_marketplace::identity::Actor;
use auction_marketplace::query;
use auction_marketplace::state::AppState;
use auction_marketplace::users::commands::{
    handle_action_logs, handle_change_role, handle_login, handle_register,
    handle_reset_password, ChangeRoleCommand, LoginCommand, RegisterCommand,
};
use auction_marketplace::users::model::{NewUser, Role, ACTION_CHANGE_ROLE, ACTION_RESET_PASSWORD};
use chrono::{DateTime, Duration, Utc};

/// Inserts a user directly, skipping password hashing
async fn user(state: &AppState, name: &str, role: Role) -> Actor {
    let user = state
        .store
        .insert_user(NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: String::new(),
            role,
        })
        .await
        .unwrap();
    Actor::new(user.id, role)
}

fn listing_cmd(title: &str, now: DateTime<Utc>) -> PostListingCommand {
    PostListingCommand {
        title: title.to_string(),
        description: "Runs well, one owner".to_string(),
        category: CategoryChoice::New {
            name: "Cars".to_string(),
            parent_id: None,
        },
        start_price: 100,
        min_increment: 10,
        min_price: 150,
        start_time: now - Duration::minutes(1),
        end_time: now + Duration::hours(1),
        vehicle: VehicleDetails::default(),
    }
}

async fn post(state: &AppState, seller: &Actor, title: &str, now: DateTime<Utc>) -> i64 {
    handle_post_listing(state, seller, listing_cmd(title, now), now)
        .await
        .unwrap()
        .listing
        .auction_id
}

fn bid(amount: i64, max_auto_bid: Option<i64>) -> PlaceBidCommand {
    PlaceBidCommand {
        bid_amount: amount,
        max_auto_bid,
    }
}

fn closed_events(events: &[AuctionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, AuctionEvent::AuctionClosed { .. }))
        .count()
}

#[tokio::test]
async fn test_proxy_bidding_walkthrough() {
    let (state, publisher) = AppState::in_memory();
    let now = Utc::now();
    let seller = user(&state, "seller", Role::Seller).await;
    let user1 = user(&state, "user1", Role::Buyer).await;
    let user2 = user(&state, "user2", Role::Buyer).await;
    let auction_id = post(&state, &seller, "1998 Civic", now).await;

    let first = handle_place_bid(&state, &user1, auction_id, bid(100, None), now)
        .await
        .unwrap();
    assert_eq!(first.current_price, 100);

    let second = handle_place_bid(&state, &user2, auction_id, bid(120, Some(200)), now)
        .await
        .unwrap();
    assert_eq!(second.current_price, 120);
    assert_eq!(second.highest_bidder_id, user2.user_id);

    let third = handle_place_bid(&state, &user1, auction_id, bid(130, None), now)
        .await
        .unwrap();
    assert_eq!(third.bid.bid_amount, 130);
    assert_eq!(third.auto_bids.len(), 1);
    assert!(third.auto_bids[0].is_auto);
    assert_eq!(third.auto_bids[0].user_id, user2.user_id);
    assert_eq!(third.current_price, 140);
    assert_eq!(third.highest_bidder_id, user2.user_id);

    // after the end time
    let end = now + Duration::hours(1);
    let late = handle_place_bid(&state, &user1, auction_id, bid(135, None), end + Duration::seconds(1))
        .await
        .unwrap_err();
    assert!(matches!(late, AuctionError::BidRejected(BidRejection::Closed)));
    assert_eq!(late.to_string(), "auction closed");

    let highest = query::handlers::get_highest_bid(&state, auction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(highest.bid_amount, 140);

    let detail = query::handlers::get_listing(&state, auction_id, end + Duration::seconds(2))
        .await
        .unwrap();
    assert_eq!(
        detail.listing.lifecycle,
        Lifecycle::Closed {
            resolution: Resolution::Unsold
        }
    );
    assert_eq!(detail.bids.len(), 4);
    let amounts: Vec<i64> = detail.bids.iter().map(|b| b.bid_amount).collect();
    assert_eq!(amounts, vec![140, 130, 120, 100]);

    let bid_events = publisher
        .events()
        .into_iter()
        .filter(|e| matches!(e, AuctionEvent::BidPlaced { .. }))
        .count();
    assert_eq!(bid_events, 4);
}

#[tokio::test]
async fn test_close_is_written_back_and_published_once() {
    let (state, publisher) = AppState::in_memory();
    let now = Utc::now();
    let seller = user(&state, "seller", Role::Seller).await;
    let buyer = user(&state, "buyer", Role::Buyer).await;
    let auction_id = post(&state, &seller, "Road bike", now).await;

    handle_place_bid(&state, &buyer, auction_id, bid(150, None), now)
        .await
        .unwrap();

    let later = now + Duration::hours(2);
    for _ in 0..3 {
        let detail = query::handlers::get_listing(&state, auction_id, later)
            .await
            .unwrap();
        assert_eq!(
            detail.listing.lifecycle,
            Lifecycle::Closed {
                resolution: Resolution::Sold {
                    winner_id: buyer.user_id,
                    price: 150
                }
            }
        );
        assert_eq!(detail.listing.minimum_next_bid, None);
    }

    let stored = state.store.find_listing(auction_id).await.unwrap().unwrap();
    assert_eq!(stored.auction.status, AuctionStatus::Closed);

    let events = publisher.events();
    assert_eq!(closed_events(&events), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        AuctionEvent::AuctionClosed {
            resolution: ResolutionRecord::Sold { price: 150, .. },
            ..
        }
    )));

    // an earlier clock cannot reopen it
    let views = query::handlers::get_all_listings(&state, now).await.unwrap();
    assert!(matches!(views[0].lifecycle, Lifecycle::Closed { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bidding() {
    let (state, _publisher) = AppState::in_memory();
    let now = Utc::now();
    let seller = user(&state, "seller", Role::Seller).await;
    let mut cmd = listing_cmd("Concurrent lot", now);
    cmd.start_price = 1000;
    cmd.min_increment = 1000;
    let auction_id = handle_post_listing(&state, &seller, cmd, now)
        .await
        .unwrap()
        .listing
        .auction_id;

    let mut buyers = Vec::new();
    for i in 0..50 {
        buyers.push(user(&state, &format!("buyer{}", i), Role::Buyer).await);
    }

    let mut handles = Vec::new();
    for (i, buyer) in buyers.into_iter().enumerate() {
        let state = state.clone();
        let amount = 1000 + i as i64 * 1000;
        handles.push(tokio::spawn(async move {
            handle_place_bid(&state, &buyer, auction_id, bid(amount, None), now).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(AuctionError::BidRejected(BidRejection::TooLow { .. })) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let history = query::handlers::get_bid_history(&state, auction_id)
        .await
        .unwrap();
    assert_eq!(history.len(), accepted);
    assert_eq!(history[0].bid_amount, 1000 + 49 * 1000);

    // commit order and amount order agree
    let mut by_id = history.clone();
    by_id.sort_by_key(|b| b.id);
    assert!(by_id.windows(2).all(|w| w[1].bid_amount >= w[0].bid_amount + 1000));

    let highest = query::handlers::get_highest_bid(&state, auction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(highest.bid_amount, 50_000);
}

#[tokio::test]
async fn test_withdrawal_rules() {
    let (state, publisher) = AppState::in_memory();
    let now = Utc::now();
    let seller = user(&state, "seller", Role::Seller).await;
    let other = user(&state, "other", Role::Seller).await;
    let admin = user(&state, "admin", Role::Admin).await;
    let buyer = user(&state, "buyer", Role::Buyer).await;

    // bids block both cancel and delete
    let with_bids = post(&state, &seller, "Guitar", now).await;
    handle_place_bid(&state, &buyer, with_bids, bid(100, None), now)
        .await
        .unwrap();
    let err = handle_cancel_auction(&state, &seller, with_bids, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Conflict(_)));
    let err = handle_delete_listing(&state, &seller, with_bids, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Conflict(_)));

    // only the seller or an admin may cancel
    let cancellable = post(&state, &seller, "Amplifier", now).await;
    let err = handle_cancel_auction(&state, &other, cancellable, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));
    let view = handle_cancel_auction(&state, &admin, cancellable, now)
        .await
        .unwrap();
    assert_eq!(view.lifecycle, Lifecycle::Cancelled);
    let err = handle_place_bid(&state, &buyer, cancellable, bid(100, None), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::BidRejected(BidRejection::Cancelled)));

    // delete removes auction and item together
    let deletable = post(&state, &seller, "Pedal board", now).await;
    let err = handle_delete_listing(&state, &admin, deletable, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));
    handle_delete_listing(&state, &seller, deletable, now)
        .await
        .unwrap();
    let err = query::handlers::get_listing(&state, deletable, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::NotFound(_)));

    let events = publisher.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, AuctionEvent::AuctionCancelled { cancelled_by, .. } if *cancelled_by == admin.user_id)));
    assert!(events
        .iter()
        .any(|e| matches!(e, AuctionEvent::ListingDeleted { auction_id, .. } if *auction_id == deletable)));
}

#[tokio::test]
async fn test_bidding_permissions() {
    let (state, _publisher) = AppState::in_memory();
    let now = Utc::now();
    let seller = user(&state, "seller", Role::Seller).await;
    let rep = user(&state, "rep", Role::Rep).await;
    let auction_id = post(&state, &seller, "Camera", now).await;

    let err = handle_place_bid(&state, &seller, auction_id, bid(100, None), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    let err = handle_place_bid(&state, &rep, auction_id, bid(100, None), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    let err = handle_post_listing(&state, &rep, listing_cmd("Lens", now), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));
}

#[tokio::test]
async fn test_alert_fan_out() {
    let (state, publisher) = AppState::in_memory();
    let now = Utc::now();
    let seller = user(&state, "seller", Role::Seller).await;
    let fan = user(&state, "fan", Role::Buyer).await;
    let other = user(&state, "other", Role::Buyer).await;

    let alert = handle_create_alert(
        &state,
        &fan,
        CreateAlertCommand {
            keyword: "  Mustang ".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(alert.keyword, "Mustang");
    handle_create_alert(
        &state,
        &other,
        CreateAlertCommand {
            keyword: "tractor".to_string(),
        },
    )
    .await
    .unwrap();

    let posted = handle_post_listing(&state, &seller, listing_cmd("1967 Ford MUSTANG", now), now)
        .await
        .unwrap();
    assert_eq!(posted.alert_recipients, vec![fan.user_id]);
    assert!(publisher.events().iter().any(|e| matches!(
        e,
        AuctionEvent::AlertsMatched { user_ids, .. } if user_ids == &vec![fan.user_id]
    )));

    let err = handle_delete_alert(&state, &other, alert.id).await.unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));
    handle_delete_alert(&state, &fan, alert.id).await.unwrap();
    assert!(handle_list_alerts(&state, &fan).await.unwrap().is_empty());

    let err = handle_create_alert(
        &state,
        &fan,
        CreateAlertCommand {
            keyword: "   ".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuctionError::Validation(_)));
}

#[tokio::test]
async fn test_rep_account_operations() {
    let (state, _publisher) = AppState::in_memory();
    let now = Utc::now();
    let rep = user(&state, "support", Role::Rep).await;
    let registered = handle_register(
        &state,
        RegisterCommand {
            username: "dana".to_string(),
            email: "dana@example.com".to_string(),
            password: "initial-password".to_string(),
            role: Role::Buyer,
        },
    )
    .await
    .unwrap();
    let customer = Actor::new(registered.id, Role::Buyer);

    let err = handle_reset_password(&state, &customer, registered.id, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    let reset = handle_reset_password(&state, &rep, registered.id, now)
        .await
        .unwrap();
    assert_eq!(reset.log.action_type, ACTION_RESET_PASSWORD);
    assert_eq!(reset.log.target_user_id, Some(registered.id));

    let err = handle_login(
        &state,
        LoginCommand {
            username: "dana".to_string(),
            password: "initial-password".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuctionError::InvalidCredentials));
    let login = handle_login(
        &state,
        LoginCommand {
            username: "DANA".to_string(),
            password: reset.temporary_password.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(login.user_id, registered.id);

    let log = handle_change_role(
        &state,
        &rep,
        registered.id,
        ChangeRoleCommand { role: Role::Seller },
        now + Duration::seconds(1),
    )
    .await
    .unwrap();
    assert_eq!(log.action_type, ACTION_CHANGE_ROLE);
    let updated = state.store.find_user(registered.id).await.unwrap().unwrap();
    assert_eq!(updated.role, Role::Seller);

    let err = handle_change_role(
        &state,
        &rep,
        rep.user_id,
        ChangeRoleCommand { role: Role::Admin },
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    let logs = handle_action_logs(&state, &rep, Some(registered.id))
        .await
        .unwrap();
    let kinds: Vec<&str> = logs.iter().map(|l| l.action_type.as_str()).collect();
    assert_eq!(kinds, vec![ACTION_CHANGE_ROLE, ACTION_RESET_PASSWORD]);

    let err = handle_action_logs(&state, &customer, None).await.unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));
}

#[tokio::test]
async fn test_registration_rules() {
    let (state, _publisher) = AppState::in_memory();
    let register = |username: &str, role: Role| RegisterCommand {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "long-enough".to_string(),
        role,
    };

    let err = handle_register(&state, register("boss", Role::Admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Forbidden(_)));

    handle_register(&state, register("casey", Role::Seller))
        .await
        .unwrap();
    let err = handle_register(&state, register("Casey", Role::Buyer))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::Conflict(_)));

    let mut short = register("jo", Role::Buyer);
    short.password = "short".to_string();
    let err = handle_register(&state, short).await.unwrap_err();
    assert!(matches!(err, AuctionError::Validation(_)));
}

#[tokio::test]
async fn test_vehicle_fields_at_column_width() {
    let (state, _publisher) = AppState::in_memory();
    let seller = user(&state, "seller", Role::Seller).await;
    let now = Utc::now();

    let mut cmd = listing_cmd("Long make", now);
    cmd.vehicle.vehicle_make = Some("m".repeat(100));
    cmd.vehicle.vehicle_model = Some("x".repeat(100));
    let posted = handle_post_listing(&state, &seller, cmd, now).await.unwrap();
    let vehicle = &posted.listing.item.vehicle;
    assert_eq!(vehicle.vehicle_make.as_deref().map(str::len), Some(100));
    assert_eq!(vehicle.vehicle_model.as_deref().map(str::len), Some(100));

    let mut cmd = listing_cmd("Longer make", now);
    cmd.vehicle.vehicle_make = Some("m".repeat(101));
    let err = handle_post_listing(&state, &seller, cmd, now).await.unwrap_err();
    assert!(matches!(err, AuctionError::Validation(_)));
}
