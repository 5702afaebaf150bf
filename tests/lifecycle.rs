mod common;

use burnbin::clock::Clock;
use burnbin::expiry::is_live;
use burnbin::repository::PasteRepository;
use burnbin::{NewPaste, PasteId, StoreError};
use chrono::Duration;
use tokio::time::Instant;

use common::{deadline, store};

#[tokio::test]
async fn round_trip_is_repeatable() {
    let store = store().await;
    let id = store
        .service
        .create(NewPaste::new("X", "txt"), deadline())
        .await
        .unwrap();

    for _ in 0..2 {
        let paste = store.service.get(&id.to_string(), deadline()).await.unwrap();
        assert_eq!(paste.id, id);
        assert_eq!(paste.content, "X");
        assert_eq!(paste.language, "txt");
        assert!(!paste.burn);
        assert_eq!(paste.expiry_at, None);
        assert_eq!(paste.created_at, store.clock.now());
    }
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let store = store().await;
    let unknown = PasteId::generate().to_string();

    for id in [unknown.as_str(), "", "not-an-id", "'; DROP TABLE paste; --"] {
        assert!(matches!(
            store.service.get(id, deadline()).await,
            Err(StoreError::NotFound)
        ));
    }
}

#[tokio::test]
async fn expiry_at_creation_time_is_immediately_gone() {
    let store = store().await;
    let now = store.service.now();
    let id = store
        .service
        .create(NewPaste::new("gone", "txt").expiry_at(now), deadline())
        .await
        .unwrap();

    assert!(matches!(
        store.service.get(&id.to_string(), deadline()).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn hour_long_expiry_boundary() {
    let store = store().await;
    let now = store.service.now();
    let id = store
        .service
        .create(
            NewPaste::new("soon gone", "txt").expiry_at(now + Duration::hours(1)),
            deadline(),
        )
        .await
        .unwrap()
        .to_string();

    store.clock.set(now + Duration::minutes(59));
    let paste = store.service.get(&id, deadline()).await.unwrap();
    assert_eq!(paste.content, "soon gone");

    store.clock.set(now + Duration::minutes(61));
    assert!(matches!(
        store.service.get(&id, deadline()).await,
        Err(StoreError::NotFound)
    ));

    // the expired read also reclaimed the row
    assert_eq!(store.repo.count(deadline()).await.unwrap(), 0);
}

#[tokio::test]
async fn burn_paste_is_read_once() {
    let store = store().await;
    let now = store.service.now();
    let id = store
        .service
        .create(
            NewPaste::new("secret", "txt")
                .burn(true)
                .expiry_at(now + Duration::hours(1)),
            deadline(),
        )
        .await
        .unwrap()
        .to_string();

    let paste = store.service.get(&id, deadline()).await.unwrap();
    assert_eq!(paste.content, "secret");
    assert!(paste.burn);

    assert!(matches!(
        store.service.get(&id, deadline()).await,
        Err(StoreError::NotFound)
    ));
    assert_eq!(store.repo.count(deadline()).await.unwrap(), 0);
}

#[tokio::test]
async fn expired_burn_paste_is_never_delivered() {
    let store = store().await;
    let now = store.service.now();
    let id = store
        .service
        .create(
            NewPaste::new("late", "txt")
                .burn(true)
                .expiry_at(now + Duration::minutes(5)),
            deadline(),
        )
        .await
        .unwrap()
        .to_string();

    store.clock.advance(Duration::minutes(10));
    assert!(matches!(
        store.service.get(&id, deadline()).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn sweep_only_reclaims_expired_non_burn_pastes() {
    let store = store().await;
    let now = store.service.now();
    let past = now - Duration::minutes(1);
    let future = now + Duration::hours(1);

    let mut live = Vec::new();
    let population = [
        (false, Some(past), false),
        (false, Some(past), false),
        (false, Some(now), false),
        (false, Some(future), true),
        (false, None, true),
        (false, None, true),
        (true, Some(future), true),
        (true, None, true),
    ];
    for (i, (burn, expiry_at, live_now)) in population.into_iter().enumerate() {
        let id = store
            .service
            .create(
                NewPaste::new(format!("paste {i}"), "txt")
                    .burn(burn)
                    .expiry_at(expiry_at),
                deadline(),
            )
            .await
            .unwrap();
        if live_now {
            live.push(id);
        }
    }
    // an expired burn paste is left for its reader to reclaim
    store
        .service
        .create(
            NewPaste::new("expired burn", "txt").burn(true).expiry_at(past),
            deadline(),
        )
        .await
        .unwrap();

    let before = store.repo.count(deadline()).await.unwrap();
    let swept = store.service.sweep(now, deadline()).await.unwrap();
    let after = store.repo.count(deadline()).await.unwrap();

    assert_eq!(swept, 3);
    assert_eq!(before - after, 3);

    for id in live {
        let paste = store.repo.find_by_id(id, deadline()).await.unwrap().unwrap();
        assert!(is_live(&paste, now));
    }

    // idempotent
    assert_eq!(store.service.sweep(now, deadline()).await.unwrap(), 0);
}

#[tokio::test]
async fn live_pastes_stay_readable_after_sweep() {
    let store = store().await;
    let now = store.service.now();
    let id = store
        .service
        .create(
            NewPaste::new("still here", "txt").expiry_at(now + Duration::seconds(1)),
            deadline(),
        )
        .await
        .unwrap();

    store.service.sweep(now, deadline()).await.unwrap();
    let paste = store.service.get(&id.to_string(), deadline()).await.unwrap();
    assert_eq!(paste.content, "still here");
}

#[tokio::test]
async fn elapsed_deadline_has_no_effect() {
    let store = store().await;

    let result = store
        .service
        .create(NewPaste::new("never stored", "txt"), Instant::now())
        .await;

    assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    assert_eq!(store.repo.count(deadline()).await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_insert_is_a_conflict() {
    let store = store().await;
    let id = store
        .service
        .create(NewPaste::new("original", "txt"), deadline())
        .await
        .unwrap();

    let mut impostor = store.repo.find_by_id(id, deadline()).await.unwrap().unwrap();
    impostor.content = "impostor".into();
    assert!(matches!(
        store.repo.insert(&impostor, deadline()).await,
        Err(StoreError::Conflict)
    ));

    let paste = store.service.get(&id.to_string(), deadline()).await.unwrap();
    assert_eq!(paste.content, "original");
}

#[tokio::test]
async fn delete_reports_whether_it_removed_the_row() {
    let store = store().await;
    let id = store
        .service
        .create(NewPaste::new("short lived", "txt"), deadline())
        .await
        .unwrap();

    assert!(store.repo.delete_by_id(id, deadline()).await.unwrap());
    assert!(!store.repo.delete_by_id(id, deadline()).await.unwrap());
}

#[tokio::test]
async fn take_burn_leaves_plain_pastes_alone() {
    let store = store().await;
    let id = store
        .service
        .create(NewPaste::new("plain", "txt"), deadline())
        .await
        .unwrap();

    assert!(store.repo.take_burn_by_id(id, deadline()).await.unwrap().is_none());
    assert!(store.repo.find_by_id(id, deadline()).await.unwrap().is_some());
}

#[tokio::test]
async fn sweep_keeps_pastes_without_expiry() {
    let store = store().await;
    store
        .service
        .create(NewPaste::new("forever", "txt"), deadline())
        .await
        .unwrap();

    let far_future = store.service.now() + Duration::days(365 * 100);
    assert_eq!(store.service.sweep(far_future, deadline()).await.unwrap(), 0);
    assert_eq!(store.repo.count(deadline()).await.unwrap(), 1);
}
