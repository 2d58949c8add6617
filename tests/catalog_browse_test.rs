use axum::extract::{Path, Query, State};
use rusqlite::params;
use tempfile::TempDir;

use palengke::catalog::handlers::{self, BrowseQuery};
use palengke::config::Config;
use palengke::db;
use palengke::error::AppError;
use palengke::state::AppState;

fn test_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    (
        AppState {
            db: pool,
            config: Config::default(),
        },
        temp_dir,
    )
}

fn seed_catalog(state: &AppState) {
    let conn = state.db.get().unwrap();
    conn.execute(
        "INSERT INTO users (id, name, username, email, password_hash, role)
         VALUES ('vendor-1', 'v', 'v', 'v@example.com', 'h', 'vendor')",
        [],
    )
    .unwrap();

    let rows = [
        ("l1", "Photography Studio", "Studio Space", "New York, NY", 85, "active"),
        ("l2", "Sound Stage", "Studio Space", "Los Angeles, CA", 120, "active"),
        ("l3", "Catering Service", "Food", "New York, NY", 60, "active"),
        ("l4", "Hidden Workshop", "Studio Space", "New York, NY", 40, "inactive"),
    ];
    for (id, title, category, location, price, status) in rows {
        conn.execute(
            "INSERT INTO listings (id, vendor_id, title, category, location, price, status)
             VALUES (?1, 'vendor-1', ?2, ?3, ?4, ?5, ?6)",
            params![id, title, category, location, price, status],
        )
        .unwrap();
    }
}

fn browse(q: Option<&str>, category: Option<&str>, location: Option<&str>) -> BrowseQuery {
    BrowseQuery {
        q: q.map(String::from),
        category: category.map(String::from),
        location: location.map(String::from),
    }
}

#[tokio::test]
async fn browsing_shows_only_active_rows() {
    let (state, _temp) = test_state();
    seed_catalog(&state);

    let all = handlers::browse_listings(State(state.clone()), Query(browse(None, None, None)))
        .await
        .unwrap();
    assert_eq!(all.0.len(), 3);
    assert!(all.0.iter().all(|l| l.status == "active"));
}

#[tokio::test]
async fn filters_compose_with_and() {
    let (state, _temp) = test_state();
    seed_catalog(&state);

    // Category alone
    let studios = handlers::browse_listings(
        State(state.clone()),
        Query(browse(None, Some("Studio Space"), None)),
    )
    .await
    .unwrap();
    assert_eq!(studios.0.len(), 2);

    // Category AND location narrows further
    let ny_studios = handlers::browse_listings(
        State(state.clone()),
        Query(browse(None, Some("Studio Space"), Some("New York"))),
    )
    .await
    .unwrap();
    assert_eq!(ny_studios.0.len(), 1);
    assert_eq!(ny_studios.0[0].id, "l1");

    // Text search matches within titles
    let sound = handlers::browse_listings(
        State(state.clone()),
        Query(browse(Some("sound"), None, None)),
    )
    .await
    .unwrap();
    assert_eq!(sound.0.len(), 1);
    assert_eq!(sound.0[0].id, "l2");

    // Contradictory filters return nothing
    let none = handlers::browse_listings(
        State(state.clone()),
        Query(browse(Some("Catering"), Some("Studio Space"), None)),
    )
    .await
    .unwrap();
    assert!(none.0.is_empty());
}

#[tokio::test]
async fn blank_filters_are_ignored() {
    let (state, _temp) = test_state();
    seed_catalog(&state);

    let all = handlers::browse_listings(
        State(state.clone()),
        Query(browse(Some("  "), Some(""), None)),
    )
    .await
    .unwrap();
    assert_eq!(all.0.len(), 3);
}

#[tokio::test]
async fn inactive_listing_details_are_not_found() {
    let (state, _temp) = test_state();
    seed_catalog(&state);

    let active = handlers::listing_details(State(state.clone()), Path("l1".to_string()))
        .await
        .unwrap();
    assert_eq!(active.0.title, "Photography Studio");

    let err = handlers::listing_details(State(state.clone()), Path("l4".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = handlers::listing_details(State(state.clone()), Path("missing".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn marketplace_items_browse_the_same_way() {
    let (state, _temp) = test_state();
    seed_catalog(&state);

    let conn = state.db.get().unwrap();
    conn.execute(
        "INSERT INTO items (id, vendor_id, title, category, location, price, status)
         VALUES ('i1', 'vendor-1', 'Vintage Film Camera', 'Equipment', 'New York, NY', 250, 'active')",
        [],
    )
    .unwrap();
    drop(conn);

    let items = handlers::browse_items(
        State(state.clone()),
        Query(browse(Some("camera"), None, None)),
    )
    .await
    .unwrap();
    assert_eq!(items.0.len(), 1);
    assert_eq!(items.0[0].id, "i1");

    // Listings and items are separate catalogs
    let listings = handlers::browse_listings(
        State(state.clone()),
        Query(browse(Some("camera"), None, None)),
    )
    .await
    .unwrap();
    assert!(listings.0.is_empty());
}
