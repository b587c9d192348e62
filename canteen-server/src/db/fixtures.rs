//! Rows for database-backed tests
//!
//! Names, emails and ID prefixes carry a random suffix so tests can share
//! one database and run in parallel.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p canteen-server -- --ignored

use sqlx::PgPool;
use uuid::Uuid;

use super::{
    create_pool, migrations, Canteen, CanteenPatch, CanteenRepo, CartRepo, MenuItem, MenuRepo,
    NewCanteen, NewMenuItem, NewUser, Order, OrderRepo, User, UserRepo,
};
use crate::models::{
    CanteenName, Category, Email, ItemName, PersonName, Price, Quantity, UniversityId,
};

/// Per-line cap used by fixtures and cart tests
pub const MAX_QUANTITY: i32 = 10;

pub fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Migrated pool from `DATABASE_URL`
pub async fn database() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = create_pool(&url, 4).await.expect("pool creation failed");
    migrations::run(&pool).await.expect("migrations failed");
    pool
}

pub async fn user(pool: &PgPool, university_id: Option<&str>) -> User {
    UserRepo::new(pool)
        .create(NewUser {
            name: PersonName::new("Test Student").unwrap(),
            email: Email::new(&format!("student-{}@campus.edu", suffix().to_lowercase())).unwrap(),
            password_hash: "x".into(),
            university_id: university_id.map(|id| UniversityId::new(id).unwrap()),
            phone: None,
        })
        .await
        .expect("create user")
}

pub async fn canteen(pool: &PgPool) -> Canteen {
    CanteenRepo::new(pool)
        .create(NewCanteen {
            name: CanteenName::new(&format!("Canteen {}", suffix())).unwrap(),
            location: Some("Block A".into()),
            description: None,
            hours: None,
        })
        .await
        .expect("create canteen")
}

pub async fn close(pool: &PgPool, canteen_id: Uuid) {
    CanteenRepo::new(pool)
        .update(
            canteen_id,
            CanteenPatch {
                is_open: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("close canteen");
}

pub async fn item(pool: &PgPool, canteen_id: Uuid, price_paise: i64) -> MenuItem {
    MenuRepo::new(pool)
        .create(
            canteen_id,
            NewMenuItem {
                name: ItemName::new(&format!("Dosa {}", suffix())).unwrap(),
                description: None,
                price: Price::new(price_paise).unwrap(),
                category: Category::new("Breakfast").unwrap(),
                is_veg: true,
                is_available: true,
            },
        )
        .await
        .expect("create menu item")
}

pub async fn add_to_cart(pool: &PgPool, user_id: Uuid, item: &MenuItem, quantity: i32) {
    CartRepo::new(pool)
        .add_item(
            user_id,
            item,
            Quantity::new(quantity, MAX_QUANTITY).unwrap(),
            MAX_QUANTITY,
        )
        .await
        .expect("add to cart");
}

/// A fresh user with one pending, non-priority order
pub async fn placed_order(pool: &PgPool, price_paise: i64, quantity: i32) -> (User, Order) {
    let user = user(pool, None).await;
    let canteen = canteen(pool).await;
    let item = item(pool, canteen.id, price_paise).await;
    add_to_cart(pool, user.id, &item, quantity).await;
    let order = OrderRepo::new(pool)
        .place(user.id, None)
        .await
        .expect("place order");
    (user, order)
}
