//! Schema migrations
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so this runs on each
//! server start. Constraint names are referenced by the HTTP error mapping.

use sqlx::PgPool;

const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            email TEXT NOT NULL CONSTRAINT users_email_key UNIQUE,
            password_hash TEXT NOT NULL,
            university_id TEXT CONSTRAINT users_university_id_key UNIQUE,
            phone TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "admins",
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            email TEXT NOT NULL CONSTRAINT admins_email_key UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "canteens",
        r#"
        CREATE TABLE IF NOT EXISTS canteens (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL CONSTRAINT canteens_name_key UNIQUE,
            location TEXT,
            description TEXT,
            image_url TEXT,
            opens_at TIME,
            closes_at TIME,
            is_open BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "canteen_staff",
        r#"
        CREATE TABLE IF NOT EXISTS canteen_staff (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            email TEXT NOT NULL CONSTRAINT canteen_staff_email_key UNIQUE,
            password_hash TEXT NOT NULL,
            canteen_id UUID NOT NULL REFERENCES canteens(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "menu_items",
        r#"
        CREATE TABLE IF NOT EXISTS menu_items (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            canteen_id UUID NOT NULL REFERENCES canteens(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            price_paise BIGINT NOT NULL CHECK (price_paise >= 0),
            category TEXT NOT NULL,
            is_veg BOOLEAN NOT NULL DEFAULT TRUE,
            is_available BOOLEAN NOT NULL DEFAULT TRUE,
            image_url TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT menu_items_canteen_name_key UNIQUE (canteen_id, name)
        )
        "#,
    ),
    (
        "carts",
        r#"
        CREATE TABLE IF NOT EXISTS carts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL CONSTRAINT carts_user_id_key UNIQUE REFERENCES users(id),
            canteen_id UUID REFERENCES canteens(id) ON DELETE SET NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "cart_items",
        r#"
        CREATE TABLE IF NOT EXISTS cart_items (
            cart_id UUID NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
            menu_item_id UUID NOT NULL REFERENCES menu_items(id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (cart_id, menu_item_id)
        )
        "#,
    ),
    (
        "exam_details",
        r#"
        CREATE TABLE IF NOT EXISTS exam_details (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            id_prefix TEXT NOT NULL,
            roll_start BIGINT NOT NULL,
            roll_end BIGINT NOT NULL,
            starts_on DATE NOT NULL,
            ends_on DATE NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK (roll_start <= roll_end),
            CHECK (starts_on <= ends_on)
        )
        "#,
    ),
    (
        "orders",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES users(id),
            canteen_id UUID NOT NULL CONSTRAINT orders_canteen_id_fkey REFERENCES canteens(id),
            items JSONB NOT NULL,
            subtotal_paise BIGINT NOT NULL,
            is_priority BOOLEAN NOT NULL DEFAULT FALSE,
            priority_fee_paise BIGINT NOT NULL DEFAULT 0,
            total_paise BIGINT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            exam_id UUID REFERENCES exam_details(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "payments",
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            order_id UUID NOT NULL CONSTRAINT payments_order_id_key UNIQUE REFERENCES orders(id),
            gateway_order_id TEXT NOT NULL CONSTRAINT payments_gateway_order_id_key UNIQUE,
            gateway_payment_id TEXT,
            amount_paise BIGINT NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'created',
            refund_id TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "feedback",
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            order_id UUID NOT NULL REFERENCES orders(id),
            user_id UUID NOT NULL REFERENCES users(id),
            canteen_id UUID NOT NULL CONSTRAINT feedback_canteen_id_fkey REFERENCES canteens(id),
            rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT feedback_order_user_key UNIQUE (order_id, user_id)
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_menu_items_canteen ON menu_items(canteen_id)",
    "CREATE INDEX IF NOT EXISTS idx_staff_canteen ON canteen_staff(canteen_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, created_at DESC)",
    // Kitchen queue: priority first, then oldest
    "CREATE INDEX IF NOT EXISTS idx_orders_queue ON orders(canteen_id, status, is_priority DESC, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_feedback_canteen ON feedback(canteen_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_exam_window ON exam_details(starts_on, ends_on)",
];

/// Run all migrations
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running migrations...");

    for (table, ddl) in TABLES {
        tracing::debug!(table, "ensuring table");
        sqlx::query(ddl).execute(pool).await?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!(tables = TABLES.len(), "Migrations complete");
    Ok(())
}
