//! Seed script for development: populates a fresh database with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` (reads .env).

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

const ADMIN_PASSWORD: &str = "Admin123!";
const AGENT_PASSWORD: &str = "Agent123!";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = crm::db::create_pool(&db_url, 5).await?;

    crm::db::run_migrations(&pool).await?;

    println!("=== CRM Seed Script ===");

    seed_users(&pool).await?;
    seed_leads(&pool).await?;
    seed_customers(&pool).await?;

    println!("\n=== Seed complete! ===");
    println!("Admin login: admin@crm.local / {ADMIN_PASSWORD}");
    println!("Agent login: maya@crm.local / {AGENT_PASSWORD}");

    Ok(())
}

async fn upsert_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let hash = crm::services::auth::hash_password(password)?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, role)
         VALUES ($1, $2, $3, $4::user_role)
         ON CONFLICT (LOWER(email)) DO UPDATE SET password_hash = EXCLUDED.password_hash
         RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(&hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn seed_users(pool: &PgPool) -> anyhow::Result<()> {
    upsert_user(pool, "Administrator", "admin@crm.local", ADMIN_PASSWORD, "admin").await?;
    upsert_user(pool, "Maya Patel", "maya@crm.local", AGENT_PASSWORD, "agent").await?;
    upsert_user(pool, "Tom Becker", "tom@crm.local", AGENT_PASSWORD, "agent").await?;

    println!("[done] Admin and agent users ready");
    Ok(())
}

async fn seed_leads(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Leads already exist ({count})");
        return Ok(());
    }

    let agents: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM users WHERE role = 'agent' ORDER BY created_at, id")
            .fetch_all(pool)
            .await?;
    if agents.is_empty() {
        anyhow::bail!("no agents to assign leads to");
    }

    // (name, email, phone, source, status)
    let leads = [
        ("Oliver Grant", "oliver@northwind.test", "+1 555 0101", "Website", "New"),
        ("Sofia Reyes", "sofia@contoso.test", "+1 555 0102", "Referral", "Contacted"),
        ("Liam Chen", "liam@fabrikam.test", "+1 555 0103", "Trade show", "In Progress"),
        ("Ava Novak", "ava@tailspin.test", "+1 555 0104", "Website", "Converted"),
        ("Noah Adeyemi", "noah@litware.test", "+1 555 0105", "Cold call", "Lost"),
        ("Emma Rossi", "emma@adventure.test", "+1 555 0106", "Referral", "Converted"),
        ("Lucas Berg", "lucas@proseware.test", "+1 555 0107", "LinkedIn", "New"),
        ("Mia Kowalski", "mia@wingtip.test", "+1 555 0108", "Website", "In Progress"),
    ];

    for (i, (name, email, phone, source, status)) in leads.iter().enumerate() {
        sqlx::query(
            "INSERT INTO leads (name, email, phone, source, status, agent_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW() - make_interval(days => $7))",
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(source)
        .bind(status)
        .bind(agents[i % agents.len()])
        .bind(i as i32)
        .execute(pool)
        .await?;
    }

    println!("[done] Created {} leads", leads.len());
    Ok(())
}

async fn seed_customers(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Customers already exist ({count})");
        return Ok(());
    }

    // (name, email, phone, company, address)
    let customers = [
        ("Ava Novak", "ava@tailspin.test", "+1 555 0104", "Tailspin Toys", "12 Harbor Rd, Portland"),
        ("Emma Rossi", "emma@adventure.test", "+1 555 0106", "Adventure Works", "400 Pine St, Seattle"),
        ("Henry Walsh", "henry@margie.test", "+1 555 0110", "Margie's Travel", "9 Elm Ave, Boise"),
    ];

    for (name, email, phone, company, address) in customers {
        sqlx::query(
            "INSERT INTO customers (name, email, phone, company, address)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(company)
        .bind(address)
        .execute(pool)
        .await?;
    }

    println!("[done] Created {} customers", customers.len());
    Ok(())
}
