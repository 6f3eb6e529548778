use tempfile::TempDir;
use webapp_orm::{Field, Model, Pool, PoolConfig};

webapp_orm::model! {
    /// Account record used across integration tests
    #[table("accounts")]
    pub struct Account {
        id: i64 => Field::integer().primary_key(),
        name: String => Field::string(),
        balance: f64 => Field::float(),
    }
}

/// Pool over a fresh SQLite file; the directory lives as long as the struct
pub struct TestDb {
    pub pool: Pool,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new(maxsize: u32) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("webapp.db");

        let mut config = PoolConfig::sqlite(path.to_string_lossy());
        config.maxsize = maxsize;
        let pool = Pool::create(&config).await.unwrap();

        let ddl = Account::schema().unwrap().create_table_sql(pool.dialect());
        pool.execute_script(&ddl).await.unwrap();

        Self { pool, _dir: dir }
    }
}

pub fn account(id: i64, name: &str, balance: f64) -> Account {
    Account {
        id: Some(id),
        name: Some(name.to_string()),
        balance: Some(balance),
    }
}
