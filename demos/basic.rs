use sqlite3_access::{Connection, Params};

fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| ":memory:".to_owned());
    let db = Connection::open(&path)?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    )?;

    db.prepare("INSERT INTO users (name) VALUES (?)")?
        .bind(1, "Kit")?
        .execute()?;
    println!(
        "inserted rowid={}, rows changed={}",
        db.last_insert_rowid(),
        db.row_count()
    );

    let mut query = db.prepare("SELECT id, name FROM users WHERE name = :name")?;
    query.bind_params(Params::named([("name", "Kit")]))?.execute()?;

    for row in query.fetch_all_map()? {
        println!("{row:?}");
    }

    Ok(())
}
