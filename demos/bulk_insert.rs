use sqlite3_access::{Connection, ParamValue};

fn main() -> anyhow::Result<()> {
    let db = Connection::new()?;
    db.execute("CREATE TABLE readings (sensor TEXT NOT NULL, value REAL, raw BLOB)")?;

    let mut transaction = db.begin_transaction()?;
    let mut insert = db.prepare("INSERT INTO readings VALUES (?, ?, ?)")?;
    for i in 0..100_u32 {
        insert
            .bind_vector([
                ParamValue::text(format!("sensor-{}", i % 4)),
                ParamValue::from(f64::from(i) * 0.5),
                ParamValue::blob(i.to_le_bytes()),
            ])?
            .execute()?;
    }
    transaction.commit()?;

    let mut summary = db.prepare(
        "SELECT sensor, count(*) AS n, avg(value) AS mean FROM readings GROUP BY sensor",
    )?;
    summary.execute()?;
    while let Some(row) = summary.fetch_vector()? {
        println!(
            "{}: n={} mean={:.2}",
            row[0].as_string(),
            row[1].as_i64()?,
            row[2].as_real()?
        );
    }

    Ok(())
}
