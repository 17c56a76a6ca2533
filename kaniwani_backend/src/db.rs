use super::*;

embed_migrations!();

pub fn connect(database_url: &str) -> Result<PgConnection> {
    PgConnection::establish(database_url)
        .chain_err(|| "Error connecting to database!")
}

pub fn check(conn: &PgConnection) -> Result<()> {
    embedded_migrations::run(conn).chain_err(|| "Couldn't run the migrations.")?;
    info!("Migrations checked.");
    Ok(())
}
