use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::LastSeenMap;

impl Database {
    /// Replace the whole cached map with `map`.
    pub fn replace_last_seen(&mut self, map: &LastSeenMap) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        tx.execute("DELETE FROM last_seen", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO last_seen (dev_sn, last_seen) VALUES (?1, ?2)")?;
            for (dev_sn, seen) in map {
                stmt.execute(params![dev_sn, seen])?;
            }
        }
        tx.commit()?;

        tracing::debug!(devices = map.len(), "last-seen cache replaced");
        Ok(())
    }

    pub fn last_seen_map(&self) -> Result<LastSeenMap> {
        let mut stmt = self
            .conn()
            .prepare("SELECT dev_sn, last_seen FROM last_seen")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let map = rows.collect::<rusqlite::Result<LastSeenMap>>()?;
        Ok(map)
    }
}
