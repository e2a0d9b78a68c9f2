use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;
use crate::models::StoredSession;

impl Database {
    /// Persist the session, replacing any previous one.
    pub fn save_session(&self, session: &StoredSession) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO session (id, access_token, issued_at, username)
             VALUES (1, ?1, ?2, ?3)",
            params![
                session.access_token,
                session.issued_at.to_rfc3339(),
                session.username,
            ],
        )?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<StoredSession>> {
        let row: Option<(String, String, String)> = self
            .conn()
            .query_row(
                "SELECT access_token, issued_at, username FROM session WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((access_token, issued_str, username)) = row else {
            return Ok(None);
        };

        let issued_at: DateTime<Utc> =
            DateTime::parse_from_rfc3339(&issued_str)?.with_timezone(&Utc);

        Ok(Some(StoredSession {
            access_token,
            issued_at,
            username,
        }))
    }

    /// Returns `true` if a session was stored.
    pub fn clear_session(&self) -> Result<bool> {
        let affected = self.conn().execute("DELETE FROM session", [])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(token: &str) -> StoredSession {
        StoredSession {
            access_token: token.into(),
            issued_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
            username: "Admin123".into(),
        }
    }

    #[test]
    fn save_load_clear() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_session().unwrap(), None);

        db.save_session(&session("tok-1")).unwrap();
        assert_eq!(db.load_session().unwrap(), Some(session("tok-1")));

        db.save_session(&session("tok-2")).unwrap();
        assert_eq!(
            db.load_session().unwrap().map(|s| s.access_token),
            Some("tok-2".to_string())
        );

        assert!(db.clear_session().unwrap());
        assert!(!db.clear_session().unwrap());
        assert_eq!(db.load_session().unwrap(), None);
    }
}
