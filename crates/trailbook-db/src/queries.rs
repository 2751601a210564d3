use crate::Database;
use crate::models::{StoryRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, full_name, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, full_name, email, password_hash),
            )?;
            Ok(())
        })
    }

    /// Insert a user unless the email is already registered; returns false
    /// when it is. Check and insert share one connection lock, and a lost
    /// race against the UNIQUE constraint also reports the email as taken.
    pub fn create_user_if_email_free(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            if query_user(conn, "email", email)?.is_some() {
                return Ok(false);
            }
            match conn.execute(
                "INSERT INTO users (id, full_name, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, full_name, email, password_hash),
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Stories --

    /// Insert a story and return the stored row (picks up the
    /// database-assigned `created_at`).
    #[allow(clippy::too_many_arguments)]
    pub fn insert_story(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        story: &str,
        locations_json: &str,
        visited_date: i64,
        image_url: &str,
    ) -> Result<StoryRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO stories (id, user_id, title, story, visited_locations, visited_date, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, user_id, title, story, locations_json, visited_date, image_url],
            )?;
            query_story(conn, id, user_id)?
                .ok_or_else(|| anyhow::anyhow!("story {} missing after insert", id))
        })
    }

    /// Fetch a story only if it is owned by `user_id`.
    pub fn get_story(&self, id: &str, user_id: &str) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| query_story(conn, id, user_id))
    }

    /// All stories for an owner, favourites first, insertion order within.
    pub fn stories_for_owner(&self, user_id: &str) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| query_stories_ordered(conn, user_id))
    }

    /// Overwrite the editable fields of an owned story. Returns `None` when
    /// no story with that id belongs to `user_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn update_story(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        story: &str,
        locations_json: &str,
        visited_date: i64,
        image_url: &str,
    ) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE stories
                 SET title = ?3, story = ?4, visited_locations = ?5, visited_date = ?6, image_url = ?7
                 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id, title, story, locations_json, visited_date, image_url],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_story(conn, id, user_id)
        })
    }

    pub fn set_favourite(
        &self,
        id: &str,
        user_id: &str,
        is_favourite: bool,
    ) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE stories SET is_favourite = ?3 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id, is_favourite],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_story(conn, id, user_id)
        })
    }

    /// Delete an owned story, returning the deleted row so the caller can
    /// clean up the referenced image. `None` when not owned.
    pub fn delete_story(&self, id: &str, user_id: &str) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| {
            let Some(row) = query_story(conn, id, user_id)? else {
                return Ok(None);
            };
            conn.execute(
                "DELETE FROM stories WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )?;
            Ok(Some(row))
        })
    }

    /// Case-insensitive substring search over title, body, and any visited
    /// location, favourites first.
    pub fn search_stories(&self, user_id: &str, query: &str) -> Result<Vec<StoryRow>> {
        let needle = query.to_lowercase();
        self.with_conn(|conn| {
            let rows = query_stories_ordered(conn, user_id)?;
            Ok(rows
                .into_iter()
                .filter(|row| {
                    row.title.to_lowercase().contains(&needle)
                        || row.story.to_lowercase().contains(&needle)
                        || row
                            .locations()
                            .unwrap_or_default()
                            .iter()
                            .any(|loc| loc.to_lowercase().contains(&needle))
                })
                .collect())
        })
    }

    /// Inclusive range match on `visited_date`. A missing bound makes the
    /// range undefined and matches nothing; it never errors.
    pub fn filter_stories_by_date(
        &self,
        user_id: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<StoryRow>> {
        let (Some(start), Some(end)) = (start_ms, end_ms) else {
            return Ok(vec![]);
        };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, story, visited_locations, visited_date, image_url, is_favourite, created_at
                 FROM stories
                 WHERE user_id = ?1 AND visited_date >= ?2 AND visited_date <= ?3
                 ORDER BY is_favourite DESC, rowid ASC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, start, end], map_story_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_story_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        story: row.get(3)?,
        visited_locations: row.get(4)?,
        visited_date: row.get(5)?,
        image_url: row.get(6)?,
        is_favourite: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, full_name, email, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                full_name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_story(conn: &Connection, id: &str, user_id: &str) -> Result<Option<StoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, story, visited_locations, visited_date, image_url, is_favourite, created_at
         FROM stories WHERE id = ?1 AND user_id = ?2",
    )?;

    let row = stmt
        .query_row([id, user_id], map_story_row)
        .optional()?;

    Ok(row)
}

fn query_stories_ordered(conn: &Connection, user_id: &str) -> Result<Vec<StoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, story, visited_locations, visited_date, image_url, is_favourite, created_at
         FROM stories
         WHERE user_id = ?1
         ORDER BY is_favourite DESC, rowid ASC",
    )?;

    let rows = stmt
        .query_map([user_id], map_story_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, "Test User", email, "digest").unwrap();
        id
    }

    fn add_story(db: &Database, owner: &str, title: &str, visited_date: i64) -> StoryRow {
        db.insert_story(
            &Uuid::new_v4().to_string(),
            owner,
            title,
            "some travel notes",
            r#"["Paris","Lyon"]"#,
            visited_date,
            "http://localhost:8000/uploads/placeholder.png",
        )
        .unwrap()
    }

    #[test]
    fn duplicate_email_rejected_and_first_digest_intact() {
        let db = db();
        db.create_user("u1", "Ann", "a@x.com", "digest-one").unwrap();
        let err = db.create_user("u2", "Bob", "a@x.com", "digest-two");
        assert!(err.is_err());

        let stored = db.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(stored.id, "u1");
        assert_eq!(stored.password, "digest-one");
    }

    #[test]
    fn guarded_insert_reports_taken_email() {
        let db = db();
        assert!(
            db.create_user_if_email_free("u1", "Ann", "a@x.com", "digest-one")
                .unwrap()
        );
        assert!(
            !db.create_user_if_email_free("u2", "Bob", "a@x.com", "digest-two")
                .unwrap()
        );

        let stored = db.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(stored.id, "u1");
        assert_eq!(stored.password, "digest-one");
    }

    #[test]
    fn email_lookup_is_case_sensitive() {
        let db = db();
        add_user(&db, "a@x.com");
        assert!(db.get_user_by_email("A@X.com").unwrap().is_none());
    }

    #[test]
    fn insert_round_trips_all_fields() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        let created = add_story(&db, &owner, "Trip", 1_700_000_000_000);

        let listed = db.stories_for_owner(&owner).unwrap();
        assert_eq!(listed.len(), 1);
        let row = &listed[0];
        assert_eq!(row.id, created.id);
        assert_eq!(row.title, "Trip");
        assert_eq!(row.story, "some travel notes");
        assert_eq!(row.locations().unwrap(), vec!["Paris", "Lyon"]);
        assert_eq!(row.visited_date, 1_700_000_000_000);
        assert!(!row.is_favourite);
    }

    #[test]
    fn favourites_sort_first_regardless_of_insertion_order() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        let s1 = add_story(&db, &owner, "first", 1);
        let s2 = add_story(&db, &owner, "second", 2);
        let s3 = add_story(&db, &owner, "third", 3);

        db.set_favourite(&s3.id, &owner, true).unwrap().unwrap();

        let listed = db.stories_for_owner(&owner).unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![s3.id.as_str(), s1.id.as_str(), s2.id.as_str()]);

        // non-favourites keep insertion order after the favourite block
        db.set_favourite(&s3.id, &owner, false).unwrap().unwrap();
        db.set_favourite(&s2.id, &owner, true).unwrap().unwrap();
        let listed = db.stories_for_owner(&owner).unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![s2.id.as_str(), s1.id.as_str(), s3.id.as_str()]);
    }

    #[test]
    fn other_owner_cannot_touch_a_story() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        let other = add_user(&db, "b@x.com");
        let story = add_story(&db, &owner, "Trip", 10);

        assert!(db.get_story(&story.id, &other).unwrap().is_none());
        assert!(
            db.update_story(&story.id, &other, "x", "y", "[]", 1, "u")
                .unwrap()
                .is_none()
        );
        assert!(db.set_favourite(&story.id, &other, true).unwrap().is_none());
        assert!(db.delete_story(&story.id, &other).unwrap().is_none());

        // untouched
        let row = db.get_story(&story.id, &owner).unwrap().unwrap();
        assert_eq!(row.title, "Trip");
        assert!(!row.is_favourite);
    }

    #[test]
    fn update_overwrites_editable_fields() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        let story = add_story(&db, &owner, "Trip", 10);

        let updated = db
            .update_story(
                &story.id,
                &owner,
                "New title",
                "new body",
                r#"["Rome"]"#,
                20,
                "http://localhost:8000/uploads/x.png",
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.visited_date, 20);
        assert_eq!(updated.locations().unwrap(), vec!["Rome"]);
    }

    #[test]
    fn delete_removes_from_listing_and_returns_row() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        let story = add_story(&db, &owner, "Trip", 10);

        let deleted = db.delete_story(&story.id, &owner).unwrap().unwrap();
        assert_eq!(deleted.id, story.id);
        assert!(db.stories_for_owner(&owner).unwrap().is_empty());
        assert!(db.delete_story(&story.id, &owner).unwrap().is_none());
    }

    #[test]
    fn search_matches_title_body_and_locations_case_insensitively() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        add_story(&db, &owner, "Alps hike", 1);
        let by_body = db
            .insert_story(
                &Uuid::new_v4().to_string(),
                &owner,
                "Other",
                "wandering the ALPS again",
                r#"["Zermatt"]"#,
                2,
                "url",
            )
            .unwrap();
        let by_location = db
            .insert_story(
                &Uuid::new_v4().to_string(),
                &owner,
                "Nothing here",
                "quiet week",
                r#"["Alpspitze"]"#,
                3,
                "url",
            )
            .unwrap();
        add_story(&db, &owner, "Beach", 4);

        db.set_favourite(&by_location.id, &owner, true).unwrap();

        let found = db.search_stories(&owner, "alps").unwrap();
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        // favourite first, then insertion order
        assert_eq!(ids[0], by_location.id.as_str());
        assert_eq!(ids[2], by_body.id.as_str());
    }

    #[test]
    fn search_never_crosses_owners() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        let other = add_user(&db, "b@x.com");
        add_story(&db, &owner, "Alps hike", 1);

        assert!(db.search_stories(&other, "alps").unwrap().is_empty());
    }

    #[test]
    fn date_filter_is_inclusive_at_both_bounds() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        let at_start = add_story(&db, &owner, "start", 100);
        add_story(&db, &owner, "inside", 150);
        let at_end = add_story(&db, &owner, "end", 200);
        add_story(&db, &owner, "outside", 201);

        let found = db
            .filter_stories_by_date(&owner, Some(100), Some(200))
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&at_start.id.as_str()));
        assert!(ids.contains(&at_end.id.as_str()));
    }

    #[test]
    fn date_filter_with_missing_bound_matches_nothing() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        add_story(&db, &owner, "Trip", 100);

        assert!(
            db.filter_stories_by_date(&owner, None, Some(200))
                .unwrap()
                .is_empty()
        );
        assert!(
            db.filter_stories_by_date(&owner, Some(0), None)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn date_filter_sorts_favourites_first() {
        let db = db();
        let owner = add_user(&db, "a@x.com");
        add_story(&db, &owner, "plain", 100);
        let fav = add_story(&db, &owner, "starred", 150);
        db.set_favourite(&fav.id, &owner, true).unwrap();

        let found = db
            .filter_stories_by_date(&owner, Some(0), Some(1_000))
            .unwrap();
        assert_eq!(found[0].id, fav.id);
    }
}
