use crate::models::{JoinOutcome, LeaveOutcome, PhotoRow, SessionRow, UserRow};
use crate::Database;
use anyhow::Result;
use cramr_types::models::UserPhoto;
use rusqlite::{Connection, params};
use tracing::debug;
use uuid::Uuid;

impl Database {
    // -- Users --

    /// Creates the user on first login. Returns false when the user already
    /// existed, in which case nothing is changed.
    pub fn upsert_user(
        &self,
        user_id: &str,
        username: &str,
        email: &str,
        image_url: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO users (user_id, username, email, image_url) VALUES (?1, ?2, ?3, ?4)",
                params![user_id, username, email, image_url],
            )?;

            if inserted == 1 && !image_url.is_empty() {
                let photo = UserPhoto::for_user(user_id, image_url);
                tx.execute(
                    "INSERT OR REPLACE INTO user_photos (image_name, user_id, image_file) VALUES (?1, ?2, ?3)",
                    params![photo.image_name, user_id, photo.image_file],
                )?;
            }

            tx.commit()?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, user_id))
    }

    pub fn get_user_photo(&self, user_id: &str) -> Result<Option<PhotoRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT image_name, user_id, image_file FROM user_photos WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(PhotoRow {
                        image_name: row.get(0)?,
                        user_id: row.get(1)?,
                        image_file: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Courses --

    /// Adds reference course titles. Returns how many were new.
    pub fn insert_courses(&self, titles: &[String]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare("INSERT OR IGNORE INTO courses (title) VALUES (?1)")?;
                for title in titles {
                    inserted += stmt.execute([title])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    pub fn course_titles(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
            let titles = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(titles)
        })
    }

    // -- Enrolled courses --

    /// Appends `course` to the user's list. Returns false if it was already there.
    pub fn enroll_course(&self, user_id: &str, course: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO enrolled_courses (user_id, course, position)
                 SELECT ?1, ?2, COALESCE(MAX(position), 0) + 1 FROM enrolled_courses WHERE user_id = ?1",
                params![user_id, course],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Returns false if the course was not in the user's list.
    pub fn unenroll_course(&self, user_id: &str, course: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM enrolled_courses WHERE user_id = ?1 AND course = ?2",
                params![user_id, course],
            )?;
            Ok(removed == 1)
        })
    }

    pub fn enrolled_courses(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT course FROM enrolled_courses WHERE user_id = ?1 ORDER BY position",
            )?;
            let courses = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(courses)
        })
    }

    // -- Sessions --

    /// Creates a session whose only member is `creator` and points the
    /// creator's user record at it. The creator is taken out of any session
    /// they were in, in the same transaction.
    pub fn insert_session(
        &self,
        creator: &str,
        course: &str,
        description: &str,
        location: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<SessionRow> {
        let id = Uuid::new_v4().to_string();
        let start_time = chrono::Utc::now().to_rfc3339();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            leave_other_sessions(&tx, creator, &id)?;
            tx.execute(
                "INSERT INTO sessions (id, course, description, location, latitude, longitude, start_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, course, description, location, latitude, longitude, start_time],
            )?;
            tx.execute(
                "INSERT INTO session_members (session_id, user_id, joined_seq) VALUES (?1, ?2, 1)",
                params![id, creator],
            )?;
            tx.execute(
                "UPDATE users SET session_id = ?1 WHERE user_id = ?2",
                params![id, creator],
            )?;
            tx.commit()?;
            Ok(())
        })?;

        Ok(SessionRow {
            id,
            course: course.to_string(),
            description: description.to_string(),
            location: location.to_string(),
            latitude,
            longitude,
            start_time,
            members: vec![creator.to_string()],
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, id))
    }

    pub fn session_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| session_row_exists(conn, id))
    }

    pub fn sessions_for_course(&self, course: &str) -> Result<Vec<SessionRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM sessions WHERE course = ?1 ORDER BY start_time, id")?;
            let ids = stmt
                .query_map([course], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;

            let mut sessions = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(session) = query_session(conn, &id)? {
                    sessions.push(session);
                }
            }
            Ok(sessions)
        })
    }

    /// Adds `user_id` to the session and records it on the user. Any other
    /// membership the user holds is dropped in the same transaction, whatever
    /// the caller believed their current session to be.
    /// Returns `None` when the session does not exist.
    pub fn add_session_member(&self, session_id: &str, user_id: &str) -> Result<Option<JoinOutcome>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !session_row_exists(&tx, session_id)? {
                return Ok(None);
            }
            leave_other_sessions(&tx, user_id, session_id)?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO session_members (session_id, user_id, joined_seq)
                 SELECT ?1, ?2, COALESCE(MAX(joined_seq), 0) + 1 FROM session_members WHERE session_id = ?1",
                params![session_id, user_id],
            )?;
            tx.execute(
                "UPDATE users SET session_id = ?1 WHERE user_id = ?2",
                params![session_id, user_id],
            )?;
            tx.commit()?;

            Ok(Some(if inserted == 1 {
                JoinOutcome::Added
            } else {
                JoinOutcome::AlreadyMember
            }))
        })
    }

    /// Removes `user_id` from the session, deleting the session once it has no
    /// members. Returns `None` when the session does not exist.
    pub fn remove_session_member(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Option<LeaveOutcome>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !session_row_exists(&tx, session_id)? {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM session_members WHERE session_id = ?1 AND user_id = ?2",
                params![session_id, user_id],
            )?;
            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM session_members WHERE session_id = ?1",
                [session_id],
                |row| row.get(0),
            )?;

            let session_deleted = remaining == 0;
            if session_deleted {
                tx.execute("DELETE FROM sessions WHERE id = ?1", [session_id])?;
            }
            tx.execute(
                "UPDATE users SET session_id = NULL WHERE user_id = ?1 AND session_id = ?2",
                params![user_id, session_id],
            )?;
            tx.commit()?;

            Ok(Some(LeaveOutcome {
                removed: removed == 1,
                session_deleted,
            }))
        })
    }

    /// Returns `(username, user_id)` for every member with a user record, in
    /// join order. Returns `None` when the session does not exist.
    pub fn session_member_names(&self, session_id: &str) -> Result<Option<Vec<(String, String)>>> {
        self.with_conn(|conn| {
            if !session_row_exists(conn, session_id)? {
                return Ok(None);
            }

            let mut stmt = conn.prepare(
                "SELECT u.username, m.user_id
                 FROM session_members m
                 JOIN users u ON u.user_id = m.user_id
                 WHERE m.session_id = ?1
                 ORDER BY m.joined_seq",
            )?;
            let members = stmt
                .query_map([session_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<(String, String)>, _>>()?;
            Ok(Some(members))
        })
    }

    /// Returns (number of sessions, number of people in them) for a course.
    pub fn course_activity(&self, course: &str) -> Result<(usize, usize)> {
        self.with_conn(|conn| {
            let (sessions, people): (i64, i64) = conn.query_row(
                "SELECT COUNT(DISTINCT s.id), COUNT(m.user_id)
                 FROM sessions s
                 LEFT JOIN session_members m ON m.session_id = s.id
                 WHERE s.course = ?1",
                [course],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok((sessions as usize, people as usize))
        })
    }
}

fn query_user(conn: &Connection, user_id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, username, email, session_id, image_url, created_at FROM users WHERE user_id = ?1",
    )?;

    stmt.query_row([user_id], |row| {
        Ok(UserRow {
            user_id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            session_id: row.get(3)?,
            image_url: row.get(4)?,
            created_at: row.get(5)?,
        })
    })
    .optional()
}

fn query_session(conn: &Connection, id: &str) -> Result<Option<SessionRow>> {
    let row = conn
        .query_row(
            "SELECT id, course, description, location, latitude, longitude, start_time
             FROM sessions WHERE id = ?1",
            [id],
            |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    course: row.get(1)?,
                    description: row.get(2)?,
                    location: row.get(3)?,
                    latitude: row.get(4)?,
                    longitude: row.get(5)?,
                    start_time: row.get(6)?,
                    members: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut session) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id FROM session_members WHERE session_id = ?1 ORDER BY joined_seq",
    )?;
    session.members = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(Some(session))
}

/// Removes `user_id` from every session except `keep` and deletes the ones
/// left empty. Runs inside the caller's transaction.
fn leave_other_sessions(conn: &Connection, user_id: &str, keep: &str) -> Result<()> {
    let others = {
        let mut stmt = conn.prepare(
            "SELECT session_id FROM session_members WHERE user_id = ?1 AND session_id <> ?2",
        )?;
        let ids = stmt
            .query_map(params![user_id, keep], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        ids
    };

    for session_id in &others {
        conn.execute(
            "DELETE FROM session_members WHERE session_id = ?1 AND user_id = ?2",
            params![session_id, user_id],
        )?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE id = ?1
             AND NOT EXISTS (SELECT 1 FROM session_members WHERE session_id = ?1)",
            [session_id],
        )?;
        debug!(
            "{} moved out of session {}{}",
            user_id,
            session_id,
            if deleted == 1 { ", session deleted" } else { "" }
        );
    }
    Ok(())
}

fn session_row_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM sessions WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn db_with_users(users: &[(&str, &str)]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, name) in users {
            db.upsert_user(id, name, "", "").unwrap();
        }
        db
    }

    #[test]
    fn signup_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.upsert_user("u1", "Ada", "ada@x.edu", "https://img/u1").unwrap());
        assert!(!db.upsert_user("u1", "Someone Else", "", "").unwrap());

        let user = db.get_user("u1").unwrap().unwrap();
        assert_eq!(user.username, "Ada");

        let photo = db.get_user_photo("u1").unwrap().unwrap();
        assert_eq!(photo.image_name, "Profile pic of u1");
        assert_eq!(photo.image_file, "https://img/u1");
    }

    #[test]
    fn enrolling_twice_keeps_one_entry_in_order() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.enroll_course("u1", "CS 106A: Programming Methodology").unwrap());
        assert!(db.enroll_course("u1", "MATH 51: Linear Algebra").unwrap());
        assert!(!db.enroll_course("u1", "CS 106A: Programming Methodology").unwrap());

        assert_eq!(
            db.enrolled_courses("u1").unwrap(),
            vec!["CS 106A: Programming Methodology", "MATH 51: Linear Algebra"]
        );

        assert!(db.unenroll_course("u1", "CS 106A: Programming Methodology").unwrap());
        assert!(!db.unenroll_course("u1", "CS 106A: Programming Methodology").unwrap());
        assert_eq!(db.enrolled_courses("u1").unwrap(), vec!["MATH 51: Linear Algebra"]);
    }

    #[test]
    fn membership_follows_create_join_leave() {
        let db = db_with_users(&[("a", "Ada"), ("b", "Bob")]);
        let session = db.insert_session("a", "CS106A", "pset 3", "Green", 37.4, -122.1).unwrap();
        assert_eq!(session.members, vec!["a"]);

        assert_eq!(db.add_session_member(&session.id, "b").unwrap(), Some(JoinOutcome::Added));
        assert_eq!(
            db.add_session_member(&session.id, "b").unwrap(),
            Some(JoinOutcome::AlreadyMember)
        );
        assert_eq!(db.get_session(&session.id).unwrap().unwrap().members, vec!["a", "b"]);
        assert_eq!(
            db.get_user("b").unwrap().unwrap().session_id.as_deref(),
            Some(session.id.as_str())
        );

        let left = db.remove_session_member(&session.id, "a").unwrap().unwrap();
        assert!(left.removed);
        assert!(!left.session_deleted);
        assert_eq!(db.get_user("a").unwrap().unwrap().session_id, None);

        let left = db.remove_session_member(&session.id, "b").unwrap().unwrap();
        assert!(left.session_deleted);
        assert!(!db.session_exists(&session.id).unwrap());
        assert!(db.remove_session_member(&session.id, "b").unwrap().is_none());
    }

    #[test]
    fn member_names_skip_unknown_users() {
        let db = db_with_users(&[("a", "Ada")]);
        let session = db.insert_session("a", "CS106A", "", "", 0.0, 0.0).unwrap();
        db.add_session_member(&session.id, "ghost").unwrap();

        let names = db.session_member_names(&session.id).unwrap().unwrap();
        assert_eq!(names, vec![("Ada".to_string(), "a".to_string())]);
        assert!(db.session_member_names("missing").unwrap().is_none());
    }

    #[test]
    fn course_activity_counts_sessions_and_people() {
        let db = db_with_users(&[("a", "Ada"), ("b", "Bob"), ("c", "Cy"), ("d", "Dee")]);
        let s1 = db.insert_session("a", "CS106A", "", "", 0.0, 0.0).unwrap();
        db.add_session_member(&s1.id, "b").unwrap();
        db.insert_session("c", "CS106A", "", "", 0.0, 0.0).unwrap();
        db.insert_session("d", "MATH 51", "", "", 0.0, 0.0).unwrap();

        assert_eq!(db.course_activity("CS106A").unwrap(), (2, 3));
        assert_eq!(db.course_activity("PHYS 41").unwrap(), (0, 0));
        assert_eq!(db.sessions_for_course("CS106A").unwrap().len(), 2);
    }

    #[test]
    fn course_import_skips_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let titles = vec!["CS 106A: Programming Methodology".to_string(), "MATH 51: Linear Algebra".to_string()];
        assert_eq!(db.insert_courses(&titles).unwrap(), 2);
        assert_eq!(db.insert_courses(&titles).unwrap(), 0);
        assert_eq!(db.course_titles().unwrap().len(), 2);
    }

    fn sessions_of(db: &Database, user_id: &str) -> Vec<String> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT session_id FROM session_members WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
        .unwrap()
    }

    #[test]
    fn joining_drops_every_other_membership() {
        let db = db_with_users(&[("a", "Ada"), ("b", "Bob"), ("c", "Cy")]);
        let s1 = db.insert_session("a", "CS106A", "", "", 0.0, 0.0).unwrap();
        let s2 = db.insert_session("b", "CS106A", "", "", 0.0, 0.0).unwrap();
        let s3 = db.insert_session("c", "MATH 51", "", "", 0.0, 0.0).unwrap();

        // No leave in between: the store alone keeps a in one session
        db.add_session_member(&s2.id, "a").unwrap();
        db.add_session_member(&s3.id, "a").unwrap();

        assert_eq!(sessions_of(&db, "a"), vec![s3.id.clone()]);
        assert!(!db.session_exists(&s1.id).unwrap());
        assert_eq!(db.get_session(&s2.id).unwrap().unwrap().members, vec!["b"]);
        assert_eq!(db.get_user("a").unwrap().unwrap().session_id, Some(s3.id));
    }

    #[test]
    fn creating_drops_the_previous_membership() {
        let db = db_with_users(&[("a", "Ada"), ("b", "Bob")]);
        let s1 = db.insert_session("a", "CS106A", "", "", 0.0, 0.0).unwrap();
        db.add_session_member(&s1.id, "b").unwrap();

        let s2 = db.insert_session("a", "CS106A", "", "", 0.0, 0.0).unwrap();
        assert_eq!(sessions_of(&db, "a"), vec![s2.id]);
        assert_eq!(db.get_session(&s1.id).unwrap().unwrap().members, vec!["b"]);

        let s3 = db.insert_session("b", "CS106A", "", "", 0.0, 0.0).unwrap();
        assert!(!db.session_exists(&s1.id).unwrap());
        assert_eq!(sessions_of(&db, "b"), vec![s3.id]);
    }

    #[test]
    fn concurrent_joins_keep_every_member() {
        let ids: Vec<String> = (0..16).map(|i| format!("u{}", i)).collect();
        let db = Arc::new(db_with_users(&[("host", "Host")]));
        for id in &ids {
            db.upsert_user(id, id, "", "").unwrap();
        }
        let session = db.insert_session("host", "CS106A", "", "", 0.0, 0.0).unwrap();

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let db = db.clone();
                let session_id = session.id.clone();
                std::thread::spawn(move || db.add_session_member(&session_id, &id).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(JoinOutcome::Added));
        }

        let members = db.get_session(&session.id).unwrap().unwrap().members;
        assert_eq!(members.len(), ids.len() + 1);
        for id in &ids {
            assert!(members.contains(id));
        }
    }

    #[test]
    fn racing_moves_leave_one_membership() {
        let db = Arc::new(db_with_users(&[("a", "Ada"), ("b", "Bob"), ("c", "Cy")]));
        db.insert_session("a", "CS106A", "", "", 0.0, 0.0).unwrap();
        let targets = [
            db.insert_session("b", "CS106A", "", "", 0.0, 0.0).unwrap().id,
            db.insert_session("c", "CS106A", "", "", 0.0, 0.0).unwrap().id,
        ];

        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|target| {
                let db = db.clone();
                std::thread::spawn(move || db.add_session_member(&target, "a").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mine = sessions_of(&db, "a");
        assert_eq!(mine.len(), 1);
        assert!(targets.contains(&mine[0]));
        assert_eq!(db.get_user("a").unwrap().unwrap().session_id.as_ref(), Some(&mine[0]));
    }
}
