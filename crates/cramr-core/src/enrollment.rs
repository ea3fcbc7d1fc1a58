use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use cramr_types::courses::{SEARCH_LIMIT, search_pattern};

use crate::backend::Backend;
use crate::context::Reachability;
use crate::error::{CramrError, Result};
use crate::sessions::backend_failure;

/// Keeps each user's list of enrolled courses.
#[derive(Clone)]
pub struct EnrollmentController {
    backend: Arc<dyn Backend>,
    reachability: Reachability,
}

impl EnrollmentController {
    pub fn new(backend: Arc<dyn Backend>, reachability: Reachability) -> Self {
        Self {
            backend,
            reachability,
        }
    }

    /// Appends `course` unless it is already enrolled. Returns whether it was added.
    pub async fn add_course_to_user(&self, user_id: &str, course: &str) -> Result<bool> {
        if user_id.is_empty() {
            return Err(CramrError::MissingUser);
        }
        self.reachability.ensure_online()?;

        let added = self
            .backend
            .enroll(user_id, course)
            .await
            .map_err(|e| backend_failure("add_course_to_user", e))?;
        if added {
            info!("{} enrolled in {}", user_id, course);
        } else {
            debug!("{} already enrolled in {}", user_id, course);
        }
        Ok(added)
    }

    /// Removes `course` and hands `position_hint` back untouched, so the caller
    /// can drop the matching row from its list.
    pub async fn delete_course_from_user<P>(
        &self,
        user_id: &str,
        course: &str,
        position_hint: P,
    ) -> Result<P> {
        if user_id.is_empty() {
            return Err(CramrError::MissingUser);
        }
        self.reachability.ensure_online()?;

        let removed = self
            .backend
            .unenroll(user_id, course)
            .await
            .map_err(|e| backend_failure("delete_course_from_user", e))?;
        if removed {
            info!("{} dropped {}", user_id, course);
        }
        Ok(position_hint)
    }

    pub async fn get_courses(&self, user_id: &str) -> Result<Vec<String>> {
        if user_id.is_empty() {
            return Err(CramrError::MissingUser);
        }
        self.backend
            .enrolled_courses(user_id)
            .await
            .map_err(|e| backend_failure("get_courses", e))
    }

    /// Course titles matching what the user typed, at most [`SEARCH_LIMIT`].
    pub async fn search_courses(&self, text: &str) -> Result<Vec<String>> {
        let Some(pattern) = search_pattern(text) else {
            return Ok(Vec::new());
        };
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!("Unusable course search {:?}: {}", text, e);
                return Ok(Vec::new());
            }
        };

        let titles = self
            .backend
            .course_titles()
            .await
            .map_err(|e| backend_failure("search_courses", e))?;

        Ok(titles
            .into_iter()
            .filter(|title| re.is_match(title))
            .take(SEARCH_LIMIT)
            .collect())
    }

    /// Loads reference course titles. Returns how many were new.
    pub async fn import_courses(&self, titles: Vec<String>) -> Result<usize> {
        let imported = self
            .backend
            .import_courses(titles)
            .await
            .map_err(|e| backend_failure("import_courses", e))?;
        info!("Imported {} courses", imported);
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::backend_with_users;

    const CS106A: &str = "CS 106A: Programming Methodology";
    const MATH51: &str = "MATH 51: Linear Algebra";

    async fn controller() -> (EnrollmentController, Reachability) {
        let backend = backend_with_users(&[("a", "Ada")]).await;
        let reachability = Reachability::new();
        (EnrollmentController::new(backend, reachability.clone()), reachability)
    }

    #[tokio::test]
    async fn adding_an_enrolled_course_does_not_duplicate() {
        let (enrollment, _) = controller().await;
        assert!(enrollment.add_course_to_user("a", CS106A).await.unwrap());
        assert!(enrollment.add_course_to_user("a", MATH51).await.unwrap());
        assert!(!enrollment.add_course_to_user("a", CS106A).await.unwrap());

        assert_eq!(enrollment.get_courses("a").await.unwrap(), vec![CS106A, MATH51]);
    }

    #[tokio::test]
    async fn unknown_user_has_no_courses() {
        let (enrollment, _) = controller().await;
        assert!(enrollment.get_courses("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_returns_position_hint() {
        let (enrollment, _) = controller().await;
        enrollment.add_course_to_user("a", CS106A).await.unwrap();

        let hint = enrollment.delete_course_from_user("a", CS106A, (0usize, 3usize)).await.unwrap();
        assert_eq!(hint, (0, 3));
        assert!(enrollment.get_courses("a").await.unwrap().is_empty());

        // Deleting something that is not enrolled still hands the hint back
        let hint = enrollment.delete_course_from_user("a", MATH51, 7).await.unwrap();
        assert_eq!(hint, 7);
    }

    #[tokio::test]
    async fn offline_enrollment_is_refused() {
        let (enrollment, reachability) = controller().await;
        reachability.set_online(false);

        let err = enrollment.add_course_to_user("a", CS106A).await.unwrap_err();
        assert!(matches!(err, CramrError::Offline));

        reachability.set_online(true);
        assert!(enrollment.get_courses("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected() {
        let (enrollment, _) = controller().await;
        let err = enrollment.add_course_to_user("", CS106A).await.unwrap_err();
        assert!(matches!(err, CramrError::MissingUser));
    }

    #[tokio::test]
    async fn search_matches_loosely_and_caps_results() {
        let (enrollment, _) = controller().await;
        let mut titles: Vec<String> = (1..=20).map(|n| format!("CS {}: Seminar {}", 100 + n, n)).collect();
        titles.push(CS106A.to_string());
        titles.push(MATH51.to_string());
        enrollment.import_courses(titles).await.unwrap();

        assert!(enrollment.search_courses("").await.unwrap().is_empty());
        assert_eq!(enrollment.search_courses("math51").await.unwrap(), vec![MATH51]);
        assert_eq!(enrollment.search_courses("cs").await.unwrap().len(), SEARCH_LIMIT);

        let hits = enrollment.search_courses("Cs 106a").await.unwrap();
        assert_eq!(hits, vec![CS106A]);
    }

    #[tokio::test]
    async fn oversized_search_finds_nothing() {
        let (enrollment, _) = controller().await;
        enrollment.import_courses(vec![CS106A.to_string()]).await.unwrap();

        let query = "cs106a".repeat(50_000);
        assert!(enrollment.search_courses(&query).await.unwrap().is_empty());
    }
}
