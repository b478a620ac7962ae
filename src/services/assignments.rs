//! Assignment registry queries

use crate::{
    error::AppResult,
    models::{
        assignment::{AssignmentQuery, AssignmentRecord},
        role::{Caller, Visibility},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AssignmentsService {
    repository: Repository,
}

impl AssignmentsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Employees only ever get their own records, whatever filter they send
    pub async fn list(&self, query: &AssignmentQuery, caller: &Caller) -> AppResult<Vec<AssignmentRecord>> {
        self.repository
            .assignments
            .list(query, Visibility::for_caller(caller))
            .await
    }
}
