//! Borrowing service: workflow operations plus the listings around them

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    borrowing::BorrowingWorkflow,
    error::AppResult,
    models::{
        borrowing::{
            BorrowingLineDetails, BorrowingQuery, BorrowingRequest, BorrowingRequestDetails,
            BorrowingResponse, Decision, MonthlyCountResponse,
        },
        pagination::{Page, PageQuery},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowingService {
    repository: Repository,
    workflow: BorrowingWorkflow,
}

impl BorrowingService {
    pub fn new(repository: Repository, workflow: BorrowingWorkflow) -> Self {
        Self {
            repository,
            workflow,
        }
    }

    pub async fn create(&self, requestor_id: Uuid, book_ids: &[Uuid]) -> AppResult<BorrowingResponse> {
        let request = self.workflow.create_request(requestor_id, book_ids).await?;
        self.to_response(request).await
    }

    pub async fn decide(
        &self,
        request_id: Uuid,
        decision: Decision,
        admin_id: Uuid,
    ) -> AppResult<BorrowingResponse> {
        let request = self
            .workflow
            .decide_request(request_id, decision, admin_id)
            .await?;
        self.to_response(request).await
    }

    /// All requests (admin view), optionally filtered by status
    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<Page<BorrowingRequestDetails>> {
        let page = PageQuery::new(query.page_index, query.page_size);
        let (items, total) = self.repository.borrowing.list(query.status, None, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// Requests made by one user
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: PageQuery,
    ) -> AppResult<Page<BorrowingRequestDetails>> {
        let (items, total) = self
            .repository
            .borrowing
            .list(None, Some(user_id), page)
            .await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn monthly_count(&self, user_id: Uuid) -> AppResult<MonthlyCountResponse> {
        let count = self.workflow.count_active_requests_this_month(user_id).await?;
        Ok(MonthlyCountResponse {
            count,
            limit: self.workflow.policy().max_requests_per_month,
        })
    }

    async fn to_response(&self, request: BorrowingRequest) -> AppResult<BorrowingResponse> {
        let book_ids: Vec<Uuid> = request.lines.iter().map(|l| l.book_id).collect();
        let titles = self.repository.books.titles(&book_ids).await?;
        Ok(build_response(request, &titles))
    }
}

fn build_response(request: BorrowingRequest, titles: &HashMap<Uuid, String>) -> BorrowingResponse {
    BorrowingResponse {
        id: request.id,
        request_date: request.request_date,
        expiration_date: request.expiration_date,
        status: request.status,
        books: request
            .lines
            .into_iter()
            .map(|line| BorrowingLineDetails {
                id: line.id,
                book_id: line.book_id,
                book_title: titles.get(&line.book_id).cloned(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn response_keeps_line_order_and_titles() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let request = BorrowingRequest::new_waiting(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &[b, a, b],
            Utc::now(),
            Duration::days(30),
        );
        let titles = HashMap::from([(a, "Emma".to_string())]);

        let response = build_response(request.clone(), &titles);

        assert_eq!(response.id, request.id);
        let books: Vec<(Uuid, Option<String>)> = response
            .books
            .into_iter()
            .map(|l| (l.book_id, l.book_title))
            .collect();
        assert_eq!(
            books,
            vec![(b, None), (a, Some("Emma".to_string())), (b, None)]
        );
    }
}
