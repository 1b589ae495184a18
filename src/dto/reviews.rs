use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    pub score: i16,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewBlock {
    NotDelivered,
    AlreadyReviewed,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewEligibility {
    pub can_review: bool,
    pub reason: Option<ReviewBlock>,
}
