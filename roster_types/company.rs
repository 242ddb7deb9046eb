use serde::{Deserialize, Serialize};

/// A company as seen through a collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i32,
    pub company_name: String,
    /// Whether the company is a member of the protected collection.
    pub liked: bool,
}
