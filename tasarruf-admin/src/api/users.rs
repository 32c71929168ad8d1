use tasarruf_types::{Branch, Id, User};

use super::{ApiClient, ApiRequest, ApiResult};

// Customer and partner management endpoints

impl ApiClient {
    /// Number of customer accounts
    pub async fn get_customers_count(&self) -> ApiResult<u64> {
        self.fetch(ApiRequest::get("/admin/count/customers"), "count").await
    }

    /// Number of partner accounts
    pub async fn get_partners_count(&self) -> ApiResult<u64> {
        self.fetch(ApiRequest::get("/admin/count/partners"), "count").await
    }

    pub async fn get_customers(&self) -> ApiResult<Vec<User>> {
        self.fetch(ApiRequest::get("/admin/customers"), "users").await
    }

    pub async fn get_partners(&self) -> ApiResult<Vec<User>> {
        self.fetch(ApiRequest::get("/admin/partners"), "users").await
    }

    /// Partners that signed up but have not been approved yet
    pub async fn get_not_approved_partners(&self) -> ApiResult<Vec<User>> {
        self.fetch(ApiRequest::get("/admin/partners/not-approved"), "users")
            .await
    }

    pub async fn approve_partner(&self, partner_id: Id) -> ApiResult<User> {
        self.fetch(ApiRequest::post(format!("/admin/approve/{}", partner_id)), "user")
            .await
    }

    /// Rejecting a pending partner deletes the account
    pub async fn reject_partner(&self, partner_id: Id) -> ApiResult<User> {
        self.delete_user(partner_id).await
    }

    pub async fn get_customer(&self, customer_id: Id) -> ApiResult<User> {
        self.fetch(ApiRequest::get(format!("/admin/customer/{}", customer_id)), "user")
            .await
    }

    pub async fn get_partner(&self, partner_id: Id) -> ApiResult<User> {
        self.fetch(ApiRequest::get(format!("/admin/partner/{}", partner_id)), "user")
            .await
    }

    pub async fn get_exclusive_partners(&self) -> ApiResult<Vec<User>> {
        self.fetch(ApiRequest::get("/exclusive"), "users").await
    }

    pub async fn set_partner_exclusive(&self, partner_id: Id) -> ApiResult<User> {
        self.fetch(ApiRequest::post(format!("/exclusive/{}", partner_id)), "user")
            .await
    }

    pub async fn remove_partner_exclusive(&self, partner_id: Id) -> ApiResult<User> {
        self.fetch(ApiRequest::delete(format!("/exclusive/{}", partner_id)), "user")
            .await
    }

    /// Flips whether a partner's offers may be shared between customers
    pub async fn toggle_partner_sharable(&self, partner_id: Id) -> ApiResult<User> {
        self.fetch(
            ApiRequest::post(format!("/admin/is-sharable/{}", partner_id)),
            "user",
        )
        .await
    }

    pub async fn delete_user(&self, user_id: Id) -> ApiResult<User> {
        self.fetch(ApiRequest::delete(format!("/admin/user/{}", user_id)), "user")
            .await
    }

    /// Search users by email, name or mobile
    pub async fn search_users(&self, query: &str) -> ApiResult<Vec<User>> {
        let users: Option<Vec<User>> = self
            .fetch(ApiRequest::get("/admin/users").query("q", query), "users")
            .await?;
        // The backend sends `null` instead of an empty list when nothing matches
        Ok(users.unwrap_or_default())
    }

    pub async fn toggle_user_active(&self, user_id: Id) -> ApiResult<User> {
        self.fetch(
            ApiRequest::post(format!("/admin/activate-user/{}", user_id)),
            "user",
        )
        .await
    }

    pub async fn get_branches_of_partner(&self, partner_id: Id) -> ApiResult<Vec<Branch>> {
        self.fetch(
            ApiRequest::get(format!("/branches-by-owner/{}", partner_id)),
            "branches",
        )
        .await
    }
}
