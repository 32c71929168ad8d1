use tasarruf_types::{SupportInfo, SupportInfoRequest};

use super::{ApiClient, ApiRequest, ApiResult};

impl ApiClient {
    /// Support contact shown in the mobile apps. Readable without logging in.
    pub async fn get_support_info(&self) -> ApiResult<SupportInfo> {
        self.fetch(ApiRequest::get("/public/support-info").token_if_present(), "info")
            .await
    }

    /// Overwrites the support contact. Setting the same values twice leaves
    /// the same record behind, so the call is retried on transport failure.
    pub async fn update_support_info(&self, email: &str, mobile: &str) -> ApiResult<SupportInfo> {
        let body = SupportInfoRequest {
            email: email.to_string(),
            mobile: mobile.to_string(),
        };
        self.fetch(ApiRequest::post("/support").json(&body)?.idempotent(), "info")
            .await
    }
}
