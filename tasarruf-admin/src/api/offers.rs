use tasarruf_types::{Id, Offer};

use super::{ApiClient, ApiRequest, ApiResult};

impl ApiClient {
    /// Number of offers consumed across the platform
    pub async fn get_offers_count(&self) -> ApiResult<u64> {
        self.fetch(ApiRequest::get("/admin/count/offers"), "count").await
    }

    pub async fn get_offers(&self) -> ApiResult<Vec<Offer>> {
        self.fetch(ApiRequest::get("/admin/offers"), "offers").await
    }

    pub async fn get_offers_of_customer(&self, customer_id: Id) -> ApiResult<Vec<Offer>> {
        self.fetch(
            ApiRequest::get(format!("/admin/offers/customer/{}", customer_id)),
            "offers",
        )
        .await
    }
}
