use tasarruf_types::{Category, Id, NameRequest};

use super::{ApiClient, ApiRequest, ApiResult};

impl ApiClient {
    /// All categories known to the platform
    pub async fn get_categories(&self) -> ApiResult<Vec<Category>> {
        self.fetch(ApiRequest::get("/category"), "categories").await
    }

    pub async fn create_category(&self, english_name: &str, turkish_name: &str) -> ApiResult<Category> {
        let body = NameRequest {
            english_name: english_name.to_string(),
            turkish_name: turkish_name.to_string(),
        };
        self.fetch(ApiRequest::post("/category").json(&body)?, "category")
            .await
    }

    pub async fn edit_category(&self, category_id: Id, english_name: &str, turkish_name: &str) -> ApiResult<Category> {
        let body = NameRequest {
            english_name: english_name.to_string(),
            turkish_name: turkish_name.to_string(),
        };
        self.fetch(
            ApiRequest::put(format!("/category/{}", category_id)).json(&body)?,
            "category",
        )
        .await
    }

    pub async fn delete_category(&self, category_id: Id) -> ApiResult<Category> {
        self.fetch(ApiRequest::delete(format!("/category/{}", category_id)), "category")
            .await
    }
}
