use tasarruf_types::{City, Id, NameRequest};

use super::{ApiClient, ApiRequest, ApiResult};

impl ApiClient {
    /// Public route; the token goes along when logged in
    pub async fn get_cities(&self) -> ApiResult<Vec<City>> {
        self.fetch(ApiRequest::get("/public/cities").token_if_present(), "cities")
            .await
    }

    pub async fn get_city(&self, city_id: Id) -> ApiResult<City> {
        self.fetch(ApiRequest::get(format!("/city/{}", city_id)), "city")
            .await
    }

    pub async fn create_city(&self, city: &NameRequest) -> ApiResult<City> {
        self.fetch(ApiRequest::post("/city").json(city)?, "city").await
    }

    pub async fn edit_city(&self, city_id: Id, city: &NameRequest) -> ApiResult<City> {
        self.fetch(ApiRequest::put(format!("/city/{}", city_id)).json(city)?, "city")
            .await
    }

    pub async fn delete_city(&self, city_id: Id) -> ApiResult<City> {
        self.fetch(ApiRequest::delete(format!("/city/{}", city_id)), "city")
            .await
    }
}
