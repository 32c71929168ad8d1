use serde::Deserialize;
use tasarruf_types::{Category, Id, Plan, PlanRequest};

use super::{ApiClient, ApiRequest, ApiResult};

const ASSOCIATION_PATH: &str = "/admin/associate-plan-category";

#[derive(Debug, Deserialize)]
struct UpgradedSubscription {
    plan: Plan,
}

impl ApiClient {
    pub async fn get_plans(&self) -> ApiResult<Vec<Plan>> {
        self.fetch(ApiRequest::get("/plans"), "plans").await
    }

    pub async fn create_plan(&self, plan: &PlanRequest) -> ApiResult<Plan> {
        self.fetch(ApiRequest::post("/plans").json(plan)?, "plan").await
    }

    pub async fn update_plan(&self, plan_id: Id, plan: &PlanRequest) -> ApiResult<Plan> {
        self.fetch(ApiRequest::put(format!("/plans/{}", plan_id)).json(plan)?, "plan")
            .await
    }

    pub async fn delete_plan(&self, plan_id: Id) -> ApiResult<Plan> {
        self.fetch(ApiRequest::delete(format!("/plans/{}", plan_id)), "plan")
            .await
    }

    /// Moves a user onto `plan_id` without payment. Returns the new plan.
    pub async fn admin_upgrade_plan(&self, plan_id: Id, user_id: Id) -> ApiResult<Plan> {
        let subscription: UpgradedSubscription = self
            .fetch(
                ApiRequest::post("/admin/upgrade-plan")
                    .query("userID", user_id)
                    .query("planID", plan_id),
                "subscription",
            )
            .await?;
        Ok(subscription.plan)
    }

    /// Links a category to a plan. Re-adding an existing link is a no-op on
    /// the server, so this POST is retried like a GET.
    pub async fn associate_plan_with_category(&self, plan_id: Id, category_id: Id) -> ApiResult<String> {
        self.fetch(
            ApiRequest::post(ASSOCIATION_PATH)
                .query("planID", plan_id)
                .query("categoryID", category_id)
                .idempotent(),
            "success",
        )
        .await
    }

    pub async fn remove_plan_category_association(&self, plan_id: Id, category_id: Id) -> ApiResult<String> {
        self.fetch(
            ApiRequest::delete(ASSOCIATION_PATH)
                .query("planID", plan_id)
                .query("categoryID", category_id),
            "success",
        )
        .await
    }

    pub async fn get_categories_of_plan(&self, plan_id: Id) -> ApiResult<Vec<Category>> {
        let categories: Option<Vec<Category>> = self
            .fetch(
                ApiRequest::get("/admin/categories").query("planID", plan_id),
                "categories",
            )
            .await?;
        Ok(categories.unwrap_or_default())
    }
}
