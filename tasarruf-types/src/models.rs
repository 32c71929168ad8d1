use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::AccountType;

/// Numeric primary key as issued by the backend.
pub type Id = u64;

// Lenient serde module for backend timestamps. Zero-value or malformed
// timestamps decode as `None` instead of failing the whole envelope.
mod optional_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        Ok(s.and_then(|s| s.parse::<DateTime<Utc>>().ok()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "ID")]
    pub id: Id,
    #[serde(rename = "englishName")]
    pub english_name: String,
    #[serde(rename = "turkishName")]
    pub turkish_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(rename = "ID", default)]
    pub id: Id,
    #[serde(rename = "englishName")]
    pub english_name: String,
    #[serde(rename = "turkishName")]
    pub turkish_name: String,
}

/// Subscription plan. The backend's JSON names for the Turkish name and the
/// English description are misspelled; they are kept on the wire only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "ID", default)]
    pub id: Id,
    #[serde(rename = "CreatedAt", default, with = "optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "englishName")]
    pub english_name: String,
    #[serde(rename = "engishDescription", default)]
    pub english_description: String,
    #[serde(rename = "trukishName")]
    pub turkish_name: String,
    #[serde(rename = "turkishDescription", default)]
    pub turkish_description: String,
    pub price: f64,
    #[serde(rename = "countOfOffers")]
    pub count_of_offers: u32,
    #[serde(default)]
    pub image: String,
    /// Display order on the mobile clients
    #[serde(default)]
    pub rank: u32,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "planID")]
    pub plan_id: Id,
    #[serde(rename = "expireDate", default, with = "optional_datetime")]
    pub expire_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plan: Option<Plan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerProfile {
    #[serde(rename = "ID", default)]
    pub id: Id,
    #[serde(rename = "partnerID", default)]
    pub partner_id: Id,
    #[serde(default)]
    pub approved: bool,
    #[serde(rename = "discountValue", default)]
    pub discount_value: f64,
    #[serde(rename = "categoryID", alias = "categroryID", default)]
    pub category_id: Id,
    #[serde(rename = "mainBranchAddress", default)]
    pub main_branch_address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: Option<City>,
    #[serde(default)]
    pub country: String,
    #[serde(rename = "brandName", default)]
    pub brand_name: String,
    #[serde(rename = "offerDiscription", default)]
    pub offer_description: String,
    #[serde(rename = "licenceURL", default)]
    pub licence_url: Option<String>,
}

/// Any account on the platform: admin, customer or partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: Id,
    #[serde(rename = "CreatedAt", default, with = "optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(rename = "accountType", default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub country: String,
    #[serde(rename = "cityID", default)]
    pub city_id: Id,
    #[serde(rename = "dateOfBirth", default, with = "optional_datetime")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(rename = "profileImageURL", default)]
    pub profile_image_url: String,
    #[serde(rename = "partnerProfile", default)]
    pub partner_profile: Option<PartnerProfile>,
    #[serde(rename = "Subscription", default)]
    pub subscription: Option<Subscription>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Profile of the logged in operator. Same record as any other user; only
/// `AccountType::Admin` accounts may hold a dashboard session.
pub type Admin = User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "ID")]
    pub id: Id,
    #[serde(rename = "CreatedAt", default, with = "optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "customerID", default)]
    pub customer_id: Id,
    #[serde(rename = "partnerID", default)]
    pub partner_id: Id,
    #[serde(rename = "subscriptionID", default)]
    pub subscription_id: Id,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(rename = "ID", default)]
    pub id: Id,
    #[serde(default)]
    pub country: String,
    #[serde(rename = "cityID", default)]
    pub city_id: Id,
    #[serde(default)]
    pub city: Option<City>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(rename = "ownerID", default)]
    pub owner_id: Id,
    #[serde(rename = "categoryID", default)]
    pub category_id: Id,
    #[serde(default)]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportInfo {
    pub email: String,
    pub mobile: String,
}

// Request/Response types for API

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForgetPasswordRequest {
    pub mobile: String,
}

/// Body for category and city create/edit calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRequest {
    #[serde(rename = "englishName")]
    pub english_name: String,
    #[serde(rename = "turkishName")]
    pub turkish_name: String,
}

/// Body for plan create/update. The write path uses correctly spelled keys,
/// unlike the read path on `Plan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(rename = "englishName")]
    pub english_name: String,
    #[serde(rename = "turkishName")]
    pub turkish_name: String,
    #[serde(rename = "englishDescription")]
    pub english_description: String,
    #[serde(rename = "turkishDescription")]
    pub turkish_description: String,
    pub price: f64,
    #[serde(rename = "countOfOffers")]
    pub count_of_offers: u32,
    pub image: String,
    #[serde(rename = "isDefault")]
    pub is_default: bool,
}

impl From<&Plan> for PlanRequest {
    fn from(plan: &Plan) -> Self {
        Self {
            english_name: plan.english_name.clone(),
            turkish_name: plan.turkish_name.clone(),
            english_description: plan.english_description.clone(),
            turkish_description: plan.turkish_description.clone(),
            price: plan.price,
            count_of_offers: plan.count_of_offers,
            image: plan.image.clone(),
            is_default: plan.is_default,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupportInfoRequest {
    pub email: String,
    pub mobile: String,
}

/// Standard error body returned by the backend on any non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}
