use serde::{Deserialize, Serialize};

/// Account type carried on every user record.
///
/// The backend stores this as a free-form string; anything we do not
/// recognise is kept verbatim in `Other` so a newer server does not break
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    Admin,
    /// Customer account. The wire value is `user`.
    Customer,
    Partner,
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Admin => "admin",
            AccountType::Customer => "user",
            AccountType::Partner => "partner",
            AccountType::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => AccountType::Admin,
            "user" => AccountType::Customer,
            "partner" => AccountType::Partner,
            other => AccountType::Other(other.to_string()),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccountType::Admin)
    }
}

impl From<String> for AccountType {
    fn from(s: String) -> Self {
        AccountType::parse(&s)
    }
}

impl From<AccountType> for String {
    fn from(t: AccountType) -> Self {
        t.as_str().to_string()
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Other(String::new())
    }
}
