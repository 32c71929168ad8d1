//! Client-side filtering and ordering of fetched lists.

use tasarruf_types::{AccountType, Category, City, Id, Offer, User};

/// Rows per page on list screens
pub const PAGE_SIZE: u64 = 10;

/// Anything listed by its English name.
pub trait Named {
    fn english_name(&self) -> &str;
}

impl Named for Category {
    fn english_name(&self) -> &str {
        &self.english_name
    }
}

impl Named for City {
    fn english_name(&self) -> &str {
        &self.english_name
    }
}

/// Sorts by English name, ignoring case. Stable for equal names.
pub fn sort_by_english_name<T: Named>(items: &mut [T]) {
    items.sort_by_cached_key(|item| item.english_name().to_lowercase());
}

/// Offer list filter. A zero or missing id matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferFilter {
    pub customer_id: Option<Id>,
    pub partner_id: Option<Id>,
}

impl OfferFilter {
    pub fn new(customer_id: Option<Id>, partner_id: Option<Id>) -> Self {
        Self {
            customer_id: customer_id.filter(|&id| id > 0),
            partner_id: partner_id.filter(|&id| id > 0),
        }
    }

    /// True when nothing would be filtered out; callers refetch the full list instead.
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.partner_id.is_none()
    }

    pub fn matches(&self, offer: &Offer) -> bool {
        self.customer_id.map_or(true, |id| offer.customer_id == id)
            && self.partner_id.map_or(true, |id| offer.partner_id == id)
    }

    pub fn apply(&self, offers: Vec<Offer>) -> Vec<Offer> {
        offers.into_iter().filter(|o| self.matches(o)).collect()
    }
}

/// Whether `partner_id` is in the exclusive partner list.
pub fn is_exclusive(partner_id: Id, exclusive_partners: &[User]) -> bool {
    exclusive_partners.iter().any(|p| p.id == partner_id)
}

/// Keeps only users of one account type. Search results mix every type.
pub fn filter_by_account_type(users: Vec<User>, account_type: &AccountType) -> Vec<User> {
    users
        .into_iter()
        .filter(|u| &u.account_type == account_type)
        .collect()
}

/// Number of pages needed to show `count` rows.
pub fn page_count(count: u64) -> u64 {
    count.div_ceil(PAGE_SIZE)
}

/// Rows of 1-based `page`. Pages past the end are empty; page 0 is page 1.
pub fn page<T>(items: &[T], page: u64) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
    let start = usize::try_from(start).unwrap_or(usize::MAX).min(items.len());
    let end = start.saturating_add(PAGE_SIZE as usize).min(items.len());
    &items[start..end]
}
