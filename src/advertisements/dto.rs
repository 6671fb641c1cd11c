use serde::{Deserialize, Serialize};

use crate::{
    db::{Advertisement, AdvertisementChanges, AdvertisementFilter},
    error::AppError,
};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateAdvertisementRequest {
    pub title: String,
    pub description: String,
    pub price: f64,
}

/// Partial update. Ownership cannot be changed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAdvertisementRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub owner: Option<String>,
    pub owner_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct UpdatedAdvertisementResponse {
    pub status: &'static str,
    pub advertisement: Advertisement,
}

pub fn validate_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::InvalidInput("title too long".into()));
    }
    Ok(title.to_string())
}

pub fn validate_description(raw: &str) -> Result<String, AppError> {
    if raw.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::InvalidInput("description too long".into()));
    }
    Ok(raw.to_string())
}

pub fn validate_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::InvalidInput(
            "price must be a non-negative number".into(),
        ));
    }
    Ok(price)
}

impl UpdateAdvertisementRequest {
    pub fn into_changes(self) -> Result<AdvertisementChanges, AppError> {
        Ok(AdvertisementChanges {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            price: self.price.map(validate_price).transpose()?,
        })
    }
}

/// Blank text parameters mean "no filter".
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SearchQuery {
    pub fn into_filter(self) -> Result<AdvertisementFilter, AppError> {
        if self.limit < 1 || self.limit > MAX_PAGE_SIZE {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.offset < 0 {
            return Err(AppError::InvalidInput("offset must not be negative".into()));
        }
        Ok(AdvertisementFilter {
            title: non_blank(self.title),
            description: non_blank(self.description),
            price: self.price,
            owner: non_blank(self.owner),
            owner_id: self.owner_id,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_must_be_finite_and_non_negative() {
        assert_eq!(validate_price(0.0).unwrap(), 0.0);
        assert_eq!(validate_price(19.99).unwrap(), 19.99);
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(validate_title("  Bike  ").unwrap(), "Bike");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn update_rejects_owner_field() {
        let err = serde_json::from_str::<UpdateAdvertisementRequest>(r#"{"owner_id": 3}"#);
        assert!(err.is_err());
        let empty: UpdateAdvertisementRequest = serde_json::from_str("{}").unwrap();
        let changes = empty.into_changes().unwrap();
        assert!(changes.title.is_none() && changes.description.is_none());
        assert!(changes.price.is_none());
    }

    #[test]
    fn search_query_drops_blank_text_and_checks_paging() {
        let query = SearchQuery {
            title: Some("  ".into()),
            description: Some("red".into()),
            price: None,
            owner: Some(String::new()),
            owner_id: Some(4),
            limit: 20,
            offset: 0,
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.title.is_none());
        assert_eq!(filter.description.as_deref(), Some("red"));
        assert!(filter.owner.is_none());
        assert_eq!(filter.owner_id, Some(4));

        let too_big = SearchQuery {
            title: None,
            description: None,
            price: None,
            owner: None,
            owner_id: None,
            limit: MAX_PAGE_SIZE + 1,
            offset: 0,
        };
        assert!(matches!(too_big.into_filter(), Err(AppError::InvalidInput(_))));
    }
}
