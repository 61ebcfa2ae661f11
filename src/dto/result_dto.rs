use serde::Deserialize;
use validator::Validate;

use crate::dto::{double_option, trim_optional_string};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateResultPayload {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateResultPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}
