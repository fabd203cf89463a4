//! Cart items and their remote wire shape.

use crate::ids::CourseId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display name used when the remote sends a course without one.
pub const UNTITLED_COURSE: &str = "Untitled course";

/// A course waiting to be purchased.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Course id; unique within a cart.
    pub id: CourseId,
    /// Course title.
    pub name: String,
    /// Price the learner pays.
    pub price: Money,
    /// List price before discount, if the course is on sale.
    pub original_price: Option<Money>,
    /// Thumbnail URL or asset key.
    pub thumbnail: Option<String>,
    /// Instructor display name.
    pub instructor: Option<String>,
}

impl CartItem {
    pub fn new(id: impl Into<CourseId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            original_price: None,
            thumbnail: None,
            instructor: None,
        }
    }

    pub fn with_original_price(mut self, original: Money) -> Self {
        self.original_price = Some(original);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_instructor(mut self, instructor: impl Into<String>) -> Self {
        self.instructor = Some(instructor.into());
        self
    }

    /// Amount saved against the original price, when there is a discount.
    pub fn discount(&self) -> Option<Money> {
        let original = self.original_price?;
        original
            .try_subtract(&self.price)
            .filter(Money::is_positive)
    }

    /// Ingest a remote item.
    ///
    /// Returns `None` when the item has no usable identifier. Prices that
    /// are missing, unparseable or negative are read as zero.
    pub fn from_raw(raw: &RawCartItem, currency: Currency) -> Option<Self> {
        let nested = raw.nested_course();
        let course = nested.as_ref();
        let id = raw
            .identifier()
            .or_else(|| course.and_then(RawCartItem::identifier))?;

        let name = raw
            .display_name()
            .or_else(|| course.and_then(RawCartItem::display_name))
            .unwrap_or_else(|| UNTITLED_COURSE.to_string());

        let price = raw
            .price
            .as_ref()
            .or_else(|| course.and_then(|c| c.price.as_ref()))
            .and_then(parse_amount)
            .unwrap_or(0.0);

        let original_price = raw
            .original_price
            .as_ref()
            .or_else(|| course.and_then(|c| c.original_price.as_ref()))
            .and_then(parse_amount)
            .map(|amount| Money::from_decimal(amount, currency));

        Some(Self {
            id: CourseId::new(id),
            name,
            price: Money::from_decimal(price, currency),
            original_price,
            thumbnail: raw
                .thumbnail_ref()
                .or_else(|| course.and_then(RawCartItem::thumbnail_ref)),
            instructor: raw
                .instructor_name()
                .or_else(|| course.and_then(RawCartItem::instructor_name)),
        })
    }
}

/// A cart item exactly as the remote sends it.
///
/// Every field is optional; the backend has shipped several shapes over time
/// (`_id` vs `courseId`, `title` vs `name`, a populated `course` object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartItem {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "_id")]
    pub object_id: Option<Value>,
    #[serde(default)]
    pub course_id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub original_price: Option<Value>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Either a plain name or an object with a `name` field.
    #[serde(default)]
    pub instructor: Option<Value>,
    /// Populated course document, or a bare course id.
    #[serde(default)]
    pub course: Option<Value>,
}

impl RawCartItem {
    fn nested_course(&self) -> Option<RawCartItem> {
        match self.course.as_ref()? {
            Value::Object(_) => self
                .course
                .clone()
                .and_then(|value| serde_json::from_value(value).ok()),
            id @ (Value::String(_) | Value::Number(_)) => Some(RawCartItem {
                course_id: Some(id.clone()),
                ..Default::default()
            }),
            _ => None,
        }
    }

    fn identifier(&self) -> Option<String> {
        [&self.course_id, &self.id, &self.object_id]
            .into_iter()
            .flatten()
            .find_map(id_string)
    }

    fn display_name(&self) -> Option<String> {
        non_blank(self.name.as_deref()).or_else(|| non_blank(self.title.as_deref()))
    }

    fn thumbnail_ref(&self) -> Option<String> {
        non_blank(self.thumbnail.as_deref()).or_else(|| non_blank(self.image.as_deref()))
    }

    fn instructor_name(&self) -> Option<String> {
        match self.instructor.as_ref()? {
            Value::String(name) => non_blank(Some(name.as_str())),
            Value::Object(map) => non_blank(map.get("name").and_then(Value::as_str)),
            _ => None,
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
