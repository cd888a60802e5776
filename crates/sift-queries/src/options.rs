//! Query Options
//!
//! A named bag of paging, ordering, expansion and filtering directives shared
//! by every storage backend. Options keep the order in which they were first
//! set, which is the order they appear in the rendered query string.
//!
//! Setters are permissive: input of the wrong shape is ignored and the prior
//! value kept, so fluent chains never break. Each validating `try_*` variant
//! reports the problem instead.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sift_core::{parse_number, FilterValue, OptionError, OptionResult, ParseResult};
use tracing::debug;
use url::form_urlencoded;

use crate::predicate::Predicate;
use crate::sorts::SortOrder;

/// The value `$inlinecount` carries when set
pub const INLINE_COUNT_ALL_PAGES: &str = "allpages";

/// Option names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionKey {
    Top,
    Skip,
    OrderBy,
    Expand,
    Select,
    InlineCount,
    Filter,
    /// Caller-defined option; never starts with `$`
    Custom(String),
}

impl OptionKey {
    /// Query-string spelling
    pub fn as_str(&self) -> &str {
        match self {
            Self::Top => "$top",
            Self::Skip => "$skip",
            Self::OrderBy => "$orderby",
            Self::Expand => "$expand",
            Self::Select => "$select",
            Self::InlineCount => "$inlinecount",
            Self::Filter => "$filter",
            Self::Custom(name) => name,
        }
    }

    /// Parse a query-string key. Unknown `$` keys are not options.
    pub fn from_wire(key: &str) -> Option<Self> {
        match key {
            "$top" => Some(Self::Top),
            "$skip" => Some(Self::Skip),
            "$orderby" => Some(Self::OrderBy),
            "$expand" => Some(Self::Expand),
            "$select" => Some(Self::Select),
            "$inlinecount" => Some(Self::InlineCount),
            "$filter" => Some(Self::Filter),
            other if other.starts_with('$') || other.is_empty() => None,
            other => Some(Self::Custom(other.to_string())),
        }
    }
}

/// Stored option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// `$top` / `$skip`
    Count(u64),
    /// `$orderby`, `$expand`, `$select`, `$inlinecount`
    Text(String),
    /// `$filter`, always stored parsed
    Filter(Predicate),
    /// Custom option
    Custom(FilterValue),
}

impl OptionValue {
    /// Query-string form of the value
    pub fn render(&self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::Text(text) => text.clone(),
            Self::Filter(predicate) => predicate.to_filter_string(),
            Self::Custom(value) => value.as_text(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Count(n) => Value::from(*n),
            Self::Text(text) => Value::String(text.clone()),
            Self::Filter(predicate) => Value::String(predicate.to_filter_string()),
            Self::Custom(value) => value.to_json(),
        }
    }
}

/// Text accepted by `$orderby`, `$expand` and `$select`: a string, or a list
/// of strings joined with `,`
pub trait OptionText {
    fn into_option_text(self) -> String;
}

impl OptionText for &str {
    fn into_option_text(self) -> String {
        self.to_string()
    }
}

impl OptionText for String {
    fn into_option_text(self) -> String {
        self
    }
}

impl OptionText for &String {
    fn into_option_text(self) -> String {
        self.clone()
    }
}

impl<S: AsRef<str>> OptionText for &[S] {
    fn into_option_text(self) -> String {
        self.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
    }
}

impl<S: AsRef<str>> OptionText for Vec<S> {
    fn into_option_text(self) -> String {
        self.as_slice().into_option_text()
    }
}

impl<S: AsRef<str>, const N: usize> OptionText for [S; N] {
    fn into_option_text(self) -> String {
        self.as_slice().into_option_text()
    }
}

impl OptionText for &SortOrder {
    fn into_option_text(self) -> String {
        self.render()
    }
}

/// Input accepted by `$filter`: filter text (parsed on the way in) or a
/// predicate
pub trait FilterInput {
    fn into_predicate(self) -> ParseResult<Predicate>;
}

impl FilterInput for &str {
    fn into_predicate(self) -> ParseResult<Predicate> {
        Predicate::try_parse(self)
    }
}

impl FilterInput for String {
    fn into_predicate(self) -> ParseResult<Predicate> {
        Predicate::try_parse(&self)
    }
}

impl FilterInput for &String {
    fn into_predicate(self) -> ParseResult<Predicate> {
        Predicate::try_parse(self)
    }
}

impl FilterInput for Predicate {
    fn into_predicate(self) -> ParseResult<Predicate> {
        Ok(self)
    }
}

impl FilterInput for &Predicate {
    fn into_predicate(self) -> ParseResult<Predicate> {
        Ok(self.clone())
    }
}

/// Query options container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    options: Vec<(OptionKey, OptionValue)>,
}

impl QueryOptions {
    /// Create an empty options bag
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Options in set order
    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &OptionValue)> {
        self.options.iter().map(|(key, value)| (key, value))
    }

    pub fn get(&self, key: &OptionKey) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &OptionKey) -> bool {
        self.get(key).is_some()
    }

    /// Store a value, keeping the key's original position when re-set
    fn insert(&mut self, key: OptionKey, value: OptionValue) {
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
    }

    /// Remove an option
    pub fn remove(&mut self, key: &OptionKey) -> Option<OptionValue> {
        let index = self.options.iter().position(|(k, _)| k == key)?;
        Some(self.options.remove(index).1)
    }

    fn count(&self, key: &OptionKey) -> Option<u64> {
        match self.get(key) {
            Some(OptionValue::Count(n)) => Some(*n),
            _ => None,
        }
    }

    fn text(&self, key: &OptionKey) -> Option<&str> {
        match self.get(key) {
            Some(OptionValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn try_set_count(&mut self, key: OptionKey, label: &'static str, n: i64) -> OptionResult<&mut Self> {
        if n < 0 {
            return Err(OptionError::NegativeCount { key: label, value: n });
        }
        self.insert(key, OptionValue::Count(n as u64));
        Ok(self)
    }

    // $top

    /// Maximum number of records to return
    pub fn top(&self) -> Option<u64> {
        self.count(&OptionKey::Top)
    }

    /// Set `$top`; negative values are ignored
    pub fn set_top(&mut self, n: i64) -> &mut Self {
        if let Err(error) = self.try_set_top(n) {
            debug!(key = "$top", error = %error, "Ignoring invalid option value");
        }
        self
    }

    pub fn try_set_top(&mut self, n: i64) -> OptionResult<&mut Self> {
        self.try_set_count(OptionKey::Top, "$top", n)
    }

    pub fn with_top(mut self, n: i64) -> Self {
        self.set_top(n);
        self
    }

    pub fn clear_top(&mut self) -> &mut Self {
        self.remove(&OptionKey::Top);
        self
    }

    // $skip

    /// Number of records to skip before returning
    pub fn skip(&self) -> Option<u64> {
        self.count(&OptionKey::Skip)
    }

    /// Set `$skip`; negative values are ignored
    pub fn set_skip(&mut self, n: i64) -> &mut Self {
        if let Err(error) = self.try_set_skip(n) {
            debug!(key = "$skip", error = %error, "Ignoring invalid option value");
        }
        self
    }

    pub fn try_set_skip(&mut self, n: i64) -> OptionResult<&mut Self> {
        self.try_set_count(OptionKey::Skip, "$skip", n)
    }

    pub fn with_skip(mut self, n: i64) -> Self {
        self.set_skip(n);
        self
    }

    pub fn clear_skip(&mut self) -> &mut Self {
        self.remove(&OptionKey::Skip);
        self
    }

    // $orderby

    /// Raw `$orderby` text
    pub fn order_by(&self) -> Option<&str> {
        self.text(&OptionKey::OrderBy)
    }

    pub fn set_order_by(&mut self, order_by: impl OptionText) -> &mut Self {
        self.insert(OptionKey::OrderBy, OptionValue::Text(order_by.into_option_text()));
        self
    }

    pub fn with_order_by(mut self, order_by: impl OptionText) -> Self {
        self.set_order_by(order_by);
        self
    }

    pub fn clear_order_by(&mut self) -> &mut Self {
        self.remove(&OptionKey::OrderBy);
        self
    }

    /// `$orderby` parsed into criteria; empty when unset
    pub fn sort_order(&self) -> SortOrder {
        self.order_by().map(SortOrder::parse).unwrap_or_default()
    }

    // $expand

    /// Association paths to include
    pub fn expand(&self) -> Option<&str> {
        self.text(&OptionKey::Expand)
    }

    pub fn set_expand(&mut self, expand: impl OptionText) -> &mut Self {
        self.insert(OptionKey::Expand, OptionValue::Text(expand.into_option_text()));
        self
    }

    pub fn with_expand(mut self, expand: impl OptionText) -> Self {
        self.set_expand(expand);
        self
    }

    pub fn clear_expand(&mut self) -> &mut Self {
        self.remove(&OptionKey::Expand);
        self
    }

    // $select

    /// Field projection
    pub fn select(&self) -> Option<&str> {
        self.text(&OptionKey::Select)
    }

    pub fn set_select(&mut self, select: impl OptionText) -> &mut Self {
        self.insert(OptionKey::Select, OptionValue::Text(select.into_option_text()));
        self
    }

    pub fn with_select(mut self, select: impl OptionText) -> Self {
        self.set_select(select);
        self
    }

    pub fn clear_select(&mut self) -> &mut Self {
        self.remove(&OptionKey::Select);
        self
    }

    // $inlinecount

    /// `"allpages"` when a total count is requested
    pub fn inline_count(&self) -> Option<&str> {
        self.text(&OptionKey::InlineCount)
    }

    /// Request (`true`) or stop requesting (`false`) a total count
    pub fn set_inline_count(&mut self, enabled: bool) -> &mut Self {
        if enabled {
            self.insert(
                OptionKey::InlineCount,
                OptionValue::Text(INLINE_COUNT_ALL_PAGES.to_string()),
            );
        } else {
            self.remove(&OptionKey::InlineCount);
        }
        self
    }

    pub fn with_inline_count(mut self, enabled: bool) -> Self {
        self.set_inline_count(enabled);
        self
    }

    pub fn clear_inline_count(&mut self) -> &mut Self {
        self.remove(&OptionKey::InlineCount);
        self
    }

    // $filter

    /// The stored filter tree
    pub fn filter(&self) -> Option<&Predicate> {
        match self.get(&OptionKey::Filter) {
            Some(OptionValue::Filter(predicate)) => Some(predicate),
            _ => None,
        }
    }

    /// Set `$filter`; filter text that fails to parse is ignored
    pub fn set_filter(&mut self, filter: impl FilterInput) -> &mut Self {
        if let Err(error) = self.try_set_filter(filter) {
            debug!(key = "$filter", error = %error, "Ignoring invalid option value");
        }
        self
    }

    pub fn try_set_filter(&mut self, filter: impl FilterInput) -> OptionResult<&mut Self> {
        let predicate = filter.into_predicate()?;
        self.insert(OptionKey::Filter, OptionValue::Filter(predicate));
        Ok(self)
    }

    pub fn with_filter(mut self, filter: impl FilterInput) -> Self {
        self.set_filter(filter);
        self
    }

    pub fn clear_filter(&mut self) -> &mut Self {
        self.remove(&OptionKey::Filter);
        self
    }

    // custom

    /// A caller-defined option
    pub fn custom(&self, name: &str) -> Option<&FilterValue> {
        match self.get(&OptionKey::Custom(name.to_string())) {
            Some(OptionValue::Custom(value)) => Some(value),
            _ => None,
        }
    }

    /// Set a caller-defined option; names starting with `$` are ignored
    pub fn set_custom(&mut self, name: &str, value: impl Into<FilterValue>) -> &mut Self {
        if let Err(error) = self.try_set_custom(name, value) {
            debug!(key = name, error = %error, "Ignoring invalid option value");
        }
        self
    }

    pub fn try_set_custom(
        &mut self,
        name: &str,
        value: impl Into<FilterValue>,
    ) -> OptionResult<&mut Self> {
        if name.is_empty() || name.starts_with('$') {
            return Err(OptionError::ReservedCustomName(name.to_string()));
        }
        self.insert(
            OptionKey::Custom(name.to_string()),
            OptionValue::Custom(value.into()),
        );
        Ok(self)
    }

    pub fn with_custom(mut self, name: &str, value: impl Into<FilterValue>) -> Self {
        self.set_custom(name, value);
        self
    }

    pub fn clear_custom(&mut self, name: &str) -> &mut Self {
        self.remove(&OptionKey::Custom(name.to_string()));
        self
    }

    /// Copy every option of `other` into this bag, overwriting on conflict
    pub fn extend(&mut self, other: &QueryOptions) -> &mut Self {
        for (key, value) in &other.options {
            self.insert(key.clone(), value.clone());
        }
        self
    }

    /// Render as `?key=value&...` in set order; empty when nothing is set.
    /// Values are not percent-encoded.
    pub fn to_query_string(&self) -> String {
        self.render_query(|value| value)
    }

    /// Like `to_query_string`, with every value form-urlencoded
    pub fn to_query_string_encoded(&self) -> String {
        self.render_query(|value| form_urlencoded::byte_serialize(value.as_bytes()).collect())
    }

    fn render_query(&self, encode: impl Fn(String) -> String) -> String {
        if self.options.is_empty() {
            return String::new();
        }
        let pairs = self
            .options
            .iter()
            .map(|(key, value)| format!("{}={}", key.as_str(), encode(value.render())))
            .collect::<Vec<_>>();
        format!("?{}", pairs.join("&"))
    }

    /// Options as a JSON object keyed by query-string spelling
    pub fn to_object(&self) -> Value {
        let map: Map<String, Value> = self
            .options
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Populate from a plain configuration object.
    ///
    /// Keys naming an option setter are applied in object order; other keys
    /// and invalid values are ignored.
    pub fn from_object(object: &Value) -> Self {
        let mut options = Self::new();
        let Some(map) = object.as_object() else {
            debug!("Ignoring non-object query options source");
            return options;
        };
        for (key, value) in map {
            let Some(setter) = setter_for(key) else {
                continue;
            };
            if let Err(error) = setter(&mut options, value) {
                debug!(key = %key, error = %error, "Ignoring invalid option value");
            }
        }
        options
    }

    /// Populate from a plain configuration object, failing on the first
    /// invalid value
    pub fn try_from_object(object: &Value) -> OptionResult<Self> {
        let map = object.as_object().ok_or_else(|| OptionError::WrongType {
            key: "options".to_string(),
            expected: "an object",
        })?;
        let mut options = Self::new();
        for (key, value) in map {
            if let Some(setter) = setter_for(key) {
                setter(&mut options, value)?;
            }
        }
        Ok(options)
    }

    /// Parse a rendered query string (leading `?` optional, values
    /// form-urlencoded or plain). Unknown `$` keys are ignored; other keys
    /// become custom text options.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut options = Self::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let key = key.into_owned();
            let value = value.into_owned();
            match OptionKey::from_wire(&key) {
                Some(OptionKey::Custom(name)) => {
                    options.set_custom(&name, value);
                }
                Some(option) => {
                    let json = match option {
                        OptionKey::Top | OptionKey::Skip => parse_number(&value)
                            .and_then(serde_json::Number::from_f64)
                            .map(Value::Number)
                            .unwrap_or(Value::String(value)),
                        _ => Value::String(value),
                    };
                    if let Some(setter) = setter_for(option.as_str()) {
                        if let Err(error) = setter(&mut options, &json) {
                            debug!(key = %key, error = %error, "Ignoring invalid option value");
                        }
                    }
                }
                None => debug!(key = %key, "Ignoring unknown query option"),
            }
        }
        options
    }
}

type ValueSetter = fn(&mut QueryOptions, &Value) -> OptionResult<()>;

/// Setter table for `from_object`: accessor spellings plus query-string aliases
const SETTERS: &[(&str, ValueSetter)] = &[
    ("$top", set_top_value),
    ("$skip", set_skip_value),
    ("$orderBy", set_order_by_value),
    ("$orderby", set_order_by_value),
    ("$expand", set_expand_value),
    ("$select", set_select_value),
    ("$inlineCount", set_inline_count_value),
    ("$inlinecount", set_inline_count_value),
    ("$filter", set_filter_value),
];

fn setter_for(key: &str) -> Option<ValueSetter> {
    SETTERS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, setter)| *setter)
}

fn count_from_value(key: &'static str, value: &Value) -> OptionResult<i64> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(n) = value.as_u64() {
        return i64::try_from(n).map_err(|_| OptionError::WrongType {
            key: key.to_string(),
            expected: "a non-negative integer",
        });
    }
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Ok(n as i64),
        _ => Err(OptionError::WrongType {
            key: key.to_string(),
            expected: "a non-negative integer",
        }),
    }
}

fn text_from_value(key: &'static str, value: &Value) -> OptionResult<String> {
    let wrong_type = || OptionError::WrongType {
        key: key.to_string(),
        expected: "a string or a list of strings",
    };
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().ok_or_else(wrong_type))
            .collect::<OptionResult<Vec<_>>>()
            .map(|parts| parts.join(",")),
        _ => Err(wrong_type()),
    }
}

fn set_top_value(options: &mut QueryOptions, value: &Value) -> OptionResult<()> {
    if value.is_null() {
        options.clear_top();
        return Ok(());
    }
    options.try_set_top(count_from_value("$top", value)?)?;
    Ok(())
}

fn set_skip_value(options: &mut QueryOptions, value: &Value) -> OptionResult<()> {
    if value.is_null() {
        options.clear_skip();
        return Ok(());
    }
    options.try_set_skip(count_from_value("$skip", value)?)?;
    Ok(())
}

fn set_order_by_value(options: &mut QueryOptions, value: &Value) -> OptionResult<()> {
    if value.is_null() {
        options.clear_order_by();
    } else {
        options.set_order_by(text_from_value("$orderby", value)?);
    }
    Ok(())
}

fn set_expand_value(options: &mut QueryOptions, value: &Value) -> OptionResult<()> {
    if value.is_null() {
        options.clear_expand();
    } else {
        options.set_expand(text_from_value("$expand", value)?);
    }
    Ok(())
}

fn set_select_value(options: &mut QueryOptions, value: &Value) -> OptionResult<()> {
    if value.is_null() {
        options.clear_select();
    } else {
        options.set_select(text_from_value("$select", value)?);
    }
    Ok(())
}

fn set_inline_count_value(options: &mut QueryOptions, value: &Value) -> OptionResult<()> {
    let enabled = !matches!(value, Value::Null | Value::Bool(false));
    options.set_inline_count(enabled);
    Ok(())
}

fn set_filter_value(options: &mut QueryOptions, value: &Value) -> OptionResult<()> {
    match value {
        Value::Null => {
            options.clear_filter();
        }
        Value::String(text) => {
            options.try_set_filter(text)?;
        }
        _ => {
            return Err(OptionError::WrongType {
                key: "$filter".to_string(),
                expected: "filter text",
            })
        }
    }
    Ok(())
}

impl Serialize for QueryOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Value::deserialize(deserializer)?;
        Self::try_from_object(&object).map_err(de::Error::custom)
    }
}
