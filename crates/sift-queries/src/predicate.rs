//! Filter Predicates
//!
//! A predicate is a boolean filter tree: either a single condition on a
//! property, or an `and`/`or` group of child predicates. Predicates are plain
//! values; every builder consumes its receiver and returns the new node.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sift_core::FilterValue;

/// Operators a condition can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equals (eq)
    Eq,
    /// Not equals (ne)
    Ne,
    /// Greater than (gt)
    Gt,
    /// Greater than or equal (ge)
    Ge,
    /// Less than (lt)
    Lt,
    /// Less than or equal (le)
    Le,
    /// Case-insensitive substring (substringof)
    Contains,
    /// Case-insensitive prefix (startswith)
    StartsWith,
    /// Case-insensitive suffix (endswith)
    EndsWith,
}

impl Operator {
    /// Parse a comparison operator word
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            _ => None,
        }
    }

    /// Parse a string function name
    pub fn from_function_name(s: &str) -> Option<Self> {
        match s {
            "substringof" => Some(Self::Contains),
            "startswith" => Some(Self::StartsWith),
            "endswith" => Some(Self::EndsWith),
            _ => None,
        }
    }

    /// Wire token: the operator word, or the function name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Contains => "substringof",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }

    /// Whether this operator is written in function-call form
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }
}

/// Logical connective of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupOperator {
    #[default]
    And,
    Or,
}

impl GroupOperator {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// A single property/operator/value condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Dot-separated property path (e.g. "owner.name")
    pub property: String,
    /// The operator to apply
    pub operator: Operator,
    /// The value to compare against
    pub value: FilterValue,
}

impl Condition {
    pub fn new(property: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    /// Filter-text form of this condition
    pub fn render(&self) -> String {
        let value = self.value.escape();
        match self.operator {
            Operator::Contains => format!("substringof({}, {})", value, self.property),
            Operator::StartsWith | Operator::EndsWith => {
                format!("{}({}, {})", self.operator.as_str(), self.property, value)
            }
            op => format!("{} {} {}", self.property, op.as_str(), value),
        }
    }
}

/// A logical combination of child predicates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    /// `None` until a join sets it; evaluated as `and`
    pub operator: Option<GroupOperator>,
    pub children: Vec<Predicate>,
}

impl Group {
    pub fn new(operator: GroupOperator, children: Vec<Predicate>) -> Self {
        Self {
            operator: Some(operator),
            children,
        }
    }

    /// The operator used for evaluation and rendering
    pub fn effective_operator(&self) -> GroupOperator {
        self.operator.unwrap_or_default()
    }
}

/// A boolean filter expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Leaf(Condition),
    Group(Group),
}

impl Default for Predicate {
    /// An empty group with no operator yet
    fn default() -> Self {
        Self::Group(Group::default())
    }
}

impl Predicate {
    /// Create an empty predicate, ready to be joined
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a condition on a property path
    pub fn field(property: impl Into<String>) -> Field {
        Field {
            property: property.into(),
        }
    }

    /// Create a leaf directly
    pub fn condition(
        property: impl Into<String>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self::Leaf(Condition::new(property, operator, value))
    }

    /// Combine with further predicates.
    ///
    /// A leaf receiver becomes the first child of a new group; a group receiver
    /// keeps its children and gains the new ones. `None` items are dropped. The
    /// group operator is replaced when `operator` is given, otherwise it is set
    /// to `and` only if still unset, so `a.and(b).or(c)` is `a or b or c`.
    pub fn join<I, P>(self, others: I, operator: Option<GroupOperator>) -> Predicate
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<Predicate>>,
    {
        let mut group = match self {
            Self::Leaf(condition) => Group {
                operator: None,
                children: vec![Self::Leaf(condition)],
            },
            Self::Group(group) => group,
        };

        for other in others {
            let other: Option<Predicate> = other.into();
            if let Some(predicate) = other {
                group.children.push(predicate);
            }
        }

        match operator {
            Some(op) => group.operator = Some(op),
            None => {
                group.operator.get_or_insert(GroupOperator::And);
            }
        }

        Self::Group(group)
    }

    /// `self and other`
    pub fn and(self, other: Predicate) -> Predicate {
        self.join([other], Some(GroupOperator::And))
    }

    /// `self or other`
    pub fn or(self, other: Predicate) -> Predicate {
        self.join([other], Some(GroupOperator::Or))
    }

    /// Join a list of predicates into one group. `None` for an empty list.
    pub fn join_all<I, P>(predicates: I, operator: Option<GroupOperator>) -> Option<Predicate>
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<Predicate>>,
    {
        let items: Vec<P> = predicates.into_iter().collect();
        if items.is_empty() {
            return None;
        }
        Some(Self::new().join(items, operator))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Self::Leaf(condition) => Some(condition),
            Self::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Leaf(_) => None,
        }
    }

    /// Children of a group; empty for a leaf
    pub fn children(&self) -> &[Predicate] {
        match self {
            Self::Group(group) => &group.children,
            Self::Leaf(_) => &[],
        }
    }

    /// Filter-text form.
    ///
    /// Group children are joined with the group operator; the group itself is
    /// parenthesized only when `nested` is true.
    pub fn render(&self, nested: bool) -> String {
        match self {
            Self::Leaf(condition) => condition.render(),
            Self::Group(group) if group.children.is_empty() => String::new(),
            Self::Group(group) => {
                let separator = format!(" {} ", group.effective_operator().as_str());
                let body = group
                    .children
                    .iter()
                    .map(|child| child.render(true))
                    .collect::<Vec<_>>()
                    .join(&separator);
                if nested {
                    format!("({})", body)
                } else {
                    body
                }
            }
        }
    }

    /// Top-level filter text, as sent in `$filter`
    pub fn to_filter_string(&self) -> String {
        self.render(false)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_filter_string())
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_filter_string())
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Predicate::try_parse(&text).map_err(de::Error::custom)
    }
}

/// A property path waiting for its comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    property: String,
}

impl Field {
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Bind any operator
    pub fn bind(self, operator: Operator, value: impl Into<FilterValue>) -> Predicate {
        Predicate::condition(self.property, operator, value)
    }

    pub fn equals(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::Eq, value)
    }

    pub fn not_equal_to(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::Ne, value)
    }

    pub fn greater_than(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::Gt, value)
    }

    pub fn greater_than_or_equal_to(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::Ge, value)
    }

    pub fn less_than(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::Lt, value)
    }

    pub fn less_than_or_equal_to(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::Le, value)
    }

    pub fn contains(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::Contains, value)
    }

    pub fn starts_with(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::StartsWith, value)
    }

    pub fn ends_with(self, value: impl Into<FilterValue>) -> Predicate {
        self.bind(Operator::EndsWith, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_operator_parsing() {
        assert_eq!(Operator::from_str("eq"), Some(Operator::Eq));
        assert_eq!(Operator::from_str("le"), Some(Operator::Le));
        assert_eq!(Operator::from_str("EQ"), None);
        assert_eq!(Operator::from_str("substringof"), None);
        assert_eq!(
            Operator::from_function_name("substringof"),
            Some(Operator::Contains)
        );
        assert!(Operator::StartsWith.is_function());
        assert!(!Operator::Gt.is_function());
    }

    #[test]
    fn test_comparison_rendering() {
        assert_eq!(Predicate::field("age").greater_than(5).to_string(), "age gt 5");
        assert_eq!(
            Predicate::field("name").equals("John").to_string(),
            "name eq 'John'"
        );
        assert_eq!(
            Predicate::field("active").not_equal_to(false).to_string(),
            "active ne false"
        );
        assert_eq!(
            Predicate::field("owner.name").less_than_or_equal_to("M").to_string(),
            "owner.name le 'M'"
        );
    }

    #[test]
    fn test_function_rendering() {
        assert_eq!(
            Predicate::field("name").contains("oh").to_string(),
            "substringof('oh', name)"
        );
        assert_eq!(
            Predicate::field("name").starts_with("Jo").to_string(),
            "startswith(name, 'Jo')"
        );
        assert_eq!(
            Predicate::field("name").ends_with("hn").to_string(),
            "endswith(name, 'hn')"
        );
    }

    #[test]
    fn test_date_rendering() {
        let date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Predicate::field("added").greater_than_or_equal_to(date).to_string(),
            "added ge '2020-01-01T00:00:00.000Z'"
        );
    }

    #[test]
    fn test_join_leaf_becomes_first_child() {
        let a = Predicate::field("a").equals(1);
        let b = Predicate::field("b").equals(2);
        let joined = a.clone().and(b.clone());

        let group = joined.as_group().unwrap();
        assert_eq!(group.operator, Some(GroupOperator::And));
        assert_eq!(group.children, vec![a, b]);
    }

    #[test]
    fn test_join_defaults_to_and_and_first_join_wins() {
        let a = Predicate::field("a").equals(1);
        let b = Predicate::field("b").equals(2);
        let c = Predicate::field("c").equals(3);

        let joined = a.join([b], None);
        assert_eq!(joined.as_group().unwrap().operator, Some(GroupOperator::And));

        let or_group = Predicate::new().join([c.clone()], Some(GroupOperator::Or));
        let extended = or_group.join([c], None);
        assert_eq!(extended.as_group().unwrap().operator, Some(GroupOperator::Or));
        assert_eq!(extended.children().len(), 2);
    }

    #[test]
    fn test_explicit_operator_overrides_whole_group() {
        let a = Predicate::field("a").equals(1);
        let b = Predicate::field("b").equals(2);
        let c = Predicate::field("c").equals(3);

        let chained = a.and(b).or(c);
        assert_eq!(chained.to_string(), "a eq 1 or b eq 2 or c eq 3");
    }

    #[test]
    fn test_join_drops_none_entries() {
        let a = Predicate::field("a").equals(1);
        let joined = Predicate::new().join(
            vec![Some(a.clone()), None, Some(a.clone())],
            Some(GroupOperator::Or),
        );
        assert_eq!(joined.children().len(), 2);
    }

    #[test]
    fn test_join_all() {
        let empty: Vec<Predicate> = vec![];
        assert!(Predicate::join_all(empty, None).is_none());

        let joined = Predicate::join_all(
            vec![Predicate::field("a").equals(1), Predicate::field("b").equals(2)],
            Some(GroupOperator::Or),
        )
        .unwrap();
        assert_eq!(joined.to_string(), "a eq 1 or b eq 2");
    }

    #[test]
    fn test_nested_rendering() {
        let inner = Predicate::field("a")
            .equals(1)
            .and(Predicate::field("b").equals(2));
        let outer = inner.join([Predicate::field("c").equals(3)], None);
        // Joining onto a group flattens
        assert_eq!(outer.to_string(), "a eq 1 and b eq 2 and c eq 3");

        let inner = Predicate::field("a")
            .equals(1)
            .and(Predicate::field("b").equals(2));
        let outer = Predicate::join_all([inner, Predicate::field("c").equals(3)], Some(GroupOperator::Or))
            .unwrap();
        assert_eq!(outer.to_string(), "(a eq 1 and b eq 2) or c eq 3");
        assert_eq!(outer.render(true), "((a eq 1 and b eq 2) or c eq 3)");
    }

    #[test]
    fn test_empty_group_renders_empty() {
        assert_eq!(Predicate::new().to_string(), "");
        assert!(Predicate::new().is_group());
    }

    #[test]
    fn test_serde_uses_filter_text() {
        let predicate = Predicate::field("name").starts_with("Jo");
        let json = serde_json::to_string(&predicate).unwrap();
        assert_eq!(json, "\"startswith(name, 'Jo')\"");

        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, predicate);

        assert!(serde_json::from_str::<Predicate>("\"a eq\"").is_err());
    }
}
