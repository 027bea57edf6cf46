//! Typed descriptors for the query-string keys of one state instance.
//!
//! Every key the codec reads or writes is resolved here once, at construction,
//! instead of being concatenated at each call site.

/// Sub-prefix for structured filter keys (`filter_<name>`).
pub const FILTER_PREFIX: &str = "filter_";

/// Sub-prefix for quick filter keys (`quick_<name>`).
pub const QUICK_FILTER_PREFIX: &str = "quick_";

/// Scalar fields of a [`QueryState`](super::QueryState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Page,
    PageSize,
    OrderBy,
    Order,
    Keyword,
    Tab,
}

/// How a field's wire value is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Decimal integer greater than zero.
    PositiveInt,
    /// Opaque string; blank means absent.
    Text,
    /// `asc` or `desc`.
    SortOrder,
}

/// Static description of one scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field this descriptor belongs to.
    pub field: Field,
    /// Key on the wire, before the instance prefix is applied.
    pub wire_key: &'static str,
    /// Decoding rule.
    pub kind: FieldKind,
}

/// All scalar fields, in serialization order.
pub const FIELDS: [FieldDescriptor; 6] = [
    Field::Page.descriptor(),
    Field::PageSize.descriptor(),
    Field::OrderBy.descriptor(),
    Field::Order.descriptor(),
    Field::Keyword.descriptor(),
    Field::Tab.descriptor(),
];

impl Field {
    /// Returns the descriptor for this field.
    #[must_use]
    pub const fn descriptor(self) -> FieldDescriptor {
        let (wire_key, kind) = match self {
            Self::Page => ("page", FieldKind::PositiveInt),
            Self::PageSize => ("limit", FieldKind::PositiveInt),
            Self::OrderBy => ("orderBy", FieldKind::Text),
            Self::Order => ("order", FieldKind::SortOrder),
            Self::Keyword => ("keyword", FieldKind::Text),
            Self::Tab => ("tab", FieldKind::Text),
        };
        FieldDescriptor {
            field: self,
            wire_key,
            kind,
        }
    }

    /// Returns the unprefixed wire key.
    #[must_use]
    pub const fn wire_key(self) -> &'static str {
        self.descriptor().wire_key
    }
}

/// Fully prefixed keys for one state instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKeys {
    prefix: String,
    page: String,
    page_size: String,
    order_by: String,
    order: String,
    keyword: String,
    tab: String,
    filter_prefix: String,
    quick_prefix: String,
}

impl QueryKeys {
    /// Resolve every key for the given instance prefix.
    ///
    /// Surrounding whitespace in the prefix is ignored.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim();
        let key = |field: Field| format!("{prefix}{}", field.wire_key());

        Self {
            prefix: prefix.to_string(),
            page: key(Field::Page),
            page_size: key(Field::PageSize),
            order_by: key(Field::OrderBy),
            order: key(Field::Order),
            keyword: key(Field::Keyword),
            tab: key(Field::Tab),
            filter_prefix: format!("{prefix}{FILTER_PREFIX}"),
            quick_prefix: format!("{prefix}{QUICK_FILTER_PREFIX}"),
        }
    }

    /// The (trimmed) instance prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The prefixed key for a scalar field.
    #[must_use]
    pub fn key(&self, field: Field) -> &str {
        match field {
            Field::Page => &self.page,
            Field::PageSize => &self.page_size,
            Field::OrderBy => &self.order_by,
            Field::Order => &self.order,
            Field::Keyword => &self.keyword,
            Field::Tab => &self.tab,
        }
    }

    /// The prefix shared by all structured filter keys.
    #[must_use]
    pub fn filter_prefix(&self) -> &str {
        &self.filter_prefix
    }

    /// The prefix shared by all quick filter keys.
    #[must_use]
    pub fn quick_prefix(&self) -> &str {
        &self.quick_prefix
    }

    /// Whether `key` belongs to this instance.
    ///
    /// Keys of other instances and unrelated parameters (such as the
    /// `host`/`shop` parameters of an embedded app) are not owned.
    #[must_use]
    pub fn owns(&self, key: &str) -> bool {
        FIELDS.iter().any(|d| self.key(d.field) == key)
            || key.starts_with(&self.filter_prefix)
            || key.starts_with(&self.quick_prefix)
    }
}
