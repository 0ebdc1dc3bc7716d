//! Product listing queries and page envelopes.
//!
//! Listing parameters are translated into exactly one [`ProductQuery`]
//! shape plus a validated [`PageRequest`]. Both store implementations
//! evaluate the same shape, so in-memory and PostgreSQL listings agree.

use std::cmp::Ordering;

use domain::{Product, ValidationErrors};
use serde::Serialize;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Product columns a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Price,
    StockQuantity,
    Sku,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Parses a request field name; both camelCase and snake_case are accepted.
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "id" => Some(SortField::Id),
            "name" => Some(SortField::Name),
            "price" => Some(SortField::Price),
            "stockQuantity" | "stock_quantity" => Some(SortField::StockQuantity),
            "sku" => Some(SortField::Sku),
            "createdAt" | "created_at" => Some(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    /// Column name in the `products` table.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::StockQuantity => "stock_quantity",
            SortField::Sku => "sku",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Price => a.price.cmp(&b.price),
            SortField::StockQuantity => a.stock_quantity.cmp(&b.stock_quantity),
            SortField::Sku => a.sku.cmp(&b.sku),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` in any case sorts descending; anything else ascending.
    pub fn parse(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort order of a listing. Ties are broken by ascending id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    /// Orders two products by this sort, then by id.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.direction {
            SortDirection::Asc => self.field.compare(a, b),
            SortDirection::Desc => self.field.compare(b, a),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    /// `ORDER BY` clause for a query aliasing `products` as `p`.
    ///
    /// Text columns sort with the `C` collation, i.e. by code point, which is
    /// the order `String` comparison gives the in-memory store.
    pub fn order_by_clause(&self) -> String {
        let column = self.field.column();
        let collate = match self.field {
            SortField::Name | SortField::Sku => " COLLATE \"C\"",
            _ => "",
        };
        if self.field == SortField::Id {
            format!("ORDER BY p.id {}", self.direction.keyword())
        } else {
            format!(
                "ORDER BY p.{column}{collate} {}, p.id ASC",
                self.direction.keyword()
            )
        }
    }
}

/// A validated page index, page size and sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: Sort,
}

impl PageRequest {
    /// Validates raw listing parameters.
    pub fn new(page: i64, size: i64, sort_by: &str, sort_dir: &str) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let page = u32::try_from(page).unwrap_or_else(|_| {
            errors.add("page", "Page index must not be negative");
            0
        });
        let size = match u32::try_from(size) {
            Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
            _ => {
                errors.add(
                    "size",
                    format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
                );
                1
            }
        };
        let field = SortField::parse(sort_by).unwrap_or_else(|| {
            errors.add("sortBy", format!("Cannot sort by '{sort_by}'"));
            SortField::Id
        });

        errors.into_result()?;

        Ok(Self {
            page,
            size,
            sort: Sort {
                field,
                direction: SortDirection::parse(sort_dir),
            },
        })
    }

    /// First page, sorted by id, holding up to `size` rows.
    pub fn first(size: u32) -> Self {
        Self {
            page: 0,
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort: Sort::default(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }

    /// Number of rows preceding this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// The four listing shapes, chosen by which filters are present.
///
/// Needles are stored trimmed and lowercased; blank filters count as absent.
/// Every shape only matches active products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductQuery {
    /// Every active product.
    All,
    /// Category name contains the needle.
    Category(String),
    /// Name, description or SKU contains the needle.
    Search(String),
    /// Both of the above.
    CategoryAndSearch { category: String, search: String },
}

impl ProductQuery {
    /// Selects the query shape: both filters, category only, search only, or neither.
    pub fn from_filters(category: Option<&str>, search: Option<&str>) -> Self {
        match (normalize(category), normalize(search)) {
            (Some(category), Some(search)) => ProductQuery::CategoryAndSearch { category, search },
            (Some(category), None) => ProductQuery::Category(category),
            (None, Some(search)) => ProductQuery::Search(search),
            (None, None) => ProductQuery::All,
        }
    }

    /// Lowercased category needle, if this shape filters by category.
    pub fn category(&self) -> Option<&str> {
        match self {
            ProductQuery::Category(category)
            | ProductQuery::CategoryAndSearch { category, .. } => Some(category),
            _ => None,
        }
    }

    /// Lowercased search needle, if this shape filters by text.
    pub fn search(&self) -> Option<&str> {
        match self {
            ProductQuery::Search(search) | ProductQuery::CategoryAndSearch { search, .. } => {
                Some(search)
            }
            _ => None,
        }
    }

    /// Evaluates the shape against one product and its category name.
    pub fn matches(&self, product: &Product, category_name: &str) -> bool {
        if !product.active {
            return false;
        }

        let category_ok = self
            .category()
            .is_none_or(|needle| contains_ignore_case(category_name, needle));
        let search_ok = self.search().is_none_or(|needle| {
            contains_ignore_case(&product.name, needle)
                || product
                    .description
                    .as_deref()
                    .is_some_and(|d| contains_ignore_case(d, needle))
                || contains_ignore_case(&product.sku, needle)
        });

        category_ok && search_ok
    }
}

fn normalize(filter: Option<&str>) -> Option<String> {
    filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase)
}

// Unicode lowercasing. PostgreSQL `lower()` follows the database locale,
// so the two stores can disagree on case folding outside ASCII.
fn contains_ignore_case(haystack: &str, lowercase_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowercase_needle)
}

/// One page of results plus the metadata clients need to paginate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
    pub number_of_elements: usize,
}

impl<T> Page<T> {
    /// Wraps the rows of `request`'s page out of `total_elements` matches.
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size());
        let total_pages = total_elements.div_ceil(size);
        let page = u64::from(request.page());
        Self {
            page_number: request.page(),
            page_size: request.size(),
            total_elements,
            total_pages,
            first: page == 0,
            last: page + 1 >= total_pages,
            empty: content.is_empty(),
            number_of_elements: content.len(),
            content,
        }
    }

    /// Maps every row, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
            empty: self.empty,
            number_of_elements: self.number_of_elements,
        }
    }
}
