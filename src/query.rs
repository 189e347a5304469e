//! Query model and the JSON request bodies sent to the search service.
use chrono::NaiveDate;
use serde::Serialize;

/// Records returned per page when the caller does not choose a page size.
pub const DEFAULT_PAGE_SIZE: u32 = 10_000;

/// How multiple terms are combined by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    And,
    #[default]
    Or,
}

/// Number of pages to fetch past `page`: a count or every remaining page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pages {
    Count(u32),
    All,
}

impl Serialize for Pages {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Pages::Count(n) => s.serialize_u32(*n),
            Pages::All => s.serialize_str("all"),
        }
    }
}

impl std::str::FromStr for Pages {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Pages::All);
        }
        s.parse::<u32>()
            .map(Pages::Count)
            .map_err(|_| format!("invalid page count: {s} (expected a number or \"all\")"))
    }
}

/// A logical search. Built once, then shared read-only by every source call.
///
/// `types[0]` is the primary type and decides which identity field gets
/// repaired during aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub types: Vec<String>,
    pub operator: Operator,
    pub wildcard: bool,
    pub regex: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: u32,
    pub pages: Option<Pages>,
    pub pagesize: u32,
}

impl SearchQuery {
    /// Query with service defaults: `OR`, no wildcard/regex, first page of
    /// [`DEFAULT_PAGE_SIZE`] records.
    pub fn new<T, U>(terms: T, types: U) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            types: types.into_iter().map(Into::into).collect(),
            operator: Operator::Or,
            wildcard: false,
            regex: false,
            date_from: None,
            date_to: None,
            page: 1,
            pages: None,
            pagesize: DEFAULT_PAGE_SIZE,
        }
    }

    /// Single term of a single type, the shape every convenience search uses.
    pub fn single(term: &str, kind: &str) -> Self {
        Self::new([term], [kind])
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_wildcard(mut self, wildcard: bool) -> Self {
        self.wildcard = wildcard;
        self
    }

    pub fn with_regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn with_paging(mut self, page: u32, pages: Option<Pages>, pagesize: u32) -> Self {
        self.page = page;
        self.pages = pages;
        self.pagesize = pagesize;
        self
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    pub fn primary_term(&self) -> Option<&str> {
        self.terms.first().map(String::as_str)
    }

    /// The reduced query forwarded in multi-source mode: terms and types only,
    /// every other parameter reset to its default.
    pub fn terms_and_types_only(&self) -> Self {
        Self::new(self.terms.clone(), self.types.clone())
    }

    pub(crate) fn search_body<'a>(&'a self, source: &'a str) -> SearchBody<'a> {
        SearchBody {
            terms: &self.terms,
            types: &self.types,
            source,
            wildcard: self.wildcard,
            regex: self.regex,
            operator: self.operator,
            page: self.page,
            pagesize: self.pagesize,
            date_from: self.date_from.map(format_date),
            date_to: self.date_to.map(format_date),
            pages: self.pages,
        }
    }

    pub(crate) fn count_body<'a>(&'a self, source: &'a str) -> CountBody<'a> {
        CountBody {
            terms: &self.terms,
            types: &self.types,
            source,
            wildcard: self.wildcard,
            regex: self.regex,
            operator: self.operator,
            date_from: self.date_from.map(format_date),
            date_to: self.date_to.map(format_date),
        }
    }
}

fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchBody<'a> {
    terms: &'a [String],
    types: &'a [String],
    source: &'a str,
    wildcard: bool,
    regex: bool,
    operator: Operator,
    page: u32,
    pagesize: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<Pages>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CountBody<'a> {
    terms: &'a [String],
    types: &'a [String],
    source: &'a str,
    wildcard: bool,
    regex: bool,
    operator: Operator,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_to: Option<String>,
}
