//! Filter, sort and page pipeline for the overview pages.
//!
//! Every function here is pure: it reads a borrowed slice and returns a new `Vec`,
//! so a record set shared between concurrent requests is never reordered in place.

use serde::Deserialize;
use std::cmp::Ordering;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use utoipa::IntoParams;

use crate::models::{Pokemon, Trainer};

/// Sort token that resolves to the nested trainer name on a Pokémon.
pub const TRAINER_SORT_FIELD: &str = "trainer";
pub const DEFAULT_SORT_FIELD: &str = "name";
pub const MAX_PAGE_SIZE: usize = 100;

/// ListQuery
///
/// The raw, untyped query string of `GET /pokemon` and `GET /trainer`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive substring matched against the record name.
    pub filter_name: Option<String>,
    /// Field to sort on (default "name"; "trainer" sorts Pokémon by trainer name).
    pub sort_field: Option<String>,
    /// "asc" or "desc"; anything else sorts ascending.
    pub sort_direction: Option<String>,
    /// Comma-separated columns the client should hide.
    pub hidden_fields: Option<String>,
    /// 1-based page number, only used together with `limit`.
    pub page: Option<usize>,
    /// Page size, clamped to 1..=100.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// "desc" in any case selects descending order. Anything else, or nothing, is ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Page
///
/// A resolved paging window. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub limit: usize,
}

/// ListParams
///
/// `ListQuery` after interpretation: defaults applied, tokens normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub filter_name: String,
    pub sort_field: String,
    pub direction: SortDirection,
    pub hidden_fields: Vec<String>,
    pub page: Option<Page>,
}

impl From<&ListQuery> for ListParams {
    fn from(query: &ListQuery) -> Self {
        let sort_field = query
            .sort_field
            .as_deref()
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .unwrap_or(DEFAULT_SORT_FIELD)
            .to_string();

        let hidden_fields = query
            .hidden_fields
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|field| !field.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let page = query.limit.map(|limit| Page {
            page: query.page.unwrap_or(1).max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        });

        Self {
            filter_name: query.filter_name.clone().unwrap_or_default(),
            sort_field,
            direction: SortDirection::parse(query.sort_direction.as_deref()),
            hidden_fields,
            page,
        }
    }
}

/// FieldValue
///
/// A sortable view of one record field. Fields that are neither text nor integers
/// (flags, lists) have no `FieldValue` and therefore never reorder records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(i64),
}

/// Queryable
///
/// Implemented by every record type the pipeline can list.
pub trait Queryable {
    fn name(&self) -> &str;

    /// Resolves a sort token to a value. Unknown tokens return `None`.
    fn field(&self, field: &str) -> Option<FieldValue<'_>>;
}

impl Queryable for Pokemon {
    fn name(&self) -> &str {
        &self.name
    }

    fn field(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "id" => Some(FieldValue::Text(&self.id)),
            "name" => Some(FieldValue::Text(&self.name)),
            "description" => Some(FieldValue::Text(&self.description)),
            "age" => Some(FieldValue::Number(i64::from(self.age))),
            "birthDate" => Some(FieldValue::Text(&self.birth_date)),
            "imageUrl" => Some(FieldValue::Text(&self.image_url)),
            "rarity" => Some(FieldValue::Text(&self.rarity)),
            // Pokémon embed a trainer reference, so "trainer" means the nested name.
            TRAINER_SORT_FIELD | "trainerAffiliation.name" => {
                Some(FieldValue::Text(&self.trainer_affiliation.name))
            }
            _ => None,
        }
    }
}

impl Queryable for Trainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn field(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "id" => Some(FieldValue::Text(&self.id)),
            "name" => Some(FieldValue::Text(&self.name)),
            "description" => Some(FieldValue::Text(&self.description)),
            "age" => Some(FieldValue::Number(i64::from(self.age))),
            "birthDate" => Some(FieldValue::Text(&self.birth_date)),
            "imageUrl" => Some(FieldValue::Text(&self.image_url)),
            "region" => Some(FieldValue::Text(&self.region)),
            _ => None,
        }
    }
}

/// Base letters only: decomposed, accents dropped, lowercased.
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Decomposed and lowercased, accents kept.
fn accented_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

/// Locale-style string ordering in three levels: base letters ignoring accents and
/// case ("Éevee" sorts among the E names), then accents (unaccented first), then
/// case (lowercase first).
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| accented_letters(a).cmp(accented_letters(b)))
        .then_with(|| b.cmp(a))
}

/// Compares two resolved field values. Missing values and mismatched kinds are equal.
pub fn compare_values(a: Option<FieldValue<'_>>, b: Option<FieldValue<'_>>) -> Ordering {
    match (a, b) {
        (Some(FieldValue::Text(a)), Some(FieldValue::Text(b))) => locale_cmp(a, b),
        (Some(FieldValue::Number(a)), Some(FieldValue::Number(b))) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Keeps the records whose name contains `needle`, ignoring case. An empty needle
/// keeps everything.
pub fn filter_by_name<T>(records: &[T], needle: &str) -> Vec<T>
where
    T: Queryable + Clone,
{
    let needle = needle.to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| record.name().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Returns a stably sorted copy of `records`. Ties (including every pair under an
/// unknown field) keep their original relative order in both directions.
pub fn sort_records<T>(records: &[T], field: &str, direction: SortDirection) -> Vec<T>
where
    T: Queryable + Clone,
{
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = compare_values(a.field(field), b.field(field));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    sorted
}

/// Cuts the requested window out of an already ordered sequence. Page 0 reads as page 1.
pub fn paginate<T>(records: Vec<T>, page: Option<Page>) -> Vec<T> {
    match page {
        Some(Page { page, limit }) => records
            .into_iter()
            .skip(page.saturating_sub(1).saturating_mul(limit))
            .take(limit)
            .collect(),
        None => records,
    }
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct QueryOutcome<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Filter, then sort, then page.
pub fn run<T>(records: &[T], params: &ListParams) -> QueryOutcome<T>
where
    T: Queryable + Clone,
{
    let filtered = filter_by_name(records, &params.filter_name);
    let sorted = sort_records(&filtered, &params.sort_field, params.direction);
    let total = sorted.len();
    QueryOutcome {
        items: paginate(sorted, params.page),
        total,
    }
}
