mod filterable;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Filterable)]
// ============================================================================

/// Derive macro that declares a record's filterable fields.
///
/// Every named field marked with `#[filter]` becomes part of the record's
/// filter schema and is bound by value when a list call evaluates a filter
/// expression against the record. Only `String` and `bool` fields can be
/// marked.
///
/// # Usage
///
/// ```ignore
/// #[derive(Filterable)]
/// struct Api {
///     #[filter]
///     pub project_id: String,
///     #[filter(rename = "api_id")]
///     pub id: String,
///     #[filter]
///     pub deprecated: bool,
///     pub labels: Vec<String>,
/// }
/// ```
///
/// Expands to an implementation of `resource_registry::filter::Filterable`
/// whose schema declares `project_id`, `api_id` and `deprecated`.
#[proc_macro_derive(Filterable, attributes(filter))]
pub fn derive_filterable(input: TokenStream) -> TokenStream {
    filterable::derive_filterable(input)
}
