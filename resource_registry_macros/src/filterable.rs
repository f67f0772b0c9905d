use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, LitStr, Type};

/// A field marked with `#[filter]`.
struct FilterField {
    ident: syn::Ident,
    name: String,
    kind: proc_macro2::TokenStream,
}

pub fn derive_filterable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match extract_filter_fields(&input) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    let names: Vec<&String> = fields.iter().map(|f| &f.name).collect();
    let kinds: Vec<&proc_macro2::TokenStream> = fields.iter().map(|f| &f.kind).collect();
    let idents: Vec<&syn::Ident> = fields.iter().map(|f| &f.ident).collect();

    let expanded = quote! {
        impl resource_registry::filter::Filterable for #name {
            fn filter_schema() -> resource_registry::filter::FilterSchema {
                resource_registry::filter::FilterSchema::new()
                    #( .field(#names, resource_registry::filter::FieldType::#kinds) )*
            }

            fn filter_bindings(&self) -> resource_registry::filter::Bindings {
                let mut bindings = resource_registry::filter::Bindings::new();
                #(
                    bindings.insert(
                        #names.to_string(),
                        resource_registry::filter::FieldValue::from(self.#idents.clone()),
                    );
                )*
                bindings
            }
        }
    };

    TokenStream::from(expanded)
}

fn extract_filter_fields(input: &DeriveInput) -> syn::Result<Vec<FilterField>> {
    let named = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Filterable derive: only structs with named fields are supported",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Filterable derive: only structs are supported",
            ))
        }
    };

    let mut fields = Vec::new();
    for field in named {
        if let Some(filter_field) = parse_field(field)? {
            fields.push(filter_field);
        }
    }
    Ok(fields)
}

fn parse_field(field: &Field) -> syn::Result<Option<FilterField>> {
    let Some(ident) = field.ident.clone() else {
        return Ok(None);
    };

    let mut marked = false;
    let mut rename = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("filter") {
            continue;
        }
        marked = true;

        // Bare `#[filter]` carries no arguments.
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported filter attribute, expected `rename`"))
            }
        })?;
    }

    if !marked {
        return Ok(None);
    }

    let kind = field_kind(&field.ty).ok_or_else(|| {
        syn::Error::new_spanned(
            &field.ty,
            "Filterable derive: #[filter] fields must be `String` or `bool`",
        )
    })?;

    Ok(Some(FilterField {
        name: rename.unwrap_or_else(|| ident.to_string()),
        ident,
        kind,
    }))
}

fn field_kind(ty: &Type) -> Option<proc_macro2::TokenStream> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident == "String" {
        Some(quote!(String))
    } else if segment.ident == "bool" {
        Some(quote!(Bool))
    } else {
        None
    }
}
