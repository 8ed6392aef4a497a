use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

mod bindings;

/// Derive macro for the Schematic trait.
///
/// Generates `bindings()`, the table of field keys, declared types and
/// accessors the schema builder walks. Only structs with named or positional
/// fields are supported; tuple-struct fields use their index as key.
///
/// Fields held as `Option<T>`, `Box<T>` or `Option<Box<T>>` are bound to `T`;
/// an empty `Option` counts as an absent value. Fields whose value type does
/// not implement `Schematic`, or cannot be named as one at all (references,
/// trait objects, function pointers, arrays, tuples), are recorded as
/// unresolved and left out of the schema.
///
/// # Example
///
/// ```ignore
/// use tagschema_core::Schematic;
///
/// #[derive(Default, Schematic)]
/// struct Player {
///     name: String,
///     #[schematic(rename = "hp")]
///     health: i32,
///     #[schematic(ignore)]
///     cached_rank: Option<u32>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[schematic(ignore)]` - Leave this field out of every schema
/// - `#[schematic(rename = "key")]` - Use a different document key
/// - `#[schematic(crate = "path")]` on the struct - Path to `tagschema_core`
#[proc_macro_derive(Schematic, attributes(schematic))]
pub fn derive_schematic(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_schematic_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_schematic_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let crate_path = parse_crate_path(&input.attrs)?;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Schematic bounds for every type parameter
    let where_clause = build_where_clause(&input.generics, where_clause, &crate_path);

    let bindings_impl = bindings::generate_bindings(input, &crate_path)?;

    Ok(quote! {
        impl #impl_generics #crate_path::Schematic for #name #ty_generics #where_clause {
            #bindings_impl
        }
    })
}

fn build_where_clause(
    generics: &syn::Generics,
    existing: Option<&syn::WhereClause>,
    crate_path: &proc_macro2::TokenStream,
) -> proc_macro2::TokenStream {
    let type_params: Vec<_> = generics.type_params().map(|p| &p.ident).collect();

    if type_params.is_empty() && existing.is_none() {
        return quote! {};
    }

    let schematic_bounds = type_params.iter().map(|p| {
        quote! { #p: #crate_path::Schematic }
    });

    let existing_predicates = existing
        .map(|w| {
            let predicates = w.predicates.iter();
            quote! { #(#predicates,)* }
        })
        .unwrap_or_default();

    quote! {
        where
            #existing_predicates
            #(#schematic_bounds),*
    }
}

fn parse_crate_path(attrs: &[syn::Attribute]) -> syn::Result<proc_macro2::TokenStream> {
    let mut path = None;

    for attr in attrs {
        if !attr.path().is_ident("schematic") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let value: syn::LitStr = meta.value()?.parse()?;
                let parsed: syn::Path = value.parse()?;
                path = Some(quote! { #parsed });
                Ok(())
            } else {
                Err(meta.error("unknown schematic container attribute"))
            }
        })?;
    }

    Ok(path.unwrap_or_else(|| quote! { ::tagschema_core }))
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub ignore: bool,
    pub rename: Option<String>,
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("schematic") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ignore") {
                result.ignore = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else {
                return Err(meta.error("unknown schematic field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}
