use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Type};

use crate::parse_field_attrs;

/// How the engine reaches a field's value.
enum FieldShape {
    /// `holder` is the declared field type, `target` the value type inside it.
    Bound { holder: Type, target: Type },
    /// The declared type cannot be named as a schematic type at all.
    Unresolved,
}

/// Generates the `bindings()` method implementation.
pub fn generate_bindings(input: &DeriveInput, crate_path: &TokenStream) -> syn::Result<TokenStream> {
    let data = match &input.data {
        syn::Data::Struct(data) => data,
        syn::Data::Enum(_) | syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Schematic can only be derived for structs",
            ));
        }
    };

    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for (index, field) in data.fields.iter().enumerate() {
        let attrs = parse_field_attrs(&field.attrs)?;
        let member = match &field.ident {
            Some(ident) => quote! { #ident },
            None => {
                let idx = syn::Index::from(index);
                quote! { #idx }
            }
        };
        let key = attrs.rename.clone().unwrap_or_else(|| match &field.ident {
            Some(ident) => ident.to_string(),
            None => index.to_string(),
        });

        if !seen.insert(key.clone()) {
            return Err(syn::Error::new_spanned(
                field,
                format!("duplicate document key `{key}`"),
            ));
        }

        let row = if attrs.ignore {
            quote! { #crate_path::FieldBinding::ignored(#key) }
        } else {
            let ty = &field.ty;
            let type_name = quote! { #ty }.to_string();
            match classify(ty) {
                // Value types without a `Schematic` impl resolve to an
                // unresolved row through the candidate's fallback method.
                FieldShape::Bound { holder, target } => quote! {
                    {
                        #[allow(unused_imports)]
                        use #crate_path::__private::{BindSchematic as _, BindUnresolved as _};
                        (&&#crate_path::__private::FieldCandidate::<Self, #holder, #target>::new())
                            .bind(
                                #key,
                                |owner| &owner.#member,
                                |owner| &mut owner.#member,
                                #type_name,
                            )
                    }
                },
                FieldShape::Unresolved => {
                    quote! { #crate_path::FieldBinding::unresolved(#key, #type_name) }
                }
            }
        };
        rows.push(row);
    }

    Ok(quote! {
        fn bindings() -> ::std::option::Option<::std::vec::Vec<#crate_path::FieldBinding>> {
            ::std::option::Option::Some(::std::vec![#(#rows),*])
        }
    })
}

/// Splits a field type into its holder and value type.
/// `Option<T>`, `Box<T>` and `Option<Box<T>>` hold a `T`.
fn classify(ty: &Type) -> FieldShape {
    let target = match value_type(ty) {
        Some(target) => target,
        None => return FieldShape::Unresolved,
    };
    FieldShape::Bound {
        holder: ty.clone(),
        target,
    }
}

fn value_type(ty: &Type) -> Option<Type> {
    match ty {
        Type::Paren(paren) => value_type(&paren.elem),
        Type::Group(group) => value_type(&group.elem),
        Type::Path(type_path) => {
            if type_path.qself.is_none() {
                if let Some(segment) = type_path.path.segments.last() {
                    match segment.ident.to_string().as_str() {
                        "Option" => {
                            let inner = extract_single_generic_arg(&segment.arguments)?;
                            return match boxed_inner(&inner) {
                                Some(boxed) => nameable(boxed),
                                None => nameable(inner),
                            };
                        }
                        "Box" => {
                            let inner = extract_single_generic_arg(&segment.arguments)?;
                            return nameable(inner);
                        }
                        _ => {}
                    }
                }
            }
            Some(ty.clone())
        }
        // References, pointers, trait objects, fn pointers, arrays, tuples
        _ => None,
    }
}

/// Keeps `ty` only if it is a plain path type.
fn nameable(ty: Type) -> Option<Type> {
    match &ty {
        Type::Path(_) => Some(ty),
        Type::Paren(paren) => nameable((*paren.elem).clone()),
        Type::Group(group) => nameable((*group.elem).clone()),
        _ => None,
    }
}

fn boxed_inner(ty: &Type) -> Option<Type> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Box" {
                return extract_single_generic_arg(&segment.arguments);
            }
        }
    }
    None
}

/// Extract the single generic argument from angle brackets, e.g., T from Vec<T>.
fn extract_single_generic_arg(args: &syn::PathArguments) -> Option<Type> {
    match args {
        syn::PathArguments::AngleBracketed(angle) => {
            if angle.args.len() == 1 {
                if let syn::GenericArgument::Type(ty) = &angle.args[0] {
                    return Some(ty.clone());
                }
            }
            None
        }
        _ => None,
    }
}
