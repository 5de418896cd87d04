//! Code generation for `#[derive(Bind)]`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Index};

use crate::parse::{BindField, BindInput, SourceAttr};

/// Expands `#[derive(Bind)]` into `Bind` and `MergeBody` impls.
pub fn expand_bind(item: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(item)?;
    let input = BindInput::parse(input)?;

    let bind_impl = generate_bind_impl(&input);
    let merge_impl = generate_merge_impl(&input);

    Ok(quote! {
        #bind_impl
        #merge_impl
    })
}

fn generate_bind_impl(input: &BindInput) -> TokenStream {
    let ident = &input.ident;
    let type_name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let descriptors = input.fields.iter().map(field_descriptor);
    let visits = input
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| field_visit(index, field));

    quote! {
        impl #impl_generics ::bindery::Bind for #ident #ty_generics #where_clause {
            const SCHEMA: ::bindery::BindingSchema = ::bindery::BindingSchema::record(
                #type_name,
                &[#(#descriptors),*],
            );

            fn bind_fields(
                &mut self,
                walker: &mut ::bindery::StructWalker<'_>,
            ) -> ::core::result::Result<(), ::bindery::BindError> {
                let fields = <Self as ::bindery::Bind>::SCHEMA.fields();
                #(#visits)*
                let _ = (walker, fields);
                ::core::result::Result::Ok(())
            }
        }
    }
}

fn field_descriptor(field: &BindField) -> TokenStream {
    let ty = &field.ty;
    let name = field.name();
    let type_name = field.type_name();

    let kind = if field.attrs.nested {
        quote! { ::bindery::FieldKind::Record(&<#ty as ::bindery::Bind>::SCHEMA) }
    } else if field.attrs.has_sources() {
        quote! { <#ty as ::bindery::BindValue>::SHAPE }
    } else {
        quote! { ::bindery::FieldKind::Opaque }
    };

    let explode = field.attrs.explode;
    let sources = field.attrs.sources.iter().map(|s| {
        let key = &s.key;
        match s.source {
            SourceAttr::Path => quote! { ::bindery::SourceBinding::path(#key) },
            SourceAttr::Query => quote! { ::bindery::SourceBinding::query(#key, #explode) },
            SourceAttr::Header => quote! { ::bindery::SourceBinding::header(#key) },
        }
    });

    let body = match &field.attrs.body {
        Some(content_type) => quote! { ::core::option::Option::Some(#content_type) },
        None => quote! { ::core::option::Option::None },
    };
    let body_key = match field.body_key() {
        Some(key) => quote! { ::core::option::Option::Some(#key) },
        None => quote! { ::core::option::Option::None },
    };

    quote! {
        ::bindery::FieldBinding {
            name: #name,
            type_name: #type_name,
            kind: #kind,
            sources: &[#(#sources),*],
            body: #body,
            body_key: #body_key,
        }
    }
}

fn field_visit(index: usize, field: &BindField) -> TokenStream {
    let ident = &field.ident;
    let index = Index::from(index);
    let mut steps = Vec::new();

    // Nested records are walked before the field's own body annotation.
    if field.attrs.nested {
        steps.push(quote! { walker.descend(&fields[#index], &mut self.#ident)?; });
    }
    if field.attrs.has_sources() {
        steps.push(quote! { walker.bind_value(&fields[#index], &mut self.#ident)?; });
    }
    if field.attrs.body.is_some() {
        steps.push(quote! { walker.bind_body(&fields[#index], &mut self.#ident)?; });
    }

    quote! { #(#steps)* }
}

fn generate_merge_impl(input: &BindInput) -> TokenStream {
    let ident = &input.ident;
    let type_name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let merges = input.fields.iter().filter_map(|field| {
        let key = field.body_key()?;
        let field_ident = &field.ident;
        Some(quote! {
            if let ::core::option::Option::Some(value) = object.remove(#key) {
                ::bindery::MergeBody::merge_json(&mut self.#field_ident, value)?;
            }
        })
    });

    quote! {
        impl #impl_generics ::bindery::MergeBody for #ident #ty_generics #where_clause {
            fn merge_json(
                &mut self,
                value: ::bindery::body::JsonValue,
            ) -> ::core::result::Result<(), ::bindery::body::JsonError> {
                #[allow(unused_mut, unused_variables)]
                let mut object = match ::bindery::body::object_or_null(value, #type_name)? {
                    ::core::option::Option::Some(object) => object,
                    ::core::option::Option::None => return ::core::result::Result::Ok(()),
                };
                #(#merges)*
                ::core::result::Result::Ok(())
            }
        }
    }
}
