//! Parsing for `#[derive(Bind)]` inputs and `#[bind(...)]` field attributes.

use proc_macro2::Span;
use syn::{
    punctuated::Punctuated, spanned::Spanned, Attribute, Data, DeriveInput, Expr, ExprLit,
    Fields, Generics, Ident, Lit, Meta, Token, Type,
};

/// Request source named by a field attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAttr {
    /// `path = "..."`
    Path,
    /// `query = "..."`
    Query,
    /// `header = "..."`
    Header,
}

/// One `(source, key)` pair, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    /// Where the value comes from.
    pub source: SourceAttr,
    /// Key looked up in that source.
    pub key: String,
}

/// Parsed `#[bind(...)]` attributes of one field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Declared sources, in declaration order.
    pub sources: Vec<SourceKey>,
    /// Query sequences use repeated keys.
    pub explode: bool,
    /// Body sink content type.
    pub body: Option<String>,
    /// Recurse into the field as a nested record.
    pub nested: bool,
    /// Body merge key override.
    pub json: Option<String>,
    /// Exclude the field from the body merge.
    pub json_skip: bool,
}

impl FieldAttrs {
    /// Collects every `#[bind(...)]` attribute on a field; `span` locates
    /// errors that involve more than one attribute.
    pub fn from_attrs(attrs: &[Attribute], span: Span) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("bind")) {
            let metas: Punctuated<Meta, Token![,]> =
                attr.parse_args_with(Punctuated::parse_terminated)?;
            for meta in metas {
                parsed.apply(meta)?;
            }
        }

        parsed.validate(span)?;
        Ok(parsed)
    }

    fn apply(&mut self, meta: Meta) -> syn::Result<()> {
        match meta {
            Meta::Path(path) => {
                let ident = path
                    .get_ident()
                    .ok_or_else(|| syn::Error::new(path.span(), "expected identifier"))?
                    .to_string();
                match ident.as_str() {
                    "explode" => self.explode = true,
                    "nested" => self.nested = true,
                    "json_skip" => self.json_skip = true,
                    _ => {
                        return Err(syn::Error::new(
                            path.span(),
                            format!("unknown bind attribute: {ident}"),
                        ))
                    }
                }
            }
            Meta::NameValue(nv) => {
                let ident = nv
                    .path
                    .get_ident()
                    .ok_or_else(|| syn::Error::new(nv.path.span(), "expected identifier"))?
                    .to_string();

                let value = match &nv.value {
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) => s.value(),
                    _ => {
                        return Err(syn::Error::new(
                            nv.value.span(),
                            "expected string literal",
                        ))
                    }
                };
                if value.is_empty() {
                    return Err(syn::Error::new(
                        nv.value.span(),
                        format!("{ident} must not be empty"),
                    ));
                }

                match ident.as_str() {
                    "path" => self.push_source(SourceAttr::Path, value),
                    "query" => self.push_source(SourceAttr::Query, value),
                    "header" => self.push_source(SourceAttr::Header, value),
                    "body" => self.body = Some(value),
                    "json" => self.json = Some(value),
                    _ => {
                        return Err(syn::Error::new(
                            nv.path.span(),
                            format!("unknown bind attribute: {ident}"),
                        ))
                    }
                }
            }
            Meta::List(list) => {
                return Err(syn::Error::new(list.span(), "expected name = value or flag"))
            }
        }
        Ok(())
    }

    fn push_source(&mut self, source: SourceAttr, key: String) {
        self.sources.push(SourceKey { source, key });
    }

    fn validate(&self, span: Span) -> syn::Result<()> {
        if self.nested && !self.sources.is_empty() {
            return Err(syn::Error::new(
                span,
                "nested fields cannot also bind path, query or header values",
            ));
        }
        if self.explode && !self.sources.iter().any(|s| s.source == SourceAttr::Query) {
            return Err(syn::Error::new(span, "explode requires a query source"));
        }
        if self.json_skip && self.json.is_some() {
            return Err(syn::Error::new(span, "json and json_skip are mutually exclusive"));
        }
        Ok(())
    }

    /// Returns true if the walker assigns the field from request values.
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// A parsed record field.
#[derive(Debug)]
pub struct BindField {
    /// Field identifier.
    pub ident: Ident,
    /// Declared type.
    pub ty: Type,
    /// Parsed attributes.
    pub attrs: FieldAttrs,
}

impl BindField {
    /// Field name without a raw identifier prefix.
    pub fn name(&self) -> String {
        let name = self.ident.to_string();
        name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
    }

    /// Body merge key, or `None` when the field is skipped.
    pub fn body_key(&self) -> Option<String> {
        if self.attrs.json_skip {
            None
        } else {
            Some(self.attrs.json.clone().unwrap_or_else(|| self.name()))
        }
    }

    /// Declared type as compact text, e.g. `Vec<String>`.
    pub fn type_name(&self) -> String {
        let ty = &self.ty;
        quote::quote!(#ty).to_string().replace(' ', "")
    }
}

/// A parsed `#[derive(Bind)]` input.
#[derive(Debug)]
pub struct BindInput {
    /// Record name.
    pub ident: Ident,
    /// Record generics.
    pub generics: Generics,
    /// Named fields in declaration order.
    pub fields: Vec<BindField>,
}

impl BindInput {
    /// Parses a derive input, accepting only structs with named fields.
    pub fn parse(input: DeriveInput) -> syn::Result<Self> {
        let named = match input.data {
            Data::Struct(data) => match data.fields {
                Fields::Named(named) => named.named,
                Fields::Unit => Punctuated::new(),
                Fields::Unnamed(fields) => {
                    return Err(syn::Error::new(
                        fields.span(),
                        "Bind requires a struct with named fields",
                    ))
                }
            },
            Data::Enum(data) => {
                return Err(syn::Error::new(
                    data.enum_token.span,
                    "Bind can only be derived for structs",
                ))
            }
            Data::Union(data) => {
                return Err(syn::Error::new(
                    data.union_token.span,
                    "Bind can only be derived for structs",
                ))
            }
        };

        let fields = named
            .into_iter()
            .map(|field| {
                let attrs = FieldAttrs::from_attrs(&field.attrs, field.span())?;
                let ident = field
                    .ident
                    .ok_or_else(|| syn::Error::new(Span::call_site(), "expected named field"))?;
                Ok(BindField {
                    ident,
                    ty: field.ty,
                    attrs,
                })
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            ident: input.ident,
            generics: input.generics,
            fields,
        })
    }
}
