extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2, TokenTree};
use quote::quote;
use std::collections::HashSet;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericParam, Generics, Ident, Index,
    Type,
};

/// Field attributes parsed from `#[bot(...)]` annotations
///
/// * `name` - The name written on the wire (the field name unless renamed)
/// * `skip` - Whether the field is left out of both `write` and `is_default`
/// * `size` - Explicit size class for collection fields, `Auto` when absent
#[derive(Debug, Clone)]
struct FieldAttributes {
    name: String,
    skip: bool,
    size: Ident,
}

/// Maps the `size = "..."` value onto a `SizeClass` variant name
fn size_class_variant(value: &str) -> Option<&'static str> {
    Some(match value {
        "auto" => "Auto",
        "tiny" => "Tiny",
        "small" => "Small",
        "short" => "Short",
        "medium" => "Medium",
        "large" => "Large",
        "big" => "Big",
        "great" => "Great",
        "huge" => "Huge",
        _ => return None,
    })
}

/// Extract and parse `#[bot(...)]` attribute values from field attributes
///
/// # Supported Attributes
///
/// * `#[bot(rename = "name")]` - Alternative wire name
/// * `#[bot(skip)]` - Never written, ignored by `is_default`
/// * `#[bot(size = "small")]` - Size class for a collection field
///
/// Multiple attributes can be combined: `#[bot(rename = "id", size = "tiny")]`
fn get_field_attributes(attrs: &[Attribute], field_name: &str) -> syn::Result<FieldAttributes> {
    let mut parsed = FieldAttributes {
        name: field_name.to_string(),
        skip: false,
        size: Ident::new("Auto", Span::call_site()),
    };

    for attr in attrs {
        if !attr.path().is_ident("bot") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;

                if ident == "rename" {
                    input.parse::<syn::Token![=]>()?;
                    let lit = input.parse::<syn::LitStr>()?;
                    parsed.name = lit.value();
                } else if ident == "skip" {
                    parsed.skip = true;
                } else if ident == "size" {
                    input.parse::<syn::Token![=]>()?;
                    let lit = input.parse::<syn::LitStr>()?;
                    let variant = size_class_variant(&lit.value()).ok_or_else(|| {
                        syn::Error::new(
                            lit.span(),
                            format!("Unknown size class: {}", lit.value()),
                        )
                    })?;
                    parsed.size = Ident::new(variant, lit.span());
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown attribute: {}", ident),
                    ));
                }

                // Consume comma if present, otherwise end
                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }

    Ok(parsed)
}

/// One written field: how to reach it from `self` and how it is configured
struct FieldPlan {
    access: TokenStream2,
    ty: Type,
    attrs: FieldAttributes,
}

fn plan_fields(fields: &Fields) -> syn::Result<Vec<FieldPlan>> {
    let mut plans = Vec::new();
    match fields {
        Fields::Named(fields) => {
            for f in &fields.named {
                let ident = f.ident.as_ref().ok_or_else(|| {
                    syn::Error::new(Span::call_site(), "named field without identifier")
                })?;
                plans.push(FieldPlan {
                    access: quote! { #ident },
                    ty: f.ty.clone(),
                    attrs: get_field_attributes(&f.attrs, &ident.to_string())?,
                });
            }
        }
        Fields::Unnamed(fields) => {
            for (i, f) in fields.unnamed.iter().enumerate() {
                let index = Index::from(i);
                plans.push(FieldPlan {
                    access: quote! { #index },
                    ty: f.ty.clone(),
                    attrs: get_field_attributes(&f.attrs, &i.to_string())?,
                });
            }
        }
        Fields::Unit => {}
    }

    let mut seen = HashSet::new();
    for plan in plans.iter().filter(|p| !p.attrs.skip) {
        if !seen.insert(plan.attrs.name.clone()) {
            return Err(syn::Error::new(
                Span::call_site(),
                format!(
                    "Field name '{}' is written twice. Use #[bot(rename = \"...\")] to disambiguate.",
                    plan.attrs.name
                ),
            ));
        }
    }
    Ok(plans)
}

fn mentions_any(tokens: TokenStream2, params: &HashSet<Ident>) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(ident) => params.contains(&ident),
        TokenTree::Group(group) => mentions_any(group.stream(), params),
        _ => false,
    })
}

/// Adds `FieldType: bot_encoder::Field` for every written field whose type mentions a type
/// parameter.
///
/// Field types without type parameters are left alone: bounding a recursive type such as
/// `Option<Box<Self>>` would make the impl depend on itself.
fn with_field_bounds(generics: &Generics, written: &[&FieldPlan]) -> Generics {
    let params: HashSet<Ident> = generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(ty) => Some(ty.ident.clone()),
            _ => None,
        })
        .collect();
    let mut generics = generics.clone();
    if params.is_empty() {
        return generics;
    }
    let where_clause = generics.make_where_clause();
    for plan in written {
        let ty = &plan.ty;
        if mentions_any(quote! { #ty }, &params) {
            where_clause
                .predicates
                .push(syn::parse_quote! { #ty: bot_encoder::Field });
        }
    }
    generics
}

/// Derive macro for implementing the `Serializable` trait
///
/// Generates, for a named, tuple or unit struct:
///
/// * `Serializable` - `is_default` is true when every written field is default; `write` writes
///   each field under its name (tuple fields are named `0`, `1`, ...)
/// * `Field` - the struct as a nested object field
/// * `ArrayElement` - the struct as an object leaf inside arrays
///
/// Generic structs get a `FieldType: Field` bound for every written field that uses a type
/// parameter.
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Serializable)]
/// struct Sprite {
///     #[bot(rename = "pos")]
///     position: [i32; 2],
///     #[bot(size = "small")]
///     frames: Vec<u16>,
///     #[bot(skip)]
///     cached: bool,
/// }
/// ```
#[proc_macro_derive(Serializable, attributes(bot))]
pub fn derive_serializable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_serializable(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_serializable(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Serializable can only be derived for structs",
            ))
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(name, "Unions are not supported"))
        }
    };

    let plans = plan_fields(fields)?;
    let written: Vec<&FieldPlan> = plans.iter().filter(|p| !p.attrs.skip).collect();
    let generics = with_field_bounds(&input.generics, &written);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let default_checks = written.iter().map(|p| {
        let access = &p.access;
        quote! { bot_encoder::Field::is_default_value(&self.#access) }
    });

    let field_writes = written.iter().map(|p| {
        let access = &p.access;
        let field_name = &p.attrs.name;
        let size = &p.attrs.size;
        quote! {
            writer.write_sized(#field_name, &self.#access, bot_encoder::SizeClass::#size)?;
        }
    });

    Ok(quote! {
        impl #impl_generics bot_encoder::Serializable for #name #ty_generics #where_clause {
            fn is_default(&self) -> bool {
                true #(&& #default_checks)*
            }

            fn write<__S: bot_encoder::Sink>(
                &self,
                writer: &mut bot_encoder::Writer<__S>,
            ) -> bot_encoder::Result<()> {
                #(#field_writes)*
                Ok(())
            }
        }

        impl #impl_generics bot_encoder::Field for #name #ty_generics #where_clause {
            fn is_default_value(&self) -> bool {
                bot_encoder::Serializable::is_default(self)
            }

            fn write_field<__S: bot_encoder::Sink>(
                &self,
                writer: &mut bot_encoder::Writer<__S>,
                name: &str,
                _size: bot_encoder::SizeClass,
            ) -> bot_encoder::Result<()> {
                writer.write_object(name, self)
            }
        }

        impl #impl_generics bot_encoder::ArrayElement for #name #ty_generics #where_clause {
            fn describe(
                _members: &[&Self],
                descriptors: &mut Vec<bot_encoder::Tag>,
            ) -> bot_encoder::Result<()> {
                descriptors.push(bot_encoder::Tag::OBJECT);
                Ok(())
            }

            fn push_members<__S: bot_encoder::Sink>(
                run: &[Self],
                writer: &mut bot_encoder::Writer<__S>,
                _descriptors: &[bot_encoder::Tag],
                _depth: usize,
            ) -> bot_encoder::Result<()> {
                bot_encoder::push_objects(run, writer)
            }
        }
    })
}

/// Parses the container attribute `#[bot(repr = "u64")]`
fn get_repr_attribute(attrs: &[Attribute]) -> syn::Result<Option<Type>> {
    let mut repr = None;
    for attr in attrs {
        if !attr.path().is_ident("bot") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;
                if ident == "repr" {
                    input.parse::<syn::Token![=]>()?;
                    let lit = input.parse::<syn::LitStr>()?;
                    repr = Some(lit.parse::<Type>()?);
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown container attribute: {}", ident),
                    ));
                }

                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }
    Ok(repr)
}

/// Derive macro writing a type through its `SerializedAs` representation
///
/// Generates `Field` (a scalar field, omitted when the representation is zero) and
/// `ArrayElement` (a leaf of the representation's primitive type). The type must implement
/// `bot_encoder::SerializedAs`, either by hand or through `#[bot(repr = "...")]`, which combines
/// the written fields in declaration order into the given scalar, zero-filling unused high bytes.
/// Each combined field must itself be a scalar.
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Primitive)]
/// #[bot(repr = "u64")]
/// struct Vector2i {
///     x: i32,
///     y: i32,
/// }
/// ```
#[proc_macro_derive(Primitive, attributes(bot))]
pub fn derive_primitive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_primitive(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_primitive(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Primitive cannot be derived for generic types",
        ));
    }
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Primitive can only be derived for structs",
            ))
        }
    };

    let serialized_as = match get_repr_attribute(&input.attrs)? {
        Some(repr) => {
            let plans = plan_fields(fields)?;
            let combines = plans.iter().filter(|p| !p.attrs.skip).map(|p| {
                let access = &p.access;
                quote! { .combine(self.#access) }
            });
            quote! {
                impl bot_encoder::SerializedAs for #name {
                    type Repr = #repr;

                    fn to_repr(&self) -> bot_encoder::Result<#repr> {
                        bot_encoder::Combiner::new()
                            #(#combines)*
                            .to_padded()
                    }
                }
            }
        }
        None => quote! {},
    };

    Ok(quote! {
        #serialized_as

        impl bot_encoder::Field for #name {
            fn is_default_value(&self) -> bool {
                bot_encoder::SerializedAs::is_default_repr(self)
            }

            fn write_field<__S: bot_encoder::Sink>(
                &self,
                writer: &mut bot_encoder::Writer<__S>,
                name: &str,
                _size: bot_encoder::SizeClass,
            ) -> bot_encoder::Result<()> {
                writer.write_serialized(name, self)
            }
        }

        impl bot_encoder::ArrayElement for #name {
            fn describe(
                _members: &[&Self],
                descriptors: &mut Vec<bot_encoder::Tag>,
            ) -> bot_encoder::Result<()> {
                descriptors.push(bot_encoder::tag_of::<
                    <Self as bot_encoder::SerializedAs>::Repr,
                >());
                Ok(())
            }

            fn push_members<__S: bot_encoder::Sink>(
                run: &[Self],
                writer: &mut bot_encoder::Writer<__S>,
                _descriptors: &[bot_encoder::Tag],
                _depth: usize,
            ) -> bot_encoder::Result<()> {
                bot_encoder::push_serialized(run, writer)
            }
        }
    })
}
