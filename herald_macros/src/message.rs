use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, Type};

enum Kind {
    Event,
    Command,
    Query,
}

pub fn derive_message(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let kind = extract_kind(input)?;
    let fields = named_fields(input)?;

    let attributes_field = find_marked(fields, "attributes")?
        .or_else(|| fields.iter().find(|f| is_named(f, "attributes")));
    let result_field = find_marked(fields, "result")?;
    let base_field = find_marked(fields, "base")?;

    let attributes_body = match (attributes_field, base_field) {
        (Some(field), _) => {
            let ident = field_ident(field);
            quote! { &self.#ident }
        }
        (None, Some(base)) => {
            let ident = field_ident(base);
            quote! { ::herald::Message::attributes(&*self.#ident) }
        }
        (None, None) => {
            return Err(syn::Error::new_spanned(
                name,
                "Message needs an `attributes: Attributes` field, a #[message(attributes)] field or a #[message(base)] parent",
            ))
        }
    };

    let (ancestors_body, upcast_fallback) = match base_field {
        Some(base) => {
            let ident = field_ident(base);
            (
                quote! {
                    let parent = &*self.#ident;
                    let mut lineage = ::std::vec![::herald::Message::message_type(parent)];
                    lineage.extend(::herald::Message::ancestors(parent));
                    lineage
                },
                quote! { ::herald::Message::upcast(::std::sync::Arc::clone(&self.#ident), target) },
            )
        }
        None => (quote! { ::std::vec::Vec::new() }, quote! { ::std::option::Option::None }),
    };

    let (archetype, marker) = match kind {
        Kind::Event => (quote! { Event }, quote! { ::herald::Event }),
        Kind::Command => (quote! { Command }, quote! { ::herald::Command }),
        Kind::Query => (quote! { Query }, quote! { ::herald::Query }),
    };

    if matches!(kind, Kind::Query) && result_field.is_none() {
        return Err(syn::Error::new_spanned(
            name,
            "a query must declare a #[message(result)] ResultSlot<T> field",
        ));
    }
    if matches!(kind, Kind::Event) && result_field.is_some() {
        return Err(syn::Error::new_spanned(name, "events do not carry a result"));
    }

    let returns_impl = result_field.map(|field| {
        let ident = field_ident(field);
        let ty: &Type = &field.ty;
        quote! {
            impl #impl_generics ::herald::Returns for #name #ty_generics #where_clause {
                type Output = <#ty as ::herald::DeclaresResult>::Output;

                fn result(&self) -> &::herald::ResultSlot<Self::Output> {
                    &self.#ident
                }
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::herald::Message for #name #ty_generics #where_clause {
            fn archetype(&self) -> ::herald::Archetype {
                ::herald::Archetype::#archetype
            }

            fn attributes(&self) -> &::herald::Attributes {
                #attributes_body
            }

            fn message_type(&self) -> ::herald::MessageType {
                ::herald::MessageType::of::<Self>()
            }

            fn ancestors(&self) -> ::std::vec::Vec<::herald::MessageType> {
                #ancestors_body
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn upcast(
                self: ::std::sync::Arc<Self>,
                target: ::std::any::TypeId,
            ) -> ::std::option::Option<::std::sync::Arc<dyn ::std::any::Any + Send + Sync>> {
                if target == ::std::any::TypeId::of::<Self>() {
                    return ::std::option::Option::Some(
                        self as ::std::sync::Arc<dyn ::std::any::Any + Send + Sync>,
                    );
                }
                #upcast_fallback
            }
        }

        impl #impl_generics #marker for #name #ty_generics #where_clause {}

        #returns_impl
    })
}

/// Reads `#[message(event | command | query)]` from the struct attributes.
fn extract_kind(input: &DeriveInput) -> syn::Result<Kind> {
    let mut kind = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("message") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("event") {
                kind = Some(Kind::Event);
            } else if meta.path.is_ident("command") {
                kind = Some(Kind::Command);
            } else if meta.path.is_ident("query") {
                kind = Some(Kind::Query);
            } else {
                return Err(meta.error("expected `event`, `command` or `query`"));
            }
            Ok(())
        })?;
    }
    kind.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "missing #[message(event | command | query)] attribute",
        )
    })
}

fn named_fields(input: &DeriveInput) -> syn::Result<&syn::punctuated::Punctuated<Field, syn::Token![,]>> {
    if let Data::Struct(data_struct) = &input.data {
        if let Fields::Named(fields) = &data_struct.fields {
            return Ok(&fields.named);
        }
    }
    Err(syn::Error::new_spanned(
        &input.ident,
        "#[derive(Message)] supports structs with named fields only",
    ))
}

/// Finds the field carrying `#[message(<marker>)]`.
fn find_marked<'a>(
    fields: &'a syn::punctuated::Punctuated<Field, syn::Token![,]>,
    marker: &str,
) -> syn::Result<Option<&'a Field>> {
    let mut found = None;
    for field in fields {
        for attr in &field.attrs {
            if !attr.path().is_ident("message") {
                continue;
            }
            let mut hit = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(marker) {
                    hit = true;
                }
                Ok(())
            })?;
            if hit {
                if found.is_some() {
                    return Err(syn::Error::new_spanned(
                        field,
                        format!("only one field may be marked #[message({marker})]"),
                    ));
                }
                found = Some(field);
            }
        }
    }
    Ok(found)
}

fn is_named(field: &Field, name: &str) -> bool {
    field.ident.as_ref().is_some_and(|ident| ident == name)
}

fn field_ident(field: &Field) -> &Ident {
    // named_fields() guarantees every field has an identifier
    field.ident.as_ref().expect("named field")
}
