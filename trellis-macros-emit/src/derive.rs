use proc_macro2::TokenStream;
use quote::quote;
use unsynn::Ident;

use crate::grammar::{StructDecl, parse_struct};

/// A field that ends up in the tree.
struct RecordField {
    ident: Ident,
    effective_name: String,
    ty: TokenStream,
}

/// What the derive learned from the struct body.
struct RecordShape {
    fields: Vec<RecordField>,
    /// Members marked `#[trellis(skip)]`
    skipped: Vec<Ident>,
}

/// Expands `#[derive(Record)]`.
///
/// Emits `Record`, `Reflect` and `Element` impls against the `::trellis`
/// facade. Anything the derive can't handle becomes a `compile_error!`.
pub fn derive_record(input: TokenStream) -> TokenStream {
    let decl = match parse_struct(input) {
        Ok(decl) => decl,
        Err(err) => {
            return compile_error(&format!(
                "#[derive(Record)] supports non-generic structs with named fields only: {err}"
            ));
        }
    };

    match record_fields(&decl) {
        Ok(shape) => emit(&decl.name, &shape),
        Err(message) => compile_error(&message),
    }
}

fn record_fields(decl: &StructDecl) -> Result<RecordShape, String> {
    let mut fields: Vec<RecordField> = Vec::new();
    let mut skipped = Vec::new();

    for field in decl.fields() {
        let options = field.options()?;
        if options.skip {
            skipped.push(field.name.clone());
            continue;
        }

        let effective_name = options.rename.unwrap_or_else(|| field.raw_name());
        if effective_name.is_empty() || effective_name.contains('/') {
            return Err(format!(
                "field `{}` can't be exposed as {effective_name:?}: child names must be non-empty and contain no `/`",
                field.raw_name()
            ));
        }
        if fields.iter().any(|f| f.effective_name == effective_name) {
            return Err(format!(
                "two fields of `{}` are both exposed as `{effective_name}`",
                decl.name
            ));
        }

        fields.push(RecordField {
            ident: field.name.clone(),
            effective_name,
            ty: field.type_tokens(),
        });
    }

    Ok(RecordShape { fields, skipped })
}

fn emit(name: &Ident, shape: &RecordShape) -> TokenStream {
    let fields = &shape.fields;
    let descriptors = fields.iter().map(|field| {
        let field_name = &field.effective_name;
        let ty = &field.ty;
        quote! {
            ::trellis::FieldDescriptor::new(#field_name, <#ty as ::trellis::Reflect>::meta)
        }
    });
    let idents: Vec<&Ident> = fields.iter().map(|field| &field.ident).collect();
    let assign_skipped = if shape.skipped.is_empty() {
        quote! {}
    } else {
        let skipped = &shape.skipped;
        quote! {
            fn assign_skipped(&mut self, other: &Self) {
                #(self.#skipped = ::core::clone::Clone::clone(&other.#skipped);)*
            }
        }
    };

    quote! {
        #[automatically_derived]
        impl ::trellis::Record for #name {
            const FIELDS: &'static [::trellis::FieldDescriptor] = &[#(#descriptors),*];

            fn field_values(&self) -> ::std::vec::Vec<&dyn ::trellis::Value> {
                ::std::vec![#(&self.#idents as &dyn ::trellis::Value),*]
            }

            fn field_values_mut(&mut self) -> ::std::vec::Vec<&mut dyn ::trellis::Value> {
                ::std::vec![#(&mut self.#idents as &mut dyn ::trellis::Value),*]
            }

            #assign_skipped
        }

        #[automatically_derived]
        impl ::trellis::Reflect for #name {
            fn meta() -> &'static ::trellis::MetaType {
                ::trellis::record_meta::<Self>()
            }
        }

        #[automatically_derived]
        impl ::trellis::Element for #name {
            type Node = ::trellis::StructNode<Self>;

            fn into_node(self) -> Self::Node {
                ::trellis::StructNode::new(self)
            }
        }
    }
}

fn compile_error(message: &str) -> TokenStream {
    quote! { ::core::compile_error!(#message); }
}
