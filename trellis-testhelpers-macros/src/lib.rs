use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    /// A test function, split where the generated code needs to splice.
    struct TestFn {
        /// Attributes, visibility and qualifiers before `fn`
        head: Any<Cons<Except<KFn>, TokenTree>>,
        _fn: KFn,
        name: Ident,
        /// Generics and parameters up to the body
        signature: Any<Cons<Except<BraceGroup>, TokenTree>>,
        body: BraceGroup,
    }
}

/// True if `word` appears as an identifier anywhere in `tokens`.
fn mentions(tokens: TokenStream, word: &str) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(ident) => ident == word,
        TokenTree::Group(group) => mentions(group.stream(), word),
        _ => false,
    })
}

/// Marks a test that calls `trellis_testhelpers::setup()` first.
///
/// The test returns `eyre::Result<()>`, so its body may use `?`. Tests
/// marked `#[should_panic]` keep returning `()`, as the harness requires.
#[proc_macro_attribute]
pub fn test(
    _attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let test_fn = match item.to_token_iter().parse::<TestFn>() {
        Ok(test_fn) => test_fn,
        Err(err) => {
            let message = format!("invalid test function: {err:?}");
            return quote::quote! { ::core::compile_error!(#message); }.into();
        }
    };

    let head = test_fn.head.to_token_stream();
    let name = test_fn.name;
    let signature = test_fn.signature.to_token_stream();
    let body = test_fn.body.0.stream();

    let expanded = if mentions(head.clone(), "should_panic") {
        quote::quote! {
            #[::core::prelude::rust_2024::test]
            #head fn #name #signature {
                ::trellis_testhelpers::setup();

                #body
            }
        }
    } else {
        quote::quote! {
            #[::core::prelude::rust_2024::test]
            #head fn #name #signature -> ::trellis_testhelpers::eyre::Result<()> {
                ::trellis_testhelpers::setup();

                #body

                Ok(())
            }
        }
    };
    expanded.into()
}
