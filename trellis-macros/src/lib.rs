#![doc = include_str!("../README.md")]

#[proc_macro_derive(Record, attributes(trellis))]
pub fn record(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    trellis_macros_emit::derive_record(input.into()).into()
}
