use core::result::Result;

// The glob brings unsynn's one-parameter `Result`; the import above wins.
use unsynn::*;

keyword! {
    /// The "pub" keyword.
    pub KPub = "pub";
    /// The "struct" keyword.
    pub KStruct = "struct";
    /// The "trellis" attribute namespace.
    pub KTrellis = "trellis";
    /// The "rename" option.
    pub KRename = "rename";
    /// The "skip" option.
    pub KSkip = "skip";
}

/// Tokens up to (but excluding) `C`, where `<...>` counts as a single tree.
pub type VerbatimUntil<C> = Many<Cons<Except<C>, AngleTokenTree>>;

unsynn! {
    /// Either a `TokenTree` or a `<...>` run, which proc-macros don't see as a group.
    pub struct AngleTokenTree(
        #[allow(clippy::type_complexity)]
        pub Either<Cons<Lt, Vec<Cons<Except<Gt>, AngleTokenTree>>, Gt>, TokenTree>,
    );

    /// `rename = "name"`
    pub struct RenameOption {
        /// The "rename" keyword
        pub _rename: KRename,
        /// The equals sign
        pub _eq: PunctAny<'='>,
        /// The new name, still quoted
        pub name: Literal,
    }

    /// One option inside `#[trellis(...)]`
    pub enum TrellisOption {
        /// `rename = "name"`
        Rename(RenameOption),
        /// `skip`
        Skip(KSkip),
    }

    /// `trellis(option, ...)`
    pub struct TrellisAttr {
        /// The "trellis" keyword
        pub _trellis: KTrellis,
        /// Options in parentheses
        pub options: ParenthesisGroupContaining<CommaDelimitedVec<TrellisOption>>,
    }

    /// What sits between the brackets of an attribute
    pub enum AttributeContent {
        /// One of ours
        Trellis(TrellisAttr),
        /// Doc comments, other derives' helpers, lints...
        Other(TokenStream),
    }

    /// `#[...]`
    pub struct Attribute {
        /// The # symbol
        pub _hash: PunctAny<'#'>,
        /// The attribute content in brackets
        pub content: BracketGroupContaining<AttributeContent>,
    }

    /// `pub` or `pub(...)`
    pub enum Vis {
        /// `pub(crate)`, `pub(super)`, `pub(in path)`
        Restricted(Cons<KPub, ParenthesisGroup>),
        /// Plain `pub`
        Pub(KPub),
    }

    /// `name: Type` with optional attributes and visibility
    pub struct StructField {
        /// Attributes on the field
        pub attributes: Option<Many<Attribute>>,
        /// Visibility of the field
        pub _vis: Option<Vis>,
        /// Field name
        pub name: Ident,
        /// Colon separator
        pub _colon: Colon,
        /// Field type, up to the next comma
        pub typ: VerbatimUntil<Comma>,
    }

    /// A struct with named fields and no generics
    pub struct StructDecl {
        /// Attributes on the struct
        pub attributes: Option<Many<Attribute>>,
        /// Visibility of the struct
        pub _vis: Option<Vis>,
        /// The "struct" keyword
        pub _kw_struct: KStruct,
        /// Type name
        pub name: Ident,
        /// Fields in braces
        pub fields: BraceGroupContaining<CommaDelimitedVec<StructField>>,
    }
}

/// Field attribute settings after parsing.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldOptions {
    /// Child name to expose instead of the field name
    pub rename: Option<String>,
    /// Leave the field out of the tree
    pub skip: bool,
}

impl StructField {
    /// Field name as written, with any `r#` prefix removed.
    pub fn raw_name(&self) -> String {
        let name = self.name.to_string();
        match name.strip_prefix("r#") {
            Some(stripped) => stripped.to_string(),
            None => name,
        }
    }

    /// Collects the `#[trellis(...)]` options on this field.
    ///
    /// Attributes under the `trellis` name that don't parse as known options
    /// are reported instead of being ignored.
    pub fn options(&self) -> Result<FieldOptions, String> {
        let mut options = FieldOptions::default();
        let Some(attributes) = &self.attributes else {
            return Ok(options);
        };

        for attr in attributes.0.iter() {
            match &attr.value.content.content {
                AttributeContent::Trellis(trellis) => {
                    for option in trellis.options.content.0.iter() {
                        match &option.value {
                            TrellisOption::Rename(rename) => {
                                let literal = rename.name.to_string();
                                let name = parse_string_literal(&literal).ok_or_else(|| {
                                    format!("expected a string literal for `rename`, got {literal}")
                                })?;
                                options.rename = Some(name);
                            }
                            TrellisOption::Skip(_) => options.skip = true,
                        }
                    }
                }
                AttributeContent::Other(tokens) => {
                    if let Some(TokenTree::Ident(ident)) = tokens.clone().into_iter().next() {
                        if ident == "trellis" {
                            return Err(format!(
                                "unknown trellis attribute on field `{}`: {}",
                                self.raw_name(),
                                tokens
                            ));
                        }
                    }
                }
            }
        }

        Ok(options)
    }

    /// The field type as a token stream, for use with `quote!`.
    pub fn type_tokens(&self) -> TokenStream {
        self.typ.to_token_stream()
    }
}

impl StructDecl {
    /// The fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &StructField> {
        self.fields.content.0.iter().map(|delimited| &delimited.value)
    }
}

/// Parses a struct declaration, which must be the whole input.
pub fn parse_struct(input: TokenStream) -> Result<StructDecl, String> {
    let mut i = input.to_token_iter();
    i.parse::<Cons<StructDecl, EndOfStream>>()
        .map(|parsed| parsed.first)
        .map_err(|err| err.to_string())
}

/// Unquotes a string literal as printed by `proc_macro2::Literal`.
///
/// Handles `"..."` with the common escapes and raw `r#"..."#` literals.
fn parse_string_literal(literal: &str) -> Option<String> {
    if let Some(raw) = literal.strip_prefix('r') {
        let hashes = raw.len() - raw.trim_start_matches('#').len();
        let body = &raw[hashes..];
        let body = body.strip_prefix('"')?;
        let body = body.strip_suffix(&"#".repeat(hashes))?;
        return body.strip_suffix('"').map(str::to_string);
    }

    let body = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            _ => return None,
        }
    }
    Some(out)
}
