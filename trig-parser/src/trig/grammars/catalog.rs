//! Catalog-language grammar
//!
//! ```text
//! catalog := library*
//! library := "library" STR STR "{" item,* "}"
//! item    := LABEL | "folder" STR "{" item,* "}"
//! ```

use super::{common_transforms, IGNORE, LABEL, STR};
use crate::trig::ast::{Catalog, CatalogItem, CatalogLibrary, Folder};
use crate::trig::error::{CompileError, GrammarError};
use crate::trig::lexing::LexerSpec;
use crate::trig::parsing::{Grammar, GrammarBuilder, ReduceError, SemanticValue};
use crate::trig::token::{Token, TokenValue};
use once_cell::sync::Lazy;

pub static CATALOG_LEXER: Lazy<LexerSpec> = Lazy::new(|| {
    let spec = LexerSpec::new(IGNORE)
        .and_then(|spec| {
            spec.keywords(&["library", "folder", ",", "{", "}"])
                .pattern("str", STR)
        })
        .and_then(|spec| spec.pattern("label", LABEL))
        .expect("catalog token patterns are valid");
    common_transforms(spec)
});

pub static CATALOG_GRAMMAR: Lazy<Grammar<CatalogSyntax>> =
    Lazy::new(|| grammar().expect("catalog grammar references only defined rules"));

pub fn parse_catalog(tokens: &[Token], source_len: usize) -> Result<Catalog, CompileError> {
    let catalog = match CATALOG_GRAMMAR.parse(tokens, source_len)? {
        CatalogSyntax::Catalog(catalog) => catalog,
        other => {
            return Err(GrammarError::Reduce {
                rule: "catalog".to_string(),
                message: format!("expected Catalog, found {:?}", other),
            }
            .into())
        }
    };
    tracing::debug!(libraries = catalog.libraries.len(), "parsed catalog");
    Ok(catalog)
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSyntax {
    Token(TokenValue),
    List(Vec<CatalogSyntax>),
    Catalog(Catalog),
    Library(CatalogLibrary),
    Item(CatalogItem),
}

impl SemanticValue for CatalogSyntax {
    fn from_token(token: &Token) -> Self {
        CatalogSyntax::Token(token.value.clone())
    }

    fn from_list(items: Vec<Self>) -> Self {
        CatalogSyntax::List(items)
    }

    fn into_list(self) -> Result<Vec<Self>, ReduceError> {
        match self {
            CatalogSyntax::List(items) => Ok(items),
            other => Err(ReduceError::unexpected("List", &other)),
        }
    }
}

impl CatalogSyntax {
    fn into_text(self) -> Result<String, ReduceError> {
        match self {
            CatalogSyntax::Token(TokenValue::Text(text)) => Ok(text),
            other => Err(ReduceError::unexpected("text token", &other)),
        }
    }

    fn into_items(self) -> Result<Vec<CatalogItem>, ReduceError> {
        self.into_list()?
            .into_iter()
            .map(|item| match item {
                CatalogSyntax::Item(item) => Ok(item),
                other => Err(ReduceError::unexpected("Item", &other)),
            })
            .collect()
    }
}

fn grammar() -> Result<Grammar<CatalogSyntax>, GrammarError> {
    GrammarBuilder::<CatalogSyntax>::new("catalog")
        .rule("catalog", &["libraries"], |mut a| {
            let libraries = a
                .next()?
                .into_list()?
                .into_iter()
                .map(|library| match library {
                    CatalogSyntax::Library(library) => Ok(library),
                    other => Err(ReduceError::unexpected("Library", &other)),
                })
                .collect::<Result<_, _>>()?;
            Ok(CatalogSyntax::Catalog(Catalog { libraries }))
        })
        .many("libraries", "library")
        .rule(
            "library",
            &["$library", "$str", "$str", "${", "items", "$}"],
            |mut a| {
                let name = a.skip(1)?.next()?.into_text()?;
                let description = a.next()?.into_text()?;
                let items = a.skip(1)?.next()?.into_items()?;
                Ok(CatalogSyntax::Library(CatalogLibrary {
                    name,
                    description,
                    items,
                }))
            },
        )
        .separated("items", "item", "$,")
        .rule("item", &["$label"], |mut a| {
            Ok(CatalogSyntax::Item(CatalogItem::Leaf(a.next()?.into_text()?)))
        })
        .rule("item", &["$folder", "$str", "${", "items", "$}"], |mut a| {
            let description = a.skip(1)?.next()?.into_text()?;
            let items = a.skip(1)?.next()?.into_items()?;
            Ok(CatalogSyntax::Item(CatalogItem::Folder(Folder {
                description,
                items,
                allocation: None,
            })))
        })
        .build()
}
