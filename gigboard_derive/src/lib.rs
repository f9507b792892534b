//! `#[derive(Model)]` for gigboard.
//!
//! Generates the `gigboard::orm::Model` impl (table name, `CREATE TABLE` statement and
//! column list) and registers the model's migration with `inventory` so that
//! `gigboard::orm::auto_migrate` picks it up.
//!
//! ```ignore
//! #[derive(Model)]
//! #[model(table = "shows")]
//! pub struct Show {
//!     #[model(primary_key)]
//!     pub id: i64,
//!     #[model(references = "venues(id) ON DELETE CASCADE")]
//!     pub venue_id: i64,
//!     #[model(default = "''")]
//!     pub note: String,
//! }
//! ```
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments, Type,
    parse_macro_input,
};

#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct FieldOptions {
    primary_key: bool,
    default: Option<String>,
    references: Option<String>,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;

    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute"))
            }
        })?;
    }
    let table = table.unwrap_or_else(|| format!("{}s", ident.to_string().to_lowercase()));

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Model requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "Model can only be derived for structs",
            ));
        }
    };

    let mut definitions = Vec::new();
    let mut column_names = Vec::new();
    let mut column_defs = Vec::new();
    for field in fields {
        let options = field_options(field)?;
        let name = match &field.ident {
            Some(field_ident) => field_ident.to_string().trim_start_matches("r#").to_string(),
            None => return Err(syn::Error::new_spanned(field, "unnamed field")),
        };
        let (sql_type, nullable) = sql_type(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(&field.ty, "unsupported column type for Model")
        })?;

        if options.primary_key {
            definitions.push(format!("{name} {sql_type} PRIMARY KEY AUTOINCREMENT"));
            column_names.push(name);
            column_defs.push(sql_type.to_string());
            continue;
        }

        let mut def = sql_type.to_string();
        if !nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &options.default {
            def.push_str(&format!(" DEFAULT {default}"));
        }
        if let Some(references) = &options.references {
            def.push_str(&format!(" REFERENCES {references}"));
        }
        definitions.push(format!("{name} {def}"));
        column_names.push(name);
        column_defs.push(def);
    }

    let create_sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n)",
        definitions.join(",\n    ")
    );
    let migrate_fn = format_ident!("__gigboard_migrate_{}", table);

    Ok(quote! {
        impl ::gigboard::orm::Model for #ident {
            fn table_name() -> &'static str {
                #table
            }

            fn create_table_sql() -> String {
                #create_sql.to_string()
            }

            fn columns() -> Vec<(String, String)> {
                vec![#( (#column_names.to_string(), #column_defs.to_string()) ),*]
            }
        }

        #[doc(hidden)]
        fn #migrate_fn(
            db: ::std::sync::Arc<::gigboard::orm::Db>,
        ) -> ::gigboard::orm::MigrationFuture {
            <#ident as ::gigboard::orm::Model>::migrate(db)
        }

        ::gigboard::inventory::submit! {
            ::gigboard::orm::Migration(#migrate_fn)
        }
    })
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                options.primary_key = true;
            } else if meta.path.is_ident("default") {
                let value: LitStr = meta.value()?.parse()?;
                options.default = Some(value.value());
            } else if meta.path.is_ident("references") {
                let value: LitStr = meta.value()?.parse()?;
                options.references = Some(value.value());
            } else {
                return Err(meta.error("unsupported model field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

/// Maps a Rust field type to its SQLite column type; `Option<T>` makes it nullable.
fn sql_type(ty: &Type) -> Option<(&'static str, bool)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident == "Option" {
        let PathArguments::AngleBracketed(args) = &segment.arguments else {
            return None;
        };
        let inner = args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        })?;
        let (sql, _) = sql_type(inner)?;
        return Some((sql, true));
    }

    let sql = match segment.ident.to_string().as_str() {
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" => "INTEGER",
        "f32" | "f64" => "REAL",
        "bool" => "BOOLEAN",
        "String" => "TEXT",
        "DateTime" | "NaiveDateTime" => "DATETIME",
        "NaiveDate" => "DATE",
        "Json" => "TEXT",
        _ => return None,
    };
    Some((sql, false))
}
