use std::path::{Path, PathBuf};

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::Error;
use syn_mid::ItemFn;

/// Expand a `#[test]` taking a `&Path` into one test per directory holding a file that matches
/// the glob pattern. Relative patterns are resolved against the crate's manifest directory.
#[proc_macro_attribute]
pub fn fixture_dirs(args: TokenStream, function: TokenStream) -> TokenStream {
    if args.is_empty() {
        return Error::new(
            Span::call_site(),
            "#[fixture_dirs] attribute requires a glob pattern",
        )
        .to_compile_error()
        .into();
    }

    let pattern = match syn::parse(args) {
        Ok(p) => p,
        Err(err) => return err.to_compile_error().into(),
    };

    let function: ItemFn = syn::parse_macro_input!(function);

    if !function
        .attrs
        .iter()
        .any(|attr| attr.path().is_ident("test"))
    {
        return Error::new(
            Span::call_site(),
            "#[fixture_dirs] attribute currently only supports running on #[test] functions",
        )
        .to_compile_error()
        .into();
    }

    fixture_dirs2(pattern, function).into()
}

fn manifest_dir() -> PathBuf {
    std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_default()
}

fn fixture_dirs2(pattern: syn::LitStr, function: ItemFn) -> TokenStream2 {
    let root = manifest_dir();
    let full_pattern = root.join(pattern.value());

    let matches = match glob::glob(&full_pattern.to_string_lossy()) {
        Ok(matches) => matches,
        Err(err) => {
            return Error::new(
                pattern.span(),
                format!("#[fixture_dirs] called with invalid pattern: {err:?}"),
            )
            .to_compile_error();
        }
    };

    let mut dirs = match matches.collect::<Result<Vec<_>, _>>() {
        Ok(paths) => paths
            .into_iter()
            .filter_map(|path| path.parent().map(Path::to_path_buf))
            .collect::<Vec<_>>(),
        Err(err) => {
            return Error::new(pattern.span(), format!("#[fixture_dirs] error: {err:?}"))
                .to_compile_error();
        }
    };
    dirs.sort();
    dirs.dedup();

    if dirs.is_empty() {
        return Error::new(
            pattern.span(),
            format!("#[fixture_dirs] pattern matched nothing under {}", root.display()),
        )
        .to_compile_error();
    }

    let counter_width = (dirs.len() - 1).to_string().len();

    let mut functions = vec![];

    for (i, dir) in dirs.iter().enumerate() {
        let relative = dir.strip_prefix(&root).unwrap_or(dir);
        let function_name = syn::Ident::new(
            &format!(
                "{}__{:0width$}__{}",
                function.sig.ident,
                i,
                relative
                    .components()
                    .map(|p| p.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("__")
                    .replace(['.', '-', ' '], "_"),
                width = counter_width
            ),
            function.sig.ident.span(),
        );

        let dir_lit = syn::LitStr::new(&dir.to_string_lossy(), Span::call_site());

        let mut inner_function = function.clone();
        inner_function.sig.ident = syn::Ident::new("test", function.sig.ident.span());
        inner_function.attrs = inner_function
            .attrs
            .into_iter()
            .filter(|attr| !attr.path().is_ident("test"))
            .collect();

        let function = quote! {
            #[test]
            #[allow(non_snake_case)]
            fn #function_name() {
                #inner_function
                let dir: &str = #dir_lit;
                test(std::path::Path::new(&dir));
            }
        };

        functions.push(function);
    }

    quote! {
        #(#functions)*
    }
}
