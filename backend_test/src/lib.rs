use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse::Parser, punctuated::Punctuated, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature,
    Token, Type,
};

/// Transform an asynchronous test into a Rocket test over a fresh in-memory
/// store, optionally logging the client in first.
///
/// Accepted arguments, in any order:
///
/// - one of `admin`, `voter`, `voter2` or `ineligible`, to log the client in as
///   that user;
/// - `open`, to start with an election whose window contains the current time.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// [`crate::store::MemoryStore`] (a handle on the same store the server uses).
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = match syn::parse::<ItemFn>(input) {
        Ok(item_fn) => item_fn,
        Err(err) => return err.into_compile_error().into(),
    };

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => return err.into_compile_error().into(),
    };

    let options = match Punctuated::<Ident, Token![,]>::parse_terminated.parse(args) {
        Ok(options) => options,
        Err(err) => return err.into_compile_error().into(),
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let mut open = false;
    let mut login_code = None;
    for option in &options {
        let code = if option == "open" {
            open = true;
            continue;
        } else if option == "admin" {
            "admin-code"
        } else if option == "voter" {
            "voter-code"
        } else if option == "voter2" {
            "voter2-code"
        } else if option == "ineligible" {
            "ineligible-code"
        } else {
            return syn::Error::new(
                option.span(),
                "Expected one of `admin`, `voter`, `voter2`, `ineligible` or `open`",
            )
            .into_compile_error()
            .into();
        };
        if login_code.replace(code).is_some() {
            return syn::Error::new(option.span(), "Test can only log in as one user")
                .into_compile_error()
                .into();
        }
    }

    // Log in the client through the identity provider round trip if needed.
    let maybe_login = login_code
        .map(|code| {
            quote! {
                rocket_client
                    .get(uri!(crate::api::auth::login))
                    .dispatch()
                    .await;
                let state = rocket_client
                    .cookies()
                    .get_private(crate::api::auth::OAUTH_STATE_COOKIE)
                    .expect("login sets the state cookie")
                    .value()
                    .to_string();
                // The response borrows the client, so it must go before the client is moved.
                {
                    let response = rocket_client
                        .get(format!("/auth/google/callback?code={}&state={}", #code, state))
                        .dispatch()
                        .await;
                    assert_eq!(response.status(), rocket::http::Status::SeeOther);
                }
            }
        })
        .unwrap_or_default();

    // Rewrite the test function.
    quote! {
        #[rocket::async_test]
        async fn #name() {
            /// The test itself.
            #item_fn

            // Test setup.
            let store = crate::store::MemoryStore::with_snapshot(crate::store::Snapshot::example(#open));
            let config = crate::config::Config::example();
            let platform = crate::platform::Platform::load(Box::new(store.clone()), config.electorate())
                .await
                .unwrap();
            let identities: std::sync::Arc<dyn crate::identity::IdentityProvider> =
                std::sync::Arc::new(crate::identity::StaticIdentityProvider::example());
            let rocket_client = rocket::local::asynchronous::Client::tracked(
                crate::rocket_for(config, platform, identities),
            )
            .await
            .unwrap();

            #maybe_login

            #new_name(#(#test_args),*).await;
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_store = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Valid as the last path segment for any type is itself
                    let type_ident = &type_path.path.segments.last().unwrap().ident;
                    if type_ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    } else if type_ident == "MemoryStore" {
                        if has_store {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `MemoryStore`",
                            ));
                        }
                        has_store = true;
                        args.push(quote! { store });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `store_ident: MemoryStore`",
        ));
    }

    Ok(args)
}
