use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, ItemFn, Pat, Signature, Type};

#[proc_macro_attribute]
/// Provides a [`rocket::local::asynchronous::Client`] and [`mongodb::Database`] to the function,
/// instruments it as a [`rocket::async_test`] and ensures that the [`mongodb::Database`] is
/// cleared WHETHER OR NOT the test completes by passing, failing or otherwise panicking.
///
/// If a panic occurs via a failed assertion or other unwinding panic, the [`mongodb::Database`] is
/// cleared, and the panic is "rethrown".
///
/// Note: this attribute requires that `crate::client_and_db` is in scope, and the `futures` crate
/// must be included as a test dependency so we can run the wrapped future to completion inside
/// [`std::panic::catch_unwind`].
pub fn db_test(_: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let name = item_fn.sig.ident.clone();
    if let Err(err) = check_sig(&item_fn.sig) {
        return err.into_compile_error().into();
    }
    let new_name = format_ident!("{}_test", name);
    item_fn.sig.ident = new_name.clone();
    quote! {
        #[rocket::async_test]
        async fn #name() {
            let (client, db) = crate::client_and_db().await;

            #item_fn

            // To avoid futures not being transferable across Unwind boundaries:
            // - See https://stackoverflow.com/a/66529014/13112498
            let client_mutex = std::sync::Mutex::new(client);
            let db_mutex = std::sync::Mutex::new(db.clone());

            let result = std::panic::catch_unwind(|| {
                let client = client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();

                let handle = rocket::tokio::runtime::Handle::current();

                let _ = handle.enter();

                futures::executor::block_on(#new_name(client, db));
            });

            db.drop(None).await.unwrap();

            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async and takes exactly a `Client` and a `Database`.
fn check_sig(sig: &Signature) -> Result<(), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let idents: Vec<_> = sig
        .inputs
        .iter()
        .filter_map(|input| {
            if let FnArg::Typed(pat_type) = input {
                if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                    return type_path.path.get_ident();
                }
            }
            None
        })
        .collect();

    if idents.len() != 2 || idents[0] != "Client" || idents[1] != "Database" {
        return Err(syn::Error::new(
            sig.inputs.span(),
            "Expected exactly `client_ident: Client, db_ident: Database`",
        ));
    }

    Ok(())
}
